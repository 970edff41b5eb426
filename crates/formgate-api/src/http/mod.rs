//! HTTP surface: router, handlers, state and error mapping.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, create_router_with_body_limit};
pub use state::AppState;
