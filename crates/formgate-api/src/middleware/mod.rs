//! API middleware.
//!
//! Includes:
//! - Request ID generation and propagation
//! - Request/response logging
//! - CORS configuration

mod logging;
mod request_id;

pub use logging::RequestLoggingLayer;
pub use request_id::{RequestIdLayer, REQUEST_ID_HEADER};

use tower_http::cors::{Any, CorsLayer};

/// Creates a CORS layer with permissive settings.
///
/// The API is consumed by a browser SPA served from another origin;
/// deployments fronted by a gateway restrict origins there.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
