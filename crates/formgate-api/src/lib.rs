//! formgate-api: HTTP API layer
//!
//! This crate provides the request-serving surface:
//! - Bearer-token authentication resolving a [`Principal`] per request
//! - Per-route resource-org resolvers feeding the authorization engine
//! - CRUD, listing and pagination handlers for the four resource kinds
//! - Audit-log listing and the user directory endpoints
//! - Middleware (request id, request logging, CORS)
//!
//! [`Principal`]: formgate_domain::Principal

pub mod auth;
pub mod http;
pub mod maintenance;
pub mod middleware;
pub mod resolvers;
