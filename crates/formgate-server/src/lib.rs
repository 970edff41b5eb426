//! formgate-server: Configuration and cross-cutting services
//!
//! - [`ServerConfig`] - layered configuration (defaults, YAML file,
//!   `FORMGATE_` environment overrides)
//! - [`AuditRecorder`] - best-effort, fire-and-forget audit trail writes

pub mod audit;
pub mod config;

pub use audit::{AuditAction, AuditActor, AuditEntry, AuditRecorder};
pub use config::{ConfigLoadError, ServerConfig};
