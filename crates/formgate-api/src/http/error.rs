//! API error responses.
//!
//! Every error renders as `{"error": "<message>"}` with its status code.
//! Authorization denials carry nothing beyond their status: `Forbidden`
//! when the resource exists but the caller is excluded, `Not found` when
//! existence itself is concealed. Storage failures from primary operations
//! surface as generic errors with the detail logged, not exposed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::error;

use formgate_domain::authz::{AuthzError, Decision};
use formgate_storage::StorageError;

/// An error response: status plus client-visible message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 401: missing or unverifiable credential.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 403: caller excluded from an existing resource or action.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden")
    }

    /// 404: missing, or concealed from the caller.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }

    /// 400: malformed input, surfaced verbatim.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 500: generic failure; detail goes to the log only.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::DocumentNotFound { .. } => ApiError::not_found(),
            _ => {
                error!(error = %err, "storage error on primary operation");
                ApiError::internal()
            }
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        error!(error = %err, "resource org resolution failed");
        ApiError::internal()
    }
}

/// Converts a denial into its response; `Allow` passes through as `Ok(())`.
pub fn require_allowed(decision: Decision) -> Result<(), ApiError> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Forbidden => Err(ApiError::forbidden()),
        Decision::NotFound => Err(ApiError::not_found()),
    }
}
