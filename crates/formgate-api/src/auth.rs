//! Bearer-token authentication.
//!
//! Token verification belongs to the external identity service; this module
//! defines the boundary trait plus the axum extractor that turns the
//! `Authorization` header into a verified [`Principal`] before any
//! authorization check runs. Missing or unverifiable credentials are
//! rejected with 401.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use formgate_domain::orgset::OrgSet;
use formgate_domain::principal::{Claims, Principal};
use formgate_storage::DocumentStore;

use crate::http::error::ApiError;
use crate::http::state::AppState;

/// Errors from token verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
}

/// The external identity service, seen from this core: an opaque bearer
/// credential in, verified claims out.
#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Static token table for development and tests.
///
/// Production deployments implement [`TokenVerifier`] against their
/// identity provider instead.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Claims>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, Claims>) -> Self {
        Self { tokens }
    }

    /// Convenience constructor from (token, uid, email, role, orgs) rows.
    pub fn from_rows(rows: &[(&str, &str, &str, &str, &[&str])]) -> Self {
        let tokens = rows
            .iter()
            .map(|(token, uid, email, role, orgs)| {
                (
                    token.to_string(),
                    Claims {
                        uid: uid.to_string(),
                        email: Some(email.to_string()),
                        role: (!role.is_empty()).then(|| role.to_string()),
                        org: Some(OrgSet::Many(
                            orgs.iter().map(|o| o.to_string()).collect(),
                        )),
                    },
                )
            })
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

/// Extractor yielding the verified caller.
///
/// Responds 401 when the header is missing, not a bearer credential, or the
/// verifier rejects the token.
pub struct AuthPrincipal(pub Principal);

#[async_trait]
impl<S: DocumentStore> FromRequestParts<Arc<AppState<S>>> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

        let claims = state
            .verifier
            .verify(token)
            .await
            .map_err(|_| ApiError::unauthorized("Invalid token"))?;

        Ok(AuthPrincipal(Principal::from_claims(claims)))
    }
}
