//! Shared test utilities for formgate API tests.

// Constants and helpers are used across different test files, but each test
// binary is analyzed independently.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use formgate_api::auth::StaticTokenVerifier;
use formgate_api::http::{create_router, AppState};
use formgate_domain::orgset::OrgSet;
use formgate_domain::time::RawTimestamp;
use formgate_storage::{MemoryDocumentStore, NewDocument};

// Re-exported so `use common::*` brings the store trait into scope for
// direct store assertions in the test files.
pub use formgate_storage::DocumentStore;

// Tokens wired into the test verifier.
pub const ADMIN: &str = "token-admin";
pub const MANAGER_A: &str = "token-manager-a";
pub const MANAGER_AB: &str = "token-manager-ab";
pub const MANAGER_NO_ORG: &str = "token-manager-no-org";
pub const OPERATOR_A: &str = "token-operator-a";
pub const USER_A: &str = "token-user-a";
pub const NO_ROLE: &str = "token-no-role";

pub struct TestApp {
    pub router: axum::Router,
    pub store: Arc<MemoryDocumentStore>,
}

/// Builds an app over a fresh in-memory store with a fixed token table.
pub fn test_app() -> TestApp {
    let store = MemoryDocumentStore::new_shared();
    let verifier = Arc::new(StaticTokenVerifier::from_rows(&[
        (ADMIN, "admin-1", "admin@example.com", "Admin", &[]),
        (MANAGER_A, "mgr-1", "mgr@example.com", "Manager", &["A"]),
        (MANAGER_AB, "mgr-ab", "mgr-ab@example.com", "Manager", &["A", "B"]),
        (MANAGER_NO_ORG, "mgr-2", "mgr2@example.com", "Manager", &[]),
        (OPERATOR_A, "op-1", "op@example.com", "Operator", &["A"]),
        (USER_A, "user-1", "user@example.com", "User", &["A"]),
        (NO_ROLE, "norole-1", "norole@example.com", "", &["A"]),
    ]));
    let state = AppState::new(Arc::clone(&store), verifier);
    TestApp {
        router: create_router(state),
        store,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    /// Seeds a document directly into the store, bypassing the API, the way
    /// legacy writers did. Lets tests control org encoding and timestamps.
    pub async fn seed(
        &self,
        collection: &str,
        org: Option<OrgSet>,
        created_at: Option<&str>,
        data: Value,
    ) -> String {
        let doc = NewDocument {
            org,
            created_by: Some("seed@example.com".to_string()),
            created_at: created_at.map(|t| RawTimestamp::Text(t.to_string())),
            updated_at: None,
            data: data.as_object().cloned().unwrap_or_default(),
        };
        self.store.insert(collection, doc).await.unwrap()
    }

    /// Lets fire-and-forget audit writes land before assertions.
    pub async fn drain_audit_writes(&self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }
}

pub fn array_org(orgs: &[&str]) -> Option<OrgSet> {
    Some(OrgSet::Many(orgs.iter().map(|s| s.to_string()).collect()))
}

pub fn scalar_org(org: &str) -> Option<OrgSet> {
    Some(OrgSet::One(org.to_string()))
}
