//! Application state for HTTP handlers.

use std::sync::Arc;

use formgate_server::config::AuditSettings;
use formgate_server::AuditRecorder;
use formgate_storage::DocumentStore;

use crate::auth::TokenVerifier;

/// State shared across all HTTP handlers.
///
/// Generic over the storage backend; the token verifier is a trait object
/// supplied at startup.
pub struct AppState<S: DocumentStore> {
    /// The document store backend.
    pub store: Arc<S>,
    /// Fire-and-forget audit writer.
    pub audit: AuditRecorder<S>,
    /// Audit listing limits and collection settings.
    pub audit_settings: AuditSettings,
    /// The external identity boundary.
    pub verifier: Arc<dyn TokenVerifier>,
}

impl<S: DocumentStore> AppState<S> {
    pub fn new(store: Arc<S>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self::with_audit_settings(store, verifier, AuditSettings::default())
    }

    pub fn with_audit_settings(
        store: Arc<S>,
        verifier: Arc<dyn TokenVerifier>,
        audit_settings: AuditSettings,
    ) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store), audit_settings.collection.clone());
        Self {
            store,
            audit,
            audit_settings,
            verifier,
        }
    }
}

impl<S: DocumentStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            audit: self.audit.clone(),
            audit_settings: self.audit_settings.clone(),
            verifier: Arc::clone(&self.verifier),
        }
    }
}
