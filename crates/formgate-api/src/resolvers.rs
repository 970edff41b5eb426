//! Per-route resource-org resolvers.
//!
//! Each route injects a [`ResourceOrgResolver`] telling the authorization
//! engine whose membership governs the request: an existing document's
//! stored org field for id routes, or the caller's own membership for
//! create and list routes (an `Option<OrgSet>` is itself a resolver for
//! that case). The lookup is deferred so that Admin requests, which
//! short-circuit, never touch the store.

use std::sync::Arc;

use async_trait::async_trait;

use formgate_domain::authz::{AuthzError, ResourceOrgResolver};
use formgate_domain::orgset::OrgSet;
use formgate_storage::DocumentStore;

/// Resolves the org membership of a stored document.
///
/// A missing document yields no membership, which intersects nothing; the
/// engine then conceals existence for viewers.
pub struct DocumentOrgs<S> {
    store: Arc<S>,
    collection: &'static str,
    id: String,
}

impl<S> DocumentOrgs<S> {
    pub fn new(store: Arc<S>, collection: &'static str, id: impl Into<String>) -> Self {
        Self {
            store,
            collection,
            id: id.into(),
        }
    }
}

#[async_trait]
impl<S: DocumentStore> ResourceOrgResolver for DocumentOrgs<S> {
    async fn resolve_orgs(&self) -> Result<Option<OrgSet>, AuthzError> {
        let doc = self
            .store
            .get(self.collection, &self.id)
            .await
            .map_err(|err| AuthzError::Resolution {
                message: err.to_string(),
            })?;
        Ok(doc.and_then(|d| d.org))
    }
}
