//! Best-effort audit trail.
//!
//! Every authorized viewing and mutating call records one entry. Writes are
//! fire-and-forget: the recorder spawns the insert and the request never
//! waits on it; a failed write is logged and swallowed, never retried,
//! never surfaced to the caller. Entries are append-only and are read back
//! only by the audit listing endpoint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use formgate_domain::principal::Principal;
use formgate_domain::time::RawTimestamp;
use formgate_storage::{DocumentStore, NewDocument};

/// Audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    View,
    ViewList,
    Create,
    Edit,
    Delete,
}

/// Snapshot of the acting principal's claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditActor {
    pub uid: String,
    pub email: String,
    pub role: Option<String>,
    pub org: Vec<String>,
}

impl From<&Principal> for AuditActor {
    fn from(principal: &Principal) -> Self {
        Self {
            uid: principal.id.clone(),
            email: principal.email.clone(),
            role: principal.role.map(|r| r.as_str().to_string()),
            org: principal.orgs.clone(),
        }
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(rename = "resourceId", skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub actor: AuditActor,
    pub method: String,
    pub path: String,
    pub timestamp: RawTimestamp,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: Option<String>,
        principal: &Principal,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            action,
            resource_type: resource_type.into(),
            resource_id,
            actor: AuditActor::from(principal),
            method: method.into(),
            path: path.into(),
            timestamp: RawTimestamp::now(),
        }
    }
}

/// Fire-and-forget audit writer.
pub struct AuditRecorder<S> {
    store: Arc<S>,
    collection: String,
}

impl<S> Clone for AuditRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
        }
    }
}

impl<S: DocumentStore> AuditRecorder<S> {
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            store: Arc::clone(&store),
            collection: collection.into(),
        }
    }

    /// The collection receiving entries, exposed for the listing endpoint.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Records an entry without gating the caller.
    ///
    /// The write happens on a spawned task; errors (including entries that
    /// fail to serialize) are logged at `warn` and dropped.
    pub fn record(&self, entry: AuditEntry) {
        let doc = match entry_to_document(&entry) {
            Ok(doc) => doc,
            Err(message) => {
                warn!(%message, "audit entry failed to serialize; dropping");
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let collection = self.collection.clone();
        tokio::spawn(async move {
            if let Err(err) = store.insert(&collection, doc).await {
                warn!(error = %err, collection = %collection, "audit write failed; dropping entry");
            }
        });
    }
}

fn entry_to_document(entry: &AuditEntry) -> Result<NewDocument, String> {
    let value = serde_json::to_value(entry).map_err(|e| e.to_string())?;
    let data: Map<String, Value> = match value {
        Value::Object(map) => map,
        other => return Err(format!("audit entry serialized to non-object: {other}")),
    };
    Ok(NewDocument {
        data,
        ..NewDocument::default()
    })
}
