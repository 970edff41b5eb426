//! DocumentStore trait definition.
//!
//! The persistent store is an external collaborator: it must support
//! create/read/update/delete by id and predicate-based collection scans
//! returning unordered result sets. Nothing here sorts or paginates; that
//! happens in application memory after the merge step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use formgate_domain::orgset::OrgSet;
use formgate_domain::time::{normalize_optional, RawTimestamp};

use crate::error::StorageResult;

/// Collection names used by the service.
pub mod collections {
    pub const FORMS: &str = "forms";
    pub const SUBFORMS: &str = "subforms";
    pub const RECORDS: &str = "records";
    pub const SUBRECORDS: &str = "subrecords";
    pub const USERS: &str = "users";
    pub const AUDIT_LOGS: &str = "auditLogs";
}

/// A stored document.
///
/// The org field and the timestamps keep their legacy wire encodings
/// ([`OrgSet`] tolerates scalar and array, [`RawTimestamp`] the three
/// historical timestamp shapes); everything else lives in the schemaless
/// `data` map, flattened on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<OrgSet>,
    #[serde(
        default,
        rename = "createdBy",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_by: Option<String>,
    #[serde(
        default,
        rename = "createdAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<RawTimestamp>,
    #[serde(
        default,
        rename = "updatedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<RawTimestamp>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl StoredDocument {
    /// Sort key for createdAt-descending listings.
    pub fn created_sort_key(&self) -> i64 {
        normalize_optional(self.created_at.as_ref())
    }
}

/// A document about to be inserted; the store mints the id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<OrgSet>,
    #[serde(
        default,
        rename = "createdBy",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_by: Option<String>,
    #[serde(
        default,
        rename = "createdAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<RawTimestamp>,
    #[serde(
        default,
        rename = "updatedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<RawTimestamp>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Abstract storage interface for the document collections.
///
/// Implementations must be thread-safe (Send + Sync) and support async
/// operations. Predicate scans return unordered results; the two org
/// predicates mirror the backing store's semantics, where an array
/// predicate never matches scalar-encoded fields and vice versa.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Inserts a document, minting its id. `createdAt` is stamped with the
    /// current instant when absent.
    async fn insert(&self, collection: &str, doc: NewDocument) -> StorageResult<String>;

    /// Gets a document by id.
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<StoredDocument>>;

    /// Merges `patch` into the document's top-level fields.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> StorageResult<()>;

    /// Deletes a document. Idempotent: deleting an absent id succeeds.
    async fn delete(&self, collection: &str, id: &str) -> StorageResult<()>;

    /// Full unordered scan of a collection.
    async fn scan(&self, collection: &str) -> StorageResult<Vec<StoredDocument>>;

    /// Documents whose org field is the array encoding and shares at least
    /// one element with `orgs`.
    async fn find_org_contains_any(
        &self,
        collection: &str,
        orgs: &[String],
    ) -> StorageResult<Vec<StoredDocument>>;

    /// Documents whose org field is the scalar encoding equal to `org`.
    async fn find_org_eq(
        &self,
        collection: &str,
        org: &str,
    ) -> StorageResult<Vec<StoredDocument>>;

    /// Documents whose top-level `field` equals `value`. Used by the
    /// rollup-counter recalculation utility.
    async fn find_field_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StorageResult<Vec<StoredDocument>>;
}
