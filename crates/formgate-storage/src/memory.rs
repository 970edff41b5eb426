//! In-memory storage implementation.
//!
//! Backs tests and single-node deployments. Collections spring into
//! existence on first insert, matching the document store this interface
//! abstracts. Uses DashMap for thread-safe concurrent access without a
//! global lock; predicate scans are linear over the collection.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

use formgate_domain::orgset::OrgSet;
use formgate_domain::time::RawTimestamp;

use crate::error::{StorageError, StorageResult};
use crate::traits::{DocumentStore, NewDocument, StoredDocument};

/// In-memory implementation of [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, DashMap<String, StoredDocument>>,
}

impl MemoryDocumentStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn filtered(
        &self,
        collection: &str,
        predicate: impl Fn(&StoredDocument) -> bool,
    ) -> Vec<StoredDocument> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|entry| predicate(entry.value()))
                    .map(|entry| entry.value().clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, doc: NewDocument) -> StorageResult<String> {
        let id = ulid::Ulid::new().to_string();
        let stored = StoredDocument {
            id: id.clone(),
            org: doc.org,
            created_by: doc.created_by,
            created_at: doc.created_at.or_else(|| Some(RawTimestamp::now())),
            updated_at: doc.updated_at,
            data: doc.data,
        };
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), stored);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<StoredDocument>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).map(|entry| entry.value().clone())))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> StorageResult<()> {
        let docs = self
            .collections
            .get(collection)
            .ok_or_else(|| StorageError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        let mut entry = docs
            .get_mut(id)
            .ok_or_else(|| StorageError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        // Top-level merge: round-trip through the wire encoding so patched
        // keys land on the right struct field or in the data map.
        let mut wire = serde_json::to_value(&*entry).map_err(|e| StorageError::InvalidDocument {
            collection: collection.to_string(),
            message: e.to_string(),
        })?;
        if let Value::Object(obj) = &mut wire {
            for (key, value) in patch {
                obj.insert(key, value);
            }
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        *entry = serde_json::from_value(wire).map_err(|e| StorageError::InvalidDocument {
            collection: collection.to_string(),
            message: e.to_string(),
        })?;

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<()> {
        if let Some(docs) = self.collections.get(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn scan(&self, collection: &str) -> StorageResult<Vec<StoredDocument>> {
        Ok(self.filtered(collection, |_| true))
    }

    async fn find_org_contains_any(
        &self,
        collection: &str,
        orgs: &[String],
    ) -> StorageResult<Vec<StoredDocument>> {
        Ok(self.filtered(collection, |doc| match &doc.org {
            // Array predicate matches the array encoding only.
            Some(OrgSet::Many(members)) => members.iter().any(|m| orgs.contains(m)),
            _ => false,
        }))
    }

    async fn find_org_eq(
        &self,
        collection: &str,
        org: &str,
    ) -> StorageResult<Vec<StoredDocument>> {
        Ok(self.filtered(collection, |doc| match &doc.org {
            // Equality predicate matches the scalar encoding only.
            Some(OrgSet::One(member)) => member == org,
            _ => false,
        }))
    }

    async fn find_field_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StorageResult<Vec<StoredDocument>> {
        Ok(self.filtered(collection, |doc| doc.data.get(field) == Some(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_doc(org: Option<OrgSet>, data: Value) -> NewDocument {
        NewDocument {
            org,
            created_by: Some("tester@example.com".to_string()),
            created_at: None,
            updated_at: None,
            data: data.as_object().cloned().unwrap_or_default(),
        }
    }

    fn array_org(orgs: &[&str]) -> Option<OrgSet> {
        Some(OrgSet::Many(orgs.iter().map(|s| s.to_string()).collect()))
    }

    fn scalar_org(org: &str) -> Option<OrgSet> {
        Some(OrgSet::One(org.to_string()))
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert("records", new_doc(array_org(&["a"]), json!({"name": "first"})))
            .await
            .unwrap();

        let doc = store.get("records", &id).await.unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.data["name"], json!("first"));
        assert!(doc.created_at.is_some(), "createdAt is stamped on insert");
    }

    #[tokio::test]
    async fn test_insert_preserves_caller_created_at() {
        let store = MemoryDocumentStore::new();
        let mut doc = new_doc(None, json!({}));
        doc.created_at = Some(RawTimestamp::Text("2020-01-01T00:00:00Z".to_string()));

        let id = store.insert("records", doc).await.unwrap();
        let stored = store.get("records", &id).await.unwrap().unwrap();
        assert_eq!(
            stored.created_at,
            Some(RawTimestamp::Text("2020-01-01T00:00:00Z".to_string()))
        );
    }

    #[tokio::test]
    async fn test_get_missing_document_is_none() {
        let store = MemoryDocumentStore::new();
        assert!(store.get("records", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_merges_top_level_fields() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert(
                "records",
                new_doc(array_org(&["a"]), json!({"name": "first", "keep": true})),
            )
            .await
            .unwrap();

        let patch = json!({"name": "renamed", "updatedAt": "2024-06-01T00:00:00Z"});
        store
            .update("records", &id, patch.as_object().cloned().unwrap())
            .await
            .unwrap();

        let doc = store.get("records", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["name"], json!("renamed"));
        assert_eq!(doc.data["keep"], json!(true));
        assert_eq!(
            doc.updated_at,
            Some(RawTimestamp::Text("2024-06-01T00:00:00Z".to_string()))
        );
    }

    #[tokio::test]
    async fn test_update_can_rewrite_org_encoding() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert("records", new_doc(scalar_org("a"), json!({})))
            .await
            .unwrap();

        store
            .update(
                "records",
                &id,
                json!({"org": ["a", "b"]}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        let doc = store.get("records", &id).await.unwrap().unwrap();
        assert_eq!(doc.org, array_org(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let result = store.update("records", "nope", Map::new()).await;
        assert!(matches!(
            result,
            Err(StorageError::DocumentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert("records", new_doc(None, json!({})))
            .await
            .unwrap();

        store.delete("records", &id).await.unwrap();
        assert!(store.get("records", &id).await.unwrap().is_none());

        // Deleting again (or an unknown id) still succeeds.
        store.delete("records", &id).await.unwrap();
        store.delete("records", "never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_returns_all_documents() {
        let store = MemoryDocumentStore::new();
        for i in 0..3 {
            store
                .insert("forms", new_doc(None, json!({"i": i})))
                .await
                .unwrap();
        }
        assert_eq!(store.scan("forms").await.unwrap().len(), 3);
        assert!(store.scan("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_array_predicate_ignores_scalar_encoding() {
        let store = MemoryDocumentStore::new();
        store
            .insert("records", new_doc(array_org(&["a", "b"]), json!({"k": "arr"})))
            .await
            .unwrap();
        store
            .insert("records", new_doc(scalar_org("a"), json!({"k": "scalar"})))
            .await
            .unwrap();

        let hits = store
            .find_org_contains_any("records", &["a".to_string()])
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].data["k"], json!("arr"));
    }

    #[tokio::test]
    async fn test_eq_predicate_ignores_array_encoding() {
        let store = MemoryDocumentStore::new();
        store
            .insert("records", new_doc(array_org(&["a"]), json!({"k": "arr"})))
            .await
            .unwrap();
        store
            .insert("records", new_doc(scalar_org("a"), json!({"k": "scalar"})))
            .await
            .unwrap();

        let hits = store.find_org_eq("records", "a").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].data["k"], json!("scalar"));
    }

    #[tokio::test]
    async fn test_find_field_eq() {
        let store = MemoryDocumentStore::new();
        store
            .insert("subrecords", new_doc(None, json!({"record": "r1", "subform": "s1"})))
            .await
            .unwrap();
        store
            .insert("subrecords", new_doc(None, json!({"record": "r1", "subform": "s2"})))
            .await
            .unwrap();
        store
            .insert("subrecords", new_doc(None, json!({"record": "r2", "subform": "s1"})))
            .await
            .unwrap();

        let hits = store
            .find_field_eq("subrecords", "record", &json!("r1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_document_wire_round_trip_flattens_data() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert(
                "records",
                new_doc(array_org(&["a"]), json!({"recordData": {"Qty": {"type": "number", "value": 2}}})),
            )
            .await
            .unwrap();

        let doc = store.get("records", &id).await.unwrap().unwrap();
        let wire = serde_json::to_value(&doc).unwrap();

        // Data keys sit beside the envelope fields, not nested under "data".
        assert_eq!(wire["org"], json!(["a"]));
        assert_eq!(wire["recordData"]["Qty"]["value"], json!(2));
        assert!(wire.get("data").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_are_all_kept() {
        let store = MemoryDocumentStore::new_shared();
        let mut handles = Vec::new();
        for i in 0..100 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert("records", new_doc(None, json!({"i": i})))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.scan("records").await.unwrap().len(), 100);
    }
}
