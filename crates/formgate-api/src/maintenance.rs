//! One-off maintenance utilities touching shared data.
//!
//! These run outside the request-serving path but must uphold the same
//! storage contracts when rewriting documents.

use serde_json::{json, Map, Value};

use formgate_domain::time::RawTimestamp;
use formgate_storage::{collections, DocumentStore, StorageError, StorageResult};

/// Recomputes a parent record's rollup counter for one subform.
///
/// Counts the subrecords referencing `(record_id, subform_id)` and writes
/// `{value: <count>, type: "number"}` under the subform's name in the
/// record's `recordData` map, refreshing `updatedAt`.
///
/// Read-then-write with no transactional guarantee: a subrecord created or
/// deleted concurrently can be missed until the next recalculation. The
/// store offers no atomic increment, so the counter is advisory and this
/// utility is the reconciliation point.
pub async fn recalc_subrecord_count<S: DocumentStore>(
    store: &S,
    record_id: &str,
    subform_id: &str,
) -> StorageResult<usize> {
    let subform_name = store
        .get(collections::SUBFORMS, subform_id)
        .await?
        .and_then(|doc| {
            doc.data
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| subform_id.to_string());

    let count = store
        .find_field_eq(collections::SUBRECORDS, "record", &json!(record_id))
        .await?
        .into_iter()
        .filter(|doc| doc.data.get("subform") == Some(&json!(subform_id)))
        .count();

    let record = store
        .get(collections::RECORDS, record_id)
        .await?
        .ok_or_else(|| StorageError::DocumentNotFound {
            collection: collections::RECORDS.to_string(),
            id: record_id.to_string(),
        })?;

    let mut record_data = record
        .data
        .get("recordData")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    record_data.insert(
        subform_name,
        json!({ "value": count, "type": "number" }),
    );

    let mut patch = Map::new();
    patch.insert("recordData".to_string(), Value::Object(record_data));
    patch.insert(
        "updatedAt".to_string(),
        serde_json::to_value(RawTimestamp::now()).unwrap_or(Value::Null),
    );
    store.update(collections::RECORDS, record_id, patch).await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formgate_storage::{MemoryDocumentStore, NewDocument};

    fn doc_with(data: Value) -> NewDocument {
        NewDocument {
            data: data.as_object().cloned().unwrap(),
            ..NewDocument::default()
        }
    }

    async fn seed_subrecord(store: &MemoryDocumentStore, record: &str, subform: &str) {
        store
            .insert(
                collections::SUBRECORDS,
                doc_with(json!({"record": record, "subform": subform})),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_recalc_writes_counter_under_subform_name() {
        let store = MemoryDocumentStore::new();
        let subform_id = store
            .insert(collections::SUBFORMS, doc_with(json!({"name": "Inspections"})))
            .await
            .unwrap();
        let record_id = store
            .insert(
                collections::RECORDS,
                doc_with(json!({"recordData": {"Existing": {"type": "text", "value": "x"}}})),
            )
            .await
            .unwrap();

        seed_subrecord(&store, &record_id, &subform_id).await;
        seed_subrecord(&store, &record_id, &subform_id).await;
        seed_subrecord(&store, &record_id, "other-subform").await;
        seed_subrecord(&store, "other-record", &subform_id).await;

        let count = recalc_subrecord_count(&store, &record_id, &subform_id)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let record = store
            .get(collections::RECORDS, &record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            record.data["recordData"]["Inspections"],
            json!({"value": 2, "type": "number"})
        );
        // Pre-existing entries survive the rewrite.
        assert_eq!(
            record.data["recordData"]["Existing"]["value"],
            json!("x")
        );
        assert!(record.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_recalc_falls_back_to_subform_id_as_key() {
        let store = MemoryDocumentStore::new();
        let record_id = store
            .insert(collections::RECORDS, doc_with(json!({})))
            .await
            .unwrap();
        seed_subrecord(&store, &record_id, "ghost-subform").await;

        let count = recalc_subrecord_count(&store, &record_id, "ghost-subform")
            .await
            .unwrap();
        assert_eq!(count, 1);

        let record = store
            .get(collections::RECORDS, &record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            record.data["recordData"]["ghost-subform"]["value"],
            json!(1)
        );
    }

    #[tokio::test]
    async fn test_recalc_missing_record_fails() {
        let store = MemoryDocumentStore::new();
        let result = recalc_subrecord_count(&store, "ghost", "s1").await;
        assert!(matches!(
            result,
            Err(StorageError::DocumentNotFound { .. })
        ));
    }
}
