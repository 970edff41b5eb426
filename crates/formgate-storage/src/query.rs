//! Multi-predicate org query merge engine.
//!
//! The org field of a stored document may be scalar- or array-encoded, and
//! the backing store cannot express "org intersects any of N values" over
//! both encodings as one predicate without a composite index per
//! combination. The engine approximates the union with one
//! array-contains-any predicate plus one equality predicate per org, runs
//! them concurrently and merges the results by document id so a document
//! matched by several predicates appears exactly once.
//!
//! A predicate that fails (an unsupported index, a transient backend error)
//! degrades to zero results from that predicate; the union of the others is
//! still returned.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::warn;

use crate::traits::{DocumentStore, StoredDocument};

/// Fetches every document in `collection` whose org membership intersects
/// `orgs`, regardless of stored encoding.
///
/// Empty `orgs` short-circuits to an empty result without issuing any
/// query. Admin callers bypass this engine entirely and scan the full
/// collection.
pub async fn fetch_by_any_org<S>(
    store: &S,
    collection: &str,
    orgs: &[String],
) -> Vec<StoredDocument>
where
    S: DocumentStore + ?Sized,
{
    if orgs.is_empty() {
        return Vec::new();
    }

    let array_predicate = store.find_org_contains_any(collection, orgs);
    let eq_predicates = join_all(orgs.iter().map(|org| store.find_org_eq(collection, org)));

    // Fan-out/fan-in: the predicates are independent read-only queries with
    // no ordering guarantee between their completions.
    let (array_result, eq_results) = futures::join!(array_predicate, eq_predicates);

    let mut merged: HashMap<String, StoredDocument> = HashMap::new();

    match array_result {
        Ok(docs) => {
            for doc in docs {
                merged.insert(doc.id.clone(), doc);
            }
        }
        Err(err) => warn!(collection, error = %err, "array org predicate failed; degrading"),
    }

    for result in eq_results {
        match result {
            Ok(docs) => {
                for doc in docs {
                    merged.insert(doc.id.clone(), doc);
                }
            }
            Err(err) => warn!(collection, error = %err, "org equality predicate failed; degrading"),
        }
    }

    merged.into_values().collect()
}
