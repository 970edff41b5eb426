//! formgate-storage: Document persistence for the formgate service
//!
//! This crate defines the boundary to the external document store and ships
//! the in-memory reference implementation used by tests and single-node
//! deployments:
//! - [`DocumentStore`] - create/read/update/delete by id plus predicate scans
//! - [`MemoryDocumentStore`] - DashMap-backed implementation
//! - [`fetch_by_any_org`] - the multi-predicate org query merge engine

pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryDocumentStore;
pub use query::fetch_by_any_org;
pub use traits::{collections, DocumentStore, NewDocument, StoredDocument};
