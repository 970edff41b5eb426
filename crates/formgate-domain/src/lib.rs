//! formgate-domain: Core domain logic for the formgate service
//!
//! This crate contains the pure decision logic shared by every layer:
//! - Principal model built from verified identity claims
//! - Org-set intersection matching
//! - The role-based authorization engine
//! - The record field-type taxonomy and input coercion
//! - Timestamp normalization and in-memory pagination
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               formgate-domain                │
//! ├─────────────────────────────────────────────┤
//! │  principal  - Roles and verified claims      │
//! │  orgset     - Scalar-or-array org membership │
//! │  authz      - Allow/Forbidden/NotFound engine│
//! │  fields/    - Field taxonomy and coercion    │
//! │  time       - Legacy timestamp normalization │
//! │  page       - Sort-then-slice pagination     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod authz;
pub mod error;
pub mod fields;
pub mod orgset;
pub mod page;
pub mod principal;
pub mod time;

// Re-export commonly used types at the crate root
pub use authz::{authorize, Action, AuthzError, Decision, ResourceOrgResolver};
pub use error::{DomainError, DomainResult};
pub use orgset::OrgSet;
pub use principal::{Claims, Principal, Role};
