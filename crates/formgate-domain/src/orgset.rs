//! Organization membership values and intersection matching.
//!
//! Every owned resource carries an org field that is legally stored either
//! as a bare string or as an array of strings; both encodings describe the
//! same logical membership and all read paths must tolerate both. Access is
//! granted when the caller's membership shares at least one identifier with
//! the resource's.
//!
//! Matching is case-sensitive exact string comparison. No trimming or case
//! folding is applied (known limitation, preserved deliberately).

use serde::{Deserialize, Serialize};

/// The org membership attached to a resource or principal.
///
/// Deserializes from either a JSON string or a JSON array of strings, the
/// two encodings observed in stored documents. `null`/absent is represented
/// as `Option<OrgSet>` at rest and treated as the empty set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrgSet {
    One(String),
    Many(Vec<String>),
}

impl OrgSet {
    /// Iterates the member identifiers regardless of encoding.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            OrgSet::One(org) => std::slice::from_ref(org),
            OrgSet::Many(orgs) => orgs.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    /// Consumes the value into the array encoding.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OrgSet::One(org) => vec![org],
            OrgSet::Many(orgs) => orgs,
        }
    }

    /// True iff `self` and `other` share at least one identifier.
    ///
    /// Pure and total; symmetric in its operands.
    pub fn intersects(&self, other: &OrgSet) -> bool {
        self.iter().any(|a| other.iter().any(|b| a == b))
    }
}

/// Intersection over optional operands: `None` is the empty set and
/// intersects nothing.
pub fn orgs_intersect(a: Option<&OrgSet>, b: Option<&OrgSet>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.intersects(b),
        _ => false,
    }
}
