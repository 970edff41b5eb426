//! Principals and roles.
//!
//! A [`Principal`] is built once per request from the claims of a verified
//! bearer token. This crate never mints or persists principals; the `role`
//! and `org` claims come from the external identity service as-is.

use serde::{Deserialize, Serialize};

use crate::orgset::OrgSet;

/// The four roles recognized by the authorization engine.
///
/// Any other claim value is kept as `None` on the principal and denied by
/// the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Operator,
    User,
}

impl Role {
    /// Parses a role claim string. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Admin" => Some(Role::Admin),
            "Manager" => Some(Role::Manager),
            "Operator" => Some(Role::Operator),
            "User" => Some(Role::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Operator => "Operator",
            Role::User => "User",
        }
    }
}

/// Raw claims produced by the external token verifier.
///
/// The `org` claim may legally be a bare string or an array of strings; both
/// deserialize into [`OrgSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub org: Option<OrgSet>,
}

/// A verified caller. Created per-request, never persisted.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub role: Option<Role>,
    pub orgs: Vec<String>,
}

impl Principal {
    /// Builds a principal from verified claims.
    pub fn from_claims(claims: Claims) -> Self {
        let orgs = claims
            .org
            .map(|o| o.into_vec())
            .unwrap_or_default();
        Self {
            id: claims.uid,
            email: claims.email.unwrap_or_default(),
            role: claims.role.as_deref().and_then(Role::parse),
            orgs,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// The caller's org memberships with null-ish entries dropped.
    ///
    /// Legacy tokens carry empty-string org claims; those never participate
    /// in queries or intersection checks.
    pub fn non_empty_orgs(&self) -> Vec<String> {
        self.orgs
            .iter()
            .filter(|o| !o.is_empty())
            .cloned()
            .collect()
    }

    /// The caller's own membership as an [`OrgSet`], used as the resource
    /// org set for create-style authorizations.
    pub fn org_set(&self) -> OrgSet {
        OrgSet::Many(self.orgs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parse_known_values() {
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse("Operator"), Some(Role::Operator));
        assert_eq!(Role::parse("User"), Some(Role::User));
    }

    #[test]
    fn test_role_parse_is_case_sensitive() {
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse("MANAGER"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("SuperUser"), None);
    }

    #[test]
    fn test_claims_org_accepts_scalar_and_array() {
        let scalar: Claims =
            serde_json::from_value(json!({"uid": "u1", "org": "acme"})).unwrap();
        let array: Claims =
            serde_json::from_value(json!({"uid": "u2", "org": ["acme", "globex"]})).unwrap();

        assert_eq!(Principal::from_claims(scalar).orgs, vec!["acme"]);
        assert_eq!(
            Principal::from_claims(array).orgs,
            vec!["acme", "globex"]
        );
    }

    #[test]
    fn test_missing_claims_yield_empty_principal_fields() {
        let claims: Claims = serde_json::from_value(json!({"uid": "u1"})).unwrap();
        let principal = Principal::from_claims(claims);

        assert_eq!(principal.email, "");
        assert_eq!(principal.role, None);
        assert!(principal.orgs.is_empty());
        assert!(!principal.is_admin());
    }

    #[test]
    fn test_non_empty_orgs_drops_blank_entries() {
        let claims: Claims =
            serde_json::from_value(json!({"uid": "u1", "org": ["acme", "", "globex"]})).unwrap();
        let principal = Principal::from_claims(claims);

        assert_eq!(principal.non_empty_orgs(), vec!["acme", "globex"]);
    }
}
