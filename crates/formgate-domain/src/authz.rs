//! The role-based authorization engine.
//!
//! [`authorize`] is a pure decision function over a principal, an action and
//! a [`ResourceOrgResolver`] capability that yields the org membership of
//! the targeted resource on demand. It performs no side effects: the caller
//! acts on the returned [`Decision`] and records an audit entry only after
//! an `Allow`.
//!
//! Denials deliberately carry no detail beyond their variant: a `view`
//! denial reports `NotFound` so that unauthorized callers cannot probe for
//! the existence of resources in other organizations, while mutations
//! report `Forbidden`.

use async_trait::async_trait;
use thiserror::Error;

use crate::orgset::{orgs_intersect, OrgSet};
use crate::principal::{Principal, Role};

/// The actions subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

/// The outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// The resource exists but the caller is excluded.
    Forbidden,
    /// Existence concealment: unauthorized viewers learn nothing.
    NotFound,
}

/// Errors raised while resolving the resource's org membership.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("resource org resolution failed: {message}")]
    Resolution { message: String },
}

/// Capability that yields the org membership owning the targeted resource.
///
/// Injected per route: existing documents resolve their stored org field;
/// create-style requests resolve the principal's own membership (a caller
/// may create on behalf of orgs they belong to, never others). `None` means
/// the resource has no membership (missing document included) and matches
/// nothing.
#[async_trait]
pub trait ResourceOrgResolver: Send + Sync {
    async fn resolve_orgs(&self) -> Result<Option<OrgSet>, AuthzError>;
}

/// An [`OrgSet`] (or its absence) is itself a resolver. Covers the
/// create path and tests.
#[async_trait]
impl ResourceOrgResolver for Option<OrgSet> {
    async fn resolve_orgs(&self) -> Result<Option<OrgSet>, AuthzError> {
        Ok(self.clone())
    }
}

/// Decides whether `principal` may perform `action` on the resource whose
/// membership `resolver` yields.
///
/// Role precedence, evaluated in order:
/// 1. `Admin` is always allowed; the resolver is never invoked.
/// 2. `Manager` and `Operator` may perform any action on resources whose
///    membership intersects their own; otherwise `view` conceals existence
///    (`NotFound`) and mutations report `Forbidden`.
/// 3. `User` may only `view`, under the same intersection rule; other
///    actions are `Forbidden` without invoking the resolver.
/// 4. A missing or unrecognized role is `Forbidden`.
pub async fn authorize(
    principal: &Principal,
    action: Action,
    resolver: &dyn ResourceOrgResolver,
) -> Result<Decision, AuthzError> {
    let role = match principal.role {
        Some(role) => role,
        None => return Ok(Decision::Forbidden),
    };

    if role == Role::Admin {
        return Ok(Decision::Allow);
    }

    if role == Role::User && action != Action::View {
        return Ok(Decision::Forbidden);
    }

    let resource_orgs = resolver.resolve_orgs().await?;
    let caller_orgs = principal.org_set();

    if orgs_intersect(Some(&caller_orgs), resource_orgs.as_ref()) {
        return Ok(Decision::Allow);
    }

    Ok(match action {
        Action::View => Decision::NotFound,
        _ => Decision::Forbidden,
    })
}
