//! HTTP route definitions and handlers.

use std::cmp::Reverse;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, OriginalUri, Path, Query, Request, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::limit::RequestBodyLimitLayer;

use formgate_domain::authz::{authorize, Action};
use formgate_domain::orgset::{orgs_intersect, OrgSet};
use formgate_domain::page::{paginate, Page};
use formgate_domain::principal::{Principal, Role};
use formgate_domain::time::{normalize_value, to_rfc3339_or_now, RawTimestamp};
use formgate_storage::{collections, fetch_by_any_org, DocumentStore, NewDocument, StoredDocument};
use formgate_server::{AuditAction, AuditEntry};

use super::error::{require_allowed, ApiError};
use super::state::AppState;
use crate::auth::AuthPrincipal;
use crate::resolvers::DocumentOrgs;

/// Fixed page size for the paginated listings.
const PAGE_SIZE: usize = 10;

/// Default request body size limit (20 MB; image fields may carry data URIs).
pub const DEFAULT_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// The four org-owned resource kinds served by the generic CRUD surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Forms,
    Subforms,
    Records,
    Subrecords,
}

impl ResourceKind {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "forms" => Some(ResourceKind::Forms),
            "subforms" => Some(ResourceKind::Subforms),
            "records" => Some(ResourceKind::Records),
            "subrecords" => Some(ResourceKind::Subrecords),
            _ => None,
        }
    }

    fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Forms => collections::FORMS,
            ResourceKind::Subforms => collections::SUBFORMS,
            ResourceKind::Records => collections::RECORDS,
            ResourceKind::Subrecords => collections::SUBRECORDS,
        }
    }

    /// Form definitions take their org from the creator; record payloads may
    /// carry an org of their own (bulk import stamps the form's org).
    fn org_from_payload(&self) -> bool {
        matches!(self, ResourceKind::Records | ResourceKind::Subrecords)
    }

    /// Form-shaped payloads arrive as `lines[].fields` and are flattened.
    fn flattens_lines(&self) -> bool {
        matches!(self, ResourceKind::Forms | ResourceKind::Subforms)
    }
}

/// JSON extractor that reports deserialization failures as 400 with the
/// `{"error": ...}` body, preserving 413 for body-limit rejections.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };
                Err(ApiError::new(status, rejection.body_text()))
            }
        }
    }
}

/// Creates the HTTP router with the default body size limit.
pub fn create_router<S: DocumentStore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S: DocumentStore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    let shared_state = Arc::new(state);
    Router::new()
        // Directory endpoints (static segments win over :kind)
        .route("/api/users/register", post(register_user::<S>))
        .route("/api/users/me", get(current_user::<S>))
        .route("/api/users", get(list_users::<S>))
        .route("/api/users/:id", delete(delete_user::<S>))
        // Audit trail
        .route("/api/logs", get(list_logs::<S>))
        // Org-owned resource kinds
        .route(
            "/api/:kind",
            post(create_resource::<S>).get(list_resources::<S>),
        )
        .route("/api/:kind/page/:page", get(list_resources_paginated::<S>))
        .route(
            "/api/:kind/:id",
            get(get_resource::<S>)
                .put(update_resource::<S>)
                .delete(delete_resource::<S>),
        )
        // Liveness
        .route("/health", get(health_check))
        .with_state(shared_state)
        .layer(RequestBodyLimitLayer::new(body_limit))
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Health
// ============================================================

/// Liveness probe; no auth, no dependencies.
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "message": "formgate API is running" }))
}

// ============================================================
// Resource CRUD
// ============================================================

async fn create_resource<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(kind): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    JsonBadRequest(body): JsonBadRequest<Value>,
) -> ApiResult<impl IntoResponse> {
    let kind = ResourceKind::parse(&kind).ok_or_else(ApiError::not_found)?;

    // Creation is always on behalf of the caller's own orgs.
    let own_orgs = Some(principal.org_set());
    require_allowed(authorize(&principal, Action::Create, &own_orgs).await?)?;

    let mut data = match body {
        Value::Object(map) => map,
        _ => return Err(ApiError::validation("expected a JSON object")),
    };

    if kind.flattens_lines() {
        flatten_lines(&mut data);
    }

    let org = if kind.org_from_payload() {
        match data.remove("org") {
            Some(value) => normalize_org_input(value),
            None => principal.non_empty_orgs(),
        }
    } else {
        data.remove("org");
        principal.non_empty_orgs()
    };

    let created_by = data
        .remove("createdBy")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| principal.email.clone());

    // Timestamps are minted here, never taken from the payload.
    data.remove("createdAt");
    data.remove("updatedAt");
    let now = RawTimestamp::now();

    let doc = NewDocument {
        org: Some(OrgSet::Many(org)),
        created_by: Some(created_by),
        created_at: Some(now.clone()),
        updated_at: Some(now),
        data,
    };

    let id = state.store.insert(kind.collection(), doc).await?;

    state.audit.record(AuditEntry::new(
        AuditAction::Create,
        kind.collection(),
        Some(id.clone()),
        &principal,
        method.as_str(),
        uri.path(),
    ));

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn list_resources<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(kind): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<impl IntoResponse> {
    let kind = ResourceKind::parse(&kind).ok_or_else(ApiError::not_found)?;

    let docs = visible_documents(&state, &principal, kind).await?;

    state.audit.record(AuditEntry::new(
        AuditAction::ViewList,
        kind.collection(),
        None,
        &principal,
        method.as_str(),
        uri.path(),
    ));

    Ok(Json(docs))
}

async fn list_resources_paginated<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((kind, page)): Path<(String, String)>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Page<StoredDocument>>> {
    let kind = ResourceKind::parse(&kind).ok_or_else(ApiError::not_found)?;
    let page = page.parse::<usize>().unwrap_or(1);

    let docs = visible_documents(&state, &principal, kind).await?;
    let page = paginate(docs, page, PAGE_SIZE, StoredDocument::created_sort_key);

    state.audit.record(AuditEntry::new(
        AuditAction::ViewList,
        kind.collection(),
        None,
        &principal,
        method.as_str(),
        uri.path(),
    ));

    Ok(Json(page))
}

async fn get_resource<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((kind, id)): Path<(String, String)>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<impl IntoResponse> {
    let kind = ResourceKind::parse(&kind).ok_or_else(ApiError::not_found)?;

    let resolver = DocumentOrgs::new(Arc::clone(&state.store), kind.collection(), id.as_str());
    require_allowed(authorize(&principal, Action::View, &resolver).await?)?;

    let doc = state
        .store
        .get(kind.collection(), &id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    state.audit.record(AuditEntry::new(
        AuditAction::View,
        kind.collection(),
        Some(id),
        &principal,
        method.as_str(),
        uri.path(),
    ));

    Ok(Json(doc))
}

async fn update_resource<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((kind, id)): Path<(String, String)>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    JsonBadRequest(body): JsonBadRequest<Value>,
) -> ApiResult<impl IntoResponse> {
    let kind = ResourceKind::parse(&kind).ok_or_else(ApiError::not_found)?;

    let resolver = DocumentOrgs::new(Arc::clone(&state.store), kind.collection(), id.as_str());
    require_allowed(authorize(&principal, Action::Edit, &resolver).await?)?;

    let mut patch = match body {
        Value::Object(map) => map,
        _ => return Err(ApiError::validation("expected a JSON object")),
    };
    patch.remove("id");
    patch.insert(
        "updatedAt".to_string(),
        serde_json::to_value(RawTimestamp::now()).unwrap_or(Value::Null),
    );

    state.store.update(kind.collection(), &id, patch).await?;

    state.audit.record(AuditEntry::new(
        AuditAction::Edit,
        kind.collection(),
        Some(id),
        &principal,
        method.as_str(),
        uri.path(),
    ));

    Ok(Json(json!({ "status": "updated" })))
}

async fn delete_resource<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((kind, id)): Path<(String, String)>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<impl IntoResponse> {
    let kind = ResourceKind::parse(&kind).ok_or_else(ApiError::not_found)?;

    let resolver = DocumentOrgs::new(Arc::clone(&state.store), kind.collection(), id.as_str());
    require_allowed(authorize(&principal, Action::Delete, &resolver).await?)?;

    // Idempotent; children are not cascaded, orphans are accepted state.
    state.store.delete(kind.collection(), &id).await?;

    state.audit.record(AuditEntry::new(
        AuditAction::Delete,
        kind.collection(),
        Some(id),
        &principal,
        method.as_str(),
        uri.path(),
    ));

    Ok(Json(json!({ "status": "deleted" })))
}

/// The caller's visible slice of a collection.
///
/// Admin bypasses the merge engine and scans the full collection; everyone
/// else goes through the org predicate union. A non-admin caller with no
/// org claims gets an empty result rather than an error.
async fn visible_documents<S: DocumentStore>(
    state: &AppState<S>,
    principal: &Principal,
    kind: ResourceKind,
) -> ApiResult<Vec<StoredDocument>> {
    if principal.is_admin() {
        return Ok(state.store.scan(kind.collection()).await?);
    }

    let orgs = principal.non_empty_orgs();
    if orgs.is_empty() {
        // Role gating still applies before degrading to an empty result.
        if principal.role.is_none() {
            return Err(ApiError::forbidden());
        }
        return Ok(Vec::new());
    }

    require_allowed(
        authorize(
            principal,
            Action::View,
            &Some(OrgSet::Many(orgs.clone())),
        )
        .await?,
    )?;

    Ok(fetch_by_any_org(state.store.as_ref(), kind.collection(), &orgs).await)
}

/// Flattens the form editor's `lines[].fields` payload into a flat `fields`
/// array, the shape stored on form and subform documents.
fn flatten_lines(data: &mut Map<String, Value>) {
    let Some(Value::Array(lines)) = data.remove("lines") else {
        return;
    };
    let mut fields = Vec::new();
    for line in lines {
        if let Value::Object(mut line) = line {
            if let Some(Value::Array(line_fields)) = line.remove("fields") {
                fields.extend(line_fields);
            }
        }
    }
    data.insert("fields".to_string(), Value::Array(fields));
}

/// Normalizes a payload org value to the array encoding, dropping null-ish
/// entries so non-admin queries can always see what they create.
fn normalize_org_input(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s],
        _ => Vec::new(),
    }
}

// ============================================================
// Audit log listing
// ============================================================

#[derive(Debug, Deserialize)]
struct LogsQuery {
    #[serde(default)]
    limit: Option<usize>,
}

/// Methods that appear in the audit listing; reads are recorded but not shown.
const AUDITED_METHODS: [&str; 3] = ["POST", "PUT", "DELETE"];

async fn list_logs<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<LogsQuery>,
) -> ApiResult<impl IntoResponse> {
    // Admin sees everything; Manager sees their own orgs' actors.
    if !matches!(principal.role, Some(Role::Admin) | Some(Role::Manager)) {
        return Err(ApiError::forbidden());
    }

    let settings = &state.audit_settings;
    let limit = query
        .limit
        .unwrap_or(settings.list_limit_default)
        .min(settings.list_limit_max);

    let mut entries = state.store.scan(state.audit.collection()).await?;
    entries.sort_by_key(|doc| {
        Reverse(normalize_value(
            doc.data.get("timestamp").unwrap_or(&Value::Null),
        ))
    });
    entries.truncate(limit);

    let caller_orgs = OrgSet::Many(principal.non_empty_orgs());
    let is_manager = principal.role == Some(Role::Manager);

    let data: Vec<Value> = entries
        .into_iter()
        .filter(|doc| {
            doc.data
                .get("method")
                .and_then(Value::as_str)
                .map(|m| AUDITED_METHODS.contains(&m))
                .unwrap_or(false)
        })
        .filter(|doc| {
            if !is_manager {
                return true;
            }
            let actor_org = doc
                .data
                .get("actor")
                .and_then(|actor| actor.get("org"))
                .cloned()
                .and_then(|v| serde_json::from_value::<OrgSet>(v).ok());
            orgs_intersect(Some(&caller_orgs), actor_org.as_ref())
        })
        .map(render_log_entry)
        .collect();

    Ok(Json(json!({ "data": data })))
}

/// Renders one audit document with its timestamp normalized to RFC 3339.
/// Undecipherable timestamps display as the current instant; the fallback
/// is never written back.
fn render_log_entry(doc: StoredDocument) -> Value {
    let raw = doc
        .data
        .get("timestamp")
        .cloned()
        .and_then(|v| serde_json::from_value::<RawTimestamp>(v).ok());
    let timestamp = to_rfc3339_or_now(raw.as_ref());

    let mut entry = doc.data;
    entry.insert("id".to_string(), Value::String(doc.id));
    entry.insert("timestamp".to_string(), Value::String(timestamp));
    Value::Object(entry)
}

// ============================================================
// User directory
// ============================================================

/// Creates a user profile with role and org claims.
///
/// The identity credential itself (password handling, token minting) is the
/// external identity service's concern; this endpoint validates the request
/// shape and persists the directory profile.
async fn register_user<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    method: Method,
    OriginalUri(uri): OriginalUri,
    JsonBadRequest(body): JsonBadRequest<Value>,
) -> ApiResult<impl IntoResponse> {
    if !principal.is_admin() {
        return Err(ApiError::forbidden());
    }

    let required = ["email", "password", "name", "role", "org"];
    let missing = required.iter().any(|key| {
        body.get(key)
            .map(|v| v.is_null() || v.as_str() == Some(""))
            .unwrap_or(true)
    });
    if missing {
        return Err(ApiError::validation("Missing fields"));
    }

    let mut data = Map::new();
    for key in ["name", "email", "role"] {
        data.insert(key.to_string(), body[key].clone());
    }
    let org = normalize_org_input(body["org"].clone());

    let doc = NewDocument {
        org: Some(OrgSet::Many(org)),
        created_by: Some(principal.email.clone()),
        data,
        ..NewDocument::default()
    };
    let uid = state.store.insert(collections::USERS, doc).await?;

    state.audit.record(AuditEntry::new(
        AuditAction::Create,
        collections::USERS,
        Some(uid.clone()),
        &principal,
        method.as_str(),
        uri.path(),
    ));

    Ok((StatusCode::CREATED, Json(json!({ "uid": uid }))))
}

/// Echo of the verified principal's claims.
async fn current_user<S: DocumentStore>(
    State(_state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(json!({
        "user": {
            "uid": principal.id,
            "email": principal.email,
            "role": principal.role.map(|r| r.as_str()),
            "org": principal.orgs,
        }
    })))
}

/// Lists directory profiles. Admin sees all; Manager sees profiles whose
/// org intersects their own.
async fn list_users<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
) -> ApiResult<impl IntoResponse> {
    if !matches!(principal.role, Some(Role::Admin) | Some(Role::Manager)) {
        return Err(ApiError::forbidden());
    }

    let caller_orgs = OrgSet::Many(principal.non_empty_orgs());
    let profiles = state.store.scan(collections::USERS).await?;

    let data: Vec<Value> = profiles
        .into_iter()
        .filter(|doc| {
            principal.is_admin() || orgs_intersect(Some(&caller_orgs), doc.org.as_ref())
        })
        .map(|doc| {
            json!({
                "id": doc.id,
                "name": doc.data.get("name").cloned().unwrap_or(json!("")),
                "email": doc.data.get("email").cloned().unwrap_or(json!("")),
                "role": doc.data.get("role").cloned().unwrap_or(json!("")),
                "org": doc.org.map(OrgSet::into_vec).unwrap_or_default(),
                "disabled": doc.data.get("disabled").cloned().unwrap_or(json!(false)),
            })
        })
        .collect();

    Ok(Json(json!({ "data": data })))
}

/// Deletes a directory profile. Admin only; the profile cleanup mirrors the
/// identity-service deletion and is idempotent.
async fn delete_user<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<impl IntoResponse> {
    if !principal.is_admin() {
        return Err(ApiError::forbidden());
    }
    if id.is_empty() {
        return Err(ApiError::validation("Missing user id"));
    }

    state.store.delete(collections::USERS, &id).await?;

    state.audit.record(AuditEntry::new(
        AuditAction::Delete,
        collections::USERS,
        Some(id),
        &principal,
        method.as_str(),
        uri.path(),
    ));

    Ok(Json(json!({ "status": "deleted" })))
}
