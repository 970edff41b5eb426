//! User directory endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

fn registration(email: &str, org: &[&str]) -> serde_json::Value {
    json!({
        "email": email,
        "password": "hunter2",
        "name": "Test Person",
        "role": "Operator",
        "org": org,
    })
}

#[tokio::test]
async fn test_register_requires_admin() {
    let app = test_app();
    for token in [MANAGER_A, OPERATOR_A, USER_A] {
        let (status, _) = app
            .post("/api/users/register", token, registration("p@example.com", &["A"]))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_register_validates_required_fields() {
    let app = test_app();
    let mut body = registration("p@example.com", &["A"]);
    body.as_object_mut().unwrap().remove("password");

    let (status, response) = app.post("/api/users/register", ADMIN, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], json!("Missing fields"));
}

#[tokio::test]
async fn test_register_creates_profile() {
    let app = test_app();
    let (status, body) = app
        .post("/api/users/register", ADMIN, registration("p@example.com", &["A"]))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uid = body["uid"].as_str().unwrap();

    let profile = app.store.get("users", uid).await.unwrap().unwrap();
    assert_eq!(profile.data["email"], json!("p@example.com"));
    assert_eq!(profile.data["role"], json!("Operator"));
    // The credential itself belongs to the identity service, not the profile.
    assert!(!profile.data.contains_key("password"));
}

#[tokio::test]
async fn test_list_users_is_org_scoped_for_managers() {
    let app = test_app();
    app.post("/api/users/register", ADMIN, registration("a@example.com", &["A"]))
        .await;
    app.post("/api/users/register", ADMIN, registration("z@example.com", &["Z"]))
        .await;

    let (status, body) = app.get("/api/users", MANAGER_A).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], json!("a@example.com"));
    assert_eq!(rows[0]["org"], json!(["A"]));
    assert_eq!(rows[0]["disabled"], json!(false));

    let (_, body) = app.get("/api/users", ADMIN).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_users_rejects_other_roles() {
    let app = test_app();
    for token in [OPERATOR_A, USER_A, NO_ROLE] {
        let (status, _) = app.get("/api/users", token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_delete_user_is_admin_only() {
    let app = test_app();
    let (_, body) = app
        .post("/api/users/register", ADMIN, registration("p@example.com", &["A"]))
        .await;
    let uid = body["uid"].as_str().unwrap().to_string();

    let (status, _) = app.delete(&format!("/api/users/{uid}"), MANAGER_A).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.delete(&format!("/api/users/{uid}"), ADMIN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("deleted"));
    assert!(app.store.get("users", &uid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_me_echoes_verified_claims() {
    let app = test_app();
    let (status, body) = app.get("/api/users/me", MANAGER_A).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["uid"], json!("mgr-1"));
    assert_eq!(body["user"]["email"], json!("mgr@example.com"));
    assert_eq!(body["user"]["role"], json!("Manager"));
    assert_eq!(body["user"]["org"], json!(["A"]));
}
