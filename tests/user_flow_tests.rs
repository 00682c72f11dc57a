//! End-to-end registration and login flows, including the cookie handed back
//! alongside the token and the error bodies for bad credentials and payloads.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use taskboard::config::Config;
use taskboard::server::{build_router, AppState};
use taskboard::storage::SqliteStore;

fn app() -> Router {
    let config = Config { http_port: 0, db_path: ":memory:".into(), jwt_secret: "flow-test-secret".into() };
    let store = SqliteStore::open_in_memory().unwrap();
    let state = AppState { store: Arc::new(store), config: Arc::new(config) };
    build_router(state)
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn register_payload() -> Value {
    json!({
        "email": "jane@example.com",
        "firstName": "Jane",
        "lastName": "Doe",
        "password": "password"
    })
}

#[tokio::test]
async fn register_then_login_succeeds_with_token_and_cookie() {
    let app = app();

    let response = post_json(&app, "/api/v1/users/register", register_payload()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("Authorization="));
    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let response = post_json(
        &app,
        "/api/v1/users/login",
        json!({ "email": "jane@example.com", "password": "password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("Authorization="));
    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn login_with_wrong_password_is_401_with_message() {
    let app = app();
    post_json(&app, "/api/v1/users/register", register_payload()).await;

    let response = post_json(
        &app,
        "/api/v1/users/login",
        json!({ "email": "jane@example.com", "password": "wrongpass" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "wrong password" }));
}

#[tokio::test]
async fn login_with_unknown_email_is_a_server_error() {
    let app = app();
    let response = post_json(
        &app,
        "/api/v1/users/login",
        json!({ "email": "nobody@example.com", "password": "password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": "error fetching user" }));
}

#[tokio::test]
async fn register_validation_reports_the_missing_field() {
    let app = app();
    let cases = vec![
        (json!({ "firstName": "J", "lastName": "D", "password": "p" }), "email is required"),
        (json!({ "email": "a@b.c", "lastName": "D", "password": "p" }), "first name is required"),
        (json!({ "email": "a@b.c", "firstName": "J", "password": "p" }), "last name is required"),
        (json!({ "email": "a@b.c", "firstName": "J", "lastName": "D" }), "password is required"),
    ];
    for (payload, message) in cases {
        let response = post_json(&app, "/api/v1/users/register", payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": message }));
    }
}

#[tokio::test]
async fn duplicate_registration_is_a_server_error() {
    let app = app();
    let first = post_json(&app, "/api/v1/users/register", register_payload()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json(&app, "/api/v1/users/register", register_payload()).await;
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(second).await, json!({ "error": "error creating user" }));
}

#[tokio::test]
async fn stored_hash_is_not_the_plaintext_and_never_leaves_the_api() {
    let app = app();
    let response = post_json(&app, "/api/v1/users/register", register_payload()).await;
    let body = body_json(response).await;
    // The only secret-bearing artifact in the response is the signed token.
    assert_eq!(body.as_object().unwrap().len(), 1);
    assert_ne!(body["token"], "password");
}
