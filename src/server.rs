//!
//! taskboard HTTP server
//! ---------------------
//! This module defines the Axum-based HTTP API: user registration/login and
//! the token-gated CRUD endpoints for tasks and projects.
//!
//! Responsibilities:
//! - Router assembly under `/api/v1`, with the auth gate applied as a
//!   `route_layer` on every protected route.
//! - Login/registration handlers backed by the `security` and `identity`
//!   modules; on success the token is returned in the body and duplicated
//!   into an `Authorization` cookie.
//! - Thin request-to-store translation for tasks and projects.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::{issue_token, require_auth};
use crate::security;
use crate::storage::{NewUser, SqliteStore, Store, Task};

/// Cookie carrying a copy of the issued token, named after the header the
/// gate reads.
const AUTH_COOKIE: &str = "Authorization";

/// Shared server state injected into all handlers and the auth gate.
/// Both fields are read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

/// Build the full application router for the given state.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
        .route("/projects", post(create_project))
        .route("/projects/{id}", get(get_project).put(update_project).delete(delete_project))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .merge(protected);

    Router::new()
        .route("/", get(|| async { "taskboard ok" }))
        .nest("/api/v1", api)
        .with_state(state)
}

/// Start the HTTP server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    if config.is_dev_secret() {
        warn!("TASKBOARD_JWT_SECRET is unset; using the development secret");
    }
    let store = SqliteStore::new(&config.db_path)?;
    let http_port = config.http_port;
    let state = AppState { store: Arc::new(store), config: Arc::new(config) };
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    #[serde(default)]
    email: String,
    #[serde(rename = "firstName", default)]
    first_name: String,
    #[serde(rename = "lastName", default)]
    last_name: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(rename = "projectID", default)]
    project_id: i64,
    #[serde(rename = "assignedTo", default)]
    assigned_to_id: i64,
}

#[derive(Debug, Deserialize)]
struct ProjectPayload {
    #[serde(default)]
    name: String,
}

fn validate_register(p: &RegisterPayload) -> AppResult<()> {
    if p.email.is_empty() {
        return Err(AppError::user("email_required", "email is required"));
    }
    if p.first_name.is_empty() {
        return Err(AppError::user("first_name_required", "first name is required"));
    }
    if p.last_name.is_empty() {
        return Err(AppError::user("last_name_required", "last name is required"));
    }
    if p.password.is_empty() {
        return Err(AppError::user("password_required", "password is required"));
    }
    Ok(())
}

fn validate_task(p: &TaskPayload) -> AppResult<()> {
    if p.name.is_empty() {
        return Err(AppError::user("name_required", "name is required"));
    }
    if p.project_id == 0 {
        return Err(AppError::user("project_id_required", "project id is required"));
    }
    if p.assigned_to_id == 0 {
        return Err(AppError::user("user_id_required", "user id is required"));
    }
    Ok(())
}

/// Mint a token for the user and prepare the matching `Set-Cookie` header.
fn issue_and_set_cookie(state: &AppState, user_id: i64) -> AppResult<(HeaderMap, String)> {
    let token = issue_token(state.config.secret_bytes(), user_id)?;
    let mut headers = HeaderMap::new();
    let cookie = HeaderValue::from_str(&format!("{}={}; HttpOnly; Path=/", AUTH_COOKIE, token))
        .map_err(|_| AppError::internal("cookie", "error creating token session"))?;
    headers.insert("Set-Cookie", cookie);
    Ok((headers, token))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> AppResult<impl IntoResponse> {
    validate_register(&payload)?;

    // Hashing failure is a server-side problem, surfaced as a 500, not masked.
    let hashed = security::hash_password(&payload.password)?;

    let user = state
        .store
        .create_user(NewUser {
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password_hash: hashed,
        })
        .map_err(|e| {
            error!("error creating user: {e}");
            AppError::storage("create_user", "error creating user")
        })?;

    let (headers, token) = issue_and_set_cookie(&state, user.id)?;
    Ok((StatusCode::CREATED, headers, Json(json!({ "token": token }))))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.email.is_empty() {
        return Err(AppError::user("email_required", "missing email"));
    }

    let user = state.store.get_user_by_email(&payload.email).map_err(|e| {
        error!("login lookup failed: {e}");
        AppError::storage("login_lookup", "error fetching user")
    })?;

    if !security::verify_password(&user.password_hash, &payload.password) {
        warn!(target: "taskboard::auth", "wrong password for user id={}", user.id);
        return Err(AppError::auth("wrong_password", "wrong password"));
    }

    let (headers, token) = issue_and_set_cookie(&state, user.id)?;
    Ok((StatusCode::OK, headers, Json(json!({ "token": token }))))
}

async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<TaskPayload>,
) -> AppResult<impl IntoResponse> {
    validate_task(&payload)?;
    let status = if payload.status.is_empty() { "TODO" } else { payload.status.as_str() };
    let task = state
        .store
        .create_task(&payload.name, status, payload.project_id, payload.assigned_to_id)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    let task = state.store.get_task(&id)?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TaskPayload>,
) -> AppResult<impl IntoResponse> {
    validate_task(&payload)?;
    let id: i64 = id.parse().map_err(|_| AppError::user("invalid_id", "invalid task id"))?;
    let status = if payload.status.is_empty() { "TODO".to_string() } else { payload.status };
    let existing = state.store.get_task(&id.to_string())?;
    let task = Task {
        id,
        name: payload.name,
        status,
        project_id: payload.project_id,
        assigned_to_id: payload.assigned_to_id,
        created_at: existing.created_at,
    };
    let updated = state.store.update_task(&task)?;
    Ok(Json(updated))
}

async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    state.store.delete_task(&id)?;
    Ok(Json(json!({ "status": "ok", "deleted": id })))
}

async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<ProjectPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.name.is_empty() {
        return Err(AppError::user("name_required", "name is required"));
    }
    let project = state.store.create_project(&payload.name)?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    let project = state.store.get_project(&id)?;
    Ok(Json(project))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ProjectPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.name.is_empty() {
        return Err(AppError::user("name_required", "name is required"));
    }
    let id: i64 = id.parse().map_err(|_| AppError::user("invalid_id", "invalid project id"))?;
    let existing = state.store.get_project(&id.to_string())?;
    let updated = state
        .store
        .update_project(&crate::storage::Project { id, name: payload.name, created_at: existing.created_at })?;
    Ok(Json(updated))
}

async fn delete_project(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    state.store.delete_project(&id)?;
    Ok(Json(json!({ "status": "ok", "deleted": id })))
}
