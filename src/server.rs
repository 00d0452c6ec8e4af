//! Development/mock admin API
//! --------------------------
//! In-memory stand-in for the production resource API: health, a users CRUD
//! surface seeded with demo rows, and a placeholder login that mints an
//! opaque token without real credential verification. Responses use the
//! `{data, message}` envelope the console's views expect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    users: Arc<RwLock<HashMap<i64, Value>>>,
    next_id: Arc<AtomicI64>,
}

impl AppState {
    /// Fresh state seeded with the two demo users.
    pub fn seeded() -> Self {
        let mut users = HashMap::new();
        users.insert(1, json!({"id": 1, "name": "John Doe", "email": "john@example.com"}));
        users.insert(2, json!({"id": 2, "name": "Jane Smith", "email": "jane@example.com"}));
        Self { users: Arc::new(RwLock::new(users)), next_id: Arc::new(AtomicI64::new(3)) }
    }
}

// 256-bit random token, base64url without padding
fn gen_token() -> String {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Mount all routes under `/api/v1` with permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/users", get(list_users).post(create_user))
        .route(
            "/api/v1/users/{id}",
            get(get_user).put(put_user).delete(delete_user),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn run_with_port(port: u16) -> anyhow::Result<()> {
    let app = router(AppState::seeded());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(target: "opsdeck", "mock admin API listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "message": "Server is running"}))
}

// Placeholder credential acceptance: any non-empty email/password pair gets a
// demo profile and a freshly minted opaque token.
async fn login(Json(payload): Json<Value>) -> impl IntoResponse {
    let email = payload.get("email").and_then(|v| v.as_str()).unwrap_or("");
    let password = payload.get("password").and_then(|v| v.as_str()).unwrap_or("");
    if email.is_empty() || password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "email and password are required"})),
        );
    }
    let user = json!({"id": 1, "name": "Admin User", "email": email});
    (
        StatusCode::OK,
        Json(json!({
            "data": {"user": user, "token": gen_token()},
            "message": "Login successful"
        })),
    )
}

async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    let users = state.users.read();
    let mut rows: Vec<&Value> = users.values().collect();
    rows.sort_by_key(|u| u.get("id").and_then(|v| v.as_i64()).unwrap_or(0));
    (
        StatusCode::OK,
        Json(json!({"data": rows, "message": "Users retrieved successfully"})),
    )
}

async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.users.read().get(&id) {
        Some(user) => (
            StatusCode::OK,
            Json(json!({"data": user, "message": "User retrieved successfully"})),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "User not found"}))),
    }
}

async fn create_user(State(state): State<AppState>, Json(payload): Json<Value>) -> impl IntoResponse {
    let Value::Object(mut fields) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "user payload must be an object"})),
        );
    };
    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    fields.insert("id".into(), json!(id));
    let user = Value::Object(fields);
    state.users.write().insert(id, user.clone());
    (
        StatusCode::CREATED,
        Json(json!({"data": user, "message": "User created successfully"})),
    )
}

async fn put_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    let Value::Object(fields) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "user payload must be an object"})),
        );
    };
    let mut users = state.users.write();
    let Some(existing) = users.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "User not found"})));
    };
    let mut merged = match existing {
        Value::Object(m) => m.clone(),
        _ => serde_json::Map::new(),
    };
    for (k, v) in fields {
        if k != "id" {
            merged.insert(k, v);
        }
    }
    merged.insert("id".into(), json!(id));
    *existing = Value::Object(merged);
    (
        StatusCode::OK,
        Json(json!({"data": existing.clone(), "message": "User updated successfully"})),
    )
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.users.write().remove(&id) {
        Some(user) => (
            StatusCode::OK,
            Json(json!({"data": user, "message": "User deleted successfully"})),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "User not found"}))),
    }
}
