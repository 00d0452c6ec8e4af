//! Gateway integration tests against loopback axum apps: header attachment
//! on the wire, the full status classification table, forced logout on 401,
//! concurrency behaviour, and end-to-end CRUD against the mock admin API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Map, Value};

use opsdeck::config::Config;
use opsdeck::error::ErrorKind;
use opsdeck::gateway::{Gateway, NavigationSink, RequestOptions, StaticCsrf};
use opsdeck::server::{router as mock_router, AppState};
use opsdeck::session::{SessionStore, UserProfile};

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn echo_headers(headers: axum::http::HeaderMap) -> impl IntoResponse {
    let pick = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };
    Json(json!({
        "authorization": pick("authorization"),
        "csrf": pick("x-csrf-token"),
        "x_extra": pick("x-extra"),
    }))
}

async fn unauthorized() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "token expired"})))
}

async fn forbidden() -> impl IntoResponse {
    (StatusCode::FORBIDDEN, Json(json!({"message": "forbidden"})))
}

async fn missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"message": "no such resource"})))
}

async fn boom() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "internal"})))
}

async fn teapot() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, Json(json!({"message": "odd status"})))
}

async fn slow_ok() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(300)).await;
    Json(json!({"ok": true}))
}

async fn very_slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"ok": true}))
}

fn probe_router() -> Router {
    Router::new()
        .route("/echo", get(echo_headers))
        .route("/secure", get(unauthorized))
        .route("/forbidden", get(forbidden))
        .route("/missing", get(missing))
        .route("/boom", get(boom))
        .route("/teapot", get(teapot))
        .route("/slow_ok", get(slow_ok))
        .route("/very_slow", get(very_slow))
}

fn gateway_for(addr: SocketAddr, session: Arc<SessionStore>) -> Gateway {
    let cfg = Config { base_url: format!("http://{addr}"), ..Config::default() };
    Gateway::new(&cfg, session).unwrap()
}

fn demo_user() -> UserProfile {
    UserProfile {
        id: 1,
        name: "Admin User".into(),
        email: "admin@example.com".into(),
        extra: Map::new(),
    }
}

struct RecordingNav {
    session: Arc<SessionStore>,
    redirects: AtomicUsize,
    authenticated_at_signal: AtomicBool,
}

impl RecordingNav {
    fn new(session: Arc<SessionStore>) -> Self {
        Self { session, redirects: AtomicUsize::new(0), authenticated_at_signal: AtomicBool::new(true) }
    }
}

impl NavigationSink for RecordingNav {
    fn redirect_to_login(&self) {
        // capture whether the forced logout already happened
        self.authenticated_at_signal
            .store(self.session.snapshot().is_authenticated, Ordering::SeqCst);
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn bearer_token_attached_on_the_wire() {
    let addr = spawn(probe_router()).await;
    let session = Arc::new(SessionStore::in_memory());
    session.login(demo_user(), "tok-wire").unwrap();
    let gw = gateway_for(addr, session);

    let v: Value = gw.get("/echo").await.unwrap();
    assert_eq!(v["authorization"], "Bearer tok-wire");
}

#[tokio::test]
async fn no_authorization_header_when_unauthenticated() {
    let addr = spawn(probe_router()).await;
    let gw = gateway_for(addr, Arc::new(SessionStore::in_memory()));

    let v: Value = gw.get("/echo").await.unwrap();
    assert_eq!(v["authorization"], Value::Null);
}

#[tokio::test]
async fn csrf_header_attached_when_source_yields() {
    let addr = spawn(probe_router()).await;
    let session = Arc::new(SessionStore::in_memory());
    session.login(demo_user(), "tok-1").unwrap();
    let gw = gateway_for(addr, session).with_csrf_source(Arc::new(StaticCsrf("csrf-7".into())));

    let v: Value = gw.get("/echo").await.unwrap();
    assert_eq!(v["csrf"], "csrf-7");
}

#[tokio::test]
async fn caller_headers_merge_without_touching_authorization() {
    let addr = spawn(probe_router()).await;
    let session = Arc::new(SessionStore::in_memory());
    session.login(demo_user(), "tok-real").unwrap();
    let gw = gateway_for(addr, session);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));
    headers.insert("x-extra", HeaderValue::from_static("present"));
    let opts = RequestOptions { headers, timeout: None };

    let v: Value = gw.request(Method::GET, "/echo", None, Some(opts)).await.unwrap();
    assert_eq!(v["authorization"], "Bearer tok-real");
    assert_eq!(v["x_extra"], "present");
}

#[tokio::test]
async fn unauthorized_clears_session_before_result_delivery() {
    let addr = spawn(probe_router()).await;
    let session = Arc::new(SessionStore::in_memory());
    session.login(demo_user(), "tok-old").unwrap();
    let nav = Arc::new(RecordingNav::new(session.clone()));
    let gw = gateway_for(addr, session.clone()).with_navigation_sink(nav.clone());

    let err = gw.get::<Value>("/secure").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.payload["message"], "token expired");
    assert!(!session.snapshot().is_authenticated);
    assert_eq!(nav.redirects.load(Ordering::SeqCst), 1);
    // the session was already cleared when the navigation signal fired
    assert!(!nav.authenticated_at_signal.load(Ordering::SeqCst));
}

#[tokio::test]
async fn not_found_leaves_session_untouched() {
    let addr = spawn(probe_router()).await;
    let session = Arc::new(SessionStore::in_memory());
    session.login(demo_user(), "tok-keep").unwrap();
    let gw = gateway_for(addr, session.clone());

    let err = gw.get::<Value>("/missing").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.payload["message"], "no such resource");
    let snap = session.snapshot();
    assert!(snap.is_authenticated);
    assert_eq!(snap.token.as_deref(), Some("tok-keep"));
}

#[tokio::test]
async fn status_table_classifies_without_side_effects() {
    let addr = spawn(probe_router()).await;
    let session = Arc::new(SessionStore::in_memory());
    session.login(demo_user(), "tok-keep").unwrap();
    let gw = gateway_for(addr, session.clone());

    let err = gw.get::<Value>("/forbidden").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = gw.get::<Value>("/boom").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServerError);

    let err = gw.get::<Value>("/teapot").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownError);

    assert!(session.snapshot().is_authenticated);
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    // bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gw = gateway_for(addr, Arc::new(SessionStore::in_memory()));
    let err = gw.get::<Value>("/anything").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkError);
}

#[tokio::test]
async fn per_call_timeout_is_a_network_error() {
    let addr = spawn(probe_router()).await;
    let gw = gateway_for(addr, Arc::new(SessionStore::in_memory()));

    let opts = RequestOptions { headers: HeaderMap::new(), timeout: Some(Duration::from_millis(100)) };
    let err = gw
        .request::<Value>(Method::GET, "/very_slow", None, Some(opts))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkError);
}

#[tokio::test]
async fn concurrent_forced_logout_does_not_tear_the_session() {
    let addr = spawn(probe_router()).await;
    let session = Arc::new(SessionStore::in_memory());
    session.login(demo_user(), "tok-race").unwrap();
    let gw = gateway_for(addr, session.clone());

    // both start authenticated; the 401 resolves while the slow call is in flight
    let (unauthorized, slow) = futures::join!(gw.get::<Value>("/secure"), gw.get::<Value>("/slow_ok"));

    assert_eq!(unauthorized.unwrap_err().kind, ErrorKind::Unauthorized);
    // the in-flight request completes independently with its old token
    assert_eq!(slow.unwrap()["ok"], true);

    // forced logout cleared both fields together
    let snap = session.snapshot();
    assert!(!snap.is_authenticated);
    assert!(snap.token.is_none() && snap.user.is_none());
}

#[tokio::test]
async fn mock_admin_api_end_to_end() {
    let addr = spawn(mock_router(AppState::seeded())).await;
    let session = Arc::new(SessionStore::in_memory());
    let gw = gateway_for(addr, session.clone());

    let health: Value = gw.get("/api/v1/health").await.unwrap();
    assert_eq!(health["status"], "ok");

    // placeholder login, inputs sanitised exactly once before transmission
    let email = opsdeck::sanitize::sanitize_str("admin@example.com");
    let resp: Value = gw
        .post("/api/v1/auth/login", &json!({"email": email, "password": "secret"}))
        .await
        .unwrap();
    let token = resp["data"]["token"].as_str().unwrap().to_string();
    let profile: UserProfile = serde_json::from_value(resp["data"]["user"].clone()).unwrap();
    session.login(profile, token).unwrap();
    assert!(session.snapshot().is_authenticated);

    let users: Value = gw.get("/api/v1/users").await.unwrap();
    assert_eq!(users["data"].as_array().unwrap().len(), 2);

    let created: Value = gw
        .post("/api/v1/users", &json!({"name": "New Op", "email": "op@example.com"}))
        .await
        .unwrap();
    let new_id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(new_id, 3);

    let updated: Value = gw
        .put(&format!("/api/v1/users/{new_id}"), &json!({"name": "Renamed Op"}))
        .await
        .unwrap();
    assert_eq!(updated["data"]["name"], "Renamed Op");
    assert_eq!(updated["data"]["email"], "op@example.com");

    let deleted: Value = gw.delete(&format!("/api/v1/users/{new_id}")).await.unwrap();
    assert_eq!(deleted["message"], "User deleted successfully");

    let err = gw.get::<Value>(&format!("/api/v1/users/{new_id}")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    // classification only; the session survives a 404
    assert!(session.snapshot().is_authenticated);
}
