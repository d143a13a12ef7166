#![allow(dead_code)]

use axum::body::Body;
use axum::http::response::Parts;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use recess::config::Config;
use recess::state::AppState;
use recess::{app, db};

pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _tmp: tempfile::TempDir,
}

pub fn spawn() -> TestApp {
    spawn_with(|_| {})
}

pub fn spawn_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.database.path = Some(tmp.path().join("test.db"));
    config.storage.path = Some(tmp.path().join("uploads"));
    config.auth.admin_token = ADMIN_TOKEN.to_string();
    config.auth.jwt_secret = "test-signing-key".to_string();
    customize(&mut config);
    std::fs::create_dir_all(config.uploads_path()).unwrap();

    let pool = db::create_pool(config.db_path()).unwrap();
    db::run_migrations(&pool).unwrap();
    db::seed::run(&pool, &config).unwrap();

    let state = AppState { db: pool, config };
    TestApp {
        router: app(state.clone()),
        state,
        _tmp: tmp,
    }
}

pub async fn send_raw(router: &Router, req: Request<Body>) -> (Parts, Value) {
    let res = router.clone().oneshot(req).await.unwrap();
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (parts, value)
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (parts, value) = send_raw(router, req).await;
    (parts.status, value)
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

pub fn admin_get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-admin-token", ADMIN_TOKEN)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_empty(path: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

pub fn admin_post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-admin-token", ADMIN_TOKEN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn admin_post_empty(path: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-admin-token", ADMIN_TOKEN)
        .body(Body::empty())
        .unwrap()
}

pub fn bearer_get(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn bearer_post_json(path: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn bearer_post_empty(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Log in as the seeded demo parent and return the signed token.
pub async fn parent_token(router: &Router) -> String {
    let (status, body) = send(
        router,
        post_json(
            "/api/parents/login",
            &json!({ "email": "parent@local", "password": "parentpass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "parent login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Create a post via the API and return its id.
pub async fn create_post(router: &Router, title: &str, child_email: Option<&str>) -> i64 {
    let mut body = json!({
        "title": title,
        "mediaUrl": "https://example.com/pic.jpg",
    });
    if let Some(email) = child_email {
        body["childEmail"] = json!(email);
    }
    let (status, body) = send(router, post_json("/api/posts", &body)).await;
    assert_eq!(status, StatusCode::CREATED, "create post failed: {body}");
    body["id"].as_i64().unwrap()
}

/// Approve a post directly as admin.
pub async fn admin_approve(router: &Router, post_id: i64) {
    let (status, body) = send(
        router,
        admin_post_empty(&format!("/api/moderation/{post_id}/approve")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "admin approve failed: {body}");
}
