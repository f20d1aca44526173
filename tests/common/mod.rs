#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use cogniquest_backend::db::config::DbConfig;
use cogniquest_backend::db::Database;
use cogniquest_backend::services::lesson_generator::LessonGenerator;
use cogniquest_backend::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    _dir: TempDir,
}

pub async fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let config = DbConfig::sqlite(dir.path().join("lessons.db"));
    let db = Database::connect(config)
        .await
        .expect("failed to open test database");
    (db, dir)
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(LessonGenerator::mock_only()).await
}

pub async fn create_test_app_with(generator: LessonGenerator) -> TestApp {
    let (db, dir) = create_test_db().await;
    let state = AppState::new(Some(db.clone()), generator);
    TestApp {
        app: cogniquest_backend::create_app(state),
        db,
        _dir: dir,
    }
}

/// An app with no database attached.
pub fn create_app_without_db() -> Router {
    cogniquest_backend::create_app(AppState::new(None, LessonGenerator::mock_only()))
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.app, json_request(uri, &body)).await
    }
}

pub fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}
