use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use cogniquest_backend::services::lesson_generator::LessonGenerator;
use cogniquest_backend::services::llm_provider::{LlmConfig, LlmProvider};

mod common;

fn quantum_lesson(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "topic": "Quantum Entanglement",
        "mode": "FEYNMAN",
        "createdAt": 1_700_000_000_000_i64,
        "chapters": [{
            "id": "chapter-1",
            "title": title,
            "steps": []
        }]
    })
}

fn save_body(lesson: &Value) -> Value {
    json!({
        "id": lesson["id"],
        "topic": lesson["topic"],
        "mode": lesson["mode"],
        "content": lesson.to_string(),
        "createdAt": lesson["createdAt"],
        "userId": 1
    })
}

#[tokio::test]
async fn test_save_then_find_by_topic_fragment() {
    let app = common::create_test_app().await;
    let lesson = quantum_lesson("lesson-q", "Spooky Action");

    let (status, body) = app.post("/api/lessons", save_body(&lesson)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Lesson saved successfully");

    let (status, body) = app
        .get("/api/lessons/find?topic=Quantum&mode=FEYNMAN&userId=1")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, lesson);

    let (status, _) = app
        .get("/api/lessons/find?topic=Quantum&mode=INTERVIEW&userId=1")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .get("/api/lessons/find?topic=Quantum&mode=FEYNMAN&userId=2")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_find_defaults_user_and_treats_missing_topic_or_unknown_mode_as_miss() {
    let app = common::create_test_app().await;
    app.post("/api/lessons", save_body(&quantum_lesson("lesson-q", "One"))).await;

    let (status, body) = app.get("/api/lessons/find?topic=Entangle&mode=FEYNMAN").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "lesson-q");

    let (status, _) = app.get("/api/lessons/find?topic=Entangle&mode=LECTURE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/lessons/find?mode=FEYNMAN").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Lesson not found");
}

#[tokio::test]
async fn test_find_treats_wildcards_literally() {
    let app = common::create_test_app().await;
    app.post("/api/lessons", save_body(&quantum_lesson("lesson-q", "One"))).await;

    let (status, _) = app.get("/api/lessons/find?topic=%25&mode=FEYNMAN").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/lessons/find?topic=Quantum_Entanglement&mode=FEYNMAN").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_find_returns_most_recent_match() {
    let app = common::create_test_app().await;
    let mut older = quantum_lesson("lesson-old", "Old");
    older["createdAt"] = json!(1_000);
    let mut newer = quantum_lesson("lesson-new", "New");
    newer["createdAt"] = json!(2_000);

    app.post("/api/lessons", save_body(&newer)).await;
    app.post("/api/lessons", save_body(&older)).await;

    let (status, body) = app.get("/api/lessons/find?topic=Quantum&mode=FEYNMAN").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "lesson-new");
}

#[tokio::test]
async fn test_resave_overwrites_content_and_keeps_one_history_row() {
    let app = common::create_test_app().await;

    app.post("/api/lessons", save_body(&quantum_lesson("lesson-q", "First"))).await;
    let updated = quantum_lesson("lesson-q", "Second");
    let (status, _) = app.post("/api/lessons", save_body(&updated)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/lessons/lesson-q").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chapters"][0]["title"], "Second");

    let (_, history) = app.get("/api/history/1").await;
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["lesson_id"], "lesson-q");
}

#[tokio::test]
async fn test_save_accepts_document_object_as_content() {
    let app = common::create_test_app().await;
    let lesson = quantum_lesson("lesson-obj", "Inline");
    let mut body = save_body(&lesson);
    body["content"] = lesson.clone();

    let (status, _) = app.post("/api/lessons", body).await;
    assert_eq!(status, StatusCode::OK);

    let (_, fetched) = app.get("/api/lessons/lesson-obj").await;
    assert_eq!(fetched, lesson);
}

#[tokio::test]
async fn test_save_rejects_blank_id() {
    let app = common::create_test_app().await;
    let mut body = save_body(&quantum_lesson("lesson-q", "One"));
    body["id"] = json!("  ");

    let (status, body) = app.post("/api/lessons", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_save_stores_id_exactly_as_sent() {
    let app = common::create_test_app().await;
    let lesson = quantum_lesson(" lesson-padded ", "Padded");

    let (status, _) = app.post("/api/lessons", save_body(&lesson)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/lessons/%20lesson-padded%20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, lesson);

    let (status, _) = app.get("/api/lessons/lesson-padded").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history) = app.get("/api/history/1").await;
    assert_eq!(history[0]["lesson_id"], " lesson-padded ");
}

#[tokio::test]
async fn test_history_starts_in_progress_and_tracks_updates() {
    let app = common::create_test_app().await;
    app.post("/api/lessons", save_body(&quantum_lesson("lesson-q", "One"))).await;

    let (status, history) = app.get("/api/history/1").await;
    assert_eq!(status, StatusCode::OK);
    let row = &history[0];
    assert_eq!(row["status"], "IN_PROGRESS");
    assert_eq!(row["progress"], 0);
    assert_eq!(row["score"], 0);
    assert_eq!(row["topic"], "Quantum Entanglement");
    assert_eq!(row["mode"], "FEYNMAN");
    assert!(row["id"].is_i64());
    assert!(row["last_accessed"].is_i64());

    let (status, body) = app
        .post(
            "/api/progress",
            json!({
                "userId": 1,
                "lessonId": "lesson-q",
                "progress": 100,
                "score": 80,
                "status": "COMPLETED"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Progress updated");

    let (_, history) = app.get("/api/history/1").await;
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "COMPLETED");
    assert_eq!(rows[0]["progress"], 100);
    assert_eq!(rows[0]["score"], 80);
}

#[tokio::test]
async fn test_resave_keeps_recorded_progress() {
    let app = common::create_test_app().await;
    let lesson = quantum_lesson("lesson-q", "One");
    app.post("/api/lessons", save_body(&lesson)).await;
    app.post(
        "/api/progress",
        json!({ "lessonId": "lesson-q", "progress": 40, "score": 10, "status": "IN_PROGRESS" }),
    )
    .await;

    app.post("/api/lessons", save_body(&lesson)).await;

    let (_, history) = app.get("/api/history/1").await;
    assert_eq!(history[0]["progress"], 40);
    assert_eq!(history[0]["score"], 10);
}

#[tokio::test]
async fn test_progress_without_history_is_a_noop() {
    let app = common::create_test_app().await;

    let (status, _) = app
        .post(
            "/api/progress",
            json!({
                "userId": 7,
                "lessonId": "never-saved",
                "progress": 10,
                "score": 0,
                "status": "IN_PROGRESS"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, history) = app.get("/api/history/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_history_is_ordered_by_last_access() {
    let app = common::create_test_app().await;
    let mut first = quantum_lesson("lesson-a", "A");
    first["topic"] = json!("Alpha");
    let mut second = quantum_lesson("lesson-b", "B");
    second["topic"] = json!("Beta");

    app.post("/api/lessons", save_body(&first)).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    app.post("/api/lessons", save_body(&second)).await;

    let (_, history) = app.get("/api/history/1").await;
    let ids: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["lesson_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["lesson-b", "lesson-a"]);
}

#[tokio::test]
async fn test_get_unknown_lesson_is_not_found() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/api/lessons/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Lesson not found");
}

#[tokio::test]
async fn test_non_json_content_returns_raw_row_by_id_but_misses_on_find() {
    let app = common::create_test_app().await;
    let (status, _) = app
        .post(
            "/api/lessons",
            json!({
                "id": "lesson-notes",
                "topic": "Plain Notes",
                "mode": "FEYNMAN",
                "content": "just some notes",
                "createdAt": 5
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/lessons/lesson-notes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "lesson-notes");
    assert_eq!(body["content"], "just some notes");
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["created_at"], 5);

    let (status, _) = app.get("/api/lessons/find?topic=Notes&mode=FEYNMAN").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_without_model_uses_mock_and_saves_nothing() {
    let app = common::create_test_app().await;

    let (status, body) = app
        .post("/api/lessons/generate", json!({ "query": "Tides", "mode": "FEYNMAN" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    assert_eq!(body["lesson"]["topic"], "Tides");
    assert_eq!(body["lesson"]["mode"], "FEYNMAN");

    let mock_id = body["lesson"]["id"].as_str().unwrap().to_string();
    let (status, _) = app.get(&format!("/api/lessons/{mock_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, history) = app.get("/api/history/1").await;
    assert_eq!(history, json!([]));

    let mut saved = quantum_lesson("lesson-tides", "Moon");
    saved["topic"] = json!("Ocean Tides");
    app.post("/api/lessons", save_body(&saved)).await;

    let (status, body) = app
        .post("/api/lessons/generate", json!({ "query": "Tides", "mode": "FEYNMAN" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "cache");
    assert_eq!(body["lesson"]["id"], "lesson-tides");
}

#[tokio::test]
async fn test_generate_rejects_empty_query() {
    let app = common::create_test_app().await;

    let (status, _) = app.post("/api/lessons/generate", json!({ "query": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

const MODEL_REPLY: &str = r#"```json
{
  "chapters": [{
    "title": "Borrowing",
    "steps": [{
      "type": "CONCEPT",
      "title": "One owner",
      "content": { "visual_type": "SLIDE", "title": "Ownership", "content": "Every value has one owner." }
    }]
  }]
}
```"#;

const STRAY_REPLY: &str = r#"{
  "topic": "Projectile Motion",
  "chapters": [{
    "title": "Arcs",
    "steps": [{
      "type": "CONCEPT",
      "title": "Throw",
      "narration": "Follow the ball.",
      "content": { "visual_type": "ANIMATION", "title": "Arc", "content": { "frames": [0, 1, 2] } }
    }, {
      "type": "FLASHCARD",
      "title": "Recall",
      "flashcard": { "front": "What bends the path?", "back": "Gravity." }
    }]
  }]
}"#;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

fn completion(content: &str) -> Value {
    json!({
        "model": "deepseek-chat",
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

fn replying_model(reply: &'static str) -> Router {
    Router::new().route(COMPLETIONS_PATH, post(move || async move { Json(completion(reply)) }))
}

/// Answers with `status` for the first `failures` calls, then with a lesson.
fn failing_model(status: StatusCode, failures: usize, calls: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        COMPLETIONS_PATH,
        post(move || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < failures {
                    (status, "upstream trouble").into_response()
                } else {
                    Json(completion(MODEL_REPLY)).into_response()
                }
            }
        }),
    )
}

async fn spawn_model_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn app_with_model(model: Router) -> common::TestApp {
    let endpoint = spawn_model_server(model).await;
    let provider = LlmProvider::new(LlmConfig::with_endpoint(Some("test-key".to_string()), endpoint));
    common::create_test_app_with(LessonGenerator::new(Some(provider))).await
}

#[tokio::test]
async fn test_generate_with_model_saves_lesson_and_serves_it_from_cache() {
    let app = app_with_model(replying_model(MODEL_REPLY)).await;

    let request = json!({ "query": "Rust Ownership", "mode": "INTERVIEW", "userId": 3 });
    let (status, body) = app.post("/api/lessons/generate", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "remote");
    assert_eq!(body["lesson"]["topic"], "Rust Ownership");
    assert_eq!(body["lesson"]["chapters"][0]["steps"][0]["content"]["generator_version"], "deepseek-v1");
    let lesson_id = body["lesson"]["id"].as_str().unwrap().to_string();

    let (_, history) = app.get("/api/history/3").await;
    assert_eq!(history[0]["lesson_id"], lesson_id.as_str());
    assert_eq!(history[0]["status"], "IN_PROGRESS");

    let (status, body) = app.post("/api/lessons/generate", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "cache");
    assert_eq!(body["lesson"]["id"], lesson_id.as_str());
}

#[tokio::test]
async fn test_generate_keeps_model_fields_outside_the_lesson_model() {
    let app = app_with_model(replying_model(STRAY_REPLY)).await;

    let (status, body) = app
        .post("/api/lessons/generate", json!({ "query": "Projectile", "mode": "FEYNMAN" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "remote");
    let lesson_id = body["lesson"]["id"].as_str().unwrap().to_string();

    let (status, stored) = app.get(&format!("/api/lessons/{lesson_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let steps = &stored["chapters"][0]["steps"];
    assert_eq!(steps[0]["narration"], "Follow the ball.");
    assert_eq!(steps[0]["content"]["content"]["frames"][1], 1);
    assert_eq!(steps[0]["content"]["status"], "READY");
    assert_eq!(steps[1]["flashcard"]["back"], "Gravity.");
    assert_eq!(stored["topic"], "Projectile Motion");
}

#[tokio::test]
async fn test_generate_retries_server_errors_before_using_the_model_reply() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app_with_model(failing_model(StatusCode::INTERNAL_SERVER_ERROR, 2, Arc::clone(&calls))).await;

    let (status, body) = app
        .post("/api/lessons/generate", json!({ "query": "Rust Ownership", "mode": "FEYNMAN" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "remote");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let (_, history) = app.get("/api/history/1").await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_generate_falls_back_to_mock_on_client_error_without_saving() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app_with_model(failing_model(StatusCode::BAD_REQUEST, usize::MAX, Arc::clone(&calls))).await;

    let (status, body) = app
        .post("/api/lessons/generate", json!({ "query": "Rust Ownership", "mode": "FEYNMAN" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (_, history) = app.get("/api/history/1").await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_generate_falls_back_to_mock_when_reply_is_not_json() {
    let app = app_with_model(replying_model("Sorry, I can only chat today.")).await;

    let (status, body) = app
        .post("/api/lessons/generate", json!({ "query": "Rust Ownership", "mode": "INTERVIEW" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");

    let (_, history) = app.get("/api/history/1").await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_health_reports_connected_database() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");

    let (status, body) = app.get("/api/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "sqlite");

    let (status, body) = app.get("/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_without_database_storage_routes_are_unavailable() {
    let app = common::create_app_without_db();

    let (status, body) = common::send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "disconnected");

    let (status, body) = common::send(
        &app,
        Request::builder().uri("/api/lessons/any").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

    let (status, body) = common::send(
        &app,
        common::json_request("/api/lessons/generate", &json!({ "query": "Tides" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/api/nothing-here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn test_demo_seed_is_repeatable_and_visible_through_the_api() {
    let app = common::create_test_app().await;

    let seeded = cogniquest_backend::seed::seed_demo_lessons(&app.db).await.unwrap();
    assert_eq!(seeded, 3);
    cogniquest_backend::seed::seed_demo_lessons(&app.db).await.unwrap();

    let (_, history) = app.get("/api/history/1").await;
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 3);

    let quantum = rows
        .iter()
        .find(|row| row["lesson_id"] == "seed-lesson-quantum")
        .unwrap();
    assert_eq!(quantum["status"], "COMPLETED");
    assert_eq!(quantum["score"], 80);

    let (status, body) = app.get("/api/lessons/find?topic=Quantum&mode=FEYNMAN").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "seed-lesson-quantum");
}
