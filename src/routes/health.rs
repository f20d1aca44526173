use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::PingStatus;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
        .route("/ready", get(ready))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    start_time: String,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessResponse {
    status: &'static str,
    timestamp: String,
    backend: Option<&'static str>,
    database: &'static str,
    database_latency_ms: Option<u64>,
}

async fn root(State(state): State<AppState>) -> Response {
    let ok = matches!(ping(&state).await, PingStatus::Connected { .. });

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        database: if ok { "connected" } else { "disconnected" },
        timestamp: now_iso(),
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    let started: chrono::DateTime<chrono::Utc> = state.started_at_system().into();
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        start_time: started.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION"),
    })
    .into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    let (database, latency) = match ping(&state).await {
        PingStatus::Connected { latency_ms } => ("connected", Some(latency_ms)),
        PingStatus::Timeout => ("timeout", None),
        PingStatus::Disconnected => ("disconnected", None),
    };

    let status = match database {
        "connected" => "healthy",
        "timeout" => "degraded",
        _ => "unhealthy",
    };

    let response = ReadinessResponse {
        status,
        timestamp: now_iso(),
        backend: state.db().map(|db| db.backend()),
        database,
        database_latency_ms: latency,
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status_code, Json(response)).into_response()
}

async fn ping(state: &AppState) -> PingStatus {
    match state.db() {
        Some(db) => db.ping().await,
        None => PingStatus::Disconnected,
    }
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
