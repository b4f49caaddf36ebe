//! HTTP API layer
//!
//! A thin axum surface over the orchestrator and the LLM gateway. Handlers
//! hold no domain logic: they validate the envelope, delegate, and shape the
//! JSON response. The heavy failure handling lives below this layer, so
//! almost every endpoint answers 200 with text — the pipeline is total.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Purpose                           |
//! |--------|--------------------------|-----------------------------------|
//! | GET    | `/`                      | Service banner and endpoint list  |
//! | GET    | `/health`                | Liveness + coarse status          |
//! | GET    | `/api/v1/system-status`  | Orchestrator status report        |
//! | POST   | `/api/v1/ingest`         | External sensor report intake     |
//! | GET    | `/api/v1/sensor-data`    | Latest readings (ingested or sim) |
//! | GET    | `/api/v1/analyze`        | One sensor-driven inference round |
//! | POST   | `/api/v1/chat`           | Farmer question → advice          |
//! | GET    | `/api/v1/chat-history`   | Recent chat exchanges (`?limit=`) |
//! | GET    | `/api/v1/ai-status`      | Gateway mode, model and counters  |
//! | GET    | `/api/v1/gateway-status` | Live health check + counters      |

use crate::llm::{ChatBackend, ChatGateway};
use crate::pipeline::Orchestrator;
use crate::types::SensorReport;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Bounded chat history length; oldest exchanges are evicted first.
const MAX_CHAT_HISTORY: usize = 100;

/// Default number of exchanges served by the history endpoint.
const DEFAULT_HISTORY_LIMIT: usize = 10;

// ============================================================================
// Shared State
// ============================================================================

/// One recorded chat exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRecord {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub answer: String,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub gateway: Arc<ChatGateway>,
    latest_report: Arc<Mutex<Option<SensorReport>>>,
    chat_history: Arc<Mutex<Vec<ChatRecord>>>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>, gateway: Arc<ChatGateway>) -> Self {
        Self {
            orchestrator,
            gateway,
            latest_report: Arc::new(Mutex::new(None)),
            chat_history: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Build the router with CORS and request tracing.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/system-status", get(system_status))
        .route("/api/v1/ingest", post(ingest))
        .route("/api/v1/sensor-data", get(sensor_data))
        .route("/api/v1/analyze", get(analyze))
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/chat-history", get(chat_history))
        .route("/api/v1/ai-status", get(ai_status))
        .route("/api/v1/gateway-status", get(gateway_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "cropsense",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Agricultural assistant: sensor analysis and advisory chat",
        "endpoints": [
            "/health",
            "/api/v1/system-status",
            "/api/v1/ingest",
            "/api/v1/sensor-data",
            "/api/v1/analyze",
            "/api/v1/chat",
            "/api/v1/chat-history",
            "/api/v1/ai-status",
            "/api/v1/gateway-status",
        ],
    }))
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "system": state.orchestrator.status().await,
        "ai_configured": state.gateway.is_configured(),
        "timestamp": Utc::now(),
    }))
}

async fn system_status(State(state): State<ApiState>) -> impl IntoResponse {
    let report = state.orchestrator.status_report().await;
    Json(json!({
        "status": report.status,
        "classifier_trained": report.classifier_trained,
        "synthesizer_trained": report.synthesizer_trained,
        "sensor_count": report.sensor_count,
        "last_prediction": report.last_prediction,
        "ai_configured": state.gateway.is_configured(),
    }))
}

/// Intake for external sensor reports: store the latest and run one
/// inference round against the reported readings.
async fn ingest(
    State(state): State<ApiState>,
    Json(report): Json<SensorReport>,
) -> impl IntoResponse {
    tracing::info!(sensor_id = %report.sensor_id, "Sensor report received");

    let readings = report.readings.clone();
    *state.latest_report.lock().await = Some(report.clone());

    let record = state.orchestrator.run_inference_record(Some(readings)).await;

    Json(json!({
        "status": "received",
        "sensor_id": report.sensor_id,
        "label": record.label,
        "advice": record.advice,
    }))
}

/// Latest readings: the most recent ingested report when one exists,
/// otherwise a fresh sample from the simulated fleet.
async fn sensor_data(State(state): State<ApiState>) -> impl IntoResponse {
    if let Some(report) = state.latest_report.lock().await.clone() {
        return Json(json!({
            "source": "ingested",
            "sensor_id": report.sensor_id,
            "timestamp": report.timestamp,
            "readings": report.readings,
        }));
    }

    let reading = state.orchestrator.sample_reading();
    Json(json!({
        "source": "simulated",
        "timestamp": Utc::now(),
        "readings": reading,
    }))
}

/// One full inference round on fresh simulated readings.
async fn analyze(State(state): State<ApiState>) -> impl IntoResponse {
    let record = state.orchestrator.run_inference_record(None).await;
    Json(json!({
        "label": record.label,
        "advice": record.advice,
        "status": state.orchestrator.status().await,
    }))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let question = request.message.trim().to_string();
    if question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "message must not be empty"})),
        )
            .into_response();
    }

    let answer = state.orchestrator.run_chat(&question, None).await;
    let timestamp = Utc::now();

    let record = ChatRecord {
        timestamp,
        question,
        answer: answer.clone(),
    };
    let mut history = state.chat_history.lock().await;
    if history.len() >= MAX_CHAT_HISTORY {
        history.remove(0);
    }
    history.push(record);
    drop(history);

    Json(json!({
        "response": answer,
        "status": "success",
        "timestamp": timestamp,
        "provider": state.gateway.model(),
        "using_real_api": state.gateway.is_configured(),
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

/// Last `limit` exchanges (default 10), oldest first.
async fn chat_history(
    State(state): State<ApiState>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let history = state.chat_history.lock().await;
    let start = history.len().saturating_sub(limit);
    Json(json!({
        "count": history.len() - start,
        "total": history.len(),
        "exchanges": &history[start..],
    }))
}

/// Gateway mode and counters. Cheap: no network round trip.
async fn ai_status(State(state): State<ApiState>) -> impl IntoResponse {
    let configured = state.gateway.is_configured();
    Json(json!({
        "mode": (if configured { "ai" } else { "simulation" }),
        "configured": configured,
        "model": state.gateway.model(),
        "stats": state.gateway.stats().await,
    }))
}

/// Live three-stage gateway health check plus counters. Operator-triggered:
/// every call is a real round trip when a credential is configured.
async fn gateway_status(State(state): State<ApiState>) -> impl IntoResponse {
    let health = state.gateway.health_check().await;
    Json(json!({
        "healthy": health.is_fully_healthy(),
        "detail": health,
        "stats": state.gateway.stats().await,
    }))
}
