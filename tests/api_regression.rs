//! HTTP surface tests via `tower::ServiceExt::oneshot` — no listener, no
//! network. The gateway runs unconfigured, so every advisory response is
//! deterministic template output.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cropsense::advisor::AdviceSynthesizer;
use cropsense::api::{create_app, ApiState};
use cropsense::classifier::ThresholdClassifier;
use cropsense::config::ProviderConfig;
use cropsense::knowledge::KnowledgeBase;
use cropsense::llm::ChatGateway;
use cropsense::pipeline::Orchestrator;
use cropsense::simulator::SensorSimulator;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app() -> Router {
    let gateway = Arc::new(ChatGateway::new(ProviderConfig::default()));
    let synthesizer = AdviceSynthesizer::new(
        gateway.clone(),
        Arc::new(KnowledgeBase::builtin()),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        SensorSimulator::default_fleet(),
        ThresholdClassifier::new(),
        synthesizer,
    ));
    orchestrator.auto_train().await;
    create_app(ApiState::new(orchestrator, gateway))
}

async fn get_json(app: Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn root_lists_endpoints() {
    let (status, json) = get_json(test_app().await, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "cropsense");
    assert!(json["endpoints"].as_array().unwrap().len() >= 8);
}

#[tokio::test]
async fn system_status_reports_trained_models() {
    let (status, json) = get_json(test_app().await, "/api/v1/system-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
    assert_eq!(json["classifier_trained"], true);
    assert_eq!(json["synthesizer_trained"], true);
    assert_eq!(json["ai_configured"], false);
    assert_eq!(json["sensor_count"], 5);
}

#[tokio::test]
async fn analyze_returns_label_and_advice() {
    let (status, json) = get_json(test_app().await, "/api/v1/analyze").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["label"].is_string());
    assert!(!json["advice"].as_str().unwrap().is_empty());
    assert_eq!(json["status"], "running");
}

#[tokio::test]
async fn ingest_classifies_reported_readings() {
    let report = json!({
        "sensor_id": "agri_sensor_007",
        "location": "field_2",
        "timestamp": "2026-08-29T06:00:00Z",
        "readings": {
            "soil_moisture": 12.0,
            "soil_ph": 6.2,
            "npk": {"nitrogen": 55.0, "phosphorus": 45.0, "potassium": 50.0}
        },
        "metadata": {"crop_type": "citrus"}
    });
    let (status, json) = post_json(test_app().await, "/api/v1/ingest", report).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "received");
    assert_eq!(json["sensor_id"], "agri_sensor_007");
    assert_eq!(json["label"], "needs_water");
    assert!(!json["advice"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_ingests_keep_labels_attributed() {
    let app = test_app().await;

    let dry = json!({
        "sensor_id": "field_dry",
        "timestamp": "2026-08-29T06:00:00Z",
        "readings": {"soil_moisture": 10.0}
    });
    let wet = json!({
        "sensor_id": "field_wet",
        "timestamp": "2026-08-29T06:00:00Z",
        "readings": {"soil_moisture": 80.0}
    });

    let ((status_a, a), (status_b, b)) = tokio::join!(
        post_json(app.clone(), "/api/v1/ingest", dry),
        post_json(app.clone(), "/api/v1/ingest", wet),
    );
    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);

    // Each response carries the label of its own readings, not whatever
    // round finished last.
    assert_eq!(a["label"], "needs_water");
    assert_eq!(b["label"], "too_much_water");
}

#[tokio::test]
async fn sensor_data_prefers_ingested_report() {
    let app = test_app().await;

    let report = json!({
        "sensor_id": "agri_sensor_001",
        "timestamp": "2026-08-29T06:00:00Z",
        "readings": {"soil_moisture": 41.5}
    });
    let (status, _) = post_json(app.clone(), "/api/v1/ingest", report).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = get_json(app, "/api/v1/sensor-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "ingested");
    assert_eq!(json["sensor_id"], "agri_sensor_001");
    assert_eq!(json["readings"]["soil_moisture"], 41.5);
}

#[tokio::test]
async fn chat_round_trip_and_history() {
    let app = test_app().await;

    let (status, json) = post_json(
        app.clone(),
        "/api/v1/chat",
        json!({"message": "how do I control spider mites?"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["using_real_api"], false);
    assert!(json["response"].as_str().unwrap().contains("spider mite"));

    let (status, json) = get_json(app, "/api/v1/chat-history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(
        json["exchanges"][0]["question"],
        "how do I control spider mites?"
    );
}

#[tokio::test]
async fn chat_history_respects_limit() {
    let app = test_app().await;

    for i in 0..4 {
        let (status, _) = post_json(
            app.clone(),
            "/api/v1/chat",
            json!({"message": format!("question number {i}")}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = get_json(app, "/api/v1/chat-history?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["total"], 4);
    // Last two exchanges, oldest first.
    assert_eq!(json["exchanges"][0]["question"], "question number 2");
    assert_eq!(json["exchanges"][1]["question"], "question number 3");
}

#[tokio::test]
async fn chat_rejects_blank_message() {
    let (status, json) =
        post_json(test_app().await, "/api/v1/chat", json!({"message": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn ai_status_reports_simulation_mode() {
    let app = test_app().await;

    let (_, _) = post_json(
        app.clone(),
        "/api/v1/chat",
        json!({"message": "watering advice please"}),
    )
    .await;

    let (status, json) = get_json(app, "/api/v1/ai-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mode"], "simulation");
    assert_eq!(json["configured"], false);
    assert_eq!(json["model"], "deepseek-chat");
    assert_eq!(json["stats"]["total_calls"], 1);
    assert_eq!(json["stats"]["successful_calls"], 0);
    assert_eq!(json["stats"]["failed_calls"], 1);
}

#[tokio::test]
async fn gateway_status_short_circuits_without_credential() {
    let (status, json) = get_json(test_app().await, "/api/v1/gateway-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["healthy"], false);
    assert_eq!(json["detail"]["api_configured"], false);
    assert!(json["detail"]["error_message"].is_string());
    // The health probe never touches the call counters.
    assert_eq!(json["stats"]["total_calls"], 0);
}
