//! Integration tests for the optimizer API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use optimizer_lib::{
    health::components,
    pricing::{CostEstimator, PriceTable},
    store::{InMemoryRecommendationStore, InMemoryUsageStore},
    EngineConfig, HealthRegistry, OptimizerMetrics, RuleEngine, StructuredLogger,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// The api module lives in the binary crate; re-declare the router wiring
// against the same library surface the binary uses.
#[path = "../src/api.rs"]
mod api;

async fn setup_test_app() -> (Router, Arc<api::AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::USAGE_STORE).await;
    health_registry.register(components::RULE_ENGINE).await;
    health_registry
        .register(components::RECOMMENDATION_STORE)
        .await;
    health_registry.set_ready(true).await;

    let engine = RuleEngine::new(
        EngineConfig::default(),
        CostEstimator::new(PriceTable::default()),
    );

    let state = Arc::new(api::AppState {
        usage_store: Arc::new(InMemoryUsageStore::new()),
        recommendation_store: Arc::new(InMemoryRecommendationStore::new()),
        engine: Arc::new(engine),
        health_registry,
        metrics: OptimizerMetrics::new(),
        logger: StructuredLogger::new("test-optimizer"),
    });
    let router = api::create_router(state.clone());

    (router, state)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn idle_compute_usage() -> Value {
    let observed_at = (Utc::now() - Duration::hours(2)).to_rfc3339();
    json!([{
        "owner_id": "owner-1",
        "account_ref": "acct-1",
        "resource_id": "i-abc123",
        "service": "COMPUTE",
        "region": "us-east-1",
        "observed_at": observed_at,
        "metrics": {
            "cpuUtilization": {
                "average": 12.0,
                "maximum": 18.0,
                "minimum": 4.0,
                "sample_count": 288,
                "unit": "Percent"
            }
        },
        "cost": { "amount": 100.0, "currency": "USD", "period": "monthly" },
        "class_attributes": { "instanceClass": "compute.medium" },
        "runtime_status": "running"
    }])
}

#[tokio::test]
async fn test_evaluation_flow_creates_recommendation() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/usage", &idle_compute_usage()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ingest = body_json(response).await;
    assert_eq!(ingest["ingested"], 1);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/evaluations",
            &json!({"owner_id": "owner-1", "account_ref": "acct-1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["created"], 1);

    let response = app
        .clone()
        .oneshot(get(
            "/api/v1/recommendations?owner_id=owner-1&account_ref=acct-1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list["total"], 1);
    let rec = &list["recommendations"][0];
    assert_eq!(rec["kind"], "RESIZE_DOWN");
    assert_eq!(rec["status"], "pending");
    assert_eq!(rec["priority"], "high");
    assert_eq!(rec["estimated_savings"]["amount"], 50.0);
}

#[tokio::test]
async fn test_second_evaluation_is_idempotent() {
    let (app, _state) = setup_test_app().await;

    app.clone()
        .oneshot(post_json("/api/v1/usage", &idle_compute_usage()))
        .await
        .unwrap();

    let eval = json!({"owner_id": "owner-1", "account_ref": "acct-1"});
    let first = body_json(
        app.clone()
            .oneshot(post_json("/api/v1/evaluations", &eval))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first["created"], 1);

    let second = body_json(
        app.clone()
            .oneshot(post_json("/api/v1/evaluations", &eval))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(second["created"], 0);
    assert_eq!(second["unchanged"], 1);
}

#[tokio::test]
async fn test_implement_then_dismiss_conflicts() {
    let (app, _state) = setup_test_app().await;

    app.clone()
        .oneshot(post_json("/api/v1/usage", &idle_compute_usage()))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json(
            "/api/v1/evaluations",
            &json!({"owner_id": "owner-1", "account_ref": "acct-1"}),
        ))
        .await
        .unwrap();

    let list = body_json(
        app.clone()
            .oneshot(get("/api/v1/recommendations?owner_id=owner-1"))
            .await
            .unwrap(),
    )
    .await;
    let id = list["recommendations"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/recommendations/{id}/implement"),
            &json!({"actor": "alex"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let implemented = body_json(response).await;
    assert_eq!(implemented["status"], "implemented");
    assert_eq!(implemented["implemented_by"], "alex");

    // Terminal recommendations reject further transitions
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/recommendations/{id}/dismiss"),
            &json!({"actor": "sam", "reason": "changed my mind"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_dismiss_without_reason_is_bad_request() {
    let (app, _state) = setup_test_app().await;

    app.clone()
        .oneshot(post_json("/api/v1/usage", &idle_compute_usage()))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json(
            "/api/v1/evaluations",
            &json!({"owner_id": "owner-1", "account_ref": "acct-1"}),
        ))
        .await
        .unwrap();

    let list = body_json(
        app.clone()
            .oneshot(get("/api/v1/recommendations?owner_id=owner-1"))
            .await
            .unwrap(),
    )
    .await;
    let id = list["recommendations"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/recommendations/{id}/dismiss"),
            &json!({"actor": "sam", "reason": "   "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("reason"));
}

#[tokio::test]
async fn test_unknown_recommendation_id_is_bad_request() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!(
                "/api/v1/recommendations/{}/implement",
                uuid::Uuid::new_v4()
            ),
            &json!({"actor": "alex"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_endpoint() {
    let (app, _state) = setup_test_app().await;

    app.clone()
        .oneshot(post_json("/api/v1/usage", &idle_compute_usage()))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json(
            "/api/v1/evaluations",
            &json!({"owner_id": "owner-1", "account_ref": "acct-1"}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/v1/summary?owner_id=owner-1&account_ref=acct-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["potential_monthly_savings"], 50.0);
    assert_eq!(summary["currency"], "USD");
}

#[tokio::test]
async fn test_evaluation_with_no_usage_is_empty_summary() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/evaluations",
            &json!({"owner_id": "owner-9", "account_ref": "acct-9"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["created"], 0);
    assert_eq!(summary["skipped"], 0);
}

#[tokio::test]
async fn test_healthz_and_readyz() {
    let (app, state) = setup_test_app().await;

    let response = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["rule_engine"].is_object());

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state
        .health_registry
        .set_unhealthy(components::RECOMMENDATION_STORE, "backend gone")
        .await;
    let response = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app().await;

    state.metrics.observe_evaluation_latency(0.01);
    state.metrics.set_active_recommendations(2);

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cost_optimizer_evaluation_latency_seconds"));
    assert!(text.contains("cost_optimizer_active_recommendations"));
}
