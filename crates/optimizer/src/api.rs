//! HTTP API for evaluation runs, recommendation lifecycle and probes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use optimizer_lib::{
    health::ComponentStatus,
    lifecycle,
    store::{RecommendationFilter, RecommendationStore, UsageStore},
    summary, HealthRegistry, OptimizerError, OptimizerMetrics, Recommendation, RecommendationKind,
    RecommendationStatus, RuleEngine, ServiceKind, StructuredLogger, UsageRecord,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub usage_store: Arc<dyn UsageStore>,
    pub recommendation_store: Arc<dyn RecommendationStore>,
    pub engine: Arc<RuleEngine>,
    pub health_registry: HealthRegistry,
    pub metrics: OptimizerMetrics,
    pub logger: StructuredLogger,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    pub owner_id: String,
    pub account_ref: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub owner_id: Option<String>,
    pub account_ref: Option<String>,
    pub status: Option<RecommendationStatus>,
    pub service: Option<ServiceKind>,
    pub kind: Option<RecommendationKind>,
}

#[derive(Debug, Serialize)]
struct RecommendationList {
    recommendations: Vec<Recommendation>,
    total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ImplementRequest {
    pub actor: String,
}

#[derive(Debug, Deserialize)]
pub struct DismissRequest {
    pub actor: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    ingested: usize,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub owner_id: String,
    pub account_ref: String,
}

fn error_status(err: &OptimizerError) -> StatusCode {
    match err {
        OptimizerError::Validation(_) => StatusCode::BAD_REQUEST,
        OptimizerError::DataUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        OptimizerError::Conflict(_) => StatusCode::CONFLICT,
        OptimizerError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(err: OptimizerError) -> (StatusCode, Json<ErrorBody>) {
    (
        error_status(&err),
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

/// Run a synchronous evaluation batch for one account
async fn run_evaluation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvaluationRequest>,
) -> impl IntoResponse {
    let started = Instant::now();
    let result = state
        .engine
        .run_evaluation(
            state.usage_store.as_ref(),
            state.recommendation_store.as_ref(),
            &request.owner_id,
            &request.account_ref,
            chrono::Utc::now(),
        )
        .await;

    match result {
        Ok(summary) => {
            let elapsed = started.elapsed();
            state.metrics.observe_evaluation_latency(elapsed.as_secs_f64());
            state.metrics.record_summary(&summary);
            state.logger.log_evaluation(
                &request.owner_id,
                &request.account_ref,
                &summary,
                elapsed.as_millis() as u64,
            );
            refresh_gauges(&state).await;
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(err) => {
            state
                .logger
                .log_evaluation_error(&request.owner_id, &request.account_ref, &err.to_string());
            error_response(err).into_response()
        }
    }
}

/// Recompute the active-recommendation gauges after a mutation
async fn refresh_gauges(state: &AppState) {
    if let Ok(all) = state
        .recommendation_store
        .list(&RecommendationFilter::default())
        .await
    {
        let active: Vec<_> = all.iter().filter(|r| r.is_active()).collect();
        let potential: f64 = active.iter().map(|r| r.estimated_savings.amount).sum();
        state.metrics.set_active_recommendations(active.len() as i64);
        state.metrics.set_potential_savings_usd(potential);
    }
}

/// Ingestion endpoint for the usage collaborator
async fn ingest_usage(
    State(state): State<Arc<AppState>>,
    Json(records): Json<Vec<UsageRecord>>,
) -> impl IntoResponse {
    let count = records.len();
    match state.usage_store.record_usage(records).await {
        Ok(()) => (StatusCode::OK, Json(IngestResponse { ingested: count })).into_response(),
        Err(err) => error_response(err.into()).into_response(),
    }
}

/// List recommendations, sorted for display (priority then savings)
async fn list_recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let filter = RecommendationFilter {
        owner_id: query.owner_id,
        account_ref: query.account_ref,
        status: query.status,
        service: query.service,
        kind: query.kind,
    };
    match state.recommendation_store.list(&filter).await {
        Ok(mut recommendations) => {
            summary::sort_for_display(&mut recommendations);
            let total = recommendations.len();
            (
                StatusCode::OK,
                Json(RecommendationList {
                    recommendations,
                    total,
                }),
            )
                .into_response()
        }
        Err(err) => error_response(err.into()).into_response(),
    }
}

/// Mark a recommendation implemented
async fn implement_recommendation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ImplementRequest>,
) -> impl IntoResponse {
    match lifecycle::implement(state.recommendation_store.as_ref(), id, &request.actor).await {
        Ok(updated) => {
            state.metrics.inc_lifecycle_transitions();
            state
                .logger
                .log_transition(&id.to_string(), updated.status.as_str(), &request.actor);
            refresh_gauges(&state).await;
            (StatusCode::OK, Json(updated)).into_response()
        }
        Err(err) => error_response(err).into_response(),
    }
}

/// Dismiss a recommendation with a mandatory reason
async fn dismiss_recommendation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<DismissRequest>,
) -> impl IntoResponse {
    match lifecycle::dismiss(
        state.recommendation_store.as_ref(),
        id,
        &request.actor,
        &request.reason,
    )
    .await
    {
        Ok(updated) => {
            state.metrics.inc_lifecycle_transitions();
            state
                .logger
                .log_transition(&id.to_string(), updated.status.as_str(), &request.actor);
            refresh_gauges(&state).await;
            (StatusCode::OK, Json(updated)).into_response()
        }
        Err(err) => error_response(err).into_response(),
    }
}

/// Account-level savings summary
async fn account_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> impl IntoResponse {
    let filter = RecommendationFilter {
        owner_id: Some(query.owner_id),
        account_ref: Some(query.account_ref),
        ..Default::default()
    };
    match state.recommendation_store.list(&filter).await {
        Ok(recommendations) => {
            let summary =
                summary::summarize(&recommendations, &state.engine.config().currency);
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(err) => error_response(err.into()).into_response(),
    }
}

/// Health check - 200 while operational, 503 when unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

/// Readiness check
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/evaluations", post(run_evaluation))
        .route("/api/v1/usage", post(ingest_usage))
        .route("/api/v1/recommendations", get(list_recommendations))
        .route(
            "/api/v1/recommendations/:id/implement",
            post(implement_recommendation),
        )
        .route(
            "/api/v1/recommendations/:id/dismiss",
            post(dismiss_recommendation),
        )
        .route("/api/v1/summary", get(account_summary))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
