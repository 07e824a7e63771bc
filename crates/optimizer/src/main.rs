//! Cost Optimizer - recommendation service
//!
//! Hosts the rule engine behind an HTTP API: ingest usage snapshots,
//! trigger per-account evaluation batches, and manage the lifecycle of
//! the resulting recommendations.

use anyhow::Result;
use optimizer_lib::{
    health::components,
    pricing::{CostEstimator, PriceTable},
    store::{InMemoryRecommendationStore, InMemoryUsageStore},
    EngineConfig, HealthRegistry, OptimizerMetrics, RuleEngine, StructuredLogger,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const OPTIMIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting cost-optimizer");

    let config = config::OptimizerConfig::load()?;
    info!(
        instance = %config.instance_name,
        lookback_days = config.lookback_days,
        "Optimizer configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::USAGE_STORE).await;
    health_registry.register(components::RULE_ENGINE).await;
    health_registry
        .register(components::RECOMMENDATION_STORE)
        .await;

    let metrics = OptimizerMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(OPTIMIZER_VERSION);

    let engine_config = EngineConfig {
        lookback_days: config.lookback_days,
        currency: config.currency.clone(),
        ..EngineConfig::default()
    };
    let engine = RuleEngine::new(engine_config, CostEstimator::new(PriceTable::default()));

    let app_state = Arc::new(api::AppState {
        usage_store: Arc::new(InMemoryUsageStore::new()),
        recommendation_store: Arc::new(InMemoryRecommendationStore::new()),
        engine: Arc::new(engine),
        health_registry: health_registry.clone(),
        metrics,
        logger: logger.clone(),
    });

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    api_handle.abort();

    Ok(())
}
