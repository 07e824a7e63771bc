//! Core library for the cloud cost optimizer
//!
//! This crate provides:
//! - Usage record and recommendation data models
//! - Metric aggregation over a lookback window
//! - Fallback cost estimation from a static price table
//! - The rule-based recommendation engine
//! - Recommendation lifecycle transitions
//! - Store traits with an in-memory implementation
//! - Summary aggregation, health checks and observability

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod store;
pub mod summary;

pub use engine::{EngineConfig, EvaluationSummary, RuleEngine, RulePolicy};
pub use error::{OptimizerError, StoreError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{OptimizerMetrics, StructuredLogger};
