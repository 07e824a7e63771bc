//! Observability infrastructure for the optimizer
//!
//! Prometheus metrics for evaluation throughput and recommendation
//! outcomes, plus structured logging for the significant domain events.

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for batch evaluation latency (in seconds)
const EVALUATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OptimizerMetricsInner> = OnceLock::new();

struct OptimizerMetricsInner {
    evaluation_latency_seconds: Histogram,
    resources_evaluated: IntCounter,
    recommendations_created: IntCounter,
    recommendations_updated: IntCounter,
    rules_skipped: IntCounter,
    evaluation_failures: IntCounter,
    lifecycle_transitions: IntCounter,
    active_recommendations: IntGauge,
    potential_savings_usd: IntGauge,
}

impl OptimizerMetricsInner {
    fn new() -> Self {
        Self {
            evaluation_latency_seconds: register_histogram!(
                "cost_optimizer_evaluation_latency_seconds",
                "Time spent running one account's evaluation batch",
                EVALUATION_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            resources_evaluated: register_int_counter!(
                "cost_optimizer_resources_evaluated_total",
                "Total resources run through the rule engine"
            )
            .expect("Failed to register resources_evaluated"),

            recommendations_created: register_int_counter!(
                "cost_optimizer_recommendations_created_total",
                "Total new recommendations persisted"
            )
            .expect("Failed to register recommendations_created"),

            recommendations_updated: register_int_counter!(
                "cost_optimizer_recommendations_updated_total",
                "Total recommendations refreshed in place"
            )
            .expect("Failed to register recommendations_updated"),

            rules_skipped: register_int_counter!(
                "cost_optimizer_rules_skipped_total",
                "Total rule evaluations skipped for missing data"
            )
            .expect("Failed to register rules_skipped"),

            evaluation_failures: register_int_counter!(
                "cost_optimizer_evaluation_failures_total",
                "Total per-resource persistence failures during evaluation"
            )
            .expect("Failed to register evaluation_failures"),

            lifecycle_transitions: register_int_counter!(
                "cost_optimizer_lifecycle_transitions_total",
                "Total recommendation status transitions applied"
            )
            .expect("Failed to register lifecycle_transitions"),

            active_recommendations: register_int_gauge!(
                "cost_optimizer_active_recommendations",
                "Recommendations currently in a non-terminal status"
            )
            .expect("Failed to register active_recommendations"),

            potential_savings_usd: register_int_gauge!(
                "cost_optimizer_potential_savings_usd",
                "Monthly savings still on the table, rounded to whole USD"
            )
            .expect("Failed to register potential_savings_usd"),
        }
    }
}

/// Optimizer metrics for Prometheus exposition.
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct OptimizerMetrics {
    _private: (),
}

impl Default for OptimizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OptimizerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
    }

    pub fn add_resources_evaluated(&self, count: u64) {
        self.inner().resources_evaluated.inc_by(count);
    }

    /// Fold one batch summary into the counters
    pub fn record_summary(&self, summary: &crate::engine::EvaluationSummary) {
        let inner = self.inner();
        inner.recommendations_created.inc_by(summary.created as u64);
        inner.recommendations_updated.inc_by(summary.updated as u64);
        inner.rules_skipped.inc_by(summary.skipped as u64);
        inner.evaluation_failures.inc_by(summary.failed as u64);
    }

    pub fn inc_lifecycle_transitions(&self) {
        self.inner().lifecycle_transitions.inc();
    }

    pub fn set_active_recommendations(&self, count: i64) {
        self.inner().active_recommendations.set(count);
    }

    pub fn set_potential_savings_usd(&self, amount: f64) {
        self.inner().potential_savings_usd.set(amount.round() as i64);
    }
}

/// Structured logger for optimizer events.
///
/// Emits consistent JSON-shaped events for evaluations, recommendations
/// and lifecycle changes, tagged with the serving instance name.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "optimizer_started",
            instance = %self.instance,
            version = %version,
            "Cost optimizer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "optimizer_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Cost optimizer shutting down"
        );
    }

    pub fn log_evaluation(
        &self,
        owner_id: &str,
        account_ref: &str,
        summary: &crate::engine::EvaluationSummary,
        duration_ms: u64,
    ) {
        info!(
            event = "evaluation_completed",
            instance = %self.instance,
            owner_id = %owner_id,
            account_ref = %account_ref,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            duration_ms = duration_ms,
            "Evaluation completed"
        );
    }

    pub fn log_evaluation_error(&self, owner_id: &str, account_ref: &str, error: &str) {
        warn!(
            event = "evaluation_failed",
            instance = %self.instance,
            owner_id = %owner_id,
            account_ref = %account_ref,
            error = %error,
            "Evaluation failed"
        );
    }

    pub fn log_transition(&self, recommendation_id: &str, to_status: &str, actor: &str) {
        info!(
            event = "lifecycle_transition",
            instance = %self.instance,
            recommendation_id = %recommendation_id,
            to_status = %to_status,
            actor = %actor,
            "Recommendation status changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handle() {
        // Prometheus registration is global; a second handle must reuse it
        let metrics = OptimizerMetrics::new();
        let clone = metrics.clone();

        metrics.observe_evaluation_latency(0.05);
        metrics.add_resources_evaluated(3);
        clone.inc_lifecycle_transitions();
        clone.set_active_recommendations(4);
        clone.set_potential_savings_usd(1234.56);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("optimizer-1");
        assert_eq!(logger.instance, "optimizer-1");
    }
}
