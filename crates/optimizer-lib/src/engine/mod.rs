//! Recommendation rule engine
//!
//! Batch evaluation over one account's resources: fetch usage, aggregate
//! per resource, run the rules, and upsert the resulting recommendations
//! idempotently. Evaluation is pure per resource - rules see only that
//! resource's aggregates - so resources could be evaluated in parallel;
//! the batch here walks them sequentially since each takes well under a
//! second.

pub mod rules;

pub use rules::{RecommendationDraft, RuleContext, RuleOutcome, RulePolicy, RuleSkip};

use crate::aggregate::{aggregate, AggregatedUsage, LookbackWindow, DEFAULT_LOOKBACK_DAYS};
use crate::error::OptimizerError;
use crate::models::{
    DecisionMetadata, Recommendation, RecommendationStatus, ServiceKind, UsageRecord,
};
use crate::pricing::{resolve_monthly_cost, CostEstimator};
use crate::store::{RecommendationStore, UsageStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Provenance tag stamped on every engine-produced recommendation
const DECISION_SOURCE: &str = "rule-engine";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window for the utilization heuristics
    pub lookback_days: i64,
    /// Longer window backing the reserved-capacity rule
    pub reserved_lookback_days: i64,
    /// Currency stamped on savings estimates
    pub currency: String,
    pub policy: RulePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let policy = RulePolicy::default();
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            reserved_lookback_days: policy.reserved_min_days + 5,
            currency: "USD".to_string(),
            policy,
        }
    }
}

/// Result summary of one batch evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// New pending recommendations persisted
    pub created: u32,
    /// Existing active recommendations refreshed in place
    pub updated: u32,
    /// Existing active recommendations left untouched (delta below tolerance)
    pub unchanged: u32,
    /// Rule skips due to unavailable data
    pub skipped: u32,
    /// Per-resource store-write failures (batch continued)
    pub failed: u32,
}

/// Outcome of evaluating a single resource's records
pub struct ResourceEvaluation {
    pub drafts: Vec<RecommendationDraft>,
    pub skips: Vec<RuleSkip>,
}

enum Upsert {
    Created,
    Updated,
    Unchanged,
}

/// Rule-based recommendation generator
pub struct RuleEngine {
    config: EngineConfig,
    estimator: CostEstimator,
}

impl RuleEngine {
    pub fn new(config: EngineConfig, estimator: CostEstimator) -> Self {
        Self { config, estimator }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one resource's usage records. Pure: no I/O, deterministic
    /// for a given record set and `now`.
    pub fn evaluate_resource(
        &self,
        records: &[UsageRecord],
        now: DateTime<Utc>,
    ) -> ResourceEvaluation {
        let window = LookbackWindow::days_back(now, self.config.lookback_days);
        let long_window = LookbackWindow::days_back(now, self.config.reserved_lookback_days);

        let usage = match aggregate(records, &window, now) {
            Some(usage) => usage,
            None => {
                // No data in the window: every rule is unevaluable
                return ResourceEvaluation {
                    drafts: Vec::new(),
                    skips: vec![RuleSkip {
                        rule: "all",
                        detail: "no usage records in lookback window".to_string(),
                    }],
                };
            }
        };
        let long_usage = aggregate(records, &long_window, now);

        let ctx = self.build_context(&usage, long_usage.as_ref(), window.start, now);

        let mut drafts = Vec::new();
        let mut skips = Vec::new();
        for outcome in rules::evaluate_all(&ctx) {
            match outcome {
                RuleOutcome::Fire(draft) => drafts.push(*draft),
                RuleOutcome::Pass => {}
                RuleOutcome::Skip(s) => skips.push(s),
            }
        }
        ResourceEvaluation { drafts, skips }
    }

    fn build_context<'a>(
        &'a self,
        usage: &'a AggregatedUsage,
        long_usage: Option<&'a AggregatedUsage>,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RuleContext<'a> {
        let latest = &usage.latest;
        let class_key = latest
            .class_attributes
            .get(crate::models::metric::INSTANCE_CLASS)
            .or_else(|| {
                latest
                    .class_attributes
                    .get(crate::models::metric::STORAGE_CLASS)
            })
            .map(String::as_str)
            .unwrap_or("");

        RuleContext {
            usage,
            long_usage,
            window_start,
            monthly_cost: resolve_monthly_cost(latest, &self.estimator),
            monthly_cost_if_active: self
                .estimator
                .estimate_monthly(latest.service, class_key, true),
            policy: &self.config.policy,
            now,
        }
    }

    /// Batch entry point: evaluate every resource of one account and upsert
    /// the results. One resource's failure never aborts its siblings; only a
    /// wholesale usage-fetch failure propagates.
    pub async fn run_evaluation(
        &self,
        usage_store: &dyn UsageStore,
        recommendation_store: &dyn RecommendationStore,
        owner_id: &str,
        account_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<EvaluationSummary, OptimizerError> {
        if owner_id.trim().is_empty() || account_ref.trim().is_empty() {
            return Err(OptimizerError::validation(
                "owner_id and account_ref are required",
            ));
        }

        // Fetch over the widest window so the reserved rule sees far enough back
        let fetch_window = LookbackWindow::days_back(
            now,
            self.config.lookback_days.max(self.config.reserved_lookback_days),
        );

        // BTreeMap keeps resource iteration deterministic across runs
        let mut by_resource: BTreeMap<String, Vec<UsageRecord>> = BTreeMap::new();
        for service in ServiceKind::ALL {
            let records = usage_store
                .fetch_usage(owner_id, account_ref, service, &fetch_window)
                .await?;
            for record in records {
                by_resource
                    .entry(format!("{}/{}", service.as_str(), record.resource_id))
                    .or_default()
                    .push(record);
            }
        }

        let mut summary = EvaluationSummary::default();
        for (key, records) in &by_resource {
            let evaluation = self.evaluate_resource(records, now);

            for s in &evaluation.skips {
                debug!(
                    resource = %key,
                    rule = s.rule,
                    detail = %s.detail,
                    "Rule skipped"
                );
                summary.skipped += 1;
            }

            for draft in evaluation.drafts {
                match self
                    .upsert(recommendation_store, records, draft, now)
                    .await
                {
                    Ok(Upsert::Created) => summary.created += 1,
                    Ok(Upsert::Updated) => summary.updated += 1,
                    Ok(Upsert::Unchanged) => summary.unchanged += 1,
                    Err(e) => {
                        warn!(resource = %key, error = %e, "Failed to persist recommendation");
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            owner_id = %owner_id,
            account_ref = %account_ref,
            resources = by_resource.len(),
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            "Evaluation batch complete"
        );
        Ok(summary)
    }

    /// Apply one draft as a single logical update per (resource, kind):
    /// create when no active recommendation exists, refresh in place when
    /// the savings moved materially, otherwise leave the existing one alone.
    async fn upsert(
        &self,
        store: &dyn RecommendationStore,
        records: &[UsageRecord],
        draft: RecommendationDraft,
        now: DateTime<Utc>,
    ) -> Result<Upsert, OptimizerError> {
        let sample = records
            .first()
            .ok_or_else(|| OptimizerError::validation("empty record set"))?;

        let existing = store
            .find_active(
                &sample.owner_id,
                &sample.account_ref,
                &sample.resource_id,
                draft.kind,
            )
            .await?;

        match existing {
            None => {
                let recommendation = self.materialize(sample, draft, now);
                store.save(vec![recommendation]).await?;
                Ok(Upsert::Created)
            }
            Some(mut current) => {
                if !materially_different(
                    current.estimated_savings.amount,
                    draft.savings_amount,
                    self.config.policy.material_delta_pct,
                ) {
                    return Ok(Upsert::Unchanged);
                }

                // Refresh figures in place; identity, status and created_at
                // are preserved so the audit trail stays intact
                current.estimated_savings = draft.savings_estimate(&self.config.currency);
                current.current_state = draft.current_state;
                current.proposed_state = draft.proposed_state;
                current.priority = draft.priority;
                current.metadata.confidence = draft.confidence;
                current.metadata.data_point_count = draft.data_point_count;
                current.metadata.last_calculated = now;
                current.updated_at = now;
                store.save(vec![current]).await?;
                Ok(Upsert::Updated)
            }
        }
    }

    fn materialize(
        &self,
        sample: &UsageRecord,
        draft: RecommendationDraft,
        now: DateTime<Utc>,
    ) -> Recommendation {
        let estimated_savings = draft.savings_estimate(&self.config.currency);
        Recommendation {
            id: Uuid::new_v4(),
            owner_id: sample.owner_id.clone(),
            account_ref: sample.account_ref.clone(),
            resource_id: sample.resource_id.clone(),
            service: sample.service,
            region: sample.region.clone(),
            kind: draft.kind,
            title: draft.title,
            description: draft.description,
            current_state: draft.current_state,
            proposed_state: draft.proposed_state,
            estimated_savings,
            priority: draft.priority,
            risk_level: draft.risk_level,
            difficulty: draft.difficulty,
            steps: draft.steps,
            status: RecommendationStatus::Pending,
            metadata: DecisionMetadata {
                source: DECISION_SOURCE.to_string(),
                confidence: draft.confidence,
                data_point_count: draft.data_point_count,
                algorithm_id: draft.algorithm_id.to_string(),
                last_calculated: now,
            },
            created_at: now,
            updated_at: now,
            implemented_at: None,
            implemented_by: None,
            dismissed_at: None,
            dismissed_by: None,
            dismissal_reason: None,
            failure_reason: None,
        }
    }
}

fn materially_different(old: f64, new: f64, tolerance_pct: f64) -> bool {
    if old <= 0.0 {
        return new > 0.0;
    }
    ((new - old).abs() / old) * 100.0 > tolerance_pct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        metric, CostFigure, CostPeriod, MetricStat, RecommendationKind, RuntimeStatus,
    };
    use crate::store::{InMemoryRecommendationStore, InMemoryUsageStore, RecommendationFilter};
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn engine() -> RuleEngine {
        RuleEngine::new(EngineConfig::default(), CostEstimator::default())
    }

    fn compute_record(cpu_avg: f64, monthly_cost: f64, age_hours: i64) -> UsageRecord {
        UsageRecord {
            owner_id: "owner-1".to_string(),
            account_ref: "acct-1".to_string(),
            resource_id: "i-abc".to_string(),
            service: ServiceKind::Compute,
            region: "us-east-1".to_string(),
            observed_at: now() - Duration::hours(age_hours),
            metrics: HashMap::from([(
                metric::CPU_UTILIZATION.to_string(),
                MetricStat {
                    average: cpu_avg,
                    maximum: cpu_avg + 2.0,
                    minimum: (cpu_avg - 2.0).max(0.0),
                    sample_count: 288,
                    unit: "Percent".to_string(),
                },
            )]),
            cost: Some(CostFigure {
                amount: monthly_cost,
                currency: "USD".to_string(),
                period: CostPeriod::Monthly,
            }),
            class_attributes: HashMap::from([(
                metric::INSTANCE_CLASS.to_string(),
                "compute.medium".to_string(),
            )]),
            runtime_status: RuntimeStatus::Running,
        }
    }

    #[tokio::test]
    async fn test_run_evaluation_creates_then_idempotent() {
        let engine = engine();
        let usage = InMemoryUsageStore::new();
        let recs = InMemoryRecommendationStore::new();
        usage
            .record_usage(vec![compute_record(12.0, 100.0, 2)])
            .await
            .unwrap();

        let first = engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(first.updated, 0);

        // Same data again: nothing new is created
        let second = engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 1);

        let all = recs.list(&RecommendationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, RecommendationKind::ResizeDown);
        assert!((all[0].estimated_savings.amount - 50.0).abs() < 1e-9);
        assert_eq!(all[0].priority, crate::models::Priority::High);
    }

    #[tokio::test]
    async fn test_no_double_fire_for_same_kind() {
        let engine = engine();
        let usage = InMemoryUsageStore::new();
        let recs = InMemoryRecommendationStore::new();
        usage
            .record_usage(vec![compute_record(12.0, 100.0, 2)])
            .await
            .unwrap();

        engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();

        let pending = recs
            .list(&RecommendationFilter {
                status: Some(RecommendationStatus::Pending),
                kind: Some(RecommendationKind::ResizeDown),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_material_change_refreshes_in_place() {
        let engine = engine();
        let usage = InMemoryUsageStore::new();
        let recs = InMemoryRecommendationStore::new();
        usage
            .record_usage(vec![compute_record(12.0, 100.0, 4)])
            .await
            .unwrap();
        engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        let original = recs.list(&RecommendationFilter::default()).await.unwrap()[0].clone();

        // Cost doubles: savings move from $50 to $100, well past 5%
        usage
            .record_usage(vec![compute_record(12.0, 200.0, 1)])
            .await
            .unwrap();
        let second = engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 1);

        let refreshed = recs.get(original.id).await.unwrap().unwrap();
        assert_eq!(refreshed.id, original.id);
        assert_eq!(refreshed.status, RecommendationStatus::Pending);
        assert_eq!(refreshed.created_at, original.created_at);
        assert!((refreshed.estimated_savings.amount - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_terminal_recommendation_spawns_fresh_one() {
        let engine = engine();
        let usage = InMemoryUsageStore::new();
        let recs = InMemoryRecommendationStore::new();
        usage
            .record_usage(vec![compute_record(12.0, 100.0, 2)])
            .await
            .unwrap();
        engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();

        // Dismiss the pending one out of band
        let first = recs.list(&RecommendationFilter::default()).await.unwrap()[0].clone();
        let mut dismissed = first.clone();
        dismissed.status = RecommendationStatus::Dismissed;
        recs.save(vec![dismissed]).await.unwrap();

        // Condition still holds: a fresh pending recommendation appears
        let again = engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        assert_eq!(again.created, 1);

        let all = recs.list(&RecommendationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_usage_counts_skip_without_error() {
        let engine = engine();
        let usage = InMemoryUsageStore::new();
        let recs = InMemoryRecommendationStore::new();

        let summary = engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        assert_eq!(summary, EvaluationSummary::default());
    }

    #[test]
    fn test_evaluate_resource_with_no_records_skips() {
        let engine = engine();
        let evaluation = engine.evaluate_resource(&[], now());
        assert!(evaluation.drafts.is_empty());
        assert_eq!(evaluation.skips.len(), 1);
        assert_eq!(evaluation.skips[0].rule, "all");
    }

    #[tokio::test]
    async fn test_unknown_cpu_resource_skips_not_fires() {
        let engine = engine();
        let usage = InMemoryUsageStore::new();
        let recs = InMemoryRecommendationStore::new();
        let mut record = compute_record(12.0, 100.0, 2);
        record.metrics.clear();
        usage.record_usage(vec![record]).await.unwrap();

        let summary = engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        assert_eq!(summary.created, 0);
        assert!(summary.skipped >= 1);
        assert!(recs
            .list(&RecommendationFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_one_bad_resource_does_not_abort_siblings() {
        let engine = engine();
        let usage = InMemoryUsageStore::new();
        let recs = InMemoryRecommendationStore::new();

        // Resource with no metrics (skips) next to a healthy candidate
        let mut blank = compute_record(0.0, 100.0, 2);
        blank.resource_id = "i-blank".to_string();
        blank.metrics.clear();
        usage
            .record_usage(vec![blank, compute_record(12.0, 100.0, 2)])
            .await
            .unwrap();

        let summary = engine
            .run_evaluation(&usage, &recs, "owner-1", "acct-1", now())
            .await
            .unwrap();
        assert_eq!(summary.created, 1);
        assert!(summary.skipped >= 1);
    }

    #[tokio::test]
    async fn test_blank_tenant_is_validation_error() {
        let engine = engine();
        let usage = InMemoryUsageStore::new();
        let recs = InMemoryRecommendationStore::new();

        let err = engine
            .run_evaluation(&usage, &recs, " ", "acct-1", now())
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizerError::Validation(_)));
    }

    #[test]
    fn test_materially_different() {
        assert!(!materially_different(100.0, 104.0, 5.0));
        assert!(!materially_different(100.0, 105.0, 5.0));
        assert!(materially_different(100.0, 106.0, 5.0));
        assert!(materially_different(0.0, 1.0, 5.0));
        assert!(!materially_different(0.0, 0.0, 5.0));
    }
}
