//! Per-resource-type cost-optimization heuristics
//!
//! Each rule inspects one resource's aggregated metrics plus its current
//! cost and emits at most one recommendation draft of a fixed kind. A rule
//! that cannot compute (missing metric, unresolvable cost) skips with a
//! reason instead of failing; a rule whose condition simply is not met
//! passes silently.

use crate::aggregate::AggregatedUsage;
use crate::models::{
    metric, truncate_to, Difficulty, Priority, RecommendationKind, RemediationStep, ResourceState,
    RiskLevel, RuntimeStatus, SavingsEstimate, ServiceKind, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};
use chrono::{DateTime, Utc};

/// Savings ratio applied when downsizing one instance tier
pub const RESIZE_DOWN_SAVINGS_RATIO: f64 = 0.5;
/// Savings ratio for moving standard storage to an infrequent-access tier
pub const STORAGE_TIER_SAVINGS_RATIO: f64 = 0.4;
/// Savings ratio for a reserved-capacity commitment
pub const RESERVED_SAVINGS_RATIO: f64 = 0.3;

/// CPU average below which a compute instance counts as underutilized
pub const CPU_LOW_WATERMARK_PCT: f64 = 20.0;
/// Connection average below which a database counts as underutilized
pub const DB_LOW_CONNECTION_WATERMARK: f64 = 5.0;
/// Standard-tier objects below this size are not worth re-tiering
pub const STORAGE_TIER_MIN_GB: f64 = 100.0;
/// Days a compute instance may sit stopped before cleanup fires
pub const IDLE_DAYS_THRESHOLD: i64 = 7;
/// Sustained-running days required for a reserved-capacity suggestion
pub const RESERVED_MIN_DAYS: i64 = 30;
/// Maximum coefficient of variation considered "stable" utilization
pub const RESERVED_MAX_VARIATION: f64 = 0.10;
/// Savings delta (percent) below which an existing recommendation is left as-is
pub const MATERIAL_DELTA_PCT: f64 = 5.0;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const DAYS_PER_MONTH: f64 = 30.0;

/// Numeric thresholds and savings ratios the rules run with.
///
/// The flat savings multipliers are a placeholder policy, not derived from
/// real pricing deltas between tiers; override per engine instance if
/// product guidance changes them.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    pub cpu_low_watermark_pct: f64,
    pub db_low_connection_watermark: f64,
    pub storage_tier_min_gb: f64,
    pub idle_days_threshold: i64,
    pub reserved_min_days: i64,
    pub reserved_max_variation: f64,
    pub material_delta_pct: f64,
    pub resize_down_ratio: f64,
    pub storage_tier_ratio: f64,
    pub reserved_ratio: f64,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            cpu_low_watermark_pct: CPU_LOW_WATERMARK_PCT,
            db_low_connection_watermark: DB_LOW_CONNECTION_WATERMARK,
            storage_tier_min_gb: STORAGE_TIER_MIN_GB,
            idle_days_threshold: IDLE_DAYS_THRESHOLD,
            reserved_min_days: RESERVED_MIN_DAYS,
            reserved_max_variation: RESERVED_MAX_VARIATION,
            material_delta_pct: MATERIAL_DELTA_PCT,
            resize_down_ratio: RESIZE_DOWN_SAVINGS_RATIO,
            storage_tier_ratio: STORAGE_TIER_SAVINGS_RATIO,
            reserved_ratio: RESERVED_SAVINGS_RATIO,
        }
    }
}

/// Everything a rule may look at for one resource
pub struct RuleContext<'a> {
    /// Aggregate over the standard lookback window
    pub usage: &'a AggregatedUsage,
    /// Aggregate over the longer reserved-capacity window, when available
    pub long_usage: Option<&'a AggregatedUsage>,
    /// Start of the standard lookback window
    pub window_start: DateTime<Utc>,
    /// Resolved monthly cost (reported-first, estimator fallback)
    pub monthly_cost: Option<f64>,
    /// What the resource would cost per month if it were running
    pub monthly_cost_if_active: f64,
    pub policy: &'a RulePolicy,
    pub now: DateTime<Utc>,
}

/// A rule skipped because its required data was unavailable
#[derive(Debug, Clone)]
pub struct RuleSkip {
    pub rule: &'static str,
    pub detail: String,
}

/// Outcome of running one rule against one resource
pub enum RuleOutcome {
    /// Condition met; a recommendation should be upserted
    Fire(Box<RecommendationDraft>),
    /// Condition not met; nothing to do
    Pass,
    /// Required data unavailable; observable, never an error
    Skip(RuleSkip),
}

/// An unsaved recommendation produced by a rule
#[derive(Debug, Clone)]
pub struct RecommendationDraft {
    pub kind: RecommendationKind,
    pub algorithm_id: &'static str,
    pub title: String,
    pub description: String,
    pub current_state: ResourceState,
    pub proposed_state: ResourceState,
    /// Monthly USD saved; always non-negative
    pub savings_amount: f64,
    /// Fraction of the base cost saved, 0.0-1.0
    pub savings_fraction: f64,
    pub priority: Priority,
    pub risk_level: RiskLevel,
    pub difficulty: Difficulty,
    pub steps: Vec<RemediationStep>,
    pub confidence: f64,
    pub data_point_count: u64,
}

impl RecommendationDraft {
    pub fn savings_estimate(&self, currency: &str) -> SavingsEstimate {
        SavingsEstimate {
            amount: self.savings_amount,
            currency: currency.to_string(),
            period: crate::models::CostPeriod::Monthly,
            percentage: self.savings_fraction * 100.0,
        }
    }
}

/// Priority table: critical only for majority savings at low risk, high for
/// savings above 30%, medium otherwise. Strict `>` at both boundaries; `Low`
/// is reserved for manual downgrades and never assigned here.
pub fn priority_for(savings_fraction: f64, risk: RiskLevel) -> Priority {
    if savings_fraction > 0.5 && risk == RiskLevel::Low {
        Priority::Critical
    } else if savings_fraction > 0.3 {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Run every rule against the context, in a stable order
pub fn evaluate_all(ctx: &RuleContext<'_>) -> Vec<RuleOutcome> {
    vec![
        compute_resize_down(ctx),
        idle_compute_cleanup(ctx),
        storage_tier_change(ctx),
        db_resize_down(ctx),
        reserved_capacity(ctx),
    ]
}

fn build_steps(items: &[(&str, u32)]) -> Vec<RemediationStep> {
    items
        .iter()
        .enumerate()
        .map(|(i, (description, minutes))| RemediationStep {
            order: i as u32 + 1,
            description: (*description).to_string(),
            estimated_minutes: *minutes,
        })
        .collect()
}

fn current_state_of(usage: &AggregatedUsage, monthly_cost: Option<f64>) -> ResourceState {
    let latest = &usage.latest;
    ResourceState {
        instance_class: latest.class_attributes.get(metric::INSTANCE_CLASS).cloned(),
        storage_class: latest.class_attributes.get(metric::STORAGE_CLASS).cloned(),
        runtime_status: Some(latest.runtime_status),
        monthly_cost,
        utilization_pct: usage.metric(metric::CPU_UTILIZATION).map(|m| m.average),
    }
}

fn draft(
    kind: RecommendationKind,
    algorithm_id: &'static str,
    title: String,
    description: String,
    current_state: ResourceState,
    proposed_state: ResourceState,
    savings_amount: f64,
    base_cost: f64,
    risk_level: RiskLevel,
    difficulty: Difficulty,
    steps: Vec<RemediationStep>,
    confidence: f64,
    data_point_count: u64,
) -> RuleOutcome {
    let savings_amount = savings_amount.max(0.0);
    let savings_fraction = if base_cost > 0.0 {
        (savings_amount / base_cost).clamp(0.0, 1.0)
    } else {
        0.0
    };
    RuleOutcome::Fire(Box::new(RecommendationDraft {
        kind,
        algorithm_id,
        title: truncate_to(title, MAX_TITLE_LEN),
        description: truncate_to(description, MAX_DESCRIPTION_LEN),
        current_state,
        proposed_state,
        savings_amount,
        savings_fraction,
        priority: priority_for(savings_fraction, risk_level),
        risk_level,
        difficulty,
        steps,
        confidence,
        data_point_count,
    }))
}

fn skip(rule: &'static str, detail: impl Into<String>) -> RuleOutcome {
    RuleOutcome::Skip(RuleSkip {
        rule,
        detail: detail.into(),
    })
}

/// One tier down in the compute class ladder, when the class is known
fn next_compute_class_down(class: &str) -> Option<&'static str> {
    const LADDER: [&str; 6] = [
        "compute.nano",
        "compute.micro",
        "compute.small",
        "compute.medium",
        "compute.large",
        "compute.xlarge",
    ];
    let idx = LADDER.iter().position(|c| *c == class)?;
    if idx == 0 {
        return None;
    }
    Some(LADDER[idx - 1])
}

/// Running compute instance with a known, low CPU average
pub fn compute_resize_down(ctx: &RuleContext<'_>) -> RuleOutcome {
    const RULE: &str = "compute_resize_down";

    let usage = ctx.usage;
    if usage.latest.service != ServiceKind::Compute || !usage.runtime_status().is_active() {
        return RuleOutcome::Pass;
    }

    let cpu = match usage.metric(metric::CPU_UTILIZATION) {
        Some(m) => m,
        // Unknown is not zero: a resource with no CPU samples never fires
        None => return skip(RULE, "cpuUtilization has no samples in window"),
    };
    if cpu.average >= ctx.policy.cpu_low_watermark_pct {
        return RuleOutcome::Pass;
    }

    let monthly_cost = match ctx.monthly_cost {
        Some(c) if c > 0.0 => c,
        _ => return skip(RULE, "monthly cost unresolvable"),
    };

    let savings = monthly_cost * ctx.policy.resize_down_ratio;
    let current_class = usage.latest.class_attributes.get(metric::INSTANCE_CLASS);
    let proposed_class = current_class
        .and_then(|c| next_compute_class_down(c))
        .map(str::to_string);

    let current_state = current_state_of(usage, Some(monthly_cost));
    let proposed_state = ResourceState {
        instance_class: proposed_class,
        runtime_status: Some(RuntimeStatus::Running),
        monthly_cost: Some(monthly_cost - savings),
        ..Default::default()
    };

    draft(
        RecommendationKind::ResizeDown,
        RULE,
        "Downsize underutilized compute instance".to_string(),
        format!(
            "CPU utilization averaged {:.1}% across {} observations, well below the {:.0}% watermark. One instance size smaller should absorb this load.",
            cpu.average, usage.record_count, ctx.policy.cpu_low_watermark_pct
        ),
        current_state,
        proposed_state,
        savings,
        monthly_cost,
        RiskLevel::Low,
        Difficulty::Medium,
        build_steps(&[
            ("Snapshot the instance and note its current class", 15),
            ("Stop the instance during a maintenance window", 10),
            ("Change to the next smaller instance class and start it", 10),
            ("Watch CPU and latency for 24 hours; revert if saturated", 30),
        ]),
        0.8,
        usage.record_count,
    )
}

/// Compute instance sitting stopped past the idle threshold
pub fn idle_compute_cleanup(ctx: &RuleContext<'_>) -> RuleOutcome {
    const RULE: &str = "idle_compute_cleanup";

    let usage = ctx.usage;
    if usage.latest.service != ServiceKind::Compute
        || usage.runtime_status() != RuntimeStatus::Stopped
    {
        return RuleOutcome::Pass;
    }

    // No active observation in the window means the stop predates it
    let idle_days = match usage.last_active_at {
        Some(at) => (ctx.now - at).num_days(),
        None => (ctx.now - ctx.window_start).num_days(),
    };
    let entire_window_idle = usage.last_active_at.is_none();
    if !entire_window_idle && idle_days <= ctx.policy.idle_days_threshold {
        return RuleOutcome::Pass;
    }

    let base = ctx.monthly_cost_if_active;
    if base <= 0.0 {
        return skip(RULE, "cost-if-running unresolvable");
    }
    let billable_idle_days = (idle_days.max(ctx.policy.idle_days_threshold) as f64)
        .min(DAYS_PER_MONTH);
    let savings = base * billable_idle_days / DAYS_PER_MONTH;

    let current_state = current_state_of(usage, ctx.monthly_cost);
    let proposed_state = ResourceState {
        runtime_status: Some(RuntimeStatus::Terminated),
        monthly_cost: Some(0.0),
        ..Default::default()
    };

    draft(
        RecommendationKind::Delete,
        RULE,
        "Remove long-stopped compute instance".to_string(),
        format!(
            "Instance has been stopped for at least {} days with no running observations. Deleting it avoids roughly a month of charges if it were restarted and forgotten.",
            idle_days
        ),
        current_state,
        proposed_state,
        savings,
        base,
        RiskLevel::Low,
        Difficulty::Easy,
        build_steps(&[
            ("Confirm with the owner that the instance is abandoned", 10),
            ("Snapshot attached volumes for later restore", 20),
            ("Terminate the instance and release its addresses", 5),
        ]),
        0.7,
        usage.record_count,
    )
}

/// Large standard-tier bucket that qualifies for infrequent access
pub fn storage_tier_change(ctx: &RuleContext<'_>) -> RuleOutcome {
    const RULE: &str = "storage_tier_change";

    let usage = ctx.usage;
    if usage.latest.service != ServiceKind::ObjectStorage {
        return RuleOutcome::Pass;
    }

    let storage_class = match usage.latest.class_attributes.get(metric::STORAGE_CLASS) {
        Some(class) => class.as_str(),
        None => return skip(RULE, "storageClass attribute missing"),
    };
    if storage_class != "standard" {
        return RuleOutcome::Pass;
    }

    let size = match usage.metric(metric::STORAGE_SIZE_BYTES) {
        Some(m) => m,
        None => return skip(RULE, "storageSizeBytes has no samples in window"),
    };
    let size_gb = size.average / BYTES_PER_GB;
    if size_gb <= ctx.policy.storage_tier_min_gb {
        return RuleOutcome::Pass;
    }

    let monthly_cost = match ctx.monthly_cost {
        Some(c) if c > 0.0 => c,
        _ => return skip(RULE, "monthly cost unresolvable"),
    };
    let savings = monthly_cost * ctx.policy.storage_tier_ratio;

    let mut current_state = current_state_of(usage, Some(monthly_cost));
    current_state.storage_class = Some(storage_class.to_string());
    let proposed_state = ResourceState {
        storage_class: Some("infrequent-access".to_string()),
        monthly_cost: Some(monthly_cost - savings),
        ..Default::default()
    };

    draft(
        RecommendationKind::StorageTierChange,
        RULE,
        "Move standard storage to the infrequent-access tier".to_string(),
        format!(
            "Bucket holds {:.0} GB on the standard tier. Objects of this size typically qualify for the infrequent-access discount.",
            size_gb
        ),
        current_state,
        proposed_state,
        savings,
        monthly_cost,
        RiskLevel::Low,
        Difficulty::Easy,
        build_steps(&[
            ("Review access logs for objects read more than once a month", 20),
            ("Add a lifecycle policy transitioning objects to infrequent access", 15),
            ("Verify retrieval latency is acceptable for consumers", 15),
        ]),
        0.75,
        usage.record_count,
    )
}

/// Running database with a known, low connection average
pub fn db_resize_down(ctx: &RuleContext<'_>) -> RuleOutcome {
    const RULE: &str = "db_resize_down";

    let usage = ctx.usage;
    if usage.latest.service != ServiceKind::RelationalDb || !usage.runtime_status().is_active() {
        return RuleOutcome::Pass;
    }

    let connections = match usage.metric(metric::DATABASE_CONNECTIONS) {
        Some(m) => m,
        None => return skip(RULE, "databaseConnections has no samples in window"),
    };
    if connections.average >= ctx.policy.db_low_connection_watermark {
        return RuleOutcome::Pass;
    }

    let monthly_cost = match ctx.monthly_cost {
        Some(c) if c > 0.0 => c,
        _ => return skip(RULE, "monthly cost unresolvable"),
    };
    let savings = monthly_cost * ctx.policy.resize_down_ratio;

    let current_state = current_state_of(usage, Some(monthly_cost));
    let proposed_state = ResourceState {
        monthly_cost: Some(monthly_cost - savings),
        runtime_status: Some(usage.runtime_status()),
        ..Default::default()
    };

    draft(
        RecommendationKind::ResizeDown,
        RULE,
        "Downsize underutilized database instance".to_string(),
        format!(
            "Database averaged {:.1} active connections across {} observations. A smaller instance class should carry this workload.",
            connections.average, usage.record_count
        ),
        current_state,
        proposed_state,
        savings,
        monthly_cost,
        RiskLevel::Medium,
        Difficulty::Medium,
        build_steps(&[
            ("Take a manual backup before modification", 15),
            ("Schedule the class change in a maintenance window", 10),
            ("Apply the smaller instance class; expect a brief failover", 20),
            ("Monitor connection saturation and query latency for a day", 30),
        ]),
        0.75,
        usage.record_count,
    )
}

/// Sustained, stable utilization that qualifies for a reserved commitment
pub fn reserved_capacity(ctx: &RuleContext<'_>) -> RuleOutcome {
    const RULE: &str = "reserved_capacity";

    let usage = match ctx.long_usage {
        Some(u) => u,
        None => return RuleOutcome::Pass,
    };
    if !usage.runtime_status().is_active() || !usage.continuously_active() {
        return RuleOutcome::Pass;
    }
    if usage.observed_span_days() < ctx.policy.reserved_min_days {
        return RuleOutcome::Pass;
    }

    let primary = match usage.latest.service {
        ServiceKind::Compute => metric::CPU_UTILIZATION,
        ServiceKind::RelationalDb => metric::DATABASE_CONNECTIONS,
        ServiceKind::ObjectStorage => metric::STORAGE_SIZE_BYTES,
    };
    let summary = match usage.metric(primary) {
        Some(m) => m,
        None => return skip(RULE, format!("{primary} has no samples in window")),
    };
    match summary.variation() {
        Some(cv) if cv <= ctx.policy.reserved_max_variation => {}
        _ => return RuleOutcome::Pass,
    }

    let monthly_cost = match ctx.monthly_cost {
        Some(c) if c > 0.0 => c,
        _ => return skip(RULE, "monthly cost unresolvable"),
    };
    let savings = monthly_cost * ctx.policy.reserved_ratio;

    let current_state = current_state_of(ctx.usage, Some(monthly_cost));
    let proposed_state = ResourceState {
        monthly_cost: Some(monthly_cost - savings),
        runtime_status: Some(usage.runtime_status()),
        ..Default::default()
    };

    draft(
        RecommendationKind::ReservedCapacity,
        RULE,
        "Commit steady workload to reserved capacity".to_string(),
        format!(
            "Resource ran continuously for {} days with stable utilization (variation {:.0}%). A one-year reservation captures the committed-use discount.",
            usage.observed_span_days(),
            summary.variation().unwrap_or(0.0) * 100.0
        ),
        current_state,
        proposed_state,
        savings,
        monthly_cost,
        RiskLevel::Low,
        Difficulty::Easy,
        build_steps(&[
            ("Confirm the workload is expected to run for another year", 10),
            ("Purchase a matching one-year reservation", 15),
            ("Verify the reservation is applied on the next invoice", 10),
        ]),
        0.85,
        usage.record_count,
    )
}
