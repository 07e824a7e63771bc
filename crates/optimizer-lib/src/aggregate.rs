//! Metric aggregation over a lookback window
//!
//! Reduces per-resource usage records into per-metric summaries. An empty
//! input set yields an explicit "no data" marker (`None`), never NaN or
//! zero-filled summaries; a metric absent from the summary map means
//! "unknown", which callers must not treat as zero utilization.

use crate::models::{MetricStat, RuntimeStatus, UsageRecord};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Default lookback for rule evaluation (7 days)
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// Shorter lookback for provider metrics with one-day retention
pub const SHORT_LOOKBACK_HOURS: i64 = 24;

/// Trailing time span over which metrics are aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LookbackWindow {
    /// Window ending at `now` and reaching `days` back
    pub fn days_back(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// Window ending at `now` and reaching `hours` back
    pub fn hours_back(now: DateTime<Utc>, hours: i64) -> Self {
        Self {
            start: now - Duration::hours(hours),
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Per-metric reduction over the window
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    /// Arithmetic mean of per-record averages (matches the granularity of
    /// the data the provider hands us; not a re-weighted mean of raw samples)
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    /// Total raw samples behind the per-record averages
    pub sample_count: u64,
    /// Sample standard deviation of per-record averages (Bessel's correction)
    pub std_dev: f64,
}

impl MetricSummary {
    /// Coefficient of variation; `None` when the mean is effectively zero
    pub fn variation(&self) -> Option<f64> {
        if self.average.abs() < f64::EPSILON {
            return None;
        }
        Some(self.std_dev / self.average)
    }
}

/// Aggregated view of one resource's usage over a window
#[derive(Debug, Clone)]
pub struct AggregatedUsage {
    /// Most recent in-window record; carries status, class attributes, cost
    pub latest: UsageRecord,
    pub first_observed: DateTime<Utc>,
    pub last_observed: DateTime<Utc>,
    /// Most recent observation in an active state, if any
    pub last_active_at: Option<DateTime<Utc>>,
    pub record_count: u64,
    /// In-window records observed in an active state
    pub active_count: u64,
    metrics: HashMap<String, MetricSummary>,
}

impl AggregatedUsage {
    /// Look up a metric summary. Absence means the metric is unknown over
    /// the window - callers must not treat it as zero.
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }

    pub fn runtime_status(&self) -> RuntimeStatus {
        self.latest.runtime_status
    }

    /// Days covered by the observations in the window
    pub fn observed_span_days(&self) -> i64 {
        (self.last_observed - self.first_observed).num_days()
    }

    /// Whether every in-window observation saw the resource active
    pub fn continuously_active(&self) -> bool {
        self.active_count == self.record_count
    }
}

/// Reduce `records` to per-metric summaries over `window`.
///
/// Records outside the window or observed in the future (relative to `now`)
/// are dropped. Returns `None` when nothing remains.
pub fn aggregate(
    records: &[UsageRecord],
    window: &LookbackWindow,
    now: DateTime<Utc>,
) -> Option<AggregatedUsage> {
    let mut in_window: Vec<&UsageRecord> = records
        .iter()
        .filter(|r| r.observed_at <= now && window.contains(r.observed_at))
        .collect();

    if in_window.is_empty() {
        return None;
    }

    in_window.sort_by_key(|r| r.observed_at);

    let first_observed = in_window.first().map(|r| r.observed_at)?;
    let last_observed = in_window.last().map(|r| r.observed_at)?;
    let latest = (*in_window.last()?).clone();

    let last_active_at = in_window
        .iter()
        .rev()
        .find(|r| r.runtime_status.is_active())
        .map(|r| r.observed_at);
    let active_count = in_window
        .iter()
        .filter(|r| r.runtime_status.is_active())
        .count() as u64;

    // Collect per-record stats by metric name, skipping empty observations
    let mut by_name: HashMap<&str, Vec<&MetricStat>> = HashMap::new();
    for record in &in_window {
        for (name, stat) in &record.metrics {
            if stat.sample_count == 0 {
                continue;
            }
            by_name.entry(name.as_str()).or_default().push(stat);
        }
    }

    let mut metrics = HashMap::new();
    for (name, stats) in by_name {
        metrics.insert(name.to_string(), summarize(&stats));
    }

    Some(AggregatedUsage {
        latest,
        first_observed,
        last_observed,
        last_active_at,
        record_count: in_window.len() as u64,
        active_count,
        metrics,
    })
}

fn summarize(stats: &[&MetricStat]) -> MetricSummary {
    let n = stats.len() as f64;
    let mean = stats.iter().map(|s| s.average).sum::<f64>() / n;

    let maximum = stats
        .iter()
        .map(|s| s.maximum)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(mean);
    let minimum = stats
        .iter()
        .map(|s| s.minimum)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(mean);

    let std_dev = if stats.len() > 1 {
        let variance = stats
            .iter()
            .map(|s| (s.average - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    MetricSummary {
        average: mean,
        maximum,
        minimum,
        sample_count: stats.iter().map(|s| s.sample_count).sum(),
        std_dev,
    }
}
