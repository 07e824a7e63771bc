//! Static price table and fallback cost estimation
//!
//! The estimator is a fallback: when a usage record already carries a
//! provider-reported cost, that value wins. Estimation only kicks in when
//! the cost is missing, or reported as zero while the resource is active.

use crate::models::{CostFigure, CostPeriod, ServiceKind, UsageRecord};
use std::collections::HashMap;

/// Billing hours per month used to normalise hourly rates
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Hourly USD applied when a class key is not in the table
pub const DEFAULT_COMPUTE_RATE: f64 = 0.05;
pub const DEFAULT_STORAGE_RATE: f64 = 0.004;
pub const DEFAULT_DATABASE_RATE: f64 = 0.08;

/// Static map from (service, class key) to hourly USD.
///
/// Reloadable configuration; never mutated by the engine. Rates are
/// deliberately approximate - exact provider pricing fidelity is out of
/// scope.
#[derive(Debug, Clone)]
pub struct PriceTable {
    rates: HashMap<(ServiceKind, String), f64>,
    defaults: HashMap<ServiceKind, f64>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let mut rates = HashMap::new();
        for (class, hourly) in [
            ("compute.nano", 0.0052),
            ("compute.micro", 0.0104),
            ("compute.small", 0.0208),
            ("compute.medium", 0.0416),
            ("compute.large", 0.0832),
            ("compute.xlarge", 0.1664),
        ] {
            rates.insert((ServiceKind::Compute, class.to_string()), hourly);
        }
        for (class, hourly) in [
            ("standard", 0.0045),
            ("infrequent-access", 0.0027),
            ("archive", 0.0008),
        ] {
            rates.insert((ServiceKind::ObjectStorage, class.to_string()), hourly);
        }
        for (class, hourly) in [
            ("db.micro", 0.017),
            ("db.small", 0.034),
            ("db.medium", 0.068),
            ("db.large", 0.136),
        ] {
            rates.insert((ServiceKind::RelationalDb, class.to_string()), hourly);
        }

        let defaults = HashMap::from([
            (ServiceKind::Compute, DEFAULT_COMPUTE_RATE),
            (ServiceKind::ObjectStorage, DEFAULT_STORAGE_RATE),
            (ServiceKind::RelationalDb, DEFAULT_DATABASE_RATE),
        ]);

        Self { rates, defaults }
    }
}

impl PriceTable {
    /// Override or add a rate; used when reloading pricing configuration
    pub fn with_rate(mut self, service: ServiceKind, class_key: &str, hourly: f64) -> Self {
        self.rates.insert((service, class_key.to_string()), hourly);
        self
    }

    fn hourly_rate(&self, service: ServiceKind, class_key: &str) -> f64 {
        self.rates
            .get(&(service, class_key.to_string()))
            .copied()
            .unwrap_or_else(|| self.defaults.get(&service).copied().unwrap_or(0.0))
    }
}

/// Maps (service, class, running-state) to an hourly USD figure
#[derive(Debug, Clone, Default)]
pub struct CostEstimator {
    table: PriceTable,
}

impl CostEstimator {
    pub fn new(table: PriceTable) -> Self {
        Self { table }
    }

    /// Estimate the hourly USD cost of a resource.
    ///
    /// A stopped or terminated resource yields `0.0`; unknown class keys
    /// fall back to the per-service default rate.
    pub fn estimate(&self, service: ServiceKind, class_key: &str, is_active: bool) -> f64 {
        if !is_active {
            return 0.0;
        }
        self.table.hourly_rate(service, class_key)
    }

    /// Hourly estimate normalised to a month
    pub fn estimate_monthly(&self, service: ServiceKind, class_key: &str, is_active: bool) -> f64 {
        self.estimate(service, class_key, is_active) * HOURS_PER_MONTH
    }
}

/// Normalise a reported cost figure to monthly
pub fn monthly_amount(cost: &CostFigure) -> f64 {
    match cost.period {
        CostPeriod::Hourly => cost.amount * HOURS_PER_MONTH,
        CostPeriod::Monthly => cost.amount,
    }
}

/// Resolve a record's monthly cost, preferring the provider-reported figure.
///
/// Falls back to the estimator when the cost is absent, or reported as zero
/// for an active resource ("$0 but running" must not feed savings math).
/// Returns `None` only when the fallback also resolves to zero for an
/// inactive resource with no reported cost.
pub fn resolve_monthly_cost(record: &UsageRecord, estimator: &CostEstimator) -> Option<f64> {
    let is_active = record.runtime_status.is_active();

    if let Some(cost) = &record.cost {
        let monthly = monthly_amount(cost);
        if monthly > 0.0 || !is_active {
            return Some(monthly);
        }
    }

    let class_key = record
        .class_attributes
        .get(crate::models::metric::INSTANCE_CLASS)
        .or_else(|| {
            record
                .class_attributes
                .get(crate::models::metric::STORAGE_CLASS)
        })
        .map(String::as_str)
        .unwrap_or("");

    let estimated = estimator.estimate_monthly(record.service, class_key, is_active);
    if estimated > 0.0 {
        Some(estimated)
    } else if !is_active {
        Some(0.0)
    } else {
        None
    }
}
