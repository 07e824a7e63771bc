//! In-memory summary aggregation over recommendations
//!
//! Grouping key is the recommendation kind; breakdown rows are sorted by
//! potential savings descending, then kind name for stability. Implemented
//! as plain grouping over an explicit slice so any backing store can feed
//! it.

use crate::models::{Priority, Recommendation, RecommendationKind, RecommendationStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count of recommendations in one status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: RecommendationStatus,
    pub count: u64,
}

/// Savings rollup for one recommendation kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindBreakdown {
    pub kind: RecommendationKind,
    pub count: u64,
    /// Monthly savings still on the table (active recommendations only)
    pub potential_savings: f64,
}

/// Account-level rollup of recommendation state and savings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub total: u64,
    pub by_status: Vec<StatusCount>,
    pub by_kind: Vec<KindBreakdown>,
    /// Monthly savings from recommendations not yet resolved
    pub potential_monthly_savings: f64,
    /// Monthly savings already captured by implemented recommendations
    pub realized_monthly_savings: f64,
    pub currency: String,
}

/// Stable status ordering for the by-status section
const STATUS_ORDER: [RecommendationStatus; 5] = [
    RecommendationStatus::Pending,
    RecommendationStatus::InProgress,
    RecommendationStatus::Implemented,
    RecommendationStatus::Dismissed,
    RecommendationStatus::Failed,
];

/// Roll up a recommendation set into an account summary
pub fn summarize(recommendations: &[Recommendation], currency: &str) -> AccountSummary {
    let mut status_counts: BTreeMap<usize, u64> = BTreeMap::new();
    let mut kinds: BTreeMap<&'static str, KindBreakdown> = BTreeMap::new();
    let mut potential = 0.0;
    let mut realized = 0.0;

    for rec in recommendations {
        let order = STATUS_ORDER
            .iter()
            .position(|s| *s == rec.status)
            .unwrap_or(STATUS_ORDER.len());
        *status_counts.entry(order).or_insert(0) += 1;

        let entry = kinds
            .entry(rec.kind.as_str())
            .or_insert_with(|| KindBreakdown {
                kind: rec.kind,
                count: 0,
                potential_savings: 0.0,
            });
        entry.count += 1;

        if rec.is_active() {
            entry.potential_savings += rec.estimated_savings.amount;
            potential += rec.estimated_savings.amount;
        } else if rec.status == RecommendationStatus::Implemented {
            realized += rec.estimated_savings.amount;
        }
    }

    let by_status = status_counts
        .into_iter()
        .filter(|(order, _)| *order < STATUS_ORDER.len())
        .map(|(order, count)| StatusCount {
            status: STATUS_ORDER[order],
            count,
        })
        .collect();

    let mut by_kind: Vec<KindBreakdown> = kinds.into_values().collect();
    by_kind.sort_by(|a, b| {
        b.potential_savings
            .partial_cmp(&a.potential_savings)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
    });

    AccountSummary {
        total: recommendations.len() as u64,
        by_status,
        by_kind,
        potential_monthly_savings: potential,
        realized_monthly_savings: realized,
        currency: currency.to_string(),
    }
}

/// List-view ordering: priority descending, then savings descending.
/// The engine computes per-rule priority but never ranks across resources;
/// this is the consuming view's sort.
pub fn sort_for_display(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| {
        priority_rank(b.priority)
            .cmp(&priority_rank(a.priority))
            .then_with(|| {
                b.estimated_savings
                    .amount
                    .partial_cmp(&a.estimated_savings.amount)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
}

fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::Low => 0,
        Priority::Medium => 1,
        Priority::High => 2,
        Priority::Critical => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CostPeriod, DecisionMetadata, Difficulty, ResourceState, RiskLevel, SavingsEstimate,
        ServiceKind,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn rec(
        kind: RecommendationKind,
        status: RecommendationStatus,
        priority: Priority,
        savings: f64,
    ) -> Recommendation {
        let now = Utc::now();
        Recommendation {
            id: Uuid::new_v4(),
            owner_id: "o".to_string(),
            account_ref: "a".to_string(),
            resource_id: "r".to_string(),
            service: ServiceKind::Compute,
            region: "us-east-1".to_string(),
            kind,
            title: "t".to_string(),
            description: "d".to_string(),
            current_state: ResourceState::default(),
            proposed_state: ResourceState::default(),
            estimated_savings: SavingsEstimate {
                amount: savings,
                currency: "USD".to_string(),
                period: CostPeriod::Monthly,
                percentage: 0.0,
            },
            priority,
            risk_level: RiskLevel::Low,
            difficulty: Difficulty::Easy,
            steps: vec![],
            status,
            metadata: DecisionMetadata {
                source: "rule-engine".to_string(),
                confidence: 0.8,
                data_point_count: 1,
                algorithm_id: "test".to_string(),
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

    #[test]
    fn test_summarize_savings_split() {
        let recs = vec![
            rec(
                RecommendationKind::ResizeDown,
                RecommendationStatus::Pending,
                Priority::High,
                50.0,
            ),
            rec(
                RecommendationKind::StorageTierChange,
                RecommendationStatus::InProgress,
                Priority::Medium,
                8.0,
            ),
            rec(
                RecommendationKind::Delete,
                RecommendationStatus::Implemented,
                Priority::Medium,
                30.0,
            ),
            rec(
                RecommendationKind::ResizeDown,
                RecommendationStatus::Dismissed,
                Priority::High,
                99.0,
            ),
        ];

        let summary = summarize(&recs, "USD");
        assert_eq!(summary.total, 4);
        assert!((summary.potential_monthly_savings - 58.0).abs() < 1e-9);
        assert!((summary.realized_monthly_savings - 30.0).abs() < 1e-9);

        // Active savings drive the kind ordering: resize (50) before tier (8)
        assert_eq!(summary.by_kind[0].kind, RecommendationKind::ResizeDown);
        assert!((summary.by_kind[0].potential_savings - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_status_order_is_stable() {
        let recs = vec![
            rec(
                RecommendationKind::Delete,
                RecommendationStatus::Dismissed,
                Priority::Medium,
                1.0,
            ),
            rec(
                RecommendationKind::Delete,
                RecommendationStatus::Pending,
                Priority::Medium,
                1.0,
            ),
        ];
        let summary = summarize(&recs, "USD");
        assert_eq!(summary.by_status[0].status, RecommendationStatus::Pending);
        assert_eq!(summary.by_status[1].status, RecommendationStatus::Dismissed);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], "USD");
        assert_eq!(summary.total, 0);
        assert!(summary.by_status.is_empty());
        assert!(summary.by_kind.is_empty());
        assert_eq!(summary.potential_monthly_savings, 0.0);
    }

    #[test]
    fn test_sort_for_display() {
        let mut recs = vec![
            rec(
                RecommendationKind::Delete,
                RecommendationStatus::Pending,
                Priority::Medium,
                500.0,
            ),
            rec(
                RecommendationKind::ResizeDown,
                RecommendationStatus::Pending,
                Priority::Critical,
                10.0,
            ),
            rec(
                RecommendationKind::ResizeDown,
                RecommendationStatus::Pending,
                Priority::Critical,
                80.0,
            ),
        ];
        sort_for_display(&mut recs);

        // Priority wins over savings; within a priority, savings decide
        assert_eq!(recs[0].priority, Priority::Critical);
        assert!((recs[0].estimated_savings.amount - 80.0).abs() < 1e-9);
        assert!((recs[1].estimated_savings.amount - 10.0).abs() < 1e-9);
        assert_eq!(recs[2].priority, Priority::Medium);
    }
}
