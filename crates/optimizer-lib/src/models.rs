//! Core data models for the cost optimizer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Maximum length of a recommendation title
pub const MAX_TITLE_LEN: usize = 120;

/// Maximum length of a recommendation description
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Metric names and class-attribute keys used by the rule engine
pub mod metric {
    /// CPU utilization percentage (0-100)
    pub const CPU_UTILIZATION: &str = "cpuUtilization";
    /// Object storage size in bytes
    pub const STORAGE_SIZE_BYTES: &str = "storageSizeBytes";
    /// Active database connections
    pub const DATABASE_CONNECTIONS: &str = "databaseConnections";

    /// Class attribute key: instance class (e.g. "compute.medium")
    pub const INSTANCE_CLASS: &str = "instanceClass";
    /// Class attribute key: storage tier (e.g. "standard")
    pub const STORAGE_CLASS: &str = "storageClass";
    /// Class attribute key: database engine
    pub const ENGINE: &str = "engine";
}

/// Cloud service a resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceKind {
    Compute,
    ObjectStorage,
    RelationalDb,
}

impl ServiceKind {
    /// All services the engine evaluates, in a stable order
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::Compute,
        ServiceKind::ObjectStorage,
        ServiceKind::RelationalDb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Compute => "COMPUTE",
            ServiceKind::ObjectStorage => "OBJECT_STORAGE",
            ServiceKind::RelationalDb => "RELATIONAL_DB",
        }
    }
}

/// Provider-reported runtime state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    Running,
    Stopped,
    Available,
    Terminated,
    Unknown,
}

impl RuntimeStatus {
    /// Whether the resource is incurring active-state charges.
    /// `Available` is the running state reported by managed databases.
    pub fn is_active(&self) -> bool {
        matches!(self, RuntimeStatus::Running | RuntimeStatus::Available)
    }
}

/// One metric's pre-aggregated observation inside a usage record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStat {
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub sample_count: u64,
    pub unit: String,
}

/// Billing period a cost amount refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostPeriod {
    Hourly,
    Monthly,
}

/// A money amount with explicit currency and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostFigure {
    pub amount: f64,
    pub currency: String,
    pub period: CostPeriod,
}

/// Point-in-time metric snapshot for one cloud resource.
///
/// Created by the ingestion collaborator; the rule engine only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub owner_id: String,
    pub account_ref: String,
    pub resource_id: String,
    pub service: ServiceKind,
    pub region: String,
    pub observed_at: DateTime<Utc>,
    pub metrics: HashMap<String, MetricStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostFigure>,
    #[serde(default)]
    pub class_attributes: HashMap<String, String>,
    pub runtime_status: RuntimeStatus,
}

/// Action a recommendation proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    ResizeDown,
    ResizeUp,
    Stop,
    Delete,
    StorageTierChange,
    ReservedCapacity,
    SpotCandidate,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::ResizeDown => "RESIZE_DOWN",
            RecommendationKind::ResizeUp => "RESIZE_UP",
            RecommendationKind::Stop => "STOP",
            RecommendationKind::Delete => "DELETE",
            RecommendationKind::StorageTierChange => "STORAGE_TIER_CHANGE",
            RecommendationKind::ReservedCapacity => "RESERVED_CAPACITY",
            RecommendationKind::SpotCandidate => "SPOT_CANDIDATE",
        }
    }
}

/// Urgency of acting on a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Operational risk of implementing a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Expected implementation effort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Lifecycle state of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    InProgress,
    Implemented,
    Dismissed,
    Failed,
}

impl RecommendationStatus {
    /// Terminal states are never reopened; a recurring condition produces a
    /// fresh recommendation instead.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecommendationStatus::Implemented
                | RecommendationStatus::Dismissed
                | RecommendationStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::InProgress => "in_progress",
            RecommendationStatus::Implemented => "implemented",
            RecommendationStatus::Dismissed => "dismissed",
            RecommendationStatus::Failed => "failed",
        }
    }
}

/// Snapshot of the relevant class/cost/utilization at decision time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_status: Option<RuntimeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization_pct: Option<f64>,
}

/// Projected savings if a recommendation is implemented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsEstimate {
    /// Always non-negative
    pub amount: f64,
    pub currency: String,
    pub period: CostPeriod,
    /// Share of the current cost saved, 0-100
    pub percentage: f64,
}

/// One step of the remediation plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationStep {
    pub order: u32,
    pub description: String,
    pub estimated_minutes: u32,
}

/// Provenance of the decision, letting callers audit why a recommendation fired
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionMetadata {
    pub source: String,
    /// Confidence in the heuristic, 0.0-1.0
    pub confidence: f64,
    /// Usage records that backed the decision
    pub data_point_count: u64,
    pub algorithm_id: String,
    pub last_calculated: DateTime<Utc>,
}

/// A cost-optimization recommendation with a defined lifecycle.
///
/// At most one active (non-terminal) instance exists per
/// (resource_id, kind) pair at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub owner_id: String,
    pub account_ref: String,
    pub resource_id: String,
    pub service: ServiceKind,
    pub region: String,
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub current_state: ResourceState,
    pub proposed_state: ResourceState,
    pub estimated_savings: SavingsEstimate,
    pub priority: Priority,
    pub risk_level: RiskLevel,
    pub difficulty: Difficulty,
    pub steps: Vec<RemediationStep>,
    pub status: RecommendationStatus,
    pub metadata: DecisionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implemented_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implemented_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissal_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Recommendation {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Truncate a string to `max` characters on a char boundary
pub(crate) fn truncate_to(value: String, max: usize) -> String {
    if value.chars().count() <= max {
        return value;
    }
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!RecommendationStatus::Pending.is_terminal());
        assert!(!RecommendationStatus::InProgress.is_terminal());
        assert!(RecommendationStatus::Implemented.is_terminal());
        assert!(RecommendationStatus::Dismissed.is_terminal());
        assert!(RecommendationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_runtime_status_active() {
        assert!(RuntimeStatus::Running.is_active());
        assert!(RuntimeStatus::Available.is_active());
        assert!(!RuntimeStatus::Stopped.is_active());
        assert!(!RuntimeStatus::Terminated.is_active());
        assert!(!RuntimeStatus::Unknown.is_active());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_service_kind_wire_names() {
        let json = serde_json::to_string(&ServiceKind::ObjectStorage).unwrap();
        assert_eq!(json, "\"OBJECT_STORAGE\"");
        let json = serde_json::to_string(&ServiceKind::RelationalDb).unwrap();
        assert_eq!(json, "\"RELATIONAL_DB\"");
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&RecommendationStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_truncate_to() {
        assert_eq!(truncate_to("hello".to_string(), 10), "hello");
        assert_eq!(truncate_to("hello".to_string(), 3), "hel");
    }
}
