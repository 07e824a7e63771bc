//! Storage interfaces for usage records and recommendations
//!
//! The engine never talks to a concrete backend; it sees these traits.
//! Every operation is scoped to an (owner, account) pair - cross-tenant
//! reads are a contract violation of the implementation, not something
//! callers defend against.

mod memory;

pub use memory::{InMemoryRecommendationStore, InMemoryUsageStore};

use crate::aggregate::LookbackWindow;
use crate::error::{OptimizerError, StoreError};
use crate::models::{
    Recommendation, RecommendationKind, RecommendationStatus, ServiceKind, UsageRecord,
};
use uuid::Uuid;

pub use async_trait::async_trait;

/// Read/write access to the usage record store
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Usage records for one tenant's service, restricted to the window
    async fn fetch_usage(
        &self,
        owner_id: &str,
        account_ref: &str,
        service: ServiceKind,
        window: &LookbackWindow,
    ) -> Result<Vec<UsageRecord>, StoreError>;

    /// Append records; called by the ingestion collaborator
    async fn record_usage(&self, records: Vec<UsageRecord>) -> Result<(), StoreError>;
}

/// Filter for recommendation listings
#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    pub owner_id: Option<String>,
    pub account_ref: Option<String>,
    pub status: Option<RecommendationStatus>,
    pub service: Option<ServiceKind>,
    pub kind: Option<RecommendationKind>,
}

/// Persistence and lifecycle operations for recommendations
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Insert or replace recommendations by id
    async fn save(&self, recommendations: Vec<Recommendation>) -> Result<(), StoreError>;

    /// The at-most-one active recommendation for a (resource, kind) pair
    async fn find_active(
        &self,
        owner_id: &str,
        account_ref: &str,
        resource_id: &str,
        kind: RecommendationKind,
    ) -> Result<Option<Recommendation>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Recommendation>, StoreError>;

    /// Compare-and-swap status update: applies `updated` only while the
    /// stored status still equals `expected`. An unknown id is a validation
    /// failure; a status mismatch is a conflict, never an overwrite.
    async fn update_status(
        &self,
        id: Uuid,
        expected: RecommendationStatus,
        updated: Recommendation,
    ) -> Result<Recommendation, OptimizerError>;

    async fn list(
        &self,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>, StoreError>;
}
