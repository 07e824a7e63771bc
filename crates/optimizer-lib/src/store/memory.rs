//! Dashmap-backed in-memory stores
//!
//! Used by the service binary and tests. Usage records are bucketed per
//! (owner, account, service) so tenant scoping is structural; the
//! recommendation map's per-entry locking makes the status CAS atomic.

use super::{async_trait, RecommendationFilter, RecommendationStore, UsageStore};
use crate::aggregate::LookbackWindow;
use crate::error::{OptimizerError, StoreError};
use crate::models::{
    Recommendation, RecommendationKind, RecommendationStatus, ServiceKind, UsageRecord,
};
use dashmap::DashMap;
use uuid::Uuid;

type TenantServiceKey = (String, String, ServiceKind);

/// In-memory usage record store
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    records: DashMap<TenantServiceKey, Vec<UsageRecord>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn fetch_usage(
        &self,
        owner_id: &str,
        account_ref: &str,
        service: ServiceKind,
        window: &LookbackWindow,
    ) -> Result<Vec<UsageRecord>, StoreError> {
        let key = (owner_id.to_string(), account_ref.to_string(), service);
        let records = self
            .records
            .get(&key)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|r| window.contains(r.observed_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn record_usage(&self, records: Vec<UsageRecord>) -> Result<(), StoreError> {
        for record in records {
            let key = (
                record.owner_id.clone(),
                record.account_ref.clone(),
                record.service,
            );
            self.records.entry(key).or_default().push(record);
        }
        Ok(())
    }
}

/// In-memory recommendation store
#[derive(Debug, Default)]
pub struct InMemoryRecommendationStore {
    by_id: DashMap<Uuid, Recommendation>,
}

impl InMemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn save(&self, recommendations: Vec<Recommendation>) -> Result<(), StoreError> {
        for rec in recommendations {
            self.by_id.insert(rec.id, rec);
        }
        Ok(())
    }

    async fn find_active(
        &self,
        owner_id: &str,
        account_ref: &str,
        resource_id: &str,
        kind: RecommendationKind,
    ) -> Result<Option<Recommendation>, StoreError> {
        let found = self.by_id.iter().find_map(|entry| {
            let rec = entry.value();
            (rec.owner_id == owner_id
                && rec.account_ref == account_ref
                && rec.resource_id == resource_id
                && rec.kind == kind
                && rec.is_active())
            .then(|| rec.clone())
        });
        Ok(found)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recommendation>, StoreError> {
        Ok(self.by_id.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: RecommendationStatus,
        updated: Recommendation,
    ) -> Result<Recommendation, OptimizerError> {
        // Entry lock holds for the whole compare-and-swap
        let mut entry = self
            .by_id
            .get_mut(&id)
            .ok_or_else(|| OptimizerError::validation(format!("unknown recommendation {id}")))?;

        if entry.status != expected {
            return Err(OptimizerError::conflict(format!(
                "recommendation {id} is {}, expected {}",
                entry.status.as_str(),
                expected.as_str()
            )));
        }

        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    async fn list(
        &self,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>, StoreError> {
        let matches = self
            .by_id
            .iter()
            .filter(|entry| {
                let rec = entry.value();
                filter
                    .owner_id
                    .as_ref()
                    .map_or(true, |v| &rec.owner_id == v)
                    && filter
                        .account_ref
                        .as_ref()
                        .map_or(true, |v| &rec.account_ref == v)
                    && filter.status.map_or(true, |v| rec.status == v)
                    && filter.service.map_or(true, |v| rec.service == v)
                    && filter.kind.map_or(true, |v| rec.kind == v)
            })
            .map(|entry| entry.value().clone())
            .collect();
        Ok(matches)
    }
}
