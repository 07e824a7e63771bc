//! Recommendation lifecycle transitions
//!
//! The state machine is implemented as free functions over an explicit
//! recommendation value plus a store handle, keeping it independent of the
//! storage technology. Transitions are one-way; terminal recommendations
//! are never reopened - if the underlying condition recurs the engine
//! creates a fresh record.

use crate::error::OptimizerError;
use crate::models::{Recommendation, RecommendationStatus};
use crate::store::RecommendationStore;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Whether the state machine permits moving `from` to `to`
pub fn transition_allowed(from: RecommendationStatus, to: RecommendationStatus) -> bool {
    use RecommendationStatus::*;
    match (from, to) {
        (Pending, InProgress) => true,
        (Pending | InProgress, Implemented) => true,
        (Pending | InProgress, Dismissed) => true,
        (from, Failed) => !from.is_terminal(),
        _ => false,
    }
}

async fn load_for_transition(
    store: &dyn RecommendationStore,
    id: Uuid,
    to: RecommendationStatus,
) -> Result<Recommendation, OptimizerError> {
    let current = store
        .get(id)
        .await?
        .ok_or_else(|| OptimizerError::validation(format!("unknown recommendation {id}")))?;

    if !transition_allowed(current.status, to) {
        return Err(OptimizerError::conflict(format!(
            "cannot move recommendation {id} from {} to {}",
            current.status.as_str(),
            to.as_str()
        )));
    }
    Ok(current)
}

fn require_actor(actor: &str) -> Result<(), OptimizerError> {
    if actor.trim().is_empty() {
        return Err(OptimizerError::validation("actor is required"));
    }
    Ok(())
}

/// Mark a recommendation implemented, recording who and when.
/// Fails with a conflict if it is already terminal.
pub async fn implement(
    store: &dyn RecommendationStore,
    id: Uuid,
    actor: &str,
) -> Result<Recommendation, OptimizerError> {
    require_actor(actor)?;
    let current = load_for_transition(store, id, RecommendationStatus::Implemented).await?;
    let expected = current.status;

    let now = Utc::now();
    let mut updated = current;
    updated.status = RecommendationStatus::Implemented;
    updated.implemented_at = Some(now);
    updated.implemented_by = Some(actor.to_string());
    updated.updated_at = now;

    let saved = store.update_status(id, expected, updated).await?;
    info!(
        recommendation_id = %id,
        actor = %actor,
        "Recommendation implemented"
    );
    Ok(saved)
}

/// Dismiss a recommendation. The reason is mandatory; a missing reason is
/// a validation failure, not a silent default.
pub async fn dismiss(
    store: &dyn RecommendationStore,
    id: Uuid,
    actor: &str,
    reason: &str,
) -> Result<Recommendation, OptimizerError> {
    require_actor(actor)?;
    if reason.trim().is_empty() {
        return Err(OptimizerError::validation("dismissal reason is required"));
    }
    let current = load_for_transition(store, id, RecommendationStatus::Dismissed).await?;
    let expected = current.status;

    let now = Utc::now();
    let mut updated = current;
    updated.status = RecommendationStatus::Dismissed;
    updated.dismissed_at = Some(now);
    updated.dismissed_by = Some(actor.to_string());
    updated.dismissal_reason = Some(reason.to_string());
    updated.updated_at = now;

    let saved = store.update_status(id, expected, updated).await?;
    info!(
        recommendation_id = %id,
        actor = %actor,
        reason = %reason,
        "Recommendation dismissed"
    );
    Ok(saved)
}

/// Move a pending recommendation into progress
pub async fn begin(
    store: &dyn RecommendationStore,
    id: Uuid,
    actor: &str,
) -> Result<Recommendation, OptimizerError> {
    require_actor(actor)?;
    let current = load_for_transition(store, id, RecommendationStatus::InProgress).await?;
    let expected = current.status;

    let mut updated = current;
    updated.status = RecommendationStatus::InProgress;
    updated.updated_at = Utc::now();

    store.update_status(id, expected, updated).await
}

/// Mark a recommendation failed, with the engine- or operator-reported cause
pub async fn mark_failed(
    store: &dyn RecommendationStore,
    id: Uuid,
    reason: &str,
) -> Result<Recommendation, OptimizerError> {
    if reason.trim().is_empty() {
        return Err(OptimizerError::validation("failure reason is required"));
    }
    let current = load_for_transition(store, id, RecommendationStatus::Failed).await?;
    let expected = current.status;

    let now = Utc::now();
    let mut updated = current;
    updated.status = RecommendationStatus::Failed;
    updated.failure_reason = Some(reason.to_string());
    updated.updated_at = now;

    store.update_status(id, expected, updated).await
}
