//! Error taxonomy for the cost optimizer
//!
//! Four failure classes with distinct handling:
//! - `Validation`: malformed input to a public operation, surfaced to the
//!   caller, never retried.
//! - `DataUnavailable`: a rule's required metric is missing or stale; the
//!   rule skips and evaluation of sibling resources continues.
//! - `Conflict`: a concurrent status-transition race, surfaced as a rejected
//!   transition rather than a silent overwrite.
//! - `Store`: the underlying persistence call failed.

use thiserror::Error;

/// Failures of the underlying record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Backend(String),
}

/// Top-level error type for public operations
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("required data unavailable for {resource_id} ({rule}): {detail}")]
    DataUnavailable {
        resource_id: String,
        rule: String,
        detail: String,
    },

    #[error("conflicting transition: {0}")]
    Conflict(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl OptimizerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        OptimizerError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        OptimizerError::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OptimizerError::validation("dismissal reason is required");
        assert_eq!(
            err.to_string(),
            "validation failed: dismissal reason is required"
        );

        let err = OptimizerError::DataUnavailable {
            resource_id: "i-123".to_string(),
            rule: "compute_resize_down".to_string(),
            detail: "cpuUtilization has no samples".to_string(),
        };
        assert!(err.to_string().contains("i-123"));
        assert!(err.to_string().contains("compute_resize_down"));
    }

    #[test]
    fn test_store_error_wraps() {
        let err: OptimizerError = StoreError::Backend("connection refused".to_string()).into();
        assert!(matches!(err, OptimizerError::Store(_)));
    }
}
