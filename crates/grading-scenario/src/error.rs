//! Error types for the scenario engine
//!
//! - Input validation failures (aggregated)
//! - Lifecycle misuse
//! - Concurrent apply conflicts
//! - Persistence failures

use crate::lifecycle::LifecycleAction;
use crate::types::{ScenarioId, ScenarioStatus};
use grading_core::{LadderError, ValidationErrors};
use std::path::PathBuf;

/// Main scenario engine error type
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Malformed or out-of-range inputs
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Malformed ladder
    #[error(transparent)]
    Ladder(#[from] LadderError),

    /// Malformed request outside the derivation inputs
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Lifecycle misuse
    #[error("cannot {action} scenario {id} in status {status}")]
    InvalidTransition {
        /// Target scenario
        id: ScenarioId,
        /// Its status at the time
        status: ScenarioStatus,
        /// Attempted action
        action: LifecycleAction,
    },

    /// Another apply changed the current scenario first
    #[error("concurrent apply conflict for scenario {id}: expected current {expected:?}, found {actual:?}")]
    ConcurrentApplyConflict {
        /// Scenario being applied
        id: ScenarioId,
        /// Current scenario the caller observed
        expected: Option<ScenarioId>,
        /// Current scenario at commit time
        actual: Option<ScenarioId>,
    },

    /// A current scenario already exists
    #[error("scenario {current} is already current")]
    CurrentAlreadySet {
        /// The existing current scenario
        current: ScenarioId,
    },

    /// Scenario not in the store
    #[error("scenario not found: {0}")]
    NotFound(ScenarioId),

    /// Scenarios derived against different ladders
    #[error("scenario {found} uses a different ladder than scenario {expected}")]
    LadderMismatch {
        /// Scenario defining the reference ladder
        expected: ScenarioId,
        /// Scenario with a different ladder
        found: ScenarioId,
    },

    /// Durable store failure
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScenarioError {
    /// Check if the caller should re-fetch and retry
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentApplyConflict { .. })
    }

    /// Check if the caller can fix the request
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Ladder(_) | Self::InvalidRequest(_) | Self::LadderMismatch { .. }
        )
    }

    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::Ladder(_) | Self::InvalidRequest(_) => "validation_error",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ConcurrentApplyConflict { .. } => "concurrent_apply_conflict",
            Self::CurrentAlreadySet { .. } => "current_already_set",
            Self::NotFound(_) => "not_found",
            Self::LadderMismatch { .. } => "ladder_mismatch",
            Self::Persistence(_) => "persistence_error",
            Self::Config(_) => "config_error",
        }
    }
}

/// Durable store errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Filesystem failure
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data violates an engine invariant
    #[error("corrupt store: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use grading_core::GradingError;

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = ScenarioError::ConcurrentApplyConflict {
            id: ScenarioId::new(),
            expected: None,
            actual: Some(ScenarioId::new()),
        };
        assert!(conflict.is_retryable());
        assert!(!ScenarioError::NotFound(ScenarioId::new()).is_retryable());
    }

    #[test]
    fn transition_error_display() {
        let id = ScenarioId::new();
        let err = ScenarioError::InvalidTransition {
            id,
            status: ScenarioStatus::Archived,
            action: LifecycleAction::Apply,
        };
        assert_eq!(err.to_string(), format!("cannot apply scenario {id} in status ARCHIVED"));
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn validation_errors_convert() {
        let errors = ValidationErrors::from(GradingError::NonFiniteInput {
            field: "base_value".to_string(),
        });
        let err = ScenarioError::from(errors);
        assert!(err.is_validation());
        assert_eq!(err.code(), "validation_error");
    }
}
