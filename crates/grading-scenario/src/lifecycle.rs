//! Scenario lifecycle state machine
//!
//! `DRAFT --apply--> CURRENT --superseded--> ARCHIVED` and
//! `DRAFT --archive--> ARCHIVED`. ARCHIVED is terminal.

use crate::types::ScenarioStatus;
use serde::Serialize;
use std::fmt;

/// Operation that touches a scenario's status or content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// Promote a draft to current
    Apply,
    /// Discard a draft
    ArchiveDraft,
    /// Retire the current scenario when another is applied
    Supersede,
    /// Change inputs, name or metrics of a draft
    Edit,
}

impl LifecycleAction {
    /// Status the scenario must be in
    #[must_use]
    pub fn source(self) -> ScenarioStatus {
        match self {
            Self::Apply | Self::ArchiveDraft | Self::Edit => ScenarioStatus::Draft,
            Self::Supersede => ScenarioStatus::Current,
        }
    }

    /// Status the scenario ends in
    #[must_use]
    pub fn target(self) -> ScenarioStatus {
        match self {
            Self::Apply => ScenarioStatus::Current,
            Self::ArchiveDraft | Self::Supersede => ScenarioStatus::Archived,
            Self::Edit => ScenarioStatus::Draft,
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Apply => "apply",
            Self::ArchiveDraft => "archive",
            Self::Supersede => "supersede",
            Self::Edit => "edit",
        })
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct IllegalTransition {
    /// Status before
    pub from: ScenarioStatus,
    /// Requested status
    pub to: ScenarioStatus,
}

/// Validates a status change
///
/// # Errors
/// Returns `IllegalTransition` for any edge not in the state machine
pub fn validate_transition(from: ScenarioStatus, to: ScenarioStatus) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// Statuses reachable in one step
#[must_use]
pub fn allowed_transitions(from: ScenarioStatus) -> Vec<ScenarioStatus> {
    use ScenarioStatus::*;
    match from {
        Draft => vec![Current, Archived],
        Current => vec![Archived],
        Archived => vec![],
    }
}

/// Checks that `action` may run on a scenario in status `from`
///
/// # Errors
/// Returns `IllegalTransition` when the scenario is in the wrong status or
/// the resulting edge is not allowed
pub fn check_action(
    action: LifecycleAction,
    from: ScenarioStatus,
) -> Result<ScenarioStatus, IllegalTransition> {
    let to = action.target();
    if from != action.source() {
        return Err(IllegalTransition { from, to });
    }
    if from != to {
        validate_transition(from, to)?;
    }
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ScenarioStatus::*;

    #[test]
    fn draft_transitions() {
        assert!(validate_transition(Draft, Current).is_ok());
        assert!(validate_transition(Draft, Archived).is_ok());
        assert!(validate_transition(Draft, Draft).is_err());
    }

    #[test]
    fn current_only_archives() {
        assert!(validate_transition(Current, Archived).is_ok());
        assert!(validate_transition(Current, Draft).is_err());
        assert!(validate_transition(Current, Current).is_err());
    }

    #[test]
    fn archived_is_terminal() {
        assert!(allowed_transitions(Archived).is_empty());
        for to in [Draft, Current, Archived] {
            assert!(validate_transition(Archived, to).is_err());
        }
    }

    #[test]
    fn apply_requires_draft() {
        assert_eq!(check_action(LifecycleAction::Apply, Draft), Ok(Current));
        assert!(check_action(LifecycleAction::Apply, Current).is_err());
        assert!(check_action(LifecycleAction::Apply, Archived).is_err());
    }

    #[test]
    fn archive_draft_rejects_current() {
        assert_eq!(check_action(LifecycleAction::ArchiveDraft, Draft), Ok(Archived));
        assert!(check_action(LifecycleAction::ArchiveDraft, Current).is_err());
    }

    #[test]
    fn supersede_requires_current() {
        assert_eq!(check_action(LifecycleAction::Supersede, Current), Ok(Archived));
        assert!(check_action(LifecycleAction::Supersede, Draft).is_err());
    }

    #[test]
    fn edit_keeps_draft() {
        assert_eq!(check_action(LifecycleAction::Edit, Draft), Ok(Draft));
        assert!(check_action(LifecycleAction::Edit, Current).is_err());
        assert!(check_action(LifecycleAction::Edit, Archived).is_err());
    }
}
