//! Reconciliation state machine
//!
//! Querying → Evaluating → {NoAction | Deleting | AwaitingUpload} → Done
//!
//! Fatal errors jump straight to Done from Querying or Evaluating.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Phase of one reconciliation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    /// Resolving the channel and listing candidates
    Querying,
    /// Matching candidates against the request
    Evaluating,
    /// Current state already satisfies the intent
    NoAction,
    /// Deletion requests being issued
    Deleting,
    /// Nothing matched and an upload was requested
    AwaitingUpload,
    Done,
}

impl ReconcileState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReconcileState::Done)
    }

    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: ReconcileState) -> bool {
        use ReconcileState::*;
        match (self, target) {
            (Querying, Evaluating) => true,
            (Querying, Done) => true, // lookup or listing failed

            (Evaluating, NoAction) => true,
            (Evaluating, Deleting) => true,
            (Evaluating, AwaitingUpload) => true,
            (Evaluating, Done) => true, // missing artifact

            (NoAction, Done) => true,
            (Deleting, Done) => true,
            (AwaitingUpload, Done) => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileState::Querying => "querying",
            ReconcileState::Evaluating => "evaluating",
            ReconcileState::NoAction => "no_action",
            ReconcileState::Deleting => "deleting",
            ReconcileState::AwaitingUpload => "awaiting_upload",
            ReconcileState::Done => "done",
        }
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus the path taken to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTrail {
    current: ReconcileState,
    history: Vec<ReconcileState>,
}

impl StateTrail {
    pub fn new() -> Self {
        Self {
            current: ReconcileState::Querying,
            history: vec![ReconcileState::Querying],
        }
    }

    pub fn current(&self) -> ReconcileState {
        self.current
    }

    pub fn history(&self) -> &[ReconcileState] {
        &self.history
    }

    pub fn transition(&mut self, target: ReconcileState) -> Result<(), EngineError> {
        if !self.current.can_transition_to(target) {
            return Err(EngineError::InvalidTransition {
                from: self.current.to_string(),
                to: target.to_string(),
            });
        }
        tracing::trace!(from = %self.current, to = %target, "reconcile transition");
        self.current = target;
        self.history.push(target);
        Ok(())
    }

    /// Enter Done from wherever we are, for fatal exits
    pub fn abort(&mut self) {
        if self.current.can_transition_to(ReconcileState::Done) {
            self.current = ReconcileState::Done;
            self.history.push(ReconcileState::Done);
        }
    }
}

impl Default for StateTrail {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        use ReconcileState::*;
        assert!(Querying.can_transition_to(Evaluating));
        assert!(Evaluating.can_transition_to(Deleting));
        assert!(Evaluating.can_transition_to(AwaitingUpload));
        assert!(Deleting.can_transition_to(Done));
        assert!(Querying.can_transition_to(Done));
    }

    #[test]
    fn test_invalid_transitions() {
        use ReconcileState::*;
        assert!(!Querying.can_transition_to(Deleting));
        assert!(!NoAction.can_transition_to(Deleting));
        assert!(!Deleting.can_transition_to(AwaitingUpload));
        assert!(!Done.can_transition_to(Querying));
        assert!(Done.is_terminal());
    }

    #[test]
    fn test_trail_records_history() {
        let mut trail = StateTrail::new();
        trail.transition(ReconcileState::Evaluating).unwrap();
        trail.transition(ReconcileState::NoAction).unwrap();
        trail.transition(ReconcileState::Done).unwrap();
        assert_eq!(
            trail.history(),
            &[
                ReconcileState::Querying,
                ReconcileState::Evaluating,
                ReconcileState::NoAction,
                ReconcileState::Done
            ]
        );
    }

    #[test]
    fn test_trail_rejects_skip() {
        let mut trail = StateTrail::new();
        let err = trail.transition(ReconcileState::Deleting).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(trail.current(), ReconcileState::Querying);
    }

    #[test]
    fn test_abort_from_terminal_is_noop() {
        let mut trail = StateTrail::new();
        trail.abort();
        trail.abort();
        assert_eq!(trail.history().len(), 2);
    }
}
