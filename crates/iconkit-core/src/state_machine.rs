//! Per-request lifecycle
//!
//! `Idle → Staged → Invoked → {Failed | Collected} → {Failed | Packaged} → Delivered`
//!
//! `Failed` and `Delivered` are terminal. Nothing is retried.

use crate::error::PipelineError;
use crate::types::{RequestId, Stage};

/// Lifecycle state of one conversion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    Idle,
    Staged,
    Invoked,
    Collected,
    Packaged,
    Delivered,
    Failed,
}

impl RequestState {
    /// Stage whose completion enters this state
    #[must_use]
    pub fn stage(self) -> Stage {
        match self {
            RequestState::Idle | RequestState::Failed => Stage::Initialization,
            RequestState::Staged => Stage::Staging,
            RequestState::Invoked => Stage::Invocation,
            RequestState::Collected => Stage::Collection,
            RequestState::Packaged => Stage::Packaging,
            RequestState::Delivered => Stage::Delivery,
        }
    }

    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Delivered | RequestState::Failed)
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RequestState) -> Vec<RequestState> {
    use RequestState::*;
    match from {
        Idle => vec![Staged, Failed],
        Staged => vec![Invoked, Failed],
        Invoked => vec![Collected, Failed],
        Collected => vec![Packaged, Failed],
        Packaged => vec![Delivered, Failed],
        Delivered | Failed => vec![],
    }
}

/// Validates a state transition.
///
/// # Errors
/// Returns `PipelineError::IllegalTransition` for any step not listed by
/// [`allowed_transitions`]
pub fn validate_transition(from: RequestState, to: RequestState) -> Result<(), PipelineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PipelineError::IllegalTransition { from, to })
    }
}

/// Tracks one request through its lifecycle
#[derive(Debug)]
pub struct RequestTracker {
    id: RequestId,
    state: RequestState,
}

impl RequestTracker {
    /// Start tracking in `Idle`
    #[inline]
    #[must_use]
    pub fn new(id: RequestId) -> Self {
        Self {
            id,
            state: RequestState::Idle,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns `PipelineError::IllegalTransition` if the step is not allowed
    pub fn advance(&mut self, to: RequestState) -> Result<(), PipelineError> {
        validate_transition(self.state, to)?;
        tracing::debug!(request = %self.id, from = ?self.state, to = ?to, "request transition");
        self.state = to;
        Ok(())
    }

    /// Move to `Failed` unless already terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!(request = %self.id, from = ?self.state, "request failed");
            self.state = RequestState::Failed;
        }
    }
}
