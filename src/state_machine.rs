//! Submission state machine: explicit states and legal transition guards.
//!
//! Provides a typed state model for the submission pipeline so that:
//! 1. Every state transition is auditable and logged.
//! 2. Illegal transitions are caught by `advance()` guards.
//! 3. A submission's log line can carry the exact sequence of states.
//!
//! The transition table is where the cleanup guarantee lives: once a
//! workspace exists (`Merging`, `Publishing`), the only way to a terminal
//! state runs through `CleaningUp`. A submission cannot settle while still
//! holding a checkout.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of submission states.
///
/// Every submission starts at `Idle` and terminates at either `Succeeded`
/// or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Received, nothing checked yet.
    Idle,
    /// Checking the batch against the validation rules.
    Validating,
    /// Cloning the remote into a fresh workspace.
    Syncing,
    /// Loading the catalog document and appending the batch.
    Merging,
    /// Committing and pushing, with conflict retries.
    Publishing,
    /// Removing the workspace checkout.
    CleaningUp,
    /// Terminal state: batch recorded at the remote.
    Succeeded,
    /// Terminal state: batch rejected or publish gave up.
    Failed,
}

impl SubmissionState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether a live workspace checkout exists in this state.
    ///
    /// These states have no edge to a terminal state; their only exits run
    /// through `CleaningUp`.
    pub fn holds_workspace(self) -> bool {
        matches!(self, Self::Merging | Self::Publishing)
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Validating => write!(f, "Validating"),
            Self::Syncing => write!(f, "Syncing"),
            Self::Merging => write!(f, "Merging"),
            Self::Publishing => write!(f, "Publishing"),
            Self::CleaningUp => write!(f, "CleaningUp"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Legal transitions between submission states.
///
/// The transition table encodes the valid edges in the state graph:
/// ```text
/// Idle → Validating
/// Validating → Syncing | Failed
/// Syncing → Merging | Failed
/// Merging → Publishing | CleaningUp
/// Publishing → CleaningUp
/// CleaningUp → Succeeded | Failed
/// ```
///
/// `Validating` and `Syncing` may fail directly because no workspace has
/// materialized yet. From `Merging` onward a checkout exists, so failure
/// routes through `CleaningUp` like success does.
fn is_legal_transition(from: SubmissionState, to: SubmissionState) -> bool {
    use SubmissionState::*;

    matches!(
        (from, to),
        (Idle, Validating)
            | (Validating, Syncing)
            | (Validating, Failed)
            | (Syncing, Merging)
            | (Syncing, Failed)
            // A failed merge still owns the checkout
            | (Merging, Publishing)
            | (Merging, CleaningUp)
            // Publish success and exhaustion both hand over to cleanup
            | (Publishing, CleaningUp)
            | (CleaningUp, Succeeded)
            | (CleaningUp, Failed)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state transitioned from.
    pub from: SubmissionState,
    /// The state transitioned to.
    pub to: SubmissionState,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    /// Optional context about why this transition happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: SubmissionState,
    pub to: SubmissionState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal state transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// The submission state machine.
///
/// Tracks the current state, enforces legal transitions, and maintains a
/// complete log of all transitions for diagnostics.
pub struct StateMachine {
    current: SubmissionState,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    /// Create a new state machine starting at `Idle`.
    pub fn new() -> Self {
        Self {
            current: SubmissionState::Idle,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    /// Get the current state.
    pub fn current(&self) -> SubmissionState {
        self.current
    }

    /// Attempt to advance to the next state.
    ///
    /// Returns `Ok(())` if the transition is legal, or `Err(IllegalTransition)`
    /// if the transition would violate the state graph.
    pub fn advance(
        &mut self,
        to: SubmissionState,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(from = %self.current, to = %to, "State transition");

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// Whether the state machine is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Get the full transition log.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Get a summary string of the state machine's history.
    pub fn summary(&self) -> String {
        let mut states = vec![SubmissionState::Idle.to_string()];
        states.extend(self.transitions.iter().map(|t| t.to.to_string()));
        format!(
            "{} ({}ms)",
            states.join(" → "),
            self.created_at.elapsed().as_millis()
        )
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
