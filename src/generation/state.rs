//! Per-sample state machine.
//!
//! Every sample starts in `InitDrafting` and ends in `Accepted` or
//! `Dropped`. The controller calls [`SampleMachine::advance`] at each step;
//! an edge outside the table is a [`GenerationError`] and the trace keeps
//! every legal move for the sample's report.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::error::GenerationError;

/// States of one sample's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleState {
    /// Asking the Teacher for a base problem.
    InitDrafting,
    /// Gate check of a base draft.
    InitValidating,
    /// The Student attempts the current problem.
    StudentSolving,
    /// Asking the Teacher for a harder version.
    EscalateDrafting,
    /// Gate check of an escalated draft.
    EscalateValidating,
    /// The last approved problem is final. Terminal.
    Accepted,
    /// No base problem was approved. Terminal.
    Dropped,
}

impl SampleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Dropped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitDrafting => "init_drafting",
            Self::InitValidating => "init_validating",
            Self::StudentSolving => "student_solving",
            Self::EscalateDrafting => "escalate_drafting",
            Self::EscalateValidating => "escalate_validating",
            Self::Accepted => "accepted",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for SampleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal edges:
/// ```text
/// InitDrafting       -> InitValidating | InitDrafting | Dropped
/// InitValidating     -> StudentSolving | InitDrafting | Dropped
/// StudentSolving     -> EscalateDrafting | Accepted
/// EscalateDrafting   -> EscalateValidating | EscalateDrafting | Accepted
/// EscalateValidating -> StudentSolving | EscalateDrafting | Accepted
/// ```
fn is_legal_transition(from: SampleState, to: SampleState) -> bool {
    use SampleState::*;

    matches!(
        (from, to),
        (InitDrafting, InitValidating)
            | (InitDrafting, InitDrafting)
            | (InitDrafting, Dropped)
            | (InitValidating, StudentSolving)
            | (InitValidating, InitDrafting)
            | (InitValidating, Dropped)
            | (StudentSolving, EscalateDrafting)
            | (StudentSolving, Accepted)
            | (EscalateDrafting, EscalateValidating)
            | (EscalateDrafting, EscalateDrafting)
            | (EscalateDrafting, Accepted)
            | (EscalateValidating, StudentSolving)
            | (EscalateValidating, EscalateDrafting)
            | (EscalateValidating, Accepted)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SampleState,
    pub to: SampleState,
    /// Student round at the time of transition (0 during init).
    pub round: u32,
    /// Milliseconds since the sample started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Tracks one sample's state and its transition history.
#[derive(Debug)]
pub struct SampleMachine {
    current: SampleState,
    round: u32,
    started_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl Default for SampleMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleMachine {
    /// Starts at `InitDrafting`.
    pub fn new() -> Self {
        Self {
            current: SampleState::InitDrafting,
            round: 0,
            started_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> SampleState {
        self.current
    }

    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    /// Moves to `to` if the edge is legal and records it.
    pub fn advance(&mut self, to: SampleState, reason: Option<&str>) -> Result<(), GenerationError> {
        if self.current.is_terminal() || !is_legal_transition(self.current, to) {
            return Err(GenerationError::IllegalTransition {
                from: self.current,
                to,
            });
        }

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            round: self.round,
            elapsed_ms: u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            reason: reason.map(str::to_string),
        });
        tracing::trace!(from = %self.current, to = %to, round = self.round, "Sample state transition");
        self.current = to;
        Ok(())
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Hands over the recorded transitions.
    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }
}
