//! Controller invariant violations.

use thiserror::Error;

use super::state::SampleState;

/// Errors raised by the escalation controller itself.
///
/// Any of these ends only the sample being processed, which is dropped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Illegal state transition: {from} -> {to}")]
    IllegalTransition { from: SampleState, to: SampleState },

    #[error("No approved problem available in state {0}")]
    MissingProblem(SampleState),
}
