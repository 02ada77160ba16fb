//! Error types for the agent adapters.
//!
//! An agent error always means "this attempt failed". The controller logs it
//! and charges it to the current phase's retry budget.

use thiserror::Error;

use crate::error::LlmError;
use crate::tasks::ProblemError;
use crate::utils::ExtractionError;

/// Errors that can occur during agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model call itself failed.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// No JSON object could be located in the model's reply.
    #[error("Malformed response: {0}")]
    Extraction(#[from] ExtractionError),

    /// The reply parsed but does not describe a valid problem.
    #[error("Invalid problem: {0}")]
    Problem(#[from] ProblemError),
}

impl AgentError {
    /// Short classifier written to the ledger's `error_type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Llm(_) => "llm_call",
            AgentError::Extraction(_) => "json_parsing",
            AgentError::Problem(_) => "invalid_problem",
        }
    }
}

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskId;

    #[test]
    fn test_conversions_and_kinds() {
        let llm: AgentError = LlmError::RateLimited("slow down".to_string()).into();
        assert_eq!(llm.kind(), "llm_call");

        let extraction: AgentError = ExtractionError::MalformedResponse {
            preview: "nope".to_string(),
        }
        .into();
        assert_eq!(extraction.kind(), "json_parsing");

        let problem: AgentError = ProblemError::MissingField {
            task: TaskId::T4,
            field: "bridges",
        }
        .into();
        assert_eq!(problem.kind(), "invalid_problem");
        assert!(problem.to_string().contains("bridges"));
    }
}
