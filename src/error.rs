//! Error types for anomaly-forge operations.
//!
//! Subsystem-specific errors live next to their modules (extraction,
//! problem construction, agents, configuration). This module holds the
//! errors shared across the crate:
//! - LLM gateway and provider failures
//! - Dataset and ledger export

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: {0} environment variable not set")]
    MissingApiKey(String),

    #[error("Missing API base URL: {0} environment variable not set")]
    MissingApiBase(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("No provider registered for model '{0}' and no default provider configured")]
    UnroutableModel(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    /// Uniform failure surfaced by the gateway for any provider-side problem.
    #[error("Generation failed on provider '{provider}' for model '{model}': {reason}")]
    GenerationFailed {
        provider: String,
        model: String,
        reason: String,
    },
}

/// Errors that can occur while writing run artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create output directory '{path}': {reason}")]
    DirectoryCreationFailed { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
