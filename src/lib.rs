//! anomaly-forge: agentic generator for anomaly-detection reading benchmarks.
//!
//! A Teacher model drafts a problem, an Orchestrator model gates its quality,
//! and a Student model attempts it. Every problem the Student solves is
//! hardened to the next difficulty tier until the Student fails or a budget
//! runs out.

// Core modules
pub mod agents;
pub mod cli;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod export;
pub mod generation;
pub mod ledger;
pub mod llm;
pub mod prompts;
pub mod tasks;
pub mod utils;

// Re-export commonly used error types
pub use error::{ExportError, LlmError};

pub use config::{ConfigError, RunConfig};
pub use generation::{ControllerSettings, EscalationController, RunOutput, RunSummary};
