//! Observability ledger.
//!
//! Every prompt, response, verdict and controller decision of a run is
//! appended to a [`ProcessLog`]. The ledger is data returned to the caller
//! and persisted with the dataset; `tracing` output is separate operator
//! diagnostics.

pub mod log;
pub mod transcript;

pub use log::{payload, AgentRole, LedgerError, LogEntry, Phase, ProcessLog, SampleScope, Step};
pub use transcript::{render_entry, render_transcript};
