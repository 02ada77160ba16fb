//! Command-line interface for anomaly-forge.
//!
//! Provides commands for generation runs, catalog listing and configuration
//! checks.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
