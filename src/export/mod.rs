//! Export of run outputs.
//!
//! A run is persisted as JSON Lines datasets and validation logs, the full
//! process log as pretty JSON, and a readable transcript, all sharing one
//! file prefix.

pub mod artifacts;

pub use artifacts::{write_jsonl, ArtifactPaths, ArtifactWriter};
