//! Shared utility functions for anomaly-forge.
//!
//! This module provides common utilities used across multiple modules,
//! including JSON extraction from LLM responses.

pub mod json_extraction;

pub use json_extraction::{
    extract_json_object, extract_json_object_with_stage, find_matching_brace, strip_control_chars,
    ExtractionError, ExtractionStage,
};
