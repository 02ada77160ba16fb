//! Prompt builders for the three agent roles.
//!
//! Every prompt is a single user message. The wording is part of the
//! benchmark's behavior, so builders are plain functions over typed inputs
//! and are covered by tests.
//!
//! - [`teacher`] - draft prompts, init feedback suffix and escalation prompts
//! - [`orchestrator`] - quality gate prompts for both modes and the improvement-feedback request
//! - [`student`] - the Student question with its two-tier history
//!
//! # Usage
//!
//! ```no_run
//! use anomaly_forge::difficulty::DifficultyLevel;
//! use anomaly_forge::prompts::{build_draft_prompt, DraftRequest};
//! use anomaly_forge::tasks::TaskId;
//!
//! let prompt = build_draft_prompt(&DraftRequest {
//!     task: TaskId::T6,
//!     topic: "economics",
//!     style: "LSAT",
//!     factor: Some("causal reversal"),
//!     difficulty: DifficultyLevel::Easy,
//!     example: None,
//! });
//! assert!(prompt.contains("logical consistency question on economics"));
//! ```

pub mod orchestrator;
pub mod student;
pub mod teacher;

pub use orchestrator::{
    build_feedback_prompt, build_gate_prompt, numbered, render_with_answer, task_description,
    task_structure, GateMode,
};
pub use student::{build_student_prompt, render_history, render_question, DEFAULT_DETAIL_WINDOW};
pub use teacher::{
    accumulate_feedback, build_draft_prompt, build_escalation_prompt, difficulty_guidance,
    with_init_feedback, DraftRequest, EscalationRequest, EASE_OFF_INSTRUCTION,
};
