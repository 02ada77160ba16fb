//! Agents for the three roles of the generation loop.
//!
//! - [`TeacherAgent`] drafts and hardens problems
//! - [`QualityGate`] approves or rejects drafts and advises on hardening
//! - [`StudentAgent`] attempts problems
//!
//! Each agent records its own model exchanges in the sample's ledger scope.
//! Controller decisions are recorded by the controller.

pub mod error;
pub mod quality_gate;
pub mod student;
pub mod teacher;

pub use error::{AgentError, AgentResult};
pub use quality_gate::{
    compose_feedback, GateVerdict, QualityGate, QualityGateConfig, VerdictSource, MISSING_FEEDBACK,
};
pub use student::{
    parse_answer, BinaryAnswerPolicy, StudentAgent, StudentAnswer, StudentConfig, UNPARSED_ANSWER,
};
pub use teacher::{DraftStage, TeacherAgent, TeacherConfig};
