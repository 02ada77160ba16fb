//! Generation loop for anomaly-detection samples.
//!
//! The [`EscalationController`] owns each sample from its first draft to its
//! terminal state:
//!
//! 1. **Init** - Teacher drafts an easy base problem, the Quality Gate
//!    approves or rejects it (bounded retries, then the sample is dropped)
//! 2. **Student** - the Student attempts the current problem with its
//!    earlier attempts as context
//! 3. **Escalation** - after a correct answer the Teacher hardens the problem
//!    to the next tier, gated again (bounded retries per round)
//!
//! A wrong answer, the last Student round or an exhausted escalation budget
//! accepts the last approved problem.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use anomaly_forge::generation::{ControllerSettings, EscalationController};
//! use anomaly_forge::llm::ModelGateway;
//! use anomaly_forge::tasks::TaskId;
//!
//! # async fn example(gateway: ModelGateway) {
//! let controller = EscalationController::with_provider(
//!     Arc::new(gateway),
//!     ControllerSettings::default().with_seed(42),
//! );
//! let output = controller.run(&[TaskId::T1, TaskId::T2], 10).await;
//! println!("{}", output.summary.render());
//! # }
//! ```

pub mod controller;
pub mod error;
pub mod state;
pub mod types;

pub use controller::{ControllerSettings, EscalationController, PLACEHOLDER_FEEDBACK};
pub use error::GenerationError;
pub use state::{SampleMachine, SampleState, TransitionRecord};
pub use types::{
    CeilingReason, DropReason, EscalationContext, RunOutput, RunSummary, SampleOutcome,
    SampleReport, TaskYield, ValidationLogEntry, ValidationPhase,
};
