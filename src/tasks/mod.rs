//! Task catalog and problem model.
//!
//! - [`catalog`]: the seven task types and their drafting material
//! - [`problem`]: typed problem content, metadata and identity
//! - [`experience`]: the Student's per-sample history

pub mod catalog;
pub mod experience;
pub mod problem;

pub use catalog::{get_task, ContentShape, TaskExample, TaskId, TaskKind, TaskSpec, TASKS};
pub use experience::StudentExperience;
pub use problem::{sample_id, Problem, ProblemContent, ProblemError, ProblemMeta};
