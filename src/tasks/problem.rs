//! Typed problem model.
//!
//! A drafted JSON object is converted into [`ProblemContent`] for its task
//! before anything else sees it, so every problem past that point has the
//! right fields and an in-range answer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::catalog::{ContentShape, TaskId};
use crate::difficulty::DifficultyLevel;

/// Structural violations of the problem contract.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProblemError {
    #[error("{task}: missing field '{field}'")]
    MissingField { task: TaskId, field: &'static str },

    #[error("{task}: field '{field}' {reason}")]
    InvalidField {
        task: TaskId,
        field: &'static str,
        reason: String,
    },

    #[error("{task}: anomaly_index {index} is out of range for {len} options")]
    IndexOutOfRange { task: TaskId, index: i64, len: usize },

    #[error("{task}: content shape {found:?} does not match the task (expected {expected:?})")]
    ShapeMismatch {
        task: TaskId,
        expected: ContentShape,
        found: ContentShape,
    },
}

/// Task-specific body of a problem.
///
/// Variant order matters for untagged deserialization: the most specific
/// field sets come first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProblemContent {
    Bridge {
        paragraph_1: Vec<String>,
        paragraph_2: Vec<String>,
        bridges: Vec<String>,
        anomaly_index: usize,
    },
    Blank {
        sentence: String,
        choices: Vec<String>,
        anomaly_index: usize,
    },
    Coherence {
        context: Vec<String>,
        is_coherent: bool,
    },
    Context {
        context: Vec<String>,
        anomaly_index: usize,
    },
}

impl ProblemContent {
    /// Builds typed content for `task` from a model-drafted JSON object.
    ///
    /// Unknown keys are ignored. Identity and meta fields the model may have
    /// included are dropped here; the controller stamps its own.
    pub fn from_json(task: TaskId, object: &Map<String, Value>) -> Result<Self, ProblemError> {
        let content = match task.shape() {
            ContentShape::Context => {
                let context = string_list(task, object, "context")?;
                let anomaly_index = answer_index(task, object, context.len())?;
                ProblemContent::Context {
                    context,
                    anomaly_index,
                }
            }
            ContentShape::Coherence => {
                let context = string_list(task, object, "context")?;
                let is_coherent = match object.get("is_coherent") {
                    None | Some(Value::Null) => {
                        return Err(ProblemError::MissingField {
                            task,
                            field: "is_coherent",
                        })
                    }
                    Some(Value::Bool(b)) => *b,
                    Some(other) => {
                        return Err(ProblemError::InvalidField {
                            task,
                            field: "is_coherent",
                            reason: format!("must be a boolean, got {}", other),
                        })
                    }
                };
                ProblemContent::Coherence {
                    context,
                    is_coherent,
                }
            }
            ContentShape::Blank => {
                let sentence = match object.get("sentence") {
                    Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
                    Some(Value::String(_)) => {
                        return Err(ProblemError::InvalidField {
                            task,
                            field: "sentence",
                            reason: "must not be empty".to_string(),
                        })
                    }
                    None | Some(Value::Null) => {
                        return Err(ProblemError::MissingField {
                            task,
                            field: "sentence",
                        })
                    }
                    Some(other) => {
                        return Err(ProblemError::InvalidField {
                            task,
                            field: "sentence",
                            reason: format!("must be a string, got {}", other),
                        })
                    }
                };
                let choices = string_list(task, object, "choices")?;
                let anomaly_index = answer_index(task, object, choices.len())?;
                ProblemContent::Blank {
                    sentence,
                    choices,
                    anomaly_index,
                }
            }
            ContentShape::Bridge => {
                let paragraph_1 = string_list(task, object, "paragraph_1")?;
                let paragraph_2 = string_list(task, object, "paragraph_2")?;
                let bridges = string_list(task, object, "bridges")?;
                let anomaly_index = answer_index(task, object, bridges.len())?;
                ProblemContent::Bridge {
                    paragraph_1,
                    paragraph_2,
                    bridges,
                    anomaly_index,
                }
            }
        };
        Ok(content)
    }

    /// Layout of this content.
    pub fn shape(&self) -> ContentShape {
        match self {
            ProblemContent::Context { .. } => ContentShape::Context,
            ProblemContent::Coherence { .. } => ContentShape::Coherence,
            ProblemContent::Blank { .. } => ContentShape::Blank,
            ProblemContent::Bridge { .. } => ContentShape::Bridge,
        }
    }

    /// The option sequence the answer indexes into (the passage for T2).
    pub fn options(&self) -> &[String] {
        match self {
            ProblemContent::Context { context, .. } | ProblemContent::Coherence { context, .. } => {
                context
            }
            ProblemContent::Blank { choices, .. } => choices,
            ProblemContent::Bridge { bridges, .. } => bridges,
        }
    }

    /// Expected answer as an option index; coherence maps `true` to 1 and `false` to 0.
    pub fn answer_index(&self) -> i64 {
        match self {
            ProblemContent::Coherence { is_coherent, .. } => i64::from(*is_coherent),
            ProblemContent::Context { anomaly_index, .. }
            | ProblemContent::Blank { anomaly_index, .. }
            | ProblemContent::Bridge { anomaly_index, .. } => *anomaly_index as i64,
        }
    }

    /// Whether `selected` is the expected answer. Negative selections never match.
    pub fn is_correct(&self, selected: i64) -> bool {
        selected >= 0 && selected == self.answer_index()
    }

    /// Checks shape and answer range for `task`.
    pub fn validate_for(&self, task: TaskId) -> Result<(), ProblemError> {
        if self.shape() != task.shape() {
            return Err(ProblemError::ShapeMismatch {
                task,
                expected: task.shape(),
                found: self.shape(),
            });
        }
        if self.options().is_empty() {
            return Err(ProblemError::InvalidField {
                task,
                field: option_field(task.shape()),
                reason: "must not be empty".to_string(),
            });
        }
        if let ProblemContent::Coherence { .. } = self {
            return Ok(());
        }
        let index = self.answer_index();
        let len = self.options().len();
        if index < 0 || index as usize >= len {
            return Err(ProblemError::IndexOutOfRange { task, index, len });
        }
        Ok(())
    }
}

fn option_field(shape: ContentShape) -> &'static str {
    match shape {
        ContentShape::Context | ContentShape::Coherence => "context",
        ContentShape::Blank => "choices",
        ContentShape::Bridge => "bridges",
    }
}

/// Reads a non-empty list of strings. A bare string is accepted as a
/// one-element list, which models sometimes emit for paragraphs.
fn string_list(
    task: TaskId,
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, ProblemError> {
    let items = match object.get(field) {
        None | Some(Value::Null) => return Err(ProblemError::MissingField { task, field }),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                other => Err(ProblemError::InvalidField {
                    task,
                    field,
                    reason: format!("must contain only strings, found {}", other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ProblemError::InvalidField {
                task,
                field,
                reason: format!("must be a list of strings, got {}", other),
            })
        }
    };

    if items.is_empty() {
        return Err(ProblemError::InvalidField {
            task,
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(items)
}

fn answer_index(
    task: TaskId,
    object: &Map<String, Value>,
    len: usize,
) -> Result<usize, ProblemError> {
    let index = match object.get("anomaly_index") {
        None | Some(Value::Null) => {
            return Err(ProblemError::MissingField {
                task,
                field: "anomaly_index",
            })
        }
        Some(value) => value.as_i64().ok_or_else(|| ProblemError::InvalidField {
            task,
            field: "anomaly_index",
            reason: format!("must be an integer, got {}", value),
        })?,
    };

    if index < 0 || index as usize >= len {
        return Err(ProblemError::IndexOutOfRange { task, index, len });
    }
    Ok(index as usize)
}

/// Mutable bookkeeping attached to a problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemMeta {
    pub topic: String,
    pub style: String,
    /// The anomaly factor requested from the drafting model, or "none".
    pub anomaly_type: String,
    pub difficulty_level: DifficultyLevel,
    /// Version counter of the sample slot.
    pub fix_count: u32,
    /// Set to "processing" on problems produced by escalation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_explanation: Option<String>,
}

/// A benchmark item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub task_id: TaskId,
    pub task_name: String,
    pub sample_id: String,
    #[serde(flatten)]
    pub content: ProblemContent,
    pub meta: ProblemMeta,
}

/// Formats the versioned identifier `{task}_{index:03}_v{fix_count}`.
pub fn sample_id(task: TaskId, sample_index: usize, fix_count: u32) -> String {
    format!("{}_{:03}_v{}", task, sample_index, fix_count)
}

impl Problem {
    /// Stamps identity fields onto typed content.
    pub fn new(task: TaskId, sample_index: usize, content: ProblemContent, meta: ProblemMeta) -> Self {
        Self {
            task_id: task,
            task_name: task.name().to_string(),
            sample_id: sample_id(task, sample_index, meta.fix_count),
            content,
            meta,
        }
    }

    /// Expected answer as an option index.
    pub fn answer_index(&self) -> i64 {
        self.content.answer_index()
    }

    /// Whether `selected` is the expected answer.
    pub fn is_correct(&self, selected: i64) -> bool {
        self.content.is_correct(selected)
    }

    /// Checks the content against this problem's task.
    pub fn validate(&self) -> Result<(), ProblemError> {
        self.content.validate_for(self.task_id)
    }

    /// JSON rendering used in prompts and ledger payloads.
    pub fn to_json_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Pretty JSON rendering used in prompts.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
