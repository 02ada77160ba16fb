//! Append-only process log.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tasks::TaskId;

/// Stage of a sample's lifecycle an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    StudentEvaluation,
    DifficultyIncrease,
    Completion,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::StudentEvaluation => "student_evaluation",
            Phase::DifficultyIncrease => "difficulty_increase",
            Phase::Completion => "completion",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed the logged step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Teacher,
    Student,
    Orchestrator,
    System,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Teacher => "teacher",
            AgentRole::Student => "student",
            AgentRole::Orchestrator => "orchestrator",
            AgentRole::System => "system",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the generation process.
///
/// Payloads are owned JSON values captured at insertion, so later changes
/// to the caller's data never reach a stored entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub task_id: TaskId,
    pub sample_index: usize,
    pub phase: Phase,
    pub agent: AgentRole,
    pub action: String,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub metadata: Map<String, Value>,
}

/// Errors raised by the process log.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("process log is closed; refused '{action}' entry for {task_id} sample {sample_index}")]
    Closed {
        task_id: TaskId,
        sample_index: usize,
        action: String,
    },
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LogEntry>,
    closed: bool,
}

/// Shared, append-only ledger for one run.
///
/// Clones share the same underlying entries.
#[derive(Debug, Clone, Default)]
pub struct ProcessLog {
    state: Arc<Mutex<LedgerState>>,
}

impl ProcessLog {
    /// Opens an empty ledger.
    pub fn open() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Entries are only ever pushed, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends an entry. Refused once the ledger is closed.
    pub fn append(&self, entry: LogEntry) -> Result<(), LedgerError> {
        let mut state = self.lock();
        if state.closed {
            return Err(LedgerError::Closed {
                task_id: entry.task_id,
                sample_index: entry.sample_index,
                action: entry.action,
            });
        }
        state.entries.push(entry);
        Ok(())
    }

    /// Number of entries recorded so far.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Copy of the entries recorded so far, in insertion order.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().entries.clone()
    }

    /// Seals the ledger and hands back its entries in insertion order.
    pub fn close(&self) -> Vec<LogEntry> {
        let mut state = self.lock();
        state.closed = true;
        std::mem::take(&mut state.entries)
    }
}

/// Captures `value` as an owned JSON payload.
pub fn payload<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("<unserializable payload: {}>", e)))
}

/// Ledger handle bound to one sample.
#[derive(Debug, Clone)]
pub struct SampleScope {
    log: ProcessLog,
    task_id: TaskId,
    sample_index: usize,
}

impl SampleScope {
    pub fn new(log: ProcessLog, task_id: TaskId, sample_index: usize) -> Self {
        Self {
            log,
            task_id,
            sample_index,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn sample_index(&self) -> usize {
        self.sample_index
    }

    /// Starts an entry for `action`; finish it with [`Step::record`].
    pub fn step(&self, phase: Phase, agent: AgentRole, action: &str) -> Step<'_> {
        Step {
            scope: self,
            phase,
            agent,
            action: action.to_string(),
            input: None,
            output: None,
            metadata: Map::new(),
        }
    }
}

/// Entry under construction.
#[must_use = "a step is only logged once `record` is called"]
pub struct Step<'a> {
    scope: &'a SampleScope,
    phase: Phase,
    agent: AgentRole,
    action: String,
    input: Option<Value>,
    output: Option<Value>,
    metadata: Map<String, Value>,
}

impl Step<'_> {
    pub fn input<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.input = Some(payload(value));
        self
    }

    pub fn output<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.output = Some(payload(value));
        self
    }

    /// Merges the keys of a JSON object into the entry's metadata.
    /// Non-object values are stored under `value`.
    pub fn metadata(mut self, value: Value) -> Self {
        match value {
            Value::Object(map) => self.metadata.extend(map),
            Value::Null => {}
            other => {
                self.metadata.insert("value".to_string(), other);
            }
        }
        self
    }

    /// Appends the entry. A refused append is reported, never raised.
    pub fn record(self) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            task_id: self.scope.task_id,
            sample_index: self.scope.sample_index,
            phase: self.phase,
            agent: self.agent,
            action: self.action,
            input: self.input,
            output: self.output,
            metadata: self.metadata,
        };
        if let Err(e) = self.scope.log.append(entry) {
            tracing::warn!(error = %e, "Dropped process log entry");
        }
    }
}
