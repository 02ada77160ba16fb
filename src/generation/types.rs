//! Records produced by a generation run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::TransitionRecord;
use crate::agents::VerdictSource;
use crate::difficulty::DifficultyLevel;
use crate::ledger::LogEntry;
use crate::tasks::{Problem, TaskId};

/// Which gate produced a validation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPhase {
    Init,
    DifficultyIncrease,
}

/// Escalation context attached to difficulty-phase validation records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationContext {
    pub student_loop: u32,
    pub difficulty_level: DifficultyLevel,
    pub previous_problem: Problem,
    pub student_explanation: String,
    pub orchestrator_feedback: String,
}

/// One quality gate decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationLogEntry {
    pub sample_id: String,
    pub phase: ValidationPhase,
    /// 1-based attempt within the phase's retry loop.
    pub attempt: u32,
    pub problem_snapshot: Problem,
    pub approved: bool,
    /// Rejection feedback; `None` when approved.
    pub feedback: Option<String>,
    pub verdict_source: VerdictSource,
    pub timestamp: DateTime<Utc>,
    #[serde(default, flatten, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationContext>,
}

/// Why a sample produced no problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// No base draft was approved within the init budget.
    InitBudgetExhausted,
    /// The controller hit an internal invariant violation.
    ControllerError,
}

/// Why a problem the Student solved was accepted anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeilingReason {
    /// The last Student round was used.
    StudentLoopBudget,
    /// No escalated draft was approved within the escalation budget.
    EscalationBudget,
    /// The Student call failed in the last allowed round.
    StudentUnavailable,
}

impl CeilingReason {
    /// Reason string written to the ledger's `accept_problem` entry.
    pub fn ledger_reason(&self) -> &'static str {
        match self {
            CeilingReason::StudentLoopBudget => "max_student_loops",
            CeilingReason::EscalationBudget => "difficulty_increase_failed",
            CeilingReason::StudentUnavailable => "student_unavailable",
        }
    }
}

/// Terminal result of one requested sample. Exactly one holds per sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SampleOutcome {
    Dropped { reason: DropReason },
    /// The Student answered the final problem incorrectly.
    AcceptedUnsolved,
    AcceptedAtCeiling { reason: CeilingReason },
}

impl SampleOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, SampleOutcome::Dropped { .. })
    }
}

/// What happened to one sample slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleReport {
    pub task_id: TaskId,
    pub sample_index: usize,
    pub outcome: SampleOutcome,
    /// Identifier of the accepted version, if any.
    pub final_sample_id: Option<String>,
    pub final_difficulty: Option<DifficultyLevel>,
    /// Version counter when the sample finished.
    pub fix_count: u32,
    pub init_attempts: u32,
    pub student_rounds: u32,
    /// Difficulty of each problem the Student attempted, in order.
    pub difficulty_trace: Vec<DifficultyLevel>,
    pub transitions: Vec<TransitionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Accepted-vs-requested counts for one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskYield {
    pub requested: usize,
    pub accepted: usize,
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub requested: usize,
    pub accepted: usize,
    pub raw: usize,
    pub fixes: usize,
    /// Accepted over requested, as a percentage.
    pub success_rate: f64,
    pub per_task: BTreeMap<TaskId, TaskYield>,
    pub dropped: usize,
    pub accepted_unsolved: usize,
    pub accepted_at_ceiling: usize,
}

impl RunSummary {
    /// Computes the summary from a finished run.
    pub fn from_output(output: &RunOutput) -> Self {
        let mut summary = RunSummary {
            requested: output.reports.len(),
            accepted: output.accepted.len(),
            raw: output.raw.len(),
            fixes: output.fixes.len(),
            ..Default::default()
        };

        for report in &output.reports {
            let entry = summary.per_task.entry(report.task_id).or_default();
            entry.requested += 1;
            match report.outcome {
                SampleOutcome::Dropped { .. } => summary.dropped += 1,
                SampleOutcome::AcceptedUnsolved => {
                    entry.accepted += 1;
                    summary.accepted_unsolved += 1;
                }
                SampleOutcome::AcceptedAtCeiling { .. } => {
                    entry.accepted += 1;
                    summary.accepted_at_ceiling += 1;
                }
            }
        }

        summary.success_rate = if summary.requested == 0 {
            0.0
        } else {
            summary.accepted as f64 / summary.requested as f64 * 100.0
        };
        summary
    }

    /// Console rendering of the summary.
    pub fn render(&self) -> String {
        let mut text = String::from("\n============ Generation Summary ============\n");
        text.push_str(&format!("Total requested samples: {}\n", self.requested));
        text.push_str(&format!("Successfully generated: {}\n", self.accepted));
        text.push_str(&format!("Initial attempts: {}\n", self.raw));
        text.push_str(&format!("Required fixes: {}\n", self.fixes));
        text.push_str(&format!("Success rate: {:.1}%\n", self.success_rate));
        text.push_str(&format!(
            "Outcomes: {} accepted unsolved, {} accepted at ceiling, {} dropped\n",
            self.accepted_unsolved, self.accepted_at_ceiling, self.dropped
        ));
        text.push_str("\nSamples per task:\n");
        for (task, counts) in &self.per_task {
            let rate = if counts.requested == 0 {
                0.0
            } else {
                counts.accepted as f64 / counts.requested as f64 * 100.0
            };
            text.push_str(&format!(
                "  {}: {}/{} ({:.1}%)\n",
                task, counts.accepted, counts.requested, rate
            ));
        }
        text.push_str("==========================================\n");
        text
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutput {
    /// Identifier of the run.
    pub run_id: Uuid,
    /// Final dataset, one problem per accepted sample.
    pub accepted: Vec<Problem>,
    /// Approved base problems.
    pub raw: Vec<Problem>,
    /// Every escalated draft, approved or not.
    pub fixes: Vec<Problem>,
    pub init_validation_logs: Vec<ValidationLogEntry>,
    pub escalation_validation_logs: Vec<ValidationLogEntry>,
    pub reports: Vec<SampleReport>,
    pub process_log: Vec<LogEntry>,
    pub summary: RunSummary,
}
