//! Quality Gate (Orchestrator) Agent.
//!
//! Approves or rejects drafted problems against the benchmark rubric and,
//! once the Student has solved a problem, advises the Teacher on how to
//! make it harder.
//!
//! When the gate's reply holds no JSON object, the verdict is produced by a
//! keyword heuristic instead. That path is the named
//! [`VerdictSource::DegradedHeuristic`] mode and is always logged.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::AgentResult;
use crate::ledger::{AgentRole, Phase, SampleScope};
use crate::llm::{complete_prompt, LlmProvider};
use crate::prompts::{build_feedback_prompt, build_gate_prompt, GateMode};
use crate::tasks::Problem;
use crate::utils::extract_json_object;

/// Feedback recorded when the gate rejects without saying why.
pub const MISSING_FEEDBACK: &str = "Rejected by the quality controller without feedback.";

static REJECT_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)reject:(.*)").ok());

/// How a verdict was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// Parsed from the `{approved, feedback}` JSON reply.
    Structured,
    /// Inferred from keywords because the reply had no JSON object.
    DegradedHeuristic,
}

/// Outcome of one gate invocation. `feedback` is `None` exactly when approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub approved: bool,
    pub feedback: Option<String>,
    pub source: VerdictSource,
}

impl GateVerdict {
    pub fn approve(source: VerdictSource) -> Self {
        Self {
            approved: true,
            feedback: None,
            source,
        }
    }

    pub fn reject(feedback: impl Into<String>, source: VerdictSource) -> Self {
        let feedback = feedback.into();
        let feedback = if feedback.trim().is_empty() {
            MISSING_FEEDBACK.to_string()
        } else {
            feedback
        };
        Self {
            approved: false,
            feedback: Some(feedback),
            source,
        }
    }

    /// Reads a structured `{approved, feedback}` object.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let approved = match object.get("approved") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
            _ => false,
        };
        if approved {
            return Self::approve(VerdictSource::Structured);
        }
        let feedback = match object.get("feedback") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Self::reject(feedback, VerdictSource::Structured)
    }

    /// Keyword fallback for replies without a JSON object.
    ///
    /// Approves when "approve" appears and "reject" does not. Otherwise the
    /// text after a "reject:" marker, or the whole reply, is the feedback.
    pub fn from_heuristic(reply: &str) -> Self {
        let lower = reply.to_lowercase();
        if lower.contains("approve") && !lower.contains("reject") {
            return Self::approve(VerdictSource::DegradedHeuristic);
        }
        let feedback = REJECT_MARKER
            .as_ref()
            .and_then(|re| re.captures(reply))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| reply.to_string());
        Self::reject(feedback, VerdictSource::DegradedHeuristic)
    }
}

/// Joins the improvement-feedback fields into one block of advice.
pub fn compose_feedback(object: &Map<String, Value>) -> String {
    let text = |key: &str| match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };

    let mut feedback = text("analysis");
    feedback.push_str("\n\n");
    if let Some(Value::Array(items)) = object.get("suggestions") {
        let items: Vec<String> = items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        feedback.push_str("Suggestions:\n- ");
        feedback.push_str(&items.join("\n- "));
        feedback.push_str("\n\n");
    }
    feedback.push_str(&text("difficulty_increase"));
    feedback
}

/// Configuration for the quality gate.
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Model identifier routed through the gateway.
    pub model: String,
    /// Sampling temperature; 0.0 keeps verdicts repeatable.
    pub temperature: f64,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
        }
    }
}

impl QualityGateConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }
}

struct GateActions {
    phase: Phase,
    request: &'static str,
    response: &'static str,
    result: &'static str,
}

impl GateActions {
    fn for_mode(mode: GateMode) -> Self {
        match mode {
            GateMode::Initial { .. } => Self {
                phase: Phase::Init,
                request: "validate_request",
                response: "validate_response",
                result: "validation_result",
            },
            GateMode::Escalated => Self {
                phase: Phase::DifficultyIncrease,
                request: "validate_difficult",
                response: "validate_difficult_response",
                result: "validation_difficult_result",
            },
        }
    }
}

/// Orchestrator agent that gates drafts and advises on hardening.
pub struct QualityGate {
    llm: Arc<dyn LlmProvider>,
    config: QualityGateConfig,
}

impl std::fmt::Debug for QualityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QualityGate {
    /// Agent name constant for identification.
    pub const AGENT_NAME: &'static str = "orchestrator";

    pub fn new(llm: Arc<dyn LlmProvider>, config: QualityGateConfig) -> Self {
        Self { llm, config }
    }

    pub fn with_defaults(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm, QualityGateConfig::default())
    }

    pub fn config(&self) -> &QualityGateConfig {
        &self.config
    }

    /// Gate check for a fresh draft.
    ///
    /// `final_attempt` asks the model to approve anything minimally
    /// solvable; it can still reject.
    pub async fn validate_initial(
        &self,
        scope: &SampleScope,
        problem: &Problem,
        final_attempt: bool,
    ) -> AgentResult<GateVerdict> {
        self.validate(scope, problem, GateMode::Initial { final_attempt })
            .await
    }

    /// Gate check for an escalated draft, including difficulty appropriateness.
    pub async fn validate_escalated(
        &self,
        scope: &SampleScope,
        problem: &Problem,
    ) -> AgentResult<GateVerdict> {
        self.validate(scope, problem, GateMode::Escalated).await
    }

    async fn validate(
        &self,
        scope: &SampleScope,
        problem: &Problem,
        mode: GateMode,
    ) -> AgentResult<GateVerdict> {
        let actions = GateActions::for_mode(mode);
        let prompt = build_gate_prompt(problem, mode);

        let request_meta = match mode {
            GateMode::Initial { final_attempt } => json!({
                "is_final_attempt": final_attempt,
                "sample_id": problem.sample_id,
            }),
            GateMode::Escalated => json!({
                "difficulty": problem.meta.difficulty_level,
                "sample_id": problem.sample_id,
            }),
        };
        scope
            .step(actions.phase, AgentRole::Orchestrator, actions.request)
            .input(&prompt)
            .metadata(request_meta)
            .record();

        let reply = complete_prompt(
            self.llm.as_ref(),
            &prompt,
            &self.config.model,
            self.config.temperature,
        )
        .await?;

        scope
            .step(actions.phase, AgentRole::Orchestrator, actions.response)
            .output(&reply)
            .metadata(json!({ "model": self.config.model }))
            .record();

        let verdict = match extract_json_object(&reply) {
            Ok(object) => GateVerdict::from_object(&object),
            Err(e) => {
                tracing::warn!(
                    task_id = %scope.task_id(),
                    sample_index = scope.sample_index(),
                    sample_id = %problem.sample_id,
                    mode = "degraded_heuristic",
                    error = %e,
                    "Gate reply had no JSON object, using keyword heuristic"
                );
                scope
                    .step(actions.phase, AgentRole::System, "error")
                    .output(&e.to_string())
                    .metadata(json!({
                        "error_type": "json_parsing",
                        "mode": "degraded_heuristic",
                        "raw_response": &reply,
                    }))
                    .record();
                GateVerdict::from_heuristic(&reply)
            }
        };

        scope
            .step(actions.phase, AgentRole::Orchestrator, actions.result)
            .output(&json!({
                "approved": verdict.approved,
                "feedback": verdict.feedback,
            }))
            .metadata(json!({ "source": verdict.source }))
            .record();

        Ok(verdict)
    }

    /// Asks how to make a solved problem harder.
    ///
    /// A reply without JSON is returned verbatim.
    pub async fn improvement_feedback(
        &self,
        scope: &SampleScope,
        problem: &Problem,
        student_explanation: &str,
    ) -> AgentResult<String> {
        let prompt = build_feedback_prompt(problem, student_explanation);
        scope
            .step(Phase::DifficultyIncrease, AgentRole::Orchestrator, "feedback_request")
            .input(&prompt)
            .metadata(json!({
                "difficulty": problem.meta.difficulty_level,
                "sample_id": problem.sample_id,
            }))
            .record();

        let reply = complete_prompt(
            self.llm.as_ref(),
            &prompt,
            &self.config.model,
            self.config.temperature,
        )
        .await?;

        scope
            .step(Phase::DifficultyIncrease, AgentRole::Orchestrator, "feedback_response")
            .output(&reply)
            .metadata(json!({ "model": self.config.model }))
            .record();

        match extract_json_object(&reply) {
            Ok(object) => {
                let feedback = compose_feedback(&object);
                let has_suggestions = matches!(
                    object.get("suggestions"),
                    Some(Value::Array(items)) if !items.is_empty()
                );
                scope
                    .step(Phase::DifficultyIncrease, AgentRole::Orchestrator, "feedback_parsed")
                    .output(&feedback)
                    .metadata(json!({ "has_suggestions": has_suggestions }))
                    .record();
                Ok(feedback)
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %scope.task_id(),
                    sample_index = scope.sample_index(),
                    error = %e,
                    "Feedback reply had no JSON object, using raw text"
                );
                scope
                    .step(Phase::DifficultyIncrease, AgentRole::System, "error")
                    .output(&e.to_string())
                    .metadata(json!({
                        "error_type": "json_parsing",
                        "raw_response": &reply,
                    }))
                    .record();
                Ok(reply)
            }
        }
    }
}
