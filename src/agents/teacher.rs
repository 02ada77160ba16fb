//! Teacher Agent: drafts and hardens problems.
//!
//! The agent sends a prepared prompt, records the exchange in the sample's
//! ledger scope and turns the reply into typed [`ProblemContent`]. Identity
//! and meta fields are stamped by the caller.

use std::sync::Arc;

use serde_json::{json, Value};

use super::error::AgentResult;
use crate::ledger::{AgentRole, Phase, SampleScope};
use crate::llm::{complete_prompt, LlmProvider, DEFAULT_TEMPERATURE};
use crate::tasks::{ProblemContent, TaskId};
use crate::utils::extract_json_object_with_stage;

/// Which kind of draft is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStage {
    /// A fresh base problem.
    Init,
    /// A harder version of a solved problem.
    Escalation,
}

impl DraftStage {
    fn phase(self) -> Phase {
        match self {
            DraftStage::Init => Phase::Init,
            DraftStage::Escalation => Phase::DifficultyIncrease,
        }
    }

    fn prompt_action(self) -> &'static str {
        match self {
            DraftStage::Init => "prompt",
            DraftStage::Escalation => "difficult_prompt",
        }
    }

    fn response_action(self) -> &'static str {
        match self {
            DraftStage::Init => "response",
            DraftStage::Escalation => "difficult_response",
        }
    }
}

/// Configuration for the Teacher agent.
#[derive(Debug, Clone)]
pub struct TeacherConfig {
    /// Model identifier routed through the gateway.
    pub model: String,
    /// Sampling temperature; drafting favors diversity.
    pub temperature: f64,
}

impl Default for TeacherConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl TeacherConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }
}

/// Teacher Agent that drafts problems through the model gateway.
pub struct TeacherAgent {
    llm: Arc<dyn LlmProvider>,
    config: TeacherConfig,
}

impl std::fmt::Debug for TeacherAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeacherAgent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TeacherAgent {
    /// Agent name constant for identification.
    pub const AGENT_NAME: &'static str = "teacher";

    pub fn new(llm: Arc<dyn LlmProvider>, config: TeacherConfig) -> Self {
        Self { llm, config }
    }

    pub fn with_defaults(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm, TeacherConfig::default())
    }

    pub fn config(&self) -> &TeacherConfig {
        &self.config
    }

    /// Sends `prompt` and returns the drafted content for `task`.
    ///
    /// `metadata` is attached to the logged prompt entry.
    ///
    /// # Errors
    ///
    /// Fails when the model call fails, when no JSON object can be found in
    /// the reply, or when the object is not a valid problem for `task`.
    pub async fn draft(
        &self,
        scope: &SampleScope,
        stage: DraftStage,
        task: TaskId,
        prompt: &str,
        metadata: Value,
    ) -> AgentResult<ProblemContent> {
        scope
            .step(stage.phase(), AgentRole::Teacher, stage.prompt_action())
            .input(prompt)
            .metadata(metadata)
            .record();

        let reply = complete_prompt(
            self.llm.as_ref(),
            prompt,
            &self.config.model,
            self.config.temperature,
        )
        .await?;

        scope
            .step(stage.phase(), AgentRole::Teacher, stage.response_action())
            .output(&reply)
            .metadata(json!({ "model": self.config.model }))
            .record();

        let (object, extraction_stage) = extract_json_object_with_stage(&reply)?;
        tracing::debug!(
            task_id = %task,
            sample_index = scope.sample_index(),
            stage = %extraction_stage,
            "Extracted teacher draft"
        );

        Ok(ProblemContent::from_json(task, &object)?)
    }
}
