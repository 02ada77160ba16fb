//! Student Agent: simulates a test-taker.
//!
//! The Student answers with an option number (or yes/no for the binary
//! task) followed by an explanation. Replies are parsed leniently; an
//! unreadable answer becomes [`UNPARSED_ANSWER`], which never matches a
//! valid answer key.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::AgentResult;
use crate::ledger::{AgentRole, Phase, SampleScope};
use crate::llm::{complete_prompt, LlmProvider, DEFAULT_TEMPERATURE};
use crate::prompts::{build_student_prompt, DEFAULT_DETAIL_WINDOW};
use crate::tasks::{Problem, StudentExperience, TaskKind};

/// Selected index recorded when no answer could be read.
pub const UNPARSED_ANSWER: i64 = -1;

static FIRST_INTEGER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+").ok());
static YES_WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)\byes\b").ok());
static NO_WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)\bno\b").ok());

fn has_word(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// How yes/no replies to the binary task are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryAnswerPolicy {
    /// "yes" anywhere (case-insensitive) means 1, anything else 0.
    #[default]
    YesSubstring,
    /// Exactly one of the words "yes"/"no" must appear; otherwise unparsed.
    Strict,
}

impl BinaryAnswerPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryAnswerPolicy::YesSubstring => "yes_substring",
            BinaryAnswerPolicy::Strict => "strict",
        }
    }
}

/// A parsed Student reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAnswer {
    /// 0-based option index, or 1/0 for yes/no.
    pub index: i64,
    /// True only when an explicit yes/no or integer was found.
    pub parsed: bool,
    /// The full trimmed reply.
    pub explanation: String,
}

/// Reads the selected option from a Student reply.
pub fn parse_answer(kind: TaskKind, reply: &str, policy: BinaryAnswerPolicy) -> StudentAnswer {
    let explanation = reply.trim().to_string();
    let (index, parsed) = match kind {
        TaskKind::Binary => {
            let says_yes_word = has_word(&YES_WORD, reply);
            let says_no_word = has_word(&NO_WORD, reply);
            match policy {
                BinaryAnswerPolicy::YesSubstring => {
                    let says_yes = reply.to_lowercase().contains("yes");
                    (i64::from(says_yes), says_yes || says_no_word)
                }
                BinaryAnswerPolicy::Strict => match (says_yes_word, says_no_word) {
                    (true, false) => (1, true),
                    (false, true) => (0, true),
                    _ => (UNPARSED_ANSWER, false),
                },
            }
        }
        TaskKind::Index => FIRST_INTEGER
            .as_ref()
            .and_then(|re| re.find(reply))
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .map(|n| (n - 1, true))
            .unwrap_or((UNPARSED_ANSWER, false)),
    };
    StudentAnswer {
        index,
        parsed,
        explanation,
    }
}

/// Configuration for the Student agent.
#[derive(Debug, Clone)]
pub struct StudentConfig {
    /// Model identifier routed through the gateway.
    pub model: String,
    pub temperature: f64,
    pub binary_policy: BinaryAnswerPolicy,
    /// Most recent attempts shown in full in the prompt.
    pub detail_window: usize,
}

impl Default for StudentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: DEFAULT_TEMPERATURE,
            binary_policy: BinaryAnswerPolicy::default(),
            detail_window: DEFAULT_DETAIL_WINDOW,
        }
    }
}

impl StudentConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_binary_policy(mut self, policy: BinaryAnswerPolicy) -> Self {
        self.binary_policy = policy;
        self
    }

    pub fn with_detail_window(mut self, window: usize) -> Self {
        self.detail_window = window;
        self
    }
}

/// Student Agent that attempts problems through the model gateway.
pub struct StudentAgent {
    llm: Arc<dyn LlmProvider>,
    config: StudentConfig,
}

impl std::fmt::Debug for StudentAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudentAgent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StudentAgent {
    /// Agent name constant for identification.
    pub const AGENT_NAME: &'static str = "student";

    pub fn new(llm: Arc<dyn LlmProvider>, config: StudentConfig) -> Self {
        Self { llm, config }
    }

    pub fn with_defaults(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm, StudentConfig::default())
    }

    pub fn config(&self) -> &StudentConfig {
        &self.config
    }

    /// Attempts `problem` with the sample's earlier attempts as context.
    ///
    /// Only a failed model call is an error; an unreadable reply yields
    /// [`UNPARSED_ANSWER`].
    pub async fn solve(
        &self,
        scope: &SampleScope,
        problem: &Problem,
        history: &[StudentExperience],
    ) -> AgentResult<StudentAnswer> {
        let prompt = build_student_prompt(&problem.content, history, self.config.detail_window);
        scope
            .step(Phase::StudentEvaluation, AgentRole::Student, "prompt")
            .input(&prompt)
            .metadata(json!({
                "sample_id": problem.sample_id,
                "history_len": history.len(),
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
            .step(Phase::StudentEvaluation, AgentRole::Student, "response")
            .output(&reply)
            .metadata(json!({ "model": self.config.model }))
            .record();

        let kind = problem.task_id.kind();
        let answer = parse_answer(kind, &reply, self.config.binary_policy);
        if !answer.parsed {
            tracing::debug!(
                task_id = %problem.task_id,
                sample_id = %problem.sample_id,
                "Student reply held no readable answer"
            );
        }

        scope
            .step(Phase::StudentEvaluation, AgentRole::Student, "parsed_answer")
            .output(&answer.index)
            .metadata(json!({
                "is_binary": kind == TaskKind::Binary,
                "parsed": answer.parsed,
                "policy": self.config.binary_policy.as_str(),
                "raw_answer": &reply,
            }))
            .record();

        Ok(answer)
    }
}
