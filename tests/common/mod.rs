//! Scripted providers shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anomaly_forge::config::RunConfig;
use anomaly_forge::generation::EscalationController;
use anomaly_forge::llm::{
    GenerationRequest, GenerationResponse, LlmError, LlmProvider, ModelGateway,
};
use async_trait::async_trait;

pub const TEACHER_MODEL: &str = "teacher-model";
pub const STUDENT_MODEL: &str = "student-model";
pub const GATE_MODEL: &str = "gate-model";

pub const APPROVE: &str = r#"{"approved": true, "feedback": null}"#;
pub const IMPROVEMENT: &str = r#"{"analysis": "The anomaly was obvious.", "suggestions": ["Blend the flawed sentence into the topic"], "difficulty_increase": "Make the contradiction implicit."}"#;

/// A reply a scripted provider gives.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
}

pub fn text(reply: &str) -> Reply {
    Reply::Text(reply.to_string())
}

pub fn fail(reason: &str) -> Reply {
    Reply::Fail(reason.to_string())
}

pub fn reject(feedback: &str) -> Reply {
    Reply::Text(format!(
        r#"{{"approved": false, "feedback": "{}"}}"#,
        feedback
    ))
}

/// A T1-shaped draft with the anomaly at `anomaly_index`.
pub fn context_draft(anomaly_index: usize) -> Reply {
    Reply::Text(format!(
        "Here is the problem:\n```json\n{{\"context\": [\"Bees pollinate crops.\", \"The moon is made of cheese.\", \"Farmers rely on pollination.\", \"Yields depend on bees.\"], \"anomaly_index\": {}}}\n```",
        anomaly_index
    ))
}

/// A T2-shaped draft.
pub fn coherence_draft(is_coherent: bool) -> Reply {
    Reply::Text(format!(
        r#"{{"context": ["The storm approached.", "Residents boarded windows.", "Power failed at dusk."], "is_coherent": {}}}"#,
        is_coherent
    ))
}

/// Answers calls from a queue; once drained, keeps repeating the last reply.
///
/// Prompts asking for improvement feedback get `feedback` instead, without
/// consuming the queue.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    feedback: Option<Reply>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            feedback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_feedback(mut self, feedback: Reply) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Every prompt received, in order, feedback requests included.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("lock").len()
    }

    fn next_reply(&self, prompt: &str) -> Reply {
        if let Some(feedback) = &self.feedback {
            if prompt.contains("\"difficulty_increase\"") {
                return feedback.clone();
            }
        }
        let mut replies = self.replies.lock().expect("lock");
        let mut last = self.last.lock().expect("lock");
        match replies.pop_front() {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| Reply::Fail("script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().expect("lock").push(prompt.clone());

        match self.next_reply(&prompt) {
            Reply::Text(content) => Ok(GenerationResponse::reply(request.model, content)),
            Reply::Fail(reason) => Err(LlmError::RequestFailed(reason)),
        }
    }
}

/// Scripted Teacher, Quality Gate and Student behind one gateway.
pub struct Harness {
    pub teacher: Arc<ScriptedProvider>,
    pub gate: Arc<ScriptedProvider>,
    pub student: Arc<ScriptedProvider>,
}

impl Harness {
    pub fn new(teacher: Vec<Reply>, gate: Vec<Reply>, student: Vec<Reply>) -> Self {
        Self {
            teacher: Arc::new(ScriptedProvider::new(teacher)),
            gate: Arc::new(ScriptedProvider::new(gate).with_feedback(text(IMPROVEMENT))),
            student: Arc::new(ScriptedProvider::new(student)),
        }
    }

    pub fn gateway(&self) -> ModelGateway {
        let mut gateway = ModelGateway::new();
        gateway.register("teacher", self.teacher.clone(), [TEACHER_MODEL]);
        gateway.register("gate", self.gate.clone(), [GATE_MODEL]);
        gateway.register("student", self.student.clone(), [STUDENT_MODEL]);
        gateway
    }

    /// Controller wired through `config`, with the scripted models and a fixed seed.
    pub fn controller(&self, config: RunConfig) -> EscalationController {
        let config = RunConfig {
            teacher_model: TEACHER_MODEL.to_string(),
            student_model: STUDENT_MODEL.to_string(),
            orchestrator_model: GATE_MODEL.to_string(),
            seed: config.seed.or(Some(17)),
            ..config
        };
        config.build_controller(Arc::new(self.gateway()))
    }
}

/// Budgets that never cut a run short in the scenarios.
pub fn roomy_config() -> RunConfig {
    RunConfig {
        max_init_loops: 3,
        max_diff_loops: 5,
        max_student_loops: 10,
        ..RunConfig::default()
    }
}
