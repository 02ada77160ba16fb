//! Escalation controller: drives Teacher, Quality Gate and Student through
//! each sample's generation.
//!
//! For every requested sample the controller drafts a base problem (bounded
//! by `max_init_loops`), then lets the Student attempt it. A correct answer
//! triggers escalation to a harder tier (bounded by `max_diff_loops` drafts
//! per round); a wrong answer, the last Student round, or an exhausted
//! escalation budget accepts the last approved problem. Agent failures are
//! contained to the attempt that raised them.

use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::error::GenerationError;
use super::state::{SampleMachine, SampleState};
use super::types::{
    CeilingReason, DropReason, EscalationContext, RunOutput, RunSummary, SampleOutcome,
    SampleReport, ValidationLogEntry, ValidationPhase,
};
use crate::agents::{
    AgentError, DraftStage, GateVerdict, QualityGate, StudentAgent, TeacherAgent,
};
use crate::difficulty::{DifficultyLevel, EscalationThresholds};
use crate::ledger::{AgentRole, Phase, ProcessLog, SampleScope};
use crate::prompts::{
    accumulate_feedback, build_draft_prompt, build_escalation_prompt, with_init_feedback,
    DraftRequest, EscalationRequest,
};
use crate::tasks::{Problem, ProblemContent, ProblemMeta, StudentExperience, TaskId};

/// Feedback used when the Orchestrator cannot be asked how to harden a problem.
pub const PLACEHOLDER_FEEDBACK: &str = "No improvement feedback was available. Make the anomaly more subtle than in the previous problem while keeping exactly one defensible answer.";

/// Budgets and sampling probabilities for a run.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Base drafts allowed per sample.
    pub max_init_loops: u32,
    /// Escalated drafts allowed per Student round.
    pub max_diff_loops: u32,
    /// Student attempts allowed per sample.
    pub max_student_loops: u32,
    /// Probability of showing the task's worked example in a draft prompt.
    pub example_prob: f64,
    /// Probability of asking for the sample's anomaly factor.
    pub factor_prob: f64,
    pub thresholds: EscalationThresholds,
    /// Seed for topic/factor choice and the Bernoulli rolls.
    pub seed: Option<u64>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_init_loops: 3,
            max_diff_loops: 5,
            max_student_loops: 3,
            example_prob: 0.5,
            factor_prob: 0.5,
            thresholds: EscalationThresholds::default(),
            seed: None,
        }
    }
}

impl ControllerSettings {
    pub fn with_max_init_loops(mut self, loops: u32) -> Self {
        self.max_init_loops = loops;
        self
    }

    pub fn with_max_diff_loops(mut self, loops: u32) -> Self {
        self.max_diff_loops = loops;
        self
    }

    pub fn with_max_student_loops(mut self, loops: u32) -> Self {
        self.max_student_loops = loops;
        self
    }

    pub fn with_example_prob(mut self, prob: f64) -> Self {
        self.example_prob = prob;
        self
    }

    pub fn with_factor_prob(mut self, prob: f64) -> Self {
        self.factor_prob = prob;
        self
    }

    pub fn with_thresholds(mut self, thresholds: EscalationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Drafting inputs fixed by the approved base attempt of a sample.
#[derive(Debug, Clone)]
struct DraftPlan {
    topic: &'static str,
    style: &'static str,
    factor: Option<&'static str>,
    example: Option<ProblemContent>,
}

impl DraftPlan {
    fn request(&self, task: TaskId, difficulty: DifficultyLevel) -> DraftRequest<'_> {
        DraftRequest {
            task,
            topic: self.topic,
            style: self.style,
            factor: self.factor,
            difficulty,
            example: self.example.as_ref(),
        }
    }

    fn meta(&self, difficulty: DifficultyLevel, fix_count: u32) -> ProblemMeta {
        ProblemMeta {
            topic: self.topic.to_string(),
            style: self.style.to_string(),
            anomaly_type: self.factor.unwrap_or("none").to_string(),
            difficulty_level: difficulty,
            fix_count,
            phase: None,
            student_correct: None,
            student_explanation: None,
        }
    }
}

/// Mutable state of the sample being generated.
struct SampleRun {
    scope: SampleScope,
    machine: SampleMachine,
    fix_count: u32,
    init_attempts: u32,
    student_rounds: u32,
    difficulty_trace: Vec<DifficultyLevel>,
}

impl SampleRun {
    fn new(scope: SampleScope) -> Self {
        Self {
            scope,
            machine: SampleMachine::new(),
            fix_count: 0,
            init_attempts: 0,
            student_rounds: 0,
            difficulty_trace: Vec::new(),
        }
    }

    fn task(&self) -> TaskId {
        self.scope.task_id()
    }

    fn index(&self) -> usize {
        self.scope.sample_index()
    }

    fn system(&self, phase: Phase, action: &str) -> crate::ledger::Step<'_> {
        self.scope.step(phase, AgentRole::System, action)
    }

    fn report(
        self,
        outcome: SampleOutcome,
        accepted: Option<&Problem>,
        error: Option<String>,
    ) -> SampleReport {
        SampleReport {
            task_id: self.scope.task_id(),
            sample_index: self.scope.sample_index(),
            outcome,
            final_sample_id: accepted.map(|p| p.sample_id.clone()),
            final_difficulty: accepted.map(|p| p.meta.difficulty_level),
            fix_count: self.fix_count,
            init_attempts: self.init_attempts,
            student_rounds: self.student_rounds,
            difficulty_trace: self.difficulty_trace,
            transitions: self.machine.into_transitions(),
            error,
        }
    }
}

/// How the processing phase ended.
enum Acceptance {
    Unsolved,
    Ceiling(CeilingReason),
}

/// Runs the three-role generation loop.
pub struct EscalationController {
    teacher: TeacherAgent,
    gate: QualityGate,
    student: StudentAgent,
    settings: ControllerSettings,
}

impl std::fmt::Debug for EscalationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationController")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EscalationController {
    pub fn new(
        teacher: TeacherAgent,
        gate: QualityGate,
        student: StudentAgent,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            teacher,
            gate,
            student,
            settings,
        }
    }

    /// All three roles on one provider with default agent configurations.
    pub fn with_provider(
        llm: Arc<dyn crate::llm::LlmProvider>,
        settings: ControllerSettings,
    ) -> Self {
        Self::new(
            TeacherAgent::with_defaults(Arc::clone(&llm)),
            QualityGate::with_defaults(Arc::clone(&llm)),
            StudentAgent::with_defaults(llm),
            settings,
        )
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Generates `samples_per_task` samples for each task, in order.
    ///
    /// Opens a fresh process log for the run and returns it closed in the
    /// output. Never fails: every per-sample problem ends in that sample's
    /// report.
    pub async fn run(&self, tasks: &[TaskId], samples_per_task: usize) -> RunOutput {
        let log = ProcessLog::open();
        let mut rng = match self.settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        let mut output = RunOutput {
            run_id: uuid::Uuid::new_v4(),
            ..Default::default()
        };
        info!(run_id = %output.run_id, tasks = tasks.len(), samples_per_task, "Starting generation run");

        for &task in tasks {
            info!(task_id = %task, samples = samples_per_task, "Generating samples");
            for index in 0..samples_per_task {
                let scope = SampleScope::new(log.clone(), task, index);
                let report = self.generate_sample(scope, &mut rng, &mut output).await;
                info!(
                    task_id = %task,
                    sample_index = index,
                    outcome = ?report.outcome,
                    fix_count = report.fix_count,
                    "Sample finished"
                );
                output.reports.push(report);
            }
        }

        output.process_log = log.close();
        output.summary = RunSummary::from_output(&output);
        output
    }

    async fn generate_sample(
        &self,
        scope: SampleScope,
        rng: &mut ChaCha8Rng,
        output: &mut RunOutput,
    ) -> SampleReport {
        let task = scope.task_id();
        let index = scope.sample_index();
        let spec = task.spec();
        let topic = spec.topics.get(index % spec.topics.len().max(1)).copied().unwrap_or("general");
        let style = spec.styles.get(index % spec.styles.len().max(1)).copied().unwrap_or("standard");
        let factor = spec.factors.choose(rng).copied();
        let example = spec.example.as_ref().map(|e| e.to_content());

        let mut run = SampleRun::new(scope);
        let base = match self
            .init_phase(&mut run, rng, output, topic, style, factor, example)
            .await
        {
            Ok(Some(base)) => base,
            Ok(None) => {
                return run.report(
                    SampleOutcome::Dropped {
                        reason: DropReason::InitBudgetExhausted,
                    },
                    None,
                    None,
                )
            }
            Err(e) => return self.fail_sample(run, e),
        };

        let (problem, plan) = base;
        match self.processing_phase(&mut run, output, problem, &plan).await {
            Ok((accepted, how)) => {
                run.system(Phase::Completion, "complete")
                    .metadata(json!({
                        "task_id": task,
                        "sample_id": accepted.sample_id,
                        "difficulty": accepted.meta.difficulty_level,
                        "fix_count": run.fix_count,
                    }))
                    .record();
                let outcome = match how {
                    Acceptance::Unsolved => SampleOutcome::AcceptedUnsolved,
                    Acceptance::Ceiling(reason) => SampleOutcome::AcceptedAtCeiling { reason },
                };
                output.accepted.push(accepted.clone());
                run.report(outcome, Some(&accepted), None)
            }
            Err(e) => self.fail_sample(run, e),
        }
    }

    fn fail_sample(&self, run: SampleRun, error: GenerationError) -> SampleReport {
        tracing::error!(
            task_id = %run.task(),
            sample_index = run.index(),
            error = %error,
            "Controller error, dropping sample"
        );
        run.system(Phase::Completion, "error")
            .output(&error.to_string())
            .metadata(json!({"error_type": "controller"}))
            .record();
        run.report(
            SampleOutcome::Dropped {
                reason: DropReason::ControllerError,
            },
            None,
            Some(error.to_string()),
        )
    }

    /// Drafts and gates a base problem. `Ok(None)` means the init budget ran out.
    #[allow(clippy::too_many_arguments)]
    async fn init_phase(
        &self,
        run: &mut SampleRun,
        rng: &mut ChaCha8Rng,
        output: &mut RunOutput,
        topic: &'static str,
        style: &'static str,
        factor: Option<&'static str>,
        example: Option<ProblemContent>,
    ) -> Result<Option<(Problem, DraftPlan)>, GenerationError> {
        let task = run.task();
        let index = run.index();
        let difficulty = DifficultyLevel::Easy;
        let max_attempts = self.settings.max_init_loops;
        // Rejection feedback is scoped to this sample's init loop.
        let mut previous_feedback: Option<String> = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                run.machine.advance(SampleState::InitDrafting, Some("retry"))?;
            }
            run.init_attempts += 1;

            let use_example = rng.random::<f64>() < self.settings.example_prob;
            let use_factor = rng.random::<f64>() < self.settings.factor_prob;
            let plan = DraftPlan {
                topic,
                style,
                factor: factor.filter(|_| use_factor),
                example: example.clone().filter(|_| use_example),
            };

            run.system(Phase::Init, "config")
                .metadata(json!({
                    "attempt": attempt + 1,
                    "topic": plan.topic,
                    "style": plan.style,
                    "factor": plan.factor,
                    "difficulty": difficulty,
                    "use_example": use_example,
                }))
                .record();

            let prompt = with_init_feedback(
                build_draft_prompt(&plan.request(task, difficulty)),
                previous_feedback.as_deref(),
            );

            let content = match self
                .teacher
                .draft(
                    &run.scope,
                    DraftStage::Init,
                    task,
                    &prompt,
                    json!({
                        "attempt": attempt + 1,
                        "difficulty": difficulty,
                        "topic": plan.topic,
                        "style": plan.style,
                        "factor": plan.factor,
                    }),
                )
                .await
            {
                Ok(content) => content,
                Err(e) => {
                    self.record_init_error(run, attempt, &e);
                    continue;
                }
            };

            let problem = Problem::new(task, index, content, plan.meta(difficulty, run.fix_count));
            run.system(Phase::Init, "parsed_sample")
                .output(&problem)
                .metadata(json!({"attempt": attempt + 1, "sample_id": problem.sample_id}))
                .record();
            run.machine.advance(SampleState::InitValidating, None)?;

            let final_attempt = attempt + 1 == max_attempts;
            let verdict = match self
                .gate
                .validate_initial(&run.scope, &problem, final_attempt)
                .await
            {
                Ok(verdict) => verdict,
                Err(e) => {
                    self.record_init_error(run, attempt, &e);
                    continue;
                }
            };

            output.init_validation_logs.push(validation_entry(
                &problem,
                ValidationPhase::Init,
                attempt + 1,
                &verdict,
                None,
            ));

            if verdict.approved {
                info!(
                    task_id = %task,
                    sample_index = index,
                    sample_id = %problem.sample_id,
                    attempt = attempt + 1,
                    "Base problem approved"
                );
                run.system(Phase::Init, "approval")
                    .metadata(json!({"attempt": attempt + 1}))
                    .record();
                run.machine
                    .advance(SampleState::StudentSolving, Some("approved"))?;
                output.raw.push(problem.clone());
                return Ok(Some((problem, plan)));
            }

            let feedback = verdict.feedback.unwrap_or_default();
            info!(
                task_id = %task,
                sample_index = index,
                sample_id = %problem.sample_id,
                attempt = attempt + 1,
                "Base problem rejected"
            );
            run.system(Phase::Init, "rejection")
                .output(&feedback)
                .metadata(json!({"attempt": attempt + 1}))
                .record();
            run.fix_count += 1;
            previous_feedback = Some(feedback);
        }

        warn!(
            task_id = %task,
            sample_index = index,
            attempts = max_attempts,
            "No base problem approved, skipping sample"
        );
        run.system(Phase::Init, "skip")
            .metadata(json!({
                "reason": format!(
                    "Failed to create valid base sample after {} attempts",
                    max_attempts
                ),
            }))
            .record();
        run.machine
            .advance(SampleState::Dropped, Some("init_budget_exhausted"))?;
        Ok(None)
    }

    fn record_init_error(&self, run: &mut SampleRun, attempt: u32, error: &AgentError) {
        warn!(
            task_id = %run.task(),
            sample_index = run.index(),
            attempt = attempt + 1,
            error = %error,
            "Init attempt failed"
        );
        run.system(Phase::Init, "error")
            .output(&error.to_string())
            .metadata(json!({"attempt": attempt + 1, "error_type": error.kind()}))
            .record();
        run.fix_count += 1;
    }

    /// Student rounds with escalation. Returns the accepted problem.
    async fn processing_phase(
        &self,
        run: &mut SampleRun,
        output: &mut RunOutput,
        base: Problem,
        plan: &DraftPlan,
    ) -> Result<(Problem, Acceptance), GenerationError> {
        let task = run.task();
        let index = run.index();
        let mut current = base;
        let mut history: Vec<StudentExperience> = Vec::new();
        let mut consecutive_correct: u32 = 0;
        let max_rounds = self.settings.max_student_loops;

        for round in 1..=max_rounds {
            run.machine.set_round(round);
            run.student_rounds = round;
            let difficulty = current.meta.difficulty_level;
            run.difficulty_trace.push(difficulty);

            run.system(Phase::StudentEvaluation, "loop_start")
                .metadata(json!({
                    "student_loop": round,
                    "sample_id": current.sample_id,
                    "difficulty": difficulty,
                }))
                .record();

            let answer = match self.student.solve(&run.scope, &current, &history).await {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(
                        task_id = %task,
                        sample_index = index,
                        sample_id = %current.sample_id,
                        student_loop = round,
                        error = %e,
                        "Student attempt failed"
                    );
                    run.system(Phase::StudentEvaluation, "error")
                        .output(&e.to_string())
                        .metadata(json!({"student_loop": round, "error_type": e.kind()}))
                        .record();
                    // A failed call uses up the round.
                    if round < max_rounds {
                        continue;
                    }
                    let reason = CeilingReason::StudentUnavailable;
                    self.record_acceptance(run, round, difficulty, reason.ledger_reason(), None);
                    run.machine
                        .advance(SampleState::Accepted, Some(reason.ledger_reason()))?;
                    return Ok((current, Acceptance::Ceiling(reason)));
                }
            };

            let is_correct = current.is_correct(answer.index);
            current.meta.student_correct = Some(is_correct);
            current.meta.student_explanation = Some(answer.explanation.clone());
            history.push(StudentExperience::new(&current, answer.index, is_correct));

            run.system(Phase::StudentEvaluation, "evaluation")
                .output(&json!({
                    "is_correct": is_correct,
                    "student_answer": answer.index,
                    "expected_answer": current.answer_index(),
                }))
                .metadata(json!({"student_loop": round}))
                .record();
            debug!(
                task_id = %task,
                sample_index = index,
                sample_id = %current.sample_id,
                difficulty = %difficulty,
                is_correct,
                "Student answered"
            );

            if !is_correct {
                self.record_acceptance(run, round, difficulty, "student_failed", None);
                run.machine
                    .advance(SampleState::Accepted, Some("student_failed"))?;
                return Ok((current, Acceptance::Unsolved));
            }

            if round == max_rounds {
                let reason = CeilingReason::StudentLoopBudget;
                self.record_acceptance(run, round, difficulty, reason.ledger_reason(), None);
                run.machine
                    .advance(SampleState::Accepted, Some(reason.ledger_reason()))?;
                return Ok((current, Acceptance::Ceiling(reason)));
            }

            consecutive_correct += 1;
            run.machine
                .advance(SampleState::EscalateDrafting, Some("student_correct"))?;

            match self
                .escalate(run, output, &current, plan, &answer.explanation, round, consecutive_correct)
                .await?
            {
                Some(harder) => current = harder,
                None => {
                    let reason = CeilingReason::EscalationBudget;
                    self.record_acceptance(
                        run,
                        round,
                        difficulty,
                        reason.ledger_reason(),
                        Some(self.settings.max_diff_loops),
                    );
                    run.machine
                        .advance(SampleState::Accepted, Some(reason.ledger_reason()))?;
                    return Ok((current, Acceptance::Ceiling(reason)));
                }
            }
        }

        // Only reachable with a zero Student budget, which config validation forbids.
        Err(GenerationError::MissingProblem(run.machine.current()))
    }

    fn record_acceptance(
        &self,
        run: &SampleRun,
        round: u32,
        difficulty: DifficultyLevel,
        reason: &str,
        diff_attempts: Option<u32>,
    ) {
        info!(
            task_id = %run.task(),
            sample_index = run.index(),
            difficulty = %difficulty,
            reason,
            "Accepting problem"
        );
        let mut metadata = json!({
            "reason": reason,
            "student_loop": round,
            "difficulty": difficulty,
        });
        if let (Some(attempts), Value::Object(map)) = (diff_attempts, &mut metadata) {
            map.insert("diff_attempts".to_string(), json!(attempts));
        }
        run.system(Phase::StudentEvaluation, "accept_problem")
            .metadata(metadata)
            .record();
    }

    /// One escalation round. `Ok(None)` means no harder draft was approved.
    #[allow(clippy::too_many_arguments)]
    async fn escalate(
        &self,
        run: &mut SampleRun,
        output: &mut RunOutput,
        current: &Problem,
        plan: &DraftPlan,
        explanation: &str,
        round: u32,
        consecutive_correct: u32,
    ) -> Result<Option<Problem>, GenerationError> {
        let task = run.task();
        let index = run.index();
        let previous_difficulty = current.meta.difficulty_level;

        run.system(Phase::DifficultyIncrease, "decision")
            .metadata(json!({
                "student_loop": round,
                "consecutive_correct": consecutive_correct,
            }))
            .record();

        let difficulty = self
            .settings
            .thresholds
            .escalate(previous_difficulty, consecutive_correct);
        run.system(Phase::DifficultyIncrease, "set_difficulty")
            .output(&difficulty)
            .metadata(json!({
                "student_loop": round,
                "consecutive_correct": consecutive_correct,
                "previous_difficulty": previous_difficulty,
            }))
            .record();
        info!(
            task_id = %task,
            sample_index = index,
            sample_id = %current.sample_id,
            difficulty = %difficulty,
            "Escalating difficulty"
        );

        let improvement = match self
            .gate
            .improvement_feedback(&run.scope, current, explanation)
            .await
        {
            Ok(feedback) => feedback,
            Err(e) => {
                warn!(
                    task_id = %task,
                    sample_index = index,
                    error = %e,
                    "Improvement feedback unavailable, using placeholder"
                );
                run.system(Phase::DifficultyIncrease, "error")
                    .output(&e.to_string())
                    .metadata(json!({
                        "student_loop": round,
                        "error_type": e.kind(),
                        "stage": "feedback",
                    }))
                    .record();
                PLACEHOLDER_FEEDBACK.to_string()
            }
        };
        let mut feedback = improvement.clone();

        for attempt in 0..self.settings.max_diff_loops {
            if attempt > 0 {
                run.machine
                    .advance(SampleState::EscalateDrafting, Some("retry"))?;
            }
            run.system(Phase::DifficultyIncrease, "attempt")
                .metadata(json!({
                    "student_loop": round,
                    "diff_attempt": attempt + 1,
                    "difficulty": difficulty,
                }))
                .record();

            let prompt = build_escalation_prompt(
                &plan.request(task, difficulty),
                &EscalationRequest {
                    previous: current,
                    student_explanation: explanation,
                    feedback: &feedback,
                    difficulty,
                    is_retry: attempt > 0,
                },
            );

            let content = match self
                .teacher
                .draft(
                    &run.scope,
                    DraftStage::Escalation,
                    task,
                    &prompt,
                    json!({
                        "student_loop": round,
                        "diff_attempt": attempt + 1,
                        "difficulty": difficulty,
                    }),
                )
                .await
            {
                Ok(content) => content,
                Err(e) => {
                    self.record_escalation_error(run, round, attempt, difficulty, &e);
                    continue;
                }
            };

            run.fix_count += 1;
            let mut meta = plan.meta(difficulty, run.fix_count);
            meta.phase = Some("processing".to_string());
            let harder = Problem::new(task, index, content, meta);
            run.system(Phase::DifficultyIncrease, "parsed_difficult_sample")
                .output(&harder)
                .metadata(json!({
                    "student_loop": round,
                    "diff_attempt": attempt + 1,
                    "sample_id": harder.sample_id,
                }))
                .record();
            output.fixes.push(harder.clone());
            run.machine.advance(SampleState::EscalateValidating, None)?;

            let verdict = match self.gate.validate_escalated(&run.scope, &harder).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    self.record_escalation_error(run, round, attempt, difficulty, &e);
                    continue;
                }
            };

            output.escalation_validation_logs.push(validation_entry(
                &harder,
                ValidationPhase::DifficultyIncrease,
                attempt + 1,
                &verdict,
                Some(EscalationContext {
                    student_loop: round,
                    difficulty_level: difficulty,
                    previous_problem: current.clone(),
                    student_explanation: explanation.to_string(),
                    orchestrator_feedback: feedback.clone(),
                }),
            ));

            if verdict.approved {
                info!(
                    task_id = %task,
                    sample_index = index,
                    sample_id = %harder.sample_id,
                    attempt = attempt + 1,
                    difficulty = %difficulty,
                    "Escalated problem approved"
                );
                run.system(Phase::DifficultyIncrease, "approval")
                    .metadata(json!({
                        "student_loop": round,
                        "diff_attempt": attempt + 1,
                        "difficulty": difficulty,
                    }))
                    .record();
                run.machine
                    .advance(SampleState::StudentSolving, Some("approved"))?;
                return Ok(Some(harder));
            }

            let rejection = verdict.feedback.unwrap_or_default();
            info!(
                task_id = %task,
                sample_index = index,
                sample_id = %harder.sample_id,
                attempt = attempt + 1,
                difficulty = %difficulty,
                "Escalated problem rejected"
            );
            run.system(Phase::DifficultyIncrease, "rejection")
                .output(&rejection)
                .metadata(json!({
                    "student_loop": round,
                    "diff_attempt": attempt + 1,
                    "difficulty": difficulty,
                }))
                .record();
            feedback = accumulate_feedback(&improvement, &rejection);
        }

        Ok(None)
    }

    fn record_escalation_error(
        &self,
        run: &SampleRun,
        round: u32,
        attempt: u32,
        difficulty: DifficultyLevel,
        error: &AgentError,
    ) {
        warn!(
            task_id = %run.task(),
            sample_index = run.index(),
            attempt = attempt + 1,
            difficulty = %difficulty,
            error = %error,
            "Escalation attempt failed"
        );
        run.system(Phase::DifficultyIncrease, "error")
            .output(&error.to_string())
            .metadata(json!({
                "student_loop": round,
                "diff_attempt": attempt + 1,
                "difficulty": difficulty,
                "error_type": error.kind(),
            }))
            .record();
    }
}

fn validation_entry(
    problem: &Problem,
    phase: ValidationPhase,
    attempt: u32,
    verdict: &GateVerdict,
    escalation: Option<EscalationContext>,
) -> ValidationLogEntry {
    ValidationLogEntry {
        sample_id: problem.sample_id.clone(),
        phase,
        attempt,
        problem_snapshot: problem.clone(),
        approved: verdict.approved,
        feedback: verdict.feedback.clone(),
        verdict_source: verdict.source,
        timestamp: chrono::Utc::now(),
        escalation,
    }
}
