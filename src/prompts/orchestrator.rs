//! Prompts for the Orchestrator role: the quality gate and the
//! improvement-feedback request.

use crate::tasks::{Problem, ProblemContent, TaskId};

/// Which rubric the quality gate applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Structural check of a fresh draft. `final_attempt` asks the model to
    /// approve anything minimally solvable.
    Initial { final_attempt: bool },
    /// Structural check plus difficulty appropriateness for an escalated draft.
    Escalated,
}

const FINAL_ATTEMPT_INSTRUCTION: &str = "CRITICAL INSTRUCTION: This is the final attempt. Your primary goal is to APPROVE this problem unless it has FATAL flaws that make it completely unsolvable. Minor issues should be ignored. The problem only needs to be minimally functional - not perfect. If there's any reasonable way a student could solve this problem, you MUST approve it.\n\n";

const LENIENCY_NOTE: &str = "Note: While maintaining quality standards, be lenient in your evaluation. Accept problems that are reasonable and solvable, even if they have minor imperfections.\n\n";

/// What a well-formed problem of `task` looks like, in prose.
pub fn task_description(task: TaskId) -> &'static str {
    match task {
        TaskId::T1 => "This task requires generating 5-6 sentences on a topic where one of them is anomalous (semantically inconsistent or conceptually off-topic). The anomaly should be detectable but not overly obvious, requiring careful reading to identify.",
        TaskId::T2 => "This task requires creating 5 sentences about a topic, either in logically coherent order (is_coherent: true) or with subtly disrupted order (is_coherent: false). For the disrupted version, 1-2 sentences should be moved to disrupt temporal/causal flow while avoiding obvious scrambling.",
        TaskId::T3 => "This task requires designing a sentence completion question with a blank (marked as ___) and 5 answer choices. One choice should be subtly inappropriate or anomalous. The anomaly should be detectable with careful analysis.",
        TaskId::T4 => "This task requires creating two short paragraphs (2-3 sentences each) and 5 candidate bridge sentences to connect them. One bridge should be contextually or logically weak compared to the others.",
        TaskId::T5 => "This task requires writing 5 sentences with pronouns and referents where one sentence contains ambiguous pronouns (unclear 'he', 'it', etc.). The ambiguity should be noticeable upon careful reading.",
        TaskId::T6 => "This task requires generating 5 statements where one contains a logical contradiction or reversed logic. The contradiction should be subtle but detectable upon careful examination.",
        TaskId::T7 => "This task requires writing 5 sentences with consistent formal/academic tone where one sentence subtly violates the established tone/style. The violation should be identifiable but not overly obvious.",
    }
}

/// The JSON layout expected for `task`, in prose.
pub fn task_structure(task: TaskId) -> &'static str {
    match task {
        TaskId::T1 => "The expected JSON structure should include 'context' (array of 5-6 sentences), 'anomaly_index' (integer indicating which sentence is anomalous), and 'meta' (with source, topic, and anomaly_type).",
        TaskId::T2 => "The expected JSON structure should include 'context' (array of 5 sentences) and 'is_coherent' (boolean indicating if the order is logical or disrupted).",
        TaskId::T3 => "The expected JSON structure should include 'sentence' (with a blank marked as ___), 'choices' (array of 5 options), and 'anomaly_index' (integer indicating which choice is anomalous).",
        TaskId::T4 => "The expected JSON structure should include 'paragraph_1' (array of sentences), 'paragraph_2' (array of sentences), 'bridges' (array of 5 bridge options), and 'anomaly_index' (integer indicating which bridge is weak).",
        TaskId::T5 => "The expected JSON structure should include 'context' (array of 5 sentences) and 'anomaly_index' (integer indicating which sentence has ambiguous pronouns).",
        TaskId::T6 => "The expected JSON structure should include 'context' (array of 5 statements) and 'anomaly_index' (integer indicating which statement has a contradiction).",
        TaskId::T7 => "The expected JSON structure should include 'context' (array of 5 sentences) and 'anomaly_index' (integer indicating which sentence violates the tone/style).",
    }
}

/// Renders `items` as a 1-based numbered list, one per line.
pub fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the problem body together with its answer key.
pub fn render_with_answer(content: &ProblemContent) -> String {
    match content {
        ProblemContent::Coherence {
            context,
            is_coherent,
        } => {
            let label = if *is_coherent {
                "True (coherent)"
            } else {
                "False (incoherent)"
            };
            format!(
                "Paragraph: {}\n\nCorrect Answer: {}\n\n",
                context.join(" "),
                label
            )
        }
        ProblemContent::Blank {
            sentence,
            choices,
            anomaly_index,
        } => format!(
            "Sentence: {}\n\nChoices:\n{}\n\nCorrect Answer: Option {}\n\n",
            sentence,
            numbered(choices),
            anomaly_index + 1
        ),
        ProblemContent::Bridge {
            paragraph_1,
            paragraph_2,
            bridges,
            anomaly_index,
        } => format!(
            "Paragraph 1: {}\n\nParagraph 2: {}\n\nBridge Options:\n{}\n\nCorrect Answer: Option {}\n\n",
            paragraph_1.join(" "),
            paragraph_2.join(" "),
            numbered(bridges),
            anomaly_index + 1
        ),
        ProblemContent::Context {
            context,
            anomaly_index,
        } => format!(
            "Context:\n{}\n\nCorrect Answer: Option {}\n\n",
            numbered(context),
            anomaly_index + 1
        ),
    }
}

/// Builds the approve/reject prompt for `problem`.
pub fn build_gate_prompt(problem: &Problem, mode: GateMode) -> String {
    let task = problem.task_id;
    let difficulty = problem.meta.difficulty_level;

    let mut prompt = match mode {
        GateMode::Initial { final_attempt } => {
            let mut opening = format!(
                "You are a benchmark quality controller evaluating if this problem is well-formed and structured correctly for task {}.\n\n",
                task
            );
            if final_attempt {
                opening.push_str(FINAL_ATTEMPT_INSTRUCTION);
            }
            opening.push_str(&format!("Task Type: {} ({})\n\n", task.name(), task));
            opening
        }
        GateMode::Escalated => format!(
            "You are a benchmark quality controller evaluating if a problem with increased difficulty is well-formed and appropriate for task {}.\n\nTask Type: {} ({})\nDifficulty Level: {}\n\n",
            task,
            task.name(),
            task,
            difficulty
        ),
    };

    prompt.push_str(&format!("Task Description: {}\n\n", task_description(task)));
    prompt.push_str(&format!("Expected Structure: {}\n\n", task_structure(task)));
    prompt.push_str(&render_with_answer(&problem.content));

    prompt.push_str(LENIENCY_NOTE);
    prompt.push_str("Evaluate the problem based on these criteria:\n");
    prompt.push_str("1. VALIDITY: Is the problem well-formed and complete?\n");
    prompt.push_str("2. TYPE ADHERENCE: Does the problem follow the expected task type requirements?\n");
    prompt.push_str("3. LOGICAL COHERENCE: Is the correct answer clearly identifiable?\n");
    prompt.push_str("4. FAIRNESS: Is the problem fair and reasonable? Does it have a clear, unambiguous solution?\n");
    if mode == GateMode::Escalated {
        prompt.push_str(&format!(
            "5. DIFFICULTY: Is the difficulty appropriate for {} level?\n",
            difficulty
        ));
    }
    prompt.push('\n');

    prompt.push_str("Return your evaluation in JSON format:\n{\n");
    prompt.push_str("  \"approved\": boolean (true if the problem passes all criteria, false otherwise),\n");
    prompt.push_str("  \"feedback\": null if approved, or detailed feedback if rejected addressing:\n");
    prompt.push_str("              - Problem construction issues\n");
    prompt.push_str("              - Anomaly ambiguity concerns\n");
    if mode == GateMode::Escalated {
        prompt.push_str("              - Difficulty appropriateness\n");
    }
    prompt.push_str("              - Specific improvement suggestions\n");
    prompt.push('}');
    prompt
}

/// Builds the request for advice on hardening a problem the Student solved.
pub fn build_feedback_prompt(problem: &Problem, student_explanation: &str) -> String {
    let task = problem.task_id;
    let mut prompt = String::from(
        "You are helping to create a harder version of a problem that a student has correctly solved. Analyze the student's solution and provide feedback.\n\n",
    );
    prompt.push_str(&format!("Task Type: {} ({})\n", task.name(), task));
    prompt.push_str(&format!(
        "Current Difficulty: {}\n\n",
        problem.meta.difficulty_level
    ));
    prompt.push_str(&format!(
        "ORIGINAL PROBLEM:\n{}\n\n",
        problem.to_pretty_json()
    ));

    match &problem.content {
        ProblemContent::Coherence { is_coherent, .. } => {
            prompt.push_str("Problem Type: Paragraph coherence assessment\n");
            prompt.push_str(&format!(
                "Current Answer: {}\n\n",
                if *is_coherent { "Coherent" } else { "Not Coherent" }
            ));
        }
        ProblemContent::Blank { anomaly_index, .. } => {
            prompt.push_str("Problem Type: Sentence completion with anomalous option\n");
            prompt.push_str(&format!("Anomaly Index: {}\n\n", anomaly_index));
        }
        ProblemContent::Bridge { anomaly_index, .. } => {
            prompt.push_str("Problem Type: Bridge sentence identification\n");
            prompt.push_str(&format!("Anomaly Index: {}\n\n", anomaly_index));
        }
        ProblemContent::Context { anomaly_index, .. } => {
            prompt.push_str("Problem Type: Anomaly detection in context\n");
            prompt.push_str(&format!("Anomaly Index: {}\n\n", anomaly_index));
        }
    }

    prompt.push_str(&format!("Student's Explanation: {}\n\n", student_explanation));
    prompt.push_str("Based on how the student solved this problem, provide feedback to create a more challenging version:\n");
    prompt.push_str("1. What aspects did the student easily identify?\n");
    prompt.push_str("2. How could the problem be made more subtle or complex?\n");
    prompt.push_str("3. Give specific suggestions for increasing difficulty.\n\n");
    prompt.push_str("Return your feedback in JSON format:\n{\n");
    prompt.push_str("  \"analysis\": \"Brief analysis of student solution\",\n");
    prompt.push_str("  \"suggestions\": [\"Specific suggestion 1\", \"Specific suggestion 2\", ...],\n");
    prompt.push_str("  \"difficulty_increase\": \"Summary of how to increase difficulty\"\n");
    prompt.push('}');
    prompt
}
