//! Prompts for the Student role.
//!
//! The Student sees its earlier attempts on the same sample before the new
//! problem: the most recent `detail_window` attempts in full, older ones as
//! one-line summaries.

use super::orchestrator::numbered;
use crate::tasks::{ProblemContent, StudentExperience};

/// Number of most recent attempts rendered in full by default.
pub const DEFAULT_DETAIL_WINDOW: usize = 2;

const COMMON_SUFFIX: &str =
    "Answer with number only, then explain why. Even if all seem normal, choose the relatively most anomalous.";

/// Rendered Student answer; only called for parsed answers.
fn binary_answer(answer: i64) -> &'static str {
    if answer == 1 {
        "yes"
    } else {
        "no"
    }
}

const UNPARSEABLE: &str = "unparseable";

fn outcome(was_correct: bool) -> &'static str {
    if was_correct {
        "correct"
    } else {
        "incorrect"
    }
}

fn summary_line(position: usize, exp: &StudentExperience) -> String {
    let answered = match &exp.problem.content {
        _ if exp.answer < 0 => "You gave no readable answer".to_string(),
        ProblemContent::Coherence { .. } => format!("You answered '{}'", binary_answer(exp.answer)),
        _ => format!("You selected option {}", exp.answer + 1),
    };
    format!(
        "- Problem {} (Difficulty: {}): {} and were {}.\n",
        position,
        exp.difficulty,
        answered,
        outcome(exp.was_correct)
    )
}

/// Renders a past problem without the answer key.
fn render_past_problem(content: &ProblemContent) -> String {
    match content {
        ProblemContent::Coherence { context, .. } => format!(
            "Does the following paragraph have a logically coherent sentence order?\n\n{}\n",
            context.join(" ")
        ),
        ProblemContent::Blank {
            sentence, choices, ..
        } => format!(
            "{}\n\nWhich option is most anomalous or inconsistent?\n\n{}\n",
            sentence,
            numbered(choices)
        ),
        ProblemContent::Bridge {
            paragraph_1,
            paragraph_2,
            bridges,
            ..
        } => format!(
            "Paragraph 1: {}\n\nParagraph 2: {}\n\nWhich connecting sentence is most anomalous or inconsistent?\n\n{}\n",
            paragraph_1.join(" "),
            paragraph_2.join(" "),
            numbered(bridges)
        ),
        ProblemContent::Context { context, .. } => format!(
            "Which option is most anomalous or inconsistent?\n\n{}\n",
            numbered(context)
        ),
    }
}

fn detailed_entry(position: usize, exp: &StudentExperience) -> String {
    let mut text = format!(
        "Detailed Problem {} (Difficulty: {}):\n",
        position, exp.difficulty
    );
    text.push_str(&render_past_problem(&exp.problem.content));
    let answer = match &exp.problem.content {
        _ if exp.answer < 0 => UNPARSEABLE.to_string(),
        ProblemContent::Coherence { .. } => binary_answer(exp.answer).to_string(),
        _ => (exp.answer + 1).to_string(),
    };
    text.push_str(&format!("\nYour answer: {}\n", answer));
    text.push_str(&format!(
        "Outcome: {}\n\n",
        if exp.was_correct { "Correct" } else { "Incorrect" }
    ));
    text
}

/// Renders the history block; empty when there is no history.
pub fn render_history(history: &[StudentExperience], detail_window: usize) -> String {
    if history.is_empty() {
        return String::new();
    }

    let split = history.len().saturating_sub(detail_window);
    let (earlier, recent) = history.split_at(split);

    let mut text = String::from("## YOUR PREVIOUS EXPERIENCE\n\n");
    if !earlier.is_empty() {
        text.push_str("Summary of earlier problems:\n");
        for (i, exp) in earlier.iter().enumerate() {
            text.push_str(&summary_line(i + 1, exp));
        }
        text.push('\n');
    }
    for (offset, exp) in recent.iter().enumerate() {
        text.push_str(&detailed_entry(split + offset + 1, exp));
    }
    text.push_str(&"=".repeat(50));
    text.push_str("\n\n");
    text
}

/// Renders the question for a new problem.
pub fn render_question(content: &ProblemContent) -> String {
    match content {
        ProblemContent::Coherence { context, .. } => format!(
            "Does the following paragraph have a logically coherent sentence order? Answer only 'yes' or 'no'.\n\n{}",
            context.join(" ")
        ),
        ProblemContent::Blank {
            sentence, choices, ..
        } => format!(
            "{}\n\nWhich option is most anomalous or inconsistent? {}\n\n{}",
            sentence,
            COMMON_SUFFIX,
            numbered(choices)
        ),
        ProblemContent::Bridge {
            paragraph_1,
            paragraph_2,
            bridges,
            ..
        } => format!(
            "Paragraph 1: {}\n\nParagraph 2: {}\n\nWhich connecting sentence is most anomalous or inconsistent? {}\n\n{}",
            paragraph_1.join(" "),
            paragraph_2.join(" "),
            COMMON_SUFFIX,
            numbered(bridges)
        ),
        ProblemContent::Context { context, .. } => format!(
            "Which option is most anomalous or inconsistent? {}\n\n{}",
            COMMON_SUFFIX,
            numbered(context)
        ),
    }
}

/// Builds the full Student prompt: preamble, history, then the new problem.
pub fn build_student_prompt(
    content: &ProblemContent,
    history: &[StudentExperience],
    detail_window: usize,
) -> String {
    let mut prompt = String::from(
        "I'll present you with your previous problem-solving history, followed by a new problem to solve.\n\n",
    );
    prompt.push_str(&render_history(history, detail_window));
    prompt.push_str("## NEW PROBLEM TO SOLVE\n\n");
    prompt.push_str("Focus entirely on this new problem below:\n\n");
    prompt.push_str(&render_question(content));
    prompt.push_str("\n\nYour response for this new problem:");
    prompt
}
