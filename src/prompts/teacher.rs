//! Drafting prompts for the Teacher role.
//!
//! A draft prompt asks for one problem of a given task, topic, exam style
//! and difficulty tier. Escalation prompts extend a draft prompt with the
//! problem the Student just solved and the Orchestrator's advice.

use crate::difficulty::DifficultyLevel;
use crate::tasks::{Problem, ProblemContent, TaskId};

/// Inputs to a draft prompt.
#[derive(Debug, Clone)]
pub struct DraftRequest<'a> {
    pub task: TaskId,
    pub topic: &'a str,
    pub style: &'a str,
    /// Anomaly factor to build around, when the factor roll succeeded.
    pub factor: Option<&'a str>,
    pub difficulty: DifficultyLevel,
    /// Worked example to show, when the example roll succeeded.
    pub example: Option<&'a ProblemContent>,
}

/// How strongly the anomaly should be hidden at each tier.
pub fn difficulty_guidance(level: DifficultyLevel) -> &'static str {
    match level {
        DifficultyLevel::Impossible => {
            "Create an exceptionally subtle anomaly that requires deep expertise to detect. The anomaly should be a nuanced conceptual inconsistency - not a factual error - seamlessly embedded within the text. It should challenge even expert readers while remaining logically defensible."
        }
        DifficultyLevel::Extreme => {
            "Make the anomaly exceptionally subtle and sophisticated. It should require deep critical thinking and expert knowledge to detect. Create a challenging problem that would be difficult even for advanced students."
        }
        DifficultyLevel::Hard => {
            "Make the anomaly logically plausible and contextually realistic, yet semantically or pragmatically inconsistent. Avoid clear contradictions."
        }
        DifficultyLevel::Easy => {
            "Use a clear but non-trivial anomaly. It should be detectable without requiring extensive critical analysis."
        }
        DifficultyLevel::Medium => {
            "Create a non-trivial anomaly that requires careful reading to detect. It should be noticeable but not immediately obvious."
        }
    }
}

fn example_block(example: &ProblemContent) -> String {
    let json = serde_json::to_string_pretty(example).unwrap_or_default();
    format!("```json\n{}\n```", json)
}

/// Builds the prompt that asks the Teacher for a fresh problem.
pub fn build_draft_prompt(request: &DraftRequest<'_>) -> String {
    let DraftRequest {
        task,
        topic,
        style,
        factor,
        difficulty,
        example,
    } = *request;
    let guidance = difficulty_guidance(difficulty);

    let mut prompt = format!(
        "You are a {}-style exam question generator. Create a question for task {} on the topic of {}.\n",
        style, task, topic
    );

    match task {
        TaskId::T1 => {
            prompt.push_str(&format!(
                "\nGenerate 5 to 6 sentences on {}. One of them should be anomalous (e.g., semantically inconsistent or conceptually off-topic).",
                topic
            ));
            if let Some(factor) = factor {
                prompt.push_str(&format!(" The anomaly should be based on: {}.", factor));
            }
            prompt.push_str(&format!(" {}", guidance));
            if let Some(example) = example {
                prompt.push_str(&format!(
                    "\n\nHere is an example format to follow:\n{}",
                    example_block(example)
                ));
            }
            prompt.push_str(&format!(
                "\n\nReturn the result strictly in JSON format:\n{{\n  \"context\": [\"...\"],\n  \"anomaly_index\": <integer>,\n  \"meta\": {{\n    \"source\": \"{}\",\n    \"topic\": \"{}\",\n    \"anomaly_type\": \"{}\"\n  }}\n}}",
                style,
                topic,
                factor.unwrap_or("none")
            ));
        }
        TaskId::T2 => {
            prompt.push_str(&format!(
                "\nCreate 5 sentences about {} with the following requirements:\n",
                topic
            ));
            prompt.push_str("Randomly choose ONE of the following options:\n\n");
            prompt.push_str(
                "OPTION 1: Write logically coherent sentences in the correct order (is_coherent: true)\n\n",
            );
            prompt.push_str("OPTION 2: Write sentences with subtly disrupted order (is_coherent: false):\n");
            prompt.push_str("   - Move 1-2 sentences that disrupt temporal/causal flow\n");
            prompt.push_str("   - Avoid obvious scrambling; maintain some local coherence\n");
            prompt.push_str("   - The disruption should be detectable but not immediately obvious\n\n");
            if let Some(example) = example {
                prompt.push_str(&format!("\nExample format:\n{}", example_block(example)));
            }
            prompt.push_str(
                "\n\nReturn ONLY ONE JSON with:\n{\n  \"context\": [list of 5 sentences],\n  \"is_coherent\": boolean (true if in logical order, false if shuffled)\n}",
            );
        }
        TaskId::T3 => {
            prompt.push_str(&format!("\nDesign a sentence completion question on {}:\n", topic));
            prompt.push_str("1. Write one sentence with a meaningful blank (marked as ___)\n");
            prompt.push_str("2. Provide 5 choices where one is subtly inappropriate\n");
            if let Some(factor) = factor {
                prompt.push_str(&format!("3. The inappropriate choice should involve: {}\n", factor));
            }
            prompt.push_str(&format!("4. {}\n", guidance));
            if let Some(example) = example {
                prompt.push_str(&format!("\nExample format:\n{}", example_block(example)));
            }
            prompt.push_str(
                "\n\nReturn JSON with:\n{\n  \"sentence\": \"sentence with ___\",\n  \"choices\": [5 options],\n  \"anomaly_index\": index of the anomalous choice\n}",
            );
        }
        TaskId::T4 => {
            prompt.push_str(&format!("\nCreate a paragraph bridging task on {}:\n", topic));
            prompt.push_str("1. Write two short paragraphs (2-3 sentences each)\n");
            prompt.push_str("2. Generate 5 candidate bridge sentences\n");
            prompt.push_str("3. One bridge should be contextually or logically weak\n");
            if let Some(factor) = factor {
                prompt.push_str(&format!("4. The weak bridge should have: {}\n", factor));
            }
            prompt.push_str(&format!("5. {}\n", guidance));
            if let Some(example) = example {
                prompt.push_str(&format!("\nExample format:\n{}", example_block(example)));
            }
            prompt.push_str(
                "\n\nReturn JSON with:\n{\n  \"paragraph_1\": [sentences],\n  \"paragraph_2\": [sentences],\n  \"bridges\": [5 bridge options],\n  \"anomaly_index\": index of the weak bridge\n}",
            );
        }
        TaskId::T5 => {
            prompt.push_str(&format!(
                "\nGenerate a coreference resolution question on {}:\n",
                topic
            ));
            prompt.push_str("1. Write 5 sentences with pronouns and referents\n");
            prompt.push_str("2. One sentence must contain ambiguous pronouns where it's unclear which antecedent the pronoun refers to\n");
            prompt.push_str("3. The ambiguous sentence should create one clear type of referential ambiguity by either:\n");
            prompt.push_str("   a) Using a pronoun with multiple possible antecedents - where the pronoun could refer to two or more previously mentioned entities, OR\n");
            prompt.push_str("   b) Using a pronoun with an unclear or implied but not explicitly mentioned antecedent\n");
            prompt.push_str("4. Choose only ONE of these ambiguity types (a or b) for the sentence, and ensure it is subtle yet detectable\n");
            prompt.push_str("5. Make the potential referents semantically similar or related, increasing the subtlety of the ambiguity\n");
            if matches!(difficulty, DifficultyLevel::Hard | DifficultyLevel::Extreme) {
                prompt.push_str("6. Ensure the ambiguity requires careful context analysis to detect\n");
            }
            if difficulty == DifficultyLevel::Extreme {
                prompt.push_str("7. Make the ambiguity multi-layered, with at least 2-3 possible interpretations for the ambiguous pronoun\n");
                prompt.push_str("8. Place the ambiguous sentence in a complex paragraph structure where careful analysis is required to detect the ambiguity\n");
            }
            if let Some(factor) = factor {
                prompt.push_str(&format!("9. The ambiguity should involve: {}\n", factor));
            }
            prompt.push_str(&format!("10. {}\n", guidance));
            if let Some(example) = example {
                prompt.push_str(&format!("\nExample format:\n{}", example_block(example)));
            }
            prompt.push_str(
                "\n\nReturn JSON with:\n{\n  \"context\": [5 sentences],\n  \"anomaly_index\": index of the ambiguous sentence\n}",
            );
        }
        TaskId::T6 => {
            prompt.push_str(&format!("\nCreate a logical consistency question on {}:\n", topic));
            prompt.push_str("1. Generate 5 statements\n");
            prompt.push_str("2. One should contain a contradiction or reversed logic\n");
            if let Some(factor) = factor {
                prompt.push_str(&format!("3. The contradiction should involve: {}\n", factor));
            }
            prompt.push_str(&format!("4. {}\n", guidance));
            if let Some(example) = example {
                prompt.push_str(&format!("\nExample format:\n{}", example_block(example)));
            }
            prompt.push_str(
                "\n\nReturn JSON with:\n{\n  \"context\": [5 statements],\n  \"anomaly_index\": index of the contradictory statement\n}",
            );
        }
        TaskId::T7 => {
            prompt.push_str(&format!("\nDesign a stylistic coherence question on {}:\n", topic));
            prompt.push_str("1. Write 5 sentences with consistent formal/academic tone\n");
            prompt.push_str("2. One sentence should subtly violate the established tone/style\n");
            if let Some(factor) = factor {
                prompt.push_str(&format!("3. The violation should involve: {}\n", factor));
            }
            prompt.push_str(&format!("4. {}\n", guidance));
            if let Some(example) = example {
                prompt.push_str(&format!("\nExample format:\n{}", example_block(example)));
            }
            prompt.push_str(
                "\n\nReturn JSON with:\n{\n  \"context\": [5 sentences],\n  \"anomaly_index\": index of the tone-violating sentence\n}",
            );
        }
    }

    prompt
}

/// Appends the previous init attempt's rejection feedback.
pub fn with_init_feedback(mut prompt: String, feedback: Option<&str>) -> String {
    if let Some(feedback) = feedback {
        prompt.push_str(&format!("\n\nPREVIOUS FEEDBACK: {}", feedback));
    }
    prompt
}

/// Instruction appended when earlier escalation drafts were rejected.
pub const EASE_OFF_INSTRUCTION: &str = "IMPORTANT INSTRUCTION: Previous attempts were rejected by the quality controller. Please slightly reduce the difficulty from your last attempt while still making it challenging. Make the problem clearer based on the feedback, but ensure it remains harder than the original problem the student solved. Focus on fixing the specific issues mentioned in the feedback while maintaining an appropriate challenge level.";

/// Inputs to an escalation prompt.
#[derive(Debug, Clone)]
pub struct EscalationRequest<'a> {
    /// The approved problem the Student solved.
    pub previous: &'a Problem,
    pub student_explanation: &'a str,
    /// Improvement feedback, accumulated with rejection feedback on retries.
    pub feedback: &'a str,
    pub difficulty: DifficultyLevel,
    /// True after at least one rejected escalation draft.
    pub is_retry: bool,
}

/// Builds the prompt for a harder version of `request.previous`.
pub fn build_escalation_prompt(draft: &DraftRequest<'_>, request: &EscalationRequest<'_>) -> String {
    let mut prompt = build_draft_prompt(draft);
    prompt.push_str(&format!(
        "\n\nPREVIOUS PROBLEM: The student correctly solved the following problem:\n{}\n\n",
        request.previous.to_pretty_json()
    ));
    prompt.push_str(&format!(
        "STUDENT'S EXPLANATION: {}\n\n",
        request.student_explanation
    ));
    prompt.push_str(&format!("FEEDBACK FOR IMPROVEMENT: {}\n\n", request.feedback));
    if request.is_retry {
        prompt.push_str(EASE_OFF_INSTRUCTION);
    } else {
        prompt.push_str(&format!(
            "Please create a more challenging version with {} difficulty.",
            request.difficulty
        ));
    }
    prompt
}

/// Accumulates rejection feedback for the next escalation attempt.
pub fn accumulate_feedback(previous: &str, rejection: &str) -> String {
    format!(
        "PREVIOUS FEEDBACK:\n{}\n\nNEW FEEDBACK:\n{}",
        previous, rejection
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{ProblemMeta, TaskId};

    fn request(task: TaskId, difficulty: DifficultyLevel) -> DraftRequest<'static> {
        DraftRequest {
            task,
            topic: "philosophy",
            style: "GRE",
            factor: None,
            difficulty,
            example: None,
        }
    }

    #[test]
    fn test_draft_prompt_header_and_guidance() {
        let prompt = build_draft_prompt(&request(TaskId::T1, DifficultyLevel::Easy));
        assert!(prompt.starts_with(
            "You are a GRE-style exam question generator. Create a question for task T1 on the topic of philosophy.\n"
        ));
        assert!(prompt.contains(difficulty_guidance(DifficultyLevel::Easy)));
        assert!(prompt.contains("\"anomaly_type\": \"none\""));
        assert!(!prompt.contains("```json"));
    }

    #[test]
    fn test_factor_and_example_are_optional_sections() {
        let example = TaskId::T3
            .spec()
            .example
            .map(|e| e.to_content())
            .expect("T3 has an example");
        let mut req = request(TaskId::T3, DifficultyLevel::Hard);
        req.factor = Some("collocation");
        req.example = Some(&example);

        let prompt = build_draft_prompt(&req);
        assert!(prompt.contains("3. The inappropriate choice should involve: collocation\n"));
        assert!(prompt.contains("```json\n{\n  \"sentence\""));
        assert!(prompt.contains("MySpace"));
        assert!(prompt.contains(&format!("4. {}\n", difficulty_guidance(DifficultyLevel::Hard))));
    }

    #[test]
    fn test_t5_tier_specific_lines() {
        let easy = build_draft_prompt(&request(TaskId::T5, DifficultyLevel::Easy));
        assert!(!easy.contains("6. Ensure the ambiguity"));

        let hard = build_draft_prompt(&request(TaskId::T5, DifficultyLevel::Hard));
        assert!(hard.contains("6. Ensure the ambiguity requires careful context analysis"));
        assert!(!hard.contains("7. Make the ambiguity multi-layered"));

        let extreme = build_draft_prompt(&request(TaskId::T5, DifficultyLevel::Extreme));
        assert!(extreme.contains("7. Make the ambiguity multi-layered"));
    }

    #[test]
    fn test_every_task_asks_for_json() {
        for task in TaskId::all() {
            let prompt = build_draft_prompt(&request(task, DifficultyLevel::Medium));
            assert!(prompt.contains("JSON"), "{} prompt lacks a JSON format", task);
        }
    }

    #[test]
    fn test_init_feedback_suffix() {
        let prompt = with_init_feedback("base".to_string(), Some("index is wrong"));
        assert_eq!(prompt, "base\n\nPREVIOUS FEEDBACK: index is wrong");
        assert_eq!(with_init_feedback("base".to_string(), None), "base");
    }

    #[test]
    fn test_escalation_prompt_first_attempt_and_retry() {
        let content = ProblemContent::Context {
            context: vec!["a".into(), "b".into()],
            anomaly_index: 1,
        };
        let meta = ProblemMeta {
            topic: "philosophy".into(),
            style: "GRE".into(),
            anomaly_type: "none".into(),
            difficulty_level: DifficultyLevel::Easy,
            fix_count: 0,
            phase: None,
            student_correct: Some(true),
            student_explanation: Some("2 is off".into()),
        };
        let previous = Problem::new(TaskId::T1, 0, content, meta);
        let draft = request(TaskId::T1, DifficultyLevel::Hard);

        let first = build_escalation_prompt(
            &draft,
            &EscalationRequest {
                previous: &previous,
                student_explanation: "2 is off",
                feedback: "hide it better",
                difficulty: DifficultyLevel::Hard,
                is_retry: false,
            },
        );
        assert!(first.contains("PREVIOUS PROBLEM: The student correctly solved the following problem:\n{"));
        assert!(first.contains("\"sample_id\": \"T1_000_v0\""));
        assert!(first.contains("STUDENT'S EXPLANATION: 2 is off\n\n"));
        assert!(first.contains("FEEDBACK FOR IMPROVEMENT: hide it better\n\n"));
        assert!(first.ends_with("Please create a more challenging version with hard difficulty."));

        let retry = build_escalation_prompt(
            &draft,
            &EscalationRequest {
                previous: &previous,
                student_explanation: "2 is off",
                feedback: "hide it better",
                difficulty: DifficultyLevel::Hard,
                is_retry: true,
            },
        );
        assert!(retry.ends_with(EASE_OFF_INSTRUCTION));
    }

    #[test]
    fn test_accumulate_feedback() {
        assert_eq!(
            accumulate_feedback("make it subtle", "index out of range"),
            "PREVIOUS FEEDBACK:\nmake it subtle\n\nNEW FEEDBACK:\nindex out of range"
        );
    }
}
