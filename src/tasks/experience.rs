//! Student history.

use serde::{Deserialize, Serialize};

use super::problem::Problem;
use crate::difficulty::DifficultyLevel;

/// One Student attempt, kept as context for later attempts on the same sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentExperience {
    /// The problem as it was when the Student saw it.
    pub problem: Problem,
    /// Selected option index; -1 when no answer could be read.
    pub answer: i64,
    pub was_correct: bool,
    pub difficulty: DifficultyLevel,
}

impl StudentExperience {
    pub fn new(problem: &Problem, answer: i64, was_correct: bool) -> Self {
        Self {
            difficulty: problem.meta.difficulty_level,
            problem: problem.clone(),
            answer,
            was_correct,
        }
    }
}
