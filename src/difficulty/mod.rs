//! Difficulty tiers for anomaly-forge problems.
//!
//! This module provides the ordinal difficulty scale and the thresholds that
//! map a run of consecutive correct Student answers to the next tier.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// The difficulty tier of a problem, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
    Extreme,
    Impossible,
}

impl DifficultyLevel {
    /// Returns all tiers in ascending order.
    pub fn all() -> Vec<DifficultyLevel> {
        vec![
            DifficultyLevel::Easy,
            DifficultyLevel::Medium,
            DifficultyLevel::Hard,
            DifficultyLevel::Extreme,
            DifficultyLevel::Impossible,
        ]
    }

    /// Lowercase name, as written in problem metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Hard => "hard",
            DifficultyLevel::Extreme => "extreme",
            DifficultyLevel::Impossible => "impossible",
        }
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyLevel::Easy),
            "medium" => Ok(DifficultyLevel::Medium),
            "hard" => Ok(DifficultyLevel::Hard),
            "extreme" => Ok(DifficultyLevel::Extreme),
            "impossible" => Ok(DifficultyLevel::Impossible),
            other => Err(format!("Unknown difficulty level '{}'", other)),
        }
    }
}

/// Consecutive-correct counts at which escalation reaches each tier.
///
/// Below `hard` the escalation target is `medium`; with the default
/// thresholds every escalation is at least `hard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationThresholds {
    pub hard: u32,
    pub extreme: u32,
    pub impossible: u32,
}

impl Default for EscalationThresholds {
    fn default() -> Self {
        Self {
            hard: 1,
            extreme: 2,
            impossible: 4,
        }
    }
}

/// Invalid [`EscalationThresholds`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("escalation threshold 'hard' must be at least 1")]
    ZeroHard,

    #[error(
        "escalation thresholds must be non-decreasing (hard {hard} <= extreme {extreme} <= impossible {impossible})"
    )]
    Decreasing {
        hard: u32,
        extreme: u32,
        impossible: u32,
    },
}

impl EscalationThresholds {
    /// Creates thresholds; see [`EscalationThresholds::validate`] for the accepted range.
    pub fn new(hard: u32, extreme: u32, impossible: u32) -> Self {
        Self {
            hard,
            extreme,
            impossible,
        }
    }

    /// Requires `1 <= hard <= extreme <= impossible`.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.hard == 0 {
            return Err(ThresholdError::ZeroHard);
        }
        if !(self.hard <= self.extreme && self.extreme <= self.impossible) {
            return Err(ThresholdError::Decreasing {
                hard: self.hard,
                extreme: self.extreme,
                impossible: self.impossible,
            });
        }
        Ok(())
    }

    /// Tier targeted after `consecutive_correct` correct answers in a row.
    pub fn tier_for(&self, consecutive_correct: u32) -> DifficultyLevel {
        if consecutive_correct >= self.impossible {
            DifficultyLevel::Impossible
        } else if consecutive_correct >= self.extreme {
            DifficultyLevel::Extreme
        } else if consecutive_correct >= self.hard {
            DifficultyLevel::Hard
        } else {
            DifficultyLevel::Medium
        }
    }

    /// Next tier for a sample currently at `current`. Never lower than `current`.
    pub fn escalate(&self, current: DifficultyLevel, consecutive_correct: u32) -> DifficultyLevel {
        self.tier_for(consecutive_correct).max(current)
    }
}
