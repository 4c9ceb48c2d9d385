//! Task definitions authored by publishers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ParseEnumError, normalize};
use crate::error::EngineError;

/// Largest XP grant a single task may carry.
pub const XP_REWARD_MAX: u32 = 1000;

/// Largest community-points grant a single task may carry.
pub const POINTS_REWARD_MAX: u32 = 100;

/// What kind of work a task asks of a tester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    BugReport,
    Suggestion,
    PlayLevel,
    TestFeature,
}

impl TaskKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BugReport => "bug_report",
            Self::Suggestion => "suggestion",
            Self::PlayLevel => "play_level",
            Self::TestFeature => "test_feature",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "bug_report" => Ok(Self::BugReport),
            "suggestion" => Ok(Self::Suggestion),
            "play_level" => Ok(Self::PlayLevel),
            "test_feature" => Ok(Self::TestFeature),
            _ => Err(ParseEnumError {
                expected: "bug_report|suggestion|play_level|test_feature",
                got: s.to_string(),
            }),
        }
    }
}

/// Publisher-supplied fields for creating or replacing a task.
///
/// Always pass through [`TaskSpec::validated`] before persisting; the
/// database CHECK constraints are a backstop, not the primary gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub description: String,
    pub kind: TaskKind,
    pub xp_reward: u32,
    pub points_reward: u32,
    pub is_optional: bool,
    pub display_order: i64,
}

impl TaskSpec {
    /// Trims the name and checks field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the name is blank or a
    /// reward exceeds its cap.
    pub fn validated(mut self) -> Result<Self, EngineError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation(
                "task name must not be blank".to_string(),
            ));
        }
        if self.xp_reward > XP_REWARD_MAX {
            return Err(EngineError::Validation(format!(
                "xp reward {} exceeds the maximum of {XP_REWARD_MAX}",
                self.xp_reward
            )));
        }
        if self.points_reward > POINTS_REWARD_MAX {
            return Err(EngineError::Validation(format!(
                "points reward {} exceeds the maximum of {POINTS_REWARD_MAX}",
                self.points_reward
            )));
        }
        self.name = name.to_string();
        Ok(self)
    }
}
