//! Domain model for the testing program.
//!
//! Identifier newtypes, caller identity, and the enums persisted by the
//! store. Every enum round-trips through its lowercase text form so SQLite
//! CHECK constraints, serde payloads, and CLI arguments all agree on one
//! spelling.

pub mod feedback;
pub mod identity;
pub mod ids;
pub mod task;
pub mod title;

pub use feedback::{FeedbackDraft, FeedbackKind, FeedbackStatus, Severity};
pub use identity::{Caller, Role};
pub use ids::{FeedbackId, InvalidId, PublisherId, TaskId, TesterId, TitleId};
pub use task::{TaskKind, TaskSpec, POINTS_REWARD_MAX, XP_REWARD_MAX};
pub use title::ReleaseState;

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('-', "_")
}
