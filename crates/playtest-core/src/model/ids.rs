//! Typed identifiers.
//!
//! Tester, publisher, and title ids arrive from the identity collaborator as
//! opaque strings; the newtypes only reject blank values. Task and feedback
//! ids are generated by the engine with a stable prefix so a glance at a log
//! line (or a `CHECK (... LIKE 'task-%')` failure) tells you which table an
//! id belongs to.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Prefix for engine-generated task ids.
pub const TASK_ID_PREFIX: &str = "task-";
/// Prefix for engine-generated feedback ids.
pub const FEEDBACK_ID_PREFIX: &str = "fb-";

/// Error returned when an identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidId {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for InvalidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for InvalidId {}

fn opaque_id(raw: &str, expected: &'static str) -> Result<String, InvalidId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidId {
            expected,
            got: raw.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn prefixed_id(raw: &str, prefix: &'static str, expected: &'static str) -> Result<String, InvalidId> {
    let trimmed = raw.trim();
    match trimmed.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => Ok(trimmed.to_string()),
        _ => Err(InvalidId {
            expected,
            got: raw.to_string(),
        }),
    }
}

/// Identity of a tester, supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TesterId(String);

impl TesterId {
    /// # Errors
    ///
    /// Returns [`InvalidId`] if the id is blank.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidId> {
        opaque_id(raw.as_ref(), "tester id").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity of a publisher, supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublisherId(String);

impl PublisherId {
    /// # Errors
    ///
    /// Returns [`InvalidId`] if the id is blank.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidId> {
        opaque_id(raw.as_ref(), "publisher id").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity of a title (the creative work under test).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(String);

impl TitleId {
    /// # Errors
    ///
    /// Returns [`InvalidId`] if the id is blank.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidId> {
        opaque_id(raw.as_ref(), "title id").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Engine-generated id of a task (`task-` prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Mint a fresh task id.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{TASK_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// # Errors
    ///
    /// Returns [`InvalidId`] if the id does not carry the `task-` prefix.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidId> {
        prefixed_id(raw.as_ref(), TASK_ID_PREFIX, "task id").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Engine-generated id of a feedback item (`fb-` prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackId(String);

impl FeedbackId {
    /// Mint a fresh feedback id.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{FEEDBACK_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// # Errors
    ///
    /// Returns [`InvalidId`] if the id does not carry the `fb-` prefix.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidId> {
        prefixed_id(raw.as_ref(), FEEDBACK_ID_PREFIX, "feedback id").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PublisherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TesterId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for PublisherId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for TitleId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for TaskId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for FeedbackId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
