//! Feedback kinds, severities, statuses, and the submission draft.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ParseEnumError, normalize};
use crate::error::EngineError;

/// What a feedback item reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Bug,
    Suggestion,
    General,
}

impl FeedbackKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Suggestion => "suggestion",
            Self::General => "general",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "bug" => Ok(Self::Bug),
            "suggestion" => Ok(Self::Suggestion),
            "general" => Ok(Self::General),
            _ => Err(ParseEnumError {
                expected: "bug|suggestion|general",
                got: s.to_string(),
            }),
        }
    }
}

/// Impact level of a reported bug. Only meaningful when the feedback kind
/// is [`FeedbackKind::Bug`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseEnumError {
                expected: "critical|high|medium|low",
                got: s.to_string(),
            }),
        }
    }
}

/// Triage status of a feedback item.
///
/// Transitions are unordered: the publisher may move an item between any
/// two statuses, including reopening a closed item back to `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    New,
    InProgress,
    Resolved,
    Closed,
}

impl FeedbackStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "new|in_progress|resolved|closed",
                got: s.to_string(),
            }),
        }
    }
}

/// Tester-supplied fields for a feedback submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDraft {
    pub kind: FeedbackKind,
    pub summary: String,
    pub description: String,
    pub severity: Option<Severity>,
    pub attachment_ref: Option<String>,
}

impl FeedbackDraft {
    /// Trims free-text fields and enforces the severity rule: required for
    /// bugs, rejected for everything else.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when a text field is blank or the
    /// severity does not match the kind.
    pub fn validated(mut self) -> Result<Self, EngineError> {
        let summary = self.summary.trim();
        if summary.is_empty() {
            return Err(EngineError::Validation(
                "feedback summary must not be blank".to_string(),
            ));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(EngineError::Validation(
                "feedback description must not be blank".to_string(),
            ));
        }
        match (self.kind, self.severity) {
            (FeedbackKind::Bug, None) => {
                return Err(EngineError::Validation(
                    "bug feedback requires a severity".to_string(),
                ));
            }
            (kind, Some(severity)) if kind != FeedbackKind::Bug => {
                return Err(EngineError::Validation(format!(
                    "severity '{severity}' is only valid for bug feedback, not {kind}"
                )));
            }
            _ => {}
        }
        self.summary = summary.to_string();
        self.description = description.to_string();
        self.attachment_ref = self
            .attachment_ref
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(kind: FeedbackKind, severity: Option<Severity>) -> FeedbackDraft {
        FeedbackDraft {
            kind,
            summary: "Crash on save".to_string(),
            description: "Saving in the cave level crashes to desktop".to_string(),
            severity,
            attachment_ref: None,
        }
    }

    #[test]
    fn severity_is_required_exactly_for_bugs() {
        assert!(draft(FeedbackKind::Bug, Some(Severity::High)).validated().is_ok());
        assert!(draft(FeedbackKind::Bug, None).validated().is_err());
        assert!(draft(FeedbackKind::Suggestion, Some(Severity::Low)).validated().is_err());
        assert!(draft(FeedbackKind::Suggestion, None).validated().is_ok());
        assert!(draft(FeedbackKind::General, Some(Severity::Critical)).validated().is_err());
        assert!(draft(FeedbackKind::General, None).validated().is_ok());
    }

    #[test]
    fn blank_text_fields_are_rejected() {
        let blank_summary = FeedbackDraft {
            summary: "  ".to_string(),
            ..draft(FeedbackKind::General, None)
        };
        assert!(blank_summary.validated().is_err());

        let blank_description = FeedbackDraft {
            description: String::new(),
            ..draft(FeedbackKind::General, None)
        };
        assert!(blank_description.validated().is_err());
    }

    #[test]
    fn validated_trims_text_and_drops_empty_attachments() {
        let input = FeedbackDraft {
            summary: " Crash on save ".to_string(),
            description: " details ".to_string(),
            attachment_ref: Some("   ".to_string()),
            ..draft(FeedbackKind::General, None)
        };
        let clean = input.validated().unwrap();
        assert_eq!(clean.summary, "Crash on save");
        assert_eq!(clean.description, "details");
        assert_eq!(clean.attachment_ref, None);
    }

    #[test]
    fn statuses_parse_with_either_separator() {
        assert_eq!(
            "in_progress".parse::<FeedbackStatus>().unwrap(),
            FeedbackStatus::InProgress
        );
        assert_eq!(
            "In-Progress".parse::<FeedbackStatus>().unwrap(),
            FeedbackStatus::InProgress
        );
        assert!("triaged".parse::<FeedbackStatus>().is_err());
    }
}
