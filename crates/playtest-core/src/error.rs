//! Error types surfaced by engine operations.
//!
//! Every fallible operation returns [`EngineError`]. Callers that only care
//! about the failure class (rejected request vs. conflict vs. missing
//! resource) use [`EngineError::kind`]; callers that render errors use the
//! stable [`EngineError::code`] plus [`EngineError::message`] and the
//! optional [`EngineError::hint`].

use crate::model::ReleaseState;
use std::fmt;
use thiserror::Error;

/// Failure classes for machine-readable rejection reasons.
///
/// `Conflict` covers duplicate writes that are hard errors; duplicate
/// acceptance is absorbed inside the agreement ledger and never reaches the
/// caller as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PreconditionFailed,
    Conflict,
    ValidationFailed,
    NotFound,
    Forbidden,
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreconditionFailed => "precondition_failed",
            Self::Conflict => "conflict",
            Self::ValidationFailed => "validation_failed",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All failures an engine operation can report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("confidentiality agreement not accepted for title '{title_id}'")]
    AgreementRequired { tester_id: String, title_id: String },

    #[error("tester '{tester_id}' is already enrolled in title '{title_id}'")]
    AlreadyEnrolled { tester_id: String, title_id: String },

    #[error("title '{title_id}' is not open for testing (state: {state})")]
    TitleNotInTesting {
        title_id: String,
        state: ReleaseState,
    },

    #[error("title '{title_id}' has already been released")]
    AlreadyReleased { title_id: String },

    #[error("tester '{tester_id}' has no active enrollment for title '{title_id}'")]
    NotEnrolled { tester_id: String, title_id: String },

    #[error("title '{0}' not found")]
    TitleNotFound(String),

    #[error("task '{0}' not found")]
    TaskNotFound(String),

    #[error("feedback '{0}' not found")]
    FeedbackNotFound(String),

    #[error("title '{0}' is already registered")]
    TitleAlreadyRegistered(String),

    #[error("caller is not permitted to {action}")]
    Forbidden { action: &'static str },

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl EngineError {
    /// The failure class this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AgreementRequired { .. }
            | Self::TitleNotInTesting { .. }
            | Self::AlreadyReleased { .. }
            | Self::NotEnrolled { .. } => ErrorKind::PreconditionFailed,
            Self::AlreadyEnrolled { .. } | Self::TitleAlreadyRegistered(_) => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::ValidationFailed,
            Self::TitleNotFound(_) | Self::TaskNotFound(_) | Self::FeedbackNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TitleNotFound(_) => "E1001",
            Self::TitleAlreadyRegistered(_) => "E1002",
            Self::TitleNotInTesting { .. } => "E1003",
            Self::AlreadyReleased { .. } => "E1004",
            Self::AgreementRequired { .. } => "E2001",
            Self::AlreadyEnrolled { .. } => "E2002",
            Self::NotEnrolled { .. } => "E2003",
            Self::TaskNotFound(_) => "E3001",
            Self::FeedbackNotFound(_) => "E4001",
            Self::Validation(_) => "E5001",
            Self::Forbidden { .. } => "E6001",
            Self::Storage(_) => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::TitleNotFound(_) => "Title not found",
            Self::TitleAlreadyRegistered(_) => "Title already registered",
            Self::TitleNotInTesting { .. } => "Title not open for testing",
            Self::AlreadyReleased { .. } => "Title already released",
            Self::AgreementRequired { .. } => "Confidentiality agreement required",
            Self::AlreadyEnrolled { .. } => "Already enrolled",
            Self::NotEnrolled { .. } => "No active enrollment",
            Self::TaskNotFound(_) => "Task not found",
            Self::FeedbackNotFound(_) => "Feedback not found",
            Self::Validation(_) => "Invalid input",
            Self::Forbidden { .. } => "Not permitted",
            Self::Storage(_) => "Program store error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::TitleNotFound(_) => Some("Register the title with `pt title register` first."),
            Self::TitleNotInTesting { .. } => {
                Some("Only titles in the testing state accept testers.")
            }
            Self::AlreadyReleased { .. } => {
                Some("Release is terminal; there is no demotion back to testing.")
            }
            Self::AgreementRequired { .. } => {
                Some("Accept the confidentiality agreement with `pt accept` before joining.")
            }
            Self::AlreadyEnrolled { .. } => {
                Some("The enrollment is already active; no join is needed.")
            }
            Self::NotEnrolled { .. } => {
                Some("Join the title's testing program with `pt join` first.")
            }
            Self::Forbidden { .. } => Some("Check the caller identity and resource ownership."),
            Self::Storage(_) => {
                Some("Retry once. If persistent, inspect the program store file.")
            }
            Self::TitleAlreadyRegistered(_)
            | Self::TaskNotFound(_)
            | Self::FeedbackNotFound(_)
            | Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineError, ErrorKind};
    use std::collections::HashSet;

    fn sample_errors() -> Vec<EngineError> {
        vec![
            EngineError::TitleNotFound("g-1".into()),
            EngineError::TitleAlreadyRegistered("g-1".into()),
            EngineError::TitleNotInTesting {
                title_id: "g-1".into(),
                state: crate::model::ReleaseState::Released,
            },
            EngineError::AlreadyReleased {
                title_id: "g-1".into(),
            },
            EngineError::AgreementRequired {
                tester_id: "t-1".into(),
                title_id: "g-1".into(),
            },
            EngineError::AlreadyEnrolled {
                tester_id: "t-1".into(),
                title_id: "g-1".into(),
            },
            EngineError::NotEnrolled {
                tester_id: "t-1".into(),
                title_id: "g-1".into(),
            },
            EngineError::TaskNotFound("task-9".into()),
            EngineError::FeedbackNotFound("fb-9".into()),
            EngineError::Validation("xp reward out of range".into()),
            EngineError::Forbidden {
                action: "manage tasks for this title",
            },
            EngineError::Storage(rusqlite::Error::QueryReturnedNoRows),
        ]
    }

    #[test]
    fn all_codes_are_unique_and_machine_friendly() {
        let mut seen = HashSet::new();
        for error in sample_errors() {
            let code = error.code();
            assert!(seen.insert(code), "duplicate code {code}");
            assert_eq!(code.len(), 5);
            assert!(code.starts_with('E'));
            assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn kinds_follow_the_taxonomy() {
        let agreement = EngineError::AgreementRequired {
            tester_id: "t-1".into(),
            title_id: "g-1".into(),
        };
        assert_eq!(agreement.kind(), ErrorKind::PreconditionFailed);

        let enrolled = EngineError::AlreadyEnrolled {
            tester_id: "t-1".into(),
            title_id: "g-1".into(),
        };
        assert_eq!(enrolled.kind(), ErrorKind::Conflict);

        assert_eq!(
            EngineError::Validation("bad".into()).kind(),
            ErrorKind::ValidationFailed
        );
        assert_eq!(
            EngineError::TaskNotFound("task-1".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EngineError::Forbidden { action: "promote" }.kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            EngineError::AlreadyReleased {
                title_id: "g-1".into()
            }
            .kind(),
            ErrorKind::PreconditionFailed
        );
    }

    #[test]
    fn kind_names_are_snake_case() {
        for error in sample_errors() {
            let name = error.kind().as_str();
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "unexpected kind name {name}"
            );
        }
    }

    #[test]
    fn display_includes_offending_ids() {
        let error = EngineError::NotEnrolled {
            tester_id: "t-7".into(),
            title_id: "g-3".into(),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("t-7"));
        assert!(rendered.contains("g-3"));
    }
}
