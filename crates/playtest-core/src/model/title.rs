//! Release lifecycle of a title under test.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ParseEnumError, normalize};

/// Where a title sits in its release lifecycle.
///
/// The lifecycle is one-way: `draft` to `testing` to `released`. `released`
/// is terminal; nothing demotes a title back into testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    Draft,
    Testing,
    Released,
}

impl ReleaseState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Testing => "testing",
            Self::Released => "released",
        }
    }

    /// Whether testers may accept agreements, enroll, and submit work.
    #[must_use]
    pub const fn accepts_testers(self) -> bool {
        matches!(self, Self::Testing)
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "draft" => Ok(Self::Draft),
            "testing" => Ok(Self::Testing),
            "released" => Ok(Self::Released),
            _ => Err(ParseEnumError {
                expected: "draft|testing|released",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_states_case_insensitively() {
        assert_eq!("draft".parse::<ReleaseState>().unwrap(), ReleaseState::Draft);
        assert_eq!(
            " Testing ".parse::<ReleaseState>().unwrap(),
            ReleaseState::Testing
        );
        assert_eq!(
            "RELEASED".parse::<ReleaseState>().unwrap(),
            ReleaseState::Released
        );
        assert!("beta".parse::<ReleaseState>().is_err());
    }

    #[test]
    fn display_matches_stored_form() {
        for state in [
            ReleaseState::Draft,
            ReleaseState::Testing,
            ReleaseState::Released,
        ] {
            assert_eq!(state.to_string(), state.as_str());
            assert_eq!(state.as_str().parse::<ReleaseState>().unwrap(), state);
        }
    }

    #[test]
    fn only_testing_accepts_testers() {
        assert!(!ReleaseState::Draft.accepts_testers());
        assert!(ReleaseState::Testing.accepts_testers());
        assert!(!ReleaseState::Released.accepts_testers());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&ReleaseState::Testing).unwrap();
        assert_eq!(json, "\"testing\"");
    }
}
