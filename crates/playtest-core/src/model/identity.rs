//! Caller identity passed explicitly into every operation.
//!
//! There is no ambient "current user": each entry point takes a [`Caller`]
//! and performs exactly one capability check against it before touching any
//! state. Tester-facing operations call [`Caller::as_tester`], publisher
//! operations call [`Caller::as_publisher`] (usually followed by an
//! ownership lookup against the title).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::{PublisherId, TesterId};
use super::{ParseEnumError, normalize};
use crate::error::EngineError;

/// The two capability roles known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tester,
    Publisher,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tester => "tester",
            Self::Publisher => "publisher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "tester" => Ok(Self::Tester),
            "publisher" => Ok(Self::Publisher),
            _ => Err(ParseEnumError {
                expected: "tester|publisher",
                got: s.to_string(),
            }),
        }
    }
}

/// An authenticated principal invoking an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Tester(TesterId),
    Publisher(PublisherId),
}

impl Caller {
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Tester(_) => Role::Tester,
            Self::Publisher(_) => Role::Publisher,
        }
    }

    /// The raw identifier, independent of role. Used for logging.
    #[must_use]
    pub fn id_str(&self) -> &str {
        match self {
            Self::Tester(id) => id.as_str(),
            Self::Publisher(id) => id.as_str(),
        }
    }

    /// Requires the caller to be a tester.
    pub fn as_tester(&self) -> Result<&TesterId, EngineError> {
        match self {
            Self::Tester(id) => Ok(id),
            Self::Publisher(_) => Err(EngineError::Forbidden {
                action: "act as a tester",
            }),
        }
    }

    /// Requires the caller to be a publisher.
    pub fn as_publisher(&self) -> Result<&PublisherId, EngineError> {
        match self {
            Self::Publisher(id) => Ok(id),
            Self::Tester(_) => Err(EngineError::Forbidden {
                action: "act as a publisher",
            }),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tester(id) => write!(f, "tester:{id}"),
            Self::Publisher(id) => write!(f, "publisher:{id}"),
        }
    }
}
