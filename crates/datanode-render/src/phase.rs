//! Render phases and the checkpoints a host runs.
//!
//! A [`Phase`] names the pipeline checkpoint at which a template may execute:
//!
//! ```text
//! define time ─┬─ Immediate   (after each document's initial parse)
//!              ├─ PostParse   (after every document has been parsed)
//!              └─ PostResolve (after each document's references resolve)
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PhaseError;

/// Checkpoint at which a template's render chain is allowed to run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Phase {
    #[default]
    Immediate,
    PostParse,
    PostResolve,
}

impl Phase {
    /// All phases in pipeline order.
    pub const ALL: [Phase; 3] = [Phase::Immediate, Phase::PostParse, Phase::PostResolve];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Immediate => "immediate",
            Phase::PostParse => "post-parse",
            Phase::PostResolve => "post-resolve",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = PhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "immediate" | "parsing" => Ok(Phase::Immediate),
            "post-parse" | "parsed" => Ok(Phase::PostParse),
            "post-resolve" | "resolving" => Ok(Phase::PostResolve),
            _ => Err(PhaseError::Unknown(s.to_string())),
        }
    }
}

impl TryFrom<String> for Phase {
    type Error = PhaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.as_str().to_string()
    }
}

/// The set of checkpoints a host actually runs.
///
/// A placeholder whose phase is not in this set would never render, so
/// definitions are checked against it up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoints {
    enabled: BTreeSet<Phase>,
}

impl Default for Checkpoints {
    fn default() -> Self {
        Self::all()
    }
}

impl Checkpoints {
    pub fn all() -> Self {
        Self::from_iter(Phase::ALL)
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.enabled.contains(&phase)
    }

    /// Fails if the host never reaches `phase`.
    pub fn validate(&self, phase: Phase) -> Result<(), PhaseError> {
        if self.contains(phase) {
            Ok(())
        } else {
            Err(PhaseError::Unreachable { phase })
        }
    }

    /// The enabled checkpoint that runs right after `phase`, if any.
    pub fn next_after(&self, phase: Phase) -> Option<Phase> {
        self.enabled
            .iter()
            .copied()
            .find(|candidate| *candidate > phase)
    }

    /// The first enabled checkpoint.
    pub fn first(&self) -> Option<Phase> {
        self.enabled.iter().next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Phase> + '_ {
        self.enabled.iter().copied()
    }
}

impl FromIterator<Phase> for Checkpoints {
    fn from_iter<T: IntoIterator<Item = Phase>>(iter: T) -> Self {
        Self {
            enabled: iter.into_iter().collect(),
        }
    }
}
