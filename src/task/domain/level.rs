//! Ordered priority and difficulty levels.
//!
//! Both enumerations persist as their string tag rather than an ordinal, so
//! adding a level later never renumbers stored rows. Variant order defines
//! the total order used for grouping and ordered filters.

use super::ParseLevelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed, totally ordered set of named levels stored by tag.
pub trait Level: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Level family name used in error messages.
    const KIND: &'static str;

    /// Every level, lowest first.
    const ALL: &'static [Self];

    /// Returns the canonical storage tag.
    fn as_str(self) -> &'static str;

    /// Parses a storage tag, failing on anything unrecognized.
    ///
    /// Matching ignores surrounding whitespace and ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`ParseLevelError`] when `value` names no level.
    fn parse(value: &str) -> Result<Self, ParseLevelError> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| ParseLevelError {
                kind: Self::KIND,
                value: value.to_owned(),
            })
    }

    /// Storage tags of every level, lowest first.
    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|level| level.as_str()).collect()
    }
}

/// How urgent a task is.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can be ignored.
    Insignificant,
    /// Nice to have.
    Low,
    /// Regular work.
    #[default]
    Medium,
    /// Should happen soon.
    High,
    /// Must happen now.
    Critical,
}

impl Level for Priority {
    const KIND: &'static str = "priority";
    const ALL: &'static [Self] = &[
        Self::Insignificant,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Insignificant => "insignificant",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// How much effort a task takes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Trivial.
    Breeze,
    /// Little effort.
    Easy,
    /// Regular effort.
    #[default]
    Medium,
    /// Significant effort.
    Hard,
    /// Needs planning.
    Challenging,
}

impl Level for Difficulty {
    const KIND: &'static str = "difficulty";
    const ALL: &'static [Self] = &[
        Self::Breeze,
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::Challenging,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Breeze => "breeze",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Challenging => "challenging",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseLevelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        <Self as Level>::parse(value)
    }
}

impl FromStr for Difficulty {
    type Err = ParseLevelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        <Self as Level>::parse(value)
    }
}
