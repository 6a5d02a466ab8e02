//! Venue normalization and CCF rank matching.
//!
//! Builds an immutable [`ReferenceIndex`] from the CCF reference table and
//! resolves noisy venue strings (conference proceedings titles, journal
//! names, abbreviations with year suffixes) to a ranked entry through a
//! fixed chain of exact and length-guarded containment strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config_file;
pub mod display;
pub mod extract;
pub mod index;
pub mod matching;
pub mod normalize;
pub mod overrides;
pub mod record;
pub mod table;

// Re-export for convenience
pub use display::{Classification, Classifier, DEFAULT_PLACEHOLDER};
pub use extract::{FieldMatch, explain_record, find_venue};
pub use index::{IndexStats, ReferenceIndex};
pub use matching::{Matcher, Strategy, VenueMatch, match_venue};
pub use normalize::normalize;
pub use overrides::{
    JsonFileBackend, MemoryBackend, OverrideBackend, OverrideState, OverrideStore,
    PersistedOverrides, StoreError,
};
pub use record::{BibRecord, Field, ItemType, Record};
pub use table::{LoadMode, ReferenceTable, TableError, TableRow};

/// Numeric identifier of a bibliographic item in the host library.
pub type ItemId = u64;

/// CCF rank of a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    A,
    B,
    C,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid rank {0:?} (expected A, B or C)")]
pub struct ParseRankError(pub String);

impl FromStr for Rank {
    type Err = ParseRankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Rank::A),
            "B" | "b" => Ok(Rank::B),
            "C" | "c" => Ok(Rank::C),
            other => Err(ParseRankError(other.to_string())),
        }
    }
}

/// Which collection of the reference table an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    Conference,
    Journal,
}

impl VenueKind {
    /// Name of the table collection holding this kind of venue.
    pub fn collection(&self) -> &'static str {
        match self {
            VenueKind::Conference => "conferences",
            VenueKind::Journal => "journals",
        }
    }
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueKind::Conference => f.write_str("conference"),
            VenueKind::Journal => f.write_str("journal"),
        }
    }
}

/// A ranked venue from the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub abbreviation: String,
    pub full_name: String,
    pub rank: Rank,
    pub category: String,
    pub kind: VenueKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_parses_case_insensitively() {
        assert_eq!("A".parse::<Rank>(), Ok(Rank::A));
        assert_eq!(" b ".parse::<Rank>(), Ok(Rank::B));
        assert_eq!("c".parse::<Rank>(), Ok(Rank::C));
    }

    #[test]
    fn rank_rejects_unknown() {
        assert_eq!("D".parse::<Rank>(), Err(ParseRankError("D".into())));
        assert!("".parse::<Rank>().is_err());
    }

    #[test]
    fn rank_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Rank::B).unwrap(), "\"B\"");
    }
}
