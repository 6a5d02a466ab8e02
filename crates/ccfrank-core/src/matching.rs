//! Venue matching: normalized input against the [`ReferenceIndex`].
//!
//! Strategies run in a fixed order and the first hit wins:
//!
//! 1. exact abbreviation
//! 2. exact full name
//! 3. an abbreviation of at least [`MIN_FUZZY_ABBREVIATION_LEN`] characters
//!    contained in the input
//! 4. a full name of at least [`MIN_FUZZY_FULL_NAME_LEN`] characters
//!    contained in the input
//!
//! When several keys satisfy a containment strategy the first one in table
//! order is returned. No attempt is made to pick a "best" candidate.

use std::fmt;

use crate::index::ReferenceIndex;
use crate::normalize::normalize;
use crate::ReferenceEntry;

/// Shortest abbreviation allowed to match by containment. Shorter keys
/// ("AI", "SC", "CCS"...) occur inside too many unrelated names.
pub const MIN_FUZZY_ABBREVIATION_LEN: usize = 4;

/// Shortest full name allowed to match by containment.
pub const MIN_FUZZY_FULL_NAME_LEN: usize = 20;

/// Which step of the chain produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    ExactAbbreviation,
    ExactFullName,
    AbbreviationContained,
    FullNameContained,
}

impl Strategy {
    pub fn is_exact(&self) -> bool {
        matches!(self, Strategy::ExactAbbreviation | Strategy::ExactFullName)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ExactAbbreviation => "exact abbreviation",
            Strategy::ExactFullName => "exact full name",
            Strategy::AbbreviationContained => "abbreviation contained",
            Strategy::FullNameContained => "full name contained",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful match together with how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueMatch<'a> {
    pub entry: &'a ReferenceEntry,
    pub strategy: Strategy,
    /// The index key that matched (lowercased abbreviation or full name).
    pub key: &'a str,
    /// The normalized form of the input.
    pub normalized: String,
}

/// Matches raw venue strings against a borrowed index.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    index: &'a ReferenceIndex,
}

impl<'a> Matcher<'a> {
    pub fn new(index: &'a ReferenceIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'a ReferenceIndex {
        self.index
    }

    /// The entry `raw` denotes, if any.
    pub fn find(&self, raw: &str) -> Option<&'a ReferenceEntry> {
        self.explain(raw).map(|m| m.entry)
    }

    /// Like [`find`](Self::find), but also reports the strategy and key.
    pub fn explain(&self, raw: &str) -> Option<VenueMatch<'a>> {
        if raw.trim().is_empty() {
            return None;
        }

        let normalized = normalize(raw);
        let found = self.run_strategies(&normalized);

        match found {
            Some((strategy, key, entry)) => {
                tracing::debug!(
                    input = raw,
                    normalized = %normalized,
                    strategy = strategy.as_str(),
                    key,
                    abbreviation = %entry.abbreviation,
                    "venue matched"
                );
                Some(VenueMatch {
                    entry,
                    strategy,
                    key,
                    normalized,
                })
            }
            None => {
                tracing::debug!(input = raw, normalized = %normalized, "no venue match");
                None
            }
        }
    }

    fn run_strategies(&self, normalized: &str) -> Option<(Strategy, &'a str, &'a ReferenceEntry)> {
        if normalized.is_empty() {
            return None;
        }
        let index = self.index;

        if let Some((key, entry)) = index.abbreviation_entry(normalized) {
            return Some((Strategy::ExactAbbreviation, key, entry));
        }

        if let Some((key, entry)) = index.full_name_entry(normalized) {
            return Some((Strategy::ExactFullName, key, entry));
        }

        if let Some((key, entry)) = index.abbreviation_keys().find(|(key, _)| {
            key.chars().count() >= MIN_FUZZY_ABBREVIATION_LEN && normalized.contains(key)
        }) {
            return Some((Strategy::AbbreviationContained, key, entry));
        }

        index
            .full_name_keys()
            .find(|(key, _)| {
                key.chars().count() >= MIN_FUZZY_FULL_NAME_LEN && normalized.contains(key)
            })
            .map(|(key, entry)| (Strategy::FullNameContained, key, entry))
    }
}

/// The entry `raw` denotes in `index`, if any.
pub fn match_venue<'a>(raw: &str, index: &'a ReferenceIndex) -> Option<&'a ReferenceEntry> {
    Matcher::new(index).find(raw)
}
