//! What to show in the rank and category columns for an item.
//!
//! Precedence: ignored, then manual rank, then the matched venue, then the
//! placeholder. The category column only ever shows the matched category.

use crate::extract::{FieldMatch, explain_record};
use crate::matching::Matcher;
use crate::overrides::{JsonFileBackend, OverrideBackend, OverrideStore};
use crate::record::BibRecord;
use crate::{ItemId, Rank};

/// Rank column text for an item with neither override nor match.
pub const DEFAULT_PLACEHOLDER: &str = "-";

/// How an item's rank was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    Ignored,
    Manual(Rank),
    Matched(FieldMatch<'a>),
    Unmatched,
}

impl Classification<'_> {
    pub fn rank(&self) -> Option<Rank> {
        match self {
            Classification::Manual(rank) => Some(*rank),
            Classification::Matched(m) => Some(m.venue.entry.rank),
            Classification::Ignored | Classification::Unmatched => None,
        }
    }
}

/// Combines the matcher with the user's overrides.
pub struct Classifier<'a, B: OverrideBackend = JsonFileBackend> {
    matcher: Matcher<'a>,
    overrides: &'a OverrideStore<B>,
    placeholder: String,
}

impl<'a, B: OverrideBackend> Classifier<'a, B> {
    pub fn new(matcher: Matcher<'a>, overrides: &'a OverrideStore<B>) -> Self {
        Self {
            matcher,
            overrides,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn classify<R: BibRecord + ?Sized>(&self, id: ItemId, record: &R) -> Classification<'a> {
        if self.overrides.is_ignored(id) {
            return Classification::Ignored;
        }
        if let Some(rank) = self.overrides.get_rank(id) {
            return Classification::Manual(rank);
        }
        match explain_record(record, &self.matcher) {
            Some(m) => Classification::Matched(m),
            None => Classification::Unmatched,
        }
    }

    /// Rank column text: empty when ignored, the placeholder when unknown.
    pub fn rank_for_record<R: BibRecord + ?Sized>(&self, id: ItemId, record: &R) -> String {
        self.rank_text(&self.classify(id, record))
    }

    /// Category column text: the matched category, otherwise empty.
    pub fn category_for_record<R: BibRecord + ?Sized>(&self, id: ItemId, record: &R) -> String {
        category_text(&self.classify(id, record))
    }

    /// Rank column text for an already computed classification.
    pub fn rank_text(&self, classification: &Classification<'_>) -> String {
        match classification {
            Classification::Ignored => String::new(),
            Classification::Unmatched => self.placeholder.clone(),
            other => other.rank().map(|r| r.to_string()).unwrap_or_default(),
        }
    }
}

/// Category column text for an already computed classification.
pub fn category_text(classification: &Classification<'_>) -> String {
    match classification {
        Classification::Matched(m) => m.venue.entry.category.clone(),
        _ => String::new(),
    }
}
