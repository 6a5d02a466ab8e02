//! Immutable lookup structure over the reference table.
//!
//! Two maps are built in one pass: lowercased abbreviation → entry and
//! lowercased full name → entry. Besides the hash maps, the keys are kept in
//! first-insertion order so that containment scans in [`crate::matching`]
//! visit them in table order (conferences, then journals) on every build.
//!
//! When two rows share a lowercased key the later row wins. That is a
//! data-quality problem in the table, so each overwrite is logged and
//! counted in [`IndexStats`].

use std::collections::HashMap;

use crate::table::{LoadMode, ReferenceTable, TableError};
use crate::{ReferenceEntry, VenueKind};

/// A key and the entry it currently resolves to.
#[derive(Debug, Clone)]
struct KeySlot {
    key: String,
    entry: usize,
}

/// Ordered key → entry map; an overwrite keeps the key's original position.
#[derive(Debug, Clone, Default)]
struct KeyMap {
    slots: Vec<KeySlot>,
    positions: HashMap<String, usize>,
}

impl KeyMap {
    /// Insert `key`, returning the entry index it replaced, if any.
    fn insert(&mut self, key: String, entry: usize) -> Option<usize> {
        if let Some(&pos) = self.positions.get(&key) {
            let previous = self.slots[pos].entry;
            self.slots[pos].entry = entry;
            return Some(previous);
        }
        self.positions.insert(key.clone(), self.slots.len());
        self.slots.push(KeySlot { key, entry });
        None
    }

    fn get(&self, key: &str) -> Option<&KeySlot> {
        self.positions.get(key).map(|&pos| &self.slots[pos])
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Counts gathered while building the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub conferences: usize,
    pub journals: usize,
    pub abbreviation_keys: usize,
    pub full_name_keys: usize,
    /// Lowercased abbreviations that appeared on more than one row.
    pub overwritten_abbreviations: Vec<String>,
    /// Lowercased full names that appeared on more than one row.
    pub overwritten_full_names: Vec<String>,
}

/// Version information carried over from the table document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMetadata {
    pub version: Option<String>,
    pub update_date: Option<String>,
}

/// Lookup index keyed by lowercased abbreviation and lowercased full name.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    entries: Vec<ReferenceEntry>,
    by_abbreviation: KeyMap,
    by_full_name: KeyMap,
    metadata: TableMetadata,
    stats: IndexStats,
}

impl ReferenceIndex {
    /// Build from a table, rejecting malformed rows.
    pub fn build(table: &ReferenceTable) -> Result<Self, TableError> {
        Self::build_with(table, LoadMode::Strict)
    }

    /// Build from a table with an explicit policy for malformed rows.
    pub fn build_with(table: &ReferenceTable, mode: LoadMode) -> Result<Self, TableError> {
        let mut index = Self::from_entries(table.entries(mode)?);
        index.metadata = TableMetadata {
            version: table.version.clone(),
            update_date: table.update_date.clone(),
        };
        Ok(index)
    }

    /// Build the index over the table bundled with the crate.
    pub fn bundled() -> Result<Self, TableError> {
        Self::build(&ReferenceTable::bundled()?)
    }

    /// Build directly from already validated entries, in the given order.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Self {
        let mut by_abbreviation = KeyMap::default();
        let mut by_full_name = KeyMap::default();
        let mut stats = IndexStats::default();

        for (i, entry) in entries.iter().enumerate() {
            match entry.kind {
                VenueKind::Conference => stats.conferences += 1,
                VenueKind::Journal => stats.journals += 1,
            }

            let abbr_key = entry.abbreviation.to_lowercase();
            if let Some(prev) = by_abbreviation.insert(abbr_key.clone(), i) {
                tracing::warn!(
                    key = %abbr_key,
                    replaced = %entries[prev].full_name,
                    by = %entry.full_name,
                    "duplicate abbreviation in reference table; later row wins"
                );
                stats.overwritten_abbreviations.push(abbr_key);
            }

            let name_key = entry.full_name.to_lowercase();
            if let Some(prev) = by_full_name.insert(name_key.clone(), i) {
                tracing::warn!(
                    key = %name_key,
                    replaced = %entries[prev].abbreviation,
                    by = %entry.abbreviation,
                    "duplicate full name in reference table; later row wins"
                );
                stats.overwritten_full_names.push(name_key);
            }
        }

        stats.abbreviation_keys = by_abbreviation.len();
        stats.full_name_keys = by_full_name.len();
        tracing::debug!(
            entries = entries.len(),
            abbreviation_keys = stats.abbreviation_keys,
            full_name_keys = stats.full_name_keys,
            "built reference index"
        );

        Self {
            entries,
            by_abbreviation,
            by_full_name,
            metadata: TableMetadata::default(),
            stats,
        }
    }

    /// Exact lookup by lowercased abbreviation.
    pub fn lookup_abbreviation(&self, key: &str) -> Option<&ReferenceEntry> {
        self.abbreviation_entry(key).map(|(_, entry)| entry)
    }

    /// Exact lookup by lowercased full name.
    pub fn lookup_full_name(&self, key: &str) -> Option<&ReferenceEntry> {
        self.full_name_entry(key).map(|(_, entry)| entry)
    }

    /// Exact lookup by lowercased abbreviation, returning the stored key too.
    pub fn abbreviation_entry(&self, key: &str) -> Option<(&str, &ReferenceEntry)> {
        self.by_abbreviation
            .get(key)
            .map(|slot| (slot.key.as_str(), &self.entries[slot.entry]))
    }

    /// Exact lookup by lowercased full name, returning the stored key too.
    pub fn full_name_entry(&self, key: &str) -> Option<(&str, &ReferenceEntry)> {
        self.by_full_name
            .get(key)
            .map(|slot| (slot.key.as_str(), &self.entries[slot.entry]))
    }

    /// Abbreviation keys in table order, with the entry each resolves to.
    pub fn abbreviation_keys(&self) -> impl Iterator<Item = (&str, &ReferenceEntry)> {
        self.by_abbreviation
            .slots
            .iter()
            .map(|slot| (slot.key.as_str(), &self.entries[slot.entry]))
    }

    /// Full-name keys in table order, with the entry each resolves to.
    pub fn full_name_keys(&self) -> impl Iterator<Item = (&str, &ReferenceEntry)> {
        self.by_full_name
            .slots
            .iter()
            .map(|slot| (slot.key.as_str(), &self.entries[slot.entry]))
    }

    /// Every validated row, in table order (including rows whose keys were
    /// later overwritten).
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }
}
