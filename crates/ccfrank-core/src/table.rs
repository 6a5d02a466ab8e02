//! The static CCF reference table as stored on disk.
//!
//! The document has two collections, `conferences` and `journals`, each an
//! ordered list of `{abbr, fullName, rank, category}` rows, plus optional
//! `version` / `updateDate` metadata written by the table build tooling.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Rank, ReferenceEntry, VenueKind};

/// The table compiled into the crate.
const BUNDLED_TABLE: &str = include_str!("../data/ccf.json");

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed reference table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{collection}[{position}]: missing {field}")]
    MissingField {
        collection: &'static str,
        position: usize,
        field: &'static str,
    },
    #[error("{collection}[{position}]: invalid rank {value:?}")]
    InvalidRank {
        collection: &'static str,
        position: usize,
        value: String,
    },
}

/// How to treat malformed rows when turning the table into entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Reject the whole table on the first malformed row.
    #[default]
    Strict,
    /// Skip malformed rows with a warning.
    Lenient,
}

impl LoadMode {
    pub fn from_skip_malformed(skip: bool) -> Self {
        if skip { LoadMode::Lenient } else { LoadMode::Strict }
    }
}

/// One raw row of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default)]
    pub abbr: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub category: String,
}

impl TableRow {
    pub fn new(abbr: &str, full_name: &str, rank: &str, category: &str) -> Self {
        Self {
            abbr: abbr.to_string(),
            full_name: full_name.to_string(),
            rank: rank.to_string(),
            category: category.to_string(),
        }
    }
}

/// The deserialized reference document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_date: Option<String>,
    #[serde(default)]
    pub conferences: Vec<TableRow>,
    #[serde(default)]
    pub journals: Vec<TableRow>,
}

impl ReferenceTable {
    /// Parse a table from its JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, TableError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse a table file.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&content)?;
        tracing::info!(
            path = %path.display(),
            conferences = table.conferences.len(),
            journals = table.journals.len(),
            "loaded reference table"
        );
        Ok(table)
    }

    /// The table shipped with the crate.
    pub fn bundled() -> Result<Self, TableError> {
        Self::from_json_str(BUNDLED_TABLE)
    }

    /// Total number of raw rows across both collections.
    pub fn row_count(&self) -> usize {
        self.conferences.len() + self.journals.len()
    }

    /// Validate every row and convert it into a [`ReferenceEntry`].
    ///
    /// Conferences come first, then journals, each in document order. Key
    /// fields are trimmed; a row whose abbreviation or full name is empty,
    /// or whose rank is not A/B/C, is malformed.
    pub fn entries(&self, mode: LoadMode) -> Result<Vec<ReferenceEntry>, TableError> {
        let mut entries = Vec::with_capacity(self.row_count());
        let collections = [
            (VenueKind::Conference, &self.conferences),
            (VenueKind::Journal, &self.journals),
        ];

        for (kind, rows) in collections {
            for (position, row) in rows.iter().enumerate() {
                match validate_row(row, kind, position) {
                    Ok(entry) => entries.push(entry),
                    Err(err) if mode == LoadMode::Lenient => {
                        tracing::warn!(error = %err, "skipping malformed reference row");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(entries)
    }
}

fn validate_row(row: &TableRow, kind: VenueKind, position: usize) -> Result<ReferenceEntry, TableError> {
    let collection = kind.collection();
    let abbreviation = row.abbr.trim();
    if abbreviation.is_empty() {
        return Err(TableError::MissingField {
            collection,
            position,
            field: "abbr",
        });
    }
    let full_name = row.full_name.trim();
    if full_name.is_empty() {
        return Err(TableError::MissingField {
            collection,
            position,
            field: "fullName",
        });
    }
    let rank: Rank = row.rank.parse().map_err(|_| TableError::InvalidRank {
        collection,
        position,
        value: row.rank.clone(),
    })?;

    Ok(ReferenceEntry {
        abbreviation: abbreviation.to_string(),
        full_name: full_name.to_string(),
        rank,
        category: row.category.trim().to_string(),
        kind,
    })
}
