//! `.bib` files as a source of bibliographic records.
//!
//! Entries are read with the `biblatex` crate and exposed through
//! [`ccfrank_core::BibRecord`], so they can go straight into the venue
//! extractor and the rank classifier. Items are numbered from 1 in file
//! order; that number is the id used for manual overrides.

use std::path::Path;

use ccfrank_core::{BibRecord, Field, ItemId, ItemType, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BibError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no BibTeX entries found")]
    NoBibEntries,
}

/// One parsed `.bib` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub id: ItemId,
    /// Citation key, e.g. `doe2023`.
    pub key: String,
    /// Entry type as written, lowercased (`inproceedings`, `article`, ...).
    pub entry_type: String,
    pub record: Record,
}

impl BibRecord for BibEntry {
    fn item_type(&self) -> ItemType {
        self.record.item_type
    }

    fn field(&self, field: Field) -> Option<String> {
        self.record.field(field)
    }
}

/// Entries recovered from a `.bib` source.
#[derive(Debug, Clone, Default)]
pub struct BibFile {
    pub entries: Vec<BibEntry>,
    /// Chunks that failed to parse on the per-entry fallback path.
    pub skipped: usize,
}

/// Read and parse a `.bib` file.
pub fn parse_bib_file(path: &Path) -> Result<BibFile, BibError> {
    let content = std::fs::read_to_string(path)?;
    let parsed = parse_bib_str(&content)?;
    tracing::info!(
        path = %path.display(),
        entries = parsed.entries.len(),
        skipped = parsed.skipped,
        "parsed bibliography"
    );
    Ok(parsed)
}

/// Parse `.bib` content from a string.
pub fn parse_bib_str(content: &str) -> Result<BibFile, BibError> {
    // Try parsing the whole file first (fast path)
    match biblatex::Bibliography::parse(content) {
        Ok(bibliography) => {
            let entries: Vec<_> = bibliography.iter().collect();
            if entries.is_empty() {
                return Err(BibError::NoBibEntries);
            }
            Ok(BibFile {
                entries: convert_entries(&entries),
                skipped: 0,
            })
        }
        Err(e) => {
            // Real files often carry one bad entry (stray brace, raw text
            // between entries). Parse entry by entry and keep what works.
            tracing::debug!(error = ?e, "whole-file parse failed, parsing entries individually");
            parse_bib_entries_individually(content)
        }
    }
}

fn parse_bib_entries_individually(content: &str) -> Result<BibFile, BibError> {
    static ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^@([a-zA-Z]+)").unwrap());

    let starts: Vec<(usize, String)> = ENTRY_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), caps[1].to_lowercase()))
        })
        .collect();
    if starts.is_empty() {
        return Err(BibError::NoBibEntries);
    }

    let mut entries = Vec::new();
    let mut skipped = 0;
    // Ids stay aligned with what the whole-file parse would assign, so a
    // skipped chunk still consumes its position.
    let mut next_id: ItemId = 1;

    for (i, (start, kind)) in starts.iter().enumerate() {
        if is_non_entry(kind) {
            continue;
        }
        let end = starts.get(i + 1).map(|(s, _)| *s).unwrap_or(content.len());
        let chunk = &content[*start..end];

        match biblatex::Bibliography::parse(chunk) {
            Ok(bib) => {
                for entry in bib.iter() {
                    entries.push(convert_entry(next_id, entry));
                    next_id += 1;
                }
            }
            Err(e) => {
                let head = chunk.lines().next().unwrap_or_default();
                tracing::warn!(
                    entry = head,
                    id = next_id,
                    error = ?e,
                    "skipping unparseable .bib entry"
                );
                skipped += 1;
                next_id += 1;
            }
        }
    }

    if entries.is_empty() {
        return Err(BibError::NoBibEntries);
    }

    Ok(BibFile { entries, skipped })
}

/// `@string`, `@comment` and `@preamble` blocks are not bibliography items.
fn is_non_entry(kind: &str) -> bool {
    matches!(kind, "string" | "comment" | "preamble")
}

fn convert_entries(entries: &[&biblatex::Entry]) -> Vec<BibEntry> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| convert_entry(i as ItemId + 1, entry))
        .collect()
}

fn convert_entry(id: ItemId, entry: &biblatex::Entry) -> BibEntry {
    let entry_type = entry.entry_type.to_string().to_lowercase();
    let mut record = Record::new(item_type_for(&entry_type));

    let mapping: [(Field, &[&str]); 4] = [
        (Field::ProceedingsTitle, &["booktitle"]),
        (Field::PublicationTitle, &["journaltitle", "journal"]),
        (Field::ConferenceName, &["eventtitle"]),
        (Field::Title, &["title"]),
    ];
    for (field, names) in mapping {
        if let Some(value) = names.iter().find_map(|name| field_text(entry, name)) {
            record = record.with(field, value);
        }
    }

    BibEntry {
        id,
        key: entry.key.clone(),
        entry_type,
        record,
    }
}

/// Map a lowercased entry type to the record's item type.
fn item_type_for(entry_type: &str) -> ItemType {
    match entry_type {
        "inproceedings" | "conference" => ItemType::ConferencePaper,
        "article" => ItemType::JournalArticle,
        _ => ItemType::Other,
    }
}

fn field_text(entry: &biblatex::Entry, name: &str) -> Option<String> {
    let text = clean_field(&chunks_to_string(entry.get(name)?));
    if text.is_empty() { None } else { Some(text) }
}

/// Convert biblatex chunks to a plain string.
fn chunks_to_string(chunks: &[biblatex::Spanned<biblatex::Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            biblatex::Chunk::Normal(s) => s.as_str(),
            biblatex::Chunk::Verbatim(s) => s.as_str(),
            biblatex::Chunk::Math(s) => s.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Drop leftover LaTeX grouping and escapes that would defeat matching.
fn clean_field(text: &str) -> String {
    static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

    let result = text
        .replace("\\&", "&")
        .replace("\\_", "_")
        .replace('~', " ")
        .replace(['{', '}'], "");
    WS_RE.replace_all(&result, " ").trim().to_string()
}
