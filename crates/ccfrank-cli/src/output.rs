use std::io::Write;

use ccfrank_core::{Classification, ItemId, OverrideState, ReferenceIndex, VenueMatch};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// One classified `.bib` entry, as printed by `check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRow {
    pub id: ItemId,
    pub key: String,
    pub title: Option<String>,
    /// Rank column text (empty when ignored, placeholder when unknown).
    pub rank: String,
    pub category: String,
    /// `ignored`, `manual`, `matched` or `unmatched`.
    pub source: &'static str,
    pub field: Option<&'static str>,
    pub strategy: Option<&'static str>,
    pub venue: Option<String>,
}

impl CheckRow {
    pub fn new(
        id: ItemId,
        key: &str,
        title: Option<String>,
        classification: &Classification<'_>,
        rank: String,
        category: String,
    ) -> Self {
        let (source, field, strategy, venue) = match classification {
            Classification::Ignored => ("ignored", None, None, None),
            Classification::Manual(_) => ("manual", None, None, None),
            Classification::Matched(m) => (
                "matched",
                Some(m.field.as_str()),
                Some(m.venue.strategy.as_str()),
                Some(m.venue.entry.abbreviation.clone()),
            ),
            Classification::Unmatched => ("unmatched", None, None, None),
        };
        Self {
            id,
            key: key.to_string(),
            title,
            rank,
            category,
            source,
            field,
            strategy,
            venue,
        }
    }
}

/// Result of matching one raw venue string, as printed by `match --json`.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRow {
    pub input: String,
    pub normalized: String,
    pub abbreviation: Option<String>,
    pub full_name: Option<String>,
    pub rank: Option<String>,
    pub category: Option<String>,
    pub kind: Option<String>,
    pub strategy: Option<&'static str>,
}

impl MatchRow {
    pub fn new(input: &str, normalized: String, found: Option<&VenueMatch<'_>>) -> Self {
        Self {
            input: input.to_string(),
            normalized,
            abbreviation: found.map(|m| m.entry.abbreviation.clone()),
            full_name: found.map(|m| m.entry.full_name.clone()),
            rank: found.map(|m| m.entry.rank.to_string()),
            category: found.map(|m| m.entry.category.clone()),
            kind: found.map(|m| m.entry.kind.to_string()),
            strategy: found.map(|m| m.strategy.as_str()),
        }
    }
}

/// Print one `match` result.
pub fn print_match(w: &mut dyn Write, row: &MatchRow, color: ColorMode) -> std::io::Result<()> {
    match (&row.abbreviation, &row.rank) {
        (Some(abbr), Some(rank)) => {
            let full_name = row.full_name.as_deref().unwrap_or_default();
            if color.enabled() {
                writeln!(w, "{} {} {}", rank_label(rank).green().bold(), abbr.bold(), full_name)?;
            } else {
                writeln!(w, "{} {} {}", rank_label(rank), abbr, full_name)?;
            }
            let detail = format!(
                "    {} | {} | {}",
                row.category.as_deref().unwrap_or_default(),
                row.kind.as_deref().unwrap_or_default(),
                row.strategy.unwrap_or_default()
            );
            if color.enabled() {
                writeln!(w, "{}", detail.dimmed())?;
            } else {
                writeln!(w, "{}", detail)?;
            }
        }
        _ => {
            let msg = format!("No match for \"{}\" (normalized: \"{}\")", row.input, row.normalized);
            if color.enabled() {
                writeln!(w, "{}", msg.yellow())?;
            } else {
                writeln!(w, "{}", msg)?;
            }
        }
    }
    Ok(())
}

/// Print the per-entry `check` report.
pub fn print_check_report(
    w: &mut dyn Write,
    file_name: &str,
    rows: &[CheckRow],
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Ranking {} entries from {}...", rows.len(), file_name)?;
    writeln!(w)?;

    for row in rows {
        let title = truncate(row.title.as_deref().unwrap_or(&row.key), 60);
        let rank = format!("{:>3}", row.rank);
        let prefix = format!("[{}]", row.id);

        if color.enabled() {
            let rank = match row.source {
                "matched" => rank.green().bold().to_string(),
                "manual" => rank.cyan().bold().to_string(),
                "unmatched" => rank.yellow().to_string(),
                _ => rank.dimmed().to_string(),
            };
            writeln!(w, "{} {} {}", prefix.dimmed(), rank, title)?;
        } else {
            writeln!(w, "{} {} {}", prefix, rank, title)?;
        }

        let detail = match row.source {
            "matched" => format!(
                "{} via {} ({}) | {}",
                row.venue.as_deref().unwrap_or_default(),
                row.field.unwrap_or_default(),
                row.strategy.unwrap_or_default(),
                row.category
            ),
            "manual" => "manual rank".to_string(),
            "ignored" => "ignored".to_string(),
            _ => "no venue match".to_string(),
        };
        if color.enabled() {
            writeln!(w, "      {}", detail.dimmed())?;
        } else {
            writeln!(w, "      {}", detail)?;
        }
    }
    Ok(())
}

/// Print the `check` summary counts.
pub fn print_check_summary(
    w: &mut dyn Write,
    rows: &[CheckRow],
    skipped: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    let count = |source: &str| rows.iter().filter(|r| r.source == source).count();
    let matched = count("matched");
    let manual = count("manual");
    let ignored = count("ignored");
    let unmatched = count("unmatched");

    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  Entries: {}", rows.len())?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Matched:".green(), matched)?;
        writeln!(w, "  {} {}", "Manual:".cyan(), manual)?;
        writeln!(w, "  {} {}", "Unmatched:".yellow(), unmatched)?;
    } else {
        writeln!(w, "  Matched: {}", matched)?;
        writeln!(w, "  Manual: {}", manual)?;
        writeln!(w, "  Unmatched: {}", unmatched)?;
    }
    if ignored > 0 {
        let msg = format!("Ignored: {}", ignored);
        if color.enabled() {
            writeln!(w, "  {}", msg.dimmed())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    if skipped > 0 {
        let msg = format!("Unparseable entries skipped: {}", skipped);
        if color.enabled() {
            writeln!(w, "  {}", msg.red())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print every stored override, ordered by item id.
pub fn print_overrides(
    w: &mut dyn Write,
    overrides: &[(ItemId, OverrideState)],
    color: ColorMode,
) -> std::io::Result<()> {
    if overrides.is_empty() {
        writeln!(w, "No overrides stored.")?;
        return Ok(());
    }
    for (id, state) in overrides {
        match state {
            OverrideState::Rank(rank) => {
                if color.enabled() {
                    writeln!(w, "{:>6}  {}", id, rank.cyan().bold())?;
                } else {
                    writeln!(w, "{:>6}  {}", id, rank)?;
                }
            }
            OverrideState::Ignored => {
                if color.enabled() {
                    writeln!(w, "{:>6}  {}", id, "ignored".dimmed())?;
                } else {
                    writeln!(w, "{:>6}  ignored", id)?;
                }
            }
        }
    }
    Ok(())
}

/// Print table metadata and index statistics.
pub fn print_table_info(
    w: &mut dyn Write,
    source: &str,
    index: &ReferenceIndex,
    color: ColorMode,
) -> std::io::Result<()> {
    let metadata = index.metadata();
    let stats = index.stats();

    writeln!(w, "Reference table: {}", source)?;
    writeln!(w, "  Version: {}", metadata.version.as_deref().unwrap_or("unknown"))?;
    writeln!(w, "  Updated: {}", metadata.update_date.as_deref().unwrap_or("unknown"))?;
    writeln!(w, "  Conferences: {}", stats.conferences)?;
    writeln!(w, "  Journals: {}", stats.journals)?;
    writeln!(w, "  Abbreviation keys: {}", stats.abbreviation_keys)?;
    writeln!(w, "  Full-name keys: {}", stats.full_name_keys)?;

    let overwritten: Vec<&str> = stats
        .overwritten_abbreviations
        .iter()
        .chain(&stats.overwritten_full_names)
        .map(String::as_str)
        .collect();
    if !overwritten.is_empty() {
        let msg = format!(
            "Duplicate keys (later row wins): {}",
            overwritten.join(", ")
        );
        if color.enabled() {
            writeln!(w, "  {}", msg.yellow())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    Ok(())
}

fn rank_label(rank: &str) -> String {
    format!("[{}]", rank)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}
