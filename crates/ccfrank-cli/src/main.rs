use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ccfrank_bib::BibEntry;
use ccfrank_core::config_file::{self, ConfigFile, DisplayConfig, OverridesConfig, TableConfig};
use ccfrank_core::{
    Classifier, DEFAULT_PLACEHOLDER, Field, ItemId, LoadMode, Matcher, OverrideBackend,
    OverrideState, OverrideStore, Rank, ReferenceIndex, ReferenceTable, normalize,
};

mod output;

use output::{CheckRow, ColorMode, MatchRow};

/// CCF rank lookup - Resolve venue names and bibliography entries to CCF ranks
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Reference table JSON to use instead of the bundled one
    #[arg(long, global = true)]
    table: Option<PathBuf>,

    /// Skip malformed table rows instead of failing
    #[arg(long, global = true)]
    skip_malformed: bool,

    /// Path to the override store
    #[arg(long, global = true)]
    overrides: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match raw venue strings against the reference table
    Match {
        /// Venue strings, e.g. "CVPR 2024"
        #[arg(required = true)]
        venues: Vec<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the normalized form of venue strings
    Normalize {
        #[arg(required = true)]
        venues: Vec<String>,
    },

    /// Rank every entry of a .bib file, honoring overrides
    Check {
        /// Path to the .bib file
        file_path: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Set a manual rank for an item (clears its ignored flag)
    SetRank { id: ItemId, rank: Rank },

    /// Remove the manual rank of an item
    ClearRank { id: ItemId },

    /// Hide the rank of an item (clears its manual rank)
    Ignore { id: ItemId },

    /// Stop ignoring an item
    Unignore { id: ItemId },

    /// List stored overrides
    Overrides {
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the effective settings (files, env vars and flags) as TOML
    Config {
        /// Also write the effective settings to the platform config file
        #[arg(long)]
        save: bool,
    },

    /// Show reference table metadata and index statistics
    Table {
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

/// Settings after layering config files, env vars and CLI flags.
#[derive(Debug)]
struct Settings {
    table_path: Option<PathBuf>,
    load_mode: LoadMode,
    overrides_path: Option<PathBuf>,
    placeholder: String,
    color: bool,
}

impl Settings {
    /// Resolve configuration: CLI flags > env vars > config files > defaults
    fn resolve(cli: &Cli, config: &ConfigFile) -> Self {
        let table_path = cli
            .table
            .clone()
            .or_else(|| std::env::var("CCFRANK_TABLE").ok().map(PathBuf::from))
            .or_else(|| config.table_path());
        let overrides_path = cli
            .overrides
            .clone()
            .or_else(|| std::env::var("CCFRANK_OVERRIDES").ok().map(PathBuf::from))
            .or_else(|| config.overrides_path());

        Self {
            table_path,
            load_mode: LoadMode::from_skip_malformed(cli.skip_malformed || config.skip_malformed()),
            overrides_path,
            placeholder: config
                .placeholder()
                .unwrap_or(DEFAULT_PLACEHOLDER)
                .to_string(),
            color: config.color().unwrap_or(true),
        }
    }

    fn color_mode(&self, no_color: bool) -> ColorMode {
        ColorMode(self.color && !no_color)
    }

    fn table_source(&self) -> String {
        match &self.table_path {
            Some(path) => path.display().to_string(),
            None => "bundled".to_string(),
        }
    }

    fn load_index(&self) -> anyhow::Result<ReferenceIndex> {
        let table = match &self.table_path {
            Some(path) => ReferenceTable::load(path)
                .with_context(|| format!("Failed to load reference table {}", path.display()))?,
            None => ReferenceTable::bundled().context("Failed to load bundled reference table")?,
        };
        ReferenceIndex::build_with(&table, self.load_mode)
            .with_context(|| format!("Invalid reference table ({})", self.table_source()))
    }

    /// Store for the mutating commands; these need somewhere to write.
    fn open_overrides(&self) -> anyhow::Result<OverrideStore> {
        let path = self.overrides_path.as_ref().context(
            "Could not determine where to store overrides; pass --overrides or set CCFRANK_OVERRIDES",
        )?;
        Ok(OverrideStore::open_file(path))
    }

    /// Stored overrides for read-only commands. Without a path there is
    /// nothing stored, so this is empty rather than an error.
    fn read_overrides(&self) -> Vec<(ItemId, OverrideState)> {
        match &self.overrides_path {
            Some(path) => OverrideStore::open_file(path).iter().collect(),
            None => {
                tracing::warn!("no override store location; reading without overrides");
                Vec::new()
            }
        }
    }

    /// The resolved settings in config-file form, for `config` and `config --save`.
    fn to_config_file(&self) -> ConfigFile {
        ConfigFile {
            table: Some(TableConfig {
                path: self.table_path.as_ref().map(|p| p.display().to_string()),
                skip_malformed: Some(self.load_mode == LoadMode::Lenient),
            }),
            overrides: Some(OverridesConfig {
                path: self.overrides_path.as_ref().map(|p| p.display().to_string()),
            }),
            display: Some(DisplayConfig {
                placeholder: Some(self.placeholder.clone()),
                color: Some(self.color),
            }),
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config_file::load_config();
    let settings = Settings::resolve(&cli, &config);
    tracing::debug!(?settings, "resolved settings");

    let mut stdout = std::io::stdout();
    let w: &mut dyn Write = &mut stdout;

    match cli.command {
        Command::Match {
            venues,
            no_color,
            json,
        } => match_venues(w, &settings, &venues, settings.color_mode(no_color), json),
        Command::Normalize { venues } => {
            for venue in &venues {
                writeln!(w, "{}", normalize(venue))?;
            }
            Ok(())
        }
        Command::Check {
            file_path,
            no_color,
            json,
        } => check(w, &settings, &file_path, settings.color_mode(no_color), json),
        Command::SetRank { id, rank } => {
            settings.open_overrides()?.set_rank(id, rank);
            writeln!(w, "Item {} ranked {}", id, rank)?;
            Ok(())
        }
        Command::ClearRank { id } => {
            settings.open_overrides()?.clear_rank(id);
            writeln!(w, "Cleared manual rank of item {}", id)?;
            Ok(())
        }
        Command::Ignore { id } => {
            settings.open_overrides()?.ignore_item(id);
            writeln!(w, "Item {} ignored", id)?;
            Ok(())
        }
        Command::Unignore { id } => {
            settings.open_overrides()?.unignore_item(id);
            writeln!(w, "Item {} no longer ignored", id)?;
            Ok(())
        }
        Command::Overrides { no_color } => {
            let overrides = settings.read_overrides();
            output::print_overrides(w, &overrides, settings.color_mode(no_color))?;
            Ok(())
        }
        Command::Config { save } => {
            let effective = settings.to_config_file();
            write!(w, "{}", toml::to_string_pretty(&effective)?)?;
            if save {
                let path = config_file::save_config(&effective).map_err(|e| anyhow::anyhow!(e))?;
                eprintln!("Saved config to {}", path.display());
            }
            Ok(())
        }
        Command::Table { no_color } => {
            let index = settings.load_index()?;
            output::print_table_info(
                w,
                &settings.table_source(),
                &index,
                settings.color_mode(no_color),
            )?;
            Ok(())
        }
    }
}

fn match_venues(
    w: &mut dyn Write,
    settings: &Settings,
    venues: &[String],
    color: ColorMode,
    json: bool,
) -> anyhow::Result<()> {
    let index = settings.load_index()?;
    let matcher = Matcher::new(&index);

    let rows: Vec<MatchRow> = venues
        .iter()
        .map(|venue| {
            let found = matcher.explain(venue);
            MatchRow::new(venue, normalize(venue), found.as_ref())
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *w, &rows)?;
        writeln!(w)?;
    } else {
        for row in &rows {
            output::print_match(w, row, color)?;
        }
    }
    Ok(())
}

fn check(
    w: &mut dyn Write,
    settings: &Settings,
    file_path: &Path,
    color: ColorMode,
    json: bool,
) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let parsed = ccfrank_bib::parse_bib_file(file_path)
        .map_err(|e| anyhow::anyhow!("BIB extraction failed: {}", e))?;

    let index = settings.load_index()?;
    let matcher = Matcher::new(&index);
    let rows = match &settings.overrides_path {
        Some(path) => {
            let store = OverrideStore::open_file(path);
            check_rows(&parsed.entries, matcher, &store, &settings.placeholder)
        }
        None => {
            tracing::warn!("no override store location; ranking without overrides");
            let store = OverrideStore::in_memory();
            check_rows(&parsed.entries, matcher, &store, &settings.placeholder)
        }
    };

    if json {
        serde_json::to_writer_pretty(&mut *w, &rows)?;
        writeln!(w)?;
        return Ok(());
    }

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.display().to_string());

    output::print_check_report(w, &file_name, &rows, color)?;
    output::print_check_summary(w, &rows, parsed.skipped, color)?;
    Ok(())
}

fn check_rows<B: OverrideBackend>(
    entries: &[BibEntry],
    matcher: Matcher<'_>,
    store: &OverrideStore<B>,
    placeholder: &str,
) -> Vec<CheckRow> {
    let classifier = Classifier::new(matcher, store).with_placeholder(placeholder.to_string());
    entries
        .iter()
        .map(|entry| {
            let classification = classifier.classify(entry.id, entry);
            CheckRow::new(
                entry.id,
                &entry.key,
                entry.record.fields.get(&Field::Title).cloned(),
                &classification,
                classifier.rank_text(&classification),
                ccfrank_core::display::category_text(&classification),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["ccfrank", "set-rank", "12", "b"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::SetRank {
                id: 12,
                rank: Rank::B
            }
        ));

        let cli = Cli::try_parse_from(["ccfrank", "check", "refs.bib", "--json", "--table", "t.json"])
            .unwrap();
        assert_eq!(cli.table, Some(PathBuf::from("t.json")));
        assert!(matches!(cli.command, Command::Check { json: true, .. }));

        assert!(Cli::try_parse_from(["ccfrank", "set-rank", "12", "D"]).is_err());
        assert!(Cli::try_parse_from(["ccfrank", "match"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "ccfrank",
            "table",
            "--overrides",
            "/flag/overrides.json",
            "--skip-malformed",
        ])
        .unwrap();
        let config: ConfigFile = toml::from_str(
            "[overrides]\npath = \"/config/overrides.json\"\n[display]\nplaceholder = \"N/A\"\ncolor = false\n",
        )
        .unwrap();
        let settings = Settings::resolve(&cli, &config);
        assert_eq!(settings.overrides_path, Some(PathBuf::from("/flag/overrides.json")));
        assert_eq!(settings.load_mode, LoadMode::Lenient);
        assert_eq!(settings.placeholder, "N/A");
        assert!(!settings.color_mode(false).enabled());
    }

    #[test]
    fn test_check_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let bib = dir.path().join("refs.bib");
        std::fs::write(
            &bib,
            "@inproceedings{a, title={Paper}, booktitle={CVPR 2024}}\n@misc{b, title={Other}}\n",
        )
        .unwrap();

        let settings = Settings {
            table_path: None,
            load_mode: LoadMode::Strict,
            overrides_path: Some(dir.path().join("overrides.json")),
            placeholder: "-".into(),
            color: false,
        };
        let mut buf = Vec::new();
        check(&mut buf, &settings, &bib, ColorMode(false), true).unwrap();

        let rows: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(rows[0]["rank"], "A");
        assert_eq!(rows[0]["venue"], "CVPR");
        assert_eq!(rows[1]["rank"], "-");
        assert_eq!(rows[1]["source"], "unmatched");
    }

    #[test]
    fn test_check_without_override_location() {
        let dir = tempfile::tempdir().unwrap();
        let bib = dir.path().join("refs.bib");
        std::fs::write(&bib, "@inproceedings{a, title={Paper}, booktitle={CVPR 2024}}\n").unwrap();

        let settings = Settings {
            table_path: None,
            load_mode: LoadMode::Strict,
            overrides_path: None,
            placeholder: "-".into(),
            color: false,
        };
        let mut buf = Vec::new();
        check(&mut buf, &settings, &bib, ColorMode(false), true).unwrap();

        let rows: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(rows[0]["rank"], "A");
        assert_eq!(rows[0]["venue"], "CVPR");

        assert!(settings.read_overrides().is_empty());
        assert!(settings.open_overrides().is_err());
    }

    #[test]
    fn test_check_applies_stored_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let bib = dir.path().join("refs.bib");
        std::fs::write(
            &bib,
            "@inproceedings{a, title={Paper}, booktitle={CVPR 2024}}\n@misc{b, title={Other}}\n",
        )
        .unwrap();
        let overrides_path = dir.path().join("overrides.json");
        let mut store = OverrideStore::open_file(&overrides_path);
        store.set_rank(2, Rank::C);

        let settings = Settings {
            table_path: None,
            load_mode: LoadMode::Strict,
            overrides_path: Some(overrides_path),
            placeholder: "-".into(),
            color: false,
        };
        let mut buf = Vec::new();
        check(&mut buf, &settings, &bib, ColorMode(false), true).unwrap();

        let rows: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(rows[1]["rank"], "C");
        assert_eq!(settings.read_overrides(), vec![(2, OverrideState::Rank(Rank::C))]);
    }

    #[test]
    fn test_config_reflects_flags() {
        let cli = Cli::try_parse_from([
            "ccfrank",
            "config",
            "--table",
            "/flag/table.json",
            "--skip-malformed",
        ])
        .unwrap();
        let config: ConfigFile = toml::from_str(
            "[table]\npath = \"/config/table.json\"\n[overrides]\npath = \"/config/overrides.json\"\n",
        )
        .unwrap();
        let effective = Settings::resolve(&cli, &config).to_config_file();

        assert_eq!(effective.table_path(), Some(PathBuf::from("/flag/table.json")));
        assert!(effective.skip_malformed());
        assert_eq!(effective.placeholder(), Some(DEFAULT_PLACEHOLDER));

        let printed = toml::to_string_pretty(&effective).unwrap();
        assert!(printed.contains("/flag/table.json"), "{printed}");
        assert!(!printed.contains("/config/table.json"), "{printed}");
        assert!(printed.contains("skip_malformed = true"), "{printed}");
    }
}
