use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub table: Option<TableConfig>,
    pub overrides: Option<OverridesConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Reference table JSON replacing the bundled one.
    pub path: Option<String>,
    /// Skip malformed rows instead of failing the load.
    pub skip_malformed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverridesConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub placeholder: Option<String>,
    pub color: Option<bool>,
}

impl ConfigFile {
    pub fn table_path(&self) -> Option<PathBuf> {
        self.table
            .as_ref()
            .and_then(|t| t.path.as_deref())
            .map(PathBuf::from)
    }

    pub fn skip_malformed(&self) -> bool {
        self.table
            .as_ref()
            .and_then(|t| t.skip_malformed)
            .unwrap_or(false)
    }

    /// Configured override file, or the platform default.
    pub fn overrides_path(&self) -> Option<PathBuf> {
        self.overrides
            .as_ref()
            .and_then(|o| o.path.as_deref())
            .map(PathBuf::from)
            .or_else(default_overrides_path)
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.display.as_ref().and_then(|d| d.placeholder.as_deref())
    }

    pub fn color(&self) -> Option<bool> {
        self.display.as_ref().and_then(|d| d.color)
    }
}

/// Platform config directory path: `<config_dir>/ccfrank/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ccfrank").join("config.toml"))
}

/// Default override file: `<data_dir>/ccfrank/overrides.json`.
pub fn default_overrides_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("ccfrank").join("overrides.json"))
}

/// Load config by cascading CWD `.ccfrank.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".ccfrank.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config");
            Some(config)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        table: Some(TableConfig {
            path: overlay
                .table
                .as_ref()
                .and_then(|t| t.path.clone())
                .or_else(|| base.table.as_ref().and_then(|t| t.path.clone())),
            skip_malformed: overlay
                .table
                .as_ref()
                .and_then(|t| t.skip_malformed)
                .or_else(|| base.table.as_ref().and_then(|t| t.skip_malformed)),
        }),
        overrides: Some(OverridesConfig {
            path: overlay
                .overrides
                .as_ref()
                .and_then(|o| o.path.clone())
                .or_else(|| base.overrides.as_ref().and_then(|o| o.path.clone())),
        }),
        display: Some(DisplayConfig {
            placeholder: overlay
                .display
                .as_ref()
                .and_then(|d| d.placeholder.clone())
                .or_else(|| base.display.as_ref().and_then(|d| d.placeholder.clone())),
            color: overlay
                .display
                .as_ref()
                .and_then(|d| d.color)
                .or_else(|| base.display.as_ref().and_then(|d| d.color)),
        }),
    }
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
