//! User configuration (`$XDG_CONFIG_HOME/pocketbook/config.toml`)
//!
//! ```toml
//! [database]
//! path = "/home/me/finance/pocketbook.db"
//!
//! [import]
//! skip_narration_keywords = ["opening balance", "closing balance"]
//! ```
//!
//! Every section is optional. `POCKETBOOK_DB` overrides `database.path`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::importers::RecordNormalizer;

pub const DB_ENV_VAR: &str = "POCKETBOOK_DB";
pub const CONFIG_ENV_VAR: &str = "POCKETBOOK_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSection,
    pub import: ImportSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    /// Rows whose narration contains one of these (case-insensitive) are
    /// dropped as summary rows
    pub skip_narration_keywords: Vec<String>,
}

impl Config {
    /// Load from `POCKETBOOK_CONFIG` or the XDG config dir; defaults when absent
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::parse(&text).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Database path from the environment or the config file. `None` means
    /// the default location.
    pub fn db_path(&self) -> Option<PathBuf> {
        std::env::var_os(DB_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.database.path.clone())
    }

    pub fn normalizer(&self) -> RecordNormalizer {
        RecordNormalizer::with_skip_keywords(&self.import.skip_narration_keywords)
    }
}

/// Location of the config file, if one can be determined
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dir_spec::config_home().map(|dir| dir.join("pocketbook").join("config.toml"))
}
