//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use drugline_drugbank::Strategy;
use serde::Deserialize;

/// File configuration for drugline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub ids: IdsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("drugbank.xml"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub strategy: Strategy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("targets.csv"),
            strategy: Strategy::PerTarget,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct IdsConfig {
    /// Prefix stripped from DrugBank IDs when present, e.g. "DB"
    pub strip_prefix: Option<String>,
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./drugline.toml (current directory)
    /// 2. ~/.config/drugline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("drugline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "drugline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
