use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "scrap";
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding [`Config::scrap_dir`].
pub const SCRAP_DIR_ENV: &str = "SCRAP_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Name of the scrap directory, relative to the working root.
    pub scrap_dir: String,
    /// Add the scrap directory to `.gitignore` when it is first used.
    pub update_gitignore: bool,
    /// Age in days used by `scrap clean` when `--older-than` is not given.
    pub default_clean_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrap_dir: ".scrap".to_string(),
            update_gitignore: true,
            default_clean_days: 30,
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides.
    /// Returns default config if file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let mut config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        if let Ok(dir) = std::env::var(SCRAP_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.scrap_dir = dir;
            }
        }
        config
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&config_path)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save the current configuration to the user's config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(config_path)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}
