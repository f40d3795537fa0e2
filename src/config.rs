//! User configuration.
//!
//! Read from `<config dir>/questionnaire/config.json`, then overridden by
//! environment variables:
//! - `QUESTIONNAIRE_TREE` - tree source, a file path or `http(s)://` URL
//! - `QUESTIONNAIRE_DB` - path of the local storage database
//! - `QUESTIONNAIRE_CACHE_VERSION` - expected cache version tag

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::models::NodeId;
use crate::progress::TOTAL_STEPS;

const APP_NAME: &str = "questionnaire";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_TREE_SOURCE: &str = "data/tree.json";
pub const DEFAULT_ROOT_ID: &str = "q1";
/// Bump whenever the tree or the stored session format changes incompatibly.
pub const DEFAULT_CACHE_VERSION: &str = "2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the decision tree is fetched from.
    pub tree_source: String,
    /// Id of the first question.
    pub root_id: String,
    /// Stored sessions with any other version tag are discarded.
    pub cache_version: String,
    /// Denominator of the progress display.
    pub total_steps: u32,
    /// Local storage database. `None` uses the platform data directory.
    pub db_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tree_source: DEFAULT_TREE_SOURCE.to_string(),
            root_id: DEFAULT_ROOT_ID.to_string(),
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            total_steps: TOTAL_STEPS,
            db_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the user's config directory and the
    /// environment. Falls back to defaults if the file is missing or fails to
    /// parse.
    pub fn load() -> Self {
        let config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config file")
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(tree) = lookup("QUESTIONNAIRE_TREE") {
            self.tree_source = tree;
        }
        if let Some(db) = lookup("QUESTIONNAIRE_DB") {
            self.db_path = Some(PathBuf::from(db));
        }
        if let Some(version) = lookup("QUESTIONNAIRE_CACHE_VERSION") {
            self.cache_version = version;
        }
        self
    }

    pub fn root(&self) -> NodeId {
        NodeId::from(self.root_id.as_str())
    }

    /// Save the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
