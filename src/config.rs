use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::query::PageSize;
use crate::recommend::Credential;

const APP_NAME: &str = "scopeforge";
const CONFIG_FILE: &str = "config.json";

pub const ENV_DB: &str = "SCOPEFORGE_DB";
pub const ENV_SUGGEST_URL: &str = "SCOPEFORGE_SUGGEST_URL";
pub const ENV_API_TOKEN: &str = "SCOPEFORGE_API_TOKEN";
pub const ENV_KNOWLEDGE_BASE: &str = "SCOPEFORGE_KNOWLEDGE_BASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file. Falls back to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Remote suggestion endpoint. Unset means static recommendations only.
    pub suggestion_url: Option<String>,
    pub suggestion_timeout_secs: u64,
    /// JSON knowledge base replacing the built-in table.
    pub knowledge_base_path: Option<PathBuf>,
    /// Zero means unbounded.
    pub default_page_size: usize,
    /// Only ever read from the environment, never written to disk.
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            suggestion_url: None,
            suggestion_timeout_secs: 20,
            knowledge_base_path: None,
            default_page_size: 25,
            api_token: None,
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides. Returns defaults if the file doesn't exist or
    /// fails to parse.
    pub fn load() -> Self {
        let config = match config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply overrides from a variable lookup. Blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(db) = get(ENV_DB) {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Some(url) = get(ENV_SUGGEST_URL) {
            self.suggestion_url = Some(url);
        }
        if let Some(kb) = get(ENV_KNOWLEDGE_BASE) {
            self.knowledge_base_path = Some(PathBuf::from(kb));
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        self
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn suggestion_timeout(&self) -> Duration {
        Duration::from_secs(self.suggestion_timeout_secs)
    }

    pub fn page_size(&self) -> PageSize {
        match self.default_page_size {
            0 => PageSize::Unbounded,
            n => PageSize::Limited(n),
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.api_token.as_deref().and_then(Credential::new)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}
