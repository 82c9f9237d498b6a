use crate::index::selector::{DEFAULT_CACHE_CAPACITY, DEFAULT_INDEX_PATTERN};
use crate::index::types::IndexConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "mxi";
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured block size
pub const BLOCK_SIZE_ENV: &str = "MXI_BLOCK_SIZE";

/// Application configuration stored in the user's config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Block size for newly built indexes
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Number of opened indexes a directory selector keeps
    #[serde(default = "default_cache_capacity")]
    pub selector_cache_capacity: usize,

    /// File patterns a directory selector treats as saved indexes
    #[serde(default = "default_index_patterns")]
    pub index_patterns: Vec<String>,
}

fn default_block_size() -> usize {
    IndexConfig::default().block_size
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_index_patterns() -> Vec<String> {
    vec![DEFAULT_INDEX_PATTERN.to_string()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            selector_cache_capacity: default_cache_capacity(),
            index_patterns: default_index_patterns(),
        }
    }
}

impl AppConfig {
    /// Load config from the config directory, or defaults if there is none.
    /// `MXI_BLOCK_SIZE` overrides the stored block size.
    pub fn load() -> Result<Self> {
        let mut config = match get_config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_block_size_override(std::env::var(BLOCK_SIZE_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.index_config().validate()?;
        Ok(config)
    }

    /// Save config to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Build settings for new indexes
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig::with_block_size(self.block_size)
    }

    fn apply_block_size_override(&mut self, value: Option<&str>) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };
        let block_size: usize = value
            .trim()
            .parse()
            .with_context(|| format!("{BLOCK_SIZE_ENV} is not a number: {value:?}"))?;
        IndexConfig::with_block_size(block_size).validate()?;
        tracing::debug!(block_size, "block size overridden from environment");
        self.block_size = block_size;
        Ok(())
    }
}

/// Get the path to the config file, if the platform has a config directory
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME).join(CONFIG_FILE))
}
