//! Configuration management for Tagline.
//!
//! Configuration is loaded from a TOML file with sensible defaults, then the
//! process environment is consulted once for the deployment overrides
//! (`caption_model_name`, `caption_model_type_name`, `total_captions_number`).
//! The resulting [`Config`] is immutable for the lifetime of the process.

mod env;
mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Tagline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Caption generation settings
    pub caption: CaptionConfig,

    /// Zero-shot scoring settings
    pub scoring: ScoringConfig,

    /// Tokenizer/filter settings
    pub text: TextConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Captioning backend endpoints
    pub llm: LlmConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides.
    ///
    /// Uses defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.tagline.tagline/config.toml
    /// - Linux: ~/.config/tagline/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\tagline\config\config.toml
    ///
    /// Falls back to ~/.tagline/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "tagline", "tagline")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".tagline").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Directory holding the configured zero-shot scoring model.
    pub fn scoring_model_dir(&self) -> PathBuf {
        self.model_dir().join(&self.scoring.model)
    }

    /// Resolved stop-word file path, if one is configured.
    pub fn stopwords_file(&self) -> Option<PathBuf> {
        self.text
            .stopwords_file
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
