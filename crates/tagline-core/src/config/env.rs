//! Environment overrides, read once at startup.

use crate::error::ConfigError;

use super::Config;

/// Captioning backend (`caption.provider`).
pub const CAPTION_MODEL_NAME: &str = "caption_model_name";
/// Model variant served by the backend (`caption.model`).
pub const CAPTION_MODEL_TYPE_NAME: &str = "caption_model_type_name";
/// Distinct sampled captions per image (`caption.total_captions`).
pub const TOTAL_CAPTIONS_NUMBER: &str = "total_captions_number";
/// Bind host (`server.host`).
pub const HOST: &str = "TAGLINE_HOST";
/// Bind port (`server.port`).
pub const PORT: &str = "TAGLINE_PORT";

impl Config {
    /// Apply overrides from the process environment.
    pub(crate) fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup(CAPTION_MODEL_NAME) {
            self.caption.provider = provider;
        }
        if let Some(model) = lookup(CAPTION_MODEL_TYPE_NAME) {
            self.caption.model = model;
        }
        if let Some(raw) = lookup(TOTAL_CAPTIONS_NUMBER) {
            self.caption.total_captions = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{TOTAL_CAPTIONS_NUMBER} must be a positive integer, got {raw:?}"
                ))
            })?;
        }
        if let Some(host) = lookup(HOST) {
            self.server.host = host;
        }
        if let Some(raw) = lookup(PORT) {
            self.server.port = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("{PORT} must be a port number, got {raw:?}"))
            })?;
        }
        Ok(())
    }
}
