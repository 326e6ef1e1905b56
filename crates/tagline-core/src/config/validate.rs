//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::text::StopWords;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.caption.total_captions == 0 {
            return Err(ConfigError::ValidationError(
                "caption.total_captions must be > 0".into(),
            ));
        }
        if self.caption.max_sample_attempts != 0
            && self.caption.max_sample_attempts < self.caption.total_captions
        {
            return Err(ConfigError::ValidationError(
                "caption.max_sample_attempts must be 0 (unbounded) or >= caption.total_captions"
                    .into(),
            ));
        }
        if self.caption.sample_temperature < 0.0 {
            return Err(ConfigError::ValidationError(
                "caption.sample_temperature must be >= 0.0".into(),
            ));
        }
        if self.caption.top_p <= 0.0 || self.caption.top_p > 1.0 {
            return Err(ConfigError::ValidationError(
                "caption.top_p must be in (0.0, 1.0]".into(),
            ));
        }
        if self.caption.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "caption.max_tokens must be > 0".into(),
            ));
        }
        if self.scoring.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "scoring.image_size must be > 0".into(),
            ));
        }
        if self.scoring.max_text_length == 0 {
            return Err(ConfigError::ValidationError(
                "scoring.max_text_length must be > 0".into(),
            ));
        }
        if self.scoring.logit_scale <= 0.0 {
            return Err(ConfigError::ValidationError(
                "scoring.logit_scale must be > 0.0".into(),
            ));
        }
        if self.limits.max_payload_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_payload_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.caption_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.caption_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.scoring_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.scoring_timeout_ms must be > 0".into(),
            ));
        }
        if self.text.stopwords_file.is_none() && !StopWords::is_supported(&self.text.language) {
            return Err(ConfigError::ValidationError(format!(
                "text.language {:?} has no built-in stop-word list",
                self.text.language
            )));
        }
        Ok(())
    }
}
