//! Error types for the Tagline caption-to-tag pipeline.
//!
//! Errors are organized by stage. Every [`PipelineError`] is either a client
//! fault (the request was malformed and the service stays healthy) or a server
//! fault (a model capability failed and the request is terminated).

use thiserror::Error;

/// Top-level error type for Tagline operations.
#[derive(Error, Debug)]
pub enum TaglineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Request pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required field is absent from the request payload
    #[error("The JSON data must have {field} as a key with the base64 encoding")]
    MissingField { field: String },

    /// The request body is not the expected JSON shape
    #[error("Invalid request body: {message}")]
    InvalidPayload { message: String },

    /// The image field is not valid base64
    #[error("Could not decode image: invalid base64 ({message})")]
    Base64 { message: String },

    /// Raster decoding failed
    #[error("Could not open image: {message}")]
    Decode { message: String },

    /// The bytes are not a recognised image format
    #[error("Could not open image: unsupported format")]
    UnsupportedFormat,

    /// Image dimensions exceed limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Decoded payload exceeds size limit
    #[error("Image payload too large: {size_mb}MB > {max_mb}MB")]
    PayloadTooLarge { size_mb: u64, max_mb: u64 },

    /// Captioning capability failed
    #[error("Caption error: {message}")]
    Caption {
        message: String,
        status_code: Option<u16>,
    },

    /// Model loading or inference failed
    #[error("Model error: {message}")]
    Model { message: String },

    /// Zero-shot scoring failed or produced an unusable result
    #[error("Scoring error: {message}")]
    Scoring { message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

impl PipelineError {
    /// Whether this failure was caused by the request rather than the service.
    ///
    /// Client faults are answered with a 400; everything else propagates as a
    /// server fault.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingField { .. }
                | PipelineError::InvalidPayload { .. }
                | PipelineError::Base64 { .. }
                | PipelineError::Decode { .. }
                | PipelineError::UnsupportedFormat
                | PipelineError::ImageTooLarge { .. }
                | PipelineError::PayloadTooLarge { .. }
        )
    }
}

/// Convenience type alias for Tagline results.
pub type Result<T> = std::result::Result<T, TaglineError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message_names_field() {
        let err = PipelineError::MissingField {
            field: "image".to_string(),
        };
        assert!(err.to_string().contains("image"));
        assert!(err.is_client_fault());
    }

    #[test]
    fn test_decode_failures_are_client_faults() {
        assert!(PipelineError::Base64 {
            message: "bad".into()
        }
        .is_client_fault());
        assert!(PipelineError::Decode {
            message: "bad".into()
        }
        .is_client_fault());
        assert!(PipelineError::UnsupportedFormat.is_client_fault());
    }

    #[test]
    fn test_model_failures_are_server_faults() {
        let caption = PipelineError::Caption {
            message: "connection refused".into(),
            status_code: None,
        };
        let scoring = PipelineError::Scoring {
            message: "length mismatch".into(),
        };
        let timeout = PipelineError::Timeout {
            stage: "caption".into(),
            timeout_ms: 1000,
        };
        assert!(!caption.is_client_fault());
        assert!(!scoring.is_client_fault());
        assert!(!timeout.is_client_fault());
    }
}
