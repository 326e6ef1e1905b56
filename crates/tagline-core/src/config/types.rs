//! Sub-configuration structs with service defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where the scoring models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.tagline/models"),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Allow cross-origin requests from any origin
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
            cors: true,
        }
    }
}

/// Caption generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Captioning backend ("ollama" or "openai")
    pub provider: String,

    /// Model variant served by the backend
    pub model: String,

    /// Number of distinct sampled captions to collect per image
    pub total_captions: usize,

    /// Ceiling on stochastic caption calls per request.
    /// 0 keeps sampling until `total_captions` distinct captions exist.
    pub max_sample_attempts: usize,

    /// Temperature used for sampled captions
    pub sample_temperature: f32,

    /// Nucleus sampling mass used for sampled captions
    pub top_p: f32,

    /// Maximum tokens per caption
    pub max_tokens: u32,

    /// Instruction sent alongside the image
    pub prompt: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llava".to_string(),
            total_captions: 5,
            max_sample_attempts: 0,
            sample_temperature: 1.0,
            top_p: 0.9,
            max_tokens: 40,
            prompt: "Write a short, plain caption of this image in one sentence, \
                     like \"a dog running on the beach\"."
                .to_string(),
        }
    }
}

/// Zero-shot scoring model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Square input size of the vision encoder
    pub image_size: u32,

    /// Multiplier applied to cosine similarities before softmax
    pub logit_scale: f32,

    /// Token length the text encoder was exported with
    pub max_text_length: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model: "clip-vit-large-patch14".to_string(),
            image_size: 224,
            logit_scale: 100.0,
            max_text_length: 77,
        }
    }
}

/// Tokenizer/filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Stop-word language
    pub language: String,

    /// Optional newline-delimited stop-word file replacing the built-in list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopwords_file: Option<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            language: "english".to_string(),
            stopwords_file: None,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request payload in megabytes
    pub max_payload_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Per-caption call timeout in milliseconds
    pub caption_timeout_ms: u64,

    /// Scoring timeout in milliseconds
    pub scoring_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_mb: 20,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            caption_timeout_ms: 120_000,
            scoring_timeout_ms: 60_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Captioning backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama (local) configuration
    pub ollama: Option<OllamaConfig>,

    /// OpenAI-compatible configuration
    pub openai: Option<OpenAiConfig>,
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
        }
    }
}

/// OpenAI-compatible Chat Completions configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Full Chat Completions URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
        }
    }
}
