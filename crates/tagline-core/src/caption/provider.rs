//! Vision-LLM provider trait and request/response types.
//!
//! Defines the interface every captioning backend implements, plus the
//! factory that creates the right backend from the caption configuration.

use crate::config::{CaptionConfig, LlmConfig};
use crate::error::PipelineError;
use crate::pipeline::DecodedImage;
use async_trait::async_trait;
use image::ImageFormat;
use std::time::Duration;

/// Base64-encoded image ready to send to a vision model API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Reuse the transport encoding of a decoded request image.
    pub fn from_decoded(image: &DecodedImage) -> Self {
        Self {
            data: image.encoded.clone(),
            media_type: media_type_for(image.format).to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

fn media_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        other => {
            tracing::warn!("No MIME type for {other:?}, defaulting to image/png");
            "image/png"
        }
    }
}

/// A single caption generation request.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    /// The image to caption
    pub image: ImageInput,
    /// Text prompt for the model
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature (0 = greedy decoding)
    pub temperature: f32,
    /// Nucleus sampling mass, only set for sampled captions
    pub top_p: Option<f32>,
}

impl CaptionRequest {
    /// Greedy request producing the single most likely caption.
    pub fn best(image: ImageInput, config: &CaptionConfig) -> Self {
        Self {
            image,
            prompt: config.prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: 0.0,
            top_p: None,
        }
    }

    /// Nucleus-sampled request producing a varied caption per call.
    pub fn sampled(image: ImageInput, config: &CaptionConfig) -> Self {
        Self {
            image,
            prompt: config.prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.sample_temperature,
            top_p: Some(config.top_p),
        }
    }
}

/// The response from a caption generation call.
#[derive(Debug, Clone)]
pub struct CaptionResponse {
    /// Generated caption text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all captioning backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn CaptionProvider>` for dynamic dispatch).
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Provider name for logging (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Generate a caption for the given request.
    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Map a transport error, reporting client-side timeouts as such.
pub(crate) fn request_error(
    backend: &str,
    timeout: Duration,
    e: reqwest::Error,
) -> PipelineError {
    if e.is_timeout() {
        PipelineError::Timeout {
            stage: "caption".to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        PipelineError::Caption {
            message: format!("{backend} request failed: {e}"),
            status_code: None,
        }
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the configured captioning backend.
pub struct CaptionProviderFactory;

impl CaptionProviderFactory {
    /// Create a provider from `caption.provider` / `caption.model`.
    ///
    /// `timeout` bounds each HTTP request.
    pub fn create(
        caption: &CaptionConfig,
        llm: &LlmConfig,
        timeout: Duration,
    ) -> Result<Box<dyn CaptionProvider>, PipelineError> {
        match caption.provider.as_str() {
            "ollama" => {
                let cfg = llm.ollama.clone().unwrap_or_default();
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &cfg.endpoint,
                    &caption.model,
                    timeout,
                )))
            }
            "openai" => {
                let cfg = llm.openai.clone().unwrap_or_default();
                let api_key =
                    resolve_env_var(&cfg.api_key).ok_or_else(|| PipelineError::Caption {
                        message: "OpenAI API key not set. Set OPENAI_API_KEY env var."
                            .to_string(),
                        status_code: None,
                    })?;
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &caption.model,
                    timeout,
                )))
            }
            other => Err(PipelineError::Caption {
                message: format!("Unknown caption provider: {other}"),
                status_code: None,
            }),
        }
    }
}
