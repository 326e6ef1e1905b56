//! Caption generation.
//!
//! [`Captioner`] is the capability the pipeline consumes: one caption per
//! call, either greedy (`deterministic = true`) or sampled. [`LlmCaptioner`]
//! implements it over a vision-LLM backend, and [`CaptionSampler`] turns it
//! into the best caption plus a set of distinct sampled captions.

mod ollama;
mod openai;
pub mod provider;
pub mod sampler;

pub use provider::{CaptionProvider, CaptionProviderFactory, CaptionRequest, ImageInput};
pub use sampler::CaptionSampler;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{CaptionConfig, LimitsConfig, LlmConfig};
use crate::error::PipelineError;
use crate::pipeline::DecodedImage;
use crate::types::Caption;

/// A model that describes an image in one sentence.
///
/// Implementations must be safe to call from concurrent requests.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Generate one caption. `deterministic` selects greedy decoding.
    async fn caption(
        &self,
        image: &DecodedImage,
        deterministic: bool,
    ) -> Result<Caption, PipelineError>;
}

/// [`Captioner`] backed by a vision-LLM provider.
pub struct LlmCaptioner {
    provider: Box<dyn CaptionProvider>,
    config: CaptionConfig,
}

impl LlmCaptioner {
    pub fn new(provider: Box<dyn CaptionProvider>, config: CaptionConfig) -> Self {
        Self { provider, config }
    }

    /// Build the configured provider, bounded by `limits.caption_timeout_ms`.
    pub fn from_config(
        caption: &CaptionConfig,
        llm: &LlmConfig,
        limits: &LimitsConfig,
    ) -> Result<Self, PipelineError> {
        let timeout = Duration::from_millis(limits.caption_timeout_ms);
        let provider = CaptionProviderFactory::create(caption, llm, timeout)?;
        tracing::info!(
            "Captioning with {} model {:?}",
            provider.name(),
            caption.model
        );
        Ok(Self::new(provider, caption.clone()))
    }
}

#[async_trait]
impl Captioner for LlmCaptioner {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn caption(
        &self,
        image: &DecodedImage,
        deterministic: bool,
    ) -> Result<Caption, PipelineError> {
        let input = ImageInput::from_decoded(image);
        let request = if deterministic {
            CaptionRequest::best(input, &self.config)
        } else {
            CaptionRequest::sampled(input, &self.config)
        };

        let response = self.provider.generate(&request).await?;
        tracing::trace!(
            "{} caption from {} in {}ms: {:?}",
            if deterministic { "best" } else { "sampled" },
            response.model,
            response.latency_ms,
            response.text
        );

        let caption = normalize_caption(&response.text);
        if caption.is_empty() {
            return Err(PipelineError::Caption {
                message: format!("{} returned an empty caption", self.provider.name()),
                status_code: None,
            });
        }
        Ok(caption)
    }
}

/// Reduce chat-style model output to a bare caption.
///
/// Keeps the first line, strips surrounding quotes and one trailing period,
/// so that sampled captions differing only in that framing compare equal.
pub fn normalize_caption(raw: &str) -> Caption {
    let line = raw.trim().lines().next().unwrap_or_default().trim();
    let unquoted = line
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(line)
        .trim();
    unquoted
        .strip_suffix('.')
        .unwrap_or(unquoted)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::provider::CaptionResponse;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records requests and replies with a fixed text.
    struct RecordingProvider {
        reply: String,
        seen: Arc<Mutex<Vec<(f32, Option<f32>)>>>,
    }

    #[async_trait]
    impl CaptionProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(
            &self,
            request: &CaptionRequest,
        ) -> Result<CaptionResponse, PipelineError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.temperature, request.top_p));
            Ok(CaptionResponse {
                text: self.reply.clone(),
                model: "test".to_string(),
                latency_ms: 0,
            })
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    fn decoded() -> DecodedImage {
        DecodedImage {
            image: DynamicImage::ImageRgb8(RgbImage::new(2, 2)),
            format: ImageFormat::Png,
            width: 2,
            height: 2,
            byte_len: 0,
            encoded: String::new(),
        }
    }

    #[test]
    fn test_normalize_caption() {
        assert_eq!(normalize_caption("a dog on a beach."), "a dog on a beach");
        assert_eq!(normalize_caption("  \"a dog\"  "), "a dog");
        assert_eq!(normalize_caption("a dog\nSecond line"), "a dog");
        assert_eq!(normalize_caption("Mr. Smith"), "Mr. Smith");
        assert_eq!(normalize_caption("   "), "");
    }

    #[tokio::test]
    async fn test_deterministic_flag_selects_request_mode() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = RecordingProvider {
            reply: "A cat on a sofa.".to_string(),
            seen: seen.clone(),
        };
        let config = CaptionConfig::default();
        let captioner = LlmCaptioner::new(Box::new(provider), config.clone());

        let best = captioner.caption(&decoded(), true).await.unwrap();
        let sampled = captioner.caption(&decoded(), false).await.unwrap();
        assert_eq!(best, "A cat on a sofa");
        assert_eq!(sampled, "A cat on a sofa");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (0.0, None));
        assert_eq!(seen[1], (config.sample_temperature, Some(config.top_p)));
    }

    #[test]
    fn test_from_config_applies_caption_timeout() {
        let limits = LimitsConfig {
            caption_timeout_ms: 300_000,
            ..Default::default()
        };
        let captioner =
            LlmCaptioner::from_config(&CaptionConfig::default(), &LlmConfig::default(), &limits)
                .unwrap();
        assert_eq!(captioner.provider.timeout(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_empty_generation_is_error() {
        let provider = RecordingProvider {
            reply: " \n".to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let captioner = LlmCaptioner::new(Box::new(provider), CaptionConfig::default());

        let err = captioner.caption(&decoded(), true).await.unwrap_err();
        assert!(!err.is_client_fault());
        assert!(err.to_string().contains("empty caption"));
    }
}
