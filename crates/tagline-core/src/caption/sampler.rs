//! Best-caption and distinct-sample collection.
//!
//! `sample_captions` keeps invoking the captioner in sampled mode and discards
//! exact duplicates until the target count is reached. Without a ceiling this
//! loop never gives up, so a captioner with too little output diversity blocks
//! the request. `max_attempts` bounds it; once exhausted, whatever distinct
//! captions were collected are returned.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::config::{CaptionConfig, LimitsConfig};
use crate::error::PipelineError;
use crate::pipeline::DecodedImage;
use crate::types::{Caption, CaptionSet};

use super::Captioner;

/// Collects the caption material for one image.
pub struct CaptionSampler {
    captioner: Arc<dyn Captioner>,
    target_count: usize,
    max_attempts: Option<usize>,
    call_timeout: Duration,
}

impl CaptionSampler {
    pub fn new(
        captioner: Arc<dyn Captioner>,
        caption: &CaptionConfig,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            captioner,
            target_count: caption.total_captions,
            max_attempts: match caption.max_sample_attempts {
                0 => None,
                n => Some(n),
            },
            call_timeout: Duration::from_millis(limits.caption_timeout_ms),
        }
    }

    /// Configured number of distinct sampled captions.
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// The single greedy caption. Exactly one captioner call.
    pub async fn best_caption(&self, image: &DecodedImage) -> Result<Caption, PipelineError> {
        self.call(image, true).await
    }

    /// `target_count` pairwise-distinct sampled captions, in order of first appearance.
    ///
    /// Returns fewer only when the attempt ceiling is configured and exhausted.
    pub async fn sample_captions(
        &self,
        image: &DecodedImage,
        target_count: usize,
    ) -> Result<CaptionSet, PipelineError> {
        let mut captions = CaptionSet::new();
        let mut attempts = 0usize;

        while captions.len() < target_count {
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    tracing::warn!(
                        "Caption sampling stopped after {attempts} attempts with {}/{target_count} distinct captions",
                        captions.len()
                    );
                    break;
                }
            }
            attempts += 1;

            let caption = self.call(image, false).await?;
            if !captions.insert(caption) {
                tracing::trace!("Discarded duplicate sampled caption (attempt {attempts})");
            }
        }

        tracing::debug!(
            "Collected {} distinct captions in {attempts} attempts",
            captions.len()
        );
        Ok(captions)
    }

    async fn call(
        &self,
        image: &DecodedImage,
        deterministic: bool,
    ) -> Result<Caption, PipelineError> {
        match timeout(self.call_timeout, self.captioner.caption(image, deterministic)).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout {
                stage: "caption".to_string(),
                timeout_ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }
}
