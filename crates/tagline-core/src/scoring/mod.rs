//! Zero-shot tag scoring.
//!
//! [`ZeroShotClassifier`] is the blocking model capability. [`TagScorer`]
//! adapts it to the pipeline: it materializes the tag set once, hands that
//! exact ordering to the classifier off the async runtime, and zips the
//! returned probabilities back onto the tags positionally.

pub mod clip;
pub mod preprocess;

pub use clip::ClipClassifier;

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::{ScoredTag, TagSet};

/// A model that distributes probability over candidate labels for an image.
///
/// `classify` is CPU-bound and is always invoked from a blocking thread.
pub trait ZeroShotClassifier: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// One probability per label, in label order, summing to ~1.
    fn classify(&self, image: &DynamicImage, labels: &[String]) -> Result<Vec<f32>, PipelineError>;
}

/// Pairs a [`TagSet`] with classifier probabilities.
pub struct TagScorer {
    classifier: Arc<dyn ZeroShotClassifier>,
    timeout: Duration,
}

impl TagScorer {
    pub fn new(classifier: Arc<dyn ZeroShotClassifier>, limits: &LimitsConfig) -> Self {
        Self {
            classifier,
            timeout: Duration::from_millis(limits.scoring_timeout_ms),
        }
    }

    /// Score every tag against `image`.
    ///
    /// The image is shared rather than copied into the blocking task.
    pub async fn score(
        &self,
        image: Arc<DynamicImage>,
        tags: TagSet,
    ) -> Result<Vec<ScoredTag>, PipelineError> {
        let labels = tags.into_ordered();
        if labels.is_empty() {
            return Err(PipelineError::Scoring {
                message: "Cannot score an empty tag set".to_string(),
            });
        }

        let classifier = Arc::clone(&self.classifier);
        let task = tokio::task::spawn_blocking(move || {
            let probs = classifier.classify(&image, &labels)?;
            pair_scores(labels, probs)
        });

        match timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Scoring {
                message: format!("Scoring task failed: {e}"),
            }),
            Err(_) => Err(PipelineError::Timeout {
                stage: "scoring".to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// Zip labels with their probabilities. The i-th probability belongs to the i-th label.
pub fn pair_scores(labels: Vec<String>, probs: Vec<f32>) -> Result<Vec<ScoredTag>, PipelineError> {
    if labels.len() != probs.len() {
        return Err(PipelineError::Scoring {
            message: format!(
                "Classifier returned {} scores for {} labels",
                probs.len(),
                labels.len()
            ),
        });
    }
    Ok(labels
        .into_iter()
        .zip(probs)
        .map(|(tag, prob)| ScoredTag::new(tag, prob))
        .collect())
}
