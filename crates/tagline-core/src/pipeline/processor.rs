//! Pipeline orchestration: request body in, tag report out.

use std::sync::Arc;
use std::time::Instant;

use crate::caption::{CaptionSampler, Captioner, LlmCaptioner};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::scoring::{ClipClassifier, TagScorer, ZeroShotClassifier};
use crate::tagging::TagExtractor;
use crate::text::StopWords;
use crate::types::TagReport;

use super::decode::{DecodedImage, ImageDecoder};

/// JSON key carrying the base64 image.
const IMAGE_FIELD: &str = "image";

/// Wires decoding, captioning, extraction and scoring for one request.
///
/// Holds no per-request state; a single instance serves concurrent requests.
pub struct TaggingPipeline {
    decoder: ImageDecoder,
    sampler: CaptionSampler,
    extractor: TagExtractor,
    scorer: TagScorer,
}

impl TaggingPipeline {
    pub fn new(
        captioner: Arc<dyn Captioner>,
        classifier: Arc<dyn ZeroShotClassifier>,
        stopwords: StopWords,
        config: &Config,
    ) -> Self {
        tracing::debug!(
            "Pipeline: captioner={}, classifier={}, {} stop-words, {} captions per image",
            captioner.name(),
            classifier.name(),
            stopwords.len(),
            config.caption.total_captions
        );
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            sampler: CaptionSampler::new(captioner, &config.caption, &config.limits),
            extractor: TagExtractor::new(stopwords),
            scorer: TagScorer::new(classifier, &config.limits),
        }
    }

    /// Load the production capabilities named by `config` and build a pipeline.
    ///
    /// Fails if the stop-word list or the scoring model cannot be loaded.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let stopwords = match config.stopwords_file() {
            Some(path) => StopWords::from_file(&path)?,
            None => StopWords::for_language(&config.text.language)?,
        };
        let classifier = ClipClassifier::load(&config.scoring_model_dir(), &config.scoring)?;
        let captioner = LlmCaptioner::from_config(&config.caption, &config.llm, &config.limits)?;

        Ok(Self::new(
            Arc::new(captioner),
            Arc::new(classifier),
            stopwords,
            config,
        ))
    }

    /// Handle a raw request body: a JSON object with a base64 `image` string.
    pub async fn handle_json(&self, body: &[u8]) -> PipelineResult<TagReport> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| PipelineError::InvalidPayload {
                message: e.to_string(),
            })?;

        // Only an object is a request; unknown keys are ignored.
        let serde_json::Value::Object(mut request) = value else {
            return Err(PipelineError::InvalidPayload {
                message: "request body must be a JSON object".to_string(),
            });
        };

        let encoded = match request.remove(IMAGE_FIELD) {
            Some(serde_json::Value::String(s)) => s,
            Some(_) => {
                return Err(PipelineError::InvalidPayload {
                    message: format!("\"{IMAGE_FIELD}\" must be a base64 string"),
                })
            }
            None => {
                return Err(PipelineError::MissingField {
                    field: IMAGE_FIELD.to_string(),
                })
            }
        };

        let start = Instant::now();
        let decoded = self.decoder.decode_base64(&encoded).await?;
        tracing::debug!(
            "Decoded {}x{} {:?} ({} bytes) in {:?}",
            decoded.width,
            decoded.height,
            decoded.format,
            decoded.byte_len,
            start.elapsed()
        );

        self.process_image(decoded).await
    }

    /// Caption, extract and score an already-decoded image.
    pub async fn process_image(&self, decoded: DecodedImage) -> PipelineResult<TagReport> {
        let start = Instant::now();

        let best = self.sampler.best_caption(&decoded).await?;
        let sampled = self
            .sampler
            .sample_captions(&decoded, self.sampler.target_count())
            .await?;
        let caption_time = start.elapsed();
        tracing::debug!(
            "Captioning: best + {} sampled in {:?}",
            sampled.len(),
            caption_time
        );

        let mut english_cap = sampled.into_vec();
        english_cap.push(best.clone());

        let tags = self.extractor.extract(&english_cap);
        tracing::trace!("Extracted {} candidate tags", tags.len());

        let scored = if tags.is_empty() {
            tracing::debug!("No candidate tags left after filtering, skipping scoring");
            Vec::new()
        } else {
            let scoring_start = Instant::now();
            let image = Arc::new(decoded.image);
            let scored = self.scorer.score(image, tags).await?;
            tracing::debug!(
                "Scoring: {} tags in {:?}",
                scored.len(),
                scoring_start.elapsed()
            );
            scored
        };

        tracing::debug!("Tagged image in {:?}", start.elapsed());

        Ok(TagReport {
            tags: scored,
            captions: vec![best],
            english_cap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::tests::red_pixel_png;
    use crate::types::Caption;
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Greedy calls return `best`; sampled calls walk `pool` in order.
    struct MockCaptioner {
        best: String,
        pool: Vec<String>,
        calls: AtomicU32,
    }

    impl MockCaptioner {
        fn new(best: &str, pool: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                best: best.to_string(),
                pool: pool.iter().map(|s| s.to_string()).collect(),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Captioner for MockCaptioner {
        fn name(&self) -> &str {
            "mock"
        }

        async fn caption(
            &self,
            _image: &DecodedImage,
            deterministic: bool,
        ) -> Result<Caption, PipelineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            if deterministic {
                return Ok(self.best.clone());
            }
            Ok(self.pool[(n - 1) % self.pool.len()].clone())
        }
    }

    /// Uniform distribution over labels; counts invocations.
    struct UniformClassifier {
        calls: AtomicU32,
    }

    impl UniformClassifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
            })
        }
    }

    impl ZeroShotClassifier for UniformClassifier {
        fn name(&self) -> &str {
            "uniform"
        }

        fn classify(&self, _: &DynamicImage, labels: &[String]) -> Result<Vec<f32>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0 / labels.len() as f32; labels.len()])
        }
    }

    fn config(total_captions: usize) -> Config {
        let mut config = Config::default();
        config.caption.total_captions = total_captions;
        config
    }

    fn pipeline(
        captioner: Arc<MockCaptioner>,
        classifier: Arc<UniformClassifier>,
        total_captions: usize,
    ) -> TaggingPipeline {
        TaggingPipeline::new(
            captioner,
            classifier,
            StopWords::for_language("english").unwrap(),
            &config(total_captions),
        )
    }

    fn body(image: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({ "image": image })).unwrap()
    }

    #[tokio::test]
    async fn test_red_pixel_report() {
        let captioner = MockCaptioner::new(
            "a red square",
            &["red square", "a red block", "red square", "a red tile"],
        );
        let classifier = UniformClassifier::new();
        let pipeline = pipeline(captioner.clone(), classifier.clone(), 3);

        let report = pipeline.handle_json(&body(&red_pixel_png())).await.unwrap();

        assert_eq!(report.captions, vec!["a red square"]);
        assert_eq!(
            report.english_cap,
            vec!["red square", "a red block", "a red tile", "a red square"]
        );
        let tags: Vec<&str> = report.tags.iter().map(|t| t.tag()).collect();
        assert_eq!(tags, vec!["block", "red", "square", "tile"]);

        let total: f32 = report.tags.iter().map(|t| t.score()).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        // 1 best + 4 sampled (one duplicate discarded)
        assert_eq!(captioner.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_tags_are_never_stopwords() {
        let captioner = MockCaptioner::new("the dog is on the sofa", &["a dog and a cat"]);
        let pipeline = pipeline(captioner, UniformClassifier::new(), 1);

        let report = pipeline.handle_json(&body(&red_pixel_png())).await.unwrap();
        let stopwords = StopWords::for_language("english").unwrap();
        assert!(!report.tags.is_empty());
        assert!(report.tags.iter().all(|t| !stopwords.contains(t.tag())));
    }

    #[tokio::test]
    async fn test_all_stopword_captions_skip_scoring() {
        let captioner = MockCaptioner::new("it is", &["there is", "it was"]);
        let classifier = UniformClassifier::new();
        let pipeline = pipeline(captioner, classifier.clone(), 2);

        let report = pipeline.handle_json(&body(&red_pixel_png())).await.unwrap();
        assert!(report.tags.is_empty());
        assert_eq!(report.english_cap.len(), 3);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_image_key() {
        let captioner = MockCaptioner::new("a", &["b"]);
        let pipeline = pipeline(captioner.clone(), UniformClassifier::new(), 1);

        let err = pipeline.handle_json(br#"{"picture": "abc"}"#).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingField { .. }));
        assert!(err.to_string().contains("image"));
        assert_eq!(captioner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_object_body() {
        let pipeline = pipeline(MockCaptioner::new("a", &["b"]), UniformClassifier::new(), 1);
        for raw in [&b"not json"[..], &b"[1, 2]"[..], &b"{\"image\": 42}"[..]] {
            let err = pipeline.handle_json(raw).await.unwrap_err();
            assert!(err.is_client_fault(), "{raw:?} gave {err}");
        }
    }

    #[tokio::test]
    async fn test_array_body_is_rejected() {
        let captioner = MockCaptioner::new("a", &["b"]);
        let pipeline = pipeline(captioner.clone(), UniformClassifier::new(), 1);

        let png = red_pixel_png();
        let as_array = serde_json::to_vec(&serde_json::json!([png])).unwrap();
        for raw in [&as_array[..], &b"[]"[..], &b"\"abc\""[..], &b"null"[..]] {
            let err = pipeline.handle_json(raw).await.unwrap_err();
            assert!(
                matches!(err, PipelineError::InvalidPayload { .. }),
                "{raw:?} gave {err}"
            );
        }
        assert_eq!(captioner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_base64_makes_no_model_calls() {
        let captioner = MockCaptioner::new("a", &["b"]);
        let classifier = UniformClassifier::new();
        let pipeline = pipeline(captioner.clone(), classifier.clone(), 1);

        let err = pipeline
            .handle_json(&body("not-valid-base64!!"))
            .await
            .unwrap_err();
        assert!(err.is_client_fault());
        assert_eq!(captioner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_report_json_shape() {
        let captioner = MockCaptioner::new("a dog", &["dog"]);
        let pipeline = pipeline(captioner, UniformClassifier::new(), 1);

        let report = pipeline.handle_json(&body(&red_pixel_png())).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tags"][0][0], "dog");
        assert_eq!(json["tags"][0][1], 1.0);
        assert_eq!(json["captions"], serde_json::json!(["a dog"]));
        assert_eq!(json["english_cap"], serde_json::json!(["dog", "a dog"]));
    }
}
