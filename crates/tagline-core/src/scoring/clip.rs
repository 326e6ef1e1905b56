//! CLIP ONNX zero-shot classifier.
//!
//! Loads the CLIP vision and text encoders exported to ONNX plus the
//! tokenizer, embeds the image and every label into the shared space, and
//! turns scaled cosine similarities into a softmax distribution over labels.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;

use crate::config::ScoringConfig;
use crate::error::PipelineError;
use crate::math::{dot, l2_normalize, l2_normalize_in_place, softmax};

use super::preprocess::preprocess;
use super::ZeroShotClassifier;

const VISION_MODEL: &str = "vision_model.onnx";
const TEXT_MODEL: &str = "text_model.onnx";
const TOKENIZER: &str = "tokenizer.json";

/// CLIP-backed [`ZeroShotClassifier`].
///
/// Both encoders sit behind a `Mutex` because `Session::run` requires `&mut self`.
pub struct ClipClassifier {
    vision: Mutex<Session>,
    vision_input: String,
    text: Mutex<Session>,
    text_wants_mask: bool,
    tokenizer: tokenizers::Tokenizer,
    pad_id: i64,
    image_size: u32,
    logit_scale: f32,
    max_text_length: usize,
}

impl ClipClassifier {
    /// Files that must be present in the model directory.
    pub const REQUIRED_FILES: [&'static str; 3] = [VISION_MODEL, TEXT_MODEL, TOKENIZER];

    /// Load both encoders and the tokenizer from `model_dir`.
    pub fn load(model_dir: &Path, config: &ScoringConfig) -> Result<Self, PipelineError> {
        for file in Self::REQUIRED_FILES {
            let path = model_dir.join(file);
            if !path.exists() {
                return Err(PipelineError::Model {
                    message: format!(
                        "{file} not found at {path:?}. Run `tagline models download` first."
                    ),
                });
            }
        }

        let vision = load_session(&model_dir.join(VISION_MODEL))?;
        let vision_input = vision
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());

        let text = load_session(&model_dir.join(TEXT_MODEL))?;
        let text_wants_mask = text.inputs().iter().any(|i| i.name() == "attention_mask");

        let tokenizer =
            tokenizers::Tokenizer::from_file(model_dir.join(TOKENIZER)).map_err(|e| {
                PipelineError::Model {
                    message: format!("Failed to load tokenizer: {e}"),
                }
            })?;
        let pad_id = tokenizer
            .token_to_id("<|endoftext|>")
            .map(i64::from)
            .unwrap_or(0);

        tracing::info!(
            "Loaded CLIP classifier from {:?} (vision input: {:?}, attention mask: {})",
            model_dir,
            vision_input,
            text_wants_mask
        );

        Ok(Self {
            vision: Mutex::new(vision),
            vision_input,
            text: Mutex::new(text),
            text_wants_mask,
            tokenizer,
            pad_id,
            image_size: config.image_size,
            logit_scale: config.logit_scale,
            max_text_length: config.max_text_length,
        })
    }

    /// Check whether all model files exist.
    pub fn model_exists(model_dir: &Path) -> bool {
        Self::REQUIRED_FILES
            .iter()
            .all(|file| model_dir.join(file).exists())
    }

    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, PipelineError> {
        let tensor = preprocess(image, self.image_size);
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = tensor.iter().copied().collect();

        let input = Value::from_array((shape, data)).map_err(|e| PipelineError::Model {
            message: format!("Failed to create image tensor: {e}"),
        })?;

        let mut session = self.vision.lock().map_err(|e| PipelineError::Model {
            message: format!("Vision session lock poisoned: {e}"),
        })?;
        let outputs = session
            .run(ort::inputs![self.vision_input.as_str() => input])
            .map_err(|e| PipelineError::Model {
                message: format!("Vision encoder inference failed: {e}"),
            })?;

        // image_embeds is the projected output; last_hidden_state is not cross-modal.
        let (_, value) = outputs
            .iter()
            .find(|(name, _)| *name == "image_embeds")
            .ok_or_else(|| PipelineError::Model {
                message: "Vision encoder did not produce image_embeds".to_string(),
            })?;
        let (_shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to extract image_embeds: {e}"),
            })?;

        let mut embedding = data.to_vec();
        l2_normalize_in_place(&mut embedding);
        Ok(embedding)
    }

    fn embed_labels(&self, labels: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = labels.len();
        let max_length = self.max_text_length;

        let encodings = self
            .tokenizer
            .encode_batch(labels.to_vec(), true)
            .map_err(|e| PipelineError::Model {
                message: format!("Tokenization failed: {e}"),
            })?;

        let mut input_ids = vec![self.pad_id; batch_size * max_length];
        let mut attention_mask = vec![0i64; batch_size * max_length];
        for (i, encoding) in encodings.iter().enumerate() {
            for (j, &id) in encoding.get_ids().iter().take(max_length).enumerate() {
                input_ids[i * max_length + j] = id as i64;
                attention_mask[i * max_length + j] = 1;
            }
        }

        let shape = vec![batch_size as i64, max_length as i64];
        let ids_value =
            Value::from_array((shape.clone(), input_ids)).map_err(|e| PipelineError::Model {
                message: format!("Failed to create input_ids tensor: {e}"),
            })?;

        let mut session = self.text.lock().map_err(|e| PipelineError::Model {
            message: format!("Text session lock poisoned: {e}"),
        })?;
        let outputs = if self.text_wants_mask {
            let mask_value =
                Value::from_array((shape, attention_mask)).map_err(|e| PipelineError::Model {
                    message: format!("Failed to create attention_mask tensor: {e}"),
                })?;
            session.run(ort::inputs![
                "input_ids" => ids_value,
                "attention_mask" => mask_value
            ])
        } else {
            session.run(ort::inputs!["input_ids" => ids_value])
        }
        .map_err(|e| PipelineError::Model {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        let (_, value) = outputs
            .iter()
            .find(|(name, _)| *name == "text_embeds")
            .ok_or_else(|| PipelineError::Model {
                message: "Text encoder did not produce text_embeds".to_string(),
            })?;
        let (_shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to extract text_embeds: {e}"),
            })?;

        let dim = data.len() / batch_size.max(1);
        Ok(data.chunks(dim.max(1)).map(l2_normalize).collect())
    }
}

impl ZeroShotClassifier for ClipClassifier {
    fn name(&self) -> &str {
        "clip"
    }

    fn classify(&self, image: &DynamicImage, labels: &[String]) -> Result<Vec<f32>, PipelineError> {
        if labels.is_empty() {
            return Err(PipelineError::Scoring {
                message: "Zero-shot classification needs at least one label".to_string(),
            });
        }

        let image_embedding = self.embed_image(image)?;
        let label_embeddings = self.embed_labels(labels)?;

        let logits: Vec<f32> = label_embeddings
            .iter()
            .map(|label| self.logit_scale * dot(&image_embedding, label))
            .collect();
        Ok(softmax(&logits))
    }
}

fn load_session(path: &Path) -> Result<Session, PipelineError> {
    Session::builder()
        .map_err(|e| PipelineError::Model {
            message: format!("Failed to create ONNX session builder: {e}"),
        })?
        .commit_from_file(path)
        .map_err(|e| PipelineError::Model {
            message: format!("Failed to load ONNX model {path:?}: {e}"),
        })
}
