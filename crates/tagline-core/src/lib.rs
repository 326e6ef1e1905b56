//! Tagline Core - caption-to-tag image tagging library.
//!
//! Tagline turns a base64 image into weighted tags. A captioning model
//! describes the image once greedily and several times with sampling; the
//! captions are reduced to stop-word-free candidate tags, and a zero-shot
//! classifier distributes probability across those tags.
//!
//! # Architecture
//!
//! ```text
//! JSON → Decode → Caption (best + sampled) → Extract tags → Score (CLIP) → TagReport
//! ```
//!
//! Both models sit behind traits ([`Captioner`], [`ZeroShotClassifier`]) so
//! the pipeline can be driven by mocks in tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tagline_core::{Config, TaggingPipeline};
//!
//! #[tokio::main]
//! async fn main() -> tagline_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = TaggingPipeline::from_config(&config)?;
//!
//!     let body = br#"{"image": "iVBORw0KGgo..."}"#;
//!     let report = pipeline.handle_json(body).await?;
//!     println!("{}", serde_json::to_string(&report)?);
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod math;
pub mod pipeline;
pub mod scoring;
pub mod tagging;
pub mod text;
pub mod types;

pub use caption::{CaptionSampler, Captioner, LlmCaptioner};
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, Result, TaglineError};
pub use pipeline::{DecodedImage, ImageDecoder, TaggingPipeline};
pub use scoring::{ClipClassifier, TagScorer, ZeroShotClassifier};
pub use tagging::TagExtractor;
pub use text::StopWords;
pub use types::{Caption, CaptionSet, ScoredTag, TagReport, TagSet};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
