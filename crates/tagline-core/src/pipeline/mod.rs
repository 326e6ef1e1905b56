//! Request pipeline.
//!
//! - **decode**: base64 payload to an RGB raster, with limits and a timeout
//! - **processor**: captioning, tag extraction and scoring for one image

pub mod decode;
pub mod processor;

pub use decode::{DecodedImage, ImageDecoder};
pub use processor::TaggingPipeline;
