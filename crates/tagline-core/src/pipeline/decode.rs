//! Base64 image decoding with format detection, validation, and timeout support.

use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Image decoder with configurable limits and timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding a request image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Decoded pixels, converted to RGB
    pub image: DynamicImage,
    /// Detected container format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Size of the decoded byte payload
    pub byte_len: u64,
    /// Canonical base64 of the original bytes, reused for captioning requests
    pub encoded: String,
}

impl ImageDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode a base64 string into an RGB raster.
    ///
    /// Whitespace inside the string is ignored. The raster decode runs on a
    /// blocking thread under `limits.decode_timeout_ms`.
    pub async fn decode_base64(&self, encoded: &str) -> Result<DecodedImage, PipelineError> {
        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

        let max_bytes = self.limits.max_payload_mb * 1024 * 1024;
        let estimated = (cleaned.len() as u64 / 4) * 3;
        if estimated > max_bytes {
            return Err(PipelineError::PayloadTooLarge {
                size_mb: estimated / (1024 * 1024),
                max_mb: self.limits.max_payload_mb,
            });
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| PipelineError::Base64 {
                message: e.to_string(),
            })?;

        self.decode(bytes, Some(cleaned)).await
    }

    /// Decode raw image bytes with validation and timeout.
    ///
    /// The bytes are base64-encoded into `encoded` so the result can be
    /// captioned like one from [`decode_base64`](Self::decode_base64).
    pub async fn decode_bytes(&self, bytes: Vec<u8>) -> Result<DecodedImage, PipelineError> {
        self.decode(bytes, None).await
    }

    async fn decode(
        &self,
        bytes: Vec<u8>,
        encoded: Option<String>,
    ) -> Result<DecodedImage, PipelineError> {
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::decode_bytes_sync(bytes, encoded)).await
        })
        .await;

        match decode_result {
            Ok(Ok(Ok(decoded))) => {
                if decoded.width > self.limits.max_image_dimension
                    || decoded.height > self.limits.max_image_dimension
                {
                    return Err(PipelineError::ImageTooLarge {
                        width: decoded.width,
                        height: decoded.height,
                        max_dim: self.limits.max_image_dimension,
                    });
                }
                Ok(decoded)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(PipelineError::Decode {
                message: format!("Task join error: {e}"),
            }),
            Err(_) => Err(PipelineError::Timeout {
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode (runs in spawn_blocking).
    fn decode_bytes_sync(
        bytes: Vec<u8>,
        encoded: Option<String>,
    ) -> Result<DecodedImage, PipelineError> {
        let byte_len = bytes.len() as u64;
        let encoded =
            encoded.unwrap_or_else(|| base64::engine::general_purpose::STANDARD.encode(&bytes));
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                message: format!("Cannot detect image format: {e}"),
            })?;
        let format = reader.format().ok_or(PipelineError::UnsupportedFormat)?;
        let image = reader.decode().map_err(|e| PipelineError::Decode {
            message: e.to_string(),
        })?;

        let (width, height) = image.dimensions();
        let image = match image {
            DynamicImage::ImageRgb8(_) => image,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };

        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            byte_len,
            encoded,
        })
    }
}
