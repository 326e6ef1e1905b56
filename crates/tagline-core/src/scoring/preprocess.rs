//! Image preprocessing for the CLIP vision encoder.
//!
//! CLIP ViT-L/14 expects:
//! - Shortest side resized to the input size (bicubic), then a centre crop
//! - Per-channel normalization with the OpenAI CLIP mean/std
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

const CHANNELS: usize = 3;

const CLIP_MEAN: [f32; CHANNELS] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

const CLIP_STD: [f32; CHANNELS] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image into a `[1, 3, image_size, image_size]` tensor.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let (width, height) = (image.width().max(1), image.height().max(1));
    let scale = image_size as f32 / width.min(height) as f32;
    let new_w = ((width as f32 * scale).round() as u32).max(image_size);
    let new_h = ((height as f32 * scale).round() as u32).max(image_size);

    let resized = image.resize_exact(new_w, new_h, FilterType::CatmullRom);
    let left = (new_w - image_size) / 2;
    let top = (new_h - image_size) / 2;
    let rgb = resized
        .crop_imm(left, top, image_size, image_size)
        .to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..CHANNELS {
            let value = pixel.0[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }

    tensor
}
