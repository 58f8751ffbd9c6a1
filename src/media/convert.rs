use std::path::Path;

use anyhow::Context as _;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use crate::foundation::core::{Frame, FrameShape};
use crate::foundation::error::{AnimError, AnimResult};

/// Decode a still image from disk.
pub fn load_image(path: &Path) -> AnimResult<DynamicImage> {
    if !path.exists() {
        return Err(AnimError::NotFound(path.to_path_buf()));
    }
    let img = image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(img)
}

/// Convert any decoded image into a [`Frame`] of exactly `shape`.
///
/// Alpha is dropped, samples are scaled to `[0, 1]`, and the image is resampled with a
/// triangle filter when its size differs from `shape`.
pub fn normalize_frame(img: &DynamicImage, shape: FrameShape) -> Frame {
    let rgb = img.to_rgb32f();
    if shape.matches(&rgb) {
        return rgb;
    }
    imageops::resize(&rgb, shape.width, shape.height, FilterType::Triangle)
}

/// Quantize a [`Frame`] to 8-bit RGB for encoding.
pub fn frame_to_rgb8(frame: &Frame) -> RgbImage {
    let data = frame
        .as_raw()
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    RgbImage::from_raw(frame.width(), frame.height(), data)
        .unwrap_or_else(|| RgbImage::new(frame.width(), frame.height()))
}

#[cfg(test)]
#[path = "../../tests/unit/media/convert.rs"]
mod tests;
