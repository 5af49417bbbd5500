//! Ink-wash finishing for generated images.
//!
//! Grayscale, then a contrast and a sharpness boost with the same blend
//! semantics as the usual "enhance" filters: each blends the image with a
//! degenerate version (flat mean gray for contrast, a 3x3 smoothed copy for
//! sharpness) using a multiplicative factor. The result is re-encoded as JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Luma};

use crate::error::Result;

pub const CONTRAST_FACTOR: f32 = 1.2;
pub const SHARPNESS_FACTOR: f32 = 1.1;
pub const JPEG_QUALITY: u8 = 85;

/// Decode `raw`, apply the ink finish, and encode as JPEG.
pub fn ink_finish(raw: &[u8]) -> Result<Vec<u8>> {
    let gray = image::load_from_memory(raw)?.to_luma8();
    let gray = enhance_contrast(&gray, CONTRAST_FACTOR);
    let gray = enhance_sharpness(&gray, SHARPNESS_FACTOR);
    encode_jpeg(&gray, JPEG_QUALITY)
}

fn blend(degenerate: f32, original: f32, factor: f32) -> u8 {
    (degenerate + factor * (original - degenerate))
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Scale each pixel's distance from the image mean by `factor`.
pub fn enhance_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let pixels = img.as_raw();
    if pixels.is_empty() {
        return img.clone();
    }
    let sum: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    let mean = (sum as f64 / pixels.len() as f64 + 0.5).floor() as f32;

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let Luma([p]) = *img.get_pixel(x, y);
        Luma([blend(mean, f32::from(p), factor)])
    })
}

/// Blend with a smoothed copy: factors above 1 sharpen. Edge pixels are kept.
pub fn enhance_sharpness(img: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return img.clone();
    }

    // 3x3 smoothing kernel, centre weight 5, total 13.
    GrayImage::from_fn(w, h, |x, y| {
        let Luma([p]) = *img.get_pixel(x, y);
        if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
            return Luma([p]);
        }
        let mut acc = 0u32;
        for dy in 0..3 {
            for dx in 0..3 {
                let Luma([q]) = *img.get_pixel(x + dx - 1, y + dy - 1);
                let weight = if dx == 1 && dy == 1 { 5 } else { 1 };
                acc += u32::from(q) * weight;
            }
        }
        let smoothed = (acc as f32 / 13.0).round();
        Luma([blend(smoothed, f32::from(p), factor)])
    })
}

pub fn encode_jpeg(img: &GrayImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(img)?;
    Ok(out)
}
