//! Word cloud rasterizer.
//!
//! Words are placed largest first along an Archimedean spiral from the
//! canvas centre; a candidate position is accepted when its bounding box
//! stays on the canvas and overlaps no earlier word. Words that cannot be
//! placed even at the minimum size are skipped.

use ab_glyph::{FontArc, PxScale};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::io::Cursor;
use std::path::Path;

use crate::error::{Result, ServiceError};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 500;

const MAX_FONT_SIZE: f32 = 96.0;
const MIN_FONT_SIZE: f32 = 12.0;
const SHRINK_STEP: f32 = 0.85;
const SPIRAL_STEPS: usize = 6000;
const SPIRAL_STEP_RADIANS: f32 = 0.1;
const WORD_MARGIN: u32 = 2;

/// Caption drawn on the placeholder image.
pub const PLACEHOLDER_CAPTION: &str = "词云生成失败";

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Ink tones cycled over placed words.
const PALETTE: [Rgb<u8>; 6] = [
    Rgb([28, 28, 28]),
    Rgb([140, 32, 32]),
    Rgb([52, 78, 65]),
    Rgb([70, 70, 95]),
    Rgb([110, 80, 50]),
    Rgb([90, 90, 90]),
];

/// A word positioned on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub word: String,
    pub size: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    fn overlaps(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        let m = WORD_MARGIN;
        x < self.x + self.width + m
            && self.x < x + w + m
            && y < self.y + self.height + m
            && self.y < y + h + m
    }
}

/// Font size for a word relative to the most frequent one.
fn font_size(count: usize, max_count: usize) -> f32 {
    if max_count == 0 {
        return MIN_FONT_SIZE;
    }
    let ratio = count as f32 / max_count as f32;
    MIN_FONT_SIZE + (MAX_FONT_SIZE - MIN_FONT_SIZE) * ratio
}

/// First free spot on the spiral for a `w`x`h` box.
fn find_spot(placed: &[Placement], w: u32, h: u32, width: u32, height: u32) -> Option<(u32, u32)> {
    if w > width || h > height {
        return None;
    }
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let aspect = height as f32 / width as f32;
    for step in 0..SPIRAL_STEPS {
        let theta = step as f32 * SPIRAL_STEP_RADIANS;
        let r = 2.0 * theta;
        let left = cx + r * theta.cos() - w as f32 / 2.0;
        let top = cy + r * aspect * theta.sin() - h as f32 / 2.0;
        if left < 0.0 || top < 0.0 {
            continue;
        }
        let (x, y) = (left as u32, top as u32);
        if x + w > width || y + h > height {
            continue;
        }
        if placed.iter().all(|p| !p.overlaps(x, y, w, h)) {
            return Some((x, y));
        }
    }
    None
}

/// Lay out ranked words. `measure` returns the pixel size of a word at a
/// font size.
pub fn layout<F>(ranked: &[(String, usize)], width: u32, height: u32, measure: F) -> Vec<Placement>
where
    F: Fn(&str, f32) -> (u32, u32),
{
    let max_count = ranked.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let mut placed: Vec<Placement> = Vec::with_capacity(ranked.len());
    for (word, count) in ranked {
        let mut size = font_size(*count, max_count);
        while size >= MIN_FONT_SIZE {
            let (w, h) = measure(word, size);
            if let Some((x, y)) = find_spot(&placed, w, h, width, height) {
                placed.push(Placement {
                    word: word.clone(),
                    size,
                    x,
                    y,
                    width: w,
                    height: h,
                });
                break;
            }
            size *= SHRINK_STEP;
        }
    }
    placed
}

/// Draws word clouds with a CJK-capable font.
#[derive(Clone)]
pub struct WordCloudRenderer {
    font: FontArc,
}

impl std::fmt::Debug for WordCloudRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordCloudRenderer").finish_non_exhaustive()
    }
}

impl WordCloudRenderer {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| ServiceError::Config(format!("cannot read {}: {e}", path.display())))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| ServiceError::Config(format!("invalid font {}: {e}", path.display())))?;
        Ok(Self::new(font))
    }

    fn measure(&self, word: &str, size: f32) -> (u32, u32) {
        text_size(PxScale::from(size), &self.font, word)
    }

    pub fn render(&self, ranked: &[(String, usize)]) -> RgbImage {
        let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
        let placements = layout(ranked, WIDTH, HEIGHT, |w, s| self.measure(w, s));
        for (i, p) in placements.iter().enumerate() {
            draw_text_mut(
                &mut image,
                PALETTE[i % PALETTE.len()],
                p.x as i32,
                p.y as i32,
                PxScale::from(p.size),
                &self.font,
                &p.word,
            );
        }
        image
    }
}

/// White canvas, captioned when a font is available.
pub fn placeholder_image(renderer: Option<&WordCloudRenderer>) -> RgbImage {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    if let Some(r) = renderer {
        let scale = PxScale::from(36.0);
        let (w, h) = text_size(scale, &r.font, PLACEHOLDER_CAPTION);
        let x = WIDTH.saturating_sub(w) / 2;
        let y = HEIGHT.saturating_sub(h) / 2;
        draw_text_mut(
            &mut image,
            PALETTE[0],
            x as i32,
            y as i32,
            scale,
            &r.font,
            PLACEHOLDER_CAPTION,
        );
    }
    image
}

pub fn encode_png_base64(image: &RgbImage) -> Result<String> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(BASE64.encode(bytes))
}
