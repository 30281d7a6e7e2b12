//! Image transcoding to the MOT SlideShow payload budget.
//!
//! Every ingested image is decoded, downscaled to the display ceiling
//! with Lanczos3 while preserving aspect ratio, run through the
//! broadcast profile (8-bit sRGB, histogram levels stretch, mild unsharp
//! mask) and re-encoded. JPEG output walks the quality ladder until a
//! result fits the byte budget; PNG and lossless WebP encode once and
//! are checked against the budget.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use log::debug;

use crate::config::{CarouselConfig, OutputFormat};
use crate::error::IngestError;

/// JPEG qualities tried in order; the first result within budget wins.
pub const QUALITY_LADDER: [u8; 6] = [95, 85, 75, 65, 55, 50];

/// Unsharp mask parameters for small broadcast displays.
const SHARPEN_SIGMA: f32 = 0.5;
const SHARPEN_THRESHOLD: i32 = 2;

/// A transcoded slide payload plus the processed pixels for analysis.
#[derive(Debug)]
pub struct TranscodeOutput {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// The processed image the payload was encoded from.
    pub image: DynamicImage,
}

/// Decode, downscale, profile and re-encode `data` for broadcast.
pub fn transcode(data: &[u8], config: &CarouselConfig) -> Result<TranscodeOutput, IngestError> {
    let decoded =
        image::load_from_memory(data).map_err(|e| IngestError::DecodeFailed(e.to_string()))?;

    let resized = if decoded.width() > config.max_width || decoded.height() > config.max_height {
        decoded.resize(config.max_width, config.max_height, FilterType::Lanczos3)
    } else {
        decoded
    };

    let processed = apply_broadcast_profile(resized);
    let payload = encode(&processed, config)?;

    debug!(
        "transcode: {}x{} -> {} bytes as {:?}",
        processed.width(),
        processed.height(),
        payload.len(),
        config.format
    );

    Ok(TranscodeOutput {
        data: payload,
        width: processed.width(),
        height: processed.height(),
        image: processed,
    })
}

/// 8-bit sRGB, levels stretch, mild sharpen.
fn apply_broadcast_profile(image: DynamicImage) -> DynamicImage {
    let mut rgb = image.to_rgb8();
    stretch_levels(&mut rgb);
    DynamicImage::ImageRgb8(rgb).unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

/// Linear histogram stretch: maps the darkest sample to 0 and the
/// brightest to 255 across all channels, preserving hue ratios.
fn stretch_levels(rgb: &mut RgbImage) {
    let (mut lo, mut hi) = (u8::MAX, u8::MIN);
    for p in rgb.pixels() {
        for &v in &p.0 {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if hi <= lo {
        return;
    }
    let range = (hi - lo) as f32;
    for p in rgb.pixels_mut() {
        for v in &mut p.0 {
            *v = (((*v - lo) as f32 / range) * 255.0).round() as u8;
        }
    }
}

fn encode(image: &DynamicImage, config: &CarouselConfig) -> Result<Vec<u8>, IngestError> {
    match config.format {
        OutputFormat::Jpeg => {
            let mut last_size = 0;
            for quality in QUALITY_LADDER {
                let mut buf = Vec::new();
                let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality);
                image
                    .write_with_encoder(encoder)
                    .map_err(|e| IngestError::DecodeFailed(e.to_string()))?;
                if buf.len() <= config.max_bytes {
                    return Ok(buf);
                }
                last_size = buf.len();
            }
            Err(IngestError::TooLarge {
                size: last_size,
                budget: config.max_bytes,
            })
        }
        OutputFormat::Png => {
            let mut buf = Vec::new();
            image
                .write_with_encoder(PngEncoder::new(Cursor::new(&mut buf)))
                .map_err(|e| IngestError::DecodeFailed(e.to_string()))?;
            check_budget(buf, config.max_bytes)
        }
        OutputFormat::WebP => {
            let mut buf = Vec::new();
            image
                .write_with_encoder(WebPEncoder::new_lossless(Cursor::new(&mut buf)))
                .map_err(|e| IngestError::DecodeFailed(e.to_string()))?;
            check_budget(buf, config.max_bytes)
        }
    }
}

fn check_budget(buf: Vec<u8>, budget: usize) -> Result<Vec<u8>, IngestError> {
    if buf.len() <= budget {
        Ok(buf)
    } else {
        Err(IngestError::TooLarge {
            size: buf.len(),
            budget,
        })
    }
}
