//! Image quality metrics for slide scoring.
//!
//! All three metrics are computed on the luma plane of the processed
//! image and normalized to `[0, 1]`:
//!
//! - sharpness: variance of a 4-neighbor Laplacian (edge energy)
//! - contrast: standard deviation of luma
//! - brightness: mean luma

use image::DynamicImage;
use serde::Serialize;

/// Laplacian variance at or above this value counts as fully sharp.
const SHARPNESS_NORM: f64 = 10_000.0;

/// Luma standard deviation at or above this value counts as full contrast.
const CONTRAST_NORM: f64 = 128.0;

/// Normalized quality triple for a slide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub sharpness: f64,
    pub contrast: f64,
    pub brightness: f64,
}

impl QualityMetrics {
    /// Mean of sharpness and contrast, the scalar used for statistics
    /// and eviction ranking.
    pub fn composite(&self) -> f64 {
        (self.sharpness + self.contrast) / 2.0
    }
}

/// Analyze the processed image.
pub fn analyze(image: &DynamicImage) -> QualityMetrics {
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    let pixels = luma.as_raw();
    let n = pixels.len();

    if n == 0 {
        return QualityMetrics {
            sharpness: 0.0,
            contrast: 0.0,
            brightness: 0.0,
        };
    }

    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    let mean = sum as f64 / n as f64;

    let var = pixels
        .iter()
        .map(|&p| {
            let d = p as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    let stddev = var.sqrt();

    let sharpness = if width >= 3 && height >= 3 {
        laplacian_variance(pixels, width as usize, height as usize)
    } else {
        0.0
    };

    QualityMetrics {
        sharpness: (sharpness / SHARPNESS_NORM).min(1.0),
        contrast: (stddev / CONTRAST_NORM).min(1.0),
        brightness: mean / 255.0,
    }
}

/// Variance of the 4-neighbor Laplacian over interior pixels.
fn laplacian_variance(pixels: &[u8], width: usize, height: usize) -> f64 {
    let mut responses = Vec::with_capacity((width - 2) * (height - 2));
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = pixels[y * width + x] as f64;
            let up = pixels[(y - 1) * width + x] as f64;
            let down = pixels[(y + 1) * width + x] as f64;
            let left = pixels[y * width + x - 1] as f64;
            let right = pixels[y * width + x + 1] as f64;
            responses.push(4.0 * center - up - down - left - right);
        }
    }
    if responses.is_empty() {
        return 0.0;
    }
    let mean = responses.iter().sum::<f64>() / responses.len() as f64;
    responses.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / responses.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn gray(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> DynamicImage {
        let mut img = GrayImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Luma([f(x, y)]);
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_flat_image_has_no_edges_or_contrast() {
        let metrics = analyze(&gray(32, 32, |_, _| 128));
        assert_eq!(metrics.sharpness, 0.0);
        assert_eq!(metrics.contrast, 0.0);
        assert!((metrics.brightness - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_checkerboard_is_sharp_and_contrasty() {
        let metrics = analyze(&gray(32, 32, |x, y| if (x + y) % 2 == 0 { 0 } else { 255 }));
        assert_eq!(metrics.sharpness, 1.0);
        assert!(metrics.contrast > 0.9);
        assert!((metrics.brightness - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_gradient_is_smoother_than_checkerboard() {
        let gradient = analyze(&gray(64, 64, |x, _| (x * 4) as u8));
        let checker = analyze(&gray(64, 64, |x, y| if (x + y) % 2 == 0 { 0 } else { 255 }));
        assert!(gradient.sharpness < checker.sharpness);
    }

    #[test]
    fn test_bounds() {
        let metrics = analyze(&gray(16, 16, |x, y| ((x * 37 + y * 91) % 256) as u8));
        for v in [metrics.sharpness, metrics.contrast, metrics.brightness] {
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
