//! The slide value type and its scoring.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::carousel::quality::QualityMetrics;
use crate::security::scanner::ImageFormat;

/// Identifier assigned to an accepted slide.
pub type SlideId = u64;

/// Freshness half-life parameter, in hours.
const FRESHNESS_DECAY_HOURS: f64 = 24.0;

/// Display counts dampen freshness with this divisor.
const FRESHNESS_USAGE_DIVISOR: f64 = 10.0;

/// A transcoded image held by the carousel.
///
/// `data` is the MOT SlideShow object payload: a valid image byte
/// sequence within the configured byte budget and dimension ceiling.
#[derive(Debug, Clone, Serialize)]
pub struct Slide {
    pub id: SlideId,
    /// Sanitized original filename, for operator display.
    pub filename: String,
    /// Format detected from the original payload's magic bytes.
    pub source_format: ImageFormat,
    /// Transcoded object payload.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: QualityMetrics,
    /// Last value computed by the maintenance tick.
    pub freshness: f64,
    pub last_displayed: Option<DateTime<Utc>>,
    pub display_count: u32,
    /// Hash over the transcoded bytes, unique within the carousel.
    pub content_hash: String,
    pub is_optimized: bool,
    pub ingested_at: DateTime<Utc>,
}

impl Slide {
    /// Freshness at `now`: exponential decay since the last display
    /// (or ingest), dampened by how often the slide has aired.
    pub fn freshness_at(&self, now: DateTime<Utc>) -> f64 {
        let since = self.last_displayed.unwrap_or(self.ingested_at);
        let hours = (now - since).num_seconds().max(0) as f64 / 3_600.0;
        let time_factor = (-hours / FRESHNESS_DECAY_HOURS).exp();
        let usage_factor = 1.0 / (1.0 + self.display_count as f64 / FRESHNESS_USAGE_DIVISOR);
        time_factor * usage_factor
    }

    /// Selection score:
    /// `0.3·sharpness + 0.2·contrast + 0.1·mid-brightness + 0.4·freshness`.
    pub fn selection_score(&self, now: DateTime<Utc>) -> f64 {
        let mid_brightness = 1.0 - (self.quality.brightness - 0.5).abs() * 2.0;
        0.3 * self.quality.sharpness
            + 0.2 * self.quality.contrast
            + 0.1 * mid_brightness
            + 0.4 * self.freshness_at(now)
    }

    /// Eviction rank, ascending; the lowest-ranked slides go first:
    /// `0.6·freshness + 0.4·mean(sharpness, contrast)`.
    pub fn eviction_score(&self, now: DateTime<Utc>) -> f64 {
        0.6 * self.freshness_at(now) + 0.4 * self.quality.composite()
    }
}
