//! Configuration for the PAD content engine.
//!
//! The engine is a library; loading these structs from a file or the
//! control plane is the host's concern. Every knob has a broadcast-safe
//! default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output format for transcoded slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Baseline JPEG with the quality ladder. The default.
    Jpeg,
    /// PNG, single encode.
    Png,
    /// Lossless WebP, single encode.
    WebP,
}

/// How the coordinator reacts to inappropriate Thai content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CulturalPolicy {
    /// Log a warning and broadcast anyway.
    Advisory,
    /// Drop the caption; hold-previous semantics apply.
    Block,
}

/// Slideshow carousel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselConfig {
    /// Maximum slides retained; eviction runs above this.
    pub capacity: usize,
    /// Per-slide byte budget for the transcoded object.
    pub max_bytes: usize,
    /// Maximum slide width in pixels.
    pub max_width: u32,
    /// Maximum slide height in pixels.
    pub max_height: u32,
    /// Target output format for transcoding.
    pub format: OutputFormat,
    /// true = composite-score selection, false = round-robin.
    pub smart_selection: bool,
    /// Enable content-hash deduplication.
    pub dedup: bool,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            max_bytes: 50 * 1024,
            max_width: 320,
            max_height: 240,
            format: OutputFormat::Jpeg,
            smart_selection: true,
            dedup: true,
        }
    }
}

/// Caption queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// DLS byte budget, counted in the target encoding.
    pub max_text_bytes: usize,
    /// Window during which re-submission of identical content is rejected.
    pub dedup_window_secs: u64,
    /// Caption TTL applied when the submitter omits an expiry.
    pub default_expiry_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: 128,
            dedup_window_secs: 3_600,
            default_expiry_secs: 86_400,
        }
    }
}

/// Filesystem access policy for slide ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Allow-listed directory roots for file loads.
    pub allow_roots: Vec<PathBuf>,
    /// In strict mode an empty allow-list rejects every path.
    pub strict: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_roots: Vec::new(),
            strict: true,
        }
    }
}

/// Coordinator timing and policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Decision tick period in milliseconds.
    pub tick_ms: u64,
    /// Minimum repeat interval for emergency captions, in seconds.
    pub emergency_interval_secs: u64,
    /// Queue expiry sweep period in seconds.
    pub sweep_interval_secs: u64,
    /// Carousel freshness maintenance period in seconds.
    pub maintenance_interval_secs: u64,
    /// Reaction to inappropriate Thai content.
    pub cultural_check: CulturalPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1_000,
            emergency_interval_secs: 3,
            sweep_interval_secs: 30,
            maintenance_interval_secs: 300,
            cultural_check: CulturalPolicy::Advisory,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PadConfig {
    pub carousel: CarouselConfig,
    pub queue: QueueConfig,
    pub security: SecurityConfig,
    pub coordinator: CoordinatorConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PadConfig::default();
        assert_eq!(config.carousel.capacity, 50);
        assert_eq!(config.carousel.max_bytes, 51_200);
        assert_eq!(config.queue.max_text_bytes, 128);
        assert_eq!(config.queue.dedup_window_secs, 3_600);
        assert_eq!(config.coordinator.tick_ms, 1_000);
        assert_eq!(config.coordinator.cultural_check, CulturalPolicy::Advisory);
        assert!(config.security.allow_roots.is_empty());
    }
}
