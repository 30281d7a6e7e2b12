//! MOT SlideShow carousel: ingest, transcode, dedup, scoring, eviction.
//!
//! The slide list and its hash index are invariants in pair and live
//! behind one mutex. Ingestion is synchronous and blocking (image
//! decode/encode happens on the caller's thread); callers that cannot
//! block submit from a worker of their own.

pub mod quality;
pub mod slide;
pub mod transcode;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use sha1::{Digest, Sha1};

use crate::config::{CarouselConfig, SecurityConfig};
use crate::error::IngestError;
use crate::security::path::PathValidator;
use crate::security::sanitizer::sanitize_filename;
use crate::security::scanner::{self, ImageFormat};

pub use quality::QualityMetrics;
pub use slide::{Slide, SlideId};

/// File extensions considered image candidates by directory ingest.
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "heic", "heif"];

/// Maintenance triggers eviction when occupancy reaches 90% of capacity.
const MAINTENANCE_OCCUPANCY_NUM: usize = 9;
const MAINTENANCE_OCCUPANCY_DEN: usize = 10;

/// Result of a directory ingest: how many files made it in, and why the
/// others were rejected.
#[derive(Debug)]
pub struct DirectoryIngest {
    pub accepted: usize,
    pub rejected: Vec<(PathBuf, IngestError)>,
}

/// Aggregate carousel counters, consistent under the carousel mutex.
#[derive(Debug, Clone, PartialEq)]
pub struct CarouselStats {
    pub count: usize,
    pub optimized: usize,
    pub total_bytes: usize,
    pub average_quality: f64,
    pub displays: u64,
    pub duplicates_rejected: u64,
    pub evicted: u64,
}

struct CarouselInner {
    slides: Vec<Slide>,
    hash_index: HashMap<String, usize>,
    rr_cursor: usize,
    displays: u64,
    duplicates_rejected: u64,
    evicted: u64,
}

/// Thread-safe slideshow carousel.
pub struct Carousel {
    inner: Mutex<CarouselInner>,
    config: CarouselConfig,
    path_validator: PathValidator,
    next_id: AtomicU64,
}

impl Carousel {
    pub fn new(config: CarouselConfig, security: &SecurityConfig) -> Self {
        Self {
            inner: Mutex::new(CarouselInner {
                slides: Vec::new(),
                hash_index: HashMap::new(),
                rr_cursor: 0,
                displays: 0,
                duplicates_rejected: 0,
                evicted: 0,
            }),
            config,
            path_validator: PathValidator::new(security),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    /// Ingest an in-memory image payload with the current clock.
    pub fn ingest(&self, bytes: &[u8], declared_mime: Option<&str>) -> Result<SlideId, IngestError> {
        self.ingest_named_at(bytes, "inline", declared_mime, Utc::now())
    }

    /// Ingest an image payload at an explicit instant.
    ///
    /// Pipeline: magic-byte detection, structural validation, content
    /// scan, transcode, dedup, quality analysis, insert, eviction.
    pub fn ingest_named_at(
        &self,
        bytes: &[u8],
        filename: &str,
        declared_mime: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SlideId, IngestError> {
        let format = scanner::detect_format(bytes);
        if format == ImageFormat::Unknown || !scanner::validate_format(bytes, format) {
            info!("Carousel: rejected {filename}: bad format");
            return Err(IngestError::BadFormat);
        }
        if let Some(mime) = declared_mime {
            if mime != format.mime_type() {
                // The declared type is advisory; the signature decides.
                debug!(
                    "Carousel: {filename} declared {mime} but signature says {}",
                    format.mime_type()
                );
            }
        }

        let report = scanner::scan(bytes);
        if !report.is_safe {
            info!(
                "Carousel: rejected {filename}: unsafe content (risk {:.1})",
                report.risk_score
            );
            return Err(IngestError::UnsafeContent(report.threats.join(", ")));
        }

        if format == ImageFormat::Heif {
            // Detected and structurally valid, but no decoder in the stack.
            return Err(IngestError::DecodeFailed("no HEIF decoder available".to_string()));
        }

        let output = transcode::transcode(bytes, &self.config)?;
        let hash = hex::encode(Sha1::digest(&output.data));
        let quality = quality::analyze(&output.image);

        let mut inner = self.inner.lock();
        if self.config.dedup && inner.hash_index.contains_key(&hash) {
            inner.duplicates_rejected += 1;
            info!("Carousel: rejected {filename}: duplicate content");
            return Err(IngestError::Duplicate);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slide = Slide {
            id,
            filename: sanitize_filename(filename),
            source_format: format,
            data: output.data,
            width: output.width,
            height: output.height,
            quality,
            freshness: 1.0,
            last_displayed: None,
            display_count: 0,
            content_hash: hash.clone(),
            is_optimized: true,
            ingested_at: now,
        };

        let index = inner.slides.len();
        inner.hash_index.insert(hash, index);
        inner.slides.push(slide);
        debug!("Carousel: accepted slide {id} ({filename}), count {}", inner.slides.len());

        if inner.slides.len() > self.config.capacity {
            self.evict_locked(&mut inner, now);
        }
        Ok(id)
    }

    /// Load and ingest a single file, after path validation.
    pub fn ingest_file_at(&self, path: &Path, now: DateTime<Utc>) -> Result<SlideId, IngestError> {
        let canonical = self.path_validator.validate(path)?;
        let bytes = std::fs::read(&canonical).map_err(|e| IngestError::Io(e.to_string()))?;
        let filename = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        self.ingest_named_at(&bytes, &filename, None, now)
    }

    /// Ingest every regular file with a known image extension under
    /// `dir`. Bad files are reported, not fatal.
    pub fn ingest_directory_at(
        &self,
        dir: &Path,
        now: DateTime<Utc>,
    ) -> Result<DirectoryIngest, IngestError> {
        let canonical = self.path_validator.validate(dir)?;
        let entries = std::fs::read_dir(&canonical).map_err(|e| IngestError::Io(e.to_string()))?;

        let mut result = DirectoryIngest {
            accepted: 0,
            rejected: Vec::new(),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let known = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if !known {
                continue;
            }
            match self.ingest_file_at(&path, now) {
                Ok(_) => result.accepted += 1,
                Err(e) => result.rejected.push((path, e)),
            }
        }

        info!(
            "Carousel: directory ingest of {} accepted {}, rejected {}",
            canonical.display(),
            result.accepted,
            result.rejected.len()
        );
        Ok(result)
    }

    /// Pick the next slide to air and update its display stats.
    pub fn next(&self) -> Option<Slide> {
        self.next_at(Utc::now())
    }

    /// [`next`](Self::next) at an explicit instant.
    pub fn next_at(&self, now: DateTime<Utc>) -> Option<Slide> {
        let mut inner = self.inner.lock();
        if inner.slides.is_empty() {
            return None;
        }

        let index = if self.config.smart_selection {
            let mut best: Option<(f64, usize)> = None;
            for (i, candidate) in inner.slides.iter().enumerate() {
                let score = candidate.selection_score(now);
                let better = match best {
                    None => true,
                    Some((best_score, best_index)) => {
                        if score > best_score {
                            true
                        } else if score < best_score {
                            false
                        } else {
                            // Tie: the slide displayed longest ago wins.
                            match (candidate.last_displayed, inner.slides[best_index].last_displayed)
                            {
                                (None, Some(_)) => true,
                                (Some(a), Some(b)) => a < b,
                                _ => false,
                            }
                        }
                    }
                };
                if better {
                    best = Some((score, i));
                }
            }
            best?.1
        } else {
            let i = inner.rr_cursor % inner.slides.len();
            inner.rr_cursor = (i + 1) % inner.slides.len();
            i
        };

        Some(Self::mark_displayed(&mut inner, index, now))
    }

    /// Air a specific slide by id (used for scheduled content).
    pub fn display_at(&self, id: SlideId, now: DateTime<Utc>) -> Option<Slide> {
        let mut inner = self.inner.lock();
        let index = inner.slides.iter().position(|s| s.id == id)?;
        Some(Self::mark_displayed(&mut inner, index, now))
    }

    fn mark_displayed(inner: &mut CarouselInner, index: usize, now: DateTime<Utc>) -> Slide {
        let slide = &mut inner.slides[index];
        slide.last_displayed = Some(now);
        slide.display_count += 1;
        slide.freshness = slide.freshness_at(now);
        inner.displays += 1;
        inner.slides[index].clone()
    }

    /// Remove a slide by id.
    pub fn remove(&self, id: SlideId) -> bool {
        let mut inner = self.inner.lock();
        let Some(index) = inner.slides.iter().position(|s| s.id == id) else {
            return false;
        };
        inner.slides.remove(index);
        Self::rebuild_hash_index(&mut inner);
        info!("Carousel: removed slide {id}");
        true
    }

    /// Number of slides held.
    pub fn count(&self) -> usize {
        self.inner.lock().slides.len()
    }

    /// Recompute freshness for every slide and evict when occupancy is
    /// high. Runs from the background maintenance tick.
    pub fn maintain_at(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        for slide in &mut inner.slides {
            slide.freshness = slide.freshness_at(now);
        }
        if inner.slides.len() * MAINTENANCE_OCCUPANCY_DEN
            >= self.config.capacity * MAINTENANCE_OCCUPANCY_NUM
        {
            self.evict_locked(&mut inner, now);
        }
    }

    fn evict_locked(&self, inner: &mut CarouselInner, now: DateTime<Utc>) -> usize {
        let excess = inner.slides.len().saturating_sub(self.config.capacity);
        if excess == 0 {
            return 0;
        }

        let mut ranked: Vec<(f64, usize)> = inner
            .slides
            .iter()
            .enumerate()
            .map(|(i, s)| (s.eviction_score(now), i))
            .collect();
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut doomed: Vec<usize> = ranked[..excess].iter().map(|&(_, i)| i).collect();
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for index in doomed {
            let slide = inner.slides.remove(index);
            debug!("Carousel: evicted slide {} ({})", slide.id, slide.filename);
        }

        Self::rebuild_hash_index(inner);
        inner.rr_cursor = 0;
        inner.evicted += excess as u64;
        info!("Carousel: evicted {excess} slides, count {}", inner.slides.len());
        excess
    }

    fn rebuild_hash_index(inner: &mut CarouselInner) {
        inner.hash_index = inner
            .slides
            .iter()
            .enumerate()
            .map(|(i, s)| (s.content_hash.clone(), i))
            .collect();
    }

    /// Snapshot-consistent carousel statistics.
    pub fn statistics(&self) -> CarouselStats {
        let inner = self.inner.lock();
        let count = inner.slides.len();
        CarouselStats {
            count,
            optimized: inner.slides.iter().filter(|s| s.is_optimized).count(),
            total_bytes: inner.slides.iter().map(|s| s.data.len()).sum(),
            average_quality: if count > 0 {
                inner.slides.iter().map(|s| s.quality.composite()).sum::<f64>() / count as f64
            } else {
                0.0
            },
            displays: inner.displays,
            duplicates_rejected: inner.duplicates_rejected,
            evicted: inner.evicted,
        }
    }
}
