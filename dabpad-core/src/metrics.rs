//! Coordinator-level counters.
//!
//! Cheap atomic counters for the hot path; container-level statistics
//! (queue, carousel, schedule) are snapshot-consistent under their own
//! mutexes and live with their containers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::info;

/// Counters maintained across coordinator ticks.
pub struct CoordinatorMetrics {
    ticks: AtomicU64,
    captions_published: AtomicU64,
    slides_published: AtomicU64,
    caption_holds: AtomicU64,
    slide_holds: AtomicU64,
    captions_blocked: AtomicU64,
    scheduled_forwards: AtomicU64,
    emergency_activations: AtomicU64,
    tick_errors: AtomicU64,
}

impl CoordinatorMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ticks: AtomicU64::new(0),
            captions_published: AtomicU64::new(0),
            slides_published: AtomicU64::new(0),
            caption_holds: AtomicU64::new(0),
            slide_holds: AtomicU64::new(0),
            captions_blocked: AtomicU64::new(0),
            scheduled_forwards: AtomicU64::new(0),
            emergency_activations: AtomicU64::new(0),
            tick_errors: AtomicU64::new(0),
        })
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_caption_published(&self) {
        self.captions_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_slide_published(&self) {
        self.slides_published.fetch_add(1, Ordering::Relaxed);
    }

    /// A tick held the previous caption because nothing new qualified.
    pub fn record_caption_hold(&self) {
        self.caption_holds.fetch_add(1, Ordering::Relaxed);
    }

    /// A tick held the previous slide.
    pub fn record_slide_hold(&self) {
        self.slide_holds.fetch_add(1, Ordering::Relaxed);
    }

    /// A caption was dropped by the cultural policy.
    pub fn record_caption_blocked(&self) {
        self.captions_blocked.fetch_add(1, Ordering::Relaxed);
    }

    /// A scheduled caption entry was forwarded into the queue.
    pub fn record_scheduled_forward(&self) {
        self.scheduled_forwards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emergency_activation(&self) {
        self.emergency_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_error(&self) {
        self.tick_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn captions_published(&self) -> u64 {
        self.captions_published.load(Ordering::Relaxed)
    }

    pub fn slides_published(&self) -> u64 {
        self.slides_published.load(Ordering::Relaxed)
    }

    pub fn caption_holds(&self) -> u64 {
        self.caption_holds.load(Ordering::Relaxed)
    }

    pub fn slide_holds(&self) -> u64 {
        self.slide_holds.load(Ordering::Relaxed)
    }

    pub fn captions_blocked(&self) -> u64 {
        self.captions_blocked.load(Ordering::Relaxed)
    }

    pub fn scheduled_forwards(&self) -> u64 {
        self.scheduled_forwards.load(Ordering::Relaxed)
    }

    pub fn emergency_activations(&self) -> u64 {
        self.emergency_activations.load(Ordering::Relaxed)
    }

    pub fn tick_errors(&self) -> u64 {
        self.tick_errors.load(Ordering::Relaxed)
    }

    /// Log a one-line counter report.
    pub fn report(&self) {
        info!(
            "[Coordinator] ticks={}, captions={} (holds={}, blocked={}), slides={} (holds={}), \
             scheduled_forwards={}, emergencies={}, errors={}",
            self.ticks(),
            self.captions_published(),
            self.caption_holds(),
            self.captions_blocked(),
            self.slides_published(),
            self.slide_holds(),
            self.scheduled_forwards(),
            self.emergency_activations(),
            self.tick_errors()
        );
    }
}
