//! Content coordination: the periodic decision tick, emergency override
//! and the published snapshot.
//!
//! The coordinator owns the queue, the carousel and the scheduled table
//! and resolves them into one `(slide, caption)` pair per tick. The
//! emitter reads the pair through a snapshot pointer that is swapped
//! whole: readers see either the old or the new triple, never a tear.
//! When a lane produces nothing the previous value is held so the DAB
//! stream never goes silent.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use dabpad_charset::{culture, format};

use crate::carousel::{Carousel, DirectoryIngest, Slide, SlideId};
use crate::config::{CulturalPolicy, PadConfig};
use crate::error::{IngestError, ScheduleError, SubmitError};
use crate::metrics::CoordinatorMetrics;
use crate::queue::caption::content_hash;
use crate::queue::selector::ContextSelector;
use crate::queue::{Caption, CaptionDraft, CaptionId, CaptionQueue, Context, Priority, Source};
use crate::schedule::{EntryDraft, EntryId, ScheduledTable};
use crate::security::sanitizer::{sanitize_filename, sanitize_text};

/// Minimum gap between forwarding attempts for one scheduled caption
/// entry; the queue's dedup window is the second line of defense.
const SCHEDULED_FORWARD_HOLDOFF_SECS: u64 = 60;

/// Emergency override state.
#[derive(Debug, Clone)]
pub enum EmergencyState {
    Idle,
    Active {
        caption: Caption,
        started_at: DateTime<Utc>,
        duration_secs: u64,
    },
}

/// The triple published to the emitter.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub slide: Option<Slide>,
    pub caption: Option<Caption>,
    pub emergency_active: bool,
    pub emergency_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            slide: None,
            caption: None,
            emergency_active: false,
            emergency_message: None,
            timestamp: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// Handles to the coordinator's background workers.
pub struct WorkerHandles {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerHandles {
    /// Wait for every worker to observe shutdown and exit.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Drives queue, carousel and schedule into the emitter snapshot.
pub struct Coordinator {
    config: PadConfig,
    queue: Arc<CaptionQueue>,
    carousel: Arc<Carousel>,
    schedule: Arc<ScheduledTable>,
    selector: ContextSelector,
    snapshot: RwLock<Arc<Snapshot>>,
    emergency: Mutex<EmergencyState>,
    metrics: Arc<CoordinatorMetrics>,
    shutdown: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Coordinator {
    pub fn new(config: PadConfig) -> Arc<Self> {
        let queue = Arc::new(CaptionQueue::new(config.queue.clone()));
        let carousel = Arc::new(Carousel::new(config.carousel.clone(), &config.security));
        let selector = ContextSelector::new(config.coordinator.emergency_interval_secs);
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            queue,
            carousel,
            schedule: Arc::new(ScheduledTable::new()),
            selector,
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            emergency: Mutex::new(EmergencyState::Idle),
            metrics: CoordinatorMetrics::new(),
            shutdown: AtomicBool::new(false),
            shutdown_tx,
            config,
        })
    }

    pub fn queue(&self) -> &Arc<CaptionQueue> {
        &self.queue
    }

    pub fn carousel(&self) -> &Arc<Carousel> {
        &self.carousel
    }

    pub fn schedule(&self) -> &Arc<ScheduledTable> {
        &self.schedule
    }

    pub fn metrics(&self) -> &Arc<CoordinatorMetrics> {
        &self.metrics
    }

    // ---- control-plane surface ------------------------------------------

    /// Submit a caption into the queue.
    pub fn submit_caption(&self, draft: CaptionDraft) -> Result<CaptionId, SubmitError> {
        let verdict = self.queue.submit(draft);
        if let Err(e) = &verdict {
            info!("Coordinator: caption rejected: {e}");
        }
        verdict
    }

    /// Ingest an in-memory slide payload.
    pub fn submit_slide(
        &self,
        bytes: &[u8],
        declared_mime: Option<&str>,
        origin_path: Option<&Path>,
    ) -> Result<SlideId, IngestError> {
        let filename = origin_path
            .and_then(|p| p.file_name())
            .map(|n| sanitize_filename(&n.to_string_lossy()))
            .unwrap_or_else(|| "inline".to_string());
        let verdict = self
            .carousel
            .ingest_named_at(bytes, &filename, declared_mime, Utc::now());
        if let Err(e) = &verdict {
            info!("Coordinator: slide rejected: {e}");
        }
        verdict
    }

    /// Load and ingest a slide from disk (path-validated).
    pub fn ingest_slide_file(&self, path: &Path) -> Result<SlideId, IngestError> {
        self.carousel.ingest_file_at(path, Utc::now())
    }

    /// Ingest every image file in a directory (path-validated).
    pub fn ingest_slide_directory(&self, dir: &Path) -> Result<DirectoryIngest, IngestError> {
        self.carousel.ingest_directory_at(dir, Utc::now())
    }

    /// Switch the broadcast context used for caption selection.
    pub fn set_context(&self, context: Context) {
        self.selector.set_context(context);
    }

    pub fn context(&self) -> Context {
        self.selector.context()
    }

    /// Add a scheduled entry.
    pub fn add_scheduled(&self, draft: EntryDraft) -> Result<EntryId, ScheduleError> {
        self.schedule.add(draft)
    }

    /// Remove a scheduled entry.
    pub fn remove_scheduled(&self, id: EntryId) -> bool {
        self.schedule.remove(id)
    }

    /// Non-blocking read of the published triple.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    // ---- emergency override ---------------------------------------------

    /// Activate the emergency override for `duration_secs`.
    pub fn trigger_emergency(&self, message: &str, duration_secs: u64) {
        self.trigger_emergency_at(message, duration_secs, Utc::now());
    }

    /// [`trigger_emergency`](Self::trigger_emergency) at an explicit instant.
    ///
    /// Queue or carousel failures never impede activation: the emergency
    /// text path is independent of the regular pipeline.
    pub fn trigger_emergency_at(&self, message: &str, duration_secs: u64, now: DateTime<Utc>) {
        let text = sanitize_text(message);
        let caption = Caption {
            id: 0,
            text: text.clone(),
            priority: Priority::Emergency,
            source: Source::EmergencySystem,
            context: Context::Emergency,
            created_at: now,
            expires_at: now + Duration::seconds(duration_secs as i64),
            last_sent: None,
            send_count: 0,
            max_sends: 0,
            importance: 1.0,
            content_hash: content_hash(&text),
            is_thai: dabpad_charset::is_thai_text(&text),
            metadata: Default::default(),
        };

        *self.emergency.lock() = EmergencyState::Active {
            caption: caption.clone(),
            started_at: now,
            duration_secs,
        };

        // Also queued, so the regular pipeline can repeat it at the
        // emergency interval; a rejection here is irrelevant.
        let draft = CaptionDraft::new(
            text,
            Priority::Emergency,
            Source::EmergencySystem,
            Context::Emergency,
        )
        .importance(1.0)
        .expires_at(now + Duration::seconds(duration_secs as i64));
        if let Err(e) = self.queue.submit_at(draft, now) {
            debug!("Coordinator: emergency caption not queued: {e}");
        }

        self.metrics.record_emergency_activation();
        warn!(
            "Coordinator: EMERGENCY active for {duration_secs}s: {}",
            caption.text
        );

        // Published right away; a concurrent tick would do the same.
        let prev = self.snapshot();
        self.publish(Snapshot {
            slide: prev.slide.clone(),
            caption: Some(caption.clone()),
            emergency_active: true,
            emergency_message: Some(caption.text),
            timestamp: now,
        });
    }

    /// Return to normal programming immediately.
    pub fn clear_emergency(&self) {
        let mut emergency = self.emergency.lock();
        if matches!(*emergency, EmergencyState::Active { .. }) {
            *emergency = EmergencyState::Idle;
            info!("Coordinator: emergency cleared");
        }
    }

    /// Whether the override is active at `now`.
    pub fn emergency_active_at(&self, now: DateTime<Utc>) -> bool {
        match &*self.emergency.lock() {
            EmergencyState::Idle => false,
            EmergencyState::Active {
                started_at,
                duration_secs,
                ..
            } => now - *started_at < Duration::seconds(*duration_secs as i64),
        }
    }

    // ---- the decision tick ----------------------------------------------

    /// Run one decision tick with the current wall clock.
    pub fn tick(&self) {
        self.tick_at(Utc::now());
    }

    /// Run one decision tick at an explicit instant.
    ///
    /// Every step is fallible in isolation; a bad caption or missing
    /// slide is counted and skipped, never allowed to stop the tick.
    pub fn tick_at(&self, now: DateTime<Utc>) {
        self.metrics.record_tick();

        // Emergency dominates all selection.
        {
            let mut emergency = self.emergency.lock();
            if let EmergencyState::Active {
                caption,
                started_at,
                duration_secs,
            } = &*emergency
            {
                if now - *started_at < Duration::seconds(*duration_secs as i64) {
                    let prev = self.snapshot();
                    let message = caption.text.clone();
                    let next = Snapshot {
                        slide: prev.slide.clone(),
                        caption: Some(caption.clone()),
                        emergency_active: true,
                        emergency_message: Some(message),
                        timestamp: now,
                    };
                    drop(emergency);
                    self.publish(next);
                    return;
                }
                info!("Coordinator: emergency window elapsed, resuming normal content");
                *emergency = EmergencyState::Idle;
            }
        }

        self.forward_scheduled_captions(now);

        let prev = self.snapshot();
        let slide = self.resolve_slide(now, &prev);
        let caption = self.resolve_caption(now, &prev);

        self.publish(Snapshot {
            slide,
            caption,
            emergency_active: false,
            emergency_message: None,
            timestamp: now,
        });
    }

    /// Push due scheduled caption entries into the queue.
    fn forward_scheduled_captions(&self, now: DateTime<Utc>) {
        for (entry_id, draft) in self
            .schedule
            .due_captions_at(now, SCHEDULED_FORWARD_HOLDOFF_SECS)
        {
            match self.queue.submit_at(draft, now) {
                Ok(_) => {
                    self.schedule.note_scheduled(entry_id, now);
                    self.metrics.record_scheduled_forward();
                }
                Err(SubmitError::Duplicate) => self.schedule.note_attempt(entry_id, now),
                Err(e) => {
                    self.schedule.note_attempt(entry_id, now);
                    self.metrics.record_tick_error();
                    info!("Coordinator: scheduled caption {entry_id} rejected: {e}");
                }
            }
        }
    }

    fn resolve_slide(&self, now: DateTime<Utc>, prev: &Snapshot) -> Option<Slide> {
        let fresh = match self.schedule.best_slide_at(now) {
            Some((entry_id, Some(slide_id))) => match self.carousel.display_at(slide_id, now) {
                Some(slide) => {
                    self.schedule.note_scheduled(entry_id, now);
                    Some(slide)
                }
                None => {
                    self.metrics.record_tick_error();
                    info!("Coordinator: scheduled slide {slide_id} missing from carousel");
                    self.carousel.next_at(now)
                }
            },
            Some((entry_id, None)) => {
                let slide = self.carousel.next_at(now);
                if slide.is_some() {
                    self.schedule.note_scheduled(entry_id, now);
                }
                slide
            }
            None => self.carousel.next_at(now),
        };

        match fresh {
            Some(slide) => {
                self.metrics.record_slide_published();
                Some(slide)
            }
            None => {
                self.metrics.record_slide_hold();
                prev.slide.clone()
            }
        }
    }

    fn resolve_caption(&self, now: DateTime<Utc>, prev: &Snapshot) -> Option<Caption> {
        let mut criteria = self.selector.criteria_for(self.selector.context());
        criteria.max_text_bytes = self.config.queue.max_text_bytes;

        let fresh = self
            .queue
            .select_at(&criteria, now)
            .and_then(|caption| self.postprocess_caption(caption));

        match fresh {
            Some(caption) => {
                self.metrics.record_caption_published();
                Some(caption)
            }
            None => {
                self.metrics.record_caption_hold();
                prev.caption.clone()
            }
        }
    }

    /// Thai captions get a cultural review and DLS formatting before
    /// publication. The stored caption is untouched; only the published
    /// copy carries the formatted text.
    fn postprocess_caption(&self, mut caption: Caption) -> Option<Caption> {
        if !caption.is_thai {
            return Some(caption);
        }

        let review = culture::review(&caption.text);
        if !review.is_appropriate {
            warn!(
                "Coordinator: caption {} flagged by cultural review (score {:.1})",
                caption.id, review.sensitivity_score
            );
            if self.config.coordinator.cultural_check == CulturalPolicy::Block {
                self.metrics.record_caption_blocked();
                return None;
            }
        }
        if review.requires_special_formatting {
            debug!(
                "Coordinator: caption {} carries royal references, formatting review advised",
                caption.id
            );
        }

        let formatted = format::format_for_dls(&caption.text, self.config.queue.max_text_bytes);
        caption.text = formatted.text;
        Some(caption)
    }

    fn publish(&self, next: Snapshot) {
        *self.snapshot.write() = Arc::new(next);
    }

    // ---- background workers ---------------------------------------------

    /// Spawn the decision tick and the maintenance loops.
    ///
    /// Each worker runs on its own interval and exits promptly when
    /// [`stop`](Self::stop) is called, woken by the shutdown channel.
    pub fn start(self: &Arc<Self>) -> WorkerHandles {
        self.shutdown.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(false);

        let tick_ms = self.config.coordinator.tick_ms;
        let sweep_secs = self.config.coordinator.sweep_interval_secs;
        let maintenance_secs = self.config.coordinator.maintenance_interval_secs;
        info!("Coordinator: starting workers (tick {tick_ms} ms, sweep {sweep_secs} s, maintenance {maintenance_secs} s)");

        let handles = vec![
            self.spawn_worker("tick", StdDuration::from_millis(tick_ms), |c| c.tick()),
            self.spawn_worker("sweep", StdDuration::from_secs(sweep_secs), |c| {
                c.queue.sweep();
            }),
            self.spawn_worker("maintenance", StdDuration::from_secs(maintenance_secs), |c| {
                c.carousel.maintain_at(Utc::now());
            }),
        ];
        WorkerHandles { handles }
    }

    fn spawn_worker(
        self: &Arc<Self>,
        name: &'static str,
        period: StdDuration,
        work: impl Fn(&Coordinator) + Send + 'static,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if this.shutdown.load(Ordering::SeqCst) {
                            break;
                        }
                        work(&this);
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("Coordinator: {name} loop stopped");
        })
    }

    /// Request worker shutdown; loops exit without waiting out their
    /// current period.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
    }
}
