//! PAD content engine for a DAB+ broadcast chain.
//!
//! A DAB+ transmitter multiplexes a metadata side-channel alongside
//! audio: short text captions (DLS) and slideshow images (MOT
//! SlideShow). This crate decides, at every instant, which single
//! caption and which single slide to air, produces wire-compliant
//! payloads, and absorbs bad input without stalling the broadcast.
//!
//! - [`security`]: path validation, magic-byte scanning, sanitization
//! - [`queue`]: priority caption queue, dedup, repeat throttling,
//!   length optimization, context-aware selection
//! - [`carousel`]: image ingest, transcode to the byte budget, dedup,
//!   quality/freshness scoring, eviction
//! - [`schedule`]: time-windowed content with repeat ceilings
//! - [`coordinator`]: the periodic decision tick, emergency override
//!   and the emitter snapshot
//! - [`sources`]: producer adapters funneling into one submission API
//!
//! The engine is a library: transport, configuration loading and the
//! physical PAD bit-packer live with the host. State is in-memory only;
//! a restart begins with an empty queue and carousel.
//!
//! # Example
//!
//! ```no_run
//! use dabpad_core::config::PadConfig;
//! use dabpad_core::coordinator::Coordinator;
//! use dabpad_core::queue::{CaptionDraft, Context, Priority, Source};
//!
//! let coordinator = Coordinator::new(PadConfig::default());
//! coordinator
//!     .submit_caption(CaptionDraft::new(
//!         "Now Playing: สวัสดี FM",
//!         Priority::Normal,
//!         Source::NowPlaying,
//!         Context::Music,
//!     ))
//!     .unwrap();
//!
//! coordinator.tick();
//! let snapshot = coordinator.snapshot();
//! assert!(snapshot.caption.is_some());
//! ```

pub mod carousel;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod schedule;
pub mod security;
pub mod sources;

pub use carousel::{Carousel, CarouselStats, DirectoryIngest, Slide, SlideId};
pub use config::{CarouselConfig, CoordinatorConfig, CulturalPolicy, OutputFormat, PadConfig, QueueConfig, SecurityConfig};
pub use coordinator::{Coordinator, EmergencyState, Snapshot, WorkerHandles};
pub use error::{IngestError, ScheduleError, SubmitError};
pub use metrics::CoordinatorMetrics;
pub use queue::{
    Caption, CaptionDraft, CaptionId, CaptionQueue, Context, Priority, SelectionCriteria, Source,
};
pub use schedule::{EntryDraft, EntryId, EntryKind, Repeat, ScheduledTable, ScheduleWindow};
pub use sources::{CaptionIngest, NowPlayingSource};
