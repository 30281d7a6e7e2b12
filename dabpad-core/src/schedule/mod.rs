//! Time-windowed content scheduling.
//!
//! Scheduled entries carry a caption draft, a slide reference, or both,
//! plus a window: a one-shot interval, a daily time-of-day window, or a
//! weekly window with a day-of-week mask. The coordinator asks the table
//! for the best eligible slide entry and for caption entries due to be
//! forwarded into the queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::carousel::SlideId;
use crate::error::ScheduleError;
use crate::queue::{CaptionDraft, Priority};

/// Identifier assigned to a scheduled entry.
pub type EntryId = u64;

/// Weight of priority in the scheduling score.
const W_PRIORITY: f64 = 0.4;
/// Weight of time remaining in the window.
const W_TIME_REMAINING: f64 = 0.3;
/// Weight of the usage-inverse component.
const W_USAGE: f64 = 0.2;
/// Weight of the content quality hint.
const W_QUALITY: f64 = 0.1;

/// What an entry schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Slide,
    Caption,
    Combined,
}

impl EntryKind {
    pub fn has_slide(self) -> bool {
        matches!(self, EntryKind::Slide | EntryKind::Combined)
    }

    pub fn has_caption(self) -> bool {
        matches!(self, EntryKind::Caption | EntryKind::Combined)
    }
}

/// Window recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repeat {
    /// The window fires once between start and end.
    Once,
    /// The time-of-day window repeats every day between the start and
    /// end dates. Windows must not cross midnight.
    Daily,
    /// Like daily, restricted to the days set in the mask
    /// (bit 0 = Sunday .. bit 6 = Saturday).
    Weekly(u8),
}

/// When and how often an entry may air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub repeat: Repeat,
    /// 0 = unlimited.
    pub max_repeats: u32,
    pub current_repeats: u32,
}

impl ScheduleWindow {
    /// A one-shot window starting now.
    pub fn immediate(start: DateTime<Utc>, duration_secs: u64) -> Self {
        Self {
            start,
            end: start + Duration::seconds(duration_secs as i64),
            repeat: Repeat::Once,
            max_repeats: 0,
            current_repeats: 0,
        }
    }

    /// Whether `now` falls inside an occurrence of the window.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if now < self.start || now > self.end {
            return false;
        }
        match self.repeat {
            Repeat::Once => true,
            Repeat::Daily => self.time_of_day_matches(now),
            Repeat::Weekly(mask) => {
                let bit = 1u8 << now.weekday().num_days_from_sunday();
                mask & bit != 0 && self.time_of_day_matches(now)
            }
        }
    }

    fn time_of_day_matches(&self, now: DateTime<Utc>) -> bool {
        let t = now.num_seconds_from_midnight();
        t >= self.start.num_seconds_from_midnight() && t <= self.end.num_seconds_from_midnight()
    }

    /// Fraction of the current occurrence still ahead, in `[0, 1]`.
    pub fn time_remaining_ratio(&self, now: DateTime<Utc>) -> f64 {
        let (occ_start, occ_end) = match self.repeat {
            Repeat::Once => (self.start.timestamp(), self.end.timestamp()),
            Repeat::Daily | Repeat::Weekly(_) => {
                let day_start = now.timestamp() - now.num_seconds_from_midnight() as i64;
                (
                    day_start + self.start.num_seconds_from_midnight() as i64,
                    day_start + self.end.num_seconds_from_midnight() as i64,
                )
            }
        };
        let span = occ_end - occ_start;
        if span <= 0 {
            return 0.0;
        }
        ((occ_end - now.timestamp()) as f64 / span as f64).clamp(0.0, 1.0)
    }
}

/// A scheduled piece of content.
#[derive(Debug, Clone)]
pub struct ScheduledEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub priority: Priority,
    pub window: ScheduleWindow,
    /// Forwarded into the caption queue when due.
    pub caption: Option<CaptionDraft>,
    /// Aired through the carousel when due; `None` lets the carousel's
    /// own selection pick.
    pub slide_id: Option<SlideId>,
    /// Content quality hint in `[0, 1]`, feeds the scheduling score.
    pub quality_hint: f64,
    pub created_at: DateTime<Utc>,
    pub last_scheduled: Option<DateTime<Utc>>,
    pub schedule_count: u32,
}

impl ScheduledEntry {
    /// Eligibility: inside the window and under the repeat ceiling.
    pub fn eligible(&self, now: DateTime<Utc>) -> bool {
        self.window.contains(now)
            && (self.window.max_repeats == 0
                || self.window.current_repeats < self.window.max_repeats)
    }

    /// Scheduling score:
    /// `0.4·priority + 0.3·time_remaining + 0.2·usage_inverse + 0.1·quality`.
    pub fn score(&self, now: DateTime<Utc>) -> f64 {
        let usage_inverse = 1.0 / (1.0 + self.schedule_count as f64 * 0.1);
        W_PRIORITY * self.priority.weight()
            + W_TIME_REMAINING * self.window.time_remaining_ratio(now)
            + W_USAGE * usage_inverse
            + W_QUALITY * self.quality_hint
    }
}

/// A draft entry before the table assigns identity.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub kind: EntryKind,
    pub priority: Priority,
    pub window: ScheduleWindow,
    pub caption: Option<CaptionDraft>,
    pub slide_id: Option<SlideId>,
    pub quality_hint: f64,
}

impl EntryDraft {
    pub fn slide(window: ScheduleWindow, priority: Priority, slide_id: Option<SlideId>) -> Self {
        Self {
            kind: EntryKind::Slide,
            priority,
            window,
            caption: None,
            slide_id,
            quality_hint: 0.5,
        }
    }

    pub fn caption(window: ScheduleWindow, draft: CaptionDraft) -> Self {
        Self {
            kind: EntryKind::Caption,
            priority: draft.priority,
            window,
            caption: Some(draft),
            slide_id: None,
            quality_hint: 0.5,
        }
    }
}

/// Aggregate table counters, consistent under the table mutex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleStatistics {
    pub entries: usize,
    pub eligible_now: usize,
    pub total_forwards: u64,
}

struct TableInner {
    entries: HashMap<EntryId, ScheduledEntry>,
    total_forwards: u64,
}

/// Thread-safe scheduled-content table.
pub struct ScheduledTable {
    inner: Mutex<TableInner>,
    next_id: AtomicU64,
}

impl Default for ScheduledTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduledTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TableInner {
                entries: HashMap::new(),
                total_forwards: 0,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add an entry; rejects windows that end before they start.
    pub fn add_at(&self, draft: EntryDraft, now: DateTime<Utc>) -> Result<EntryId, ScheduleError> {
        if draft.window.end < draft.window.start {
            return Err(ScheduleError::InvertedWindow);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = ScheduledEntry {
            id,
            kind: draft.kind,
            priority: draft.priority,
            window: draft.window,
            caption: draft.caption,
            slide_id: draft.slide_id,
            quality_hint: draft.quality_hint.clamp(0.0, 1.0),
            created_at: now,
            last_scheduled: None,
            schedule_count: 0,
        };
        self.inner.lock().entries.insert(id, entry);
        info!("ScheduledTable: added entry {id} ({:?})", draft.kind);
        Ok(id)
    }

    pub fn add(&self, draft: EntryDraft) -> Result<EntryId, ScheduleError> {
        self.add_at(draft, Utc::now())
    }

    pub fn remove(&self, id: EntryId) -> bool {
        let removed = self.inner.lock().entries.remove(&id).is_some();
        if removed {
            info!("ScheduledTable: removed entry {id}");
        }
        removed
    }

    /// Highest-scoring eligible slide entry, if any.
    pub fn best_slide_at(&self, now: DateTime<Utc>) -> Option<(EntryId, Option<SlideId>)> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter(|e| e.kind.has_slide() && e.eligible(now))
            .max_by(|a, b| {
                a.score(now)
                    .partial_cmp(&b.score(now))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.id.cmp(&a.id))
            })
            .map(|e| (e.id, e.slide_id))
    }

    /// Caption entries due for forwarding into the queue.
    ///
    /// An entry is due when eligible and not attempted within the
    /// holdoff; the queue's own dedup window is the second line of
    /// defense against over-forwarding.
    pub fn due_captions_at(&self, now: DateTime<Utc>, holdoff_secs: u64) -> Vec<(EntryId, CaptionDraft)> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter(|e| e.kind.has_caption() && e.eligible(now))
            .filter(|e| {
                e.last_scheduled
                    .map_or(true, |t| now - t >= Duration::seconds(holdoff_secs as i64))
            })
            .filter_map(|e| e.caption.clone().map(|c| (e.id, c)))
            .collect()
    }

    /// Record that an entry's content was aired or accepted: counts a
    /// repeat against the window ceiling.
    pub fn note_scheduled(&self, id: EntryId, now: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get_mut(&id) {
            entry.last_scheduled = Some(now);
            entry.schedule_count += 1;
            entry.window.current_repeats += 1;
            debug!(
                "ScheduledTable: entry {id} scheduled ({} repeats)",
                entry.window.current_repeats
            );
        }
        inner.total_forwards += 1;
    }

    /// Record an attempt that was not accepted (e.g. queue dedup hit),
    /// so the entry backs off without consuming a repeat.
    pub fn note_attempt(&self, id: EntryId, now: DateTime<Utc>) {
        if let Some(entry) = self.inner.lock().entries.get_mut(&id) {
            entry.last_scheduled = Some(now);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot-consistent table statistics.
    pub fn statistics_at(&self, now: DateTime<Utc>) -> ScheduleStatistics {
        let inner = self.inner.lock();
        ScheduleStatistics {
            entries: inner.entries.len(),
            eligible_now: inner.entries.values().filter(|e| e.eligible(now)).count(),
            total_forwards: inner.total_forwards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{Context, Source};
    use chrono::TimeZone;

    fn caption_draft(text: &str) -> CaptionDraft {
        CaptionDraft::new(text, Priority::Normal, Source::Automation, Context::Automated)
    }

    #[test]
    fn test_once_window_containment() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let w = ScheduleWindow::immediate(start, 3600);
        assert!(!w.contains(start - Duration::seconds(1)));
        assert!(w.contains(start));
        assert!(w.contains(start + Duration::minutes(30)));
        assert!(w.contains(start + Duration::seconds(3600)));
        assert!(!w.contains(start + Duration::seconds(3601)));
    }

    #[test]
    fn test_daily_window_repeats_each_day() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let w = ScheduleWindow {
            start,
            end: Utc.with_ymd_and_hms(2024, 6, 30, 9, 0, 0).unwrap(),
            repeat: Repeat::Daily,
            max_repeats: 0,
            current_repeats: 0,
        };
        // In the morning window on a later day.
        assert!(w.contains(Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap()));
        // Outside the time of day.
        assert!(!w.contains(Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()));
        // Past the end date.
        assert!(!w.contains(Utc.with_ymd_and_hms(2024, 7, 1, 8, 30, 0).unwrap()));
    }

    #[test]
    fn test_weekly_mask() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        // Monday and Friday only.
        let mask = (1 << 1) | (1 << 5);
        let w = ScheduleWindow {
            start,
            end: Utc.with_ymd_and_hms(2024, 6, 30, 9, 0, 0).unwrap(),
            repeat: Repeat::Weekly(mask),
            max_repeats: 0,
            current_repeats: 0,
        };
        // 2024-06-03 is a Monday, 2024-06-04 a Tuesday.
        assert!(w.contains(Utc.with_ymd_and_hms(2024, 6, 3, 8, 30, 0).unwrap()));
        assert!(!w.contains(Utc.with_ymd_and_hms(2024, 6, 4, 8, 30, 0).unwrap()));
    }

    #[test]
    fn test_repeat_ceiling() {
        let table = ScheduledTable::new();
        let now = Utc::now();
        let mut window = ScheduleWindow::immediate(now, 3600);
        window.max_repeats = 2;
        let id = table
            .add_at(EntryDraft::caption(window, caption_draft("spot")), now)
            .unwrap();

        assert_eq!(table.due_captions_at(now, 0).len(), 1);
        table.note_scheduled(id, now);
        table.note_scheduled(id, now);
        // Ceiling reached: no longer eligible.
        assert!(table.due_captions_at(now, 0).is_empty());
        assert!(table.best_slide_at(now).is_none());
    }

    #[test]
    fn test_rejects_inverted_window() {
        let table = ScheduledTable::new();
        let now = Utc::now();
        let window = ScheduleWindow {
            start: now,
            end: now - Duration::seconds(10),
            repeat: Repeat::Once,
            max_repeats: 0,
            current_repeats: 0,
        };
        assert!(table.add_at(EntryDraft::caption(window, caption_draft("x")), now).is_err());
    }

    #[test]
    fn test_best_slide_prefers_priority_then_time_pressure() {
        let table = ScheduledTable::new();
        let now = Utc::now();

        let w = ScheduleWindow::immediate(now, 3600);
        let low = table
            .add_at(EntryDraft::slide(w, Priority::Low, Some(10)), now)
            .unwrap();
        let high = table
            .add_at(EntryDraft::slide(w, Priority::High, Some(20)), now)
            .unwrap();
        let _ = low;

        let (winner, slide) = table.best_slide_at(now).unwrap();
        assert_eq!(winner, high);
        assert_eq!(slide, Some(20));

        // Same priority: the window with more of its span still ahead
        // scores higher.
        let table2 = ScheduledTable::new();
        let nearly_spent = table2
            .add_at(EntryDraft::slide(ScheduleWindow::immediate(now - Duration::minutes(50), 3600), Priority::Normal, Some(1)), now)
            .unwrap();
        let fresh = table2
            .add_at(EntryDraft::slide(ScheduleWindow::immediate(now, 3600), Priority::Normal, Some(2)), now)
            .unwrap();
        let _ = (nearly_spent, fresh);
        let (_, slide) = table2.best_slide_at(now).unwrap();
        assert_eq!(slide, Some(2));
    }

    #[test]
    fn test_holdoff_suppresses_rapid_forwarding() {
        let table = ScheduledTable::new();
        let now = Utc::now();
        let id = table
            .add_at(
                EntryDraft::caption(ScheduleWindow::immediate(now, 3600), caption_draft("spot")),
                now,
            )
            .unwrap();

        assert_eq!(table.due_captions_at(now, 60).len(), 1);
        table.note_attempt(id, now);
        assert!(table.due_captions_at(now + Duration::seconds(30), 60).is_empty());
        assert_eq!(table.due_captions_at(now + Duration::seconds(60), 60).len(), 1);
    }

    #[test]
    fn test_statistics() {
        let table = ScheduledTable::new();
        let now = Utc::now();
        table
            .add_at(EntryDraft::caption(ScheduleWindow::immediate(now, 10), caption_draft("a")), now)
            .unwrap();
        table
            .add_at(
                EntryDraft::caption(
                    ScheduleWindow::immediate(now + Duration::hours(1), 10),
                    caption_draft("b"),
                ),
                now,
            )
            .unwrap();

        let stats = table.statistics_at(now);
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.eligible_now, 1);
    }
}
