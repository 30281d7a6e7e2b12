//! Priority-aware caption queue with deduplication and repeat throttling.
//!
//! The queue keeps three structures that must mutate together and are
//! therefore guarded by a single mutex: the caption store, an ordered
//! index keyed on `(priority, -importance, -created_at, id)`, and the
//! dedup map from content hash to first-seen time. The ordered index
//! makes removal O(log n) with no rebuild and gives selection a stable,
//! deterministic iteration order.

pub mod caption;
pub mod criteria;
pub mod optimizer;
pub mod selector;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use parking_lot::Mutex;

use crate::config::QueueConfig;
use crate::error::SubmitError;
use crate::security::sanitizer::sanitize_text;

pub use caption::{content_hash, Caption, CaptionDraft, CaptionId, Context, Priority, Source};
pub use criteria::{default_score, SelectionCriteria};

/// Index key ordering captions by urgency, then importance, then
/// recency, with the id as the final deterministic tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    priority: u8,
    neg_importance_micro: i64,
    neg_created_ms: i64,
    id: CaptionId,
}

impl QueueKey {
    fn for_caption(caption: &Caption) -> Self {
        Self {
            priority: caption.priority.ordinal(),
            neg_importance_micro: -((caption.importance * 1_000_000.0) as i64),
            neg_created_ms: -caption.created_at.timestamp_millis(),
            id: caption.id,
        }
    }
}

/// Aggregate queue counters, consistent under the queue mutex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStatistics {
    pub queued: usize,
    pub submitted_total: u64,
    pub selected_total: u64,
    pub expired_total: u64,
    pub rejected_total: u64,
    pub by_priority: HashMap<Priority, usize>,
    pub by_source: HashMap<Source, usize>,
    pub average_importance: f64,
    pub oldest_created: Option<DateTime<Utc>>,
    pub newest_created: Option<DateTime<Utc>>,
}

struct QueueInner {
    entries: HashMap<CaptionId, Caption>,
    order: BTreeMap<QueueKey, CaptionId>,
    dedup: HashMap<String, DateTime<Utc>>,
    submitted_total: u64,
    selected_total: u64,
    expired_total: u64,
    rejected_total: u64,
}

/// Thread-safe caption queue.
pub struct CaptionQueue {
    inner: Mutex<QueueInner>,
    config: QueueConfig,
    next_id: AtomicU64,
}

impl CaptionQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                dedup: HashMap::new(),
                submitted_total: 0,
                selected_total: 0,
                expired_total: 0,
                rejected_total: 0,
            }),
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Submit a caption with the current wall clock.
    pub fn submit(&self, draft: CaptionDraft) -> Result<CaptionId, SubmitError> {
        self.submit_at(draft, Utc::now())
    }

    /// Submit a caption at an explicit instant.
    ///
    /// Never blocks beyond the queue mutex; the verdict is synchronous.
    pub fn submit_at(&self, draft: CaptionDraft, now: DateTime<Utc>) -> Result<CaptionId, SubmitError> {
        let text = sanitize_text(&draft.text);
        if text.is_empty() {
            self.inner.lock().rejected_total += 1;
            return Err(SubmitError::Invalid("empty text".to_string()));
        }

        let expires_at = draft
            .expires_at
            .unwrap_or_else(|| now + Duration::seconds(self.config.default_expiry_secs as i64));
        if expires_at < now {
            self.inner.lock().rejected_total += 1;
            return Err(SubmitError::Expired);
        }

        let hash = content_hash(&text);
        let is_thai = dabpad_charset::is_thai_text(&text);
        let mut metadata = draft.metadata;

        // Over-budget text goes through the length optimizer before it
        // is queued; the boundary is the byte budget in the target
        // encoding, the same measure the selection gate enforces.
        let text = if dabpad_charset::target_encoded_len(&text) > self.config.max_text_bytes {
            let outcome = optimizer::optimize(&text, self.config.max_text_bytes);
            metadata.insert("optimized".to_string(), "true".to_string());
            metadata.insert("original_len".to_string(), outcome.original_len.to_string());
            outcome.text
        } else {
            text
        };

        let mut inner = self.inner.lock();

        if let Some(first_seen) = inner.dedup.get(&hash) {
            if now - *first_seen < Duration::seconds(self.config.dedup_window_secs as i64) {
                inner.rejected_total += 1;
                debug!("CaptionQueue: duplicate submission suppressed (hash {hash})");
                return Err(SubmitError::Duplicate);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let caption = Caption {
            id,
            text,
            priority: draft.priority,
            source: draft.source,
            context: draft.context,
            created_at: now,
            expires_at,
            last_sent: None,
            send_count: 0,
            max_sends: draft.max_sends,
            importance: draft.importance.clamp(0.0, 1.0),
            content_hash: hash.clone(),
            is_thai,
            metadata,
        };

        inner.order.insert(QueueKey::for_caption(&caption), id);
        inner.entries.insert(id, caption);
        inner.dedup.insert(hash, now);
        inner.submitted_total += 1;

        debug!("CaptionQueue: accepted caption {id} (queued: {})", inner.entries.len());
        Ok(id)
    }

    /// Select the best caption for `criteria` with the current clock.
    pub fn select(&self, criteria: &SelectionCriteria) -> Option<Caption> {
        self.select_at(criteria, Utc::now())
    }

    /// Select the best eligible caption at an explicit instant.
    ///
    /// Updates the winner's `last_sent` and `send_count` as a side
    /// effect. Returning `None` is normal when nothing matches.
    pub fn select_at(&self, criteria: &SelectionCriteria, now: DateTime<Utc>) -> Option<Caption> {
        let mut inner = self.inner.lock();
        Self::sweep_locked(&mut inner, now, &self.config);

        let mut best: Option<(f64, CaptionId)> = None;
        for id in inner.order.values() {
            let caption = match inner.entries.get(id) {
                Some(c) => c,
                None => continue,
            };
            if !criteria.matches(caption, now) {
                continue;
            }
            let score = criteria.score(caption, now);
            // Strictly greater: on a tie the earlier entry in index
            // order wins, which is the newer caption.
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, *id));
            }
        }

        let (_, id) = best?;
        let caption = inner.entries.get_mut(&id)?;
        caption.last_sent = Some(now);
        caption.send_count += 1;
        let snapshot = caption.clone();

        if snapshot.max_sends > 0 && snapshot.send_count >= snapshot.max_sends {
            let key = QueueKey::for_caption(&snapshot);
            inner.entries.remove(&id);
            inner.order.remove(&key);
            debug!("CaptionQueue: caption {id} exhausted after {} sends", snapshot.send_count);
        }

        inner.selected_total += 1;
        Some(snapshot)
    }

    /// Remove a caption by id (operator eviction).
    pub fn remove(&self, id: CaptionId) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.remove(&id) {
            Some(caption) => {
                inner.order.remove(&QueueKey::for_caption(&caption));
                info!("CaptionQueue: removed caption {id}");
                true
            }
            None => false,
        }
    }

    /// Drop expired captions and age out stale dedup entries.
    ///
    /// Runs lazily on every select and eagerly from the background
    /// sweep tick.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// [`sweep`](Self::sweep) at an explicit instant.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.lock();
        Self::sweep_locked(&mut inner, now, &self.config)
    }

    fn sweep_locked(inner: &mut QueueInner, now: DateTime<Utc>, config: &QueueConfig) -> usize {
        let expired: Vec<(CaptionId, QueueKey)> = inner
            .entries
            .values()
            .filter(|c| now > c.expires_at)
            .map(|c| (c.id, QueueKey::for_caption(c)))
            .collect();

        for (id, key) in &expired {
            inner.entries.remove(id);
            inner.order.remove(key);
        }
        inner.expired_total += expired.len() as u64;

        let window = Duration::seconds(config.dedup_window_secs as i64);
        inner.dedup.retain(|_, first_seen| now - *first_seen < window);

        if !expired.is_empty() {
            debug!("CaptionQueue: swept {} expired captions", expired.len());
        }
        expired.len()
    }

    /// Number of captions currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot-consistent queue statistics.
    pub fn statistics(&self) -> QueueStatistics {
        let inner = self.inner.lock();
        let mut stats = QueueStatistics {
            queued: inner.entries.len(),
            submitted_total: inner.submitted_total,
            selected_total: inner.selected_total,
            expired_total: inner.expired_total,
            rejected_total: inner.rejected_total,
            ..Default::default()
        };

        let mut importance_sum = 0.0;
        for caption in inner.entries.values() {
            *stats.by_priority.entry(caption.priority).or_insert(0) += 1;
            *stats.by_source.entry(caption.source).or_insert(0) += 1;
            importance_sum += caption.importance;

            stats.oldest_created = Some(match stats.oldest_created {
                Some(t) if t <= caption.created_at => t,
                _ => caption.created_at,
            });
            stats.newest_created = Some(match stats.newest_created {
                Some(t) if t >= caption.created_at => t,
                _ => caption.created_at,
            });
        }
        if !inner.entries.is_empty() {
            stats.average_importance = importance_sum / inner.entries.len() as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> CaptionQueue {
        CaptionQueue::new(QueueConfig::default())
    }

    fn draft(text: &str, priority: Priority) -> CaptionDraft {
        CaptionDraft::new(text, priority, Source::Manual, Context::Automated)
    }

    #[test]
    fn test_submit_accepts_and_rejects_empty() {
        let q = queue();
        assert!(q.submit(draft("Now playing: Song A", Priority::Normal)).is_ok());
        assert_eq!(
            q.submit(draft("   ", Priority::Normal)),
            Err(SubmitError::Invalid("empty text".to_string()))
        );
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_dedup_window() {
        let q = queue();
        let t0 = Utc::now();

        assert!(q.submit_at(draft("Now playing: Song A", Priority::Normal), t0).is_ok());
        // Identical content inside the window is rejected.
        assert_eq!(
            q.submit_at(draft("Now playing: Song A", Priority::Normal), t0 + Duration::minutes(30)),
            Err(SubmitError::Duplicate)
        );
        // Past the window the same submission is accepted again.
        assert!(q
            .submit_at(draft("Now playing: Song A", Priority::Normal), t0 + Duration::seconds(3_601))
            .is_ok());
    }

    #[test]
    fn test_expired_submission_rejected_but_instant_expiry_accepted() {
        let q = queue();
        let now = Utc::now();

        let expired = draft("late", Priority::Normal).expires_at(now - Duration::seconds(1));
        assert_eq!(q.submit_at(expired, now), Err(SubmitError::Expired));

        // expires_at == now is accepted...
        let boundary = draft("on time", Priority::Normal).expires_at(now);
        assert!(q.submit_at(boundary, now).is_ok());
        assert_eq!(q.len(), 1);

        // ...and evicted one tick later.
        q.sweep_at(now + Duration::seconds(1));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_select_respects_priority() {
        let q = queue();
        let now = Utc::now();
        q.submit_at(draft("normal news", Priority::Normal), now).unwrap();
        q.submit_at(draft("urgent news", Priority::High), now).unwrap();

        let selected = q.select_at(&SelectionCriteria::default(), now).unwrap();
        assert_eq!(selected.text, "urgent news");
        assert_eq!(selected.send_count, 1);
        assert_eq!(selected.last_sent, Some(now));
    }

    #[test]
    fn test_priority_and_repeat_throttle() {
        let q = queue();
        let now = Utc::now();
        q.submit_at(draft("caption A", Priority::High), now).unwrap();
        let later = now + Duration::milliseconds(1);
        q.submit_at(draft("caption B", Priority::High), later).unwrap();

        let criteria = SelectionCriteria {
            min_repeat_interval_secs: 5,
            ..Default::default()
        };

        // Newer submission wins the tie on equal priority and importance
        // at equal age; here B is newer but A scores identically, so the
        // first select takes whichever scores highest. Both must come
        // out across the first two selects, then both are throttled.
        let first = q.select_at(&criteria, later).unwrap();
        let second = q.select_at(&criteria, later).unwrap();
        assert_ne!(first.id, second.id);
        assert!(q.select_at(&criteria, later).is_none());

        // After the interval both are eligible again.
        let after = later + Duration::seconds(5);
        assert!(q.select_at(&criteria, after).is_some());
    }

    #[test]
    fn test_tie_broken_by_newer_created_at() {
        let q = queue();
        let now = Utc::now();
        let a = q.submit_at(draft("same age A", Priority::Normal), now).unwrap();
        let b = q
            .submit_at(draft("same age B", Priority::Normal), now + Duration::seconds(1))
            .unwrap();
        let _ = a;

        // Evaluated at a shared later instant the newer caption has the
        // higher recency score, and on exact key ties the index order
        // puts the newer one first.
        let selected = q
            .select_at(&SelectionCriteria::default(), now + Duration::seconds(2))
            .unwrap();
        assert_eq!(selected.id, b);
    }

    #[test]
    fn test_select_none_when_no_candidate_matches() {
        let q = queue();
        let now = Utc::now();
        q.submit_at(draft("background filler", Priority::Background), now).unwrap();

        let criteria = SelectionCriteria {
            min_priority: Priority::Normal,
            ..Default::default()
        };
        assert!(q.select_at(&criteria, now).is_none());
    }

    #[test]
    fn test_max_sends_exhausts_caption() {
        let q = queue();
        let now = Utc::now();
        q.submit_at(draft("twice only", Priority::Normal).max_sends(2), now)
            .unwrap();

        let criteria = SelectionCriteria {
            min_repeat_interval_secs: 0,
            max_repeat_count: 0,
            ..Default::default()
        };
        assert!(q.select_at(&criteria, now).is_some());
        assert!(q.select_at(&criteria, now + Duration::seconds(1)).is_some());
        assert!(q.select_at(&criteria, now + Duration::seconds(2)).is_none());
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_exact_budget_not_optimized_one_over_is() {
        let q = queue();
        let exact = "x".repeat(128);
        let id = q.submit(draft(&exact, Priority::Normal)).unwrap();
        let over = "y".repeat(129);
        let id2 = q.submit(draft(&over, Priority::Normal)).unwrap();

        let criteria = SelectionCriteria {
            max_repeat_count: 0,
            min_repeat_interval_secs: 0,
            ..Default::default()
        };
        let mut seen = HashMap::new();
        while let Some(c) = q.select_at(&criteria, Utc::now()) {
            if seen.contains_key(&c.id) {
                break;
            }
            seen.insert(c.id, c);
        }

        let exact_caption = &seen[&id];
        assert_eq!(exact_caption.text, exact);
        assert!(!exact_caption.metadata.contains_key("optimized"));

        let over_caption = &seen[&id2];
        assert!(over_caption.encoded_len() <= 128);
        assert_eq!(over_caption.metadata.get("optimized").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_non_thai_multibyte_optimized_to_byte_budget_and_selectable() {
        let q = queue();
        let now = Utc::now();
        // 70 characters but 140 UTF-8 bytes: under the budget counted
        // in characters, over it counted in wire bytes.
        let text = "é".repeat(70);
        let id = q.submit_at(draft(&text, Priority::Normal), now).unwrap();

        let selected = q.select_at(&SelectionCriteria::default(), now).unwrap();
        assert_eq!(selected.id, id);
        assert!(selected.encoded_len() <= 128);
        assert!(selected.text.len() <= 128);
        assert_eq!(selected.metadata.get("optimized").map(String::as_str), Some("true"));
        assert_eq!(selected.metadata.get("original_len").map(String::as_str), Some("140"));
    }

    #[test]
    fn test_thai_budget_counted_in_encoded_bytes() {
        let q = queue();
        // 100 Thai characters = 300 UTF-8 bytes but 100 encoded bytes.
        let text = "ก".repeat(100);
        q.submit(draft(&text, Priority::Normal)).unwrap();
        let c = q.select(&SelectionCriteria::default()).unwrap();
        assert!(c.is_thai);
        assert_eq!(c.text, text);
        assert!(!c.metadata.contains_key("optimized"));
    }

    #[test]
    fn test_dedup_holds_inside_queue() {
        let q = queue();
        let now = Utc::now();
        q.submit_at(draft("one", Priority::Normal), now).unwrap();
        q.submit_at(draft("two", Priority::Normal), now).unwrap();
        q.submit_at(draft("three", Priority::Normal), now).unwrap();

        let stats = q.statistics();
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.submitted_total, 3);
        // Content hashes are distinct by construction.
        let inner = q.inner.lock();
        assert_eq!(inner.dedup.len(), 3);
    }

    #[test]
    fn test_statistics() {
        let q = queue();
        let now = Utc::now();
        q.submit_at(draft("a", Priority::High).importance(1.0), now).unwrap();
        q.submit_at(draft("b", Priority::Normal).importance(0.0), now + Duration::seconds(5))
            .unwrap();

        let stats = q.statistics();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.by_priority[&Priority::High], 1);
        assert_eq!(stats.by_priority[&Priority::Normal], 1);
        assert!((stats.average_importance - 0.5).abs() < 1e-9);
        assert_eq!(stats.oldest_created, Some(now));
        assert_eq!(stats.newest_created, Some(now + Duration::seconds(5)));
    }

    #[test]
    fn test_importance_clamped() {
        let q = queue();
        q.submit(draft("hot", Priority::Normal).importance(5.0)).unwrap();
        let c = q.select(&SelectionCriteria::default()).unwrap();
        assert_eq!(c.importance, 1.0);
    }

    #[test]
    fn test_remove() {
        let q = queue();
        let id = q.submit(draft("bye", Priority::Normal)).unwrap();
        assert!(q.remove(id));
        assert!(!q.remove(id));
        assert!(q.is_empty());
    }
}
