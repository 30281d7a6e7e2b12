//! Selection criteria and composite scoring for caption selection.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::queue::caption::{Caption, Priority, Source};

/// Weight of the priority component in the composite score.
const W_PRIORITY: f64 = 0.4;
/// Weight of the importance component.
const W_IMPORTANCE: f64 = 0.3;
/// Weight of the recency component.
const W_RECENCY: f64 = 0.2;
/// Weight of the repeat penalty component.
const W_REPEAT: f64 = 0.1;
/// Recency half-life parameter, in hours.
const RECENCY_DECAY_HOURS: f64 = 24.0;
/// Score multiplier for non-Thai candidates under `prefer_thai`.
const NON_THAI_FACTOR: f64 = 0.8;

/// User-supplied scoring override.
pub type ScoreFn = Arc<dyn Fn(&Caption, DateTime<Utc>) -> f64 + Send + Sync>;

/// Filters and knobs applied by [`select`](crate::queue::CaptionQueue::select).
#[derive(Clone)]
pub struct SelectionCriteria {
    /// Least urgent priority accepted.
    pub min_priority: Priority,
    /// Most urgent priority accepted.
    pub max_priority: Priority,
    /// When non-empty, only these sources are eligible.
    pub allow_sources: Vec<Source>,
    /// Sources never eligible.
    pub deny_sources: Vec<Source>,
    /// Maximum caption age in seconds.
    pub max_age_secs: u64,
    /// When false, only never-sent captions are eligible.
    pub allow_repeats: bool,
    /// Upper bound on sends through this criteria set; 0 = unlimited.
    pub max_repeat_count: u32,
    /// Minimum gap between sends of the same caption, in seconds.
    pub min_repeat_interval_secs: u64,
    /// Byte budget in the target encoding.
    pub max_text_bytes: usize,
    /// Penalize non-Thai candidates.
    pub prefer_thai: bool,
    /// Optional scoring override.
    pub scoring: Option<ScoreFn>,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            min_priority: Priority::Background,
            max_priority: Priority::Emergency,
            allow_sources: Vec::new(),
            deny_sources: Vec::new(),
            max_age_secs: 3_600,
            allow_repeats: true,
            max_repeat_count: 3,
            min_repeat_interval_secs: 300,
            max_text_bytes: 128,
            prefer_thai: false,
            scoring: None,
        }
    }
}

impl fmt::Debug for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionCriteria")
            .field("min_priority", &self.min_priority)
            .field("max_priority", &self.max_priority)
            .field("allow_sources", &self.allow_sources)
            .field("deny_sources", &self.deny_sources)
            .field("max_age_secs", &self.max_age_secs)
            .field("allow_repeats", &self.allow_repeats)
            .field("max_repeat_count", &self.max_repeat_count)
            .field("min_repeat_interval_secs", &self.min_repeat_interval_secs)
            .field("max_text_bytes", &self.max_text_bytes)
            .field("prefer_thai", &self.prefer_thai)
            .field("scoring", &self.scoring.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl SelectionCriteria {
    /// The eligibility gate: every condition must hold.
    pub fn matches(&self, caption: &Caption, now: DateTime<Utc>) -> bool {
        if now > caption.expires_at {
            return false;
        }

        let ord = caption.priority.ordinal();
        if ord < self.max_priority.ordinal() || ord > self.min_priority.ordinal() {
            return false;
        }

        if !self.allow_sources.is_empty() && !self.allow_sources.contains(&caption.source) {
            return false;
        }
        if self.deny_sources.contains(&caption.source) {
            return false;
        }

        if now - caption.created_at > Duration::seconds(self.max_age_secs as i64) {
            return false;
        }

        if caption.max_sends > 0 && caption.send_count >= caption.max_sends {
            return false;
        }
        if self.max_repeat_count > 0 && caption.send_count >= self.max_repeat_count {
            return false;
        }
        if !self.allow_repeats && caption.send_count > 0 {
            return false;
        }

        if caption.send_count > 0 {
            if let Some(last_sent) = caption.last_sent {
                if now - last_sent < Duration::seconds(self.min_repeat_interval_secs as i64) {
                    return false;
                }
            }
        }

        if caption.encoded_len() > self.max_text_bytes {
            return false;
        }

        true
    }

    /// Composite score for `caption`, applying the custom scoring
    /// function when present and the Thai preference factor.
    pub fn score(&self, caption: &Caption, now: DateTime<Utc>) -> f64 {
        let mut score = match &self.scoring {
            Some(scoring) => scoring(caption, now),
            None => default_score(caption, now),
        };
        if self.prefer_thai && !caption.is_thai {
            score *= NON_THAI_FACTOR;
        }
        score
    }
}

/// Default composite score:
/// `0.4·priority + 0.3·importance + 0.2·recency + 0.1·repeat_penalty`
/// with `recency = exp(-age_hours / 24)` and
/// `repeat_penalty = 1 / (1 + send_count / 2)`.
pub fn default_score(caption: &Caption, now: DateTime<Utc>) -> f64 {
    let age_hours = (now - caption.created_at).num_seconds().max(0) as f64 / 3_600.0;
    let recency = (-age_hours / RECENCY_DECAY_HOURS).exp();
    let repeat_penalty = 1.0 / (1.0 + caption.send_count as f64 / 2.0);

    W_PRIORITY * caption.priority.weight()
        + W_IMPORTANCE * caption.importance
        + W_RECENCY * recency
        + W_REPEAT * repeat_penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::caption::{content_hash, Context};
    use std::collections::HashMap;

    fn caption(priority: Priority, now: DateTime<Utc>) -> Caption {
        Caption {
            id: 1,
            text: "test".to_string(),
            priority,
            source: Source::Manual,
            context: Context::Automated,
            created_at: now,
            expires_at: now + Duration::hours(24),
            last_sent: None,
            send_count: 0,
            max_sends: 0,
            importance: 0.5,
            content_hash: content_hash("test"),
            is_thai: false,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_priority_band() {
        let now = Utc::now();
        let criteria = SelectionCriteria {
            min_priority: Priority::Normal,
            max_priority: Priority::Emergency,
            ..Default::default()
        };
        assert!(criteria.matches(&caption(Priority::Emergency, now), now));
        assert!(criteria.matches(&caption(Priority::Normal, now), now));
        assert!(!criteria.matches(&caption(Priority::Low, now), now));
    }

    #[test]
    fn test_source_allow_and_deny() {
        let now = Utc::now();
        let mut c = caption(Priority::Normal, now);
        c.source = Source::Rss;

        let allow = SelectionCriteria {
            allow_sources: vec![Source::Manual],
            ..Default::default()
        };
        assert!(!allow.matches(&c, now));

        let deny = SelectionCriteria {
            deny_sources: vec![Source::Rss],
            ..Default::default()
        };
        assert!(!deny.matches(&c, now));
    }

    #[test]
    fn test_max_age() {
        let now = Utc::now();
        let mut c = caption(Priority::Normal, now - Duration::hours(2));
        c.expires_at = now + Duration::hours(1);
        let criteria = SelectionCriteria::default();
        assert!(!criteria.matches(&c, now));
    }

    #[test]
    fn test_repeat_interval() {
        let now = Utc::now();
        let mut c = caption(Priority::Normal, now);
        c.send_count = 1;
        c.last_sent = Some(now - Duration::seconds(10));

        let criteria = SelectionCriteria {
            min_repeat_interval_secs: 60,
            ..Default::default()
        };
        assert!(!criteria.matches(&c, now));

        c.last_sent = Some(now - Duration::seconds(61));
        assert!(criteria.matches(&c, now));
    }

    #[test]
    fn test_no_repeats() {
        let now = Utc::now();
        let mut c = caption(Priority::Normal, now);
        c.send_count = 1;
        c.last_sent = Some(now - Duration::hours(1));
        let criteria = SelectionCriteria {
            allow_repeats: false,
            ..Default::default()
        };
        assert!(!criteria.matches(&c, now));
    }

    #[test]
    fn test_exhausted_caption_excluded() {
        let now = Utc::now();
        let mut c = caption(Priority::Normal, now);
        c.max_sends = 2;
        c.send_count = 2;
        assert!(!SelectionCriteria::default().matches(&c, now));
    }

    #[test]
    fn test_higher_priority_scores_higher() {
        let now = Utc::now();
        let high = caption(Priority::High, now);
        let low = caption(Priority::Low, now);
        assert!(default_score(&high, now) > default_score(&low, now));
    }

    #[test]
    fn test_recency_decays() {
        let now = Utc::now();
        let fresh = caption(Priority::Normal, now);
        let mut stale = caption(Priority::Normal, now - Duration::hours(12));
        stale.expires_at = now + Duration::hours(24);
        assert!(default_score(&fresh, now) > default_score(&stale, now));
    }

    #[test]
    fn test_repeat_penalty() {
        let now = Utc::now();
        let unsent = caption(Priority::Normal, now);
        let mut sent = caption(Priority::Normal, now);
        sent.send_count = 4;
        assert!(default_score(&unsent, now) > default_score(&sent, now));
    }

    #[test]
    fn test_prefer_thai_discounts_non_thai() {
        let now = Utc::now();
        let c = caption(Priority::Normal, now);
        let criteria = SelectionCriteria {
            prefer_thai: true,
            ..Default::default()
        };
        let plain = SelectionCriteria::default();
        let discounted = criteria.score(&c, now);
        let baseline = plain.score(&c, now);
        assert!((discounted - baseline * 0.8).abs() < 1e-9);
    }
}
