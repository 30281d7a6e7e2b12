//! Caption types: the DLS message, its priority, source and context tags.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::security::sanitizer::sanitize_text;

/// Identifier assigned to an accepted caption.
pub type CaptionId = u64;

/// Caption priority. Lower discriminant means more urgent, so the
/// derived ordering ranks `Emergency` first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Priority {
    Emergency = 0,
    High = 1,
    Normal = 2,
    Low = 3,
    Background = 4,
}

impl Priority {
    /// Numeric rank, 0 = most urgent.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Scoring weight: `(4 - ordinal) / 4`, so Emergency scores 1.0 and
    /// Background 0.0.
    pub fn weight(self) -> f64 {
        (4 - self.ordinal()) as f64 / 4.0
    }
}

/// Where a caption came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Manual,
    Rss,
    SocialMedia,
    NowPlaying,
    Weather,
    Traffic,
    News,
    Automation,
    EmergencySystem,
}

/// Broadcast context a caption belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Context {
    LiveShow,
    Automated,
    News,
    Music,
    Talk,
    Commercial,
    Emergency,
    Maintenance,
    OffAir,
}

/// Deterministic content hash over normalized caption text.
pub fn content_hash(text: &str) -> String {
    let normalized = sanitize_text(text);
    let mut hasher = Sha1::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// A caption submission, before the queue assigns identity and clocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionDraft {
    pub text: String,
    pub priority: Priority,
    pub source: Source,
    pub context: Context,
    /// Relevance weight in `[0, 1]`; clamped on intake.
    pub importance: f64,
    /// 0 = unlimited sends.
    pub max_sends: u32,
    /// Defaults to the configured queue TTL when absent.
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

impl CaptionDraft {
    pub fn new(text: impl Into<String>, priority: Priority, source: Source, context: Context) -> Self {
        Self {
            text: text.into(),
            priority,
            source,
            context,
            importance: 0.5,
            max_sends: 0,
            expires_at: None,
            metadata: HashMap::new(),
        }
    }

    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn max_sends(mut self, max_sends: u32) -> Self {
        self.max_sends = max_sends;
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A caption held by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caption {
    pub id: CaptionId,
    pub text: String,
    pub priority: Priority,
    pub source: Source,
    pub context: Context,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_sent: Option<DateTime<Utc>>,
    pub send_count: u32,
    /// 0 = unlimited.
    pub max_sends: u32,
    pub importance: f64,
    pub content_hash: String,
    pub is_thai: bool,
    pub metadata: HashMap<String, String>,
}

impl Caption {
    /// Byte length of the text in its target encoding: one byte per
    /// character in the Thai profile, UTF-8 length otherwise.
    pub fn encoded_len(&self) -> usize {
        dabpad_charset::target_encoded_len(&self.text)
    }
}
