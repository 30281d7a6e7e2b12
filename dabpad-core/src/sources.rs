//! Producer-side adapters.
//!
//! External integrations (automation systems, feeds, metadata
//! extractors) own their I/O and funnel into one submission surface:
//! the [`CaptionIngest`] trait. The source tag on the draft is the
//! sealed [`Source`](crate::queue::Source) enum.

use log::debug;

use crate::error::SubmitError;
use crate::queue::{CaptionDraft, CaptionId, CaptionQueue, Context, Priority, Source};

/// The single submission surface producers write to.
pub trait CaptionIngest {
    fn ingest(&self, draft: CaptionDraft) -> Result<CaptionId, SubmitError>;
}

impl CaptionIngest for CaptionQueue {
    fn ingest(&self, draft: CaptionDraft) -> Result<CaptionId, SubmitError> {
        self.submit(draft)
    }
}

/// Builds captions from raw now-playing strings as produced by audio
/// metadata extractors (`"Artist - Title"`).
pub struct NowPlayingSource;

impl NowPlayingSource {
    /// Parse a raw now-playing string into a caption draft.
    ///
    /// Returns `None` for empty input. A `" - "` separator splits
    /// artist and title into metadata; without one the whole string is
    /// the title.
    pub fn caption(raw: &str) -> Option<CaptionDraft> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut draft = CaptionDraft::new(
            format!("♪ {trimmed}"),
            Priority::Normal,
            Source::NowPlaying,
            Context::Music,
        );

        if let Some((artist, title)) = trimmed.split_once(" - ") {
            draft = draft
                .metadata("artist", artist.trim())
                .metadata("title", title.trim());
        } else {
            draft = draft.metadata("title", trimmed);
        }
        Some(draft)
    }

    /// Parse and submit a now-playing string in one step.
    pub fn feed(sink: &impl CaptionIngest, raw: &str) -> Result<CaptionId, SubmitError> {
        let draft = NowPlayingSource::caption(raw)
            .ok_or_else(|| SubmitError::Invalid("empty now-playing text".to_string()))?;
        debug!("NowPlayingSource: submitting {:?}", draft.text);
        sink.ingest(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;

    #[test]
    fn test_caption_with_artist_and_title() {
        let draft = NowPlayingSource::caption("Carabao - Made in Thailand").unwrap();
        assert_eq!(draft.text, "♪ Carabao - Made in Thailand");
        assert_eq!(draft.source, Source::NowPlaying);
        assert_eq!(draft.context, Context::Music);
        assert_eq!(draft.metadata.get("artist").map(String::as_str), Some("Carabao"));
        assert_eq!(
            draft.metadata.get("title").map(String::as_str),
            Some("Made in Thailand")
        );
    }

    #[test]
    fn test_caption_without_separator() {
        let draft = NowPlayingSource::caption("Station Jingle").unwrap();
        assert_eq!(draft.metadata.get("title").map(String::as_str), Some("Station Jingle"));
        assert!(!draft.metadata.contains_key("artist"));
    }

    #[test]
    fn test_empty_input() {
        assert!(NowPlayingSource::caption("   ").is_none());
    }

    #[test]
    fn test_feed_into_queue() {
        let queue = CaptionQueue::new(QueueConfig::default());
        NowPlayingSource::feed(&queue, "Artist - Song").unwrap();
        assert_eq!(queue.len(), 1);
        // Same track again inside the dedup window is a duplicate.
        assert_eq!(
            NowPlayingSource::feed(&queue, "Artist - Song"),
            Err(SubmitError::Duplicate)
        );
    }
}
