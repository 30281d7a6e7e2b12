//! Error types for the PAD content engine.
//!
//! Submissions and ingests return verdicts synchronously; routine
//! rejections (duplicates, expired content) are part of normal operation
//! and are logged at `info`, never `error`.

use thiserror::Error;

/// Why a caption submission was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The caption text is empty after trimming, or a field is out of range.
    #[error("invalid caption: {0}")]
    Invalid(String),

    /// The caption would expire before it was created.
    #[error("caption expires before its creation time")]
    Expired,

    /// The same content was submitted within the dedup window.
    #[error("duplicate content within the dedup window")]
    Duplicate,
}

/// Why a scheduled entry was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The window ends before it starts.
    #[error("window ends before it starts")]
    InvertedWindow,
}

/// Why a slide ingest was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The origin path failed traversal or allow-root checks.
    #[error("path rejected: {0}")]
    PathUnsafe(String),

    /// The magic bytes match no supported image format.
    #[error("unrecognized image format")]
    BadFormat,

    /// The content scanner found a malicious pattern.
    #[error("unsafe content: {0}")]
    UnsafeContent(String),

    /// The image library failed to decode the payload.
    #[error("image decode failed: {0}")]
    DecodeFailed(String),

    /// No quality level produced output within the byte budget.
    #[error("transcoded size {size} exceeds byte budget {budget} at every quality level")]
    TooLarge { size: usize, budget: usize },

    /// A slide with the same content hash is already in the carousel.
    #[error("duplicate image content")]
    Duplicate,

    /// Reading the file from disk failed.
    #[error("read failed: {0}")]
    Io(String),
}
