//! Error types for the Thai-profile codec.

use thiserror::Error;

/// Errors that can occur while decoding a DAB Thai-profile byte stream.
///
/// Encoding is a total function and cannot fail; unsupported code points
/// are replaced with `0x3F` on the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The byte stream is empty.
    #[error("empty byte stream")]
    Empty,

    /// The byte stream does not start with the Thai charset tag.
    #[error("missing Thai charset tag: expected 0x0E, got 0x{0:02X}")]
    MissingTag(u8),
}
