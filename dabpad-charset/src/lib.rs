//! Thai-profile text engine for DAB+ Programme-Associated Data.
//!
//! This crate implements the text side of a DAB+ PAD encoder for Thai
//! broadcasts:
//!
//! - [`codec`]: the ETSI TS 101 756 Thai character set byte stream
//!   (charset tag `0x0E` followed by a direct code-point map)
//! - [`layout`]: per-glyph width metrics and pixel-budget line wrapping
//!   for DAB receiver displays
//! - [`format`]: Dynamic Label Segment formatting: whitespace collapse,
//!   language-sensitive abbreviation, word-boundary truncation to a byte
//!   budget
//! - [`number`]: Western digits, Thai digits and Thai number words
//! - [`calendar`]: Buddhist Era conversion, Thai month/day names and the
//!   national holiday table
//! - [`culture`]: advisory content review for broadcast (inappropriate
//!   language, royal and religious references)
//!
//! # Example
//!
//! ```rust
//! use dabpad_charset::codec;
//!
//! let encoded = codec::encode("สวัสดี");
//! assert_eq!(encoded, vec![0x0E, 0x2A, 0x27, 0x31, 0x2A, 0x14, 0x35]);
//!
//! let decoded = codec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "สวัสดี");
//! ```

pub mod calendar;
pub mod codec;
pub mod culture;
pub mod error;
pub mod format;
pub mod layout;
pub mod number;

pub use calendar::{buddhist_date, ce_to_be, is_holy_day, BuddhistDate, HolyDay};
pub use codec::{
    decode, encode, encoded_len, is_thai_char, is_thai_text, requires_complex_layout,
    target_encoded_len, THAI_CHARSET_TAG,
};
pub use culture::{review, CulturalReview};
pub use error::DecodeError;
pub use format::{format_for_dls, DlsFormat, DEFAULT_DLS_BUDGET};
pub use layout::{analyze, text_width, wrap, TextLayout};
pub use number::{format_number, NumberFormat};
