//! ETSI TS 101 756 Thai character set codec.
//!
//! The emitted byte stream starts with the Thai charset tag `0x0E`
//! followed by one byte per character:
//!
//! ```text
//! U+0E01..U+0E2E (consonants)   -> 0x01..0x2E
//! U+0E30..U+0E4F (vowels/signs) -> 0x30..0x4F
//! U+0E50..U+0E59 (digits)       -> 0x50..0x59
//! U+0E5A..U+0E5B (symbols)      -> 0x5A..0x5B
//! ASCII                         -> unchanged
//! anything else                 -> 0x3F ('?')
//! ```
//!
//! The Thai block shadows the overlapping ASCII byte values on decode:
//! a byte inside one of the Thai ranges always decodes to the Thai code
//! point, exactly as a receiver interpreting the Thai charset table
//! would. This keeps `encode(decode(x)) == x` for every stream the
//! encoder can produce.

use crate::error::DecodeError;

/// Charset identifier prepended to every Thai-profile byte stream.
pub const THAI_CHARSET_TAG: u8 = 0x0E;

/// Replacement byte for code points outside the supported ranges.
pub const REPLACEMENT: u8 = 0x3F;

/// First assigned code point of the Thai block (ก).
const THAI_FIRST: char = '\u{0E01}';

/// Last code point carried by the DAB Thai profile (๛, khomut).
const THAI_LAST: char = '\u{0E5B}';

/// Returns true if `c` is a Thai character carried by the DAB profile.
pub fn is_thai_char(c: char) -> bool {
    (THAI_FIRST..=THAI_LAST).contains(&c)
}

/// Returns true if `text` contains at least one Thai character.
pub fn is_thai_text(text: &str) -> bool {
    text.chars().any(is_thai_char)
}

/// Returns true if `c` is a Thai consonant (U+0E01..U+0E2E).
pub fn is_consonant(c: char) -> bool {
    ('\u{0E01}'..='\u{0E2E}').contains(&c)
}

/// Returns true if `c` is a Thai vowel or sign (U+0E30..U+0E4F).
pub fn is_vowel_sign(c: char) -> bool {
    ('\u{0E30}'..='\u{0E4F}').contains(&c)
}

/// Returns true if `c` is a Thai tone mark (U+0E48..U+0E4B).
pub fn is_tone_mark(c: char) -> bool {
    ('\u{0E48}'..='\u{0E4B}').contains(&c)
}

/// Returns true if `c` is a combining vowel rendered above or below the
/// base consonant (U+0E34..U+0E3A).
pub fn is_combining_vowel(c: char) -> bool {
    ('\u{0E34}'..='\u{0E3A}').contains(&c)
}

/// Returns true if rendering `text` needs mark positioning, i.e. it
/// contains any combining vowel or tone mark.
pub fn requires_complex_layout(text: &str) -> bool {
    text.chars().any(|c| is_vowel_sign(c) || is_tone_mark(c))
}

/// Map a single character to its Thai-profile byte.
///
/// Returns `None` for code points the profile cannot carry.
pub fn encode_char(c: char) -> Option<u8> {
    let cp = c as u32;
    match cp {
        0x0E01..=0x0E2E => Some((cp - 0x0E01 + 0x01) as u8),
        0x0E30..=0x0E4F => Some((cp - 0x0E30 + 0x30) as u8),
        0x0E50..=0x0E59 => Some((cp - 0x0E50 + 0x50) as u8),
        0x0E5A..=0x0E5B => Some((cp - 0x0E5A + 0x5A) as u8),
        _ if c.is_ascii() => Some(cp as u8),
        _ => None,
    }
}

/// Encode UTF-8 text into the Thai-profile byte stream, including the
/// leading charset tag.
///
/// Unsupported code points become [`REPLACEMENT`]; the mapping is total.
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.chars().count() + 1);
    out.push(THAI_CHARSET_TAG);
    for c in text.chars() {
        out.push(encode_char(c).unwrap_or(REPLACEMENT));
    }
    out
}

/// Number of payload bytes `text` occupies in the Thai profile,
/// excluding the charset tag.
///
/// Every character maps to exactly one byte, so this is the character
/// count rather than the UTF-8 length.
pub fn encoded_len(text: &str) -> usize {
    text.chars().count()
}

/// Number of payload bytes `text` occupies in its target encoding.
///
/// Text carrying Thai goes out in the Thai profile (one byte per
/// character); anything else goes out as-is, so its UTF-8 length is the
/// wire length. Budget checks must use this measure, never the
/// character count alone.
pub fn target_encoded_len(text: &str) -> usize {
    if is_thai_text(text) {
        encoded_len(text)
    } else {
        text.len()
    }
}

/// Map a single Thai-profile byte back to a character.
///
/// `0x3F` is the replacement byte and always reads back as `?`, even
/// though it also sits inside the vowel range (฿ shares the slot and is
/// part of the lossy boundary).
fn decode_byte(b: u8) -> char {
    let cp = match b {
        REPLACEMENT => '?' as u32,
        0x01..=0x2E => 0x0E01 + (b as u32 - 0x01),
        0x30..=0x4F => 0x0E30 + (b as u32 - 0x30),
        0x50..=0x59 => 0x0E50 + (b as u32 - 0x50),
        0x5A..=0x5B => 0x0E5A + (b as u32 - 0x5A),
        b if b.is_ascii() => b as u32,
        _ => '?' as u32,
    };
    char::from_u32(cp).unwrap_or('?')
}

/// Decode a Thai-profile byte stream (with leading tag) back to UTF-8.
///
/// `0x3F` decodes to `?`; the replacement is the only lossy point of the
/// codec.
pub fn decode(data: &[u8]) -> Result<String, DecodeError> {
    let (&tag, payload) = data.split_first().ok_or(DecodeError::Empty)?;
    if tag != THAI_CHARSET_TAG {
        return Err(DecodeError::MissingTag(tag));
    }
    Ok(payload.iter().map(|&b| decode_byte(b)).collect())
}
