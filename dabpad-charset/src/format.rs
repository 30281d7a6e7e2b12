//! Dynamic Label Segment text formatting.
//!
//! A DLS caption has a hard byte budget on the wire (128 bytes by
//! default, counted in the target encoding). The formatter reduces text
//! in stages, losing information only at the last step:
//!
//! 1. collapse whitespace runs and trim
//! 2. replace common phrases and apply language-sensitive abbreviations
//! 3. truncate at the nearest word boundary and append an ellipsis
//!
//! Text carrying Thai is measured in Thai-profile bytes (one per
//! character); anything else is measured in UTF-8 bytes, since that is
//! what goes on the wire. Both checks and cuts use the same measure.

use crate::codec::{is_thai_text, target_encoded_len};

/// Default DLS byte budget.
pub const DEFAULT_DLS_BUDGET: usize = 128;

/// Bytes reserved for the trailing ellipsis when truncating.
const ELLIPSIS_RESERVE: usize = 3;

/// Truncation never cuts earlier than this fraction of the budget.
const TRUNCATE_FLOOR: f64 = 0.7;

/// English abbreviations, applied in order. Longer patterns come first
/// so that e.g. "without" is rewritten before "with" can match inside it.
const ENGLISH_ABBREVIATIONS: &[(&str, &str)] = &[
    ("information", "info"),
    ("without", "w/o"),
    ("with", "w/"),
    ("tomorrow", "tmrw"),
    ("tonight", "tonite"),
    ("today", "2day"),
    (" and ", " & "),
];

/// Thai abbreviations in common broadcast use.
const THAI_ABBREVIATIONS: &[(&str, &str)] = &[
    ("ข้อมูล", "ข้อม."),
    ("รายการ", "ราย."),
    ("โครงการ", "โครง."),
    ("กิจกรรม", "กิจ."),
    ("มหาวิทยาลัย", "ม."),
    ("จังหวัด", "จ."),
    ("ประเทศไทย", "ไทย"),
];

/// Stock phrases replaced by their compact on-air forms.
const COMMON_PHRASES: &[(&str, &str)] = &[
    ("Now Playing", "♪"),
    ("Breaking News", "BREAKING:"),
    ("Weather Update", "Weather:"),
    ("Traffic Alert", "Traffic:"),
    ("กำลังเล่น", "♪"),
    ("ข่าวด่วน", "ด่วน:"),
    ("สภาพอากาศ", "อากาศ:"),
    ("การจราจร", "จราจร:"),
];

/// Result of formatting a caption for DLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlsFormat {
    /// The formatted text, within the byte budget.
    pub text: String,
    /// Names of the reduction stages that changed the text.
    pub applied: Vec<&'static str>,
    /// True when the tail of the text was cut off.
    pub truncated: bool,
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply phrase replacements and abbreviations for the detected
/// language. Returns the rewritten text and whether anything matched.
pub fn apply_abbreviations(text: &str) -> (String, bool) {
    let mut out = text.to_string();
    let mut changed = false;

    for (pattern, replacement) in COMMON_PHRASES {
        if out.contains(pattern) {
            out = out.replace(pattern, replacement);
            changed = true;
        }
    }

    let rules = if is_thai_text(&out) {
        THAI_ABBREVIATIONS
    } else {
        ENGLISH_ABBREVIATIONS
    };
    for (pattern, replacement) in rules {
        if out.contains(pattern) {
            out = out.replace(pattern, replacement);
            changed = true;
        }
    }

    (out, changed)
}

/// Cut `text` to fit `budget` bytes in its target encoding, preferring
/// a word boundary within `[0.7 * budget, budget - 3]`, and append an
/// ellipsis.
fn truncate_to(text: &str, budget: usize, thai: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    // prefix[i] = wire bytes of chars[..i]: one per character in the
    // Thai profile, the UTF-8 width otherwise.
    let mut prefix = Vec::with_capacity(chars.len() + 1);
    prefix.push(0usize);
    for &c in &chars {
        let width = if thai { 1 } else { c.len_utf8() };
        prefix.push(prefix[prefix.len() - 1] + width);
    }

    let cap_bytes = budget.saturating_sub(ELLIPSIS_RESERVE);
    let floor_bytes = (budget as f64 * TRUNCATE_FLOOR) as usize;

    // Largest cut whose prefix fits under the reserve-adjusted budget.
    let mut max_cut = chars.len();
    while max_cut > 0 && prefix[max_cut] > cap_bytes {
        max_cut -= 1;
    }

    let mut cut = max_cut;
    for idx in (0..=max_cut).rev() {
        if prefix[idx] < floor_bytes {
            break;
        }
        let at_boundary = chars.get(idx) == Some(&' ')
            || (idx > 0 && matches!(chars[idx - 1], ',' | '.' | '!' | '?'));
        if at_boundary {
            cut = idx;
            break;
        }
    }

    let mut out: String = chars[..cut].iter().collect();
    out.truncate(out.trim_end().len());
    out.push('…');
    out
}

/// Format `text` for DLS transmission within `budget` bytes of its
/// target encoding.
pub fn format_for_dls(text: &str, budget: usize) -> DlsFormat {
    let mut applied = Vec::new();

    let collapsed = collapse_whitespace(text);
    if collapsed != text {
        applied.push("whitespace");
    }

    if target_encoded_len(&collapsed) <= budget {
        return DlsFormat {
            text: collapsed,
            applied,
            truncated: false,
        };
    }

    let (abbreviated, changed) = apply_abbreviations(&collapsed);
    if changed {
        applied.push("abbreviation");
    }

    if target_encoded_len(&abbreviated) <= budget {
        return DlsFormat {
            text: abbreviated,
            applied,
            truncated: false,
        };
    }

    applied.push("truncation");
    let thai = is_thai_text(&abbreviated);
    DlsFormat {
        text: truncate_to(&abbreviated, budget, thai),
        applied,
        truncated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        let out = format_for_dls("Weather: 28°C", 128);
        assert_eq!(out.text, "Weather: 28°C");
        assert!(out.applied.is_empty());
        assert!(!out.truncated);
    }

    #[test]
    fn test_whitespace_collapse() {
        let out = format_for_dls("  hello   world \n ok ", 128);
        assert_eq!(out.text, "hello world ok");
        assert_eq!(out.applied, vec!["whitespace"]);
    }

    #[test]
    fn test_exact_budget_accepted_without_truncation() {
        let text = "x".repeat(128);
        let out = format_for_dls(&text, 128);
        assert_eq!(out.text, text);
        assert!(!out.truncated);
    }

    #[test]
    fn test_one_byte_over_budget_triggers_reduction() {
        let text = "x".repeat(129);
        let out = format_for_dls(&text, 128);
        assert!(target_encoded_len(&out.text) <= 128);
        assert!(out.truncated);
        assert!(out.text.ends_with('…'));
    }

    #[test]
    fn test_non_thai_multibyte_measured_in_utf8_bytes() {
        // 70 characters but 140 UTF-8 bytes; without Thai content the
        // wire carries UTF-8, so this is over a 128-byte budget.
        let text = "é".repeat(70);
        let out = format_for_dls(&text, 128);
        assert!(out.truncated);
        assert!(out.text.len() <= 128);
        assert!(out.text.ends_with('…'));
    }

    #[test]
    fn test_abbreviation_avoids_truncation() {
        // "Now Playing" collapses to one character, bringing the text
        // under budget without losing information.
        let title = "a".repeat(20);
        let text = format!("Now Playing {title}");
        let out = format_for_dls(&text, 24);
        assert_eq!(out.text, format!("♪ {title}"));
        assert!(!out.truncated);
        assert!(out.applied.contains(&"abbreviation"));
    }

    #[test]
    fn test_english_abbreviation_order() {
        let (out, changed) = apply_abbreviations("tea without milk with sugar");
        assert!(changed);
        assert_eq!(out, "tea w/o milk w/ sugar");
    }

    #[test]
    fn test_thai_abbreviations_selected_for_thai_text() {
        let (out, changed) = apply_abbreviations("ข้อมูลจังหวัดเชียงใหม่");
        assert!(changed);
        assert_eq!(out, "ข้อม.จ.เชียงใหม่");
    }

    #[test]
    fn test_truncation_prefers_word_boundary() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel";
        let out = format_for_dls(text, 30);
        assert!(target_encoded_len(&out.text) <= 30);
        assert!(out.truncated);
        // The cut lands between words, not inside one.
        let body = out.text.trim_end_matches('…');
        assert!(text.starts_with(body));
        assert!(text.as_bytes()[body.len()] == b' ');
    }

    #[test]
    fn test_thai_truncation_stays_within_budget() {
        let text = "ข".repeat(200);
        let out = format_for_dls(&text, 128);
        assert!(target_encoded_len(&out.text) <= 128);
        assert!(out.truncated);
    }
}
