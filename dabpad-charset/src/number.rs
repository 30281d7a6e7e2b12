//! Thai number formatting.

use serde::{Deserialize, Serialize};

/// How numbers are rendered in caption text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberFormat {
    /// Western digits 0-9.
    Western,
    /// Thai digits ๐-๙ (U+0E50..U+0E59).
    ThaiDigits,
    /// Thai number words for 0..99, Thai digits beyond.
    ThaiWords,
}

const THAI_UNITS: [&str; 10] = [
    "ศูนย์", "หนึ่ง", "สอง", "สาม", "สี่", "ห้า", "หก", "เจ็ด", "แปด", "เก้า",
];

/// Replace every ASCII digit with the corresponding Thai digit.
fn to_thai_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '0'..='9' => {
                let cp = 0x0E50 + (c as u32 - '0' as u32);
                char::from_u32(cp).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Spell out 0..=99 in Thai words, using the irregular forms เอ็ด for a
/// trailing one and ยี่สิบ for twenty.
fn to_thai_words(n: u8) -> String {
    debug_assert!(n <= 99);
    let tens = (n / 10) as usize;
    let ones = (n % 10) as usize;

    match (tens, ones) {
        (0, o) => THAI_UNITS[o].to_string(),
        (t, o) => {
            let mut out = match t {
                1 => String::from("สิบ"),
                2 => String::from("ยี่สิบ"),
                _ => format!("{}สิบ", THAI_UNITS[t]),
            };
            match o {
                0 => {}
                1 => out.push_str("เอ็ด"),
                _ => out.push_str(THAI_UNITS[o]),
            }
            out
        }
    }
}

/// Format `n` according to `format`.
pub fn format_number(n: i64, format: NumberFormat) -> String {
    match format {
        NumberFormat::Western => n.to_string(),
        NumberFormat::ThaiDigits => to_thai_digits(&n.to_string()),
        NumberFormat::ThaiWords => {
            let magnitude = n.unsigned_abs();
            if magnitude > 99 {
                return to_thai_digits(&n.to_string());
            }
            let words = to_thai_words(magnitude as u8);
            if n < 0 {
                format!("ลบ{words}")
            } else {
                words
            }
        }
    }
}
