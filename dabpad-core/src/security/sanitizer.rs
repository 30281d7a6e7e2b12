//! Bounded text sanitization for caption and filename inputs.

/// Longest filename the sanitizer will produce, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

/// Characters replaced in filename mode.
const FILENAME_DANGEROUS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Strip control characters, keeping `\t`, `\n`, `\r` and anything at or
/// above 0x20.
pub fn strip_control(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c >= '\u{20}' || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Normalize arbitrary producer text: strip control characters, collapse
/// whitespace runs and trim.
pub fn sanitize_text(input: &str) -> String {
    let stripped = strip_control(input);
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape the six HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reduce an arbitrary string to a safe filename.
///
/// Separator and shell-significant characters become `_`, control
/// characters are dropped, the result is capped at 255 bytes on a
/// character boundary, and empty or dot-only names are replaced.
pub fn sanitize_filename(name: &str) -> String {
    let mut out: String = strip_control(name)
        .chars()
        .map(|c| {
            if FILENAME_DANGEROUS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    while out.len() > MAX_FILENAME_BYTES {
        out.pop();
    }

    let trimmed = out.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return "untitled".to_string();
    }
    trimmed.to_string()
}
