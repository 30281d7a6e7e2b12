//! Defensive input layer: path validation, magic-byte scanning and text
//! sanitization.
//!
//! Everything a producer hands to the engine passes through here before
//! it can reach a queue: file paths are checked against traversal and an
//! allow-list, image payloads against their format signatures and a
//! malicious-pattern list, and text against control characters.

pub mod path;
pub mod sanitizer;
pub mod scanner;

pub use path::PathValidator;
pub use sanitizer::{escape_html, sanitize_filename, sanitize_text};
pub use scanner::{detect_format, scan, validate_format, ImageFormat, ScanReport};
