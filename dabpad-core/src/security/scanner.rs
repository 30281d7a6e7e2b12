//! Magic-byte format detection and malicious-content scanning.
//!
//! File extensions and declared MIME types are advisory only; the byte
//! signature decides what a payload is. After format validation the body
//! is scanned for script and server-side-include markers that have no
//! business inside an image.

use serde::Serialize;

/// Image formats recognized by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Heif,
    Unknown,
}

impl ImageFormat {
    /// Canonical MIME type for the format.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Heif => "image/heif",
            ImageFormat::Unknown => "application/octet-stream",
        }
    }
}

/// PNG signature.
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Brands accepted inside a HEIF `ftyp` box.
const HEIF_BRANDS: [&[u8]; 5] = [b"heic", b"heix", b"hevc", b"hevx", b"mif1"];

/// Literal byte patterns that mark a payload as hostile.
const MALICIOUS_PATTERNS: [&[u8]; 7] = [
    b"<script",
    b"javascript:",
    b"vbscript:",
    b"data:text/html",
    b"<?php",
    b"<?=",
    b"<!--#",
];

/// Risk added when a malicious pattern is found.
const PATTERN_RISK: f64 = 0.8;

/// Risk added when the payload exceeds the size warning threshold.
const OVERSIZE_RISK: f64 = 0.2;

/// Payloads above this size draw a non-fatal warning.
const SIZE_WARNING_BYTES: usize = 50 * 1024 * 1024;

/// Detect the image format from the payload's magic bytes.
pub fn detect_format(data: &[u8]) -> ImageFormat {
    if data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return ImageFormat::Jpeg;
    }
    if data.len() >= 8 && data[..8] == PNG_MAGIC {
        return ImageFormat::Png;
    }
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return ImageFormat::WebP;
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        let brand: &[u8] = &data[8..12];
        if HEIF_BRANDS.iter().any(|b| brand == *b) {
            return ImageFormat::Heif;
        }
    }
    ImageFormat::Unknown
}

/// Validate the whole payload against a format's structural markers.
///
/// This is stricter than [`detect_format`]: a JPEG must also carry the
/// `FF D9` end-of-image trailer.
pub fn validate_format(data: &[u8], format: ImageFormat) -> bool {
    match format {
        ImageFormat::Jpeg => {
            detect_format(data) == ImageFormat::Jpeg
                && data.len() >= 4
                && data[data.len() - 2] == 0xFF
                && data[data.len() - 1] == 0xD9
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Heif => detect_format(data) == format,
        ImageFormat::Unknown => false,
    }
}

/// Result of a content scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub is_safe: bool,
    /// Patterns that were found in the body.
    pub threats: Vec<String>,
    pub warnings: Vec<String>,
    /// 0.0 = clean, clamped to at most 1.0.
    pub risk_score: f64,
}

fn contains_pattern(data: &[u8], pattern: &[u8]) -> bool {
    data.len() >= pattern.len() && data.windows(pattern.len()).any(|w| w == pattern)
}

/// Scan a payload body for malicious patterns and size anomalies.
pub fn scan(data: &[u8]) -> ScanReport {
    let mut report = ScanReport {
        is_safe: true,
        threats: Vec::new(),
        warnings: Vec::new(),
        risk_score: 0.0,
    };

    for pattern in MALICIOUS_PATTERNS {
        if contains_pattern(data, pattern) {
            report
                .threats
                .push(String::from_utf8_lossy(pattern).into_owned());
        }
    }
    if !report.threats.is_empty() {
        report.is_safe = false;
        report.risk_score += PATTERN_RISK;
    }

    if data.len() > SIZE_WARNING_BYTES {
        report
            .warnings
            .push(format!("payload is {} bytes", data.len()));
        report.risk_score += OVERSIZE_RISK;
    }

    report.risk_score = report.risk_score.min(1.0);
    report
}
