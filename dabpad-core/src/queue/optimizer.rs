//! Caption length optimization against the DLS byte budget.
//!
//! Thin wrapper over the charset formatter that reports what happened:
//! which reduction stages ran, the before/after byte counts, and whether
//! any information was lost. Lengths use the same measure the budget is
//! enforced in: Thai-profile bytes for Thai text, UTF-8 bytes otherwise.

use dabpad_charset::{format, target_encoded_len};

/// Outcome of a length optimization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    /// The optimized text, within the byte budget.
    pub text: String,
    /// Target-encoding byte length before optimization.
    pub original_len: usize,
    /// Target-encoding byte length after optimization.
    pub optimized_len: usize,
    /// `optimized_len / original_len`.
    pub compression_ratio: f64,
    /// Reduction stages that changed the text.
    pub applied: Vec<&'static str>,
    /// False when the tail was truncated away.
    pub lossless: bool,
}

/// Reduce `text` to fit `budget` bytes of its target encoding.
pub fn optimize(text: &str, budget: usize) -> OptimizationOutcome {
    let original_len = target_encoded_len(text);
    let formatted = format::format_for_dls(text, budget);
    let optimized_len = target_encoded_len(&formatted.text);

    OptimizationOutcome {
        lossless: !formatted.truncated,
        compression_ratio: if original_len > 0 {
            optimized_len as f64 / original_len as f64
        } else {
            1.0
        },
        text: formatted.text,
        original_len,
        optimized_len,
        applied: formatted.applied,
    }
}
