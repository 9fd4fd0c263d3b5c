//! Token estimation for savings accounting.
//!
//! The release pipeline never tokenizes anything itself: it asks a
//! [`TokenEstimator`] for a rough count. [`ByteRatioEstimator`] is the default
//! (about one token per four UTF-8 bytes). Any `Fn(&str) -> usize` closure
//! also works, so hosts with a real tokenizer can plug it in directly.

/// Default UTF-8 bytes per token.
pub const DEFAULT_BYTES_PER_TOKEN: f64 = 4.0;

/// Estimates how many tokens a string occupies in the context window.
///
/// Implementations must return 0 for empty input.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

impl<F> TokenEstimator for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate(&self, text: &str) -> usize {
        self(text)
    }
}

/// Fixed-ratio estimator: `round(bytes / bytes_per_token)`.
#[derive(Debug, Clone, Copy)]
pub struct ByteRatioEstimator {
    bytes_per_token: f64,
}

impl ByteRatioEstimator {
    /// Non-positive or non-finite ratios fall back to
    /// [`DEFAULT_BYTES_PER_TOKEN`].
    pub fn new(bytes_per_token: f64) -> Self {
        let bytes_per_token = if bytes_per_token.is_finite() && bytes_per_token > 0.0 {
            bytes_per_token
        } else {
            DEFAULT_BYTES_PER_TOKEN
        };
        Self { bytes_per_token }
    }

    pub fn bytes_per_token(&self) -> f64 {
        self.bytes_per_token
    }
}

impl Default for ByteRatioEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_BYTES_PER_TOKEN)
    }
}

impl TokenEstimator for ByteRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.len() as f64 / self.bytes_per_token).round() as usize
    }
}
