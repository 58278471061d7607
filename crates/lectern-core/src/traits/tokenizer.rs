//! Tokenizer trait used to measure and cut chunks.

/// Token encode/decode capability.
///
/// Decoding may fail when a token slice ends in the middle of a multi-byte
/// character; implementations return `None` in that case instead of
/// replacing bytes, so callers can look for a clean boundary.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Decode token ids back into text.
    fn decode(&self, tokens: &[u32]) -> Option<String>;

    /// Count tokens in `text`.
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }

    /// Human-readable tokenizer name.
    fn name(&self) -> &str;
}
