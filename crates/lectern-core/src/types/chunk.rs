//! Token-bounded text chunks.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A bounded slice of a document's text, the unit of work sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Zero-based position of this chunk within its document.
    pub index: usize,
    /// Chunk text, trimmed of surrounding whitespace.
    pub text: String,
    /// Span of the source tokenization this chunk covers.
    pub token_range: Range<usize>,
}

impl TextChunk {
    /// Create a new chunk.
    pub fn new(index: usize, text: impl Into<String>, token_range: Range<usize>) -> Self {
        Self {
            index,
            text: text.into(),
            token_range,
        }
    }

    /// Number of tokens this chunk covers, including surrounding whitespace
    /// and any whitespace-only run folded into it.
    pub fn token_count(&self) -> usize {
        self.token_range.len()
    }
}
