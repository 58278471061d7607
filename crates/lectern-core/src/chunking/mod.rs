//! Token-aware chunking of extracted lecture text.
//!
//! Text is tokenized once. Tokens accumulate into a working buffer; when the
//! buffer reaches the budget it is decoded and cut at the last sentence
//! terminator or newline if one falls within the trailing 30% of the
//! buffer's characters, otherwise at the full buffer length. The remainder
//! carries into the next buffer, so no token is dropped or repeated.
//!
//! Pieces that trim to nothing are not emitted. Their tokens fold into the
//! range of the next chunk, or of the last chunk at the end of the text, so
//! the emitted ranges stay contiguous and cover every token.

mod tiktoken;

pub use tiktoken::TiktokenTokenizer;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::traits::Tokenizer;
use crate::types::TextChunk;

/// Default chunk budget in tokens.
pub const DEFAULT_CHUNK_TOKENS: usize = 1800;

/// A break candidate must sit beyond this fraction of the buffer.
const BREAK_WINDOW: f64 = 0.7;

/// Splits text into token-bounded chunks.
#[derive(Clone)]
pub struct Chunker {
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
}

/// Token counts at which the buffer decodes cleanly, with the byte length of
/// the decoded prefix at each.
struct DecodedBuffer {
    text: String,
    marks: Vec<(usize, usize)>,
}

impl Chunker {
    /// Create a chunker with the given token budget (at least one token).
    pub fn new(tokenizer: Arc<dyn Tokenizer>, max_tokens: usize) -> Self {
        Self {
            tokenizer,
            max_tokens: max_tokens.max(1),
        }
    }

    /// Token budget per chunk.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Split `text` into ordered chunks.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let tokens = self.tokenizer.encode(text);
        let mut chunks = Vec::new();
        let mut start = 0;

        for end in 0..tokens.len() {
            if end - start < self.max_tokens {
                continue;
            }
            // No clean boundary yet means one character spans the whole
            // buffer; keep growing until it decodes.
            if let Some(cut) = self.break_point(&tokens[start..end]) {
                start += cut;
                self.emit(&mut chunks, &tokens, start);
            }
        }

        if start < tokens.len() {
            self.emit(&mut chunks, &tokens, tokens.len());
        }
        if let Some(last) = chunks.last_mut() {
            last.token_range.end = tokens.len();
        }

        debug!(
            tokens = tokens.len(),
            chunks = chunks.len(),
            max_tokens = self.max_tokens,
            "Split text into chunks"
        );
        chunks
    }

    /// Number of leading tokens of `buffer` that form the next chunk.
    fn break_point(&self, buffer: &[u32]) -> Option<usize> {
        let decoded = self.decode_marks(buffer);
        let &(clean_len, _) = decoded.marks.last()?;

        let text = decoded.text.as_str();
        let total_chars = text.chars().count() as f64;
        let qualifies = |byte_idx: usize| {
            text[..byte_idx].chars().count() as f64 > total_chars * BREAK_WINDOW
        };

        let break_byte = text
            .rfind('.')
            .filter(|&i| qualifies(i))
            .or_else(|| text.rfind('\n').filter(|&i| qualifies(i)))
            .map(|i| i + 1);

        let cut = match break_byte {
            Some(byte) => decoded.token_boundary(byte).unwrap_or(clean_len),
            None => clean_len,
        };
        Some(cut)
    }

    /// Decode `buffer` token by token, recording every clean boundary.
    fn decode_marks(&self, buffer: &[u32]) -> DecodedBuffer {
        let mut text = String::new();
        let mut marks = Vec::new();
        let mut pending = 0;

        for k in 1..=buffer.len() {
            if let Some(piece) = self.tokenizer.decode(&buffer[pending..k]) {
                text.push_str(&piece);
                marks.push((k, text.len()));
                pending = k;
            }
        }

        DecodedBuffer { text, marks }
    }

    /// Emit every token after the last chunk up to `end` as one chunk.
    fn emit(&self, chunks: &mut Vec<TextChunk>, tokens: &[u32], end: usize) {
        let start = chunks.last().map_or(0, |c| c.token_range.end);
        let range = start..end;
        let Some(text) = self.tokenizer.decode(&tokens[range.clone()]) else {
            warn!(?range, "Chunk did not decode cleanly, folding it into the next one");
            return;
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        chunks.push(TextChunk::new(chunks.len(), trimmed, range));
    }
}

impl DecodedBuffer {
    /// Token count at which the chunk should end so that it covers
    /// `byte` bytes of text.
    ///
    /// When the break character shares a token with trailing whitespace
    /// (`".\n\n"`), the boundary just after it is used since trimming makes
    /// the chunk end at the break anyway. Otherwise the last boundary at or
    /// before `byte`.
    fn token_boundary(&self, byte: usize) -> Option<usize> {
        if let Some(&(k, end)) = self.marks.iter().find(|&&(_, end)| end >= byte) {
            if end == byte || self.text[byte..end].trim().is_empty() {
                return Some(k);
            }
        }
        self.marks
            .iter()
            .rev()
            .find(|&&(_, end)| end <= byte)
            .map(|&(k, _)| k)
    }
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("tokenizer", &self.tokenizer.name())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
