//! tiktoken-backed tokenizer.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tiktoken_rs::CoreBPE;

use crate::error::{LecternError, LecternResult};
use crate::traits::Tokenizer;

static CL100K: OnceCell<Arc<CoreBPE>> = OnceCell::new();

/// Tokenizer using OpenAI's `cl100k_base` BPE ranks.
///
/// The rank table is loaded once per process and shared between instances.
#[derive(Clone)]
pub struct TiktokenTokenizer {
    bpe: Arc<CoreBPE>,
}

impl TiktokenTokenizer {
    /// Load (or reuse) the `cl100k_base` encoding.
    pub fn cl100k() -> LecternResult<Self> {
        let bpe = CL100K
            .get_or_try_init(|| tiktoken_rs::cl100k_base().map(Arc::new))
            .map_err(|e| {
                LecternError::Configuration(format!("Failed to load cl100k_base tokenizer: {}", e))
            })?;
        Ok(Self { bpe: bpe.clone() })
    }
}

impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &"cl100k_base")
            .finish()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> Option<String> {
        self.bpe
            .decode(tokens.iter().map(|&t| t as _).collect())
            .ok()
    }

    fn name(&self) -> &str {
        "cl100k_base"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_known_sentence() {
        let tokenizer = TiktokenTokenizer::cl100k().unwrap();
        assert_eq!(tokenizer.count(""), 0);
        let count = tokenizer.count("Hello, world!");
        assert!(count > 0 && count < 10);
    }

    #[test]
    fn test_roundtrip() {
        let tokenizer = TiktokenTokenizer::cl100k().unwrap();
        let text = "Photosynthesis converts light into chemical energy.\n\nΔG < 0 means spontaneous.";
        let tokens = tokenizer.encode(text);
        assert_eq!(tokenizer.decode(&tokens).as_deref(), Some(text));
    }
}
