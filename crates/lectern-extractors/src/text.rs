//! Plain text passthrough.

use crate::error::ExtractResult;
use crate::types::{ExtractedContent, FileType};
use crate::Extractor;
use async_trait::async_trait;

/// Extractor for `.txt` uploads. Bytes are decoded as UTF-8; invalid
/// sequences are replaced rather than rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for PlainTextExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedContent> {
        let text = String::from_utf8_lossy(content).into_owned();
        Ok(ExtractedContent::new(text, FileType::Txt).with_metadata("original_size", content.len()))
    }

    fn file_type(&self) -> FileType {
        FileType::Txt
    }

    fn name(&self) -> &str {
        "plain-text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_roundtrip() {
        let content = PlainTextExtractor::new()
            .extract("Newton's laws.\nF = ma".as_bytes())
            .await
            .unwrap();
        assert_eq!(content.text, "Newton's laws.\nF = ma");
        assert_eq!(content.file_type, FileType::Txt);
    }

    #[tokio::test]
    async fn test_plain_text_invalid_utf8_is_replaced() {
        let content = PlainTextExtractor::new()
            .extract(&[b'o', b'k', 0xff])
            .await
            .unwrap();
        assert_eq!(content.text, "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_plain_text_empty_is_not_an_error() {
        let content = PlainTextExtractor::new().extract(b"").await.unwrap();
        assert!(content.is_empty());
    }
}
