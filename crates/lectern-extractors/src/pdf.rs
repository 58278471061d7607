//! PDF text extraction using pdf-extract.

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentStructure, ExtractedContent, FileType};
use crate::Extractor;
use async_trait::async_trait;
use tracing::warn;

/// Page separator emitted by pdf-extract between pages.
const PAGE_BREAK: char = '\u{c}';

/// PDF text extractor using the pdf-extract library.
///
/// Wraps synchronous pdf-extract calls in spawn_blocking to avoid blocking
/// the async runtime. Image-only (scanned) PDFs yield little or no text; they
/// still extract successfully and a warning is logged so OCR can be tried
/// out of band.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    /// Text shorter than this is logged as a likely scanned document.
    min_text_length: usize,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor {
    /// Create new PDF extractor with default settings.
    pub fn new() -> Self {
        Self { min_text_length: 1 }
    }

    /// Create PDF extractor with custom minimum text threshold.
    pub fn with_min_text_length(min_text_length: usize) -> Self {
        Self { min_text_length }
    }

    fn extract_sync(content: &[u8]) -> ExtractResult<String> {
        pdf_extract::extract_text_from_mem(content)
            .map_err(|e| ExtractError::Pdf(format!("Failed to parse PDF: {}", e)))
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedContent> {
        let content = content.to_vec();
        let content_len = content.len();

        let raw = tokio::task::spawn_blocking(move || Self::extract_sync(&content)).await??;

        let page_count = raw.matches(PAGE_BREAK).count() + 1;
        let text = raw.replace(PAGE_BREAK, "\n");

        let text_len = text.trim().chars().count();
        if text_len < self.min_text_length.max(1) {
            warn!(
                text_len,
                page_count, "PDF has little or no extractable text, it may be scanned"
            );
        }

        let structure = DocumentStructure {
            page_count: Some(page_count),
            sections: Vec::new(),
        };

        Ok(ExtractedContent::new(text, FileType::Pdf)
            .with_structure(structure)
            .with_metadata("original_size", content_len))
    }

    fn file_type(&self) -> FileType {
        FileType::Pdf
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extractor_creation() {
        let extractor = PdfExtractor::new();
        assert_eq!(extractor.name(), "pdf-extract");
        assert!(extractor.supports(FileType::Pdf));
        assert!(!extractor.supports(FileType::Docx));
    }

    #[tokio::test]
    async fn test_pdf_extractor_rejects_garbage() {
        let extractor = PdfExtractor::new();
        let result = extractor.extract(b"definitely not a pdf").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_pdf_extractor_threshold() {
        let extractor = PdfExtractor::with_min_text_length(50);
        assert_eq!(extractor.min_text_length, 50);
    }

    #[test]
    fn test_pdf_extractor_default_matches_new() {
        assert_eq!(
            PdfExtractor::default().min_text_length,
            PdfExtractor::new().min_text_length
        );
    }
}
