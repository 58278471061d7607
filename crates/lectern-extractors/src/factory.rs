//! Factory for creating extractors.

use std::sync::Arc;

use crate::error::{ExtractError, ExtractResult};
use crate::text::PlainTextExtractor;
use crate::types::FileType;
use crate::Extractor;

#[cfg(feature = "pdf")]
use crate::PdfExtractor;

#[cfg(feature = "docx")]
use crate::DocxExtractor;

/// Factory for creating text extractors.
pub struct ExtractorFactory;

impl ExtractorFactory {
    /// Create a PDF extractor.
    #[cfg(feature = "pdf")]
    pub fn pdf() -> Arc<dyn Extractor> {
        Arc::new(PdfExtractor::new())
    }

    /// Create a DOCX extractor.
    #[cfg(feature = "docx")]
    pub fn docx() -> Arc<dyn Extractor> {
        Arc::new(DocxExtractor::new())
    }

    /// Create a plain text extractor.
    pub fn text() -> Arc<dyn Extractor> {
        Arc::new(PlainTextExtractor::new())
    }

    /// Create the extractor for a given file type.
    pub fn for_file_type(file_type: FileType) -> ExtractResult<Arc<dyn Extractor>> {
        match file_type {
            #[cfg(feature = "pdf")]
            FileType::Pdf => Ok(Self::pdf()),

            #[cfg(feature = "docx")]
            FileType::Docx => Ok(Self::docx()),

            FileType::Txt => Ok(Self::text()),

            #[allow(unreachable_patterns)]
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Get all available extractors.
    #[allow(clippy::vec_init_then_push)]
    pub fn all() -> Vec<Arc<dyn Extractor>> {
        let mut extractors: Vec<Arc<dyn Extractor>> = Vec::new();

        #[cfg(feature = "pdf")]
        extractors.push(Self::pdf());

        #[cfg(feature = "docx")]
        extractors.push(Self::docx());

        extractors.push(Self::text());

        extractors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_all_extractors() {
        let extractors = ExtractorFactory::all();

        #[cfg(all(feature = "pdf", feature = "docx"))]
        assert_eq!(extractors.len(), 3);

        #[cfg(not(any(feature = "pdf", feature = "docx")))]
        assert_eq!(extractors.len(), 1);
    }

    #[test]
    fn test_factory_for_file_type_txt() {
        let extractor = ExtractorFactory::for_file_type(FileType::Txt).unwrap();
        assert_eq!(extractor.file_type(), FileType::Txt);
    }

    #[cfg(feature = "docx")]
    #[test]
    fn test_factory_for_file_type_docx() {
        let extractor = ExtractorFactory::for_file_type(FileType::Docx).unwrap();
        assert!(extractor.supports(FileType::Docx));
    }
}
