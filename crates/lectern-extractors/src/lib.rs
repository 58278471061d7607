//! lectern-extractors - Text extraction from lecture documents.
//!
//! Turns raw uploaded bytes plus a declared file type into plain text.
//!
//! # Features
//!
//! - `pdf` (default) - PDF text extraction via pdf-extract
//! - `docx` (default) - DOCX text extraction via docx-rs
//!
//! Plain text is always available.
//!
//! # Example
//!
//! ```ignore
//! use lectern_extractors::{ExtractionPipeline, FileType};
//!
//! let pipeline = ExtractionPipeline::with_defaults();
//! let content = pipeline.extract(&pdf_bytes, FileType::Pdf).await?;
//! let content = pipeline.extract_tagged(&bytes, "docx").await?;
//! ```

mod error;
mod factory;
mod pipeline;
mod text;
mod types;

#[cfg(feature = "pdf")]
mod pdf;

#[cfg(feature = "docx")]
mod docx;

pub use error::{ExtractError, ExtractResult};
pub use factory::ExtractorFactory;
pub use pipeline::{ExtractionPipeline, DEFAULT_MAX_FILE_BYTES};
pub use text::PlainTextExtractor;
pub use types::{DocumentStructure, ExtractedContent, FileType, ALLOWED_MIME_TYPES, DOCX_MIME};

#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;

#[cfg(feature = "docx")]
pub use docx::DocxExtractor;

use async_trait::async_trait;

/// Core Extractor trait - every document format implements this.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract plain text from bytes.
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedContent>;

    /// The file type this extractor handles.
    fn file_type(&self) -> FileType;

    /// Check if this extractor handles the given file type.
    fn supports(&self, file_type: FileType) -> bool {
        self.file_type() == file_type
    }

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;
}
