//! Extraction pipeline routing documents to the matching extractor.

use std::sync::Arc;

use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::types::{ExtractedContent, FileType, ALLOWED_MIME_TYPES};
use crate::Extractor;

/// Default per-file size limit (10 MiB).
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Pipeline for extracting text using registered extractors.
///
/// Each call makes at most one call into an extraction backend. There is no
/// retry here; failures go straight back to the caller.
pub struct ExtractionPipeline {
    extractors: Vec<Arc<dyn Extractor>>,
    max_file_bytes: usize,
}

impl ExtractionPipeline {
    /// Create new empty pipeline.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    /// Create pipeline with all available extractors.
    pub fn with_defaults() -> Self {
        Self {
            extractors: crate::ExtractorFactory::all(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    /// Add an extractor to the pipeline. Later registrations for the same
    /// file type are ignored.
    pub fn add_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Set the per-file size limit enforced by [`Self::extract_upload`].
    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    /// Extract text from `content` declared as `file_type`.
    pub async fn extract(
        &self,
        content: &[u8],
        file_type: FileType,
    ) -> ExtractResult<ExtractedContent> {
        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports(file_type))
            .ok_or_else(|| ExtractError::UnsupportedFormat(file_type.to_string()))?;

        debug!(
            extractor = extractor.name(),
            %file_type,
            bytes = content.len(),
            "Extracting text"
        );
        extractor.extract(content).await
    }

    /// Extract text using a free-form type tag (`"pdf"`, `"docx"`, `"txt"`).
    pub async fn extract_tagged(
        &self,
        content: &[u8],
        tag: &str,
    ) -> ExtractResult<ExtractedContent> {
        let file_type = FileType::parse(tag)?;
        self.extract(content, file_type).await
    }

    /// Extract text from an uploaded file record.
    ///
    /// Checks the declared MIME type against the upload allowlist and the
    /// size limit before parsing. The file type comes from the name's
    /// extension.
    pub async fn extract_upload(
        &self,
        name: &str,
        mime_type: Option<&str>,
        content: &[u8],
    ) -> ExtractResult<ExtractedContent> {
        if let Some(mime) = mime_type {
            if !ALLOWED_MIME_TYPES.contains(&mime) {
                return Err(ExtractError::UnsupportedFormat(format!(
                    "{} ({})",
                    name, mime
                )));
            }
        }

        if content.len() > self.max_file_bytes {
            return Err(ExtractError::FileTooLarge {
                name: name.to_string(),
                size: content.len(),
                limit: self.max_file_bytes,
            });
        }

        let file_type = FileType::from_file_name(name)?;
        self.extract(content, file_type).await
    }

    /// Check if pipeline can handle a given file type.
    pub fn supports(&self, file_type: FileType) -> bool {
        self.extractors.iter().any(|e| e.supports(file_type))
    }

    /// Get the number of registered extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Check if the pipeline has no registered extractors.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}
