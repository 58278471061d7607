//! Turning uploaded documents into chunks.

use lectern_extractors::{ExtractionPipeline, FileType};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunking::Chunker;
use crate::error::LecternResult;
use crate::types::TextChunk;

/// Separator placed between documents before chunking.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// One uploaded file as handed over by storage.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// What was extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub file_type: FileType,
    pub chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
}

/// Chunks ready for generation plus per-document details.
#[derive(Debug, Clone)]
pub struct IngestOutput {
    pub chunks: Vec<TextChunk>,
    pub documents: Vec<DocumentSummary>,
}

/// Extract text from `bytes` declared with a free-form type tag.
pub async fn extract_text(
    pipeline: &ExtractionPipeline,
    bytes: &[u8],
    tag: &str,
) -> LecternResult<String> {
    Ok(pipeline.extract_tagged(bytes, tag).await?.text)
}

/// Extract every document in order, join the texts and chunk the result.
///
/// The first document that fails to extract aborts the whole call. A document
/// that extracts to empty text contributes no chunks.
pub async fn prepare_chunks(
    pipeline: &ExtractionPipeline,
    chunker: &Chunker,
    documents: &[DocumentInput],
) -> LecternResult<IngestOutput> {
    let mut texts = Vec::with_capacity(documents.len());
    let mut summaries = Vec::with_capacity(documents.len());

    for doc in documents {
        let content = pipeline
            .extract_upload(&doc.name, doc.mime_type.as_deref(), &doc.bytes)
            .await?;
        summaries.push(DocumentSummary {
            name: doc.name.clone(),
            file_type: content.file_type,
            chars: content.text.chars().count(),
            page_count: content.structure.as_ref().and_then(|s| s.page_count),
        });
        texts.push(content.text);
    }

    let chunks = chunker.split(&texts.join(DOCUMENT_SEPARATOR));
    info!(
        documents = summaries.len(),
        chunks = chunks.len(),
        "Prepared document chunks"
    );

    Ok(IngestOutput {
        chunks,
        documents: summaries,
    })
}
