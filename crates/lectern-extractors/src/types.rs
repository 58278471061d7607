//! Core types for text extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{ExtractError, ExtractResult};

/// MIME type for DOCX documents.
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME types accepted for upload. `application/msword` is accepted at the
/// gate, but only files whose extension resolves to a known [`FileType`]
/// are actually extracted.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    DOCX_MIME,
    "text/plain",
];

/// Declared type of a lecture document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document.
    Pdf,
    /// Microsoft Word (OOXML) document.
    Docx,
    /// UTF-8 plain text.
    Txt,
}

impl FileType {
    /// Resolve a file type from a file name's extension.
    pub fn from_file_name(name: &str) -> ExtractResult<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ExtractError::UnsupportedFormat(name.to_string()))?;
        Self::parse(ext)
    }

    /// Parse a declared type tag such as `"pdf"` or `"DOCX"`.
    pub fn parse(tag: &str) -> ExtractResult<Self> {
        tag.parse()
            .map_err(|_| ExtractError::UnsupportedFormat(tag.to_string()))
    }

    /// Resolve a file type from a MIME type.
    pub fn from_mime_type(mime_type: &str) -> ExtractResult<Self> {
        match mime_type {
            "application/pdf" => Ok(Self::Pdf),
            DOCX_MIME | "application/docx" => Ok(Self::Docx),
            "text/plain" => Ok(Self::Txt),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Canonical MIME type for this file type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => DOCX_MIME,
            Self::Txt => "text/plain",
        }
    }
}

/// Document structure metadata (optional, for structured documents).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Total page count (for PDFs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,

    /// Extracted headings/sections.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sections: Vec<String>,
}

/// Extracted text with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Extracted plain text.
    pub text: String,

    /// Type of the source document.
    pub file_type: FileType,

    /// Document structure (if preserved).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<DocumentStructure>,

    /// Additional metadata (format-specific).
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExtractedContent {
    /// Create new extracted content.
    pub fn new(text: String, file_type: FileType) -> Self {
        Self {
            text,
            file_type,
            structure: None,
            metadata: HashMap::new(),
        }
    }

    /// Add structure information.
    pub fn with_structure(mut self, structure: DocumentStructure) -> Self {
        self.structure = Some(structure);
        self
    }

    /// Add metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check if extraction produced meaningful content.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Get content length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_parse_is_case_insensitive() {
        assert_eq!(FileType::parse("PDF").unwrap(), FileType::Pdf);
        assert_eq!(FileType::parse("docx").unwrap(), FileType::Docx);
        assert_eq!(FileType::parse("Txt").unwrap(), FileType::Txt);
    }

    #[test]
    fn test_file_type_parse_unknown() {
        let err = FileType::parse("pptx").unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_file_type_from_file_name() {
        assert_eq!(
            FileType::from_file_name("week1/Intro.Lecture.PDF").unwrap(),
            FileType::Pdf
        );
        assert!(FileType::from_file_name("README").is_err());
    }

    #[test]
    fn test_file_type_from_mime_type() {
        assert_eq!(FileType::from_mime_type(DOCX_MIME).unwrap(), FileType::Docx);
        assert_eq!(FileType::from_mime_type("text/plain").unwrap(), FileType::Txt);
        assert!(FileType::from_mime_type("application/msword").is_err());
    }

    #[test]
    fn test_file_type_display() {
        assert_eq!(FileType::Docx.to_string(), "docx");
    }
}
