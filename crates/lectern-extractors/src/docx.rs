//! DOCX text extraction using docx-rs.

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentStructure, ExtractedContent, FileType};
use crate::Extractor;
use async_trait::async_trait;
use tracing::warn;
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

/// Separator between block-level elements. Paragraph boundaries become blank
/// lines so the chunker can treat them as break candidates.
const BLOCK_SEPARATOR: &str = "\n\n";

/// DOCX text extractor using the docx-rs library.
///
/// Produces raw text: paragraphs in document order, tables flattened row by
/// row, and heading-styled paragraphs collected as sections. A document with
/// no text extracts to an empty string.
#[derive(Debug, Clone)]
pub struct DocxExtractor {
    /// Keep `cell | cell` row layout for tables instead of one line per cell.
    preserve_tables: bool,
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxExtractor {
    /// Create new DOCX extractor with default settings.
    pub fn new() -> Self {
        Self {
            preserve_tables: true,
        }
    }

    /// Configure whether to preserve table row layout.
    pub fn with_tables(mut self, preserve: bool) -> Self {
        self.preserve_tables = preserve;
        self
    }

    fn extract_sync(content: &[u8], preserve_tables: bool) -> ExtractResult<(String, Vec<String>)> {
        let docx = docx_rs::read_docx(content)
            .map_err(|e| ExtractError::Docx(format!("Failed to parse DOCX: {}", e)))?;

        let mut blocks: Vec<String> = Vec::new();
        let mut headings: Vec<String> = Vec::new();

        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => {
                    let text = paragraph_text(p);
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if is_heading(p) {
                        headings.push(trimmed.to_string());
                    }
                    blocks.push(text);
                }
                DocumentChild::Table(t) => {
                    let rows = table_rows(t);
                    if preserve_tables {
                        let table = rows
                            .iter()
                            .map(|cells| cells.join(" | "))
                            .collect::<Vec<_>>()
                            .join("\n");
                        if !table.trim().is_empty() {
                            blocks.push(table);
                        }
                    } else {
                        blocks.extend(rows.into_iter().flatten().filter(|c| !c.is_empty()));
                    }
                }
                _ => {}
            }
        }

        Ok((blocks.join(BLOCK_SEPARATOR), headings))
    }
}

fn is_heading(p: &Paragraph) -> bool {
    p.property
        .style
        .as_ref()
        .map(|style| {
            let id = style.val.to_lowercase();
            id.starts_with("heading") || id.contains("title")
        })
        .unwrap_or(false)
}

fn paragraph_text(p: &Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        match child {
            ParagraphChild::Run(r) => push_run(&mut text, &r.children),
            ParagraphChild::Hyperlink(h) => {
                for child in &h.children {
                    if let ParagraphChild::Run(r) = child {
                        push_run(&mut text, &r.children);
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn push_run(text: &mut String, children: &[RunChild]) {
    for child in children {
        match child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}

fn table_rows(t: &Table) -> Vec<Vec<String>> {
    t.rows
        .iter()
        .map(|row| {
            let TableChild::TableRow(r) = row;
            r.cells
                .iter()
                .map(|cell| {
                    let TableRowChild::TableCell(c) = cell;
                    c.children
                        .iter()
                        .filter_map(|content| match content {
                            TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                            _ => None,
                        })
                        .filter(|s| !s.trim().is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                        .trim()
                        .to_string()
                })
                .collect()
        })
        .collect()
}

#[async_trait]
impl Extractor for DocxExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedContent> {
        let content = content.to_vec();
        let content_len = content.len();
        let preserve_tables = self.preserve_tables;

        let (text, headings) =
            tokio::task::spawn_blocking(move || Self::extract_sync(&content, preserve_tables))
                .await??;

        if text.trim().is_empty() {
            warn!(size = content_len, "DOCX contained no text");
        }

        let structure = DocumentStructure {
            page_count: None,
            sections: headings,
        };

        Ok(ExtractedContent::new(text, FileType::Docx)
            .with_structure(structure)
            .with_metadata("original_size", content_len))
    }

    fn file_type(&self) -> FileType {
        FileType::Docx
    }

    fn name(&self) -> &str {
        "docx-rs"
    }
}
