use std::panic;

use docx_rs::{
    read_docx, DocumentChild, InsertChild, MoveToChild, Paragraph, ParagraphChild, Run, RunChild,
    StructuredDataTag, StructuredDataTagChild, Table, TableCellContent, TableChild, TableRowChild,
};
use lopdf::Document;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::MediaType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unsupported file type: {media_type}")]
    UnsupportedFormat { media_type: String },

    #[error("{message}")]
    ExtractionFailed { message: String },
}

impl ExtractError {
    fn failed(message: impl Into<String>) -> Self {
        ExtractError::ExtractionFailed {
            message: message.into(),
        }
    }
}

/// Turns résumé bytes into plain text. Stateless: the same bytes and media
/// type always produce the same text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, content: &[u8], media_type: &str) -> Result<String, ExtractError> {
        match MediaType::parse(media_type) {
            Some(MediaType::Pdf) => self.extract_pdf(content),
            Some(MediaType::Docx) => self.extract_docx(content),
            None => Err(ExtractError::UnsupportedFormat {
                media_type: media_type.to_string(),
            }),
        }
    }

    fn extract_pdf(&self, content: &[u8]) -> Result<String, ExtractError> {
        debug!("Extracting PDF text layer ({} bytes)", content.len());

        // pdf-extract handles more encodings; lopdf is the fallback when it
        // errors, panics, or finds no text at all.
        let primary = match guarded(|| pdf_extract::extract_text_from_mem(content)) {
            Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
            Ok(Ok(text)) => {
                debug!("pdf-extract returned no text, trying lopdf");
                Ok(text)
            }
            Ok(Err(e)) => {
                warn!("pdf-extract failed: {}, trying lopdf", e);
                Err(e.to_string())
            }
            Err(panic_message) => {
                warn!("pdf-extract panicked: {}, trying lopdf", panic_message);
                Err(panic_message)
            }
        };

        let fallback = guarded(|| extract_pdf_pages(content))
            .and_then(|res| res.map_err(|e| e.to_string()));

        match (primary, fallback) {
            (_, Ok(text)) if !text.trim().is_empty() => Ok(text),
            (Ok(text), _) => Ok(text),
            (Err(_), Ok(text)) => Ok(text),
            (Err(primary_err), Err(fallback_err)) => Err(ExtractError::failed(format!(
                "PDF extraction failed: {}; fallback parser: {}",
                primary_err, fallback_err
            ))),
        }
    }

    fn extract_docx(&self, content: &[u8]) -> Result<String, ExtractError> {
        debug!("Extracting DOCX paragraphs ({} bytes)", content.len());

        let docx = guarded(|| read_docx(content))
            .map_err(|panic_message| ExtractError::failed(format!("DOCX extraction failed: {}", panic_message)))?
            .map_err(|e| ExtractError::failed(format!("DOCX extraction failed: {}", e)))?;

        let mut lines = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
                DocumentChild::Table(table) => collect_table_text(table, &mut lines),
                DocumentChild::StructuredDataTag(tag) => lines.push(structured_tag_text(tag)),
                _ => {}
            }
        }

        Ok(lines.join("\n"))
    }
}

/// Runs a parser and converts a panic into its message.
fn guarded<T>(f: impl FnOnce() -> T + panic::UnwindSafe) -> Result<T, String> {
    panic::catch_unwind(f).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "parser panicked".to_string())
    })
}

fn extract_pdf_pages(content: &[u8]) -> Result<String, lopdf::Error> {
    let doc = Document::load_mem(content)?;
    let mut text = String::new();

    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => debug!("Skipping page {}: {}", page_number, e),
        }
    }

    Ok(text)
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_paragraph_children(&paragraph.children, &mut text);
    text
}

fn push_paragraph_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run_text(run, text),
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, text),
            ParagraphChild::StructuredDataTag(tag) => text.push_str(&structured_tag_text(tag)),
            // Tracked insertions and move destinations are part of the current text
            ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let InsertChild::Run(run) = child {
                        push_run_text(run, text);
                    }
                }
            }
            ParagraphChild::MoveTo(moved) => {
                for child in &moved.children {
                    if let MoveToChild::Run(run) = child {
                        push_run_text(run, text);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run_text(run: &Run, text: &mut String) {
    for run_child in &run.children {
        match run_child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}

/// Text of a content control, which may wrap runs, paragraphs, tables or
/// further controls. Block children are separated by newlines.
fn structured_tag_text(tag: &StructuredDataTag) -> String {
    let mut text = String::new();
    for child in &tag.children {
        match child {
            StructuredDataTagChild::Run(run) => push_run_text(run, &mut text),
            StructuredDataTagChild::Paragraph(paragraph) => push_block(&mut text, &paragraph_text(paragraph)),
            StructuredDataTagChild::Table(table) => {
                let mut rows = Vec::new();
                collect_table_text(table, &mut rows);
                push_block(&mut text, &rows.join("\n"));
            }
            StructuredDataTagChild::StructuredDataTag(inner) => push_block(&mut text, &structured_tag_text(inner)),
            _ => {}
        }
    }
    text
}

fn push_block(text: &mut String, block: &str) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(block);
}

fn collect_table_text(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
                    TableCellContent::Table(inner) => collect_table_text(inner, lines),
                    TableCellContent::StructuredDataTag(tag) => lines.push(structured_tag_text(tag)),
                    _ => {}
                }
            }
        }
    }
}
