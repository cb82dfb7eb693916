//! Document Parser Module
//!
//! Pure Rust text extraction from documents - no external dependencies required.
//! Works out of the box without Tesseract, pdfium, or any other system libraries.
//!
//! ## Supported Formats
//! - PDF: text layer via pdf-extract
//! - Word: .docx body and tables via docx-rs
//! - Excel: .xlsx and legacy .xls via calamine
//! - Plain text: direct read
//!
//! Images and unrecognised binaries yield no text. Scanned pages are read
//! by the multimodal classifier from the image payload instead.

use super::ExtractionError;
use crate::detect::MimeType;
use calamine::{open_workbook, Reader, Xls, Xlsx};
use std::io::{Read, Seek};
use std::path::Path;

/// Maximum text length to extract (to avoid memory issues with huge docs)
const MAX_TEXT_LENGTH: usize = 500_000; // ~500KB of text

/// Result of document parsing
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Extracted text content (may be empty)
    pub text: String,
    pub word_count: u32,
    /// Extraction method used
    pub method: ExtractionMethod,
}

/// How the document was parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Native text layer of a structured document
    NativeText,
    /// Simple file read (for plain text files)
    DirectRead,
    /// No text source for this type
    Skipped,
}

/// Document parser using pure Rust crates
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract text according to the sniffed type
    pub fn parse(&self, path: &Path, mime: MimeType) -> Result<ParsedDocument, ExtractionError> {
        match mime {
            MimeType::PlainText => self.read_plain_text(path),
            MimeType::Pdf => self.extract_pdf(path),
            MimeType::Docx => self.extract_docx(path),
            MimeType::Xlsx => self.extract_xlsx(path),
            MimeType::OleCompound => Ok(self.extract_xls(path)),
            _ => Ok(ParsedDocument {
                text: String::new(),
                word_count: 0,
                method: ExtractionMethod::Skipped,
            }),
        }
    }

    /// Read plain text file directly
    fn read_plain_text(&self, path: &Path) -> Result<ParsedDocument, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;
        let text = String::from_utf8_lossy(&bytes);

        let parsed = Self::finish(&text, ExtractionMethod::DirectRead);
        tracing::debug!(
            "[DocumentParser] Direct read: {} chars, {} words from {}",
            parsed.text.len(),
            parsed.word_count,
            path.display()
        );
        Ok(parsed)
    }

    /// Extract text from PDF using pdf-extract
    /// Wrapped in catch_unwind to handle panics from malformed PDFs
    fn extract_pdf(&self, path: &Path) -> Result<ParsedDocument, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;

        tracing::debug!("[DocumentParser] PDF file size: {} bytes", bytes.len());

        // pdf_extract (and its cff-parser dependency) can panic on certain fonts/glyphs
        let text = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&bytes)
        })) {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => {
                tracing::warn!(
                    "[DocumentParser] PDF extraction FAILED for {}: {}",
                    path.display(),
                    e
                );
                return Err(ExtractionError::Pdf(e.to_string()));
            }
            Err(_panic) => {
                tracing::error!(
                    "[DocumentParser] PDF extraction PANICKED for {} - likely malformed font/glyph",
                    path.display()
                );
                return Err(ExtractionError::Pdf(
                    "extraction panicked - likely contains malformed fonts".to_string(),
                ));
            }
        };

        let parsed = Self::finish(&text, ExtractionMethod::NativeText);

        if parsed.text.is_empty() {
            tracing::info!(
                "[DocumentParser] PDF has no text layer (scanned?): {}",
                path.display()
            );
        } else {
            let preview: String = parsed.text.chars().take(200).collect();
            tracing::debug!("[DocumentParser] Content preview: {}...", preview);
        }

        Ok(parsed)
    }

    /// Extract text from XLSX using calamine
    fn extract_xlsx(&self, path: &Path) -> Result<ParsedDocument, ExtractionError> {
        let mut workbook: Xlsx<_> = open_workbook::<Xlsx<_>, _>(path)
            .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

        let all_text = sheets_text(&mut workbook);
        Ok(Self::finish(&all_text, ExtractionMethod::NativeText))
    }

    /// Legacy compound files may be .xls or .doc; only the former is readable.
    fn extract_xls(&self, path: &Path) -> ParsedDocument {
        let mut workbook: Xls<_> = match open_workbook(path) {
            Ok(wb) => wb,
            Err(e) => {
                tracing::info!(
                    "[DocumentParser] Compound file is not a readable workbook ({}): {}",
                    e,
                    path.display()
                );
                return Self::finish("", ExtractionMethod::Skipped);
            }
        };

        let all_text = sheets_text(&mut workbook);
        Self::finish(&all_text, ExtractionMethod::NativeText)
    }

    /// Extract text from DOCX using docx-rs
    fn extract_docx(&self, path: &Path) -> Result<ParsedDocument, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;

        let doc =
            docx_rs::read_docx(&bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

        let mut all_text = String::new();
        for child in &doc.document.children {
            Self::extract_docx_content(child, &mut all_text);
        }

        let parsed = Self::finish(&all_text, ExtractionMethod::NativeText);
        tracing::debug!(
            "[DocumentParser] DOCX extracted: {} chars, {} words from {}",
            parsed.text.len(),
            parsed.word_count,
            path.display()
        );
        Ok(parsed)
    }

    fn extract_docx_content(element: &docx_rs::DocumentChild, output: &mut String) {
        match element {
            docx_rs::DocumentChild::Paragraph(para) => {
                paragraph_text(para, output);
                output.push('\n');
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(tr) = row;
                    for cell in &tr.cells {
                        let docx_rs::TableRowChild::TableCell(tc) = cell;
                        for child in &tc.children {
                            if let docx_rs::TableCellContent::Paragraph(para) = child {
                                paragraph_text(para, output);
                                output.push_str(" | ");
                            }
                        }
                    }
                    output.push('\n');
                }
            }
            _ => {}
        }
    }

    fn finish(raw: &str, method: ExtractionMethod) -> ParsedDocument {
        let text = Self::truncate_text(&Self::clean_text(raw));
        let word_count = text.split_whitespace().count() as u32;
        ParsedDocument {
            text,
            word_count,
            method,
        }
    }

    /// Trim lines and drop blank ones
    fn clean_text(text: &str) -> String {
        text.lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Truncate text to max length, preserving word boundaries
    fn truncate_text(text: &str) -> String {
        if text.len() <= MAX_TEXT_LENGTH {
            return text.to_string();
        }

        let mut cut = MAX_TEXT_LENGTH;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        let truncated = &text[..cut];

        // Try to break at a line
        if let Some(pos) = truncated.rfind('\n') {
            return truncated[..pos].to_string();
        }

        // Try to break at sentence
        if let Some(pos) = truncated.rfind(". ") {
            return truncated[..=pos].to_string();
        }

        // Fall back to word boundary
        if let Some(pos) = truncated.rfind(' ') {
            return truncated[..pos].to_string();
        }

        truncated.to_string()
    }
}

fn paragraph_text(para: &docx_rs::Paragraph, output: &mut String) {
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => run_text(run, output),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        run_text(run, output);
                    }
                }
            }
            _ => {}
        }
    }
}

fn run_text(run: &docx_rs::Run, output: &mut String) {
    for run_child in &run.children {
        if let docx_rs::RunChild::Text(text) = run_child {
            output.push_str(&text.text);
        }
    }
}

/// Every readable sheet, one ` | `-joined line per non-empty row
fn sheets_text<R, RS>(workbook: &mut R) -> String
where
    R: Reader<RS>,
    RS: Read + Seek,
{
    let mut all_text = String::new();
    for sheet_name in workbook.sheet_names() {
        if let Ok(range) = workbook.worksheet_range(&sheet_name) {
            all_text.push_str(&format!("\n=== Sheet: {} ===\n", sheet_name));
            for row in range.rows() {
                push_row(row.iter().map(|cell| cell.to_string()), &mut all_text);
            }
        }
    }
    all_text
}

fn push_row(cells: impl Iterator<Item = String>, output: &mut String) {
    let row_text: Vec<String> = cells.filter(|s| !s.is_empty()).collect();
    if !row_text.is_empty() {
        output.push_str(&row_text.join(" | "));
        output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_plain_text_parsing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  Monthly statement for member 12345.  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "Closing balance: $1,204.10").unwrap();

        let parser = DocumentParser::new();
        let parsed = parser.parse(file.path(), MimeType::PlainText).unwrap();

        assert_eq!(
            parsed.text,
            "Monthly statement for member 12345.\nClosing balance: $1,204.10"
        );
        assert_eq!(parsed.method, ExtractionMethod::DirectRead);
        assert_eq!(parsed.word_count, 8);
    }

    #[test]
    fn test_images_have_no_text_layer() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let parsed = DocumentParser::new().parse(file.path(), MimeType::Jpeg).unwrap();
        assert!(parsed.text.is_empty());
        assert_eq!(parsed.method, ExtractionMethod::Skipped);
    }

    #[test]
    fn test_corrupt_pdf_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4\nthis is not really a pdf").unwrap();

        let result = DocumentParser::new().parse(file.path(), MimeType::Pdf);
        assert!(matches!(result, Err(ExtractionError::Pdf(_))));
    }

    #[test]
    fn test_workbook_readers_handle_corrupt_files() {
        let mut xlsx = NamedTempFile::new().unwrap();
        xlsx.write_all(b"PK\x03\x04not a workbook").unwrap();
        let result = DocumentParser::new().parse(xlsx.path(), MimeType::Xlsx);
        assert!(matches!(result, Err(ExtractionError::Spreadsheet(_))));

        let mut ole = NamedTempFile::new().unwrap();
        ole.write_all(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]).unwrap();
        let parsed = DocumentParser::new().parse(ole.path(), MimeType::OleCompound).unwrap();
        assert!(parsed.text.is_empty());
        assert_eq!(parsed.method, ExtractionMethod::Skipped);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result =
            DocumentParser::new().parse(Path::new("/no/such/file.txt"), MimeType::PlainText);
        assert!(matches!(result, Err(ExtractionError::Io { .. })));
    }

    #[test]
    fn test_truncate_text_respects_char_boundaries() {
        let long_text = "ż".repeat(MAX_TEXT_LENGTH);
        let truncated = DocumentParser::truncate_text(&long_text);
        assert!(truncated.len() <= MAX_TEXT_LENGTH);
        assert!(truncated.chars().all(|c| c == 'ż'));
    }

    #[test]
    fn test_truncate_text_breaks_at_line() {
        let line = format!("{}\n", "a".repeat(99));
        let long_text = line.repeat(MAX_TEXT_LENGTH / 100 + 10);
        let truncated = DocumentParser::truncate_text(&long_text);
        assert!(truncated.len() <= MAX_TEXT_LENGTH);
        assert!(truncated.ends_with('a'));
        assert!(truncated.split('\n').all(|l| l.len() == 99));
    }

    #[test]
    fn test_clean_text() {
        let messy = "  Line 1  \n\n  Line 2  \n  \n  Line 3  ";
        let cleaned = DocumentParser::clean_text(messy);
        assert_eq!(cleaned, "Line 1\nLine 2\nLine 3");
    }
}
