//! Content Extraction
//!
//! Turns a detected document into what the classifier consumes: free text
//! plus, for image documents, an embeddable image payload.

mod document_parser;
pub mod vision;

pub use document_parser::{DocumentParser, ExtractionMethod, ParsedDocument};
pub use vision::ImagePayload;

use crate::detect::MimeType;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("Spreadsheet extraction failed: {0}")]
    Spreadsheet(String),

    #[error("Image encoding failed: {0}")]
    Image(String),
}

impl ExtractionError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Everything the classifier gets to see of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    pub image: Option<ImagePayload>,
}

impl ExtractedContent {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    /// No usable content: whitespace-only text and no image
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }
}

/// Text/image extraction capability consumed by the router.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, path: &Path, mime: MimeType) -> Result<ExtractedContent, ExtractionError>;
}

/// Default extractor: pure Rust text layers plus raw image payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor {
    parser: DocumentParser,
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self {
            parser: DocumentParser::new(),
        }
    }
}

impl ContentExtractor for DocumentExtractor {
    fn extract(&self, path: &Path, mime: MimeType) -> Result<ExtractedContent, ExtractionError> {
        let parsed = self.parser.parse(path, mime)?;

        let image = if mime.is_image() {
            let bytes = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;
            Some(vision::encode_image(&bytes, mime)?)
        } else {
            None
        };

        tracing::info!(
            "[Extractor] {}: {} chars of text ({:?}), image payload: {}",
            path.display(),
            parsed.text.len(),
            parsed.method,
            image.is_some()
        );

        Ok(ExtractedContent {
            text: parsed.text,
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_whitespace_only_text_is_empty() {
        assert!(ExtractedContent::text_only(" \n\t ").is_empty());
        assert!(ExtractedContent::default().is_empty());
        assert!(!ExtractedContent::text_only("Loan agreement").is_empty());
    }

    #[test]
    fn test_image_without_text_is_not_empty() {
        let content = ExtractedContent {
            text: String::new(),
            image: Some(ImagePayload {
                mime: "image/png",
                base64: "iVBORw0KGgo=".to_string(),
            }),
        };
        assert!(!content.is_empty());
    }

    #[test]
    fn test_unknown_binary_yields_no_content() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x00, 0x01, 0x02, 0x03]).unwrap();

        let content = DocumentExtractor::new()
            .extract(file.path(), MimeType::Unknown)
            .unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_jpeg_gets_image_payload() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).unwrap();

        let content = DocumentExtractor::new()
            .extract(file.path(), MimeType::Jpeg)
            .unwrap();
        assert!(content.text.is_empty());
        let image = content.image.unwrap();
        assert_eq!(image.mime, "image/jpeg");
        assert!(!image.base64.is_empty());
    }
}
