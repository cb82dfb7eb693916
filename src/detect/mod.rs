//! File Type Detection
//!
//! Magic-number sniffing over the leading bytes of a file. The extension is
//! never consulted: scanners and upload forms routinely produce misnamed
//! files. Anything unrecognised degrades to `application/octet-stream`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes inspected per file. Large enough to reach the `word/` or `xl/`
/// entries of an OOXML container.
const SNIFF_LEN: u64 = 64 * 1024;

/// Detected content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeType {
    Pdf,
    Png,
    Jpeg,
    Gif,
    Webp,
    Tiff,
    Bmp,
    Docx,
    Xlsx,
    Zip,
    /// Legacy .doc / .xls compound file
    OleCompound,
    PlainText,
    /// DetectionFallback
    Unknown,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Zip => "application/zip",
            Self::OleCompound => "application/x-ole-storage",
            Self::PlainText => "text/plain",
            Self::Unknown => "application/octet-stream",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self,
            Self::Png | Self::Jpeg | Self::Gif | Self::Webp | Self::Tiff | Self::Bmp
        )
    }

    /// Classify a byte prefix
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Unknown;
        }

        if bytes.starts_with(b"%PDF-") {
            Self::Pdf
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Self::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Self::Gif
        } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WEBP"[..]) {
            Self::Webp
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Self::Tiff
        } else if bytes.starts_with(b"BM") && bytes.get(6..10) == Some(&[0u8, 0, 0, 0][..]) {
            Self::Bmp
        } else if bytes.starts_with(b"PK\x03\x04") {
            Self::sniff_zip(bytes)
        } else if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
            Self::OleCompound
        } else if looks_like_text(bytes) {
            Self::PlainText
        } else {
            Self::Unknown
        }
    }

    /// OOXML packages are zip files; the part names tell them apart
    fn sniff_zip(bytes: &[u8]) -> Self {
        if contains(bytes, b"word/") {
            Self::Docx
        } else if contains(bytes, b"xl/") {
            Self::Xlsx
        } else {
            Self::Zip
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-based file type detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTypeDetector;

impl FileTypeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect the type of the file at `path`.
    ///
    /// Never fails: unreadable files and unknown signatures come back as
    /// `MimeType::Unknown`.
    pub fn detect(&self, path: &Path) -> MimeType {
        let mut prefix = Vec::new();
        let read = File::open(path).and_then(|f| f.take(SNIFF_LEN).read_to_end(&mut prefix));

        match read {
            Ok(_) => {
                let mime = MimeType::sniff(&prefix);
                if mime == MimeType::Unknown {
                    tracing::debug!(
                        "[Detector] Unknown signature for {}, using {}",
                        path.display(),
                        mime
                    );
                }
                mime
            }
            Err(e) => {
                tracing::debug!(
                    "[Detector] Could not read {}: {} - falling back to {}",
                    path.display(),
                    e,
                    MimeType::Unknown
                );
                MimeType::Unknown
            }
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// UTF-8 without NUL bytes. A multi-byte sequence cut off by the sniff
/// window still counts as text.
fn looks_like_text(bytes: &[u8]) -> bool {
    if bytes.contains(&0) {
        return false;
    }
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && e.valid_up_to() > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(MimeType::sniff(b"%PDF-1.7\n"), MimeType::Pdf);
        assert_eq!(
            MimeType::sniff(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            MimeType::Png
        );
        assert_eq!(MimeType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), MimeType::Jpeg);
        assert_eq!(MimeType::sniff(b"GIF89a...."), MimeType::Gif);
        assert_eq!(MimeType::sniff(b"RIFF\0\0\0\0WEBPVP8 "), MimeType::Webp);
        assert_eq!(MimeType::sniff(b"II*\0\x08\0\0\0"), MimeType::Tiff);
        assert_eq!(MimeType::sniff(b"MM\0*\0\0\0\x08"), MimeType::Tiff);
        assert_eq!(
            MimeType::sniff(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            MimeType::OleCompound
        );
    }

    #[test]
    fn test_sniff_ooxml_containers() {
        let docx = b"PK\x03\x04....[Content_Types].xml....word/document.xml";
        let xlsx = b"PK\x03\x04....[Content_Types].xml....xl/workbook.xml";
        let zip = b"PK\x03\x04....readme.txt";
        assert_eq!(MimeType::sniff(docx), MimeType::Docx);
        assert_eq!(MimeType::sniff(xlsx), MimeType::Xlsx);
        assert_eq!(MimeType::sniff(zip), MimeType::Zip);
    }

    #[test]
    fn test_sniff_text_and_fallback() {
        assert_eq!(MimeType::sniff("Statement of account\n".as_bytes()), MimeType::PlainText);
        assert_eq!(MimeType::sniff(&[0x00, 0x01, 0x02, 0x03]), MimeType::Unknown);
        assert_eq!(MimeType::sniff(&[]), MimeType::Unknown);
        assert_eq!(MimeType::sniff(b"BMW auto loan agreement"), MimeType::PlainText);
        assert_eq!(
            MimeType::sniff(b"BM\x36\x00\x0c\x00\x00\x00\x00\x00\x36\x00\x00\x00"),
            MimeType::Bmp
        );
        // Truncated multi-byte character at the end of the window
        let mut cut = "Zażółć".as_bytes().to_vec();
        cut.pop();
        assert_eq!(MimeType::sniff(&cut), MimeType::PlainText);
    }

    #[test]
    fn test_detect_ignores_extension() {
        let mut file = NamedTempFile::with_suffix(".jpg").unwrap();
        file.write_all(b"%PDF-1.4\n%binary").unwrap();

        let detector = FileTypeDetector::new();
        assert_eq!(detector.detect(file.path()), MimeType::Pdf);
    }

    #[test]
    fn test_detect_missing_file_falls_back() {
        let detector = FileTypeDetector::new();
        assert_eq!(
            detector.detect(Path::new("/definitely/not/here.pdf")),
            MimeType::Unknown
        );
    }

    #[test]
    fn test_image_family() {
        assert!(MimeType::Tiff.is_image());
        assert!(MimeType::Jpeg.is_image());
        assert!(!MimeType::Pdf.is_image());
        assert!(!MimeType::Unknown.is_image());
    }
}
