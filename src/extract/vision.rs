//! Vision payload preparation
//!
//! Encodes image documents for the multimodal classifier. Formats vision
//! endpoints accept (PNG, JPEG, GIF, WebP) are sent as the raw bytes;
//! TIFF and BMP scans are transcoded to PNG first.

use super::ExtractionError;
use crate::detect::MimeType;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Maximum image dimension (width or height) after transcoding
const MAX_DIMENSION: u32 = 1600;

/// Base64 image ready to embed in a classification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// MIME type of the encoded bytes (may differ from the source file)
    pub mime: &'static str,
    pub base64: String,
}

impl ImagePayload {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

/// Encode an image document for the vision API
pub fn encode_image(bytes: &[u8], mime: MimeType) -> Result<ImagePayload, ExtractionError> {
    match mime {
        MimeType::Png | MimeType::Jpeg | MimeType::Gif | MimeType::Webp => Ok(ImagePayload {
            mime: mime.as_str(),
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }),
        MimeType::Tiff | MimeType::Bmp => {
            let png = transcode_to_png(bytes)?;
            tracing::debug!(
                "[Vision] Transcoded {} ({} bytes) to PNG ({} bytes)",
                mime,
                bytes.len(),
                png.len()
            );
            Ok(ImagePayload {
                mime: MimeType::Png.as_str(),
                base64: base64::engine::general_purpose::STANDARD.encode(png),
            })
        }
        other => Err(ExtractionError::Image(format!(
            "{} is not an image type",
            other
        ))),
    }
}

/// Decode any supported format and re-encode as PNG
fn transcode_to_png(bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ExtractionError::Image(format!("Failed to load image: {}", e)))?;

    // 16-bit scans (e.g. grayscale TIFF) are flattened to 8-bit RGB
    let img = DynamicImage::ImageRgb8(resize_if_needed(img).to_rgb8());

    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ExtractionError::Image(format!("Failed to encode image: {}", e)))?;

    Ok(buffer)
}

/// Resize image if it exceeds maximum dimensions
fn resize_if_needed(img: DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= MAX_DIMENSION && height <= MAX_DIMENSION {
        return img;
    }

    let scale = (MAX_DIMENSION as f32 / width.max(height) as f32).min(1.0);
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}
