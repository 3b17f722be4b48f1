//! Dimension and format extraction from raw image bytes.
//!
//! Only the image header is parsed; pixel data is never decoded.

use std::io::Cursor;

use image::ImageReader;

use crate::error::DecodeError;
use crate::types::ImageFormat;

/// Header fields read from an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Reads dimensions and format from image bytes.
///
/// Pure and deterministic: the same bytes always give the same answer, and
/// every error is terminal for those bytes.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract width, height and format.
    pub fn extract(bytes: &[u8]) -> Result<ImageInfo, DecodeError> {
        if bytes.len() < 4 {
            return Err(DecodeError::Truncated(bytes.len()));
        }
        if !Self::is_valid_image_header(bytes) {
            return Err(DecodeError::Unrecognized);
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Corrupt(format!("cannot detect image format: {e}")))?;
        let detected = reader.format().ok_or(DecodeError::Unrecognized)?;
        let format = Self::map_format(detected)?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| DecodeError::Corrupt(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(DecodeError::Corrupt(format!(
                "zero-sized image ({width}x{height})"
            )));
        }

        Ok(ImageInfo {
            width,
            height,
            format,
        })
    }

    fn map_format(format: image::ImageFormat) -> Result<ImageFormat, DecodeError> {
        match format {
            image::ImageFormat::Jpeg => Ok(ImageFormat::Jpeg),
            image::ImageFormat::Png => Ok(ImageFormat::Png),
            image::ImageFormat::Gif => Ok(ImageFormat::Gif),
            image::ImageFormat::WebP => Ok(ImageFormat::WebP),
            image::ImageFormat::Bmp => Ok(ImageFormat::Bmp),
            image::ImageFormat::Tiff => Ok(ImageFormat::Tiff),
            other => Err(DecodeError::Unsupported(format!("{other:?}"))),
        }
    }

    /// Check if the leading bytes match a reported image format.
    fn is_valid_image_header(header: &[u8]) -> bool {
        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // PNG: 89 50 4E 47
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return true;
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return true;
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            return header.len() >= 12 && &header[8..12] == b"WEBP";
        }

        // BMP: BM
        if header.starts_with(b"BM") {
            return true;
        }

        // TIFF: II (little-endian) or MM (big-endian) followed by version 42
        header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    /// Encode a blank RGB image of the given size.
    pub fn encoded(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    pub fn png(width: u32, height: u32) -> Vec<u8> {
        encoded(width, height, image::ImageFormat::Png)
    }

    pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
        encoded(width, height, image::ImageFormat::Jpeg)
    }
}
