//! Image inputs for OCR

use crate::config::ImageFormat;
use crate::error::{Error, Result};
use crate::pdf::RenderedImage;
use base64::Engine;

/// Image to recognize: raw encoded bytes or a `data:` URL
#[derive(Debug, Clone)]
pub enum ImageInput {
    Bytes(Vec<u8>),
    DataUrl(String),
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

/// Split `data:<mime>;base64,<payload>` and decode the payload.
fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url.strip_prefix("data:").ok_or_else(|| Error::InvalidImage {
        reason: "expected a data: URL".to_string(),
    })?;
    let (header, payload) = rest.split_once(',').ok_or_else(|| Error::InvalidImage {
        reason: "data URL has no payload".to_string(),
    })?;
    if !header.ends_with(";base64") {
        return Err(Error::InvalidImage {
            reason: "only base64 data URLs are supported".to_string(),
        });
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

impl ImageInput {
    /// Decode into an engine-ready raster, treated as page 1.
    ///
    /// PNG and JPEG bytes are passed through untouched; any other format the
    /// `image` crate can read is re-encoded as PNG.
    pub fn into_image(self) -> Result<RenderedImage> {
        let bytes = match self {
            ImageInput::Bytes(bytes) => bytes,
            ImageInput::DataUrl(url) => decode_data_url(&url)?,
        };
        if bytes.is_empty() {
            return Err(Error::EmptyInput);
        }

        let detected = image::guess_format(&bytes).map_err(|e| Error::InvalidImage {
            reason: e.to_string(),
        })?;
        let decoded = image::load_from_memory_with_format(&bytes, detected).map_err(|e| {
            Error::InvalidImage {
                reason: e.to_string(),
            }
        })?;

        let (format, data) = match detected {
            image::ImageFormat::Png => (ImageFormat::Png, bytes),
            image::ImageFormat::Jpeg => (ImageFormat::Jpeg, bytes),
            other => {
                tracing::debug!(format = ?other, "Re-encoding image as PNG");
                let mut png = Vec::new();
                decoded
                    .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
                    .map_err(|e| Error::InvalidImage {
                        reason: e.to_string(),
                    })?;
                (ImageFormat::Png, png)
            }
        };

        Ok(RenderedImage {
            page: 1,
            width: decoded.width(),
            height: decoded.height(),
            format,
            data,
        })
    }
}
