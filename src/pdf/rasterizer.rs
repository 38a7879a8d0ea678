//! Page rasterization output types and one-shot render helpers

use crate::config::{ImageFormat, RenderConfig};
use crate::error::{Error, Result};
use crate::pdf::loader::{DocumentHandle, RasterBackend};
use base64::Engine;
use image::DynamicImage;
use serde::Serialize;

/// Rendered page image data
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// Page number (1-indexed)
    pub page: u32,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Encoded format of `data`
    pub format: ImageFormat,
    /// Encoded image bytes
    pub data: Vec<u8>,
}

impl RenderedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Encode as a `data:` URL (e.g. `data:image/png;base64,...`)
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

/// Page geometry at a given scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct PageDimensions {
    /// Width in pixels at the requested scale, after rotation
    pub width: u32,
    /// Height in pixels at the requested scale, after rotation
    pub height: u32,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
}

impl PageDimensions {
    /// Compute display geometry from the page size in points.
    ///
    /// `width` and `height` are the displayed size, with `/Rotate` already
    /// applied, so they match the raster a render at `scale` produces.
    pub fn from_points(width: f32, height: f32, rotation: i32, scale: f32) -> Self {
        Self {
            width: (width * scale).floor().max(0.0) as u32,
            height: (height * scale).floor().max(0.0) as u32,
            rotation,
        }
    }
}

/// Encode a raster in the configured format.
///
/// JPEG has no alpha channel, so the raster is flattened to RGB first.
pub fn encode_image(image: &DynamicImage, config: &RenderConfig) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match config.format {
        ImageFormat::Png => image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| Error::InvalidImage {
                reason: format!("PNG encoding failed: {}", e),
            })?,
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, config.jpeg_quality());
            encoder
                .encode_image(&rgb)
                .map_err(|e| Error::InvalidImage {
                    reason: format!("JPEG encoding failed: {}", e),
                })?;
        }
    }
    Ok(bytes)
}

/// Render a single page, opening and closing the document around the call.
pub fn render_page_to_image(
    backend: &dyn RasterBackend,
    data: &[u8],
    page_index: u32,
    config: &RenderConfig,
) -> Result<RenderedImage> {
    let mut handle = DocumentHandle::open(backend, data)?;
    let result = handle.render(page_index, config);
    handle.close();
    result
}

/// Render several pages through one document handle.
///
/// Every index is validated before anything is rendered; any rendering
/// failure aborts the whole call. `on_page` receives
/// `(position, total, image)` after each page.
pub fn render_pages_to_images<F>(
    backend: &dyn RasterBackend,
    data: &[u8],
    page_indices: &[u32],
    config: &RenderConfig,
    mut on_page: F,
) -> Result<Vec<RenderedImage>>
where
    F: FnMut(usize, usize, &RenderedImage),
{
    let mut handle = DocumentHandle::open(backend, data)?;
    let total = handle.page_count();

    if let Some(&index) = page_indices.iter().find(|&&i| i >= total) {
        return Err(Error::PageOutOfBounds { index, total });
    }

    let mut rendered = Vec::with_capacity(page_indices.len());
    for (position, &index) in page_indices.iter().enumerate() {
        let image = handle.render(index, config)?;
        on_page(position, page_indices.len(), &image);
        tracing::debug!(
            page = index,
            position = position + 1,
            total = page_indices.len(),
            "Rendered page"
        );
        rendered.push(image);
    }

    handle.close();
    Ok(rendered)
}

/// Page geometry, opening and closing the document around the call.
pub fn page_dimensions(
    backend: &dyn RasterBackend,
    data: &[u8],
    page_index: u32,
    scale: f32,
) -> Result<PageDimensions> {
    let mut handle = DocumentHandle::open(backend, data)?;
    let result = handle.page_dimensions(page_index, scale);
    handle.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(8, 4, Rgba([255, 0, 0, 128])))
    }

    #[test]
    fn test_encode_png() {
        let bytes = encode_image(&sample_image(), &RenderConfig::default()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let config = RenderConfig {
            format: ImageFormat::Jpeg,
            quality: 0.5,
            ..RenderConfig::default()
        };
        let bytes = encode_image(&sample_image(), &config).unwrap();
        assert_eq!(&bytes[..2], &[0xff, 0xd8]);
    }

    #[test]
    fn test_data_url() {
        let image = RenderedImage {
            page: 1,
            width: 1,
            height: 1,
            format: ImageFormat::Png,
            data: vec![1, 2, 3],
        };
        assert_eq!(image.to_data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_dimensions_keep_displayed_size() {
        let upright = PageDimensions::from_points(612.0, 792.0, 0, 1.0);
        assert_eq!((upright.width, upright.height), (612, 792));

        // A quarter-turned 612x792 page is displayed as 792x612; no second swap.
        let turned = PageDimensions::from_points(792.0, 612.0, 90, 2.0);
        assert_eq!((turned.width, turned.height, turned.rotation), (1584, 1224, 90));

        let flipped = PageDimensions::from_points(100.5, 50.9, 180, 1.0);
        assert_eq!((flipped.width, flipped.height), (100, 50));
    }
}
