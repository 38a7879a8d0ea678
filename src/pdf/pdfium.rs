//! PDFium rasterizer backend

use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::pdf::loader::{LoadedDocument, RasterBackend, RasterBackendFactory};
use crate::pdf::rasterizer::{encode_image, PageDimensions, RenderedImage};
use pdfium_render::prelude::*;
use std::path::PathBuf;

/// Bind PDFium, trying each directory in order before the system library.
fn create_pdfium(library_dirs: &[PathBuf]) -> Result<Pdfium> {
    let mut last_error = None;
    for dir in library_dirs {
        match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => last_error = Some(e),
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| Error::Pdfium {
        reason: format!(
            "Failed to initialize PDFium: {} (searched {} directories{})",
            e,
            library_dirs.len(),
            last_error
                .map(|le| format!(", last error: {}", le))
                .unwrap_or_default()
        ),
    })?;

    Ok(Pdfium::new(bindings))
}

/// Map PDFium load errors to our error type
fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError) => {
            Error::InvalidPdf {
                reason: "Invalid or corrupted PDF file".to_string(),
            }
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

fn rotation_degrees(page: &PdfPage) -> i32 {
    match page.rotation() {
        Ok(PdfPageRenderRotation::None) | Err(_) => 0,
        Ok(PdfPageRenderRotation::Degrees90) => 90,
        Ok(PdfPageRenderRotation::Degrees180) => 180,
        Ok(PdfPageRenderRotation::Degrees270) => 270,
    }
}

/// Target raster size for a page, rejected when its area exceeds `max_pixels`.
fn check_pixel_budget(
    page_num: u32,
    width: f32,
    height: f32,
    scale: f32,
    max_pixels: u64,
) -> Result<(u64, u64)> {
    let target_width = (width * scale) as u64;
    let target_height = (height * scale) as u64;
    if target_width.saturating_mul(target_height) > max_pixels {
        return Err(Error::InvalidArgument {
            reason: format!(
                "rendering page {} at scale {} needs {}x{} pixels (max: {})",
                page_num, scale, target_width, target_height, max_pixels
            ),
        });
    }
    Ok((target_width, target_height))
}

/// Builds a fresh [`PdfiumBackend`] per call (PDFium is not thread-safe).
#[derive(Debug, Clone)]
pub struct PdfiumFactory {
    library_dirs: Vec<PathBuf>,
    max_pixels: u64,
}

impl PdfiumFactory {
    pub fn new(library_dirs: Vec<PathBuf>, max_pixels: u64) -> Self {
        Self {
            library_dirs,
            max_pixels,
        }
    }
}

impl RasterBackendFactory for PdfiumFactory {
    fn create(&self) -> Result<Box<dyn RasterBackend>> {
        Ok(Box::new(PdfiumBackend {
            pdfium: create_pdfium(&self.library_dirs)?,
            max_pixels: self.max_pixels,
        }))
    }
}

/// Rasterizer backed by a bound PDFium library
pub struct PdfiumBackend {
    pdfium: Pdfium,
    max_pixels: u64,
}

impl RasterBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn load<'a>(&'a self, data: &[u8]) -> Result<Box<dyn LoadedDocument + 'a>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(data.to_vec(), None)
            .map_err(map_pdfium_error)?;

        Ok(Box::new(PdfiumDocument {
            document,
            max_pixels: self.max_pixels,
        }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    max_pixels: u64,
}

impl PdfiumDocument<'_> {
    fn page(&self, index: u32) -> Result<PdfPage<'_>> {
        let page_index = u16::try_from(index).map_err(|_| Error::PageOutOfBounds {
            index,
            total: self.page_count(),
        })?;
        self.document
            .pages()
            .get(page_index)
            .map_err(|e| Error::Render {
                page: index + 1,
                reason: format!("Failed to get page: {}", e),
            })
    }
}

impl LoadedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> u32 {
        self.document.pages().len() as u32
    }

    fn render_page(&self, index: u32, config: &RenderConfig) -> Result<RenderedImage> {
        let page_num = index + 1;
        let page = self.page(index)?;

        let (target_width, target_height) = check_pixel_budget(
            page_num,
            page.width().value,
            page.height().value,
            config.scale,
            self.max_pixels,
        )?;

        let bg = config.background;
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(config.scale)
            .set_clear_color(PdfColor::new(bg.r, bg.g, bg.b, bg.a))
            .render_form_data(true)
            .render_annotations(true);

        tracing::debug!(
            page = page_num,
            scale = config.scale,
            width = target_width,
            height = target_height,
            "Rendering page"
        );

        // The bitmap and page are released when this scope ends, on every path.
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| Error::Render {
                page: page_num,
                reason: e.to_string(),
            })?;

        let dynamic_image = bitmap.as_image();
        let data = encode_image(&dynamic_image, config).map_err(|e| Error::Render {
            page: page_num,
            reason: e.to_string(),
        })?;

        Ok(RenderedImage {
            page: page_num,
            width: dynamic_image.width(),
            height: dynamic_image.height(),
            format: config.format,
            data,
        })
    }

    fn page_dimensions(&self, index: u32, scale: f32) -> Result<PageDimensions> {
        let page = self.page(index)?;
        Ok(PageDimensions::from_points(
            page.width().value,
            page.height().value,
            rotation_degrees(&page),
            scale,
        ))
    }
}
