//! Document loading and the rasterizer backend seam
//!
//! A [`DocumentHandle`] owns one loaded document for the duration of a call.
//! Every page of the document can be rendered through the same handle
//! without reopening the bytes.

use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::pdf::rasterizer::{PageDimensions, RenderedImage};

/// A rasterization engine able to load PDF bytes.
///
/// Implementations are created and used on a single thread.
pub trait RasterBackend {
    /// Short engine identifier for logs
    fn name(&self) -> &'static str;

    /// Parse `data` into an engine-side document.
    fn load<'a>(&'a self, data: &[u8]) -> Result<Box<dyn LoadedDocument + 'a>>;
}

/// Creates rasterizer backends on the thread that will use them.
pub trait RasterBackendFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn RasterBackend>>;
}

/// An engine-side document. Dropping it releases the engine resources.
pub trait LoadedDocument {
    fn page_count(&self) -> u32;

    /// Render the page at `index` (zero-based, already bounds-checked).
    fn render_page(&self, index: u32, config: &RenderConfig) -> Result<RenderedImage>;

    /// Geometry of the page at `index` (zero-based, already bounds-checked).
    fn page_dimensions(&self, index: u32, scale: f32) -> Result<PageDimensions>;
}

/// Owned handle to a loaded document
pub struct DocumentHandle<'a> {
    inner: Option<Box<dyn LoadedDocument + 'a>>,
    page_count: u32,
}

impl<'a> DocumentHandle<'a> {
    /// Open `data` with `backend`.
    ///
    /// Fails if the input is empty, not a PDF, encrypted, malformed, or has
    /// no pages.
    pub fn open(backend: &'a dyn RasterBackend, data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::InvalidPdf {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        tracing::debug!(bytes = data.len(), backend = backend.name(), "Loading PDF document");
        let document = backend.load(data)?;
        let page_count = document.page_count();
        if page_count == 0 {
            return Err(Error::NoPages);
        }

        tracing::debug!(pages = page_count, "PDF loaded");
        Ok(Self {
            inner: Some(document),
            page_count,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn document(&self) -> Result<&(dyn LoadedDocument + 'a)> {
        self.inner.as_deref().ok_or(Error::DocumentClosed)
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index >= self.page_count {
            return Err(Error::PageOutOfBounds {
                index,
                total: self.page_count,
            });
        }
        Ok(())
    }

    /// Render one page (zero-based index).
    pub fn render(&self, index: u32, config: &RenderConfig) -> Result<RenderedImage> {
        let document = self.document()?;
        self.check_index(index)?;
        document.render_page(index, config)
    }

    /// Page geometry at `scale` (zero-based index).
    pub fn page_dimensions(&self, index: u32, scale: f32) -> Result<PageDimensions> {
        let document = self.document()?;
        self.check_index(index)?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidArgument {
                reason: format!("scale must be a positive number, got {}", scale),
            });
        }
        document.page_dimensions(index, scale)
    }

    /// Release the document. Calling this twice is a no-op.
    pub fn close(&mut self) {
        match self.inner.take() {
            Some(document) => {
                drop(document);
                tracing::debug!("PDF document released");
            }
            None => tracing::warn!("DocumentHandle::close called on a closed handle"),
        }
    }
}

impl Drop for DocumentHandle<'_> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            self.close();
        }
    }
}
