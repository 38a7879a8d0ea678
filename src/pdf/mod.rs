//! PDF processing layer
//!
//! Rasterization runs on PDFium behind the [`RasterBackend`] seam; document
//! mutation runs on qpdf.

mod loader;
mod mutator;
mod pdfium;
mod rasterizer;

pub use loader::{DocumentHandle, LoadedDocument, RasterBackend, RasterBackendFactory};
pub use mutator::{PdfMutator, MIN_PASSWORD_LEN};
pub use pdfium::{PdfiumBackend, PdfiumFactory};
pub use rasterizer::{
    encode_image, page_dimensions, render_page_to_image, render_pages_to_images, PageDimensions,
    RenderedImage,
};
