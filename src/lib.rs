//! PDF OCR toolkit
//!
//! Text recognition and basic PDF manipulation over third-party engines:
//! - OCR of every page of a PDF, or of a single image, with progress events
//! - merge, split, password protection, page counting and structural
//!   compression of PDFs
//! - page rendering and page geometry
//!
//! [`PdfOcrService`] is the entry point; [`server`] exposes it as an MCP
//! tool server over stdio.

pub mod config;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod server;
pub mod service;

pub use config::{BackgroundColor, ImageFormat, RenderConfig, ServiceConfig};
pub use error::{Error, ErrorKind, Result};
pub use ocr::{BatchResult, ImageInput, PageText, ProgressEvent, ProgressRelay, ProgressStage};
pub use pdf::{PageDimensions, RenderedImage};
pub use server::{run_server, run_server_with_config, PdfServer, PdfSource};
pub use service::PdfOcrService;
