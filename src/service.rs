//! Service facade
//!
//! [`PdfOcrService`] is created once with its configuration and engine
//! backends, then shared (typically in an `Arc`). Every operation is an
//! `async fn` that moves engine work onto the blocking thread pool; the
//! rasterizer backend is created inside that task because PDFium is not
//! thread-safe.

use crate::config::{RenderConfig, ServiceConfig};
use crate::error::{Error, Result};
use crate::ocr::{self, default_engine, BatchResult, ImageInput, OcrEngine, ProgressRelay};
use crate::pdf::{
    self, PageDimensions, PdfMutator, PdfiumFactory, RasterBackendFactory, RenderedImage,
};
use std::sync::Arc;

/// Run `f` on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::TaskJoin {
            reason: e.to_string(),
        })?
}

/// OCR and PDF manipulation service
#[derive(Clone)]
pub struct PdfOcrService {
    config: ServiceConfig,
    raster: Arc<dyn RasterBackendFactory>,
    engine: Arc<dyn OcrEngine>,
}

impl std::fmt::Debug for PdfOcrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfOcrService")
            .field("config", &self.config)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl Default for PdfOcrService {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}

impl PdfOcrService {
    /// Service on PDFium and the OCR engine this build was compiled with.
    pub fn new(config: ServiceConfig) -> Self {
        let raster = Arc::new(PdfiumFactory::new(
            config.pdfium_library_dirs.clone(),
            config.max_render_pixels,
        ));
        let engine = default_engine(&config);
        Self::with_backends(config, raster, engine)
    }

    /// Service on explicit backends.
    pub fn with_backends(
        config: ServiceConfig,
        raster: Arc<dyn RasterBackendFactory>,
        engine: Arc<dyn OcrEngine>,
    ) -> Self {
        tracing::debug!(engine = engine.name(), "PDF/OCR service created");
        Self {
            config,
            raster,
            engine,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn language(&self, language: Option<&str>) -> String {
        language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(self.config.default_language.as_str())
            .to_string()
    }

    fn render_config(&self, render: Option<RenderConfig>) -> Result<RenderConfig> {
        match render {
            Some(render) => {
                self.config.check_render(&render)?;
                Ok(render)
            }
            None => Ok(self.config.render.clone()),
        }
    }

    /// OCR every page of a PDF.
    ///
    /// `language` falls back to the configured default when `None` or blank.
    pub async fn extract_text_from_pdf(
        &self,
        data: Vec<u8>,
        language: Option<&str>,
        progress: ProgressRelay,
    ) -> Result<BatchResult> {
        let language = self.language(language);
        let render = self.config.render.clone();
        let raster = self.raster.clone();
        let engine = self.engine.clone();

        run_blocking(move || {
            let backend = raster.create().map_err(|e| e.during("OCR"))?;
            ocr::extract_text_from_pdf(
                backend.as_ref(),
                engine.as_ref(),
                &data,
                &language,
                &render,
                &progress,
            )
        })
        .await
    }

    /// OCR a single image given as bytes or a `data:` URL.
    pub async fn extract_text_from_image(
        &self,
        input: ImageInput,
        language: Option<&str>,
        progress: ProgressRelay,
    ) -> Result<BatchResult> {
        let language = self.language(language);
        let engine = self.engine.clone();

        run_blocking(move || {
            ocr::extract_text_from_image(engine.as_ref(), input, &language, &progress)
        })
        .await
    }

    /// Concatenate PDFs in order.
    pub async fn merge_pdfs(&self, inputs: Vec<Vec<u8>>) -> Result<Vec<u8>> {
        run_blocking(move || {
            let slices: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();
            PdfMutator::merge(&slices)
        })
        .await
        .map_err(|e| e.during("PDF merge"))
    }

    /// Extract the given zero-based pages, in the order given.
    pub async fn split_pdf(&self, data: Vec<u8>, page_indices: Vec<u32>) -> Result<Vec<u8>> {
        run_blocking(move || PdfMutator::split(&data, &page_indices))
            .await
            .map_err(|e| e.during("PDF split"))
    }

    /// Encrypt with a user/owner password.
    pub async fn protect_pdf(&self, data: Vec<u8>, password: String) -> Result<Vec<u8>> {
        run_blocking(move || PdfMutator::protect(&data, &password))
            .await
            .map_err(|e| e.during("PDF protection"))
    }

    pub async fn get_page_count(&self, data: Vec<u8>) -> Result<u32> {
        run_blocking(move || PdfMutator::page_count(&data))
            .await
            .map_err(|e| e.during("Page count"))
    }

    /// Best-effort structural compression; see [`PdfMutator::compress`].
    pub async fn compress_pdf(&self, data: Vec<u8>, quality: f32) -> Result<Vec<u8>> {
        run_blocking(move || PdfMutator::compress(&data, quality))
            .await
            .map_err(|e| e.during("PDF compression"))
    }

    /// Page geometry at `scale` (default 1.0).
    pub async fn get_page_dimensions(
        &self,
        data: Vec<u8>,
        page_index: u32,
        scale: Option<f32>,
    ) -> Result<PageDimensions> {
        let scale = scale.unwrap_or(1.0);
        if scale > self.config.max_render_scale {
            return Err(Error::InvalidArgument {
                reason: format!(
                    "scale {} exceeds maximum of {}",
                    scale, self.config.max_render_scale
                ),
            }
            .during("Page dimensions"));
        }
        let raster = self.raster.clone();

        run_blocking(move || {
            let backend = raster.create()?;
            pdf::page_dimensions(backend.as_ref(), &data, page_index, scale)
        })
        .await
        .map_err(|e| e.during("Page dimensions"))
    }

    /// Render one page; `None` uses the configured defaults.
    pub async fn render_page_to_image(
        &self,
        data: Vec<u8>,
        page_index: u32,
        render: Option<RenderConfig>,
    ) -> Result<RenderedImage> {
        let render = self
            .render_config(render)
            .map_err(|e| e.during("Page rendering"))?;
        let raster = self.raster.clone();

        run_blocking(move || {
            let backend = raster.create()?;
            pdf::render_page_to_image(backend.as_ref(), &data, page_index, &render)
        })
        .await
        .map_err(|e| e.during("Page rendering"))
    }

    /// Render several pages through one loaded document.
    ///
    /// All indices are checked before the first page is rendered.
    pub async fn render_pages_to_images(
        &self,
        data: Vec<u8>,
        page_indices: Vec<u32>,
        render: Option<RenderConfig>,
    ) -> Result<Vec<RenderedImage>> {
        let render = self
            .render_config(render)
            .map_err(|e| e.during("Page rendering"))?;
        let raster = self.raster.clone();

        run_blocking(move || {
            let backend = raster.create()?;
            pdf::render_pages_to_images(
                backend.as_ref(),
                &data,
                &page_indices,
                &render,
                |position, total, image| {
                    tracing::trace!(
                        page = image.page,
                        position = position + 1,
                        total,
                        "Page image ready"
                    );
                },
            )
        })
        .await
        .map_err(|e| e.during("Page rendering"))
    }
}
