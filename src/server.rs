//! MCP server exposing the toolkit over stdio

use crate::config::{RenderConfig, ServiceConfig};
use crate::error::Error;
use crate::ocr::{BatchResult, ImageInput, ProgressEvent, ProgressRelay};
use crate::pdf::PageDimensions;
use crate::service::PdfOcrService;
use base64::Engine;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// PDF source specification
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum PdfSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the PDF file
        path: String,
    },
    /// Base64 encoded PDF data
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
    },
}

impl<'de> serde::Deserialize<'de> for PdfSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let Some(obj) = value.as_object() else {
            return Err(serde::de::Error::custom(format!(
                "Invalid source: expected an object with \"path\" or \"base64\", but got {}",
                json_type_name(&value)
            )));
        };
        if let Some(v) = obj.get("path") {
            return match v.as_str() {
                Some(s) => Ok(PdfSource::Path {
                    path: s.to_string(),
                }),
                None => Err(serde::de::Error::custom("\"path\" must be a string")),
            };
        }
        if let Some(v) = obj.get("base64") {
            return match v.as_str() {
                Some(s) => Ok(PdfSource::Base64 {
                    base64: s.to_string(),
                }),
                None => Err(serde::de::Error::custom("\"base64\" must be a string")),
            };
        }
        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "Invalid source: expected an object with \"path\" or \"base64\", but got keys: {:?}",
            keys
        )))
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Null => "null",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Image source for OCR
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ImageSource {
    /// `data:image/...;base64,...` URL
    DataUrl {
        /// Data URL of the image
        data_url: String,
    },
    /// Base64 encoded image bytes
    Base64 {
        /// Base64 encoded image content
        base64: String,
    },
    /// Image file path
    Path {
        /// Path to the image file
        path: String,
    },
}

/// MCP server wrapping a [`PdfOcrService`]
#[derive(Clone)]
pub struct PdfServer {
    service: Arc<PdfOcrService>,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Request/Response types for OCR
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractTextFromPdfParams {
    /// PDF to recognize
    pub source: PdfSource,
    /// Tesseract language code, e.g. "eng" or "eng+deu" (default: "eng")
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractTextFromImageParams {
    /// Image to recognize
    pub image: ImageSource,
    /// Tesseract language code (default: "eng")
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct OcrPage {
    /// Page number (1-indexed)
    pub page: u32,
    pub text: String,
    /// Recognition confidence (0.0-1.0)
    pub confidence: f32,
}

#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct OcrResult {
    pub source: String,
    pub total_pages: u32,
    pub processing_time_ms: u64,
    pub language: String,
    pub pages: Vec<OcrPage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OcrResult {
    fn from_batch(source: String, batch: BatchResult) -> Self {
        Self {
            source,
            total_pages: batch.total_pages,
            processing_time_ms: batch.processing_time_ms,
            language: batch.language,
            pages: batch
                .pages
                .into_iter()
                .map(|(page, text)| OcrPage {
                    page,
                    text: text.text,
                    confidence: text.confidence,
                })
                .collect(),
            error: None,
        }
    }
}

// ============================================================================
// Request/Response types for document operations
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MergePdfsParams {
    /// PDFs to merge, in output order
    pub sources: Vec<PdfSource>,
    /// Write the result here instead of returning it as base64
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SplitPdfParams {
    pub source: PdfSource,
    /// Zero-based page indices to extract, in output order (repeats allowed)
    pub pages: Vec<u32>,
    /// Write the result here instead of returning it as base64
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProtectPdfParams {
    pub source: PdfSource,
    /// Password required to open the PDF (at least 6 characters)
    pub password: String,
    /// Write the result here instead of returning it as base64
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompressPdfParams {
    pub source: PdfSource,
    /// Quality factor 0.0-1.0 (default: 0.8). Accepted for compatibility;
    /// compression is structural only.
    #[serde(default = "default_compress_quality")]
    pub quality: f32,
    /// Write the result here instead of returning it as base64
    #[serde(default)]
    pub output_path: Option<String>,
}

fn default_compress_quality() -> f32 {
    0.8
}

#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct PdfOutputResult {
    /// Number of pages in the produced PDF
    pub output_page_count: u32,
    /// Size of the produced PDF in bytes
    pub output_bytes: usize,
    /// Base64 encoded PDF (omitted when written to `output_path`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_base64: Option<String>,
    /// Path where the PDF was saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PageCountParams {
    pub source: PdfSource,
}

#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct PageCountResult {
    pub source: String,
    pub page_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for rendering
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PageDimensionsParams {
    pub source: PdfSource,
    /// Zero-based page index
    pub page_index: u32,
    /// Scale factor (default: 1.0, i.e. PDF points)
    #[serde(default)]
    pub scale: Option<f32>,
}

#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct PageDimensionsResult {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<PageDimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenderPageParams {
    pub source: PdfSource,
    /// Zero-based page index
    pub page_index: u32,
    /// Render options (default: scale 2.0, png, white background)
    #[serde(default)]
    pub render: Option<RenderConfig>,
}

#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct RenderPageResult {
    pub source: String,
    /// Page number (1-indexed)
    pub page: u32,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    /// `data:` URL with the encoded image
    pub data_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl PdfServer {
    pub fn new() -> Self {
        Self::with_service(PdfOcrService::new(ServiceConfig::default()))
    }

    pub fn with_service(service: PdfOcrService) -> Self {
        Self {
            service: Arc::new(service),
            tool_router: Self::tool_router(),
        }
    }

    /// OCR every page of a PDF
    #[tool(
        description = "Recognize text on every page of a PDF by rendering each page and running OCR. Returns per-page text and confidence (0.0-1.0). Pages that fail are returned with empty text and zero confidence.

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn extract_text_from_pdf(
        &self,
        Parameters(params): Parameters<ExtractTextFromPdfParams>,
    ) -> String {
        let source = Self::source_name(&params.source);
        let result = self
            .process_extract_text_from_pdf(&params)
            .await
            .map(|batch| OcrResult::from_batch(source.clone(), batch))
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_text_from_pdf failed");
                OcrResult {
                    source,
                    error: Some(e.client_message()),
                    ..OcrResult::default()
                }
            });
        to_json(&result)
    }

    /// OCR a single image
    #[tool(
        description = "Recognize text in a single image (PNG, JPEG, or any common raster format).

Image format: {\"data_url\": \"data:image/png;base64,...\"}, {\"base64\": \"...\"}, or {\"path\": \"/absolute/path.png\"}"
    )]
    async fn extract_text_from_image(
        &self,
        Parameters(params): Parameters<ExtractTextFromImageParams>,
    ) -> String {
        let source = Self::image_source_name(&params.image);
        let result = self
            .process_extract_text_from_image(&params)
            .await
            .map(|batch| OcrResult::from_batch(source.clone(), batch))
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_text_from_image failed");
                OcrResult {
                    source,
                    error: Some(e.client_message()),
                    ..OcrResult::default()
                }
            });
        to_json(&result)
    }

    /// Merge multiple PDFs into one
    #[tool(
        description = "Merge PDF files into a single PDF, in the order given.

Source format: each element must be {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn merge_pdfs(&self, Parameters(params): Parameters<MergePdfsParams>) -> String {
        let result = self.process_merge_pdfs(&params).await;
        to_json(&self.finish_output("merge_pdfs", result, &params.output_path).await)
    }

    /// Build a PDF from selected pages
    #[tool(
        description = "Create a new PDF from selected pages of a PDF. Pages are zero-based indices, copied in the order given; repeats are allowed. Any out-of-range index fails the whole request.

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn split_pdf(&self, Parameters(params): Parameters<SplitPdfParams>) -> String {
        let result = self.process_split_pdf(&params).await;
        to_json(&self.finish_output("split_pdf", result, &params.output_path).await)
    }

    /// Password-protect a PDF
    #[tool(
        description = "Encrypt a PDF with AES-256. The password (at least 6 characters) is required to open the file. Printing and accessibility extraction stay allowed; modification, copying, annotation, form filling and page assembly are disallowed.

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn protect_pdf(&self, Parameters(params): Parameters<ProtectPdfParams>) -> String {
        let result = self.process_protect_pdf(&params).await;
        to_json(&self.finish_output("protect_pdf", result, &params.output_path).await)
    }

    /// Count pages
    #[tool(description = "Get the number of pages in a PDF.

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}")]
    async fn get_page_count(&self, Parameters(params): Parameters<PageCountParams>) -> String {
        let source = Self::source_name(&params.source);
        let result = match self.resolve_source(&params.source).await {
            Ok(data) => self.service.get_page_count(data).await,
            Err(e) => Err(e),
        };
        let response = result
            .map(|page_count| PageCountResult {
                source: source.clone(),
                page_count,
                error: None,
            })
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "get_page_count failed");
                PageCountResult {
                    source,
                    error: Some(e.client_message()),
                    ..PageCountResult::default()
                }
            });
        to_json(&response)
    }

    /// Re-serialize a PDF with structural compression
    #[tool(
        description = "Re-save a PDF with object streams and stream compression, dropping unreferenced objects. Best effort: embedded images are not recompressed and the output may not be smaller.

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn compress_pdf(&self, Parameters(params): Parameters<CompressPdfParams>) -> String {
        let result = match self.resolve_source(&params.source).await {
            Ok(data) => self.service.compress_pdf(data, params.quality).await,
            Err(e) => Err(e),
        };
        to_json(&self.finish_output("compress_pdf", result, &params.output_path).await)
    }

    /// Page geometry
    #[tool(
        description = "Get the width, height (in pixels at the given scale, after rotation) and rotation of a page. Page index is zero-based.

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn get_page_dimensions(
        &self,
        Parameters(params): Parameters<PageDimensionsParams>,
    ) -> String {
        let source = Self::source_name(&params.source);
        let result = match self.resolve_source(&params.source).await {
            Ok(data) => {
                self.service
                    .get_page_dimensions(data, params.page_index, params.scale)
                    .await
            }
            Err(e) => Err(e),
        };
        let response = match result {
            Ok(dimensions) => PageDimensionsResult {
                source,
                dimensions: Some(dimensions),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "get_page_dimensions failed");
                PageDimensionsResult {
                    source,
                    dimensions: None,
                    error: Some(e.client_message()),
                }
            }
        };
        to_json(&response)
    }

    /// Render a page to an image
    #[tool(
        description = "Render one page of a PDF to a PNG or JPEG image, returned as a data URL. Page index is zero-based. Options: scale (default 2.0), format (\"png\" or \"jpeg\"), quality (JPEG, 0.0-1.0), background (\"#rrggbb\" or \"#rrggbbaa\").

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn render_page_to_image(
        &self,
        Parameters(params): Parameters<RenderPageParams>,
    ) -> String {
        let source = Self::source_name(&params.source);
        let result = match self.resolve_source(&params.source).await {
            Ok(data) => {
                self.service
                    .render_page_to_image(data, params.page_index, params.render.clone())
                    .await
            }
            Err(e) => Err(e),
        };
        let response = match result {
            Ok(image) => RenderPageResult {
                source,
                page: image.page,
                width: image.width,
                height: image.height,
                mime_type: image.mime_type().to_string(),
                data_url: image.to_data_url(),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "render_page_to_image failed");
                RenderPageResult {
                    source,
                    error: Some(e.client_message()),
                    ..RenderPageResult::default()
                }
            }
        };
        to_json(&response)
    }
}

impl Default for PdfServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfServer {
    fn source_name(source: &PdfSource) -> String {
        match source {
            PdfSource::Path { path } => path.clone(),
            PdfSource::Base64 { .. } => "<base64>".to_string(),
        }
    }

    fn image_source_name(source: &ImageSource) -> String {
        match source {
            ImageSource::Path { path } => path.clone(),
            ImageSource::Base64 { .. } => "<base64>".to_string(),
            ImageSource::DataUrl { .. } => "<data-url>".to_string(),
        }
    }

    async fn resolve_source(&self, source: &PdfSource) -> crate::error::Result<Vec<u8>> {
        match source {
            PdfSource::Path { path } => Ok(tokio::fs::read(path).await?),
            PdfSource::Base64 { base64 } => {
                Ok(base64::engine::general_purpose::STANDARD.decode(base64)?)
            }
        }
    }

    async fn resolve_image(&self, source: &ImageSource) -> crate::error::Result<ImageInput> {
        match source {
            ImageSource::DataUrl { data_url } => Ok(ImageInput::DataUrl(data_url.clone())),
            ImageSource::Base64 { base64 } => Ok(ImageInput::Bytes(
                base64::engine::general_purpose::STANDARD.decode(base64)?,
            )),
            ImageSource::Path { path } => Ok(ImageInput::Bytes(tokio::fs::read(path).await?)),
        }
    }

    /// Relay whose events are drained into debug logs.
    fn logging_relay(tool: &'static str) -> ProgressRelay {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                tracing::debug!(
                    tool,
                    page = event.current_page,
                    total = event.total_pages,
                    stage = %event.stage,
                    percent = event.percent,
                    "OCR progress"
                );
            }
        });
        ProgressRelay::channel(tx)
    }

    async fn process_extract_text_from_pdf(
        &self,
        params: &ExtractTextFromPdfParams,
    ) -> crate::error::Result<BatchResult> {
        let data = self.resolve_source(&params.source).await?;
        self.service
            .extract_text_from_pdf(
                data,
                params.language.as_deref(),
                Self::logging_relay("extract_text_from_pdf"),
            )
            .await
    }

    async fn process_extract_text_from_image(
        &self,
        params: &ExtractTextFromImageParams,
    ) -> crate::error::Result<BatchResult> {
        let input = self.resolve_image(&params.image).await?;
        self.service
            .extract_text_from_image(
                input,
                params.language.as_deref(),
                Self::logging_relay("extract_text_from_image"),
            )
            .await
    }

    async fn process_merge_pdfs(&self, params: &MergePdfsParams) -> crate::error::Result<Vec<u8>> {
        let mut inputs = Vec::with_capacity(params.sources.len());
        for source in &params.sources {
            inputs.push(self.resolve_source(source).await?);
        }
        self.service.merge_pdfs(inputs).await
    }

    async fn process_split_pdf(&self, params: &SplitPdfParams) -> crate::error::Result<Vec<u8>> {
        let data = self.resolve_source(&params.source).await?;
        self.service.split_pdf(data, params.pages.clone()).await
    }

    async fn process_protect_pdf(
        &self,
        params: &ProtectPdfParams,
    ) -> crate::error::Result<Vec<u8>> {
        let data = self.resolve_source(&params.source).await?;
        self.service
            .protect_pdf(data, params.password.clone())
            .await
    }

    /// Turn a produced PDF into a tool response, writing it to disk when
    /// `output_path` is given.
    async fn finish_output(
        &self,
        tool: &'static str,
        result: crate::error::Result<Vec<u8>>,
        output_path: &Option<String>,
    ) -> PdfOutputResult {
        let response = match result {
            Ok(data) => self.describe_output(data, output_path).await,
            Err(e) => Err(e),
        };
        response.unwrap_or_else(|e| {
            tracing::warn!(tool, error = %e, "Tool failed");
            PdfOutputResult {
                error: Some(e.client_message()),
                ..PdfOutputResult::default()
            }
        })
    }

    async fn describe_output(
        &self,
        data: Vec<u8>,
        output_path: &Option<String>,
    ) -> crate::error::Result<PdfOutputResult> {
        // Protected output cannot be reopened without the password.
        let output_page_count = match self.service.get_page_count(data.clone()).await {
            Ok(count) => count,
            Err(e) if matches!(e.kind(), crate::error::ErrorKind::Document) => 0,
            Err(e) => return Err(e),
        };
        let output_bytes = data.len();

        match output_path {
            Some(path_str) => {
                write_output(Path::new(path_str), &data).await?;
                Ok(PdfOutputResult {
                    output_page_count,
                    output_bytes,
                    output_base64: None,
                    output_path: Some(path_str.clone()),
                    error: None,
                })
            }
            None => Ok(PdfOutputResult {
                output_page_count,
                output_bytes,
                output_base64: Some(base64::engine::general_purpose::STANDARD.encode(&data)),
                output_path: None,
                error: None,
            }),
        }
    }
}

/// Write `data` to `path`, creating parent directories as needed.
async fn write_output(path: &Path, data: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, data).await?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "Wrote output PDF");
    Ok(())
}

#[tool_handler]
impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF OCR toolkit: recognize text in PDFs and images, merge, split, \
                 password-protect and compress PDFs, count pages, and render pages to images. \
                 Page indices are zero-based; page numbers in results are one-based."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server on stdio with default configuration
pub async fn run_server() -> anyhow::Result<()> {
    run_server_with_config(ServiceConfig::default()).await
}

/// Run the MCP server on stdio
pub async fn run_server_with_config(config: ServiceConfig) -> anyhow::Result<()> {
    let server = PdfServer::with_service(PdfOcrService::new(config));

    tracing::info!("PDF OCR server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
