//! Shared fixtures: generated PDFs and in-memory engines
#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use pdf_ocr_toolkit::ocr::{EngineEvent, EngineEvents, OcrEngine, OcrSession, Recognition};
use pdf_ocr_toolkit::pdf::{
    LoadedDocument, PageDimensions, RasterBackend, RasterBackendFactory, RenderedImage,
};
use pdf_ocr_toolkit::{Error, RenderConfig, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Generated PDFs
// ============================================================================

/// Build a PDF with one page per entry; each page's MediaBox width is the
/// entry, so page order survives a round trip through qpdf.
pub fn pdf_with_widths(widths: &[i64]) -> Vec<u8> {
    let pages: Vec<(i64, i64)> = widths.iter().map(|&width| (width, 0)).collect();
    pdf_with_rotated_pages(&pages)
}

/// Build a PDF from `(width, rotate)` pairs; a non-zero `rotate` sets the
/// page's `/Rotate` entry. Heights are always 792.
pub fn pdf_with_rotated_pages(pages: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for &(width, rotate) in pages {
        let content = Stream::new(dictionary! {}, b"BT /F1 12 Tf 72 720 Td (x) Tj ET".to_vec());
        let content_id = doc.add_object(content);
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(792),
            ],
            "Contents" => content_id,
        };
        if rotate != 0 {
            page.set("Rotate", Object::Integer(rotate));
        }
        let page_id = doc.add_object(page);
        kids.push(Object::Reference(page_id));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(pages.len() as i64),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("Failed to serialize fixture PDF");
    out
}

/// MediaBox widths of every page, in page order.
pub fn page_widths(data: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(data).expect("Failed to parse output PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).expect("page dictionary");
            let media_box = page
                .get(b"MediaBox")
                .and_then(|o| o.as_array())
                .expect("MediaBox array");
            media_box[2].as_float().expect("numeric width").round() as i64
        })
        .collect()
}

// ============================================================================
// Fake rasterizer
// ============================================================================

/// Rasterizer serving `pages` pages; pages in `failing` fail to render.
#[derive(Clone, Default)]
pub struct FakeRaster {
    pub pages: u32,
    pub failing: HashSet<u32>,
    pub loads: Arc<AtomicU32>,
    pub releases: Arc<AtomicU32>,
}

impl FakeRaster {
    pub fn new(pages: u32) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, index: u32) -> Self {
        self.failing.insert(index);
        self
    }
}

impl RasterBackendFactory for FakeRaster {
    fn create(&self) -> Result<Box<dyn RasterBackend>> {
        Ok(Box::new(self.clone()))
    }
}

impl RasterBackend for FakeRaster {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn load<'a>(&'a self, _data: &[u8]) -> Result<Box<dyn LoadedDocument + 'a>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDocument { raster: self }))
    }
}

struct FakeDocument<'a> {
    raster: &'a FakeRaster,
}

impl LoadedDocument for FakeDocument<'_> {
    fn page_count(&self) -> u32 {
        self.raster.pages
    }

    fn render_page(&self, index: u32, config: &RenderConfig) -> Result<RenderedImage> {
        if self.raster.failing.contains(&index) {
            return Err(Error::Render {
                page: index + 1,
                reason: "simulated rasterizer failure".to_string(),
            });
        }
        Ok(RenderedImage {
            page: index + 1,
            width: (612.0 * config.scale) as u32,
            height: (792.0 * config.scale) as u32,
            format: config.format,
            data: vec![index as u8; 4],
        })
    }

    fn page_dimensions(&self, _index: u32, scale: f32) -> Result<PageDimensions> {
        Ok(PageDimensions::from_points(612.0, 792.0, 0, scale))
    }
}

impl Drop for FakeDocument<'_> {
    fn drop(&mut self) {
        self.raster.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Fake OCR engine
// ============================================================================

/// Engine answering "text of page N" with confidence `50 + N`.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    pub fail_init: bool,
    /// Page numbers (1-based) whose recognition fails
    pub failing_pages: HashSet<u32>,
    pub sessions: Arc<AtomicU32>,
    pub terminations: Arc<AtomicU32>,
    pub languages: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn failing_on_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn sessions(&self) -> u32 {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> u32 {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl OcrEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn create_session(&self, language: &str, events: EngineEvents) -> Result<Box<dyn OcrSession>> {
        events(EngineEvent::new("loading tesseract core", 1.0));
        if self.fail_init {
            return Err(Error::engine("engine init", format!("no traineddata for '{}'", language)));
        }
        self.sessions.fetch_add(1, Ordering::SeqCst);
        self.languages
            .lock()
            .expect("languages lock")
            .push(language.to_string());
        events(EngineEvent::new("loading language", 1.0));

        Ok(Box::new(ScriptedSession {
            engine: self.clone(),
            events,
        }))
    }
}

struct ScriptedSession {
    engine: ScriptedEngine,
    events: EngineEvents,
}

impl OcrSession for ScriptedSession {
    fn recognize(&mut self, image: &RenderedImage) -> Result<Recognition> {
        (self.events)(EngineEvent::new("recognizing text", 0.5));
        if self.engine.failing_pages.contains(&image.page) {
            return Err(Error::engine("recognize", "simulated engine failure"));
        }
        Ok(Recognition {
            text: format!("\n  text of page {}  \n", image.page),
            confidence: 50.0 + image.page as f32,
        })
    }

    fn terminate(self: Box<Self>) -> Result<()> {
        self.engine.terminations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A 2x2 PNG
pub fn tiny_png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::ImageBuffer::from_pixel(
        2,
        2,
        image::Rgb([255, 255, 255]),
    ));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}
