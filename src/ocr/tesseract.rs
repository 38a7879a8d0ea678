//! Tesseract OCR backend (feature `tesseract`)
//!
//! Uses the native libtesseract through the `tesseract` crate. Its API is
//! consuming (each step takes and returns the instance), so the session
//! keeps the instance in an `Option` between steps.

use crate::error::{Error, Result};
use crate::ocr::engine::{EngineEvent, EngineEvents, OcrEngine, OcrSession, Recognition};
use crate::pdf::RenderedImage;
use std::path::PathBuf;
use tesseract::Tesseract;

/// Engine backed by libtesseract
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine {
    tessdata_dir: Option<PathBuf>,
}

impl TesseractEngine {
    /// `tessdata_dir` overrides the library's default traineddata search path.
    pub fn new(tessdata_dir: Option<PathBuf>) -> Self {
        Self { tessdata_dir }
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn create_session(&self, language: &str, events: EngineEvents) -> Result<Box<dyn OcrSession>> {
        events(EngineEvent::new("loading language", 0.0));
        let datapath = self
            .tessdata_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let api = init_api(datapath.as_deref(), language)?;
        events(EngineEvent::new("loading language", 1.0));
        events(EngineEvent::new("initializing api", 1.0));

        Ok(Box::new(TesseractSession {
            api: Some(api),
            datapath,
            language: language.to_string(),
            events,
        }))
    }
}

fn init_api(datapath: Option<&str>, language: &str) -> Result<Tesseract> {
    Tesseract::new(datapath, Some(language))
        .map_err(|e| Error::engine("engine init", format!("language '{}': {}", language, e)))
}

struct TesseractSession {
    api: Option<Tesseract>,
    datapath: Option<String>,
    language: String,
    events: EngineEvents,
}

impl OcrSession for TesseractSession {
    fn recognize(&mut self, image: &RenderedImage) -> Result<Recognition> {
        // A failed step consumes the instance; reload it for the next page.
        let api = match self.api.take() {
            Some(api) => api,
            None => init_api(self.datapath.as_deref(), &self.language)?,
        };

        (self.events)(EngineEvent::new("recognizing text", 0.0));
        let mut api = api
            .set_image_from_mem(&image.data)
            .map_err(|e| Error::engine("recognize", format!("page {}: {}", image.page, e)))?
            .recognize()
            .map_err(|e| Error::engine("recognize", format!("page {}: {}", image.page, e)))?;

        let text = api
            .get_text()
            .map_err(|e| Error::engine("recognize", format!("page {}: {}", image.page, e)))?;
        let confidence = api.mean_text_conf() as f32;
        (self.events)(EngineEvent::new("recognizing text", 1.0));

        self.api = Some(api);
        Ok(Recognition { text, confidence })
    }

    fn terminate(self: Box<Self>) -> Result<()> {
        // Dropping the instance calls TessBaseAPIEnd/Delete.
        drop(self.api);
        Ok(())
    }
}
