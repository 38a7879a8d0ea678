//! OCR engine seam
//!
//! An [`OcrEngine`] creates sessions; a session holds the loaded language
//! model and recognizes any number of images before it is terminated.
//! Session creation is the expensive step, so callers keep one session per
//! batch.

use crate::error::{Error, Result};
use crate::pdf::RenderedImage;
use std::sync::Arc;

/// Raw engine output for one image
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Confidence in 0-100, as engines report it
    pub confidence: f32,
}

/// Status update emitted by an engine while it works
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    /// Engine-defined phase name, e.g. "recognizing text"
    pub status: String,
    /// Phase progress in 0.0-1.0
    pub progress: f32,
}

impl EngineEvent {
    pub fn new(status: impl Into<String>, progress: f32) -> Self {
        Self {
            status: status.into(),
            progress,
        }
    }
}

/// Callback receiving engine status updates
pub type EngineEvents = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// A text recognition engine
pub trait OcrEngine: Send + Sync {
    /// Engine identifier for logs
    fn name(&self) -> &'static str;

    /// Load `language` and return a ready session.
    ///
    /// The language code is passed to the engine verbatim.
    fn create_session(&self, language: &str, events: EngineEvents)
        -> Result<Box<dyn OcrSession>>;
}

/// A loaded engine instance
pub trait OcrSession {
    /// Recognize text in an encoded image.
    fn recognize(&mut self, image: &RenderedImage) -> Result<Recognition>;

    /// Release the session.
    fn terminate(self: Box<Self>) -> Result<()>;
}

/// Engine used when no OCR backend is compiled in
#[derive(Debug, Default, Clone)]
pub struct UnavailableEngine;

impl OcrEngine for UnavailableEngine {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn create_session(
        &self,
        _language: &str,
        _events: EngineEvents,
    ) -> Result<Box<dyn OcrSession>> {
        Err(Error::engine(
            "engine init",
            "no OCR backend available; build with the `tesseract` feature",
        ))
    }
}

/// The engine this build was compiled with.
#[cfg(feature = "tesseract")]
pub fn default_engine(config: &crate::config::ServiceConfig) -> Arc<dyn OcrEngine> {
    Arc::new(crate::ocr::tesseract::TesseractEngine::new(
        config.tessdata_dir.clone(),
    ))
}

/// The engine this build was compiled with.
#[cfg(not(feature = "tesseract"))]
pub fn default_engine(_config: &crate::config::ServiceConfig) -> Arc<dyn OcrEngine> {
    tracing::warn!("Built without an OCR backend; text extraction will fail");
    Arc::new(UnavailableEngine)
}
