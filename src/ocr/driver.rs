//! Recognition driver
//!
//! Owns one engine session for a batch. The session is terminated exactly
//! once: by [`RecognitionDriver::finish`] on the success path, or by `Drop`
//! when the batch bails out early.

use crate::error::{Error, Result};
use crate::ocr::engine::{EngineEvents, OcrEngine, OcrSession};
use crate::ocr::result::PageText;
use crate::pdf::RenderedImage;

pub struct RecognitionDriver {
    session: Option<Box<dyn OcrSession>>,
    engine: &'static str,
}

impl RecognitionDriver {
    /// Create the batch session, loading `language` into the engine.
    pub fn start(engine: &dyn OcrEngine, language: &str, events: EngineEvents) -> Result<Self> {
        tracing::debug!(engine = engine.name(), language, "Starting OCR session");
        let session = engine.create_session(language, events)?;
        Ok(Self {
            session: Some(session),
            engine: engine.name(),
        })
    }

    /// Recognize one raster and normalize the engine output.
    pub fn recognize(&mut self, image: &RenderedImage) -> Result<PageText> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::engine("recognize", "session already terminated"))?;
        let recognition = session.recognize(image)?;
        let page = PageText::from_engine(&recognition.text, recognition.confidence);
        tracing::debug!(
            page = image.page,
            chars = page.text.len(),
            confidence = page.confidence,
            "Recognized page"
        );
        Ok(page)
    }

    /// Terminate the session. Termination failures are logged, not returned.
    pub fn finish(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        if let Some(session) = self.session.take() {
            match session.terminate() {
                Ok(()) => tracing::debug!(engine = self.engine, "OCR session terminated"),
                Err(e) => {
                    tracing::warn!(engine = self.engine, error = %e, "Failed to terminate OCR session")
                }
            }
        }
    }
}

impl Drop for RecognitionDriver {
    fn drop(&mut self) {
        self.terminate();
    }
}
