//! OCR layer
//!
//! Drives a text recognition engine over rendered pages and reports
//! progress while doing so.

mod driver;
mod engine;
mod input;
mod pipeline;
mod progress;
mod result;
#[cfg(feature = "tesseract")]
mod tesseract;

pub use driver::RecognitionDriver;
pub use engine::{
    default_engine, EngineEvent, EngineEvents, OcrEngine, OcrSession, Recognition,
    UnavailableEngine,
};
pub use input::ImageInput;
pub use pipeline::{extract_text_from_image, extract_text_from_pdf};
pub use progress::{ProgressCallback, ProgressEvent, ProgressRelay, ProgressStage};
pub use result::{BatchResult, PageText};
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;
