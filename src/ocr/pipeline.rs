//! Batch OCR pipeline
//!
//! Loads a document once, then for each page in ascending order renders a
//! raster and feeds it to the batch session. A page that fails to render or
//! recognize is recorded as empty text with zero confidence; the batch still
//! completes. Only document-level and engine-start failures abort the call.

use crate::config::RenderConfig;
use crate::error::Result;
use crate::ocr::driver::RecognitionDriver;
use crate::ocr::engine::OcrEngine;
use crate::ocr::input::ImageInput;
use crate::ocr::progress::{ProgressRelay, ProgressStage};
use crate::ocr::result::{BatchResult, PageText};
use crate::pdf::{DocumentHandle, RasterBackend};
use std::collections::BTreeMap;
use std::time::Instant;

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Recognize every page of a PDF.
pub fn extract_text_from_pdf(
    backend: &dyn RasterBackend,
    engine: &dyn OcrEngine,
    data: &[u8],
    language: &str,
    render: &RenderConfig,
    relay: &ProgressRelay,
) -> Result<BatchResult> {
    run_pdf_batch(backend, engine, data, language, render, relay).map_err(|e| e.during("OCR"))
}

fn run_pdf_batch(
    backend: &dyn RasterBackend,
    engine: &dyn OcrEngine,
    data: &[u8],
    language: &str,
    render: &RenderConfig,
    relay: &ProgressRelay,
) -> Result<BatchResult> {
    let start = Instant::now();
    relay.emit(0, 0, ProgressStage::Loading, 0.0);

    let mut handle = DocumentHandle::open(backend, data)?;
    let total = handle.page_count();
    tracing::info!(pages = total, language, "Starting PDF OCR");
    relay.emit(0, total, ProgressStage::Loading, 0.0);

    let mut driver = RecognitionDriver::start(engine, language, relay.engine_events())?;

    let mut pages = BTreeMap::new();
    for index in 0..total {
        let page_number = index + 1;
        relay.emit(
            page_number,
            total,
            ProgressStage::Processing,
            index as f32 / total as f32 * 100.0,
        );

        let page = match handle
            .render(index, render)
            .and_then(|image| driver.recognize(&image))
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(page = page_number, error = %e, "Page OCR failed, recording empty result");
                PageText::empty()
            }
        };
        pages.insert(page_number, page);
    }

    driver.finish();
    handle.close();

    let result = BatchResult {
        pages,
        total_pages: total,
        processing_time_ms: elapsed_ms(start),
        language: language.to_string(),
    };
    relay.emit(total, total, ProgressStage::Complete, 100.0);
    tracing::info!(
        pages = total,
        empty = result.empty_pages(),
        elapsed_ms = result.processing_time_ms,
        "PDF OCR complete"
    );
    Ok(result)
}

/// Recognize a single image, reported as a one-page batch.
pub fn extract_text_from_image(
    engine: &dyn OcrEngine,
    input: ImageInput,
    language: &str,
    relay: &ProgressRelay,
) -> Result<BatchResult> {
    run_image_batch(engine, input, language, relay).map_err(|e| e.during("Image OCR"))
}

fn run_image_batch(
    engine: &dyn OcrEngine,
    input: ImageInput,
    language: &str,
    relay: &ProgressRelay,
) -> Result<BatchResult> {
    let start = Instant::now();
    relay.emit(0, 1, ProgressStage::Loading, 0.0);
    let image = input.into_image()?;

    let mut driver = RecognitionDriver::start(engine, language, relay.engine_events())?;
    relay.emit(1, 1, ProgressStage::Processing, 0.0);
    let page = driver.recognize(&image)?;
    driver.finish();

    let mut pages = BTreeMap::new();
    pages.insert(1, page);
    relay.emit(1, 1, ProgressStage::Complete, 100.0);

    Ok(BatchResult {
        pages,
        total_pages: 1,
        processing_time_ms: elapsed_ms(start),
        language: language.to_string(),
    })
}
