//! OCR pipeline tests against in-memory engines

mod common;

use base64::Engine;
use common::{tiny_png, FakeRaster, ScriptedEngine};
use pdf_ocr_toolkit::{
    ErrorKind, ImageInput, PdfOcrService, ProgressEvent, ProgressRelay, ProgressStage,
    ServiceConfig,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

const FAKE_PDF: &[u8] = b"%PDF-1.7\n% fake document\n";

fn service(raster: FakeRaster, engine: ScriptedEngine) -> PdfOcrService {
    PdfOcrService::with_backends(ServiceConfig::default(), Arc::new(raster), Arc::new(engine))
}

fn recording_relay() -> (ProgressRelay, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let relay = ProgressRelay::callback(move |event| sink.lock().unwrap().push(event));
    (relay, events)
}

#[tokio::test]
async fn test_one_entry_per_page() {
    let engine = ScriptedEngine::new();
    let service = service(FakeRaster::new(4), engine.clone());

    let result = service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), Some("eng"), ProgressRelay::silent())
        .await
        .unwrap();

    assert_eq!(result.total_pages, 4);
    assert_eq!(result.pages.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(result.page(3).unwrap().text, "text of page 3");
    assert_eq!(result.language, "eng");
    for page in result.pages.values() {
        assert!((0.0..=1.0).contains(&page.confidence));
    }
}

#[tokio::test]
async fn test_failed_page_recorded_as_empty() {
    let engine = ScriptedEngine::new();
    let raster = FakeRaster::new(3).failing_on(1);
    let service = service(raster, engine.clone());

    let result = service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), None, ProgressRelay::silent())
        .await
        .unwrap();

    assert_eq!(result.total_pages, 3);
    let failed = result.page(2).unwrap();
    assert_eq!(failed.text, "");
    assert_eq!(failed.confidence, 0.0);
    assert_eq!(result.page(3).unwrap().text, "text of page 3");
    assert_eq!(result.empty_pages(), 1);
}

#[tokio::test]
async fn test_engine_failure_on_page_does_not_abort() {
    let engine = ScriptedEngine::new().failing_on_page(1);
    let service = service(FakeRaster::new(2), engine.clone());

    let result = service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), None, ProgressRelay::silent())
        .await
        .unwrap();

    assert!(result.page(1).unwrap().is_empty());
    assert_eq!(result.page(2).unwrap().text, "text of page 2");
    assert_eq!(result.full_text(), "text of page 2");
}

#[tokio::test]
async fn test_one_session_terminated_once() {
    let engine = ScriptedEngine::new();
    let raster = FakeRaster::new(5).failing_on(0).failing_on(4);
    let service = service(raster.clone(), engine.clone());

    service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), Some("deu+eng"), ProgressRelay::silent())
        .await
        .unwrap();

    assert_eq!(engine.sessions(), 1);
    assert_eq!(engine.terminations(), 1);
    assert_eq!(*engine.languages.lock().unwrap(), vec!["deu+eng".to_string()]);
    assert_eq!(raster.loads.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(raster.releases.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_default_language_applied() {
    let engine = ScriptedEngine::new();
    let service = service(FakeRaster::new(1), engine.clone());

    let result = service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), Some("  "), ProgressRelay::silent())
        .await
        .unwrap();

    assert_eq!(result.language, "eng");
}

#[tokio::test]
async fn test_progress_sequence() {
    let (relay, events) = recording_relay();
    let service = service(FakeRaster::new(2), ScriptedEngine::new());

    service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), None, relay)
        .await
        .unwrap();

    let events = events.lock().unwrap();
    let summary: Vec<(u32, u32, ProgressStage, f32)> = events
        .iter()
        .map(|e| (e.current_page, e.total_pages, e.stage, e.percent))
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, 0, ProgressStage::Loading, 0.0),
            (0, 2, ProgressStage::Loading, 0.0),
            (0, 2, ProgressStage::LoadingLanguage, 100.0),
            (1, 2, ProgressStage::Processing, 0.0),
            (1, 2, ProgressStage::RecognizingText, 50.0),
            (2, 2, ProgressStage::Processing, 50.0),
            (2, 2, ProgressStage::RecognizingText, 50.0),
            (2, 2, ProgressStage::Complete, 100.0),
        ]
    );
}

#[tokio::test]
async fn test_progress_over_channel() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let service = service(FakeRaster::new(1), ScriptedEngine::new());

    service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), None, ProgressRelay::channel(tx))
        .await
        .unwrap();

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    let last = last.unwrap();
    assert_eq!(last.stage, ProgressStage::Complete);
    assert_eq!(last.percent, 100.0);
}

#[tokio::test]
async fn test_engine_init_failure_aborts() {
    let engine = ScriptedEngine::failing_init();
    let raster = FakeRaster::new(2);
    let service = service(raster.clone(), engine.clone());

    let err = service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), Some("xyz"), ProgressRelay::silent())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Engine);
    assert!(err.to_string().starts_with("OCR failed:"));
    assert_eq!(engine.terminations(), 0);
    assert_eq!(raster.releases.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_document_errors_abort() {
    let service = service(FakeRaster::new(1), ScriptedEngine::new());

    let err = service
        .extract_text_from_pdf(Vec::new(), None, ProgressRelay::silent())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Document);

    let err = service
        .extract_text_from_pdf(b"PK\x03\x04 zip".to_vec(), None, ProgressRelay::silent())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Document);
    assert!(err.client_message().starts_with("OCR failed:"));
}

#[tokio::test]
async fn test_zero_page_document() {
    let engine = ScriptedEngine::new();
    let service = service(FakeRaster::new(0), engine.clone());

    let err = service
        .extract_text_from_pdf(FAKE_PDF.to_vec(), None, ProgressRelay::silent())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Document);
    assert_eq!(engine.sessions(), 0);
}

#[tokio::test]
async fn test_image_from_data_url() {
    let engine = ScriptedEngine::new();
    let service = service(FakeRaster::new(0), engine.clone());
    let url = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(tiny_png())
    );

    let result = service
        .extract_text_from_image(ImageInput::DataUrl(url), Some("eng"), ProgressRelay::silent())
        .await
        .unwrap();

    assert_eq!(result.total_pages, 1);
    assert_eq!(result.page(1).unwrap().text, "text of page 1");
    assert!((result.page(1).unwrap().confidence - 0.51).abs() < 1e-6);
    assert_eq!(engine.terminations(), 1);
}

#[tokio::test]
async fn test_image_bad_data() {
    let engine = ScriptedEngine::new();
    let service = service(FakeRaster::new(0), engine.clone());

    let err = service
        .extract_text_from_image(
            ImageInput::Bytes(b"not an image".to_vec()),
            None,
            ProgressRelay::silent(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().starts_with("Image OCR failed:"));
    assert_eq!(engine.sessions(), 0);
}

#[tokio::test]
async fn test_render_pages_validates_all_indices_first() {
    let raster = FakeRaster::new(3);
    let service = service(raster.clone(), ScriptedEngine::new());

    let err = service
        .render_pages_to_images(FAKE_PDF.to_vec(), vec![0, 1, 7], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let images = service
        .render_pages_to_images(FAKE_PDF.to_vec(), vec![2, 0], None)
        .await
        .unwrap();
    assert_eq!(images.iter().map(|i| i.page).collect::<Vec<_>>(), vec![3, 1]);
    assert_eq!((images[0].width, images[0].height), (1224, 1584));
}

#[tokio::test]
async fn test_render_scale_limit() {
    let service = service(FakeRaster::new(1), ScriptedEngine::new());
    let render = pdf_ocr_toolkit::RenderConfig {
        scale: 50.0,
        ..Default::default()
    };

    let err = service
        .render_page_to_image(FAKE_PDF.to_vec(), 0, Some(render))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_page_dimensions_default_scale() {
    let service = service(FakeRaster::new(2), ScriptedEngine::new());

    let dims = service
        .get_page_dimensions(FAKE_PDF.to_vec(), 1, None)
        .await
        .unwrap();
    assert_eq!((dims.width, dims.height, dims.rotation), (612, 792, 0));

    let err = service
        .get_page_dimensions(FAKE_PDF.to_vec(), 2, Some(2.0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
