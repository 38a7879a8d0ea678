//! Progress relay
//!
//! Forwards a small fixed vocabulary of stage events to a caller-supplied
//! sink. Emission is fire-and-forget: the relay never waits on the sink and
//! never reports a failure back into the pipeline.

use crate::ocr::engine::{EngineEvent, EngineEvents};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Pipeline stage reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressStage {
    #[serde(rename = "loading")]
    Loading,
    #[serde(rename = "loading language")]
    LoadingLanguage,
    #[serde(rename = "initializing api")]
    InitializingApi,
    #[serde(rename = "recognizing text")]
    RecognizingText,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "complete")]
    Complete,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Loading => "loading",
            ProgressStage::LoadingLanguage => "loading language",
            ProgressStage::InitializingApi => "initializing api",
            ProgressStage::RecognizingText => "recognizing text",
            ProgressStage::Processing => "processing",
            ProgressStage::Complete => "complete",
        }
    }

    /// Map an engine status to a relayed stage. Statuses outside the
    /// relayed set return `None` and are dropped.
    pub fn from_engine_status(status: &str) -> Option<Self> {
        match status {
            "loading language" => Some(ProgressStage::LoadingLanguage),
            "initializing api" => Some(ProgressStage::InitializingApi),
            "recognizing text" => Some(ProgressStage::RecognizingText),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Page being processed (1-indexed, 0 before the first page)
    pub current_page: u32,
    pub total_pages: u32,
    pub stage: ProgressStage,
    /// Percent complete in 0-100
    pub percent: f32,
}

/// Observer receiving progress events
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

#[derive(Default)]
struct Position {
    current: AtomicU32,
    total: AtomicU32,
}

/// Forwards progress events to an optional sink
#[derive(Clone, Default)]
pub struct ProgressRelay {
    sink: Option<ProgressCallback>,
    position: Arc<Position>,
}

impl std::fmt::Debug for ProgressRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressRelay")
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl ProgressRelay {
    /// Relay that drops every event
    pub fn silent() -> Self {
        Self::default()
    }

    /// Relay calling `f` for every event
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(f)),
            position: Arc::default(),
        }
    }

    /// Relay pushing events into an unbounded channel; a closed receiver is ignored
    pub fn channel(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self::callback(move |event| {
            let _ = tx.send(event);
        })
    }

    /// Forward one event. Percent is clamped to 0-100.
    pub fn emit(&self, current_page: u32, total_pages: u32, stage: ProgressStage, percent: f32) {
        self.position.current.store(current_page, Ordering::Relaxed);
        self.position.total.store(total_pages, Ordering::Relaxed);

        let Some(sink) = &self.sink else {
            return;
        };
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        sink(ProgressEvent {
            current_page,
            total_pages,
            stage,
            percent,
        });
    }

    /// Relay one engine sub-event at the last emitted page position.
    pub fn forward_engine_event(&self, event: &EngineEvent) {
        match ProgressStage::from_engine_status(&event.status) {
            Some(stage) => self.emit(
                self.position.current.load(Ordering::Relaxed),
                self.position.total.load(Ordering::Relaxed),
                stage,
                event.progress * 100.0,
            ),
            None => tracing::trace!(status = %event.status, "Suppressed engine event"),
        }
    }

    /// Engine callback bound to this relay
    pub fn engine_events(&self) -> EngineEvents {
        let relay = self.clone();
        Arc::new(move |event: EngineEvent| relay.forward_engine_event(&event))
    }
}
