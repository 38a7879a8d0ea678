//! Recognition and batch result types

use serde::Serialize;
use std::collections::BTreeMap;

/// Text recognized on one page
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct PageText {
    /// Extracted text, trimmed
    pub text: String,
    /// Recognition confidence in 0.0-1.0
    pub confidence: f32,
}

impl PageText {
    /// Placeholder for a page that failed to render or recognize.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }

    /// Normalize raw engine output: trim the text and scale a 0-100
    /// confidence into 0.0-1.0.
    pub fn from_engine(text: &str, confidence_percent: f32) -> Self {
        let confidence = if confidence_percent.is_finite() {
            (confidence_percent / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            text: text.trim().to_string(),
            confidence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// OCR output for a whole document or image
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct BatchResult {
    /// Results keyed by page number (1-indexed)
    pub pages: BTreeMap<u32, PageText>,
    /// Number of pages in the source
    pub total_pages: u32,
    /// Wall-clock time for the whole batch
    pub processing_time_ms: u64,
    /// Language code passed to the engine
    pub language: String,
}

impl BatchResult {
    pub fn page(&self, page_number: u32) -> Option<&PageText> {
        self.pages.get(&page_number)
    }

    pub fn text_by_page(&self) -> BTreeMap<u32, &str> {
        self.pages
            .iter()
            .map(|(&n, p)| (n, p.text.as_str()))
            .collect()
    }

    pub fn confidence_by_page(&self) -> BTreeMap<u32, f32> {
        self.pages.iter().map(|(&n, p)| (n, p.confidence)).collect()
    }

    /// Non-empty page texts joined in page order, separated by blank lines
    pub fn full_text(&self) -> String {
        self.pages
            .values()
            .filter(|p| !p.is_empty())
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of pages that produced no text
    pub fn empty_pages(&self) -> usize {
        self.pages.values().filter(|p| p.is_empty()).count()
    }
}
