//! capture.rs: input shape for one classification call.
//!
//! A capture is one screenshot event plus whatever the upstream services managed
//! to derive from it. Every field except the id and title is optional; absence
//! is a normal state, not an error.

use serde::{Deserialize, Serialize};

/// One recognized-text region from the OCR service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRegion {
    pub text: String,
    /// Optional UI role reported by the OCR/layout pass ("button", "heading", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_hint: Option<String>,
    /// Per-region recognition confidence, expected in [0,1].
    pub confidence: f32,
}

impl OcrRegion {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            role_hint: None,
            confidence,
        }
    }

    /// Builder: attach a role hint.
    pub fn role(mut self, hint: impl Into<String>) -> Self {
        self.role_hint = Some(hint.into());
        self
    }
}

/// All signals available for one capture. Immutable for the duration of a call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureSignals {
    /// Opaque id; also the key of this capture inside the similarity store.
    #[serde(default)]
    pub capture_id: String,
    #[serde(default)]
    pub window_title: String,
    #[serde(default)]
    pub ocr_regions: Vec<OcrRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CaptureSignals {
    pub fn new(capture_id: impl Into<String>, window_title: impl Into<String>) -> Self {
        Self {
            capture_id: capture_id.into(),
            window_title: window_title.into(),
            ..Default::default()
        }
    }

    pub fn with_ocr(mut self, regions: Vec<OcrRegion>) -> Self {
        self.ocr_regions = regions;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.scene_description = Some(description.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Description text if present and not blank.
    pub fn description(&self) -> Option<&str> {
        self.scene_description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Concatenated OCR text in region order.
    pub fn ocr_text(&self) -> String {
        self.ocr_regions
            .iter()
            .map(|r| r.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
