//! classification.rs: output structures and the per-signal intermediate record.
//!
//! `ClassificationResult` is the shape returned by `classify` and by the HTTP
//! layer. `breakdown` carries explainability: which analyzer ran, what it added,
//! and whether its label survived the override policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::category::ActivityCategory;

/// Analyzers that can appear in `contributing_signals`.
/// The baseline is always consulted and is therefore not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Text,
    Visual,
    Similarity,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Text => "text",
            SignalKind::Visual => "visual",
            SignalKind::Similarity => "similarity",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one analyzer proposes. Evidence tags never feed into scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalContribution {
    pub label: Option<String>,
    pub category: Option<ActivityCategory>,
    /// Additive confidence; negative values are clamped to zero by the orchestrator.
    pub delta: f32,
    pub evidence: BTreeSet<String>,
}

impl SignalContribution {
    pub fn with_delta(delta: f32) -> Self {
        Self {
            delta,
            ..Default::default()
        }
    }

    pub fn tag(&mut self, t: impl Into<String>) {
        self.evidence.insert(t.into());
    }

    /// True when the analyzer produced a non-null candidate.
    pub fn has_candidate(&self) -> bool {
        self.label.is_some() || self.category.is_some()
    }
}

/// One prior capture returned by the similarity index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCapture {
    pub capture_id: String,
    pub similarity: f32,
    pub label: String,
}

/// Breakdown entry kind; `Corroboration` is the similarity/label agreement bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownSource {
    Baseline,
    Text,
    Visual,
    Similarity,
    Corroboration,
}

impl From<SignalKind> for BreakdownSource {
    fn from(k: SignalKind) -> Self {
        match k {
            SignalKind::Text => BreakdownSource::Text,
            SignalKind::Visual => BreakdownSource::Visual,
            SignalKind::Similarity => BreakdownSource::Similarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub source: BreakdownSource,
    pub delta: f32,
    /// Whether this source's label became (or stayed) the current label at its stage.
    pub label_applied: bool,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence: BTreeSet<String>,
}

/// Final record for one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub category: ActivityCategory,
    /// In [0.0, 1.0], never below the baseline.
    pub confidence: f32,
    pub contributing_signals: BTreeSet<SignalKind>,
    #[serde(default)]
    pub similar_captures: Vec<SimilarCapture>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<SignalBreakdown>,
}

impl ClassificationResult {
    pub fn used(&self, kind: SignalKind) -> bool {
        self.contributing_signals.contains(&kind)
    }
}
