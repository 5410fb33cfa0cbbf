// src/analyze/mod.rs
//! Per-signal analyzers (OCR text, scene description) and their tunable weights.
//!
//! Each analyzer returns `Result<Option<_>, SignalError>`:
//! - `Ok(None)`  : no input for this signal
//! - `Ok(Some)`  : consulted; may or may not carry a label candidate
//! - `Err(_)`    : input present but unusable; the orchestrator absorbs it

pub mod text;
pub mod visual;
pub mod weights;

// Re-export convenient types.
pub use crate::analyze::text::{
    LayoutComplexity, LayoutProfile, QualityGrade, TextAnalysis, TextSignalAnalyzer,
};
pub use crate::analyze::visual::{SceneMatch, VisualAnalysis, VisualSignalAnalyzer};
pub use crate::analyze::weights::FusionWeights;
