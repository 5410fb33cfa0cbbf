// src/lib.rs
//! Multi-signal activity classification.
//!
//! `FusionEngine::classify` turns one capture (window title, OCR regions, scene
//! description, embedding) into a labeled, categorized activity record with a
//! confidence in [0.5, 1.0]. The HTTP shell in `api` is optional plumbing.
//!
//! ```no_run
//! use activity_fusion::{CaptureSignals, FusionEngine, OcrRegion};
//!
//! let engine = FusionEngine::builtin()?;
//! let capture = CaptureSignals::new("cap-1", "Chrome — Gmail").with_ocr(vec![
//!     OcrRegion::new("Compose", 0.95).role("button"),
//!     OcrRegion::new("Send", 0.9).role("button"),
//! ]);
//! let result = engine.classify(&capture)?;
//! println!("{} ({}) {:.2}", result.label, result.category, result.confidence);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod analyze;
pub mod api;
pub mod baseline;
pub mod capture;
pub mod category;
pub mod classification;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;
pub mod similarity;
pub mod tables;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::capture::{CaptureSignals, OcrRegion};
pub use crate::category::{ActivityCategorizer, ActivityCategory};
pub use crate::classification::{ClassificationResult, SignalKind, SimilarCapture};
pub use crate::config::FusionConfig;
pub use crate::engine::FusionEngine;
pub use crate::error::{ClassifyError, IndexError, SignalError};
pub use crate::similarity::{IndexedCapture, MemoryIndex, SearchParams, SimilarityIndex};
pub use crate::tables::KeywordTables;
