//! # Fusion Engine
//! Pure, synchronous orchestration that maps one `CaptureSignals` to a
//! `ClassificationResult`. No I/O; safe to share behind an `Arc` across threads.
//!
//! Stages (fixed order):
//! 1. baseline from the window title: seed label, confidence floor
//! 2. OCR: delta always added, label replaces the current one only when the
//!    OCR quality grade reaches `text_override_min_grade`
//! 3. scene description: delta added, label replaces the current one
//! 4. embeddings: delta from the best neighbour, never touches the label;
//!    corroboration bonus when the best neighbour is very close and its label
//!    lands in a category some earlier stage proposed
//!
//! Confidence = min(1, baseline + sum of non-negative deltas). The category is
//! recomputed once at the end from every text the pipeline actually consulted.
//! Analyzer errors are absorbed here and logged; only a malformed embedding is
//! returned to the caller.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analyze::{FusionWeights, TextSignalAnalyzer, VisualSignalAnalyzer};
use crate::baseline::BaselineExtractor;
use crate::capture::CaptureSignals;
use crate::category::{ActivityCategorizer, ActivityCategory};
use crate::classification::{
    BreakdownSource, ClassificationResult, SignalBreakdown, SignalContribution, SignalKind,
    SimilarCapture,
};
use crate::config::FusionConfig;
use crate::error::{ClassifyError, IndexError, SignalError};
use crate::metrics;
use crate::similarity::{SearchParams, SimilarityIndex, SimilarityQuery};
use crate::tables::KeywordTables;
use crate::telemetry::{anon_hash, dev_logging_enabled};

pub struct FusionEngine {
    weights: FusionWeights,
    search: SearchParams,
    categorizer: ActivityCategorizer,
    baseline: BaselineExtractor,
    text: TextSignalAnalyzer,
    visual: VisualSignalAnalyzer,
    index: Option<Arc<dyn SimilarityIndex>>,
}

impl std::fmt::Debug for FusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionEngine")
            .field("weights", &self.weights)
            .field("search", &self.search)
            .field("baseline_rules", &self.baseline.rule_count())
            .field("has_index", &self.index.is_some())
            .finish()
    }
}

impl FusionEngine {
    pub fn new(
        tables: &KeywordTables,
        weights: FusionWeights,
        search: SearchParams,
    ) -> anyhow::Result<Self> {
        let weights = weights.sanitized();
        Ok(Self {
            weights,
            search: search.sanitized(),
            categorizer: tables.categorizer(),
            baseline: BaselineExtractor::new(&tables.baseline_rules)?,
            text: TextSignalAnalyzer::new(&tables.layout, weights),
            visual: VisualSignalAnalyzer::new(&tables.scenes, &tables.ui_states, weights),
            index: None,
        })
    }

    /// Built-in tables and default weights, no similarity store.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::new(
            &KeywordTables::builtin(),
            FusionWeights::default(),
            SearchParams::default(),
        )
    }

    pub fn from_config(cfg: &FusionConfig) -> anyhow::Result<Self> {
        let tables = cfg.load_tables()?;
        Self::new(&tables, cfg.weights, cfg.similarity)
    }

    /// Attach the store consulted for embedding neighbours.
    pub fn with_index(mut self, index: Arc<dyn SimilarityIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    pub fn search_params(&self) -> SearchParams {
        self.search
    }

    pub fn categorizer(&self) -> &ActivityCategorizer {
        &self.categorizer
    }

    /// Classify one capture. Deterministic for a fixed engine and store contents.
    pub fn classify(&self, signals: &CaptureSignals) -> Result<ClassificationResult, ClassifyError> {
        match self.run(signals) {
            Ok(result) => {
                metrics::record_classification(&result);
                debug!(
                    target: "fusion",
                    capture_id = %signals.capture_id,
                    title = %anon_hash(&signals.window_title),
                    label = %anon_hash(&result.label),
                    category = %result.category,
                    confidence = result.confidence,
                    signals = ?result.contributing_signals,
                    "classified"
                );
                Ok(result)
            }
            Err(e) => {
                metrics::record_precondition_failure(e.kind());
                warn!(
                    target: "fusion",
                    capture_id = %signals.capture_id,
                    kind = e.kind(),
                    error = %e,
                    "rejected malformed capture"
                );
                Err(e)
            }
        }
    }

    fn run(&self, signals: &CaptureSignals) -> Result<ClassificationResult, ClassifyError> {
        // Preconditions first: a malformed embedding fails the whole call.
        let neighbours = self.lookup_similar(signals)?;

        let w = &self.weights;
        let dev = dev_logging_enabled();
        let title = signals.window_title.as_str();

        // 1) baseline
        let seed = self.baseline.extract(title, &self.categorizer);
        let mut acc = Accumulator::new(seed.label, seed.title_category, w.baseline_confidence);
        let mut evidence = BTreeSet::new();
        evidence.insert(match &seed.rule_id {
            Some(id) => format!("rule:{id}"),
            None => "rule:none".to_string(),
        });
        if let Some(c) = seed.title_category {
            evidence.insert(format!("title-category:{c}"));
        }
        acc.breakdown.push(SignalBreakdown {
            source: BreakdownSource::Baseline,
            delta: w.baseline_confidence,
            label_applied: true,
            evidence,
        });
        acc.consulted.push(title.to_string());
        if dev {
            dev_log_stage(signals, "baseline", w.baseline_confidence, true);
        }

        // 2) OCR text, quality-gated override
        match self.text.analyze(&signals.ocr_regions, title, &acc.label) {
            Ok(Some(analysis)) => {
                let ocr_text = signals.ocr_text();
                let mut c = analysis.contribution;
                if c.label.is_some() {
                    c.category = self.categorizer.categorize_strict(&ocr_text);
                }
                let gate = analysis.grade >= w.text_override_min_grade;
                if c.label.is_some() && !gate {
                    c.tag("label-gated:ocr-quality");
                }
                let applied = acc.apply(SignalKind::Text, c, gate);
                acc.consulted.push(ocr_text);
                if dev {
                    dev_log_stage(signals, "text", acc.last_delta(), applied);
                }
            }
            Ok(None) => {}
            Err(e) => self.soft_failure(SignalKind::Text, signals, &e),
        }

        // 3) scene description, unconditional override
        match self.visual.analyze(signals.description(), seed.title_category) {
            Ok(Some(analysis)) => {
                let applied = acc.apply(SignalKind::Visual, analysis.contribution, true);
                if let Some(d) = signals.description() {
                    acc.consulted.push(d.to_string());
                }
                if dev {
                    dev_log_stage(signals, "visual", acc.last_delta(), applied);
                }
            }
            Ok(None) => {}
            Err(e) => self.soft_failure(SignalKind::Visual, signals, &e),
        }

        // 4) embedding neighbours, never override
        let mut similar_captures = Vec::new();
        if let Some(hits) = neighbours {
            match hits.first() {
                Some(top) => {
                    let delta = (top.similarity.max(0.0) * w.similarity_weight).min(w.similarity_cap);
                    let neighbour_category = self.categorizer.categorize(&top.label);
                    let mut c = SignalContribution::with_delta(delta);
                    c.label = Some(top.label.clone());
                    c.category = Some(neighbour_category);
                    c.tag(format!("neighbours:{}", hits.len()));
                    if top.similarity > w.corroboration_threshold {
                        c.tag("near-duplicate");
                    }
                    acc.apply(SignalKind::Similarity, c, false);
                    if dev {
                        dev_log_stage(signals, "similarity", delta, false);
                    }

                    if top.similarity > w.corroboration_threshold {
                        let current = acc
                            .label_category
                            .or_else(|| self.categorizer.categorize_strict(&acc.label));
                        if current == Some(neighbour_category) {
                            acc.bonus(w.corroboration_bonus, neighbour_category);
                            if dev {
                                dev_log_stage(signals, "corroboration", w.corroboration_bonus, false);
                            }
                        }
                    }
                }
                None => {
                    let mut ev = BTreeSet::new();
                    ev.insert("neighbours:0".to_string());
                    acc.breakdown.push(SignalBreakdown {
                        source: BreakdownSource::Similarity,
                        delta: 0.0,
                        label_applied: false,
                        evidence: ev,
                    });
                }
            }
            similar_captures = hits;
        }

        // 5) final category from everything consulted
        let category = self.categorizer.categorize(&acc.consulted.join(" "));

        Ok(ClassificationResult {
            label: acc.label,
            category,
            confidence: acc.confidence.clamp(0.0, 1.0),
            contributing_signals: acc.contributing,
            similar_captures,
            breakdown: acc.breakdown,
        })
    }

    /// `Ok(None)`: no embedding, no store, or store unavailable.
    /// Length is left to the store, which knows its dimension once populated.
    fn lookup_similar(
        &self,
        signals: &CaptureSignals,
    ) -> Result<Option<Vec<SimilarCapture>>, ClassifyError> {
        let Some(embedding) = signals.embedding.as_deref() else {
            return Ok(None);
        };
        if let Some(index) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(ClassifyError::NonFiniteEmbedding { index });
        }
        let Some(store) = &self.index else {
            debug!(target: "fusion", capture_id = %signals.capture_id, "no similarity store attached");
            return Ok(None);
        };

        let query = SimilarityQuery {
            embedding,
            exclude_id: Some(signals.capture_id.as_str()).filter(|id| !id.is_empty()),
            params: self.search,
        };
        match store.search(&query) {
            Ok(hits) => Ok(Some(hits)),
            Err(IndexError::DimensionMismatch { expected, actual }) => {
                Err(ClassifyError::DimensionMismatch { expected, actual })
            }
            Err(e) => {
                self.soft_failure(SignalKind::Similarity, signals, &SignalError::from(e));
                Ok(None)
            }
        }
    }

    fn soft_failure(&self, signal: SignalKind, signals: &CaptureSignals, err: &SignalError) {
        metrics::record_soft_failure(signal);
        warn!(
            target: "fusion",
            capture_id = %signals.capture_id,
            %signal,
            error = %err,
            "signal unavailable"
        );
    }
}

/// Running state threaded through the stages.
struct Accumulator {
    label: String,
    confidence: f32,
    contributing: BTreeSet<SignalKind>,
    /// Category proposed by whichever stage set `label`.
    label_category: Option<ActivityCategory>,
    consulted: Vec<String>,
    breakdown: Vec<SignalBreakdown>,
}

impl Accumulator {
    fn new(label: String, label_category: Option<ActivityCategory>, baseline: f32) -> Self {
        Self {
            label,
            confidence: baseline,
            contributing: BTreeSet::new(),
            label_category,
            consulted: Vec::new(),
            breakdown: Vec::new(),
        }
    }

    /// Returns whether the contribution's label became the current label.
    /// The delta always counts; the signal is listed only if it proposed something.
    fn apply(&mut self, kind: SignalKind, c: SignalContribution, may_override: bool) -> bool {
        let delta = if c.delta.is_finite() { c.delta.max(0.0) } else { 0.0 };
        self.confidence += delta;
        if c.has_candidate() {
            self.contributing.insert(kind);
        }
        let applied = match c.label {
            Some(l) if may_override => {
                self.label = l;
                self.label_category = c.category;
                true
            }
            _ => false,
        };
        self.breakdown.push(SignalBreakdown {
            source: kind.into(),
            delta,
            label_applied: applied,
            evidence: c.evidence,
        });
        applied
    }

    fn bonus(&mut self, delta: f32, category: ActivityCategory) {
        self.confidence += delta;
        let mut evidence = BTreeSet::new();
        evidence.insert(format!("corroborated:{category}"));
        self.breakdown.push(SignalBreakdown {
            source: BreakdownSource::Corroboration,
            delta,
            label_applied: false,
            evidence,
        });
    }

    fn last_delta(&self) -> f32 {
        self.breakdown.last().map_or(0.0, |b| b.delta)
    }
}

/// Stage-by-stage detail; never logs raw text.
fn dev_log_stage(signals: &CaptureSignals, stage: &str, delta: f32, label_applied: bool) {
    info!(
        target: "fusion",
        capture_id = %signals.capture_id,
        stage,
        delta,
        label_applied,
        "fusion stage"
    );
}
