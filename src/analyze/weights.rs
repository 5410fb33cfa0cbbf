//! Tunable scoring constants for every signal.
//!
//! The defaults are heuristic, not derived; they preserve the relative
//! ordering quality term > relevance term > consistency bonus. Loaded from the
//! `[weights]` table of the fusion config, any key may be omitted.
//!
//! ```toml
//! [weights]
//! baseline_confidence = 0.5
//! text_quality_weight = 0.3
//! similarity_weight = 0.2
//! ```

use serde::{Deserialize, Serialize};

use super::text::QualityGrade;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    /// Confidence of a title-only classification.
    pub baseline_confidence: f32,

    // --- OCR ---
    pub text_quality_weight: f32,
    pub text_layout_per_kind: f32,
    pub text_layout_cap: f32,
    pub text_relevance_per_keyword: f32,
    pub text_relevance_cap: f32,
    pub text_signal_cap: f32,
    /// Minimum OCR grade whose label may replace the current one.
    pub text_override_min_grade: QualityGrade,
    /// `strsim::normalized_levenshtein` threshold for OCR/title word agreement.
    pub text_fuzzy_match: f32,

    // --- scene description ---
    pub visual_length_divisor: f32,
    pub visual_length_cap: f32,
    pub visual_keyword_weight: f32,
    pub visual_keyword_cap: f32,
    pub visual_consistency_bonus: f32,
    pub visual_signal_cap: f32,

    // --- embeddings ---
    pub similarity_weight: f32,
    pub similarity_cap: f32,
    /// Top similarity must exceed this for the corroboration bonus.
    pub corroboration_threshold: f32,
    pub corroboration_bonus: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            baseline_confidence: 0.5,
            text_quality_weight: 0.3,
            text_layout_per_kind: 0.05,
            text_layout_cap: 0.2,
            text_relevance_per_keyword: 0.1,
            text_relevance_cap: 0.3,
            text_signal_cap: 0.5,
            text_override_min_grade: QualityGrade::Good,
            text_fuzzy_match: 0.85,
            visual_length_divisor: 200.0,
            visual_length_cap: 0.3,
            visual_keyword_weight: 0.1,
            visual_keyword_cap: 0.4,
            visual_consistency_bonus: 0.1,
            visual_signal_cap: 0.5,
            similarity_weight: 0.2,
            similarity_cap: 0.2,
            corroboration_threshold: 0.9,
            corroboration_bonus: 0.05,
        }
    }
}

impl FusionWeights {
    /// Replace non-finite or negative values with defaults; keep fractions in [0,1].
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        fn frac(v: &mut f32, dflt: f32) {
            if !v.is_finite() || !(0.0..=1.0).contains(v) {
                *v = dflt;
            }
        }

        frac(&mut self.baseline_confidence, d.baseline_confidence);
        frac(&mut self.text_quality_weight, d.text_quality_weight);
        frac(&mut self.text_layout_per_kind, d.text_layout_per_kind);
        frac(&mut self.text_layout_cap, d.text_layout_cap);
        frac(&mut self.text_relevance_per_keyword, d.text_relevance_per_keyword);
        frac(&mut self.text_relevance_cap, d.text_relevance_cap);
        frac(&mut self.text_signal_cap, d.text_signal_cap);
        frac(&mut self.text_fuzzy_match, d.text_fuzzy_match);
        frac(&mut self.visual_length_cap, d.visual_length_cap);
        frac(&mut self.visual_keyword_weight, d.visual_keyword_weight);
        frac(&mut self.visual_keyword_cap, d.visual_keyword_cap);
        frac(&mut self.visual_consistency_bonus, d.visual_consistency_bonus);
        frac(&mut self.visual_signal_cap, d.visual_signal_cap);
        frac(&mut self.similarity_weight, d.similarity_weight);
        frac(&mut self.similarity_cap, d.similarity_cap);
        frac(&mut self.corroboration_threshold, d.corroboration_threshold);
        frac(&mut self.corroboration_bonus, d.corroboration_bonus);

        if !self.visual_length_divisor.is_finite() || self.visual_length_divisor <= 0.0 {
            self.visual_length_divisor = d.visual_length_divisor;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let w: FusionWeights = toml::from_str(
            r#"
text_quality_weight = 0.25
text_override_min_grade = "excellent"
"#,
        )
        .unwrap();
        assert!((w.text_quality_weight - 0.25).abs() < f32::EPSILON);
        assert_eq!(w.text_override_min_grade, QualityGrade::Excellent);
        assert!((w.baseline_confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn sanitize_restores_out_of_range() {
        let w = FusionWeights {
            baseline_confidence: 1.7,
            similarity_weight: f32::NAN,
            visual_length_divisor: 0.0,
            ..Default::default()
        }
        .sanitized();
        let d = FusionWeights::default();
        assert_eq!(w.baseline_confidence, d.baseline_confidence);
        assert_eq!(w.similarity_weight, d.similarity_weight);
        assert_eq!(w.visual_length_divisor, d.visual_length_divisor);
    }

    #[test]
    fn default_ordering_of_terms_holds() {
        let w = FusionWeights::default();
        assert!(w.text_quality_weight > w.text_relevance_per_keyword);
        assert!(w.text_relevance_per_keyword >= w.visual_consistency_bonus);
        assert!(w.visual_consistency_bonus > w.corroboration_bonus);
    }
}
