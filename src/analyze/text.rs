//! OCR signal: quality grade, layout profile, label refinement.
//!
//! - Grade from the mean per-region confidence.
//! - Each region is classified into element kinds (interactive, headers, form
//!   fields, navigation) by role hint or whole-word keyword hit.
//! - Delta = quality term + layout bonus (per detected kind) + relevance bonus
//!   (OCR words that corroborate the window title), capped per signal.
//! - Only an interaction- or header-dominated layout yields a label.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use strsim::normalized_levenshtein;

use super::FusionWeights;
use crate::capture::OcrRegion;
use crate::classification::SignalContribution;
use crate::error::SignalError;
use crate::tables::{LayoutKindCfg, LayoutTables};

const MAX_LABEL_TERMS: usize = 3;
const MAX_TERM_CHARS: usize = 24;
const MIN_RELEVANT_WORD: usize = 3;
const MIN_FUZZY_WORD: usize = 5;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "you", "your", "are", "was", "this", "that", "from", "not",
    "all", "new", "but", "has", "have", "will", "can",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityGrade {
    /// < 0.4 poor, < 0.6 fair, <= 0.8 good, above that excellent.
    pub fn from_mean(mean: f32) -> Self {
        if mean < 0.4 {
            QualityGrade::Poor
        } else if mean < 0.6 {
            QualityGrade::Fair
        } else if mean <= 0.8 {
            QualityGrade::Good
        } else {
            QualityGrade::Excellent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::Poor => "poor",
            QualityGrade::Fair => "fair",
            QualityGrade::Good => "good",
            QualityGrade::Excellent => "excellent",
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Interactive,
    Header,
    FormField,
    Navigation,
}

impl ElementKind {
    const ALL: [ElementKind; 4] = [
        ElementKind::Interactive,
        ElementKind::Header,
        ElementKind::FormField,
        ElementKind::Navigation,
    ];

    fn tag(&self) -> &'static str {
        match self {
            ElementKind::Interactive => "interactive",
            ElementKind::Header => "headers",
            ElementKind::FormField => "form-fields",
            ElementKind::Navigation => "navigation",
        }
    }
}

/// Number of regions classified into each element kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutProfile {
    pub interactive: usize,
    pub headers: usize,
    pub form_fields: usize,
    pub navigation: usize,
}

impl LayoutProfile {
    pub fn count(&self, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Interactive => self.interactive,
            ElementKind::Header => self.headers,
            ElementKind::FormField => self.form_fields,
            ElementKind::Navigation => self.navigation,
        }
    }

    fn bump(&mut self, kind: ElementKind) {
        match kind {
            ElementKind::Interactive => self.interactive += 1,
            ElementKind::Header => self.headers += 1,
            ElementKind::FormField => self.form_fields += 1,
            ElementKind::Navigation => self.navigation += 1,
        }
    }

    pub fn kinds_detected(&self) -> usize {
        ElementKind::ALL.iter().filter(|k| self.count(**k) > 0).count()
    }

    pub fn complexity(&self) -> LayoutComplexity {
        match self.kinds_detected() {
            0 => LayoutComplexity::None,
            1 => LayoutComplexity::Low,
            2 => LayoutComplexity::Medium,
            _ => LayoutComplexity::High,
        }
    }

    /// Kind whose count is strictly greater than every other kind's.
    pub fn dominant(&self) -> Option<ElementKind> {
        ElementKind::ALL.iter().copied().find(|k| {
            let c = self.count(*k);
            c > 0
                && ElementKind::ALL
                    .iter()
                    .filter(|o| *o != k)
                    .all(|o| self.count(*o) < c)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutComplexity {
    None,
    Low,
    Medium,
    High,
}

impl LayoutComplexity {
    fn tag(&self) -> &'static str {
        match self {
            LayoutComplexity::None => "none",
            LayoutComplexity::Low => "low",
            LayoutComplexity::Medium => "medium",
            LayoutComplexity::High => "high",
        }
    }
}

/// Full OCR analysis; the orchestrator needs the grade for its override gate.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAnalysis {
    pub grade: QualityGrade,
    pub mean_confidence: f32,
    pub profile: LayoutProfile,
    pub relevant_keywords: usize,
    pub contribution: SignalContribution,
}

#[derive(Debug, Clone)]
struct KindMatcher {
    kind: ElementKind,
    /// Each keyword pre-split into lowercase words.
    phrases: Vec<Vec<String>>,
    roles: Vec<String>,
}

impl KindMatcher {
    fn new(kind: ElementKind, cfg: &LayoutKindCfg) -> Self {
        Self {
            kind,
            phrases: cfg
                .keywords
                .iter()
                .map(|k| words(k.as_str()))
                .filter(|w| !w.is_empty())
                .collect(),
            roles: cfg.roles.iter().map(|r| r.trim().to_lowercase()).collect(),
        }
    }

    fn matches(&self, tokens: &[String], role: Option<&str>) -> bool {
        role.is_some_and(|r| self.roles.iter().any(|x| x == r))
            || self.phrases.iter().any(|p| contains_phrase(tokens, p))
    }
}

#[derive(Debug, Clone)]
pub struct TextSignalAnalyzer {
    matchers: Vec<KindMatcher>,
    weights: FusionWeights,
}

impl TextSignalAnalyzer {
    pub fn new(layout: &LayoutTables, weights: FusionWeights) -> Self {
        let matchers = vec![
            KindMatcher::new(ElementKind::Interactive, &layout.interactive),
            KindMatcher::new(ElementKind::Header, &layout.headers),
            KindMatcher::new(ElementKind::FormField, &layout.form_fields),
            KindMatcher::new(ElementKind::Navigation, &layout.navigation),
        ];
        Self { matchers, weights }
    }

    /// `Ok(None)` when there are no regions; `Err` when confidences are not numbers.
    pub fn analyze(
        &self,
        regions: &[OcrRegion],
        window_title: &str,
        current_label: &str,
    ) -> Result<Option<TextAnalysis>, SignalError> {
        if regions.is_empty() {
            return Ok(None);
        }
        if let Some(i) = regions.iter().position(|r| !r.confidence.is_finite()) {
            return Err(SignalError::Malformed(format!(
                "ocr region {i} has non-finite confidence"
            )));
        }

        let w = &self.weights;
        let mean = regions
            .iter()
            .map(|r| r.confidence.clamp(0.0, 1.0))
            .sum::<f32>()
            / regions.len() as f32;
        let grade = QualityGrade::from_mean(mean);

        let mut profile = LayoutProfile::default();
        let mut interactive_terms: Vec<String> = Vec::new();
        let mut header_terms: Vec<String> = Vec::new();
        let mut ocr_words: BTreeSet<String> = BTreeSet::new();

        for region in regions {
            let tokens = words(&region.text);
            let role = region
                .role_hint
                .as_deref()
                .map(|r| r.trim().to_lowercase());

            for m in &self.matchers {
                if !m.matches(&tokens, role.as_deref()) {
                    continue;
                }
                profile.bump(m.kind);
                let term = short_term(&region.text);
                if term.is_empty() {
                    continue;
                }
                match m.kind {
                    ElementKind::Interactive if !interactive_terms.contains(&term) => {
                        interactive_terms.push(term)
                    }
                    ElementKind::Header if !header_terms.contains(&term) => header_terms.push(term),
                    _ => {}
                }
            }

            ocr_words.extend(tokens.into_iter().filter(|t| is_content_word(t)));
        }

        let relevant = count_title_agreement(&ocr_words, window_title, w.text_fuzzy_match);

        let quality_term = mean * w.text_quality_weight;
        let layout_term =
            (profile.kinds_detected() as f32 * w.text_layout_per_kind).min(w.text_layout_cap);
        let relevance_term =
            (relevant as f32 * w.text_relevance_per_keyword).min(w.text_relevance_cap);
        let delta = (quality_term + layout_term + relevance_term).clamp(0.0, w.text_signal_cap);

        let mut contribution = SignalContribution::with_delta(delta);
        contribution.tag(format!("ocr-quality:{grade}"));
        contribution.tag(format!("layout-complexity:{}", profile.complexity().tag()));
        for k in ElementKind::ALL {
            if profile.count(k) > 0 {
                contribution.tag(format!("layout:{}", k.tag()));
            }
        }
        if relevant > 0 {
            contribution.tag("ocr-title-agreement");
        }

        let label = match profile.dominant() {
            Some(ElementKind::Interactive) => {
                contribution.tag("button-heavy-layout");
                let terms: Vec<&str> = interactive_terms
                    .iter()
                    .take(MAX_LABEL_TERMS)
                    .map(String::as_str)
                    .collect();
                Some(format!("{current_label} - interacting ({})", terms.join(", ")))
            }
            Some(ElementKind::Header) => {
                contribution.tag("header-heavy-layout");
                let first = header_terms.first().map(String::as_str).unwrap_or("page");
                Some(format!("{current_label} - reading ({first})"))
            }
            _ => {
                contribution.tag("ocr-inconclusive");
                None
            }
        };
        contribution.label = label;

        Ok(Some(TextAnalysis {
            grade,
            mean_confidence: mean,
            profile,
            relevant_keywords: relevant,
            contribution,
        }))
    }
}

/// Lowercase alphanumeric words.
fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return false;
    }
    tokens.windows(phrase.len()).any(|w| w == phrase)
}

fn is_content_word(w: &str) -> bool {
    w.chars().count() >= MIN_RELEVANT_WORD
        && !w.chars().all(|c| c.is_ascii_digit())
        && !STOPWORDS.contains(&w)
}

fn short_term(text: &str) -> String {
    let t = text.split_whitespace().collect::<Vec<_>>().join(" ");
    t.chars().take(MAX_TERM_CHARS).collect()
}

/// Distinct OCR words that corroborate a title word (exact, or fuzzy for longer words).
fn count_title_agreement(ocr_words: &BTreeSet<String>, title: &str, fuzzy: f32) -> usize {
    let title_words: BTreeSet<String> = words(title)
        .into_iter()
        .filter(|t| is_content_word(t))
        .collect();
    if title_words.is_empty() {
        return 0;
    }
    ocr_words
        .iter()
        .filter(|o| {
            title_words.contains(*o)
                || (o.chars().count() >= MIN_FUZZY_WORD
                    && title_words.iter().any(|t| {
                        t.chars().count() >= MIN_FUZZY_WORD
                            && normalized_levenshtein(o, t) as f32 >= fuzzy
                    }))
        })
        .count()
}
