//! Scene-description signal.
//!
//! Scores the description against the scene table and the UI-state table by
//! counting case-insensitive substring hits; the best of each wins, earlier
//! declarations win ties. Delta = length term + relevance term + consistency
//! bonus (scene category overlaps the title's category), capped per signal.

use crate::category::{normalize_text, ActivityCategory};
use crate::classification::SignalContribution;
use crate::error::SignalError;
use crate::tables::{ScenePattern, UiStatePattern};

use super::FusionWeights;

/// Descriptions beyond this are treated as a broken upstream response.
pub const MAX_DESCRIPTION_CHARS: usize = 16_384;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneMatch {
    pub label: String,
    pub category: ActivityCategory,
    pub score: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualAnalysis {
    pub scene: Option<SceneMatch>,
    pub ui_state: Option<String>,
    pub matched_keywords: usize,
    pub contribution: SignalContribution,
}

#[derive(Debug, Clone)]
pub struct VisualSignalAnalyzer {
    scenes: Vec<ScenePattern>,
    ui_states: Vec<UiStatePattern>,
    weights: FusionWeights,
}

impl VisualSignalAnalyzer {
    pub fn new(scenes: &[ScenePattern], ui_states: &[UiStatePattern], weights: FusionWeights) -> Self {
        let norm = |kws: &[String]| -> Vec<String> {
            kws.iter()
                .map(|k| normalize_text(k))
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            scenes: scenes
                .iter()
                .map(|s| ScenePattern {
                    keywords: norm(&s.keywords),
                    ..s.clone()
                })
                .collect(),
            ui_states: ui_states
                .iter()
                .map(|u| UiStatePattern {
                    keywords: norm(&u.keywords),
                    ..u.clone()
                })
                .collect(),
            weights,
        }
    }

    pub fn analyze(
        &self,
        description: Option<&str>,
        title_category: Option<ActivityCategory>,
    ) -> Result<Option<VisualAnalysis>, SignalError> {
        let Some(raw) = description.map(str::trim).filter(|d| !d.is_empty()) else {
            return Ok(None);
        };
        let len = raw.chars().count();
        if len > MAX_DESCRIPTION_CHARS {
            return Err(SignalError::Malformed(format!(
                "scene description has {len} chars (max {MAX_DESCRIPTION_CHARS})"
            )));
        }

        let w = &self.weights;
        let text = normalize_text(raw);

        let scene = best_by_score(self.scenes.iter().map(|s| (s, hits(&text, &s.keywords))))
            .map(|(s, score)| SceneMatch {
                label: s.label.clone(),
                category: s.category,
                score,
            });
        let ui = best_by_score(self.ui_states.iter().map(|u| (u, hits(&text, &u.keywords))));

        let matched = scene.as_ref().map_or(0, |s| s.score) + ui.map_or(0, |(_, n)| n);

        let length_term = (len as f32 / w.visual_length_divisor).min(w.visual_length_cap);
        let relevance_term = (matched as f32 * w.visual_keyword_weight).min(w.visual_keyword_cap);
        let consistent = match (&scene, title_category) {
            (Some(s), Some(tc)) => s.category.overlaps(&tc),
            _ => false,
        };
        let bonus = if consistent {
            w.visual_consistency_bonus
        } else {
            0.0
        };
        let delta = (length_term + relevance_term + bonus).clamp(0.0, w.visual_signal_cap);

        let mut contribution = SignalContribution::with_delta(delta);
        match &scene {
            Some(s) => {
                contribution.tag(format!("scene:{}", s.label));
                if s.category == ActivityCategory::AiAssistant {
                    contribution.tag("ai-keyword-match");
                }
                contribution.label = Some(s.label.clone());
                contribution.category = Some(s.category);
            }
            None => contribution.tag("scene:no-match"),
        }
        let ui_state = ui.map(|(u, _)| u.label.clone());
        if let Some(u) = &ui_state {
            contribution.tag(format!("ui-state:{u}"));
        }
        if consistent {
            contribution.tag("scene-title-consistent");
        }

        Ok(Some(VisualAnalysis {
            scene,
            ui_state,
            matched_keywords: matched,
            contribution,
        }))
    }
}

fn hits(text: &str, keywords: &[String]) -> usize {
    keywords.iter().filter(|k| text.contains(k.as_str())).count()
}

/// Highest positive score; the first declared entry wins ties.
fn best_by_score<T>(scored: impl Iterator<Item = (T, usize)>) -> Option<(T, usize)> {
    let mut best: Option<(T, usize)> = None;
    for (item, score) in scored {
        if score == 0 {
            continue;
        }
        if best.as_ref().map_or(true, |(_, b)| score > *b) {
            best = Some((item, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::KeywordTables;

    fn analyzer() -> VisualSignalAnalyzer {
        let t = KeywordTables::builtin();
        VisualSignalAnalyzer::new(&t.scenes, &t.ui_states, FusionWeights::default())
    }

    #[test]
    fn absent_or_blank_description() {
        let a = analyzer();
        assert_eq!(a.analyze(None, None).unwrap(), None);
        assert_eq!(a.analyze(Some("   "), None).unwrap(), None);
    }

    #[test]
    fn code_editor_scene_with_title_consistency() {
        let d = "A code editor showing a Python function definition";
        let v = analyzer()
            .analyze(Some(d), Some(ActivityCategory::DeveloperTooling))
            .unwrap()
            .unwrap();
        let scene = v.scene.unwrap();
        assert_eq!(scene.label, "Writing code");
        assert_eq!(scene.category, ActivityCategory::DeveloperTooling);
        assert_eq!(v.ui_state.as_deref(), Some("editing"));
        assert!(v.contribution.evidence.contains("scene-title-consistent"));
        assert!((v.contribution.delta - 0.5).abs() < 1e-6);
    }

    #[test]
    fn no_scene_match_still_tagged_and_scored_by_length() {
        let d = "zzzz qqqq"; // 9 chars
        let v = analyzer().analyze(Some(d), None).unwrap().unwrap();
        assert!(v.scene.is_none());
        assert!(v.contribution.label.is_none());
        assert!(v.contribution.evidence.contains("scene:no-match"));
        assert!((v.contribution.delta - 9.0 / 200.0).abs() < 1e-6);
    }

    #[test]
    fn ties_break_by_declaration_order() {
        let scenes = vec![
            ScenePattern {
                label: "first".into(),
                category: ActivityCategory::Design,
                keywords: vec!["shared".into()],
            },
            ScenePattern {
                label: "second".into(),
                category: ActivityCategory::Documents,
                keywords: vec!["shared".into()],
            },
        ];
        let a = VisualSignalAnalyzer::new(&scenes, &[], FusionWeights::default());
        let v = a.analyze(Some("a SHARED thing"), None).unwrap().unwrap();
        assert_eq!(v.scene.unwrap().label, "first");
    }

    #[test]
    fn ai_scene_is_tagged() {
        let v = analyzer()
            .analyze(Some("A chat with an AI assistant answering a prompt"), None)
            .unwrap()
            .unwrap();
        assert_eq!(
            v.contribution.category,
            Some(ActivityCategory::AiAssistant)
        );
        assert!(v.contribution.evidence.contains("ai-keyword-match"));
    }

    #[test]
    fn oversized_description_is_malformed() {
        let d = "x".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(analyzer().analyze(Some(&d), None).is_err());
    }
}
