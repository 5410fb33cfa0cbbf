//! Window-title baseline: ordered regex rules, first match wins.
//!
//! The baseline is the one signal that is always present, so it never fails.
//! Its label is the floor every other signal builds on; its confidence is the
//! fixed `FusionWeights::baseline_confidence`.

use regex::Regex;

use crate::category::{ActivityCategorizer, ActivityCategory};
use crate::tables::BaselineRuleCfg;

pub const UNKNOWN_ACTIVITY: &str = "Unknown Activity";

#[derive(Debug)]
struct CompiledRule {
    id: String,
    app: String,
    re: Regex,
}

/// Seed produced from the title alone.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineSeed {
    pub label: String,
    /// Category of the title (default category when the title matches nothing).
    pub category: ActivityCategory,
    /// Category only when the title actually matched a keyword list.
    pub title_category: Option<ActivityCategory>,
    /// Id of the rule that produced the label, if any.
    pub rule_id: Option<String>,
}

#[derive(Debug)]
pub struct BaselineExtractor {
    rules: Vec<CompiledRule>,
}

impl BaselineExtractor {
    /// Compile rules, preserving declaration order.
    pub fn new(rules: &[BaselineRuleCfg]) -> anyhow::Result<Self> {
        let rules = rules
            .iter()
            .map(|r| {
                let re = Regex::new(&r.pattern)
                    .map_err(|e| anyhow::anyhow!("baseline rule `{}` regex error: {}", r.id, e))?;
                Ok(CompiledRule {
                    id: r.id.clone(),
                    app: r.app.clone(),
                    re,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Label for `title`: first matching rule, else the trimmed title, else the placeholder.
    pub fn label_for(&self, title: &str) -> (String, Option<&str>) {
        let title = sanitize(title);
        if title.is_empty() {
            return (UNKNOWN_ACTIVITY.to_string(), None);
        }

        for rule in &self.rules {
            let Some(caps) = rule.re.captures(&title) else {
                continue;
            };
            let name = caps
                .name("name")
                .map(|m| m.as_str().trim())
                .filter(|n| !n.is_empty());
            let label = match name {
                Some(n) => format!("{}: {}", rule.app, n),
                None => rule.app.clone(),
            };
            return (label, Some(rule.id.as_str()));
        }

        (title, None)
    }

    pub fn extract(&self, title: &str, categorizer: &ActivityCategorizer) -> BaselineSeed {
        let (label, rule_id) = self.label_for(title);
        let rule_id = rule_id.map(str::to_string);
        let title_category = categorizer.categorize_strict(title);
        BaselineSeed {
            label,
            category: title_category.unwrap_or(ActivityCategory::DEFAULT),
            title_category,
            rule_id,
        }
    }
}

/// Strip control characters and collapse whitespace; malformed input degrades to empty.
fn sanitize(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
