//! # Activity categories
//!
//! Closed set of category tags and the pure categorizer that maps combined
//! capture text to one of them. Keyword lists are checked in priority order
//! (the order of `ActivityCategory::PRIORITY`); first list with a hit wins.
//! Nothing matched → `WebBrowsing`.
//!
//! Matching is case-insensitive substring search on whitespace-normalized text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityCategory {
    #[serde(rename = "developer-tooling")]
    DeveloperTooling,
    #[serde(rename = "ai-assistant-tooling")]
    AiAssistant,
    #[serde(rename = "communication")]
    Communication,
    #[serde(rename = "research-reading")]
    Research,
    #[serde(rename = "productivity-planning")]
    Productivity,
    #[serde(rename = "design")]
    Design,
    #[serde(rename = "web-browsing-general")]
    WebBrowsing,
    #[serde(rename = "system-settings")]
    System,
    #[serde(rename = "entertainment")]
    Entertainment,
    #[serde(rename = "documents")]
    Documents,
}

impl ActivityCategory {
    /// Priority order used when several keyword lists match.
    pub const PRIORITY: [ActivityCategory; 10] = [
        ActivityCategory::DeveloperTooling,
        ActivityCategory::AiAssistant,
        ActivityCategory::Communication,
        ActivityCategory::Research,
        ActivityCategory::Productivity,
        ActivityCategory::Design,
        ActivityCategory::WebBrowsing,
        ActivityCategory::System,
        ActivityCategory::Entertainment,
        ActivityCategory::Documents,
    ];

    pub const DEFAULT: ActivityCategory = ActivityCategory::WebBrowsing;

    pub fn tag(&self) -> &'static str {
        match self {
            ActivityCategory::DeveloperTooling => "developer-tooling",
            ActivityCategory::AiAssistant => "ai-assistant-tooling",
            ActivityCategory::Communication => "communication",
            ActivityCategory::Research => "research-reading",
            ActivityCategory::Productivity => "productivity-planning",
            ActivityCategory::Design => "design",
            ActivityCategory::WebBrowsing => "web-browsing-general",
            ActivityCategory::System => "system-settings",
            ActivityCategory::Entertainment => "entertainment",
            ActivityCategory::Documents => "documents",
        }
    }

    /// Textual overlap of two tags: equal, or sharing a hyphen-separated word
    /// (e.g. "developer-tooling" and "ai-assistant-tooling").
    pub fn overlaps(&self, other: &ActivityCategory) -> bool {
        if self == other {
            return true;
        }
        let theirs: Vec<&str> = other.tag().split('-').collect();
        self.tag().split('-').any(|w| theirs.contains(&w))
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ActivityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ActivityCategory::PRIORITY
            .iter()
            .copied()
            .find(|c| c.tag() == needle)
            .ok_or_else(|| format!("unknown activity category `{s}`"))
    }
}

/// Pure categorizer over an ordered keyword table.
#[derive(Debug, Clone)]
pub struct ActivityCategorizer {
    /// Kept sorted by category priority; keywords pre-normalized.
    lists: Vec<(ActivityCategory, Vec<String>)>,
}

impl ActivityCategorizer {
    /// Build from (category, keywords) pairs. Order of the input does not matter;
    /// lists are re-sorted into priority order so lookup never depends on it.
    pub fn new(lists: Vec<(ActivityCategory, Vec<String>)>) -> Self {
        let mut lists: Vec<(ActivityCategory, Vec<String>)> = lists
            .into_iter()
            .map(|(c, kws)| {
                let kws = kws
                    .iter()
                    .map(|k| normalize_text(k))
                    .filter(|k| !k.is_empty())
                    .collect();
                (c, kws)
            })
            .collect();
        lists.sort_by_key(|(c, _)| priority_rank(*c));
        Self { lists }
    }

    /// Category for `text`, or the default when no list matches.
    pub fn categorize(&self, text: &str) -> ActivityCategory {
        self.categorize_strict(text)
            .unwrap_or(ActivityCategory::DEFAULT)
    }

    /// Category for `text` only if some keyword list actually matched.
    pub fn categorize_strict(&self, text: &str) -> Option<ActivityCategory> {
        let t = normalize_text(text);
        if t.is_empty() {
            return None;
        }
        self.lists
            .iter()
            .find(|(_, kws)| kws.iter().any(|k| t.contains(k.as_str())))
            .map(|(c, _)| *c)
    }
}

fn priority_rank(c: ActivityCategory) -> usize {
    ActivityCategory::PRIORITY
        .iter()
        .position(|p| *p == c)
        .unwrap_or(usize::MAX)
}

/// Lowercase and collapse whitespace runs into single spaces.
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            last_space = false;
        }
    }
    out.trim().to_string()
}
