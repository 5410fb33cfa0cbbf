//! # Keyword tables
//!
//! Static lookup data used by every analyzer: categorizer keyword lists,
//! window-title rules, OCR layout vocabularies, scene patterns and UI-state
//! patterns. Loaded once (built-in seed or TOML) and handed to analyzers at
//! construction; nothing reads it through a global.
//!
//! TOML shape (every section optional, missing sections fall back to built-ins):
//! ```toml
//! [[categories]]
//! category = "communication"
//! keywords = ["gmail", "slack"]
//!
//! [[baseline_rules]]
//! id = "gmail"
//! app = "Gmail"
//! pattern = "(?i)\\bgmail\\b"
//!
//! [layout.interactive]
//! keywords = ["send", "submit"]
//! roles = ["button"]
//!
//! [[scenes]]
//! label = "Reading email"
//! category = "communication"
//! keywords = ["inbox", "email"]
//!
//! [[ui_states]]
//! label = "editing"
//! keywords = ["typing", "cursor"]
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::category::{ActivityCategorizer, ActivityCategory};

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryKeywords {
    pub category: ActivityCategory,
    pub keywords: Vec<String>,
}

/// One window-title rule. `pattern` may define a named group `name`; the
/// produced label is `"<app>: <name>"`, or just `"<app>"` without it.
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineRuleCfg {
    pub id: String,
    pub app: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutKindCfg {
    #[serde(default)]
    pub keywords: Vec<String>,
    /// OCR role hints that imply this element kind regardless of text.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutTables {
    pub interactive: LayoutKindCfg,
    pub headers: LayoutKindCfg,
    pub form_fields: LayoutKindCfg,
    pub navigation: LayoutKindCfg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenePattern {
    pub label: String,
    pub category: ActivityCategory,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiStatePattern {
    pub label: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct KeywordTables {
    pub categories: Vec<CategoryKeywords>,
    pub baseline_rules: Vec<BaselineRuleCfg>,
    pub layout: LayoutTables,
    pub scenes: Vec<ScenePattern>,
    pub ui_states: Vec<UiStatePattern>,
}

/// Raw TOML document; every section optional.
#[derive(Debug, Default, Deserialize)]
struct TablesFile {
    categories: Option<Vec<CategoryKeywords>>,
    baseline_rules: Option<Vec<BaselineRuleCfg>>,
    layout: Option<LayoutTables>,
    scenes: Option<Vec<ScenePattern>>,
    ui_states: Option<Vec<UiStatePattern>>,
}

impl KeywordTables {
    /// Load from a TOML file; sections missing from the file keep built-in values.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keyword tables from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing keyword tables in {}", path.display()))
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let file: TablesFile = toml::from_str(toml_str)?;
        let base = Self::builtin();
        Ok(Self {
            categories: file.categories.unwrap_or(base.categories),
            baseline_rules: file.baseline_rules.unwrap_or(base.baseline_rules),
            layout: file.layout.unwrap_or(base.layout),
            scenes: file.scenes.unwrap_or(base.scenes),
            ui_states: file.ui_states.unwrap_or(base.ui_states),
        })
    }

    pub fn categorizer(&self) -> ActivityCategorizer {
        ActivityCategorizer::new(
            self.categories
                .iter()
                .map(|c| (c.category, c.keywords.clone()))
                .collect(),
        )
    }

    /// Built-in seed used when no tables file is configured.
    pub fn builtin() -> Self {
        use ActivityCategory::*;

        let categories = vec![
            kw(
                DeveloperTooling,
                &[
                    "visual studio code", "vs code", "vscode", "intellij", "pycharm",
                    "webstorm", "rustrover", "xcode", "android studio", "neovim", "emacs",
                    "terminal", "iterm", "powershell", "github", "gitlab", "bitbucket",
                    "stack overflow", "stackoverflow", "pull request", "code editor",
                    "debugger", "compiler", "localhost", "python", "javascript",
                    "typescript", "rustc", "cargo.toml", "docker", "kubernetes", ".py",
                    ".rs", ".tsx", ".js", "source code", "programming",
                ],
            ),
            kw(
                AiAssistant,
                &[
                    "chatgpt", "claude", "copilot", "openai", "gemini", "anthropic",
                    "perplexity", "ai assistant", "language model", "llm",
                ],
            ),
            kw(
                Communication,
                &[
                    "gmail", "outlook", "inbox", "compose", "slack", "discord",
                    "microsoft teams", "zoom meeting", "google meet", "whatsapp",
                    "telegram", "messenger", "thunderbird", "email", "e-mail", "video call",
                ],
            ),
            kw(
                Research,
                &[
                    "wikipedia", "arxiv", "scholar", "research", "paper", "journal",
                    "documentation", "docs.rs", "readthedocs", "tutorial", "article",
                    "medium.com",
                ],
            ),
            kw(
                Productivity,
                &[
                    "notion", "trello", "jira", "asana", "linear.app", "clickup",
                    "todoist", "calendar", "to-do", "todo", "planner", "kanban",
                    "roadmap", "obsidian", "evernote",
                ],
            ),
            kw(
                Design,
                &[
                    "figma", "sketch", "photoshop", "illustrator", "indesign", "canva",
                    "blender", "affinity", "adobe xd", "mockup", "wireframe",
                ],
            ),
            kw(
                WebBrowsing,
                &[
                    "google chrome", "chrome", "firefox", "safari", "microsoft edge",
                    "brave", "browser", "new tab", "http://", "https://", "www.",
                ],
            ),
            kw(
                System,
                &[
                    "system settings", "system preferences", "control panel", "settings",
                    "preferences", "finder", "file explorer", "activity monitor",
                    "task manager", "disk utility", "software update",
                ],
            ),
            kw(
                Entertainment,
                &[
                    "youtube", "netflix", "spotify", "twitch", "reddit", "hulu",
                    "prime video", "steam", "tiktok", "instagram", "podcast", "music",
                ],
            ),
            kw(
                Documents,
                &[
                    "microsoft word", "google docs", ".docx", ".pdf", "acrobat",
                    "excel", "google sheets", "spreadsheet", "powerpoint", "keynote",
                    "google slides", "libreoffice", "document",
                ],
            ),
        ];

        // Specific before general: app-specific rules first, generic browser last.
        let baseline_rules = vec![
            rule(
                "vscode_file_first",
                "VS Code",
                r"(?i)^(?P<name>.+?)\s+[-—–]\s+(?:.+?\s+[-—–]\s+)?(?:visual studio code|vs ?code)$",
            ),
            rule(
                "vscode_app_first",
                "VS Code",
                r"(?i)^(?:visual studio code|vs ?code)\s*[-—–:|]\s*(?P<name>.+)$",
            ),
            rule(
                "jetbrains",
                "IDE",
                r"(?i)^(?P<name>.+?)\s+[-—–]\s+(?:intellij idea|pycharm|webstorm|clion|goland|rustrover)\b",
            ),
            rule(
                "terminal",
                "Terminal",
                r"(?i)^(?:terminal|iterm2?|alacritty|kitty|wezterm|windows terminal|powershell)(?:\s*[-—–:|]\s*(?P<name>.+))?$",
            ),
            rule(
                "github_repo",
                "GitHub",
                r"(?i)^(?P<name>[\w.-]+/[\w.-]+)\b.*\bgithub\b",
            ),
            rule("github", "GitHub", r"(?i)\bgithub\b"),
            rule("chatgpt", "ChatGPT", r"(?i)\bchatgpt\b"),
            rule("claude", "Claude", r"(?i)\bclaude\b"),
            rule(
                "slack_app_first",
                "Slack",
                r"(?i)^slack\s*[-—–|:]\s*(?P<name>.+)$",
            ),
            rule(
                "slack_app_last",
                "Slack",
                r"(?i)^(?P<name>.+?)\s*[-—–|]\s*slack$",
            ),
            rule("gmail", "Gmail", r"(?i)\bgmail\b"),
            rule(
                "outlook",
                "Outlook",
                r"(?i)^(?P<name>.+?)\s+[-—–]\s+(?:.+?\s+[-—–]\s+)?outlook$",
            ),
            rule("zoom", "Zoom", r"(?i)\bzoom\s+(?:meeting|workplace)\b"),
            rule("figma", "Figma", r"(?i)^(?P<name>.+?)\s+[-—–]\s+figma$"),
            rule("notion", "Notion", r"(?i)^(?P<name>.+?)\s*[-—–|]\s*notion$"),
            rule(
                "youtube",
                "YouTube",
                r"(?i)^(?:\(\d+\)\s*)?(?P<name>.+?)\s+[-—–]\s+youtube\b",
            ),
            rule(
                "browser_tab",
                "Browser",
                r"(?i)^(?P<name>.+?)\s+[-—–]\s+(?:google chrome|chrome|mozilla firefox|firefox|safari|microsoft edge|brave)$",
            ),
            rule(
                "browser_app_first",
                "Browser",
                r"(?i)^(?:google chrome|chrome|mozilla firefox|firefox|safari|microsoft edge|brave)\s+[-—–]\s+(?P<name>.+)$",
            ),
        ];

        let layout = LayoutTables {
            interactive: layout_kind(
                &[
                    "compose", "send", "submit", "save", "cancel", "ok", "apply",
                    "delete", "reply", "forward", "sign in", "log in", "sign up",
                    "continue", "confirm", "run", "upload", "download", "share",
                    "add", "create", "edit", "click",
                ],
                &["button", "checkbox", "radio", "toggle", "switch", "slider"],
            ),
            headers: layout_kind(
                &[
                    "overview", "introduction", "summary", "chapter", "section",
                    "abstract", "contents", "table of contents", "getting started",
                    "references", "conclusion", "faq", "about",
                ],
                &["heading", "header", "title"],
            ),
            form_fields: layout_kind(
                &[
                    "email", "password", "username", "first name", "last name",
                    "address", "phone", "search", "date", "required", "subject",
                ],
                &["textbox", "input", "textfield", "combobox", "searchbox"],
            ),
            navigation: layout_kind(
                &[
                    "home", "back", "menu", "settings", "profile", "dashboard",
                    "inbox", "explore", "notifications", "sidebar", "previous",
                    "next",
                ],
                &["link", "tab", "menu", "menuitem", "navigation", "nav"],
            ),
        };

        let scenes = vec![
            scene(
                "Writing code",
                DeveloperTooling,
                &[
                    "code", "editor", "function", "class", "syntax", "variable",
                    "compile", "debug", "python", "javascript", "typescript",
                    "definition", "terminal",
                ],
            ),
            scene(
                "Chatting with an AI assistant",
                AiAssistant,
                &[
                    "ai assistant", "chatbot", "prompt", "language model", "chatgpt",
                    "claude", "conversation with", "assistant",
                ],
            ),
            scene(
                "Reading email",
                Communication,
                &["email", "inbox", "message", "compose", "reply", "mail", "sender"],
            ),
            scene(
                "Video call",
                Communication,
                &[
                    "video call", "meeting", "participants", "webcam", "zoom",
                    "microphone", "muted",
                ],
            ),
            scene(
                "Reading an article",
                Research,
                &[
                    "article", "paper", "paragraph", "reading", "research",
                    "wikipedia", "documentation", "blog post",
                ],
            ),
            scene(
                "Planning tasks",
                Productivity,
                &[
                    "calendar", "task", "board", "kanban", "schedule", "to-do", "todo",
                    "checklist", "project plan",
                ],
            ),
            scene(
                "Designing an interface",
                Design,
                &[
                    "design", "canvas", "layers", "figma", "mockup", "prototype",
                    "artboard", "vector",
                ],
            ),
            scene(
                "Browsing the web",
                WebBrowsing,
                &[
                    "browser", "website", "web page", "webpage", "tabs", "address bar",
                    "search results",
                ],
            ),
            scene(
                "Adjusting system settings",
                System,
                &[
                    "settings", "preferences", "system", "control panel",
                    "configuration",
                ],
            ),
            scene(
                "Watching video",
                Entertainment,
                &[
                    "video", "youtube", "player", "playing", "movie", "stream", "music",
                    "game",
                ],
            ),
            scene(
                "Editing a document",
                Documents,
                &[
                    "document", "spreadsheet", "slide", "presentation",
                    "word processor", "pdf", "cells",
                ],
            ),
        ];

        let ui_states = vec![
            ui_state("editing", &["editing", "typing", "cursor", "editor", "writing"]),
            ui_state(
                "reading",
                &["scrolling", "reading", "viewing", "showing", "displaying"],
            ),
            ui_state(
                "loading",
                &["loading", "spinner", "progress bar", "please wait"],
            ),
            ui_state("dialog-open", &["dialog", "modal", "popup", "pop-up", "alert"]),
            ui_state("error", &["error", "warning", "failed", "exception"]),
            ui_state(
                "idle",
                &["idle", "blank", "lock screen", "screensaver", "desktop wallpaper"],
            ),
            ui_state("form-entry", &["form", "input field", "text field", "filling"]),
        ];

        Self {
            categories,
            baseline_rules,
            layout,
            scenes,
            ui_states,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn kw(category: ActivityCategory, keywords: &[&str]) -> CategoryKeywords {
    CategoryKeywords {
        category,
        keywords: strings(keywords),
    }
}

fn rule(id: &str, app: &str, pattern: &str) -> BaselineRuleCfg {
    BaselineRuleCfg {
        id: id.to_string(),
        app: app.to_string(),
        pattern: pattern.to_string(),
    }
}

fn layout_kind(keywords: &[&str], roles: &[&str]) -> LayoutKindCfg {
    LayoutKindCfg {
        keywords: strings(keywords),
        roles: strings(roles),
    }
}

fn scene(label: &str, category: ActivityCategory, keywords: &[&str]) -> ScenePattern {
    ScenePattern {
        label: label.to_string(),
        category,
        keywords: strings(keywords),
    }
}

fn ui_state(label: &str, keywords: &[&str]) -> UiStatePattern {
    UiStatePattern {
        label: label.to_string(),
        keywords: strings(keywords),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_category() {
        let t = KeywordTables::builtin();
        for c in ActivityCategory::PRIORITY {
            assert!(
                t.categories.iter().any(|k| k.category == c && !k.keywords.is_empty()),
                "missing keywords for {c}"
            );
        }
    }

    #[test]
    fn partial_toml_keeps_builtin_sections() {
        let toml = r#"
[[scenes]]
label = "Reviewing a spreadsheet"
category = "documents"
keywords = ["spreadsheet", "cells"]
"#;
        let t = KeywordTables::from_toml_str(toml).unwrap();
        assert_eq!(t.scenes.len(), 1);
        assert_eq!(t.scenes[0].category, ActivityCategory::Documents);
        assert_eq!(
            t.baseline_rules.len(),
            KeywordTables::builtin().baseline_rules.len()
        );
    }

    #[test]
    fn unknown_category_is_rejected() {
        let toml = r#"
[[categories]]
category = "gardening"
keywords = ["tulips"]
"#;
        assert!(KeywordTables::from_toml_str(toml).is_err());
    }
}
