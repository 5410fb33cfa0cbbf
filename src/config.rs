// src/config.rs
//! Service/engine configuration.
//!
//! Resolution order:
//! 1) `$FUSION_CONFIG_PATH` (must exist when set)
//! 2) `config/fusion.toml`
//! 3) built-in defaults
//!
//! Files are TOML unless they end in `.json`. After loading,
//! `FUSION_SIMILARITY_FLOOR` and `FUSION_TOP_K` override the `[similarity]`
//! table. Out-of-range values are replaced by defaults.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyze::FusionWeights;
use crate::similarity::SearchParams;
use crate::tables::KeywordTables;

pub const DEFAULT_CONFIG_PATH: &str = "config/fusion.toml";
pub const ENV_CONFIG_PATH: &str = "FUSION_CONFIG_PATH";
pub const ENV_SIMILARITY_FLOOR: &str = "FUSION_SIMILARITY_FLOOR";
pub const ENV_TOP_K: &str = "FUSION_TOP_K";

pub const DEFAULT_BIND: &str = "127.0.0.1:8088";
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;
const MAX_TOP_K: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub history_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub weights: FusionWeights,
    pub similarity: SearchParams,
    pub server: ServerConfig,
    /// Optional keyword-table file; built-in tables when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<PathBuf>,
}

impl FusionConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FusionConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: FusionConfig = serde_json::from_str(s)?;
        Ok(cfg.sanitized())
    }

    /// TOML by default; `.json` files are parsed as JSON.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading fusion config from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        let mut cfg =
            parsed.with_context(|| format!("parsing fusion config in {}", path.display()))?;
        // relative table paths are resolved against the config file's directory
        if let (Some(t), Some(dir)) = (cfg.tables.as_mut(), path.parent()) {
            if t.is_relative() && !dir.as_os_str().is_empty() {
                *t = dir.join(&*t);
            }
        }
        Ok(cfg)
    }

    /// Env path, then the default file, then defaults; env overrides applied last.
    pub fn load() -> Result<Self> {
        let mut cfg = match resolve_path()? {
            Some(p) => Self::load_from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(f) = parse_floor_env(std::env::var(ENV_SIMILARITY_FLOOR).ok()) {
            self.similarity.floor = f;
        }
        if let Some(k) = parse_top_k_env(std::env::var(ENV_TOP_K).ok()) {
            self.similarity.top_k = k;
        }
    }

    pub fn sanitized(mut self) -> Self {
        self.weights = self.weights.sanitized();
        self.similarity = self.similarity.sanitized();
        self.similarity.top_k = self.similarity.top_k.min(MAX_TOP_K);
        if self.server.bind.trim().is_empty() {
            self.server.bind = DEFAULT_BIND.to_string();
        }
        if self.server.history_capacity == 0 {
            self.server.history_capacity = DEFAULT_HISTORY_CAPACITY;
        }
        self
    }

    /// Keyword tables referenced by `tables`, or the built-in set.
    pub fn load_tables(&self) -> Result<KeywordTables> {
        match &self.tables {
            Some(p) => KeywordTables::load_from_file(p),
            None => Ok(KeywordTables::builtin()),
        }
    }
}

fn resolve_path() -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!(
            "{ENV_CONFIG_PATH} points to non-existent path {}",
            pb.display()
        ));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(default.exists().then_some(default))
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_floor_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn parse_top_k_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .map(|v| v.clamp(1, MAX_TOP_K))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::QualityGrade;
    use std::env;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = FusionConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, FusionConfig::default());
        assert_eq!(cfg.server.bind, "127.0.0.1:8088");
        assert_eq!(cfg.similarity.top_k, 5);
    }

    #[test]
    fn partial_sections_and_sanitation() {
        let cfg = FusionConfig::from_toml_str(
            r#"
[weights]
similarity_weight = 0.3
text_override_min_grade = "fair"
corroboration_bonus = -1.0

[similarity]
floor = 0.8
top_k = 0

[server]
history_capacity = 0
"#,
        )
        .unwrap();
        assert!((cfg.weights.similarity_weight - 0.3).abs() < f32::EPSILON);
        assert_eq!(cfg.weights.text_override_min_grade, QualityGrade::Fair);
        assert_eq!(cfg.weights.corroboration_bonus, 0.05);
        assert!((cfg.similarity.floor - 0.8).abs() < f32::EPSILON);
        assert_eq!(cfg.similarity.top_k, 1);
        assert_eq!(cfg.server.history_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn env_parsers_clamp() {
        assert_eq!(parse_floor_env(Some(" 1.7 ".into())), Some(1.0));
        assert_eq!(parse_floor_env(Some("NaN".into())), None);
        assert_eq!(parse_floor_env(Some("abc".into())), None);
        assert_eq!(parse_top_k_env(Some("0".into())), Some(1));
        assert_eq!(parse_top_k_env(Some("1000".into())), Some(MAX_TOP_K));
        assert_eq!(parse_top_k_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn load_uses_env_path_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_SIMILARITY_FLOOR);
        env::remove_var(ENV_TOP_K);

        // no files → defaults
        assert_eq!(FusionConfig::load().unwrap(), FusionConfig::default());

        // default location
        fs::create_dir_all("config").unwrap();
        fs::write(DEFAULT_CONFIG_PATH, "[similarity]\ntop_k = 3\n").unwrap();
        assert_eq!(FusionConfig::load().unwrap().similarity.top_k, 3);

        // env path wins, and env overrides apply on top
        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[similarity]\ntop_k = 7\nfloor = 0.75\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_TOP_K, "2");
        let cfg = FusionConfig::load().unwrap();
        assert_eq!(cfg.similarity.top_k, 2);
        assert!((cfg.similarity.floor - 0.75).abs() < f32::EPSILON);

        // env path pointing nowhere is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(FusionConfig::load().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_TOP_K);
        env::set_current_dir(&old).unwrap();
    }

    #[test]
    fn json_config_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("fusion.json");
        fs::write(&p, r#"{"similarity": {"top_k": 4}, "server": {"bind": "0.0.0.0:9000"}}"#).unwrap();
        let cfg = FusionConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.similarity.top_k, 4);
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.weights, FusionWeights::default());
    }

    #[test]
    fn relative_tables_path_resolves_next_to_config() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg_path = tmp.path().join("fusion.toml");
        fs::write(&cfg_path, "tables = \"tables.toml\"\n").unwrap();
        fs::write(
            tmp.path().join("tables.toml"),
            "[[ui_states]]\nlabel = \"busy\"\nkeywords = [\"spinner\"]\n",
        )
        .unwrap();

        let cfg = FusionConfig::load_from_file(&cfg_path).unwrap();
        assert_eq!(cfg.tables.as_deref(), Some(tmp.path().join("tables.toml").as_path()));
        let tables = cfg.load_tables().unwrap();
        assert_eq!(tables.ui_states.len(), 1);
        assert_eq!(tables.ui_states[0].label, "busy");
        // untouched sections keep built-ins
        assert!(!tables.baseline_rules.is_empty());
    }
}
