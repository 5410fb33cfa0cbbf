// tests/config_engine.rs
//
// Engine built from a config file on disk: weights, similarity params and a
// custom keyword-table file all flow through to classification.

use std::fs;

use activity_fusion::{ActivityCategory, CaptureSignals, FusionConfig, FusionEngine, OcrRegion, SignalKind};

const TABLES: &str = r#"
[[baseline_rules]]
id = "ledger"
app = "Ledger"
pattern = "(?i)^ledger\\s*[-:]\\s*(?P<name>.+)$"

[[categories]]
category = "documents"
keywords = ["ledger"]

[[categories]]
category = "communication"
keywords = ["inbox"]
"#;

const CONFIG: &str = r#"
tables = "tables.toml"

[weights]
baseline_confidence = 0.4
text_override_min_grade = "excellent"

[similarity]
top_k = 3
"#;

fn engine_from_dir() -> (tempfile::TempDir, FusionEngine) {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("tables.toml"), TABLES).unwrap();
    let cfg_path = tmp.path().join("fusion.toml");
    fs::write(&cfg_path, CONFIG).unwrap();

    let cfg = FusionConfig::load_from_file(&cfg_path).unwrap();
    let engine = FusionEngine::from_config(&cfg).unwrap();
    (tmp, engine)
}

#[test]
fn custom_rules_and_weights_apply() {
    let (_tmp, e) = engine_from_dir();
    assert_eq!(e.search_params().top_k, 3);

    let r = e.classify(&CaptureSignals::new("x", "Ledger - March")).unwrap();
    assert_eq!(r.label, "Ledger: March");
    assert_eq!(r.category, ActivityCategory::Documents);
    assert!((r.confidence - 0.4).abs() < 1e-6);
}

#[test]
fn stricter_quality_gate_keeps_baseline_label() {
    let (_tmp, e) = engine_from_dir();
    // mean 0.7 grades "good": enough by default, not enough here
    let s = CaptureSignals::new("x", "Ledger - March").with_ocr(vec![
        OcrRegion::new("Save", 0.7).role("button"),
        OcrRegion::new("Cancel", 0.7).role("button"),
    ]);
    let r = e.classify(&s).unwrap();
    assert_eq!(r.label, "Ledger: March");
    assert!(r.used(SignalKind::Text));
    assert!(r.confidence > 0.4);

    let default = FusionEngine::builtin().unwrap().classify(&s).unwrap();
    assert!(default.label.contains("interacting"), "{}", default.label);
}

#[test]
fn missing_tables_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg_path = tmp.path().join("fusion.toml");
    fs::write(&cfg_path, "tables = \"nope.toml\"\n").unwrap();
    let cfg = FusionConfig::load_from_file(&cfg_path).unwrap();
    let err = FusionEngine::from_config(&cfg).unwrap_err();
    assert!(format!("{err:#}").contains("nope.toml"));
}

#[test]
fn invalid_rule_regex_names_the_rule() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("tables.toml"),
        "[[baseline_rules]]\nid = \"broken\"\napp = \"X\"\npattern = \"(unclosed\"\n",
    )
    .unwrap();
    let cfg_path = tmp.path().join("fusion.toml");
    fs::write(&cfg_path, "tables = \"tables.toml\"\n").unwrap();
    let cfg = FusionConfig::load_from_file(&cfg_path).unwrap();
    let err = FusionEngine::from_config(&cfg).unwrap_err();
    assert!(err.to_string().contains("broken"));
}
