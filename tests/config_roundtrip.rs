//! Integration test: `PipelineConfig` TOML round-trip and cascade behavior.

use callscribe::config::{ModelSize, PipelineConfig};

#[test]
fn test_default_config_round_trips_through_toml() {
    let cfg = PipelineConfig::default();
    let serialized = toml::to_string(&cfg).expect("serialize");
    let deserialized: PipelineConfig = toml::from_str(&serialized).expect("deserialize");

    assert_eq!(deserialized.model_size, cfg.model_size);
    assert_eq!(deserialized.language, cfg.language);
    assert_eq!(deserialized.max_workers, cfg.max_workers);
}

#[test]
fn test_partial_toml_file_keeps_unspecified_defaults() {
    let toml_text = r#"
        model_size = "small"
        max_workers = 3
    "#;
    let cfg: PipelineConfig = toml::from_str(toml_text).expect("parse partial config");

    assert_eq!(cfg.model_size, ModelSize::Small);
    assert_eq!(cfg.max_workers, 3);
    // Everything else falls back to PipelineConfig::default().
    assert_eq!(cfg.language, "zh");
    assert_eq!(cfg.overlap_duration_secs, 2.0);
}

#[test]
fn test_unknown_key_is_rejected() {
    let toml_text = r#"
        model_size = "base"
        totally_made_up_field = true
    "#;
    let result: Result<PipelineConfig, _> = toml::from_str(toml_text);
    assert!(result.is_err());
}

#[test]
fn test_diarization_token_never_serialized() {
    let mut cfg = PipelineConfig::default();
    cfg.diarization_hf_token = Some("hf_shouldnotleak".to_string());
    let serialized = toml::to_string(&cfg).expect("serialize");
    assert!(!serialized.contains("hf_shouldnotleak"));
}
