//! Detector configuration: defaults, JSON loading, validation.

use antifraud_core::{
    config::{DetectorConfig, FeatureConfig},
    error::DetectError,
};
use std::fs;

/// Defaults are the fixed three-feature design.
#[test]
fn default_config_is_three_feature_design() {
    let config = DetectorConfig::default();
    let hops: Vec<u32> = config.features.iter().map(|f| f.max_hops).collect();

    assert_eq!(hops, vec![1, 2, 4]);
    assert_eq!(config.progress_interval, 100);
    assert_eq!(config.workers, 1);
    config.validate().expect("defaults are valid");
}

/// The shipped sample config equals the defaults.
#[test]
fn shipped_sample_matches_defaults() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/detector.json");
    let loaded = DetectorConfig::load(path).expect("load sample");
    assert_eq!(loaded, DetectorConfig::default());
}

/// Optional fields fall back to their defaults.
#[test]
fn load_fills_in_optional_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detector.json");
    let json = r#"{ "features": [ { "name": "only", "max_hops": 3 } ] }"#;
    fs::write(&path, json).unwrap();

    let config = DetectorConfig::load(&path).unwrap();

    assert_eq!(config.features, vec![FeatureConfig::new("only", 3)]);
    assert_eq!(config.progress_interval, 100);
    assert_eq!(config.workers, 1);
}

/// A threshold that narrows after a wider one is rejected.
#[test]
fn narrowing_thresholds_are_invalid() {
    let config = DetectorConfig {
        features: vec![
            FeatureConfig::new("wide", 4),
            FeatureConfig::new("narrow", 1),
        ],
        ..DetectorConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, DetectError::InvalidConfig { .. }), "got {err:?}");
    assert!(err.to_string().contains("narrow"));
}

/// Zero features, zero workers, and a zero progress interval are rejected.
#[test]
fn degenerate_settings_are_invalid() {
    let no_features = DetectorConfig {
        features: Vec::new(),
        ..DetectorConfig::default()
    };
    let no_workers = DetectorConfig {
        workers: 0,
        ..DetectorConfig::default()
    };
    let no_progress = DetectorConfig {
        progress_interval: 0,
        ..DetectorConfig::default()
    };

    for config in [no_features, no_workers, no_progress] {
        assert!(matches!(config.validate(), Err(DetectError::InvalidConfig { .. })));
    }
}

/// Malformed JSON surfaces as a serialization error.
#[test]
fn malformed_json_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detector.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        DetectorConfig::load(&path),
        Err(DetectError::Serialization(_))
    ));
}
