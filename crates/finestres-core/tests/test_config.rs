use std::path::PathBuf;

use finestres_core::calibration::{BuilderState, CalibrationConfig, CalibrationStage};
use finestres_core::stack::CombineMethod;

#[test]
fn test_default_config() {
    let config = CalibrationConfig::default();
    assert_eq!(config.dark_method, CombineMethod::Median);
    assert_eq!(config.flat_method, CombineMethod::Median);
    assert!(config.replace_existing);
    assert!(config.save_masters);
    assert_eq!(config.output_dir, None);
}

#[test]
fn test_config_toml_roundtrip() {
    let config = CalibrationConfig {
        dark_method: CombineMethod::Mean,
        flat_method: CombineMethod::Median,
        replace_existing: false,
        save_masters: true,
        output_dir: Some(PathBuf::from("masters")),
    };
    let text = toml::to_string_pretty(&config).unwrap();
    assert!(text.contains("dark_method = \"mean\""));

    let parsed: CalibrationConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_config_uses_defaults() {
    let parsed: CalibrationConfig = toml::from_str("flat_method = \"mean\"\n").unwrap();
    assert_eq!(parsed.flat_method, CombineMethod::Mean);
    assert_eq!(parsed.dark_method, CombineMethod::Median);
    assert!(parsed.replace_existing);
}

#[test]
fn test_invalid_method_rejected() {
    assert!(toml::from_str::<CalibrationConfig>("dark_method = \"sigma\"\n").is_err());
}

#[test]
fn test_stage_display() {
    assert_eq!(CalibrationStage::CombiningFlats.to_string(), "Combining flats");
    assert_eq!(CalibrationStage::Writing.to_string(), "Writing masters");
}

#[test]
fn test_builder_state_display() {
    assert_eq!(BuilderState::Grouped.to_string(), "grouped");
    assert_eq!(
        BuilderState::Failed("boom".into()).to_string(),
        "failed (boom)"
    );
}
