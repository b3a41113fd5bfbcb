use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use zonecut::config::ConfigFormat;
use zonecut::*;

#[test]
fn test_defaults_match_fresh_processor() {
    let config = ZoneConfig::default();
    assert_eq!(config.kmeans.clusters, 2);
    assert_eq!(config.kmeans.max_steps, 10);
    assert_eq!(config.kmeans.metric, DistanceMetric::Euclidean);
    assert_eq!(config.regions.region_width, 25);
    assert_eq!(config.regions.region_height, 25);
    assert_eq!(config.regions.min_region_size, 5);
    assert!(!config.regions.merge_regions);
    assert_eq!(config.border.threshold, 0);
    assert_eq!(config.border.neighborhood_size, 2);
    assert_eq!((config.framing.rows, config.framing.cols), (10, 10));
    assert!(config.framing.randomize);
    assert_eq!(
        (config.framing.row_tolerance, config.framing.col_tolerance),
        (10, 10)
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_fills_in_defaults() {
    let text = r#"
        [kmeans]
        clusters = 6
        metric = "ed-hsv-svd"

        [regions]
        merge_regions = true
    "#;
    let config = ZoneConfig::parse(text, ConfigFormat::Toml).unwrap();

    assert_eq!(config.kmeans.clusters, 6);
    assert_eq!(config.kmeans.metric, DistanceMetric::EdHsvSvd);
    assert_eq!(config.kmeans.max_steps, 10);
    assert!(config.regions.merge_regions);
    assert_eq!(config.regions.region_width, 25);
    assert_eq!(config.border, BorderConfig::default());
}

#[test]
fn test_framing_section_parses_and_validates() {
    let text = "[framing]\nrows = 4\ncols = 6\nrandomize = false\n";
    let config = ZoneConfig::parse(text, ConfigFormat::Toml).unwrap();
    assert_eq!(config.framing.rows, 4);
    assert_eq!(config.framing.cols, 6);
    assert!(!config.framing.randomize);
    assert_eq!(config.framing.row_tolerance, 10);

    let broken = ZoneConfig::parse("[framing]\nrows = 0\n", ConfigFormat::Toml).unwrap();
    assert!(matches!(
        broken.validate(),
        Err(ZoneError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_yaml_is_understood() {
    let text = "border:\n  threshold: 12\n  neighborhood_size: 1\n";
    let config = ZoneConfig::parse(text, ConfigFormat::Yaml).unwrap();
    assert_eq!(config.border.threshold, 12);
    assert_eq!(config.border.neighborhood_size, 1);
}

#[test]
fn test_rendered_json_parses_back() {
    let mut config = ZoneConfig::default();
    config.kmeans.metric = DistanceMetric::HsvSvd;
    config.regions.min_region_size = 3;

    let text = config.render(ConfigFormat::Json).unwrap();
    assert!(text.contains("hsv-svd"));
    assert_eq!(ZoneConfig::parse(&text, ConfigFormat::Json).unwrap(), config);
}

#[test]
fn test_malformed_text_is_a_parse_error() {
    let err = ZoneConfig::parse("kmeans = [", ConfigFormat::Toml).unwrap_err();
    assert!(matches!(err, ZoneError::ConfigParse(_)));

    let err = ZoneConfig::parse(r#"{"kmeans": {"metric": "manhattan"}}"#, ConfigFormat::Json)
        .unwrap_err();
    assert!(matches!(err, ZoneError::ConfigParse(_)));
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut config = ZoneConfig::default();
    config.kmeans.clusters = 0;
    assert!(matches!(
        config.validate(),
        Err(ZoneError::InvalidConfiguration(_))
    ));

    let mut config = ZoneConfig::default();
    config.regions.min_region_size = 25;
    assert!(config.validate().is_err());

    let mut config = ZoneConfig::default();
    config.regions.similarity_threshold = 1.01;
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[regions]\nregion_width = 40\nregion_height = 30").unwrap();

    let config = ZoneConfig::from_path(file.path()).unwrap();
    assert_eq!(config.regions.region_width, 40);
    assert_eq!(config.regions.region_height, 30);
}

#[test]
fn test_load_rejects_invalid_file_contents() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"kmeans": {{"max_steps": 0}}}}"#).unwrap();

    let err = ZoneConfig::from_path(file.path()).unwrap_err();
    assert!(matches!(err, ZoneError::InvalidConfiguration(_)));
}

#[test]
fn test_unknown_extension_is_rejected() {
    let file = NamedTempFile::new().unwrap();
    let err = ZoneConfig::from_path(file.path()).unwrap_err();
    assert!(matches!(err, ZoneError::ConfigParse(_)));

    assert_eq!(
        ConfigFormat::from_path(Path::new("zones.YML")).unwrap(),
        ConfigFormat::Yaml
    );
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ZoneConfig::from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ZoneError::IoError(_)));
}
