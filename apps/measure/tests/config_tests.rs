//! Tests for loading TOML configuration and building catalogues from it.

use measure::{AppConfig, AppError};
use measure_core::MeasureError;
use std::io::Write;
use tempfile::NamedTempFile;

const VOLUME: &str = r#"
include_commons = true

[catalogue.basic.volume]
native = "liter"
units = { liter = 1.0, ml = 0.001, gallon = 3.785, l = "liter" }

[catalogue.derived.speed]
of = "distance/duration"
units = { kmh = "km/hour" }
"#;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(text.as_bytes()).expect("write");
    file
}

// =============================================================================
// LOADING
// =============================================================================

#[test]
fn defaults_include_commons() {
    let config = AppConfig::load_or_default(None).expect("defaults");
    assert!(config.include_commons);

    let catalogue = config.build_catalogue().expect("catalogue");
    assert_eq!(
        catalogue.names(),
        vec!["angle", "distance", "duration", "mass", "temperature"]
    );
}

#[test]
fn file_extends_commons() {
    let file = write_config(VOLUME);
    let config = AppConfig::load(file.path()).expect("load");
    let catalogue = config.build_catalogue().expect("catalogue");

    let volume = catalogue.measure("volume").expect("volume");
    assert_eq!(volume.native_unit().as_deref(), Some("liter"));
    assert_eq!(volume.lookup("l").expect("l"), 1.0);

    let speed = catalogue.measure("speed").expect("speed");
    let kmh = speed.lookup("kmh").expect("kmh");
    assert!((kmh - 1000.0 / 3600.0).abs() < 1e-12);
}

#[test]
fn commons_can_be_left_out() {
    let config = AppConfig::from_toml_str(
        r#"
        include_commons = false

        [catalogue.dynamic.currency]
        native = "gold"
        units = { gold = 1.0, pog = 2.0 }
        "#,
    )
    .expect("parse");
    let catalogue = config.build_catalogue().expect("catalogue");
    assert_eq!(catalogue.names(), vec!["currency"]);
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("dir");
    let result = AppConfig::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Io(_))));
}

#[test]
fn malformed_toml_is_config_error() {
    let file = write_config("include_commons = maybe");
    assert!(matches!(
        AppConfig::load(file.path()),
        Err(AppError::Config(_))
    ));
}

#[test]
fn derived_over_unknown_measure_fails() {
    let config = AppConfig::from_toml_str(
        r#"
        [catalogue.derived.density]
        of = "mass/volume3"
        "#,
    )
    .expect("parse");
    assert!(matches!(
        config.build_catalogue(),
        Err(AppError::Measure(MeasureError::UnknownUnit(name))) if name == "volume"
    ));
}

#[test]
fn redefining_a_common_measure_fails() {
    let config = AppConfig::from_toml_str(
        r#"
        [catalogue.basic.distance]
        units = { league = 1.0 }
        "#,
    )
    .expect("parse");
    assert!(matches!(
        config.build_catalogue(),
        Err(AppError::Measure(MeasureError::NotSupported(_)))
    ));
}
