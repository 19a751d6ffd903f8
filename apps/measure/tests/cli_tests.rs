//! Tests for CLI argument parsing and command results.

// Allow panic in tests - these are standard for test code
#![allow(clippy::panic)]

use clap::Parser;
use measure::AppConfig;
use measure::cli::{Cli, Commands, absolute, convert, units_of};
use measure_core::Catalogue;

fn catalogue() -> Catalogue {
    AppConfig::default().build_catalogue().expect("catalogue")
}

// =============================================================================
// PARSING
// =============================================================================

#[test]
fn convert_arguments_parse() {
    let cli = Cli::try_parse_from([
        "measure",
        "--json-mode",
        "convert",
        "3.5 km",
        "--to",
        "mile",
        "--format",
        ".3f",
    ])
    .expect("parse");

    assert!(cli.json_mode);
    assert!(cli.config.is_none());
    match cli.command {
        Commands::Convert {
            quantity,
            to,
            measure,
            format,
        } => {
            assert_eq!(quantity, "3.5 km");
            assert_eq!(to, "mile");
            assert_eq!(measure, None);
            assert_eq!(format.as_deref(), Some(".3f"));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn config_is_global() {
    let cli = Cli::try_parse_from(["measure", "list", "--config", "units.toml"]).expect("parse");
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("units.toml"))
    );
}

#[test]
fn convert_requires_a_target() {
    assert!(Cli::try_parse_from(["measure", "convert", "3 km"]).is_err());
}

// =============================================================================
// COMMANDS
// =============================================================================

#[test]
fn convert_basic_units() {
    let conversion = convert(&catalogue(), "3.5 km", "m", None, None).expect("convert");
    assert_eq!(conversion.measure, "distance");
    assert_eq!(conversion.value, 3500.0);
    assert_eq!(conversion.text, "3500.0 m");
}

#[test]
fn convert_infers_composite_measures() {
    let conversion =
        convert(&catalogue(), "90 km/hour", "m/s", None, Some(".1f")).expect("convert");
    assert_eq!(conversion.text, "25.0 m/s");
}

#[test]
fn convert_with_an_explicit_measure() {
    let conversion = convert(
        &catalogue(),
        "9.8 m/s2",
        "km/hour2",
        Some("distance/duration**2"),
        Some(".0f"),
    )
    .expect("convert");
    assert_eq!(conversion.text, "127008 km/hour2");
}

#[test]
fn convert_temperature_interval() {
    let conversion = convert(&catalogue(), "10 C", "F", None, None).expect("convert");
    assert!((conversion.value - 18.0).abs() < 1e-9);
}

#[test]
fn absolute_temperature() {
    let conversion = absolute(&catalogue(), "100 C", "F", None, Some(".1f")).expect("absolute");
    assert_eq!(conversion.text, "212.0 F");
    assert_eq!(conversion.measure, "temperature");
}

#[test]
fn unknown_units_are_reported() {
    assert!(convert(&catalogue(), "3 parsec", "m", None, None).is_err());
    assert!(absolute(&catalogue(), "3 parsec", "m", None, None).is_err());
}

#[test]
fn list_units() {
    let listing = units_of(&catalogue(), "temperature").expect("listing");
    assert_eq!(listing.native.as_deref(), Some("K"));
    assert_eq!(
        listing.units,
        vec!["C", "F", "K", "celsius", "fahrenheit", "kelvin"]
    );
    assert!(units_of(&catalogue(), "volume").is_err());
}
