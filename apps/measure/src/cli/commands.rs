//! # CLI Command Implementations
//!
//! Each command has a pure half returning a serializable result, used by the
//! tests, and a `cmd_*` half that prints it.

use crate::config::AppError;
use measure_core::grammar::split_amount_or;
use measure_core::{AggregateMeasure, Catalogue, Measure};
use serde::Serialize;

// =============================================================================
// RESULTS
// =============================================================================

/// The outcome of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    /// The quantity as given.
    pub quantity: String,
    /// The measure the quantity was read in.
    pub measure: String,
    /// Target unit.
    pub unit: String,
    /// The converted amount.
    pub value: f64,
    /// The formatted result.
    pub text: String,
}

/// The units of one measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitListing {
    /// Measure name.
    pub measure: String,
    /// The native unit, if any.
    pub native: Option<String>,
    /// All unit names, sorted.
    pub units: Vec<String>,
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

/// Format spec for a target unit and an optional decimal format.
fn format_spec(to: &str, format: Option<&str>) -> String {
    match format {
        Some(decimal) => format!("{decimal}:{to}"),
        None => to.to_string(),
    }
}

fn unit_of(quantity: &str) -> Result<&str, AppError> {
    Ok(split_amount_or(quantity, 1.0)?.1)
}

// =============================================================================
// CONVERT COMMAND
// =============================================================================

/// Convert an interval quantity.
pub fn convert(
    catalogue: &Catalogue,
    quantity: &str,
    to: &str,
    measure: Option<&str>,
    format: Option<&str>,
) -> Result<Conversion, AppError> {
    let measure = match measure {
        Some(expression) => catalogue.resolve_expression(expression)?,
        None => catalogue.infer_measure(quantity)?,
    };

    let amount = measure.parse(quantity)?;
    let value = amount.get(to)?;
    let text = amount.format(&format_spec(to, format))?;
    tracing::debug!(%quantity, %measure, %to, value, "converted");

    Ok(Conversion {
        quantity: quantity.to_string(),
        measure: measure.to_string(),
        unit: to.to_string(),
        value,
        text,
    })
}

/// Print a conversion.
pub fn cmd_convert(
    catalogue: &Catalogue,
    json_mode: bool,
    quantity: &str,
    to: &str,
    measure: Option<&str>,
    format: Option<&str>,
) -> Result<(), AppError> {
    let conversion = convert(catalogue, quantity, to, measure, format)?;
    if json_mode {
        print_json(&conversion);
    } else {
        println!("{}", conversion.text);
    }
    Ok(())
}

// =============================================================================
// ABSOLUTE COMMAND
// =============================================================================

/// Convert a point on a scale.
pub fn absolute(
    catalogue: &Catalogue,
    quantity: &str,
    to: &str,
    measure: Option<&str>,
    format: Option<&str>,
) -> Result<Conversion, AppError> {
    let aggregate = match measure {
        Some(name) => named_aggregate(catalogue, name)?,
        None => {
            let unit = unit_of(quantity)?;
            catalogue
                .find_linear_for(unit)
                .map(|(_, l)| l.absolute())
                .or_else(|| catalogue.find_measure_for(unit).map(|(_, m)| m.aggregate()))
                .ok_or_else(|| AppError::Usage(format!("no measure has a unit '{unit}'")))?
        }
    };

    let point = aggregate.parse(quantity)?;
    let value = point.get(to)?;
    let text = point.format(&format_spec(to, format))?;

    Ok(Conversion {
        quantity: quantity.to_string(),
        measure: aggregate.to_string(),
        unit: to.to_string(),
        value,
        text,
    })
}

fn named_aggregate(catalogue: &Catalogue, name: &str) -> Result<AggregateMeasure, AppError> {
    if let Some(linear) = catalogue.linear(name) {
        return Ok(linear.absolute());
    }
    catalogue
        .measure(name)
        .map(|m| m.aggregate())
        .ok_or_else(|| AppError::Usage(format!("unknown measure '{name}'")))
}

/// Print a point conversion.
pub fn cmd_absolute(
    catalogue: &Catalogue,
    json_mode: bool,
    quantity: &str,
    to: &str,
    measure: Option<&str>,
    format: Option<&str>,
) -> Result<(), AppError> {
    let conversion = absolute(catalogue, quantity, to, measure, format)?;
    if json_mode {
        print_json(&conversion);
    } else {
        println!("{}", conversion.text);
    }
    Ok(())
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// The units of a named measure.
pub fn units_of(catalogue: &Catalogue, name: &str) -> Result<UnitListing, AppError> {
    if let Some(linear) = catalogue.linear(name) {
        return Ok(UnitListing {
            measure: name.to_string(),
            native: linear.native_unit(),
            units: linear.ladders(),
        });
    }

    let measure = catalogue
        .measure(name)
        .ok_or_else(|| AppError::Usage(format!("unknown measure '{name}'")))?;
    let units = match &measure {
        Measure::Basic(b) => b.units(),
        Measure::DynamicBasic(d) => d.basic().units(),
        Measure::Derived(d) | Measure::DynamicDerived(d) => d.aliases(),
        Measure::LinearDelta(l) => l.ladders(),
        Measure::Scalar => Vec::new(),
    };
    Ok(UnitListing {
        measure: name.to_string(),
        native: measure.native_unit(),
        units,
    })
}

/// Print the measure names, or the units of one measure.
pub fn cmd_list(
    catalogue: &Catalogue,
    json_mode: bool,
    measure: Option<&str>,
) -> Result<(), AppError> {
    let Some(name) = measure else {
        let names = catalogue.names();
        if json_mode {
            print_json(&names);
        } else {
            for name in names {
                println!("{name}");
            }
        }
        return Ok(());
    };

    let listing = units_of(catalogue, name)?;
    if json_mode {
        print_json(&listing);
        return Ok(());
    }

    println!("{}", listing.measure);
    println!("{}", "=".repeat(listing.measure.len()));
    for unit in &listing.units {
        if listing.native.as_deref() == Some(unit.as_str()) {
            println!("  {unit} (native)");
        } else {
            println!("  {unit}");
        }
    }
    Ok(())
}
