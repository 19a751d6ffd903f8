//! # Common Measures
//!
//! Distance, duration, mass, angle and temperature, configured through the
//! public construction API and optimized.

use crate::linear::{Ladder, LinearMeasure};
use crate::measure::Measure;
use crate::{MeasureError, MeasureRegistry, UnitDef};
use std::f64::consts::PI;

/// The standard measures of one registry.
#[derive(Debug, Clone)]
pub struct Commons {
    /// The registry owning the measures below.
    pub registry: MeasureRegistry,
    /// Native unit `meter`.
    pub distance: Measure,
    /// Native unit `second`.
    pub duration: Measure,
    /// Native unit `kilogram`.
    pub mass: Measure,
    /// Native unit `turn`.
    pub angle: Measure,
    /// Native ladder `K`.
    pub temperature: LinearMeasure,
}

impl Commons {
    /// Build the standard measures in `registry`.
    pub fn new(registry: &MeasureRegistry) -> Result<Self, MeasureError> {
        let distance = registry.basic_with(
            "distance",
            [
                ("meter", UnitDef::from(1.0)),
                ("kilometer", UnitDef::from(1000.0)),
                ("centimeter", UnitDef::from(0.01)),
                ("millimeter", UnitDef::from(0.001)),
            ],
        )?;
        distance.update([
            ("m", UnitDef::from("meter")),
            ("km", UnitDef::from("kilometer")),
            ("cm", UnitDef::from("centimeter")),
            ("mm", UnitDef::from("millimeter")),
            ("inch", UnitDef::from((2.54, "centimeter"))),
            ("foot", UnitDef::from((12.0, "inch"))),
            ("yard", UnitDef::from((3.0, "foot"))),
            ("mile", UnitDef::from((1760.0, "yard"))),
        ])?;
        distance.optimize_aliases()?;

        let duration = registry.basic_with(
            "duration",
            [
                ("second", UnitDef::from(1.0)),
                ("minute", UnitDef::from(60.0)),
                ("hour", UnitDef::from("60 minute")),
                ("millisecond", UnitDef::from(0.001)),
                ("day", UnitDef::from("24 hour")),
                ("s", UnitDef::from("second")),
                ("ms", UnitDef::from("millisecond")),
            ],
        )?;
        duration.optimize_aliases()?;

        let mass = registry.basic_with(
            "mass",
            [
                ("kilogram", UnitDef::from(1.0)),
                ("ton", UnitDef::from(1000.0)),
                ("pound", UnitDef::from(0.4536)),
                ("gram", UnitDef::from(0.001)),
                ("kg", UnitDef::from("kilogram")),
                ("lb", UnitDef::from("pound")),
                ("g", UnitDef::from("gram")),
            ],
        )?;
        mass.optimize_aliases()?;

        // A radian is 1/pi turns here, not 1/(2 pi).
        let angle = registry.basic_with(
            "angle",
            [
                ("turn", 1.0),
                ("degree", 1.0 / 360.0),
                ("radian", 1.0 / PI),
                ("gradian", 1.0 / 400.0),
                ("quarter", 0.25),
            ],
        )?;
        angle.optimize_aliases()?;

        let temperature = registry.linear("temperature");
        temperature.set_ladder("K", Ladder::arbitrary())?;
        temperature.set_ladder("kelvin", "K")?;
        temperature.add_ladder("C", (-273.15, 0.0), (0.0, 273.15), None)?;
        temperature.set_ladder("celsius", "C")?;
        temperature.add_ladder("F", (-459.67, -40.0), (0.0, 233.15), None)?;
        temperature.set_ladder("fahrenheit", "F")?;
        temperature.optimize_aliases()?;

        Ok(Self {
            registry: registry.clone(),
            distance,
            duration,
            mass,
            angle,
            temperature,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::is_close;

    #[test]
    fn imperial_distances_chain_through_aliases() {
        let commons = Commons::new(&MeasureRegistry::new()).expect("commons");
        let distance = &commons.distance;
        assert!(is_close(distance.lookup("mm").expect("mm"), 0.001));
        assert!(is_close(distance.lookup("foot").expect("foot"), 0.3048));
        assert!(is_close(distance.lookup("mile").expect("mile"), 1609.344));
        assert_eq!(distance.native_unit().as_deref(), Some("meter"));
    }

    #[test]
    fn durations_resolve_amount_aliases() {
        let commons = Commons::new(&MeasureRegistry::new()).expect("commons");
        assert!(is_close(commons.duration.lookup("day").expect("day"), 86_400.0));
        assert!(is_close(commons.duration.lookup("ms").expect("ms"), 0.001));
    }

    #[test]
    fn tables_are_frozen() {
        let commons = Commons::new(&MeasureRegistry::new()).expect("commons");
        assert!(matches!(
            commons.mass.set_unit("stone", 6.35),
            Err(MeasureError::Frozen(_))
        ));
        assert!(matches!(
            commons.temperature.set_ladder("R", Ladder::new(5.0 / 9.0, 0.0)),
            Err(MeasureError::Frozen(_))
        ));
    }

    #[test]
    fn temperature_ladders() {
        let commons = Commons::new(&MeasureRegistry::new()).expect("commons");
        let fahrenheit = commons.temperature.ladder("fahrenheit").expect("F");
        assert!(is_close(fahrenheit.to_arb(32.0), 273.15));
        assert_eq!(commons.temperature.native_unit().as_deref(), Some("K"));
    }
}
