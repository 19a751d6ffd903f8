//! # Unit Catalogues
//!
//! A catalogue is a named collection of measures built from a serde
//! description. Installation goes through the public construction API only:
//! units are assigned, the native unit is pinned, then `optimize_aliases`
//! resolves (and, for static measures, freezes) the tables.
//!
//! ```toml
//! [basic.distance]
//! native = "meter"
//! units = { meter = 1.0, km = 1000.0, inch = [2.54, "cm"], cm = 0.01 }
//!
//! [linear.temperature]
//! native = "kelvin"
//! ladders = { kelvin = { scale = 1.0 }, C = { this = [-273.15, 0.0], other = [0.0, 273.15] } }
//!
//! [derived.speed]
//! of = "distance/duration"
//! ```

use crate::commons::Commons;
use crate::constants::DEFAULT_AMOUNT;
use crate::grammar::{parse_composite, split_amount_or};
use crate::linear::{Ladder, LinearMeasure};
use crate::measure::Measure;
use crate::{MeasureError, MeasureRegistry, UnitDef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// DESCRIPTION
// =============================================================================

/// Serde description of a catalogue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueSpec {
    /// Static atomic measures.
    pub basic: BTreeMap<String, MeasureSpec>,
    /// Atomic measures with live coefficients.
    pub dynamic: BTreeMap<String, MeasureSpec>,
    /// Affine measures.
    pub linear: BTreeMap<String, LinearSpec>,
    /// Named compound measures over the measures above.
    pub derived: BTreeMap<String, DerivedSpec>,
}

/// Unit table of an atomic measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureSpec {
    /// The native unit. Defaults to the first unit in name order.
    #[serde(default)]
    pub native: Option<String>,
    /// Unit definitions.
    #[serde(default)]
    pub units: BTreeMap<String, UnitDef>,
    /// Run `optimize_aliases` once the table is installed.
    #[serde(default = "default_optimize")]
    pub optimize: bool,
}

/// Ladder table of a linear measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSpec {
    /// The native ladder. Defaults to the first ladder in name order.
    #[serde(default)]
    pub native: Option<String>,
    /// Ladder definitions.
    #[serde(default)]
    pub ladders: BTreeMap<String, LadderSpec>,
    /// Run `optimize_aliases` once the table is installed.
    #[serde(default = "default_optimize")]
    pub optimize: bool,
}

/// One ladder of a linear measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LadderSpec {
    /// Another ladder of the same measure.
    Alias(String),
    /// Two calibration points, against `reference` or the arbitrary axis.
    Points {
        this: (f64, f64),
        other: (f64, f64),
        #[serde(default)]
        reference: Option<String>,
    },
    /// Explicit scale and offset.
    Explicit {
        scale: f64,
        #[serde(default)]
        offset: f64,
    },
}

/// A named compound measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSpec {
    /// Measure expression, e.g. `"distance/duration**2"`.
    pub of: String,
    /// Aliases for composite unit strings.
    #[serde(default)]
    pub units: BTreeMap<String, UnitDef>,
}

const fn default_optimize() -> bool {
    true
}

// =============================================================================
// CATALOGUE
// =============================================================================

/// Named measures of one registry.
#[derive(Debug, Clone)]
pub struct Catalogue {
    registry: MeasureRegistry,
    measures: BTreeMap<String, Measure>,
    linear: BTreeMap<String, LinearMeasure>,
}

impl Catalogue {
    /// Create an empty catalogue over a registry.
    #[must_use]
    pub fn new(registry: &MeasureRegistry) -> Self {
        Self {
            registry: registry.clone(),
            measures: BTreeMap::new(),
            linear: BTreeMap::new(),
        }
    }

    /// Build a catalogue from a description.
    pub fn build(registry: &MeasureRegistry, spec: &CatalogueSpec) -> Result<Self, MeasureError> {
        let mut catalogue = Self::new(registry);
        catalogue.install(spec)?;
        Ok(catalogue)
    }

    /// The standard measures: distance, duration, mass, angle, temperature.
    pub fn from_commons(registry: &MeasureRegistry) -> Result<Self, MeasureError> {
        let commons = Commons::new(registry)?;
        let mut catalogue = Self::new(registry);
        catalogue.insert_measure("distance", commons.distance)?;
        catalogue.insert_measure("duration", commons.duration)?;
        catalogue.insert_measure("mass", commons.mass)?;
        catalogue.insert_measure("angle", commons.angle)?;
        catalogue.insert_linear("temperature", commons.temperature)?;
        Ok(catalogue)
    }

    /// The registry the catalogue's measures belong to.
    #[must_use]
    pub fn registry(&self) -> &MeasureRegistry {
        &self.registry
    }

    /// Install a description on top of the measures already present.
    pub fn install(&mut self, spec: &CatalogueSpec) -> Result<(), MeasureError> {
        for (name, table) in &spec.basic {
            let measure = self.registry.basic(name.as_str());
            install_units(&measure, table)?;
            self.insert_measure(name, measure)?;
        }
        for (name, table) in &spec.dynamic {
            let measure = self.registry.dynamic(name.as_str());
            install_units(&measure, table)?;
            self.insert_measure(name, measure)?;
        }
        for (name, table) in &spec.linear {
            let measure = self.registry.linear(name.as_str());
            install_ladders(&measure, table)?;
            self.insert_linear(name, measure)?;
        }
        self.install_derived(&spec.derived)?;

        tracing::debug!(
            measures = self.measures.len(),
            linear = self.linear.len(),
            "catalogue installed"
        );
        Ok(())
    }

    /// Derived entries may name each other, so they are installed in passes
    /// until nothing is left or a pass makes no progress.
    fn install_derived(&mut self, derived: &BTreeMap<String, DerivedSpec>) -> Result<(), MeasureError> {
        let mut pending: Vec<(&String, &DerivedSpec)> = derived.iter().collect();
        while !pending.is_empty() {
            let mut deferred = Vec::new();
            let mut last_error = None;
            for (name, entry) in pending.iter().copied() {
                match self.resolve_expression(&entry.of) {
                    Ok(measure) => {
                        measure.update(entry.units.clone())?;
                        if !measure.is_scalar() && measure.as_primitive().is_none() {
                            measure.set_name(name.as_str())?;
                        }
                        self.insert_measure(name, measure)?;
                    }
                    Err(MeasureError::UnknownUnit(missing)) if derived.contains_key(&missing) => {
                        deferred.push((name, entry));
                        last_error = Some(MeasureError::UnknownUnit(missing));
                    }
                    Err(e) => return Err(e),
                }
            }
            if deferred.len() == pending.len() {
                return Err(last_error.unwrap_or_else(|| {
                    MeasureError::NotSupported("unresolvable derived measures".to_string())
                }));
            }
            pending = deferred;
        }
        Ok(())
    }

    /// Add a measure under a name.
    pub fn insert_measure(&mut self, name: impl Into<String>, measure: Measure) -> Result<(), MeasureError> {
        let name = name.into();
        if self.is_defined(&name) {
            return Err(MeasureError::NotSupported(format!("measure {name} is already defined")));
        }
        self.measures.insert(name, measure);
        Ok(())
    }

    /// Add a linear measure under a name.
    pub fn insert_linear(
        &mut self,
        name: impl Into<String>,
        measure: LinearMeasure,
    ) -> Result<(), MeasureError> {
        let name = name.into();
        if self.is_defined(&name) {
            return Err(MeasureError::NotSupported(format!("measure {name} is already defined")));
        }
        self.linear.insert(name, measure);
        Ok(())
    }

    fn is_defined(&self, name: &str) -> bool {
        self.measures.contains_key(name) || self.linear.contains_key(name)
    }

    /// A measure by name. Linear measures resolve to their delta view.
    #[must_use]
    pub fn measure(&self, name: &str) -> Option<Measure> {
        self.measures
            .get(name)
            .cloned()
            .or_else(|| self.linear.get(name).map(LinearMeasure::delta))
            .or_else(|| (name == "scalar").then_some(Measure::Scalar))
    }

    /// A linear measure by name.
    #[must_use]
    pub fn linear(&self, name: &str) -> Option<&LinearMeasure> {
        self.linear.get(name)
    }

    /// Every measure name, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .measures
            .keys()
            .chain(self.linear.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Combine named measures with the composite grammar.
    ///
    /// `"distance/duration**2"` is the acceleration measure.
    pub fn resolve_expression(&self, expression: &str) -> Result<Measure, MeasureError> {
        parse_composite(expression)?
            .into_iter()
            .try_fold(Measure::Scalar, |acc, token| {
                let measure = self
                    .measure(&token.name)
                    .ok_or_else(|| MeasureError::UnknownUnit(token.name.clone()))?;
                acc.mul(&measure.pow(token.exponent)?)
            })
    }

    /// The first measure, in name order, that understands a unit string.
    #[must_use]
    pub fn find_measure_for(&self, unit: &str) -> Option<(&str, Measure)> {
        self.measures
            .iter()
            .find(|(_, m)| m.contains(unit))
            .map(|(name, m)| (name.as_str(), m.clone()))
            .or_else(|| {
                self.find_linear_for(unit)
                    .map(|(name, l)| (name, l.delta()))
            })
    }

    /// The measure of a unit string, inferred token by token for composite
    /// units no named measure understands.
    ///
    /// `"km/hour"` is distance/duration even when no speed measure exists.
    pub fn infer_measure(&self, unit: &str) -> Result<Measure, MeasureError> {
        let (_, unit) = split_amount_or(unit, DEFAULT_AMOUNT)?;
        if let Some((_, measure)) = self.find_measure_for(unit) {
            return Ok(measure);
        }
        parse_composite(unit)?
            .into_iter()
            .try_fold(Measure::Scalar, |acc, token| {
                let (_, measure) = self
                    .measures
                    .iter()
                    .find(|(_, m)| m.as_primitive().is_some() && m.contains(&token.name))
                    .map(|(name, m)| (name.as_str(), m.clone()))
                    .or_else(|| {
                        self.find_linear_for(&token.name)
                            .map(|(name, l)| (name, l.delta()))
                    })
                    .ok_or_else(|| MeasureError::UnknownUnit(token.name.clone()))?;
                acc.mul(&measure.pow(token.exponent)?)
            })
    }

    /// The first linear measure, in name order, with a ladder named `unit`.
    #[must_use]
    pub fn find_linear_for(&self, unit: &str) -> Option<(&str, &LinearMeasure)> {
        self.linear
            .iter()
            .find(|(_, l)| l.contains(unit))
            .map(|(name, l)| (name.as_str(), l))
    }
}

fn install_units(measure: &Measure, table: &MeasureSpec) -> Result<(), MeasureError> {
    measure.update(table.units.clone())?;
    if let Some(native) = &table.native {
        measure.set_native_unit(native)?;
    }
    if table.optimize {
        measure.optimize_aliases()?;
    }
    Ok(())
}

/// Ladders calibrated against a reference wait until the reference resolves.
fn install_ladders(measure: &LinearMeasure, table: &LinearSpec) -> Result<(), MeasureError> {
    let mut pending: Vec<(&String, &LadderSpec)> = Vec::new();
    for (name, ladder) in &table.ladders {
        match ladder {
            LadderSpec::Alias(target) => measure.set_ladder(name.as_str(), target.as_str())?,
            LadderSpec::Explicit { scale, offset } => {
                measure.set_ladder(name.as_str(), Ladder::new(*scale, *offset))?;
            }
            LadderSpec::Points { .. } => pending.push((name, ladder)),
        }
    }

    while !pending.is_empty() {
        let mut deferred = Vec::new();
        let mut last_error = None;
        for (name, ladder) in pending.iter().copied() {
            let LadderSpec::Points {
                this,
                other,
                reference,
            } = ladder
            else {
                continue;
            };
            match measure.add_ladder(name.as_str(), *this, *other, reference.as_deref()) {
                Ok(_) => {}
                Err(MeasureError::UnknownUnit(missing)) => {
                    deferred.push((name, ladder));
                    last_error = Some(MeasureError::UnknownUnit(missing));
                }
                Err(e) => return Err(e),
            }
        }
        if deferred.len() == pending.len() {
            return Err(last_error.unwrap_or_else(|| {
                MeasureError::NotSupported(format!("unresolvable ladders of {}", measure.name()))
            }));
        }
        pending = deferred;
    }

    if let Some(native) = &table.native {
        measure.set_native_unit(native)?;
    }
    if table.optimize {
        measure.optimize_aliases()?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::is_close;

    const CATALOGUE: &str = r#"
        [basic.distance]
        native = "meter"
        units = { meter = 1.0, km = 1000, cm = 0.01, inch = [2.54, "cm"], m = "meter" }

        [basic.duration]
        units = { second = 1.0, minute = 60.0, hour = "60 minute", s = "second" }

        [dynamic.currency]
        native = "gold"
        units = { gold = 1.0, toy = [3.0, "gold"] }

        [linear.temperature]
        native = "kelvin"
        ladders.kelvin = { scale = 1.0 }
        ladders.K = "kelvin"
        ladders.C = { this = [-273.15, 0.0], other = [0.0, 273.15] }
        ladders.F = { this = [-40.0, 32.0], other = [-40.0, 0.0], reference = "C" }

        [derived.acceleration]
        of = "speed/duration"

        [derived.speed]
        of = "distance/duration"
        units = { kmh = "km/hour" }
    "#;

    fn catalogue() -> Catalogue {
        let spec: CatalogueSpec = toml::from_str(CATALOGUE).expect("catalogue parses");
        Catalogue::build(&MeasureRegistry::new(), &spec).expect("catalogue installs")
    }

    #[test]
    fn unit_definitions_deserialize() {
        let spec: CatalogueSpec = toml::from_str(CATALOGUE).expect("catalogue parses");
        let distance = &spec.basic["distance"];
        assert_eq!(distance.units["km"], UnitDef::Coefficient(1000.0));
        assert_eq!(distance.units["m"], UnitDef::Alias("meter".to_string()));
        assert_eq!(
            distance.units["inch"],
            UnitDef::Scaled(2.54, "cm".to_string())
        );
        assert!(distance.optimize);
        assert!(matches!(
            spec.linear["temperature"].ladders["F"],
            LadderSpec::Points { reference: Some(_), .. }
        ));
    }

    #[test]
    fn native_units_follow_the_description() {
        let catalogue = catalogue();
        let distance = catalogue.measure("distance").expect("distance");
        assert_eq!(distance.native_unit().as_deref(), Some("meter"));
        // No native given: first unit in name order.
        let duration = catalogue.measure("duration").expect("duration");
        assert_eq!(duration.native_unit().as_deref(), Some("hour"));
        let temperature = catalogue.linear("temperature").expect("temperature");
        assert_eq!(temperature.native_unit().as_deref(), Some("kelvin"));
    }

    #[test]
    fn static_tables_are_optimized() {
        let catalogue = catalogue();
        let distance = catalogue.measure("distance").expect("distance");
        assert!(is_close(distance.lookup("inch").expect("inch"), 0.0254));
        assert!(distance.set_unit("mile", 1609.344).is_err());
    }

    #[test]
    fn ladders_calibrate_against_references() {
        let catalogue = catalogue();
        let temperature = catalogue.linear("temperature").expect("temperature");
        let fahrenheit = temperature.ladder("F").expect("F");
        assert!(is_close(fahrenheit.to_arb(32.0), 273.15));
        assert!(is_close(fahrenheit.to_arb(212.0), 373.15));
    }

    #[test]
    fn derived_entries_resolve_in_any_order() {
        let catalogue = catalogue();
        let speed = catalogue.measure("speed").expect("speed");
        let acceleration = catalogue.measure("acceleration").expect("acceleration");
        let expected = catalogue
            .resolve_expression("distance/duration2")
            .expect("expression");
        assert_eq!(acceleration, expected);
        assert_eq!(speed.to_string(), "speed");
        assert!(is_close(speed.lookup("kmh").expect("kmh"), 1000.0 / 3600.0));
    }

    #[test]
    fn unknown_expression_names_fail() {
        let catalogue = catalogue();
        assert!(matches!(
            catalogue.resolve_expression("distance/weight"),
            Err(MeasureError::UnknownUnit(name)) if name == "weight"
        ));
        assert!(matches!(
            catalogue.resolve_expression("distance//"),
            Err(MeasureError::Parse(_))
        ));
    }

    #[test]
    fn units_find_their_measure() {
        let catalogue = catalogue();
        let (name, _) = catalogue.find_measure_for("3 km").expect("km");
        assert_eq!(name, "distance");
        let (name, measure) = catalogue.find_measure_for("C").expect("C");
        assert_eq!(name, "temperature");
        assert!(matches!(measure, Measure::LinearDelta(_)));
        assert!(catalogue.find_measure_for("parsec").is_none());
    }

    #[test]
    fn composite_units_infer_their_measure() {
        let catalogue = catalogue();
        let speed = catalogue.measure("speed").expect("speed");
        assert_eq!(catalogue.infer_measure("90 km/hour").expect("speed"), speed);

        let registry = catalogue.registry().clone();
        let mut bare = Catalogue::new(&registry);
        bare.insert_measure("distance", catalogue.measure("distance").expect("distance"))
            .expect("distance");
        bare.insert_measure("duration", catalogue.measure("duration").expect("duration"))
            .expect("duration");
        assert_eq!(bare.infer_measure("km/hour").expect("inferred"), speed);
        assert!(matches!(
            bare.infer_measure("km/fortnight"),
            Err(MeasureError::UnknownUnit(name)) if name == "fortnight"
        ));
    }

    #[test]
    fn names_are_unique() {
        let registry = MeasureRegistry::new();
        let mut catalogue = Catalogue::new(&registry);
        catalogue
            .insert_measure("distance", registry.basic("distance"))
            .expect("first");
        assert!(
            catalogue
                .insert_linear("distance", registry.linear("distance"))
                .is_err()
        );
    }

    #[test]
    fn missing_reference_is_reported() {
        let spec: CatalogueSpec = toml::from_str(
            r#"
            [linear.temperature]
            ladders.F = { this = [-40.0, 32.0], other = [-40.0, 0.0], reference = "C" }
            "#,
        )
        .expect("catalogue parses");
        assert!(matches!(
            Catalogue::build(&MeasureRegistry::new(), &spec),
            Err(MeasureError::UnknownUnit(name)) if name == "C"
        ));
    }
}
