//! # Aggregate (Absolute) Measures
//!
//! The absolute-point dual of a measure. Every aggregate measure has exactly
//! one derivative (delta) measure:
//!
//! - `Basic(m)`: points on the axis of `m`, converted by `m`'s coefficients.
//! - `Linear(l)`: points on an affine scale, converted by `l`'s ladders.
//!
//! Point arithmetic:
//! - point + delta = point
//! - point - delta = point
//! - point - point = delta

use crate::dynamic::Reading;
use crate::format::FormatSpec;
use crate::grammar::split_amount;
use crate::linear::{Ladder, LinearMeasure};
use crate::measure::Measure;
use crate::measurement::{Measurement, Operand, round_to_step};
use crate::{MeasureError, Unit};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

// =============================================================================
// AGGREGATE MEASURE
// =============================================================================

/// The absolute view of a measure.
#[derive(Debug, Clone)]
pub enum AggregateMeasure {
    /// Points on the axis of a ratio-scale measure.
    Basic(Measure),
    /// Points on an affine scale.
    Linear(LinearMeasure),
}

/// How a unit of an aggregate measure maps onto the arbitrary axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitScale {
    /// A plain coefficient.
    Ratio(f64),
    /// An affine ladder.
    Ladder(Ladder),
}

impl Unit for UnitScale {
    fn to_arbitrary(&self, value: f64) -> f64 {
        match self {
            Self::Ratio(c) => c.to_arbitrary(value),
            Self::Ladder(l) => l.to_arbitrary(value),
        }
    }

    fn from_arbitrary(&self, value: f64) -> f64 {
        match self {
            Self::Ratio(c) => c.from_arbitrary(value),
            Self::Ladder(l) => l.from_arbitrary(value),
        }
    }
}

impl AggregateMeasure {
    /// The delta measure of this aggregate.
    #[must_use]
    pub fn derivative(&self) -> Measure {
        match self {
            Self::Basic(m) => m.clone(),
            Self::Linear(l) => l.delta(),
        }
    }

    /// The current conversion of a unit name.
    pub fn resolve(&self, unit: &str) -> Result<UnitScale, MeasureError> {
        match self {
            Self::Basic(m) => m.lookup(unit).map(UnitScale::Ratio),
            Self::Linear(l) => l.ladder(unit).map(UnitScale::Ladder),
        }
    }

    /// Whether the unit is understood by the derivative.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        match self {
            Self::Basic(m) => m.contains(unit),
            Self::Linear(l) => l.contains(unit),
        }
    }

    /// The derivative's native unit.
    #[must_use]
    pub fn native_unit(&self) -> Option<String> {
        self.derivative().native_unit()
    }

    /// A point at `amount` on the scale of `unit`.
    pub fn measurement(&self, amount: f64, unit: &str) -> Result<AggregateMeasurement, MeasureError> {
        let reading = match self {
            Self::Basic(m) => Reading::new(amount, m.decompose(unit)?),
            Self::Linear(l) => Reading::Arbitrary(l.ladder(unit)?.to_arb(amount)),
        };
        Ok(AggregateMeasurement::new(self.clone(), reading))
    }

    /// A point from an amount-prefixed unit string. The amount is required:
    /// `"25 C"` is a temperature, `"C"` is not.
    pub fn parse(&self, text: &str) -> Result<AggregateMeasurement, MeasureError> {
        let (amount, unit) =
            split_amount(text)?.ok_or_else(|| MeasureError::MissingAmount(text.to_string()))?;
        self.measurement(amount, unit)
    }

    /// A point already in arbitrary units.
    #[must_use]
    pub fn from_arbitrary(&self, amount: f64) -> AggregateMeasurement {
        AggregateMeasurement::new(self.clone(), Reading::Arbitrary(amount))
    }
}

impl fmt::Display for AggregateMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(m) => write!(f, "{m}_absolute"),
            Self::Linear(l) => write!(f, "{l}"),
        }
    }
}

impl PartialEq for AggregateMeasure {
    fn eq(&self, other: &Self) -> bool {
        self.derivative() == other.derivative()
    }
}

impl Eq for AggregateMeasure {}

impl Hash for AggregateMeasure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.derivative().hash(state);
    }
}

// =============================================================================
// AGGREGATE MEASUREMENT
// =============================================================================

/// Result of subtracting from a point.
#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    /// point - delta
    Point(AggregateMeasurement),
    /// point - point
    Interval(Measurement),
}

impl Difference {
    /// The point, if the right operand was a delta.
    #[must_use]
    pub fn into_point(self) -> Option<AggregateMeasurement> {
        match self {
            Self::Point(p) => Some(p),
            Self::Interval(_) => None,
        }
    }

    /// The interval, if the right operand was a point.
    #[must_use]
    pub fn into_interval(self) -> Option<Measurement> {
        match self {
            Self::Interval(m) => Some(m),
            Self::Point(_) => None,
        }
    }
}

/// An immutable absolute point.
#[derive(Debug, Clone)]
pub struct AggregateMeasurement {
    measure: AggregateMeasure,
    reading: Reading,
}

impl AggregateMeasurement {
    pub(crate) fn new(measure: AggregateMeasure, reading: Reading) -> Self {
        Self { measure, reading }
    }

    /// The aggregate measure of this point.
    #[must_use]
    pub fn measure(&self) -> &AggregateMeasure {
        &self.measure
    }

    /// Whether the point is re-evaluated against live coefficients.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.reading.is_live()
    }

    /// The position in arbitrary units.
    pub fn arbitrary(&self) -> Result<f64, MeasureError> {
        self.reading.arbitrary()
    }

    /// The position on the scale of `unit`.
    pub fn get(&self, unit: &str) -> Result<f64, MeasureError> {
        Ok(self.measure.resolve(unit)?.from_arbitrary(self.arbitrary()?))
    }

    fn coalesce_delta(&self, operand: Operand<'_>) -> Result<Measurement, MeasureError> {
        let derivative = self.measure.derivative();
        match operand {
            Operand::Measurement(m) if *m.measure() == derivative => Ok(m.clone()),
            Operand::Measurement(m) => Err(MeasureError::Mismatch {
                left: derivative.to_string(),
                right: m.measure().to_string(),
            }),
            Operand::Text(text) => derivative.parse(text),
            Operand::Number(n) if n == 0.0 => Ok(derivative.zero()),
            Operand::Number(n) => Err(MeasureError::NotSupported(format!(
                "{n} is not a delta of {derivative}"
            ))),
            Operand::Aggregate(_) => Err(MeasureError::NotSupported(
                "an absolute point is not a delta".to_string(),
            )),
        }
    }

    fn coalesce_absolute(
        &self,
        operand: Operand<'_>,
    ) -> Result<AggregateMeasurement, MeasureError> {
        match operand {
            Operand::Aggregate(a) if a.measure == self.measure => Ok(a.clone()),
            Operand::Aggregate(a) => Err(MeasureError::Mismatch {
                left: self.measure.to_string(),
                right: a.measure.to_string(),
            }),
            Operand::Text(text) => self.measure.parse(text),
            Operand::Number(n) => Err(MeasureError::NotSupported(format!(
                "{n} is not a point of {}",
                self.measure
            ))),
            Operand::Measurement(_) => Err(MeasureError::NotSupported(
                "a delta is not an absolute point".to_string(),
            )),
        }
    }

    fn shifted(&self, arbitrary: f64) -> Result<Self, MeasureError> {
        Ok(Self::new(
            self.measure.clone(),
            self.reading.with_arbitrary(arbitrary)?,
        ))
    }

    /// point + delta
    pub fn add<'a>(&self, delta: impl Into<Operand<'a>>) -> Result<Self, MeasureError> {
        let delta = self.coalesce_delta(delta.into())?;
        self.shifted(self.arbitrary()? + delta.arbitrary()?)
    }

    /// point - delta, or else point - point.
    ///
    /// The delta reading is tried first; when the operand is not a delta it
    /// is read as a point and the result is an interval. If both fail, the
    /// point error is reported.
    pub fn sub<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Difference, MeasureError> {
        let other = other.into();
        if let Ok(delta) = self.coalesce_delta(other) {
            return Ok(Difference::Point(
                self.shifted(self.arbitrary()? - delta.arbitrary()?)?,
            ));
        }
        let point = self.coalesce_absolute(other)?;
        self.interval(&point)
    }

    /// point - point, always an interval of the derivative measure.
    pub fn interval(&self, other: &Self) -> Result<Difference, MeasureError> {
        if other.measure != self.measure {
            return Err(MeasureError::Mismatch {
                left: self.measure.to_string(),
                right: other.measure.to_string(),
            });
        }
        let difference = self.arbitrary()? - other.arbitrary()?;
        Ok(Difference::Interval(Measurement::new(
            self.measure.derivative(),
            self.reading.with_arbitrary(difference)?,
        )))
    }

    /// Order two points of the same measure.
    pub fn compare<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Ordering, MeasureError> {
        let other = self.coalesce_absolute(other.into())?;
        let (a, b) = (self.arbitrary()?, other.arbitrary()?);
        a.partial_cmp(&b)
            .ok_or_else(|| MeasureError::NotSupported(format!("cannot order {a} and {b}")))
    }

    /// Round to the nearest multiple of a delta, measured from the
    /// arbitrary zero.
    pub fn round_to<'a>(&self, step: impl Into<Operand<'a>>) -> Result<Self, MeasureError> {
        let step = self.coalesce_delta(step.into())?.arbitrary()?;
        self.shifted(round_to_step(self.arbitrary()?, step)?)
    }

    /// Render with the `[decimal:][unit][|label]` mini-language.
    pub fn format(&self, spec: &str) -> Result<String, MeasureError> {
        let spec = FormatSpec::parse(spec)?;
        spec.render(self.measure.native_unit(), |unit| self.get(unit))
    }
}

impl PartialEq for AggregateMeasurement {
    fn eq(&self, other: &Self) -> bool {
        self.measure == other.measure
            && matches!(
                (self.arbitrary(), other.arbitrary()),
                (Ok(a), Ok(b)) if a == b
            )
    }
}

impl Eq for AggregateMeasurement {}

impl Hash for AggregateMeasurement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.measure.hash(state);
        if let Ok(value) = self.arbitrary() {
            // +0.0 and -0.0 compare equal.
            (value + 0.0).to_bits().hash(state);
        }
    }
}

impl fmt::Display for AggregateMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format("") {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?} ({})", self.arbitrary().ok(), self.measure),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeasureRegistry;
    use crate::util::is_close;

    fn temperature(registry: &MeasureRegistry) -> LinearMeasure {
        let temperature = registry.linear("temperature");
        temperature
            .set_ladder("kelvin", Ladder::arbitrary())
            .expect("kelvin");
        temperature
            .add_ladder("celsius", (-273.15, 0.0), (0.0, 273.15), None)
            .expect("celsius");
        temperature.set_ladder("C", "celsius").expect("C");
        temperature
            .add_ladder("fahrenheit", (-459.67, -40.0), (0.0, 233.15), None)
            .expect("fahrenheit");
        temperature.set_ladder("F", "fahrenheit").expect("F");
        temperature
    }

    #[test]
    fn absolute_conversion_applies_offset() {
        let registry = MeasureRegistry::new();
        let absolute = temperature(&registry).absolute();
        let freezing = absolute.parse("0 C").expect("0 C");
        assert!(is_close(freezing.get("fahrenheit").expect("F"), 32.0));
        assert!(is_close(freezing.get("kelvin").expect("K"), 273.15));
    }

    #[test]
    fn absolute_requires_an_amount() {
        let registry = MeasureRegistry::new();
        let absolute = temperature(&registry).absolute();
        assert_eq!(
            absolute.parse("C"),
            Err(MeasureError::MissingAmount("C".to_string()))
        );
    }

    #[test]
    fn subtracting_a_delta_gives_a_point() {
        let registry = MeasureRegistry::new();
        let temperature = temperature(&registry);
        let absolute = temperature.absolute();
        let warm = absolute.parse("25 C").expect("25 C");
        let delta = temperature.delta().parse("25 C").expect("delta");
        let freezing = warm
            .sub(&delta)
            .expect("sub")
            .into_point()
            .expect("point");
        assert!(is_close(freezing.get("C").expect("C"), 0.0));
    }

    #[test]
    fn subtracting_a_point_gives_an_interval() {
        let registry = MeasureRegistry::new();
        let temperature = temperature(&registry);
        let absolute = temperature.absolute();
        let warm = absolute.parse("25 C").expect("25 C");
        let freezing = absolute.parse("0 C").expect("0 C");
        let interval = warm
            .sub(&freezing)
            .expect("sub")
            .into_interval()
            .expect("interval");
        assert_eq!(*interval.measure(), temperature.delta());
        assert!(is_close(interval.get("F").expect("F"), 45.0));
    }

    #[test]
    fn text_operands_are_read_as_deltas_first() {
        let registry = MeasureRegistry::new();
        let absolute = temperature(&registry).absolute();
        let warm = absolute.parse("25 C").expect("25 C");
        let cooled = warm.sub("5 C").expect("sub");
        assert!(matches!(cooled, Difference::Point(_)));
    }

    #[test]
    fn points_compare_across_ladders() {
        let registry = MeasureRegistry::new();
        let absolute = temperature(&registry).absolute();
        let body = absolute.parse("37 C").expect("37 C");
        assert_eq!(body.compare("98 F").expect("compare"), Ordering::Greater);
        assert_eq!(body.compare("99 F").expect("compare"), Ordering::Less);
    }

    #[test]
    fn rounding_to_a_delta() {
        let registry = MeasureRegistry::new();
        let absolute = temperature(&registry).absolute();
        let point = absolute.parse("273.4 kelvin").expect("point");
        let rounded = point.round_to("1 kelvin").expect("round");
        assert!(is_close(rounded.get("kelvin").expect("K"), 273.0));
        assert!(matches!(
            point.round_to("0 C"),
            Err(MeasureError::NotSupported(_))
        ));
        assert!(matches!(point.round_to(0.0), Err(MeasureError::NotSupported(_))));
    }

    #[test]
    fn points_hash_by_position() {
        use std::collections::HashSet;

        let registry = MeasureRegistry::new();
        let temperature = temperature(&registry);
        let absolute = temperature.absolute();
        let kelvin = absolute.parse("300 kelvin").expect("kelvin");
        let shifted = absolute.parse("0 kelvin").expect("zero").add("300 kelvin").expect("add");
        let other = absolute.parse("300 C").expect("C");

        let set: HashSet<AggregateMeasurement> = [kelvin.clone(), shifted, other.clone()]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&kelvin));
        assert!(set.contains(&other));

        let zero: HashSet<AggregateMeasurement> =
            [absolute.from_arbitrary(0.0), absolute.from_arbitrary(-0.0)]
                .into_iter()
                .collect();
        assert_eq!(zero.len(), 1);
    }

    #[test]
    fn basic_aggregate_position() {
        let registry = MeasureRegistry::new();
        let distance = registry
            .basic_with("distance", [("meter", 1.0), ("kilometer", 1000.0)])
            .expect("distance");
        let position = distance.aggregate();
        assert_eq!(position.derivative(), distance);

        let here = position.parse("2 kilometer").expect("here");
        let there = position.parse("500 meter").expect("there");
        let gap = here
            .sub(&there)
            .expect("sub")
            .into_interval()
            .expect("interval");
        assert_eq!(gap.get("meter").expect("m"), 1500.0);

        let further = here.add(&gap).expect("add");
        assert_eq!(further.get("kilometer").expect("km"), 3.5);
        assert_eq!(further.format(".1f:meter|m").expect("format"), "3500.0 m");
    }
}
