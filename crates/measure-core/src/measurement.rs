//! # Measurements
//!
//! An immutable amount of a measure. The amount is held in the measure's
//! arbitrary unit, never in a display unit, so arithmetic is unit-free.
//!
//! Measurements of dynamic measures keep the units they were created in and
//! resolve the arbitrary amount at read time (see `dynamic`).
//!
//! ## Operands
//!
//! Addition, subtraction, comparison and rounding take an `Operand`: another
//! measurement, a unit string such as `"3 km"`, or a number. Strings are
//! parsed with the receiver's measure; `0` is the zero of any measure; any
//! number is accepted by scalar measurements. Everything else is a typed
//! error, never a silent coercion.

use crate::aggregate::AggregateMeasurement;
use crate::dynamic::{Reading, UnitExponents};
use crate::format::FormatSpec;
use crate::measure::{Measure, Primitive};
use crate::util::{Exponent, classify_exponent};
use crate::{MeasureError, Unit};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Div, Mul, Neg};

// =============================================================================
// OPERANDS
// =============================================================================

/// The right-hand side of a measurement operation.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// A delta measurement.
    Measurement(&'a Measurement),
    /// An absolute point.
    Aggregate(&'a AggregateMeasurement),
    /// An amount-prefixed unit string.
    Text(&'a str),
    /// A bare number.
    Number(f64),
}

impl<'a> From<&'a Measurement> for Operand<'a> {
    fn from(value: &'a Measurement) -> Self {
        Self::Measurement(value)
    }
}

impl<'a> From<&'a AggregateMeasurement> for Operand<'a> {
    fn from(value: &'a AggregateMeasurement) -> Self {
        Self::Aggregate(value)
    }
}

impl<'a> From<&'a str> for Operand<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for Operand<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

// =============================================================================
// MEASUREMENT
// =============================================================================

/// An immutable amount of a measure.
#[derive(Debug, Clone)]
pub struct Measurement {
    measure: Measure,
    reading: Reading,
}

impl Measurement {
    pub(crate) fn new(measure: Measure, reading: Reading) -> Self {
        Self { measure, reading }
    }

    /// The measure of this measurement.
    #[must_use]
    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    /// Whether the amount is re-evaluated against live coefficients.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.reading.is_live()
    }

    /// The live units this measurement was created in.
    #[must_use]
    pub fn live_units(&self) -> Option<&UnitExponents> {
        self.reading.units()
    }

    /// The amount in arbitrary units.
    pub fn arbitrary(&self) -> Result<f64, MeasureError> {
        self.reading.arbitrary()
    }

    /// The amount expressed in `unit`.
    pub fn get(&self, unit: &str) -> Result<f64, MeasureError> {
        let coefficient = self.measure.lookup(unit)?;
        Ok(coefficient.from_arbitrary(self.arbitrary()?))
    }

    /// The amount in "this many of each primitive's native unit".
    pub fn get_exponents(&self, exponents: &BTreeMap<Primitive, i32>) -> Result<f64, MeasureError> {
        let coefficient = self.measure.decompose_exponents(exponents)?.evaluate()?;
        Ok(coefficient.from_arbitrary(self.arbitrary()?))
    }

    /// The bare number, if the measure is scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        if self.measure.is_scalar() {
            self.arbitrary().ok()
        } else {
            None
        }
    }

    fn coalesce(&self, operand: Operand<'_>) -> Result<Measurement, MeasureError> {
        match operand {
            Operand::Measurement(m) if m.measure == self.measure => Ok(m.clone()),
            Operand::Measurement(m) => Err(MeasureError::Mismatch {
                left: self.measure.to_string(),
                right: m.measure.to_string(),
            }),
            Operand::Text(text) => self.measure.parse(text),
            Operand::Number(n) if n == 0.0 || self.measure.is_scalar() => {
                Ok(self.measure.from_arbitrary(n))
            }
            Operand::Number(n) => Err(MeasureError::NotSupported(format!(
                "{n} is not a measurement of {}",
                self.measure
            ))),
            Operand::Aggregate(a) => Err(MeasureError::NotSupported(format!(
                "an absolute {} is not a measurement of {}",
                a.measure(),
                self.measure
            ))),
        }
    }

    fn with_arbitrary(&self, arbitrary: f64) -> Result<Self, MeasureError> {
        Ok(Self::new(
            self.measure.clone(),
            self.reading.with_arbitrary(arbitrary)?,
        ))
    }

    // =========================================================================
    // ARITHMETIC
    // =========================================================================

    /// Multiply the amount, keeping the measure.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.measure.clone(), self.reading.map_amount(|a| a * factor))
    }

    /// The product of two measurements, in the product measure.
    pub fn mul(&self, other: &Measurement) -> Result<Measurement, MeasureError> {
        let measure = self.measure.mul(&other.measure)?;
        Ok(Self::new(measure, self.reading.product(&other.reading)?))
    }

    /// The quotient of two measurements, in the quotient measure.
    pub fn div(&self, other: &Measurement) -> Result<Measurement, MeasureError> {
        let measure = self.measure.div(&other.measure)?;
        Ok(Self::new(measure, self.reading.quotient(&other.reading)?))
    }

    /// `1 / self`.
    pub fn inverse(&self) -> Result<Measurement, MeasureError> {
        let measure = self.measure.inverse()?;
        Ok(Self::new(measure, Reading::Arbitrary(1.0).quotient(&self.reading)?))
    }

    /// Raise amount and measure to an integer power.
    pub fn pow(&self, exponent: i32) -> Result<Measurement, MeasureError> {
        let measure = self.measure.pow(exponent)?;
        Ok(Self::new(measure, self.reading.powi(exponent)?))
    }

    /// Raise to a real power that is an integer or an integer's reciprocal.
    pub fn powf(&self, power: f64) -> Result<Measurement, MeasureError> {
        match classify_exponent(power) {
            Some(Exponent::Power(n)) => self.pow(n),
            Some(Exponent::Root(n)) => self.root(n),
            None => Err(MeasureError::NotSupported(format!(
                "cannot raise {} to the power {power}",
                self.measure
            ))),
        }
    }

    /// The real n-th root of amount and measure.
    pub fn root(&self, n: i32) -> Result<Measurement, MeasureError> {
        let measure = self.measure.root(n)?;
        Ok(Self::new(measure, self.reading.root(n)?))
    }

    /// Sum of two measurements of the same measure.
    pub fn add<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Measurement, MeasureError> {
        let other = self.coalesce(other.into())?;
        self.with_arbitrary(self.arbitrary()? + other.arbitrary()?)
    }

    /// Difference of two measurements of the same measure.
    pub fn sub<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Measurement, MeasureError> {
        let other = self.coalesce(other.into())?;
        self.with_arbitrary(self.arbitrary()? - other.arbitrary()?)
    }

    /// How many `other` fit in `self`.
    pub fn ratio<'a>(&self, other: impl Into<Operand<'a>>) -> Result<f64, MeasureError> {
        let other = self.coalesce(other.into())?;
        Ok(self.arbitrary()? / other.arbitrary()?)
    }

    /// Order two measurements of the same measure.
    pub fn compare<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Ordering, MeasureError> {
        let other = self.coalesce(other.into())?;
        let (a, b) = (self.arbitrary()?, other.arbitrary()?);
        a.partial_cmp(&b)
            .ok_or_else(|| MeasureError::NotSupported(format!("cannot order {a} and {b}")))
    }

    /// Whether `other` is within `tolerance` of `self`.
    pub fn approx_eq<'a, 'b>(
        &self,
        other: impl Into<Operand<'a>>,
        tolerance: impl Into<Operand<'b>>,
    ) -> Result<bool, MeasureError> {
        let other = self.coalesce(other.into())?;
        let tolerance = self.coalesce(tolerance.into())?.arbitrary()?.abs();
        Ok((self.arbitrary()? - other.arbitrary()?).abs() <= tolerance)
    }

    /// Round to the nearest multiple of `step`. Ties go to even.
    pub fn round_to<'a>(&self, step: impl Into<Operand<'a>>) -> Result<Measurement, MeasureError> {
        let step = self.coalesce(step.into())?.arbitrary()?;
        self.with_arbitrary(round_to_step(self.arbitrary()?, step)?)
    }

    /// The absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self::new(self.measure.clone(), self.reading.map_amount(f64::abs))
    }

    /// Render with the `[decimal:][unit][|label]` mini-language.
    pub fn format(&self, spec: &str) -> Result<String, MeasureError> {
        let spec = FormatSpec::parse(spec)?;
        spec.render(self.measure.native_unit(), |unit| self.get(unit))
    }
}

/// `value` rounded to the nearest multiple of `step`.
pub(crate) fn round_to_step(value: f64, step: f64) -> Result<f64, MeasureError> {
    let rounded = step * (value / step).round_ties_even();
    if step == 0.0 || !rounded.is_finite() {
        return Err(MeasureError::NotSupported(format!(
            "cannot round {value} to a step of {step}"
        )));
    }
    Ok(rounded)
}

impl Mul<f64> for &Measurement {
    type Output = Measurement;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

impl Mul<&Measurement> for f64 {
    type Output = Measurement;

    fn mul(self, rhs: &Measurement) -> Self::Output {
        rhs.scale(self)
    }
}

impl Div<f64> for &Measurement {
    type Output = Measurement;

    fn div(self, rhs: f64) -> Self::Output {
        Measurement::new(self.measure.clone(), self.reading.map_amount(|a| a / rhs))
    }
}

impl Neg for Measurement {
    type Output = Measurement;

    fn neg(self) -> Self::Output {
        Self::new(self.measure, self.reading.map_amount(|a| -a))
    }
}

impl PartialEq for Measurement {
    fn eq(&self, other: &Self) -> bool {
        self.measure == other.measure
            && matches!(
                (self.arbitrary(), other.arbitrary()),
                (Ok(a), Ok(b)) if a == b
            )
    }
}

impl Eq for Measurement {}

impl Hash for Measurement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.measure.hash(state);
        if let Ok(value) = self.arbitrary() {
            // +0.0 and -0.0 compare equal.
            (value + 0.0).to_bits().hash(state);
        }
    }
}

impl fmt::Display for Measurement {
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
