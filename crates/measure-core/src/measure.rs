//! # Measures
//!
//! The closed family of measure variants and the measure algebra.
//!
//! ## Variants
//!
//! | Variant          | Primitive map                | Units                        |
//! |------------------|------------------------------|------------------------------|
//! | `Scalar`         | empty                        | bare numbers                 |
//! | `Basic`          | `{self: 1}`                  | unit table                   |
//! | `Derived`        | interned compound map        | composite grammar + aliases  |
//! | `LinearDelta`    | `{self: 1}`                  | ladder scales                |
//! | `DynamicBasic`   | `{self: 1}`                  | live unit table              |
//! | `DynamicDerived` | compound map with a live one | composite grammar, live      |
//!
//! ## Algebra
//!
//! `mul`, `div`, `pow` and `root` merge primitive maps and hand the result to
//! the owning registry, which returns the canonical measure. Equality is by
//! id, so `a.div(&b)?.div(&b)? == a.div(&b.pow(2)?)?` holds by identity.

use crate::aggregate::AggregateMeasure;
use crate::basic::BasicMeasure;
use crate::constants::DEFAULT_AMOUNT;
use crate::derived::DerivedMeasure;
use crate::dynamic::{Decomposition, DynamicMeasure, Reading};
use crate::grammar::split_amount;
use crate::linear::LinearMeasure;
use crate::measurement::Measurement;
use crate::registry::RegistryShared;
use crate::util::{Exponent, add_maps, classify_exponent, divide_map, scale_map, sub_maps};
use crate::{MeasureError, MeasureId, UnitDef};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

// =============================================================================
// PRIMITIVES
// =============================================================================

/// An atomic dimension that can appear in a primitive-exponent map.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// A basic measure.
    Basic(BasicMeasure),
    /// A dynamic measure.
    Dynamic(DynamicMeasure),
    /// The delta view of a linear measure.
    LinearDelta(LinearMeasure),
}

impl Primitive {
    /// The measure id.
    #[must_use]
    pub fn id(&self) -> MeasureId {
        match self {
            Self::Basic(b) => b.id(),
            Self::Dynamic(d) => d.id(),
            Self::LinearDelta(l) => l.id(),
        }
    }

    pub(crate) fn registry(&self) -> &Weak<RegistryShared> {
        match self {
            Self::Basic(b) => b.registry(),
            Self::Dynamic(d) => d.registry(),
            Self::LinearDelta(l) => l.registry(),
        }
    }

    /// Whether the primitive resolves its units at read time.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }

    /// Whether the unit (optionally amount-prefixed) is defined.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        match self {
            Self::Basic(b) => b.contains(unit),
            Self::Dynamic(d) => d.contains(unit),
            Self::LinearDelta(l) => l.contains(unit),
        }
    }

    /// The first-declared unit.
    #[must_use]
    pub fn native_unit(&self) -> Option<String> {
        match self {
            Self::Basic(b) => b.native_unit(),
            Self::Dynamic(d) => d.native_unit(),
            Self::LinearDelta(l) => l.native_unit(),
        }
    }

    /// Decompose a unit of this primitive.
    pub fn decompose(&self, unit: &str) -> Result<Decomposition, MeasureError> {
        match self {
            Self::Basic(b) => b.lookup(unit).map(Decomposition::fixed),
            Self::Dynamic(d) => d.decompose(unit),
            Self::LinearDelta(l) => l.delta_lookup(unit).map(Decomposition::fixed),
        }
    }

    /// The primitive as a standalone measure.
    #[must_use]
    pub fn to_measure(&self) -> Measure {
        match self {
            Self::Basic(b) => Measure::Basic(b.clone()),
            Self::Dynamic(d) => Measure::DynamicBasic(d.clone()),
            Self::LinearDelta(l) => Measure::LinearDelta(l.clone()),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(b) => write!(f, "{b}"),
            Self::Dynamic(d) => write!(f, "{d}"),
            Self::LinearDelta(l) => write!(f, "{}_delta", l.name()),
        }
    }
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Primitive {}

impl PartialOrd for Primitive {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Primitive {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl Hash for Primitive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

// =============================================================================
// MEASURE
// =============================================================================

/// A dimension: the closed set of measure variants.
///
/// Cloning is cheap; every variant is a shared handle.
#[derive(Debug, Clone)]
pub enum Measure {
    /// The dimensionless measure.
    Scalar,
    /// An atomic dimension.
    Basic(BasicMeasure),
    /// A canonical compound dimension.
    Derived(DerivedMeasure),
    /// The delta (interval) view of a linear measure.
    LinearDelta(LinearMeasure),
    /// An atomic dimension with live coefficients.
    DynamicBasic(DynamicMeasure),
    /// A compound dimension with at least one live primitive.
    DynamicDerived(DerivedMeasure),
}

impl Measure {
    /// The measure id. The scalar measure has none.
    #[must_use]
    pub fn id(&self) -> Option<MeasureId> {
        match self {
            Self::Scalar => None,
            Self::Basic(b) => Some(b.id()),
            Self::Derived(d) | Self::DynamicDerived(d) => Some(d.id()),
            Self::LinearDelta(l) => Some(l.id()),
            Self::DynamicBasic(d) => Some(d.id()),
        }
    }

    /// Check if this is the dimensionless measure.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar)
    }

    /// Whether measurements of this measure re-read coefficients on access.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::DynamicBasic(_) | Self::DynamicDerived(_))
    }

    /// The primitive-exponent factorization.
    #[must_use]
    pub fn primitives(&self) -> Cow<'_, BTreeMap<Primitive, i32>> {
        match self {
            Self::Derived(d) | Self::DynamicDerived(d) => Cow::Borrowed(d.primitives()),
            _ => Cow::Owned(self.as_primitive().into_iter().map(|p| (p, 1)).collect()),
        }
    }

    /// The measure as a primitive, if it is one.
    #[must_use]
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Self::Basic(b) => Some(Primitive::Basic(b.clone())),
            Self::DynamicBasic(d) => Some(Primitive::Dynamic(d.clone())),
            Self::LinearDelta(l) => Some(Primitive::LinearDelta(l.clone())),
            Self::Scalar | Self::Derived(_) | Self::DynamicDerived(_) => None,
        }
    }

    /// The default unit used when a measurement carries none.
    ///
    /// Compound measures render the native units of their primitives.
    #[must_use]
    pub fn native_unit(&self) -> Option<String> {
        match self {
            Self::Scalar => None,
            Self::Basic(b) => b.native_unit(),
            Self::Derived(d) | Self::DynamicDerived(d) => d.native_unit(false),
            Self::LinearDelta(l) => l.native_unit(),
            Self::DynamicBasic(d) => d.native_unit(),
        }
    }

    // =========================================================================
    // UNIT RESOLUTION
    // =========================================================================

    /// Split a unit string into a fixed factor and live units.
    pub fn decompose(&self, unit: &str) -> Result<Decomposition, MeasureError> {
        match self {
            Self::Scalar => scalar_factor(unit).map(Decomposition::fixed),
            Self::Basic(b) => b.lookup(unit).map(Decomposition::fixed),
            Self::Derived(d) | Self::DynamicDerived(d) => d.decompose(unit),
            Self::LinearDelta(l) => l.delta_lookup(unit).map(Decomposition::fixed),
            Self::DynamicBasic(d) => d.decompose(unit),
        }
    }

    /// Decompose "this many of each primitive's native unit".
    ///
    /// The map must be exactly this measure's factorization.
    pub fn decompose_exponents(
        &self,
        exponents: &BTreeMap<Primitive, i32>,
    ) -> Result<Decomposition, MeasureError> {
        let requested: BTreeMap<Primitive, i32> = exponents
            .iter()
            .filter(|(_, n)| **n != 0)
            .map(|(p, n)| (p.clone(), *n))
            .collect();
        if requested != *self.primitives() {
            return Err(MeasureError::Mismatch {
                left: self.to_string(),
                right: render_exponents(&requested),
            });
        }

        requested
            .iter()
            .try_fold(Decomposition::fixed(1.0), |acc, (primitive, exponent)| {
                let native = primitive
                    .native_unit()
                    .ok_or_else(|| MeasureError::UnknownUnit(format!("native unit of {primitive}")))?;
                acc.combine(&primitive.decompose(&native)?.powi(*exponent)?)
            })
    }

    /// The current coefficient of a unit string, in arbitrary units.
    pub fn lookup(&self, unit: &str) -> Result<f64, MeasureError> {
        self.decompose(unit)?.evaluate()
    }

    /// Check a unit string without converting.
    ///
    /// The error carries the cause: a parse failure, an unknown unit name, or
    /// an unassigned primitive.
    pub fn check_unit(&self, unit: &str) -> Result<(), MeasureError> {
        self.decompose(unit).map(drop)
    }

    /// Whether the unit string is understood by this measure.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        self.check_unit(unit).is_ok()
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// Assign a unit (basic measures) or an alias (compound measures).
    pub fn set_unit(
        &self,
        name: impl Into<String>,
        def: impl Into<UnitDef>,
    ) -> Result<(), MeasureError> {
        match self {
            Self::Basic(b) => b.set_unit(name, def),
            Self::DynamicBasic(d) => d.set_unit(name, def),
            Self::Derived(d) | Self::DynamicDerived(d) => {
                d.set_alias(name, def);
                Ok(())
            }
            Self::LinearDelta(l) => Err(MeasureError::NotSupported(format!(
                "units of {} are ladders of the linear measure",
                l.name()
            ))),
            Self::Scalar => Err(MeasureError::NotSupported(
                "the scalar measure has no units".to_string(),
            )),
        }
    }

    /// Assign several units in iteration order.
    pub fn update<I, K, V>(&self, units: I) -> Result<&Self, MeasureError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<UnitDef>,
    {
        for (name, def) in units {
            self.set_unit(name, def)?;
        }
        Ok(self)
    }

    /// Make an already defined unit the native unit of an atomic measure.
    pub fn set_native_unit(&self, name: &str) -> Result<(), MeasureError> {
        match self {
            Self::Basic(b) => b.set_native_unit(name),
            Self::DynamicBasic(d) => d.basic().set_native_unit(name),
            Self::LinearDelta(l) => l.set_native_unit(name),
            _ => Err(MeasureError::NotSupported(format!(
                "the native unit of {self} follows from its primitives"
            ))),
        }
    }

    /// Resolve every alias to a coefficient. Static unit tables freeze.
    pub fn optimize_aliases(&self) -> Result<(), MeasureError> {
        match self {
            Self::Scalar => Ok(()),
            Self::Basic(b) => b.optimize_aliases(),
            Self::DynamicBasic(d) => d.optimize_aliases(),
            Self::Derived(d) | Self::DynamicDerived(d) => d.optimize_aliases(),
            Self::LinearDelta(l) => l.optimize_aliases(),
        }
    }

    /// Give a compound measure a display name.
    pub fn set_name(&self, name: impl Into<String>) -> Result<(), MeasureError> {
        match self {
            Self::Derived(d) | Self::DynamicDerived(d) => {
                d.set_name(name);
                Ok(())
            }
            _ => Err(MeasureError::NotSupported(format!(
                "{self} is named at creation"
            ))),
        }
    }

    // =========================================================================
    // ALGEBRA
    // =========================================================================

    /// The product of two measures.
    pub fn mul(&self, other: &Measure) -> Result<Measure, MeasureError> {
        let registry = shared_registry(&[self, other])?;
        Ok(canonical(
            registry,
            add_maps(&self.primitives(), &other.primitives())?,
        ))
    }

    /// The quotient of two measures.
    pub fn div(&self, other: &Measure) -> Result<Measure, MeasureError> {
        let registry = shared_registry(&[self, other])?;
        Ok(canonical(
            registry,
            sub_maps(&self.primitives(), &other.primitives())?,
        ))
    }

    /// `Scalar / self`.
    pub fn inverse(&self) -> Result<Measure, MeasureError> {
        self.pow(-1)
    }

    /// Raise to an integer power. Power 0 is the scalar measure.
    pub fn pow(&self, exponent: i32) -> Result<Measure, MeasureError> {
        match exponent {
            0 => Ok(Self::Scalar),
            1 => Ok(self.clone()),
            _ => {
                let registry = shared_registry(&[self])?;
                Ok(canonical(registry, scale_map(&self.primitives(), exponent)?))
            }
        }
    }

    /// Raise to a real power.
    ///
    /// Integer powers go to `pow`, reciprocals of integers go to `root`.
    pub fn powf(&self, power: f64) -> Result<Measure, MeasureError> {
        match classify_exponent(power) {
            Some(Exponent::Power(n)) => self.pow(n),
            Some(Exponent::Root(n)) => self.root(n),
            None => Err(MeasureError::NotSupported(format!(
                "cannot raise {self} to the power {power}"
            ))),
        }
    }

    /// The n-th root. Every exponent must be divisible by `n`.
    pub fn root(&self, n: i32) -> Result<Measure, MeasureError> {
        if n == 0 {
            return Err(MeasureError::NotSupported(format!(
                "cannot get the 0 root of {self}"
            )));
        }
        let divided =
            divide_map(&self.primitives(), n).ok_or_else(|| MeasureError::RootDomain {
                root: n,
                measure: self.to_string(),
            })?;
        let registry = shared_registry(&[self])?;
        Ok(canonical(registry, divided))
    }

    // =========================================================================
    // MEASUREMENTS
    // =========================================================================

    /// A measurement of `amount` times `unit`.
    pub fn measurement(&self, amount: f64, unit: &str) -> Result<Measurement, MeasureError> {
        let decomposition = self.decompose(unit)?;
        Ok(Measurement::new(
            self.clone(),
            Reading::new(amount, decomposition),
        ))
    }

    /// A measurement from an optionally amount-prefixed unit string.
    ///
    /// `"3.5 km"` is 3.5 kilometers, `"km"` is one.
    pub fn parse(&self, text: &str) -> Result<Measurement, MeasureError> {
        self.measurement(DEFAULT_AMOUNT, text)
    }

    /// A one-unit measurement of a unit name.
    pub fn unit(&self, name: &str) -> Result<Measurement, MeasureError> {
        if split_amount(name)?.is_some() {
            return Err(MeasureError::Parse(name.to_string()));
        }
        self.measurement(1.0, name)
    }

    /// A measurement of an amount already in arbitrary units.
    #[must_use]
    pub fn from_arbitrary(&self, amount: f64) -> Measurement {
        Measurement::new(self.clone(), Reading::Arbitrary(amount))
    }

    /// The zero measurement.
    #[must_use]
    pub fn zero(&self) -> Measurement {
        self.from_arbitrary(0.0)
    }

    /// The absolute-point view of this measure.
    #[must_use]
    pub fn aggregate(&self) -> AggregateMeasure {
        match self {
            Self::LinearDelta(l) => AggregateMeasure::Linear(l.clone()),
            _ => AggregateMeasure::Basic(self.clone()),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Basic(b) => write!(f, "{b}"),
            Self::Derived(d) | Self::DynamicDerived(d) => write!(f, "{d}"),
            Self::LinearDelta(l) => write!(f, "{}_delta", l.name()),
            Self::DynamicBasic(d) => write!(f, "{d}"),
        }
    }
}

impl PartialEq for Measure {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Measure {}

impl Hash for Measure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// The registry shared by every primitive of the operands.
///
/// `None` when the operands have no primitives at all.
fn shared_registry(operands: &[&Measure]) -> Result<Option<Arc<RegistryShared>>, MeasureError> {
    let mut shared: Option<Arc<RegistryShared>> = None;
    for measure in operands {
        for primitive in measure.primitives().keys() {
            let registry = primitive
                .registry()
                .upgrade()
                .ok_or(MeasureError::RegistryDropped)?;
            match &shared {
                Some(existing) if !Arc::ptr_eq(existing, &registry) => {
                    return Err(MeasureError::ForeignRegistry);
                }
                Some(_) => {}
                None => shared = Some(registry),
            }
        }
    }
    Ok(shared)
}

fn canonical(registry: Option<Arc<RegistryShared>>, primitives: BTreeMap<Primitive, i32>) -> Measure {
    match registry {
        Some(registry) => registry.canonical(primitives),
        None => Measure::Scalar,
    }
}

/// Units of the scalar measure are plain numbers.
fn scalar_factor(unit: &str) -> Result<f64, MeasureError> {
    let trimmed = unit.trim();
    if trimmed.is_empty() || trimmed == "1" {
        return Ok(1.0);
    }
    if let Some((amount, rest)) = split_amount(trimmed)? {
        return Ok(amount * scalar_factor(rest)?);
    }
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| MeasureError::UnknownUnit(trimmed.to_string()))
}

fn render_exponents(exponents: &BTreeMap<Primitive, i32>) -> String {
    exponents
        .iter()
        .map(|(p, n)| if *n == 1 { p.to_string() } else { format!("{p}**{n}") })
        .collect::<Vec<_>>()
        .join(" * ")
}

// =============================================================================
// TESTS
// =============================================================================
