//! # Dynamic Measures
//!
//! A dynamic measure is a basic measure whose unit table stays editable after
//! measurements of it exist. Its measurements do not resolve to an arbitrary
//! amount on creation. They keep the units they were created in and re-read
//! the live coefficients on every access.
//!
//! ## Decompositions
//!
//! Any unit string of any measure decomposes into
//! `factor * product(live_unit ** exponent)`: the fixed part is folded into
//! `factor`, and every unit owned by a dynamic measure stays symbolic. A
//! measure without dynamic primitives always decomposes to a bare factor.

use crate::basic::BasicMeasure;
use crate::constants::DEFAULT_AMOUNT;
use crate::grammar::split_amount_or;
use crate::registry::RegistryShared;
use crate::util::{add_maps, divide_map, real_root, scale_map, sub_maps};
use crate::{MeasureError, MeasureId, UnitDef};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Weak;

// =============================================================================
// DYNAMIC MEASURE
// =============================================================================

/// Handle to a live-updating atomic dimension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DynamicMeasure {
    basic: BasicMeasure,
}

impl DynamicMeasure {
    pub(crate) fn new(basic: BasicMeasure) -> Self {
        Self { basic }
    }

    /// The measure id.
    #[must_use]
    pub fn id(&self) -> MeasureId {
        self.basic.id()
    }

    /// The measure name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.basic.name()
    }

    /// The underlying unit table.
    #[must_use]
    pub fn basic(&self) -> &BasicMeasure {
        &self.basic
    }

    pub(crate) fn registry(&self) -> &Weak<RegistryShared> {
        self.basic.registry()
    }

    /// Assign or reassign a unit. Existing measurements see the change.
    pub fn set_unit(
        &self,
        name: impl Into<String>,
        def: impl Into<UnitDef>,
    ) -> Result<(), MeasureError> {
        self.basic.set_unit(name, def)
    }

    /// The current coefficient of a unit string.
    pub fn lookup(&self, unit: &str) -> Result<f64, MeasureError> {
        self.basic.lookup(unit)
    }

    /// Whether the unit (optionally amount-prefixed) is defined.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        self.basic.contains(unit)
    }

    /// The first-declared unit.
    #[must_use]
    pub fn native_unit(&self) -> Option<String> {
        self.basic.native_unit()
    }

    /// Resolve aliases to coefficients. The table stays editable.
    pub fn optimize_aliases(&self) -> Result<(), MeasureError> {
        self.basic.optimize_aliases()
    }

    /// Decompose a unit string, keeping the unit itself symbolic.
    pub fn decompose(&self, unit: &str) -> Result<Decomposition, MeasureError> {
        let (amount, rest) = split_amount_or(unit, DEFAULT_AMOUNT)?;
        if !self.basic.contains(rest) {
            return Err(MeasureError::UnknownUnit(rest.to_string()));
        }
        Ok(Decomposition::live(LiveUnit::new(self.clone(), rest)).scaled(amount))
    }
}

impl fmt::Display for DynamicMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.basic, f)
    }
}

// =============================================================================
// LIVE UNITS
// =============================================================================

/// A unit of a dynamic measure, resolved on every read.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LiveUnit {
    measure: DynamicMeasure,
    unit: String,
}

impl LiveUnit {
    /// Create a live reference to `unit` of `measure`.
    pub fn new(measure: DynamicMeasure, unit: impl Into<String>) -> Self {
        Self {
            measure,
            unit: unit.into(),
        }
    }

    /// The owning measure.
    #[must_use]
    pub fn measure(&self) -> &DynamicMeasure {
        &self.measure
    }

    /// The unit name.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The coefficient as of now.
    pub fn coefficient(&self) -> Result<f64, MeasureError> {
        self.measure.lookup(&self.unit)
    }
}

impl fmt::Display for LiveUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unit)
    }
}

/// Sparse map of live units to signed exponents.
pub type UnitExponents = BTreeMap<LiveUnit, i32>;

/// The product of the current coefficients of a unit-exponent map.
pub fn live_coefficient(units: &UnitExponents) -> Result<f64, MeasureError> {
    units.iter().try_fold(1.0, |acc, (unit, exponent)| {
        Ok(acc * unit.coefficient()?.powi(*exponent))
    })
}

// =============================================================================
// DECOMPOSITION
// =============================================================================

/// A unit string split into a fixed factor and live units.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Fixed part, in arbitrary units.
    pub factor: f64,
    /// Live part.
    pub units: UnitExponents,
}

impl Decomposition {
    /// A decomposition with no live part.
    #[must_use]
    pub fn fixed(factor: f64) -> Self {
        Self {
            factor,
            units: UnitExponents::new(),
        }
    }

    /// A single live unit.
    #[must_use]
    pub fn live(unit: LiveUnit) -> Self {
        Self {
            factor: 1.0,
            units: [(unit, 1)].into_iter().collect(),
        }
    }

    /// Whether any unit is resolved at read time.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.units.is_empty()
    }

    /// Multiply the fixed part.
    #[must_use]
    pub fn scaled(mut self, amount: f64) -> Self {
        self.factor *= amount;
        self
    }

    /// Raise to an integer power.
    pub fn powi(&self, exponent: i32) -> Result<Self, MeasureError> {
        Ok(Self {
            factor: self.factor.powi(exponent),
            units: scale_map(&self.units, exponent)?,
        })
    }

    /// Multiply two decompositions.
    pub fn combine(&self, other: &Self) -> Result<Self, MeasureError> {
        Ok(Self {
            factor: self.factor * other.factor,
            units: add_maps(&self.units, &other.units)?,
        })
    }

    /// The current value in arbitrary units.
    pub fn evaluate(&self) -> Result<f64, MeasureError> {
        Ok(self.factor * live_coefficient(&self.units)?)
    }
}

// =============================================================================
// READINGS
// =============================================================================

/// The amount carried by a measurement.
///
/// `Live` amounts are expressed in `units`; the arbitrary value is
/// `amount * live_coefficient(units)` as of the time of the read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reading {
    Arbitrary(f64),
    Live { amount: f64, units: UnitExponents },
}

impl Reading {
    pub(crate) fn new(amount: f64, decomposition: Decomposition) -> Self {
        Self::from_parts(amount * decomposition.factor, decomposition.units)
    }

    fn from_parts(amount: f64, units: UnitExponents) -> Self {
        if units.is_empty() {
            Self::Arbitrary(amount)
        } else {
            Self::Live { amount, units }
        }
    }

    pub(crate) fn arbitrary(&self) -> Result<f64, MeasureError> {
        match self {
            Self::Arbitrary(amount) => Ok(*amount),
            Self::Live { amount, units } => Ok(amount * live_coefficient(units)?),
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    pub(crate) fn units(&self) -> Option<&UnitExponents> {
        match self {
            Self::Arbitrary(_) => None,
            Self::Live { units, .. } => Some(units),
        }
    }

    /// Apply `f` to the stored amount, keeping the units.
    pub(crate) fn map_amount(&self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Self::Arbitrary(amount) => Self::Arbitrary(f(*amount)),
            Self::Live { amount, units } => Self::Live {
                amount: f(*amount),
                units: units.clone(),
            },
        }
    }

    /// The product of two readings.
    ///
    /// A plain operand folds its arbitrary amount into the factor and adds no
    /// live units, so the result stays live only in the dynamic operand's
    /// units. A plain operand is not read as one native unit of the live
    /// measure (DESIGN.md, decision 1).
    pub(crate) fn product(&self, other: &Self) -> Result<Self, MeasureError> {
        Ok(match (self, other) {
            (Self::Arbitrary(a), Self::Arbitrary(b)) => Self::Arbitrary(a * b),
            (Self::Live { amount, units }, Self::Arbitrary(k))
            | (Self::Arbitrary(k), Self::Live { amount, units }) => Self::Live {
                amount: amount * k,
                units: units.clone(),
            },
            (
                Self::Live { amount: a, units: u },
                Self::Live { amount: b, units: v },
            ) => Self::from_parts(a * b, add_maps(u, v)?),
        })
    }

    /// The quotient of two readings. Plain operands fold in as for `product`.
    pub(crate) fn quotient(&self, other: &Self) -> Result<Self, MeasureError> {
        Ok(match (self, other) {
            (Self::Arbitrary(a), Self::Arbitrary(b)) => Self::Arbitrary(a / b),
            (Self::Live { amount, units }, Self::Arbitrary(k)) => Self::Live {
                amount: amount / k,
                units: units.clone(),
            },
            (Self::Arbitrary(k), Self::Live { amount, units }) => {
                Self::from_parts(k / amount, scale_map(units, -1)?)
            }
            (
                Self::Live { amount: a, units: u },
                Self::Live { amount: b, units: v },
            ) => Self::from_parts(a / b, sub_maps(u, v)?),
        })
    }

    pub(crate) fn powi(&self, exponent: i32) -> Result<Self, MeasureError> {
        Ok(match self {
            Self::Arbitrary(amount) => Self::Arbitrary(amount.powi(exponent)),
            Self::Live { amount, units } => {
                Self::from_parts(amount.powi(exponent), scale_map(units, exponent)?)
            }
        })
    }

    /// The real n-th root. Live units that do not divide evenly are
    /// collapsed to their current arbitrary value.
    pub(crate) fn root(&self, n: i32) -> Result<Self, MeasureError> {
        match self {
            Self::Arbitrary(amount) => Ok(Self::Arbitrary(real_root(*amount, n))),
            Self::Live { amount, units } => match divide_map(units, n) {
                Some(units) => Ok(Self::from_parts(real_root(*amount, n), units)),
                None => Ok(Self::Arbitrary(real_root(self.arbitrary()?, n))),
            },
        }
    }

    /// A reading of the same shape holding `arbitrary` arbitrary units.
    pub(crate) fn with_arbitrary(&self, arbitrary: f64) -> Result<Self, MeasureError> {
        match self {
            Self::Arbitrary(_) => Ok(Self::Arbitrary(arbitrary)),
            Self::Live { units, .. } => Ok(Self::Live {
                amount: arbitrary / live_coefficient(units)?,
                units: units.clone(),
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
