//! # Linear Measures and Ladders
//!
//! A linear measure is a dimension whose units do not share a zero, such as
//! temperature. Every unit is a `Ladder`, an affine map onto the arbitrary
//! axis:
//!
//! ```text
//! to_arb(v)   = (v + offset) * scale
//! from_arb(v) = v / scale - offset
//! ```
//!
//! The measure has two views over one ladder table:
//! - the delta view (`Measure::LinearDelta`) reads only `scale`, since an
//!   interval has no position;
//! - the absolute view (`AggregateMeasure::Linear`) applies the full map.

use crate::aggregate::AggregateMeasure;
use crate::constants::MAX_ALIAS_DEPTH;
use crate::grammar::split_amount;
use crate::measure::Measure;
use crate::registry::RegistryShared;
use crate::util::is_close;
use crate::{MeasureError, MeasureId, Unit};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

// =============================================================================
// LADDER
// =============================================================================

/// An affine transform between a unit's own axis and the arbitrary axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ladder {
    /// Arbitrary units per step of this ladder.
    pub scale: f64,
    /// Steps to add before scaling.
    pub offset: f64,
}

impl Ladder {
    /// Create a ladder from its coefficients.
    #[must_use]
    pub const fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    /// The identity ladder (scale 1, offset 0).
    #[must_use]
    pub const fn arbitrary() -> Self {
        Self::new(1.0, 0.0)
    }

    /// Convert a value on this ladder to arbitrary units.
    #[must_use]
    pub fn to_arb(&self, value: f64) -> f64 {
        (value + self.offset) * self.scale
    }

    /// Convert a value in arbitrary units to this ladder.
    #[must_use]
    pub fn from_arb(&self, value: f64) -> f64 {
        value / self.scale - self.offset
    }

    /// Calibrate a ladder from two points.
    ///
    /// `this` holds two values on the new ladder, `other` the same two points
    /// on `reference` (or on the arbitrary axis when `reference` is `None`).
    /// The second point must round-trip through the result.
    pub fn from_points(
        this: (f64, f64),
        other: (f64, f64),
        reference: Option<&Ladder>,
    ) -> Result<Self, MeasureError> {
        let other = match reference {
            Some(r) => (r.to_arb(other.0), r.to_arb(other.1)),
            None => other,
        };

        let span = this.0 - this.1;
        if span == 0.0 || !span.is_finite() {
            return Err(MeasureError::Calibration(format!(
                "calibration points {} and {} coincide",
                this.0, this.1
            )));
        }
        let scale = (other.0 - other.1) / span;
        if scale == 0.0 || !scale.is_finite() {
            return Err(MeasureError::Calibration(format!(
                "reference points {} and {} coincide",
                other.0, other.1
            )));
        }
        let offset = other.0 / scale - this.0;
        let ladder = Self { scale, offset };

        // Tolerance follows the magnitude of the calibration points.
        let check = ladder.from_arb(other.1);
        let magnitude = this.0.abs().max(this.1.abs()).max(1.0);
        if !is_close(check / magnitude, this.1 / magnitude) {
            return Err(MeasureError::Calibration(format!(
                "point {} maps back to {check}",
                this.1
            )));
        }
        tracing::debug!(scale, offset, "ladder calibrated");
        Ok(ladder)
    }
}

impl Default for Ladder {
    fn default() -> Self {
        Self::arbitrary()
    }
}

impl Unit for Ladder {
    fn to_arbitrary(&self, value: f64) -> f64 {
        self.to_arb(value)
    }

    fn from_arbitrary(&self, value: f64) -> f64 {
        self.from_arb(value)
    }
}

/// A ladder table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LadderDef {
    /// A calibrated ladder.
    Ladder(Ladder),
    /// The name of another ladder of the same measure.
    Alias(String),
}

impl From<Ladder> for LadderDef {
    fn from(value: Ladder) -> Self {
        Self::Ladder(value)
    }
}

impl From<&str> for LadderDef {
    fn from(value: &str) -> Self {
        Self::Alias(value.to_string())
    }
}

impl From<String> for LadderDef {
    fn from(value: String) -> Self {
        Self::Alias(value)
    }
}

// =============================================================================
// LINEAR MEASURE
// =============================================================================

#[derive(Debug, Default)]
struct LadderTable {
    ladders: BTreeMap<String, LadderDef>,
    native: Option<String>,
    frozen: bool,
}

struct LinearInner {
    id: MeasureId,
    name: String,
    registry: Weak<RegistryShared>,
    table: RwLock<LadderTable>,
}

/// Handle to an affine dimension with named ladders.
#[derive(Clone)]
pub struct LinearMeasure {
    inner: Arc<LinearInner>,
}

impl LinearMeasure {
    pub(crate) fn new(id: MeasureId, name: impl Into<String>, registry: Weak<RegistryShared>) -> Self {
        Self {
            inner: Arc::new(LinearInner {
                id,
                name: name.into(),
                registry,
                table: RwLock::new(LadderTable::default()),
            }),
        }
    }

    /// The measure id, shared by the delta view.
    #[must_use]
    pub fn id(&self) -> MeasureId {
        self.inner.id
    }

    /// The measure name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn registry(&self) -> &Weak<RegistryShared> {
        &self.inner.registry
    }

    /// Add a ladder or an alias. The first entry becomes the native unit.
    pub fn set_ladder(
        &self,
        name: impl Into<String>,
        def: impl Into<LadderDef>,
    ) -> Result<(), MeasureError> {
        let name = name.into();
        let mut table = self.inner.table.write();
        if table.frozen {
            return Err(MeasureError::Frozen(self.inner.name.clone()));
        }
        if table.native.is_none() {
            table.native = Some(name.clone());
        }
        table.ladders.insert(name, def.into());
        Ok(())
    }

    /// Make an already defined ladder the native unit.
    pub fn set_native_unit(&self, name: &str) -> Result<(), MeasureError> {
        let mut table = self.inner.table.write();
        if table.frozen {
            return Err(MeasureError::Frozen(self.inner.name.clone()));
        }
        if !table.ladders.contains_key(name) {
            return Err(MeasureError::UnknownUnit(name.to_string()));
        }
        table.native = Some(name.to_string());
        Ok(())
    }

    /// Calibrate and add a ladder.
    ///
    /// `reference` names a ladder of this measure the `other` points are
    /// given on; `None` means the arbitrary axis.
    pub fn add_ladder(
        &self,
        name: impl Into<String>,
        this: (f64, f64),
        other: (f64, f64),
        reference: Option<&str>,
    ) -> Result<Ladder, MeasureError> {
        let reference = reference.map(|r| self.ladder(r)).transpose()?;
        let ladder = Ladder::from_points(this, other, reference.as_ref())?;
        self.set_ladder(name, ladder)?;
        Ok(ladder)
    }

    /// Resolve a ladder name, following aliases.
    pub fn ladder(&self, name: &str) -> Result<Ladder, MeasureError> {
        let mut current = name.to_string();
        for _ in 0..=MAX_ALIAS_DEPTH {
            let def = self
                .inner
                .table
                .read()
                .ladders
                .get(&current)
                .cloned()
                .ok_or_else(|| MeasureError::UnknownUnit(current.clone()))?;
            match def {
                LadderDef::Ladder(ladder) => return Ok(ladder),
                LadderDef::Alias(target) => current = target,
            }
        }
        Err(MeasureError::AliasDepth(name.to_string()))
    }

    /// Whether the unit (optionally amount-prefixed) names a ladder.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        match split_amount(unit) {
            Ok(Some((_, rest))) => self.contains(rest),
            Ok(None) => self.inner.table.read().ladders.contains_key(unit),
            Err(_) => false,
        }
    }

    /// The first-declared ladder.
    #[must_use]
    pub fn native_unit(&self) -> Option<String> {
        self.inner.table.read().native.clone()
    }

    /// All ladder names, sorted.
    #[must_use]
    pub fn ladders(&self) -> Vec<String> {
        self.inner.table.read().ladders.keys().cloned().collect()
    }

    /// Replace aliases by the ladders they name and freeze the table.
    pub fn optimize_aliases(&self) -> Result<(), MeasureError> {
        let pending: Vec<String> = self
            .inner
            .table
            .read()
            .ladders
            .iter()
            .filter(|(_, def)| matches!(def, LadderDef::Alias(_)))
            .map(|(name, _)| name.clone())
            .collect();

        let mut resolved = Vec::with_capacity(pending.len());
        for name in pending {
            let ladder = self.ladder(&name)?;
            resolved.push((name, ladder));
        }

        let count = resolved.len();
        let mut table = self.inner.table.write();
        for (name, ladder) in resolved {
            table.ladders.insert(name, LadderDef::Ladder(ladder));
        }
        table.frozen = true;
        tracing::trace!(measure = %self.inner.name, resolved = count, "ladder aliases optimized");
        Ok(())
    }

    /// The delta coefficient of a unit: the ladder scale, offset ignored.
    pub fn delta_lookup(&self, unit: &str) -> Result<f64, MeasureError> {
        if let Some((amount, rest)) = split_amount(unit)? {
            return Ok(amount * self.delta_lookup(rest)?);
        }
        Ok(self.ladder(unit)?.scale)
    }

    /// The delta (interval) view.
    #[must_use]
    pub fn delta(&self) -> Measure {
        Measure::LinearDelta(self.clone())
    }

    /// The absolute (point) view.
    #[must_use]
    pub fn absolute(&self) -> AggregateMeasure {
        AggregateMeasure::Linear(self.clone())
    }
}

impl fmt::Debug for LinearMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearMeasure")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for LinearMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl PartialEq for LinearMeasure {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for LinearMeasure {}

impl PartialOrd for LinearMeasure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LinearMeasure {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.id.cmp(&other.inner.id)
    }
}

impl Hash for LinearMeasure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

// =============================================================================
// TESTS
// =============================================================================
