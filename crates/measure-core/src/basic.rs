//! # Basic Measures
//!
//! An atomic dimension holding a named-unit table.
//!
//! The table goes through two phases:
//! 1. Configuration: units are assigned as coefficients, aliases, or scaled
//!    aliases, in any order.
//! 2. `optimize_aliases`: every entry is replaced by its fully resolved
//!    coefficient and the table is frozen. Lookups no longer chase aliases.
//!
//! Live (dynamic) tables resolve their aliases too but never freeze, since
//! editing coefficients after measurements exist is their whole point.

use crate::constants::MAX_ALIAS_DEPTH;
use crate::grammar::split_amount;
use crate::registry::RegistryShared;
use crate::{MeasureError, MeasureId, UnitDef};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Unit table: name -> definition, plus the first-declared (native) unit.
#[derive(Debug, Default)]
struct UnitTable {
    units: BTreeMap<String, UnitDef>,
    native: Option<String>,
    frozen: bool,
}

struct BasicInner {
    id: MeasureId,
    name: String,
    live: bool,
    registry: Weak<RegistryShared>,
    table: RwLock<UnitTable>,
}

/// Handle to an atomic dimension. Cloning shares the same measure.
#[derive(Clone)]
pub struct BasicMeasure {
    inner: Arc<BasicInner>,
}

impl BasicMeasure {
    pub(crate) fn new(
        id: MeasureId,
        name: impl Into<String>,
        live: bool,
        registry: Weak<RegistryShared>,
    ) -> Self {
        Self {
            inner: Arc::new(BasicInner {
                id,
                name: name.into(),
                live,
                registry,
                table: RwLock::new(UnitTable::default()),
            }),
        }
    }

    /// The measure id.
    #[must_use]
    pub fn id(&self) -> MeasureId {
        self.inner.id
    }

    /// The measure name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the unit table stays mutable after optimization.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.live
    }

    /// Whether the unit table has been frozen by `optimize_aliases`.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.inner.table.read().frozen
    }

    pub(crate) fn registry(&self) -> &Weak<RegistryShared> {
        &self.inner.registry
    }

    /// Assign a unit. The first unit ever assigned becomes the native unit.
    pub fn set_unit(
        &self,
        name: impl Into<String>,
        def: impl Into<UnitDef>,
    ) -> Result<(), MeasureError> {
        let name = name.into();
        let mut table = self.inner.table.write();
        if table.frozen {
            return Err(MeasureError::Frozen(self.inner.name.clone()));
        }
        if table.native.is_none() {
            table.native = Some(name.clone());
        }
        table.units.insert(name, def.into());
        Ok(())
    }

    /// Make an already defined unit the native unit.
    pub fn set_native_unit(&self, name: &str) -> Result<(), MeasureError> {
        let mut table = self.inner.table.write();
        if table.frozen {
            return Err(MeasureError::Frozen(self.inner.name.clone()));
        }
        if !table.units.contains_key(name) {
            return Err(MeasureError::UnknownUnit(name.to_string()));
        }
        table.native = Some(name.to_string());
        Ok(())
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

    /// The coefficient of a unit string, in arbitrary units.
    ///
    /// Accepts a leading amount: `lookup("3 km") == 3.0 * lookup("km")`.
    pub fn lookup(&self, unit: &str) -> Result<f64, MeasureError> {
        self.lookup_at(unit, 0)
    }

    fn lookup_at(&self, unit: &str, depth: usize) -> Result<f64, MeasureError> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(MeasureError::AliasDepth(unit.to_string()));
        }
        if let Some((amount, rest)) = split_amount(unit)? {
            return Ok(amount * self.lookup_at(rest, depth + 1)?);
        }

        // Clone out of the lock before recursing.
        let def = self
            .inner
            .table
            .read()
            .units
            .get(unit)
            .cloned()
            .ok_or_else(|| MeasureError::UnknownUnit(unit.to_string()))?;

        match def {
            UnitDef::Coefficient(c) => Ok(c),
            UnitDef::Alias(target) => self.lookup_at(&target, depth + 1),
            UnitDef::Scaled(factor, target) => Ok(factor * self.lookup_at(&target, depth + 1)?),
        }
    }

    /// Whether the unit (optionally amount-prefixed) is defined.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        match split_amount(unit) {
            Ok(Some((_, rest))) => self.contains(rest),
            Ok(None) => self.inner.table.read().units.contains_key(unit),
            Err(_) => false,
        }
    }

    /// The first-declared unit.
    #[must_use]
    pub fn native_unit(&self) -> Option<String> {
        self.inner.table.read().native.clone()
    }

    /// All unit names, sorted.
    #[must_use]
    pub fn units(&self) -> Vec<String> {
        self.inner.table.read().units.keys().cloned().collect()
    }

    /// The raw definition of a unit.
    #[must_use]
    pub fn definition(&self, unit: &str) -> Option<UnitDef> {
        self.inner.table.read().units.get(unit).cloned()
    }

    /// Replace every alias by its resolved coefficient.
    ///
    /// Static tables are frozen afterwards.
    pub fn optimize_aliases(&self) -> Result<(), MeasureError> {
        let pending: Vec<String> = self
            .inner
            .table
            .read()
            .units
            .iter()
            .filter(|(_, def)| !def.is_resolved())
            .map(|(name, _)| name.clone())
            .collect();

        let mut resolved = Vec::with_capacity(pending.len());
        for name in pending {
            let coefficient = self.lookup(&name)?;
            resolved.push((name, coefficient));
        }

        let mut table = self.inner.table.write();
        let count = resolved.len();
        for (name, coefficient) in resolved {
            table.units.insert(name, UnitDef::Coefficient(coefficient));
        }
        if !self.inner.live {
            table.frozen = true;
        }
        tracing::trace!(measure = %self.inner.name, resolved = count, "aliases optimized");
        Ok(())
    }
}

impl fmt::Debug for BasicMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicMeasure")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("live", &self.inner.live)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for BasicMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl PartialEq for BasicMeasure {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for BasicMeasure {}

impl PartialOrd for BasicMeasure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BasicMeasure {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.id.cmp(&other.inner.id)
    }
}

impl Hash for BasicMeasure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

// =============================================================================
// TESTS
// =============================================================================
