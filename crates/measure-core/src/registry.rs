//! # Measure Registry
//!
//! The registry is the single authority for measure identity.
//!
//! Primitive measures (basic, dynamic, linear) are created through it, and
//! every compound measure produced by measure algebra is interned in its
//! table: two primitive-exponent maps that are equal as sets of
//! `(primitive, exponent)` pairs always yield the same `DerivedMeasure`
//! instance, so "is this the same dimension" is an identity check.
//!
//! The table is append-only. Entries live as long as the registry does.

use crate::basic::BasicMeasure;
use crate::derived::DerivedMeasure;
use crate::dynamic::DynamicMeasure;
use crate::linear::LinearMeasure;
use crate::measure::{Measure, Primitive};
use crate::{MeasureError, MeasureId, UnitDef};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of measure ids. Ids are unique across registries so that measures
/// of two registries never compare equal.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn allocate_id() -> MeasureId {
    MeasureId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Canonical signature of a compound measure: its primitive ids and
/// exponents in id order.
type Signature = Vec<(MeasureId, i32)>;

/// State shared by a registry and (weakly) by every measure it created.
#[derive(Debug, Default)]
pub(crate) struct RegistryShared {
    /// Interned compound measures: Signature -> DerivedMeasure
    derived: Mutex<BTreeMap<Signature, DerivedMeasure>>,
}

impl RegistryShared {
    /// Produce the canonical measure for a primitive-exponent map.
    ///
    /// - An empty map is the scalar measure.
    /// - A single primitive with exponent 1 is that primitive.
    /// - Anything else is looked up, or inserted, under one lock.
    pub(crate) fn canonical(self: &Arc<Self>, primitives: BTreeMap<Primitive, i32>) -> Measure {
        if primitives.is_empty() {
            return Measure::Scalar;
        }
        if primitives.len() == 1 {
            if let Some((primitive, &1)) = primitives.iter().next() {
                return primitive.to_measure();
            }
        }

        let signature: Signature = primitives.iter().map(|(p, n)| (p.id(), *n)).collect();
        let mut table = self.derived.lock();
        if let Some(existing) = table.get(&signature) {
            return existing.to_measure();
        }

        let derived = DerivedMeasure::new(allocate_id(), primitives, Arc::downgrade(self));
        tracing::debug!(
            measure = %derived,
            id = derived.id().value(),
            interned = table.len() + 1,
            "interned compound measure"
        );
        table.insert(signature, derived.clone());
        derived.to_measure()
    }

    fn derived_count(&self) -> usize {
        self.derived.lock().len()
    }
}

// =============================================================================
// REGISTRY HANDLE
// =============================================================================

/// The context object owning measure identity.
///
/// Cloning the handle shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct MeasureRegistry {
    shared: Arc<RegistryShared>,
}

impl MeasureRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a basic (atomic) measure with an empty unit table.
    #[must_use]
    pub fn basic(&self, name: impl Into<String>) -> Measure {
        Measure::Basic(BasicMeasure::new(
            allocate_id(),
            name,
            false,
            Arc::downgrade(&self.shared),
        ))
    }

    /// Create a basic measure and assign its initial units in order.
    ///
    /// The first unit becomes the native unit.
    pub fn basic_with<I, K, V>(&self, name: impl Into<String>, units: I) -> Result<Measure, MeasureError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<UnitDef>,
    {
        let measure = self.basic(name);
        measure.update(units)?;
        Ok(measure)
    }

    /// Create a dynamic measure: its measurements remember the unit they were
    /// created in and re-read the unit table on every access.
    #[must_use]
    pub fn dynamic(&self, name: impl Into<String>) -> Measure {
        Measure::DynamicBasic(DynamicMeasure::new(BasicMeasure::new(
            allocate_id(),
            name,
            true,
            Arc::downgrade(&self.shared),
        )))
    }

    /// Create a dynamic measure and assign its initial units in order.
    pub fn dynamic_with<I, K, V>(
        &self,
        name: impl Into<String>,
        units: I,
    ) -> Result<Measure, MeasureError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<UnitDef>,
    {
        let measure = self.dynamic(name);
        measure.update(units)?;
        Ok(measure)
    }

    /// Create a linear (affine) measure with an empty ladder table.
    #[must_use]
    pub fn linear(&self, name: impl Into<String>) -> LinearMeasure {
        LinearMeasure::new(allocate_id(), name, Arc::downgrade(&self.shared))
    }

    /// The dimensionless measure.
    #[must_use]
    pub fn scalar(&self) -> Measure {
        Measure::Scalar
    }

    /// Build the canonical measure for an explicit primitive-exponent map.
    ///
    /// Zero exponents are dropped. Every primitive must belong to this
    /// registry.
    pub fn derive(&self, primitives: BTreeMap<Primitive, i32>) -> Result<Measure, MeasureError> {
        if primitives.keys().any(|p| !self.owns(p)) {
            return Err(MeasureError::ForeignRegistry);
        }
        let primitives = primitives.into_iter().filter(|(_, n)| *n != 0).collect();
        Ok(self.shared.canonical(primitives))
    }

    /// Check whether a measure was created by this registry.
    ///
    /// The scalar measure belongs to every registry.
    #[must_use]
    pub fn contains(&self, measure: &Measure) -> bool {
        measure.primitives().keys().all(|p| self.owns(p))
    }

    /// Number of interned compound measures.
    #[must_use]
    pub fn derived_count(&self) -> usize {
        self.shared.derived_count()
    }

    fn owns(&self, primitive: &Primitive) -> bool {
        std::ptr::eq(primitive.registry().as_ptr(), Arc::as_ptr(&self.shared))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_across_registries() {
        let a = MeasureRegistry::new().basic("a");
        let b = MeasureRegistry::new().basic("b");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn interning_returns_the_same_instance() {
        let registry = MeasureRegistry::new();
        let distance = registry.basic("distance");
        let duration = registry.basic("duration");

        let speed = distance.div(&duration).expect("div");
        let again = distance.div(&duration).expect("div");

        assert_eq!(speed.id(), again.id());
        assert_eq!(registry.derived_count(), 1);
    }

    #[test]
    fn derive_collapses_trivial_maps() {
        let registry = MeasureRegistry::new();
        let distance = registry.basic("distance");
        let primitive = distance.as_primitive().expect("primitive");

        let single: BTreeMap<_, _> = [(primitive.clone(), 1)].into_iter().collect();
        assert_eq!(registry.derive(single).expect("derive"), distance);

        let zero: BTreeMap<_, _> = [(primitive, 0)].into_iter().collect();
        assert!(registry.derive(zero).expect("derive").is_scalar());
        assert_eq!(registry.derived_count(), 0);
    }

    #[test]
    fn derive_rejects_foreign_primitives() {
        let registry = MeasureRegistry::new();
        let foreign = MeasureRegistry::new().basic("foreign");
        let map: BTreeMap<_, _> = [(foreign.as_primitive().expect("primitive"), 2)]
            .into_iter()
            .collect();
        assert_eq!(registry.derive(map), Err(MeasureError::ForeignRegistry));
        assert!(!registry.contains(&foreign));
        assert!(registry.contains(&Measure::Scalar));
    }

    #[test]
    fn concurrent_interning_yields_one_instance() {
        let registry = MeasureRegistry::new();
        let mass = registry.basic("mass");
        let distance = registry.basic("distance");
        let duration = registry.basic("duration");

        let ids: Vec<MeasureId> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let force = mass
                            .mul(&distance)
                            .and_then(|m| m.div(&duration.pow(2)?))
                            .expect("force");
                        force.id().expect("compound id")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("join"))
                .collect()
        });

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}
