//! # Derived Measures
//!
//! A canonical compound dimension: a sparse map from primitive measure to
//! non-zero exponent. Instances are only created by the registry, which
//! interns them by signature.
//!
//! ## Composite units
//!
//! A unit string such as `"kg*m/s2"` is split into signed tokens and each
//! token is assigned greedily to the first primitive (in id order) that
//! defines the unit name, has an exponent of the same sign, and still has
//! enough exponent budget left. Every primitive must end with a zero budget.

use crate::constants::MAX_ALIAS_DEPTH;
use crate::dynamic::Decomposition;
use crate::grammar::{parse_composite, split_amount};
use crate::measure::{Measure, Primitive};
use crate::registry::RegistryShared;
use crate::{MeasureError, MeasureId, UnitDef};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// One token of a composite unit bound to a primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// The primitive the token was assigned to.
    pub primitive: Primitive,
    /// The signed exponent of the token.
    pub exponent: i32,
    /// The unit name of the token.
    pub unit: String,
}

struct DerivedInner {
    id: MeasureId,
    primitives: BTreeMap<Primitive, i32>,
    live: bool,
    registry: Weak<RegistryShared>,
    aliases: RwLock<BTreeMap<String, UnitDef>>,
    name: RwLock<Option<String>>,
}

/// Handle to an interned compound dimension.
#[derive(Clone)]
pub struct DerivedMeasure {
    inner: Arc<DerivedInner>,
}

impl DerivedMeasure {
    pub(crate) fn new(
        id: MeasureId,
        primitives: BTreeMap<Primitive, i32>,
        registry: Weak<RegistryShared>,
    ) -> Self {
        let live = primitives.keys().any(Primitive::is_live);
        Self {
            inner: Arc::new(DerivedInner {
                id,
                primitives,
                live,
                registry,
                aliases: RwLock::new(BTreeMap::new()),
                name: RwLock::new(None),
            }),
        }
    }

    /// The measure id.
    #[must_use]
    pub fn id(&self) -> MeasureId {
        self.inner.id
    }

    /// The primitive-exponent map.
    #[must_use]
    pub fn primitives(&self) -> &BTreeMap<Primitive, i32> {
        &self.inner.primitives
    }

    /// Whether any primitive is dynamic.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.live
    }

    /// Whether the owning registry is still alive.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.inner.registry.strong_count() > 0
    }

    /// The display name, if one was set.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.inner.name.read().clone()
    }

    /// Set the display name.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.inner.name.write() = Some(name.into());
    }

    /// Name a composite unit string, or a coefficient of one.
    pub fn set_alias(&self, name: impl Into<String>, def: impl Into<UnitDef>) {
        self.inner.aliases.write().insert(name.into(), def.into());
    }

    /// All alias names, sorted.
    #[must_use]
    pub fn aliases(&self) -> Vec<String> {
        self.inner.aliases.read().keys().cloned().collect()
    }

    /// The measure variant wrapping this handle.
    #[must_use]
    pub fn to_measure(&self) -> Measure {
        if self.inner.live {
            Measure::DynamicDerived(self.clone())
        } else {
            Measure::Derived(self.clone())
        }
    }

    /// Bind the tokens of a composite unit to primitives.
    pub fn assign(&self, unit: &str) -> Result<Vec<Assignment>, MeasureError> {
        let tokens = parse_composite(unit)?;
        let mut left: Vec<(Primitive, i32)> = self
            .inner
            .primitives
            .iter()
            .map(|(p, n)| (p.clone(), *n))
            .collect();

        let mut assigned = Vec::with_capacity(tokens.len());
        for token in tokens {
            let slot = left
                .iter_mut()
                .find(|slot| {
                    slot.1.signum() == token.exponent.signum()
                        && slot.1.unsigned_abs() >= token.exponent.unsigned_abs()
                        && slot.0.contains(&token.name)
                })
                .ok_or_else(|| MeasureError::UnknownUnit(token.name.clone()))?;
            slot.1 -= token.exponent;
            assigned.push(Assignment {
                primitive: slot.0.clone(),
                exponent: token.exponent,
                unit: token.name,
            });
        }

        if let Some((primitive, _)) = left.iter().find(|(_, n)| *n != 0) {
            return Err(MeasureError::Unassigned(primitive.to_string()));
        }
        Ok(assigned)
    }

    /// Decompose a unit string: amount prefix, then aliases, then the
    /// composite grammar.
    pub fn decompose(&self, unit: &str) -> Result<Decomposition, MeasureError> {
        self.decompose_at(unit, 0)
    }

    fn decompose_at(&self, unit: &str, depth: usize) -> Result<Decomposition, MeasureError> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(MeasureError::AliasDepth(unit.to_string()));
        }
        if let Some((amount, rest)) = split_amount(unit)? {
            return Ok(self.decompose_at(rest, depth + 1)?.scaled(amount));
        }

        let alias = self.inner.aliases.read().get(unit).cloned();
        if let Some(def) = alias {
            return match def {
                UnitDef::Coefficient(c) => Ok(Decomposition::fixed(c)),
                UnitDef::Alias(target) => self.decompose_at(&target, depth + 1),
                UnitDef::Scaled(factor, target) => {
                    Ok(self.decompose_at(&target, depth + 1)?.scaled(factor))
                }
            };
        }

        self.assign(unit)?
            .iter()
            .try_fold(Decomposition::fixed(1.0), |acc, a| {
                acc.combine(&a.primitive.decompose(&a.unit)?.powi(a.exponent)?)
            })
    }

    /// Resolve aliases to coefficients. Live measures keep their aliases
    /// symbolic.
    pub fn optimize_aliases(&self) -> Result<(), MeasureError> {
        if self.inner.live {
            return Ok(());
        }
        let pending: Vec<String> = self
            .inner
            .aliases
            .read()
            .iter()
            .filter(|(_, def)| !def.is_resolved())
            .map(|(name, _)| name.clone())
            .collect();

        let mut resolved = Vec::with_capacity(pending.len());
        for name in pending {
            let coefficient = self.decompose(&name)?.evaluate()?;
            resolved.push((name, coefficient));
        }

        let count = resolved.len();
        let mut aliases = self.inner.aliases.write();
        for (name, coefficient) in resolved {
            aliases.insert(name, UnitDef::Coefficient(coefficient));
        }
        tracing::trace!(measure = %self, resolved = count, "aliases optimized");
        Ok(())
    }

    /// Render the native units of the primitives as a composite unit.
    ///
    /// `None` if some primitive has no units yet.
    #[must_use]
    pub fn native_unit(&self, compact: bool) -> Option<String> {
        let mut pos = Vec::new();
        let mut neg = Vec::new();
        for (primitive, n) in &self.inner.primitives {
            let unit = primitive.native_unit()?;
            let text = if n.unsigned_abs() == 1 {
                unit
            } else {
                format!("{unit}**{}", n.unsigned_abs())
            };
            if *n > 0 { pos.push(text) } else { neg.push(text) }
        }

        let separator = if compact { "*" } else { " * " };
        let mut rendered = if pos.is_empty() {
            "1".to_string()
        } else {
            pos.join(separator)
        };
        if !neg.is_empty() {
            // "1 / x" would read as an amount of 1.
            rendered.push_str(if compact || pos.is_empty() { "/" } else { " / " });
            rendered.push_str(&neg.join(separator));
        }
        Some(rendered)
    }
}

impl fmt::Display for DerivedMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.inner.name.read().as_deref() {
            return f.write_str(name);
        }
        let mut pos = Vec::new();
        let mut neg = Vec::new();
        for (primitive, n) in &self.inner.primitives {
            let text = if n.unsigned_abs() == 1 {
                primitive.to_string()
            } else {
                format!("{primitive}**{}", n.unsigned_abs())
            };
            if *n > 0 { pos.push(text) } else { neg.push(text) }
        }
        if pos.is_empty() {
            pos.push("1".to_string());
        }
        f.write_str(&pos.join(" * "))?;
        if !neg.is_empty() {
            write!(f, "/{}", neg.join(" * "))?;
        }
        Ok(())
    }
}

impl fmt::Debug for DerivedMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedMeasure")
            .field("id", &self.inner.id)
            .field("primitives", &self.to_string())
            .field("live", &self.inner.live)
            .finish_non_exhaustive()
    }
}

impl PartialEq for DerivedMeasure {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for DerivedMeasure {}

impl Hash for DerivedMeasure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
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

    fn speed(registry: &MeasureRegistry) -> (Measure, DerivedMeasure) {
        let distance = registry
            .basic_with("distance", [("meter", 1.0), ("kilometer", 1000.0)])
            .expect("distance");
        distance.set_unit("m", "meter").expect("alias");
        distance.set_unit("km", "kilometer").expect("alias");
        let duration = registry
            .basic_with("duration", [("second", 1.0), ("minute", 60.0)])
            .expect("duration");
        duration.set_unit("s", "second").expect("alias");
        duration.set_unit("hour", "60 minute").expect("alias");

        let speed = distance.div(&duration).expect("speed");
        let Measure::Derived(derived) = speed.clone() else {
            unreachable!("distance/duration is compound");
        };
        (speed, derived)
    }

    #[test]
    fn greedy_assignment_binds_every_token() {
        let registry = MeasureRegistry::new();
        let (_, speed) = speed(&registry);
        let assigned = speed.assign("km/hour").expect("assign");
        assert_eq!(assigned.len(), 2);
        assert_eq!(assigned[0].unit, "km");
        assert_eq!(assigned[0].exponent, 1);
        assert_eq!(assigned[1].unit, "hour");
        assert_eq!(assigned[1].exponent, -1);
    }

    #[test]
    fn repeated_tokens_share_a_budget() {
        let registry = MeasureRegistry::new();
        let (speed, _) = speed(&registry);
        let duration = speed
            .primitives()
            .keys()
            .find(|p| p.to_string() == "duration")
            .map(Primitive::to_measure)
            .expect("duration");
        let acceleration = speed.div(&duration).expect("acceleration");
        let a = acceleration.lookup("m/s s").expect("m/s s");
        let b = acceleration.lookup("m/s2").expect("m/s2");
        assert_eq!(a, b);
    }

    #[test]
    fn sign_must_match() {
        let registry = MeasureRegistry::new();
        let (_, speed) = speed(&registry);
        assert_eq!(
            speed.assign("m*s"),
            Err(MeasureError::UnknownUnit("s".to_string()))
        );
    }

    #[test]
    fn aliases_resolve_through_the_grammar() {
        let registry = MeasureRegistry::new();
        let (speed, derived) = speed(&registry);
        derived.set_alias("kph", "km/hour");
        derived.set_alias("knot", (1.852, "kph"));

        let kph = speed.lookup("kph").expect("kph");
        assert!(is_close(kph, 1000.0 / 3600.0));
        assert!(is_close(
            speed.lookup("2 knot").expect("knot"),
            2.0 * 1.852 * kph
        ));

        speed.optimize_aliases().expect("optimize");
        assert_eq!(derived.aliases(), vec!["knot".to_string(), "kph".to_string()]);
        assert!(is_close(speed.lookup("kph").expect("kph"), kph));
    }

    #[test]
    fn compact_native_unit() {
        let registry = MeasureRegistry::new();
        let (speed, derived) = speed(&registry);
        let duration = speed
            .primitives()
            .keys()
            .find(|p| p.to_string() == "duration")
            .map(Primitive::to_measure)
            .expect("duration");
        let Measure::Derived(acceleration) = speed.div(&duration).expect("acceleration")
        else {
            unreachable!("acceleration is compound");
        };
        assert_eq!(derived.native_unit(true).as_deref(), Some("meter/second"));
        assert_eq!(
            acceleration.native_unit(false).as_deref(),
            Some("meter / second**2")
        );
        assert_eq!(acceleration.to_string(), "distance/duration**2");
    }

    #[test]
    fn inverse_renders_with_unit_numerator() {
        let registry = MeasureRegistry::new();
        let (speed, _) = speed(&registry);
        let pace = speed.inverse().expect("inverse");
        assert_eq!(pace.to_string(), "duration/distance");
        let duration = registry
            .basic_with("frequency_base", [("second", 1.0)])
            .expect("base");
        let Measure::Derived(frequency) = duration.inverse().expect("inverse") else {
            unreachable!("an inverse is compound");
        };
        assert_eq!(frequency.to_string(), "1/frequency_base");
        assert_eq!(frequency.native_unit(true).as_deref(), Some("1/second"));
        assert_eq!(frequency.native_unit(false).as_deref(), Some("1/second"));
        let hz = frequency.to_measure().parse("5 1/second").expect("hz");
        assert_eq!(hz.to_string(), "5.0 1/second");
    }
}
