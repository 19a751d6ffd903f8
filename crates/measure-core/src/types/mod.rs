//! # Core Type Definitions
//!
//! This module contains the types shared by every measure variant:
//! - Measure identifiers (`MeasureId`)
//! - Unit table entries (`UnitDef`)
//! - The unit capability (`Unit`)
//! - Error types (`MeasureError`)
//!
//! ## Identity
//!
//! Measures are compared by identity, never by structure. Every primitive and
//! every interned compound measure receives a `MeasureId` from its registry,
//! and the id is the only thing `Eq`, `Ord` and `Hash` look at.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for a measure within a registry.
///
/// Ids are handed out in creation order, which makes the ordering of
/// primitive-exponent maps (and therefore rendering and greedy unit
/// assignment) deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeasureId(pub u64);

impl MeasureId {
    /// Get the raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

// =============================================================================
// UNIT DEFINITIONS
// =============================================================================

/// A unit table entry.
///
/// An entry is either a resolved coefficient (how many arbitrary units one of
/// this unit is), an alias naming another unit string of the same measure, or
/// a coefficient applied to an alias. Alias targets go through the full lookup
/// grammar, so `"60 minute"` is a valid target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitDef {
    /// A resolved coefficient.
    Coefficient(f64),
    /// Another unit string of the same measure.
    Alias(String),
    /// `factor` times another unit string of the same measure.
    Scaled(f64, String),
}

impl UnitDef {
    /// Check if the entry is already a resolved coefficient.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Coefficient(_))
    }
}

impl From<f64> for UnitDef {
    fn from(value: f64) -> Self {
        Self::Coefficient(value)
    }
}

impl From<&str> for UnitDef {
    fn from(value: &str) -> Self {
        Self::Alias(value.to_string())
    }
}

impl From<String> for UnitDef {
    fn from(value: String) -> Self {
        Self::Alias(value)
    }
}

impl From<(f64, &str)> for UnitDef {
    fn from((factor, unit): (f64, &str)) -> Self {
        Self::Scaled(factor, unit.to_string())
    }
}

// =============================================================================
// UNIT CAPABILITY
// =============================================================================

/// Anything convertible to and from the arbitrary reference axis.
///
/// Plain coefficients scale; ladders apply an affine transform.
pub trait Unit {
    /// Convert a value expressed in this unit to arbitrary units.
    fn to_arbitrary(&self, value: f64) -> f64;

    /// Convert a value expressed in arbitrary units to this unit.
    fn from_arbitrary(&self, value: f64) -> f64;
}

impl Unit for f64 {
    fn to_arbitrary(&self, value: f64) -> f64 {
        value * self
    }

    fn from_arbitrary(&self, value: f64) -> f64 {
        value / self
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the measure engine.
///
/// - No silent coercion between measures
/// - Use `Result<T, MeasureError>` for fallible operations
/// - The engine never panics on caller input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasureError {
    /// A unit, amount or composite string could not be parsed.
    #[error("could not parse unit string {0:?}")]
    Parse(String),

    /// The unit name is not defined by the measure.
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    /// A composite unit left a primitive of the measure unassigned.
    #[error("unit {0} unassigned")]
    Unassigned(String),

    /// Two operands are expressed in different measures.
    #[error("measure mismatch: {left} vs {right}")]
    Mismatch {
        /// The receiving measure.
        left: String,
        /// The measure of the other operand.
        right: String,
    },

    /// The operand kind is not accepted by the operation.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// A root was requested whose degree does not divide every exponent.
    #[error("cannot get the {root} root of {measure}")]
    RootDomain {
        /// The requested root degree.
        root: i32,
        /// The measure the root was requested of.
        measure: String,
    },

    /// Calibration points did not produce a consistent ladder.
    #[error("degenerate ladder calibration: {0}")]
    Calibration(String),

    /// The measure has been optimized and no longer accepts new units.
    #[error("measure {0} is frozen")]
    Frozen(String),

    /// Alias resolution exceeded the maximum chain depth.
    #[error("alias chain too deep while resolving {0}")]
    AliasDepth(String),

    /// A combined exponent does not fit in an `i32`.
    #[error("exponent overflow")]
    ExponentOverflow,

    /// The operands were created by different registries.
    #[error("measures belong to different registries")]
    ForeignRegistry,

    /// The registry that owns the measure no longer exists.
    #[error("measure registry has been dropped")]
    RegistryDropped,

    /// A format specification could not be parsed.
    #[error("could not parse format string {0:?}")]
    Format(String),

    /// An absolute measurement was requested without an amount.
    #[error("amount must be specified: {0}")]
    MissingAmount(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_def_conversions() {
        assert_eq!(UnitDef::from(2.5), UnitDef::Coefficient(2.5));
        assert_eq!(UnitDef::from("meter"), UnitDef::Alias("meter".to_string()));
        assert_eq!(
            UnitDef::from((12.0, "inch")),
            UnitDef::Scaled(12.0, "inch".to_string())
        );
        assert!(UnitDef::from(1.0).is_resolved());
        assert!(!UnitDef::from("m").is_resolved());
    }

    #[test]
    fn coefficient_is_a_unit() {
        let km = 1000.0_f64;
        assert_eq!(km.to_arbitrary(3.0), 3000.0);
        assert_eq!(km.from_arbitrary(1500.0), 1.5);
    }

    #[test]
    fn error_messages_name_the_cause() {
        let err = MeasureError::UnknownUnit("parsec".to_string());
        assert_eq!(err.to_string(), "unknown unit: parsec");

        let err = MeasureError::RootDomain {
            root: 2,
            measure: "distance".to_string(),
        };
        assert_eq!(err.to_string(), "cannot get the 2 root of distance");
    }
}
