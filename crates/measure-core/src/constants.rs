//! # Engine Constants
//!
//! Fixed limits and tolerances compiled into the engine.
//! These are immutable at runtime.

/// Maximum number of alias hops followed while resolving a unit.
///
/// Alias chains deeper than this (including cycles) fail with
/// `MeasureError::AliasDepth` instead of recursing without bound.
pub const MAX_ALIAS_DEPTH: usize = 64;

/// Relative tolerance used when verifying ladder calibration.
pub const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Absolute tolerance used when verifying values that should be zero.
pub const ABSOLUTE_TOLERANCE: f64 = 1e-12;

/// Amount assumed when a unit string carries no leading number.
pub const DEFAULT_AMOUNT: f64 = 1.0;

/// Default precision of the `e`, `f`, `g` and `%` presentation types.
pub const DEFAULT_PRECISION: usize = 6;

/// Width of a digit group when a thousands separator is requested.
pub const DIGIT_GROUP: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_amount_is_one() {
        assert_eq!(DEFAULT_AMOUNT, 1.0);
    }

    #[test]
    fn alias_depth_is_bounded() {
        assert!(MAX_ALIAS_DEPTH > 1);
    }
}
