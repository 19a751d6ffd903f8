//! # Sparse Map Utilities
//!
//! Pure helpers over sparse integer-valued maps. Exponent maps never store a
//! zero entry, so every merge drops keys whose combined value is zero.

use crate::MeasureError;
use crate::constants::{ABSOLUTE_TOLERANCE, RELATIVE_TOLERANCE};
use std::collections::BTreeMap;

/// Merge any number of sparse maps under `func`.
///
/// For every key present in at least one map, `func` receives that key's value
/// in each map (zero where absent). Keys whose result is zero are omitted.
/// `None` from `func` aborts the merge.
pub fn combine_maps<K, F>(maps: &[&BTreeMap<K, i32>], func: F) -> Option<BTreeMap<K, i32>>
where
    K: Ord + Clone,
    F: Fn(&[i32]) -> Option<i32>,
{
    let mut ret = BTreeMap::new();
    let mut args = Vec::with_capacity(maps.len());

    for (index, map) in maps.iter().enumerate() {
        for key in map.keys() {
            // Already handled by an earlier map.
            if maps[..index].iter().any(|m| m.contains_key(key)) {
                continue;
            }
            args.clear();
            args.extend(maps.iter().map(|m| m.get(key).copied().unwrap_or(0)));
            let value = func(&args)?;
            if value != 0 {
                ret.insert(key.clone(), value);
            }
        }
    }

    Some(ret)
}

/// Signed sum of two exponent maps.
pub fn add_maps<K: Ord + Clone>(
    a: &BTreeMap<K, i32>,
    b: &BTreeMap<K, i32>,
) -> Result<BTreeMap<K, i32>, MeasureError> {
    combine_maps(&[a, b], |v| v[0].checked_add(v[1])).ok_or(MeasureError::ExponentOverflow)
}

/// Signed difference of two exponent maps.
pub fn sub_maps<K: Ord + Clone>(
    a: &BTreeMap<K, i32>,
    b: &BTreeMap<K, i32>,
) -> Result<BTreeMap<K, i32>, MeasureError> {
    combine_maps(&[a, b], |v| v[0].checked_sub(v[1])).ok_or(MeasureError::ExponentOverflow)
}

/// Multiply every exponent by `factor`.
pub fn scale_map<K: Ord + Clone>(
    a: &BTreeMap<K, i32>,
    factor: i32,
) -> Result<BTreeMap<K, i32>, MeasureError> {
    combine_maps(&[a], |v| v[0].checked_mul(factor)).ok_or(MeasureError::ExponentOverflow)
}

/// Divide every exponent by `divisor`, or `None` if any is not divisible.
pub fn divide_map<K: Ord + Clone>(a: &BTreeMap<K, i32>, divisor: i32) -> Option<BTreeMap<K, i32>> {
    if divisor == 0 || a.values().any(|n| n.checked_rem(divisor) != Some(0)) {
        return None;
    }
    combine_maps(&[a], |v| v[0].checked_div(divisor))
}

/// Floating point closeness with a relative and an absolute floor.
#[must_use]
pub fn is_close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    diff <= (RELATIVE_TOLERANCE * a.abs().max(b.abs())).max(ABSOLUTE_TOLERANCE)
}

/// A real exponent expressible in measure algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exponent {
    /// An integer power.
    Power(i32),
    /// The reciprocal of an integer: a root of that degree.
    Root(i32),
}

/// Classify a real exponent as an integer power or an integer root.
///
/// Anything else (`1.5`, `NaN`, infinities) is `None`.
#[must_use]
pub fn classify_exponent(power: f64) -> Option<Exponent> {
    let limit = f64::from(i32::MAX);
    if power.fract() == 0.0 && power.abs() <= limit {
        return Some(Exponent::Power(power as i32));
    }
    let reciprocal = power.recip();
    let degree = reciprocal.round();
    if degree != 0.0 && degree.abs() <= limit && is_close(reciprocal, degree) {
        return Some(Exponent::Root(degree as i32));
    }
    None
}

/// The real n-th root, defined for negative values when `n` is odd.
#[must_use]
pub fn real_root(value: f64, n: i32) -> f64 {
    if value < 0.0 && n % 2 != 0 {
        -(-value).powf(1.0 / f64::from(n))
    } else {
        value.powf(1.0 / f64::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&'static str, i32)]) -> BTreeMap<&'static str, i32> {
        entries.iter().copied().collect()
    }

    #[test]
    fn add_drops_cancelled_keys() {
        let a = map(&[("m", 1), ("s", -1)]);
        let b = map(&[("s", 1), ("kg", 1)]);
        assert_eq!(
            add_maps(&a, &b).expect("add"),
            map(&[("m", 1), ("kg", 1)])
        );
    }

    #[test]
    fn sub_of_self_is_empty() {
        let a = map(&[("m", 1), ("s", -2)]);
        assert!(sub_maps(&a, &a).expect("sub").is_empty());
    }

    #[test]
    fn combine_three_maps() {
        let a = map(&[("x", 1)]);
        let b = map(&[("y", 2)]);
        let c = map(&[("x", 1), ("y", -2), ("z", 3)]);
        let merged = combine_maps(&[&a, &b, &c], |v| Some(v.iter().sum())).expect("merge");
        assert_eq!(merged, map(&[("x", 2), ("z", 3)]));
    }

    #[test]
    fn scale_by_zero_is_empty() {
        let a = map(&[("m", 3)]);
        assert!(scale_map(&a, 0).expect("scale").is_empty());
        assert_eq!(scale_map(&a, -2).expect("scale"), map(&[("m", -6)]));
    }

    #[test]
    fn exponent_overflow_is_an_error() {
        let a = map(&[("m", 2)]);
        assert_eq!(
            scale_map(&a, i32::MAX),
            Err(MeasureError::ExponentOverflow)
        );
        let big = map(&[("m", i32::MAX)]);
        assert_eq!(add_maps(&big, &a), Err(MeasureError::ExponentOverflow));
        let low = map(&[("m", i32::MIN)]);
        assert_eq!(sub_maps(&low, &a), Err(MeasureError::ExponentOverflow));
        assert_eq!(divide_map(&low, -1), None);
    }

    #[test]
    fn divide_requires_divisibility() {
        let a = map(&[("m", 2), ("s", -4)]);
        assert_eq!(divide_map(&a, 2), Some(map(&[("m", 1), ("s", -2)])));
        assert_eq!(divide_map(&a, 3), None);
        assert_eq!(divide_map(&a, 0), None);
    }

    #[test]
    fn closeness() {
        assert!(is_close(0.1 + 0.2, 0.3));
        assert!(is_close(0.0, 1e-15));
        assert!(!is_close(1.0, 1.001));
    }

    #[test]
    fn exponent_classes() {
        assert_eq!(classify_exponent(2.0), Some(Exponent::Power(2)));
        assert_eq!(classify_exponent(-1.0), Some(Exponent::Power(-1)));
        assert_eq!(classify_exponent(0.5), Some(Exponent::Root(2)));
        assert_eq!(classify_exponent(1.0 / 3.0), Some(Exponent::Root(3)));
        assert_eq!(classify_exponent(1.5), None);
        assert_eq!(classify_exponent(f64::NAN), None);
    }

    #[test]
    fn odd_root_of_negative() {
        assert!(is_close(real_root(-27.0, 3), -3.0));
        assert!(real_root(-4.0, 2).is_nan());
        assert!(is_close(real_root(16.0, 4), 2.0));
    }
}
