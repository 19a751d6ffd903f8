//! # Unit String Grammar
//!
//! Two grammars are recognised:
//!
//! - Amount-prefixed units: an optional leading signed decimal (digit groups
//!   may use `,`, scientific notation allowed) followed by whitespace and a
//!   unit token, e.g. `"3.5 km"` or `"-1.2e3 mm"`.
//! - Composite units: `numerator[/denominator]`, each side a sequence of
//!   `name[exponent]` tokens separated by `*` or whitespace, where the
//!   exponent is written with `^`, `**` or as bare digits. `1` denotes an
//!   empty numerator, e.g. `"kg*m/s2"` or `"1/second"`.

use crate::MeasureError;
use regex::Regex;
use std::sync::LazyLock;

static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<float>[-+]?[0-9,]*(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?)\s+(?P<unit>.*)$")
        .expect("amount pattern is valid")
});

const TOKEN: &str = r"[a-zA-Z_]+(?:(?:\^|\*\*)?[1-9][0-9]*)?";

static COMPOSITE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let side = format!(r"{TOKEN}(?:\s*\*?\s*{TOKEN})*");
    Regex::new(&format!(
        r"^\s*(?P<pos>{side}|1)(?:\s*/\s*(?P<neg>{side}))?\s*$"
    ))
    .expect("composite pattern is valid")
});

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<name>[a-zA-Z_]+)(?:(?:\^|\*\*)?(?P<num>[1-9][0-9]*))?")
        .expect("token pattern is valid")
});

/// One `name[exponent]` token of a composite unit.
///
/// Denominator tokens carry a negative exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitToken {
    /// The unit name.
    pub name: String,
    /// The signed exponent.
    pub exponent: i32,
}

/// Split a leading amount off a unit string.
///
/// Returns `Ok(None)` when the string carries no amount, and a parse error when
/// the leading number is malformed (e.g. a lone `"."`).
pub fn split_amount(input: &str) -> Result<Option<(f64, &str)>, MeasureError> {
    let Some(caps) = AMOUNT_PATTERN.captures(input) else {
        return Ok(None);
    };
    let (Some(float), Some(unit)) = (caps.name("float"), caps.name("unit")) else {
        return Ok(None);
    };
    if float.as_str().is_empty() {
        return Ok(None);
    }

    let cleaned: String = float.as_str().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .map(|amount| Some((amount, unit.as_str())))
        .map_err(|_| MeasureError::Parse(input.to_string()))
}

/// Split a leading amount off a unit string, defaulting to `default`.
pub fn split_amount_or(input: &str, default: f64) -> Result<(f64, &str), MeasureError> {
    Ok(split_amount(input)?.unwrap_or((default, input)))
}

/// Parse a composite unit string into signed tokens.
pub fn parse_composite(input: &str) -> Result<Vec<UnitToken>, MeasureError> {
    let caps = COMPOSITE_PATTERN
        .captures(input)
        .ok_or_else(|| MeasureError::Parse(input.to_string()))?;

    let mut tokens = Vec::new();
    if let Some(pos) = caps.name("pos") {
        collect_tokens(pos.as_str(), 1, input, &mut tokens)?;
    }
    if let Some(neg) = caps.name("neg") {
        collect_tokens(neg.as_str(), -1, input, &mut tokens)?;
    }
    Ok(tokens)
}

fn collect_tokens(
    side: &str,
    sign: i32,
    input: &str,
    tokens: &mut Vec<UnitToken>,
) -> Result<(), MeasureError> {
    if side == "1" {
        return Ok(());
    }
    for m in TOKEN_PATTERN.captures_iter(side) {
        let Some(name) = m.name("name") else {
            continue;
        };
        let exponent = match m.name("num") {
            Some(num) => num
                .as_str()
                .parse::<i32>()
                .map_err(|_| MeasureError::Parse(input.to_string()))?,
            None => 1,
        };
        tokens.push(UnitToken {
            name: name.as_str().to_string(),
            exponent: exponent * sign,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(name: &str, exponent: i32) -> UnitToken {
        UnitToken {
            name: name.to_string(),
            exponent,
        }
    }

    #[test]
    fn split_plain_amount() {
        assert_eq!(split_amount("3.5 km").expect("split"), Some((3.5, "km")));
        assert_eq!(
            split_amount("-1.2e3 mm").expect("split"),
            Some((-1200.0, "mm"))
        );
        assert_eq!(
            split_amount("12,690 kg*m/s").expect("split"),
            Some((12690.0, "kg*m/s"))
        );
    }

    #[test]
    fn split_without_amount() {
        assert_eq!(split_amount("km").expect("split"), None);
        assert_eq!(split_amount("m/s2").expect("split"), None);
        assert_eq!(split_amount_or("hour", 1.0).expect("split"), (1.0, "hour"));
    }

    #[test]
    fn split_rejects_malformed_number() {
        assert!(matches!(split_amount(". km"), Err(MeasureError::Parse(_))));
    }

    #[test]
    fn composite_with_exponent_styles() {
        assert_eq!(
            parse_composite("m/s2").expect("parse"),
            vec![token("m", 1), token("s", -2)]
        );
        assert_eq!(
            parse_composite("m/s**2").expect("parse"),
            vec![token("m", 1), token("s", -2)]
        );
        assert_eq!(
            parse_composite("m / s^2").expect("parse"),
            vec![token("m", 1), token("s", -2)]
        );
    }

    #[test]
    fn composite_with_products() {
        assert_eq!(
            parse_composite("kg*m/s").expect("parse"),
            vec![token("kg", 1), token("m", 1), token("s", -1)]
        );
        assert_eq!(
            parse_composite("kilogram * meter / second second").expect("parse"),
            vec![
                token("kilogram", 1),
                token("meter", 1),
                token("second", -1),
                token("second", -1)
            ]
        );
    }

    #[test]
    fn composite_empty_numerator() {
        assert_eq!(
            parse_composite("1/minute").expect("parse"),
            vec![token("minute", -1)]
        );
    }

    #[test]
    fn composite_rejects_garbage() {
        assert!(matches!(
            parse_composite("m//s"),
            Err(MeasureError::Parse(_))
        ));
        assert!(matches!(parse_composite("m*2"), Err(MeasureError::Parse(_))));
        assert!(matches!(parse_composite(""), Err(MeasureError::Parse(_))));
    }
}
