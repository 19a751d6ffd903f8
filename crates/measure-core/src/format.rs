//! # Measurement Formatting
//!
//! The mini-language for rendering measurements:
//!
//! ```text
//! [<decimal-format>:][<unit>][|<display-label>]
//! ```
//!
//! - `<decimal-format>` is a numeric format spec
//!   (`[[fill]align][sign][#][0][width][,|_][.precision][type]`) applied to
//!   the converted amount.
//! - `<unit>` is the conversion unit; the measure's native unit by default.
//!   It may carry an amount: `"10 m/s2"` counts in units of ten m/s2.
//! - `<display-label>` replaces the unit text after the number.
//!
//! `".2f:m/s2"` renders `"1.27 m/s2"`; `"10 m/s2|g"` renders `"0.127 g"`.

use crate::MeasureError;
use crate::constants::{DEFAULT_PRECISION, DIGIT_GROUP};
use regex::Regex;
use std::sync::LazyLock;

static SPEC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<decimal>(?:.?[<>=^])?[-+ ]?#?0?[0-9]*[,_]?(?:\.[0-9]*)?[eEfFgGn%]?):)?(?P<convert>[^|]*)(?:\|(?P<display>.*))?$",
    )
    .expect("format pattern is valid")
});

static DECIMAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<fill>.)?(?P<align>[<>=^]))?(?P<sign>[-+ ])?(?P<alt>#)?(?P<zero>0)?(?P<width>[0-9]+)?(?P<group>[,_])?(?:\.(?P<precision>[0-9]*))?(?P<kind>[eEfFgGn%])?$",
    )
    .expect("decimal pattern is valid")
});

// =============================================================================
// FORMAT SPEC
// =============================================================================

/// A parsed measurement format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSpec {
    /// Numeric format of the amount.
    pub decimal: DecimalFormat,
    /// Conversion unit; `None` selects the native unit.
    pub unit: Option<String>,
    /// Label shown after the number; `None` shows the unit.
    pub display: Option<String>,
}

impl FormatSpec {
    /// Parse a `[decimal:][unit][|label]` string.
    pub fn parse(spec: &str) -> Result<Self, MeasureError> {
        let caps = SPEC_PATTERN
            .captures(spec)
            .ok_or_else(|| MeasureError::Format(spec.to_string()))?;
        let decimal = match caps.name("decimal") {
            Some(m) => DecimalFormat::parse(m.as_str())?,
            None => DecimalFormat::default(),
        };
        let non_empty = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Ok(Self {
            decimal,
            unit: non_empty("convert"),
            display: non_empty("display"),
        })
    }

    /// Render `"<number> <label>"`.
    ///
    /// `convert` maps the chosen unit string to the amount in that unit.
    pub fn render(
        &self,
        native: Option<String>,
        convert: impl FnOnce(&str) -> Result<f64, MeasureError>,
    ) -> Result<String, MeasureError> {
        let unit = self.unit.clone().or(native).unwrap_or_default();
        let label = self.display.clone().unwrap_or_else(|| unit.clone());
        let number = self.decimal.apply(convert(&unit)?);
        if label.is_empty() {
            Ok(number)
        } else {
            Ok(format!("{number} {label}"))
        }
    }
}

// =============================================================================
// DECIMAL FORMAT
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Align {
    Left,
    #[default]
    Right,
    Center,
    AfterSign,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Sign {
    #[default]
    Negative,
    Always,
    Space,
}

/// A numeric format spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalFormat {
    fill: char,
    align: Option<Align>,
    sign: Sign,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl Default for DecimalFormat {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: Sign::Negative,
            alternate: false,
            zero: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        }
    }
}

impl DecimalFormat {
    /// Parse a numeric format spec. The empty spec is the shortest
    /// round-trip representation.
    pub fn parse(spec: &str) -> Result<Self, MeasureError> {
        let error = || MeasureError::Format(spec.to_string());
        let caps = DECIMAL_PATTERN.captures(spec).ok_or_else(error)?;

        let align = caps.name("align").map(|m| match m.as_str() {
            "<" => Align::Left,
            "^" => Align::Center,
            "=" => Align::AfterSign,
            _ => Align::Right,
        });
        let sign = match caps.name("sign").map(|m| m.as_str()) {
            Some("+") => Sign::Always,
            Some(" ") => Sign::Space,
            _ => Sign::Negative,
        };
        let width = match caps.name("width") {
            Some(m) => m.as_str().parse().map_err(|_| error())?,
            None => 0,
        };
        let precision = match caps.name("precision") {
            Some(m) if m.as_str().is_empty() => return Err(error()),
            Some(m) => Some(m.as_str().parse().map_err(|_| error())?),
            None => None,
        };

        Ok(Self {
            fill: caps
                .name("fill")
                .and_then(|m| m.as_str().chars().next())
                .unwrap_or(' '),
            align,
            sign,
            alternate: caps.name("alt").is_some(),
            zero: caps.name("zero").is_some(),
            width,
            grouping: caps.name("group").and_then(|m| m.as_str().chars().next()),
            precision,
            kind: caps.name("kind").and_then(|m| m.as_str().chars().next()),
        })
    }

    /// Format a value.
    #[must_use]
    pub fn apply(&self, value: f64) -> String {
        let negative = value.is_sign_negative() && !value.is_nan();
        let mut body = self.body(value.abs());
        if let Some(separator) = self.grouping {
            if value.is_finite() && self.kind != Some('n') {
                body = group_digits(&body, separator);
            }
        }
        let sign = match (negative, self.sign) {
            (true, _) => "-",
            (false, Sign::Always) => "+",
            (false, Sign::Space) => " ",
            (false, Sign::Negative) => "",
        };
        self.pad(sign, &body)
    }

    fn body(&self, x: f64) -> String {
        let upper = matches!(self.kind, Some('E' | 'F' | 'G'));
        if !x.is_finite() {
            let text = if x.is_nan() { "nan" } else { "inf" };
            let text = if upper { text.to_uppercase() } else { text.to_string() };
            return if self.kind == Some('%') { text + "%" } else { text };
        }

        let precision = self.precision.unwrap_or(DEFAULT_PRECISION);
        match self.kind {
            Some('f' | 'F') => format!("{x:.precision$}"),
            Some('e' | 'E') => scientific(x, precision, upper),
            Some('g' | 'G' | 'n') => general(x, precision, self.alternate, upper),
            Some('%') => format!("{:.precision$}%", x * 100.0),
            _ => match self.precision {
                Some(p) => general(x, p, self.alternate, false),
                None => format!("{x:?}"),
            },
        }
    }

    fn pad(&self, sign: &str, body: &str) -> String {
        let len = sign.chars().count() + body.chars().count();
        if self.width <= len {
            return format!("{sign}{body}");
        }
        let (fill, align) = match (self.align, self.zero) {
            (None, true) => ('0', Align::AfterSign),
            (align, _) => (self.fill, align.unwrap_or_default()),
        };
        let padding = self.width - len;
        let run = |n: usize| std::iter::repeat_n(fill, n).collect::<String>();
        match align {
            Align::Left => format!("{sign}{body}{}", run(padding)),
            Align::Right => format!("{}{sign}{body}", run(padding)),
            Align::AfterSign => format!("{sign}{}{body}", run(padding)),
            Align::Center => {
                let left = padding / 2;
                format!("{}{sign}{body}{}", run(left), run(padding - left))
            }
        }
    }
}

/// `d.ddde±XX` with at least two exponent digits.
fn scientific(x: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{x:.precision$e}");
    let (mantissa, exponent) = split_exponent(&raw);
    render_exponent(mantissa, exponent, upper)
}

/// Fixed or scientific, whichever is shorter for `precision` significant
/// digits, without trailing zeros unless `alternate`.
fn general(x: f64, precision: usize, alternate: bool, upper: bool) -> String {
    let precision = precision.max(1);
    let raw = format!("{x:.prec$e}", prec = precision - 1);
    let (mantissa, exponent) = split_exponent(&raw);

    if (-4..precision as i32).contains(&exponent) {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{x:.decimals$}");
        if alternate { fixed } else { strip_zeros(&fixed).to_string() }
    } else {
        let mantissa = if alternate { mantissa } else { strip_zeros(mantissa) };
        render_exponent(mantissa, exponent, upper)
    }
}

fn split_exponent(raw: &str) -> (&str, i32) {
    match raw.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse().unwrap_or(0)),
        None => (raw, 0),
    }
}

fn render_exponent(mantissa: &str, exponent: i32, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exponent.abs())
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Insert `separator` between groups of the leading integer digits.
fn group_digits(body: &str, separator: char) -> String {
    let end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (digits, rest) = body.split_at(end);

    let mut grouped = String::with_capacity(body.len() + digits.len() / DIGIT_GROUP);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % DIGIT_GROUP == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped.push_str(rest);
    grouped
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(spec: &str, value: f64) -> String {
        DecimalFormat::parse(spec).expect("spec").apply(value)
    }

    #[test]
    fn format_string_sections() {
        let spec = FormatSpec::parse(".2e:10 m/s2|g").expect("parse");
        assert_eq!(spec.decimal, DecimalFormat::parse(".2e").expect("decimal"));
        assert_eq!(spec.unit.as_deref(), Some("10 m/s2"));
        assert_eq!(spec.display.as_deref(), Some("g"));

        let spec = FormatSpec::parse("").expect("parse");
        assert_eq!(spec, FormatSpec::default());

        let spec = FormatSpec::parse("km").expect("parse");
        assert_eq!(spec.unit.as_deref(), Some("km"));
        assert_eq!(spec.display, None);
    }

    #[test]
    fn render_defaults_to_native_unit() {
        let spec = FormatSpec::parse(".1f:").expect("parse");
        let text = spec
            .render(Some("meter".to_string()), |unit| {
                assert_eq!(unit, "meter");
                Ok(2.26)
            })
            .expect("render");
        assert_eq!(text, "2.3 meter");
    }

    #[test]
    fn fixed_and_scientific() {
        assert_eq!(fmt(".2f", 1.2701), "1.27");
        assert_eq!(fmt(".2e", 0.127), "1.27e-01");
        assert_eq!(fmt(".3E", 12346.0), "1.235E+04");
        assert_eq!(fmt("", 0.127), "0.127");
    }

    #[test]
    fn general_switches_notation() {
        assert_eq!(fmt("g", 0.0001), "0.0001");
        assert_eq!(fmt("g", 0.00001), "1e-05");
        assert_eq!(fmt(".3g", 1234.5), "1.23e+03");
        assert_eq!(fmt("g", 12.5), "12.5");
    }

    #[test]
    fn grouping_and_padding() {
        assert_eq!(fmt(",.0f", 12690.96), "12,691");
        assert_eq!(fmt("_.1f", 1234567.21), "1_234_567.2");
        assert_eq!(fmt("+.1f", 3.0), "+3.0");
        assert_eq!(fmt("08.2f", -3.14159), "-0003.14");
        assert_eq!(fmt("*^9.1f", 2.5), "***2.5***");
        assert_eq!(fmt("<6", 1.5), "1.5   ");
    }

    #[test]
    fn percent_and_non_finite() {
        assert_eq!(fmt(".1%", 0.255), "25.5%");
        assert_eq!(fmt(".2f", f64::INFINITY), "inf");
        assert_eq!(fmt(".2F", f64::NAN), "NAN");
    }

    #[test]
    fn malformed_decimal_is_rejected() {
        assert!(matches!(
            DecimalFormat::parse("."),
            Err(MeasureError::Format(_))
        ));
        assert!(matches!(
            DecimalFormat::parse("q"),
            Err(MeasureError::Format(_))
        ));
    }
}
