//! Number formatting and quantity parsing shared by the generators.

use std::fmt;
use std::str::FromStr;

use super::StepError;

/// Significant figures of intermediate values.
pub const SIG_FIGS: usize = 6;

/// Round to `places` decimals, halves away from zero.
pub fn round_to(x: f64, places: usize) -> f64 {
    let k = 10f64.powi(places as i32);
    let r = (x * k).round() / k;
    if r == 0.0 { 0.0 } else { r }
}

pub fn round_sig(x: f64, sig: usize) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let places = sig as i32 - 1 - x.abs().log10().floor() as i32;
    if places >= 0 {
        round_to(x, places as usize)
    } else {
        let k = 10f64.powi(-places);
        (x / k).round() * k
    }
}

fn trim_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `x` at `sig` significant figures, without trailing zeros.
pub fn fmt_sig(x: f64, sig: usize) -> String {
    let r = round_sig(x, sig);
    if r == 0.0 {
        return "0".to_string();
    }
    let places = (sig as i32 - 1 - r.abs().log10().floor() as i32).max(0) as usize;
    trim_zeros(format!("{r:.places$}"))
}

/// Exactly `places` decimals.
pub fn fmt_fixed(x: f64, places: usize) -> String {
    format!("{:.places$}", round_to(x, places))
}

/// At most `places` decimals.
pub fn fmt_trim(x: f64, places: usize) -> String {
    trim_zeros(fmt_fixed(x, places))
}

/// `x` wrapped in parentheses when negative, for substitution into products.
pub fn fmt_paren(x: f64) -> String {
    let s = fmt_sig(x, SIG_FIGS);
    if x < 0.0 { format!("({s})") } else { s }
}

/// A magnitude with an optional unit, as written by lesson authors (`"28 cm"`, `"4.5"`).
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<String>,
}

impl Quantity {
    pub fn new(value: f64, unit: Option<&str>) -> Self {
        Self {
            value,
            unit: unit.map(str::to_string),
        }
    }

    /// `value` followed by the unit, if any.
    pub fn with_unit(&self, value: &str) -> String {
        match &self.unit {
            Some(u) => format!("{value} {u}"),
            None => value.to_string(),
        }
    }
}

impl FromStr for Quantity {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .parse()
            .map_err(|_| StepError::Parse(format!("expected a number in {s:?}")))?;
        let unit = unit.trim();
        Ok(Self {
            value,
            unit: (!unit.is_empty()).then(|| unit.to_string()),
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.with_unit(&fmt_sig(self.value, SIG_FIGS)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(fmt_fixed(10.486_99, 2), "10.49");
        assert_eq!(fmt_fixed(-0.001, 2), "0.00");
    }

    #[test]
    fn test_significant_figures() {
        assert_eq!(fmt_sig(10.486_993, 6), "10.487");
        assert_eq!(fmt_sig(0.374_532_18, 6), "0.374532");
        assert_eq!(fmt_sig(123_456_789.0, 6), "123457000");
        assert_eq!(fmt_sig(28.0, 6), "28");
        assert_eq!(fmt_sig(0.0, 6), "0");
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(fmt_trim(4.0, 2), "4");
        assert_eq!(fmt_trim(2.50, 2), "2.5");
        assert_eq!(fmt_paren(-6.0), "(-6)");
    }

    #[test]
    fn test_parse_quantity() {
        let q: Quantity = "28 cm".parse().unwrap();
        assert_eq!(q, Quantity::new(28.0, Some("cm")));
        let q: Quantity = "4.5".parse().unwrap();
        assert_eq!(q.unit, None);
        assert_eq!(q.to_string(), "4.5");
        assert!("cm".parse::<Quantity>().is_err());
    }
}
