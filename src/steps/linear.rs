//! Slope-intercept form from two points.

use super::format::{SIG_FIGS, fmt_paren, fmt_sig, fmt_trim, round_to};
use super::quadratic::signed_terms;
use super::{Derivation, LineKind, StepError};

/// `y = mx + b` as `(text, tex)`, with `m` and `b` at most `precision` decimals.
pub fn line_equation(m: f64, b: f64, precision: usize) -> (String, String) {
    let (m, b) = (round_to(m, precision), round_to(b, precision));
    let (text, tex) = signed_terms(&[(m, "x", "x"), (b, "", "")]);
    (format!("y = {text}"), format!("y = {tex}"))
}

/// Slope, intercept and equation of the line through `p1` and `p2`.
pub fn slope_intercept(p1: [f64; 2], p2: [f64; 2], precision: usize) -> Result<Derivation, StepError> {
    let ([x1, y1], [x2, y2]) = (p1, p2);
    if x1 == x2 {
        return Err(StepError::VerticalLine(x1));
    }
    let s = |v: f64| fmt_sig(v, SIG_FIGS);
    let mut d = Derivation::new();

    d.push(
        LineKind::Statement,
        "m = (y2 - y1) / (x2 - x1)",
        r"m = \frac{y_2 - y_1}{x_2 - x_1}",
    );
    let (ny, nx) = (format!("{} - {}", s(y2), fmt_paren(y1)), format!("{} - {}", s(x2), fmt_paren(x1)));
    d.push(
        LineKind::Substitution,
        format!("m = ({ny}) / ({nx})"),
        format!(r"m = \frac{{{ny}}}{{{nx}}}"),
    );
    let (dy, dx) = (s(y2 - y1), s(x2 - x1));
    d.push(
        LineKind::Isolation,
        format!("m = {dy} / {dx}"),
        format!(r"m = \frac{{{dy}}}{{{dx}}}"),
    );
    let m = (y2 - y1) / (x2 - x1);
    let ms = fmt_trim(m, precision);
    d.push(LineKind::Result, format!("m = {ms}"), format!("m = {ms}"));

    d.push(LineKind::Statement, "b = y1 - m · x1", r"b = y_1 - m x_1");
    let (pm, px) = (fmt_paren(round_to(m, precision)), fmt_paren(x1));
    d.push(
        LineKind::Substitution,
        format!("b = {} - {pm} · {px}", s(y1)),
        format!(r"b = {} - {pm} \cdot {px}", s(y1)),
    );
    let b = y1 - round_to(m, precision) * x1;
    let bs = fmt_trim(b, precision);
    d.push(LineKind::Result, format!("b = {bs}"), format!("b = {bs}"));

    let (eq, eq_tex) = line_equation(m, b, precision);
    d.push(LineKind::Result, eq, eq_tex);
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_points() {
        let d = slope_intercept([2.0, 3.0], [4.0, 7.0], 2).unwrap();
        let t = d.texts();
        assert_eq!(t[1], "m = (7 - 3) / (4 - 2)");
        assert_eq!(t[3], "m = 2");
        assert_eq!(t[5], "b = 3 - 2 · 2");
        assert_eq!(t[6], "b = -1");
        assert_eq!(d.last_text(), Some("y = 2x - 1"));
    }

    #[test]
    fn test_negative_coordinates_are_parenthesized() {
        let d = slope_intercept([-1.0, 4.0], [1.0, 0.0], 2).unwrap();
        assert_eq!(d.texts()[1], "m = (0 - 4) / (1 - (-1))");
        assert_eq!(d.last_text(), Some("y = -2x + 2"));
    }

    #[test]
    fn test_special_lines() {
        assert!(matches!(
            slope_intercept([1.0, 0.0], [1.0, 5.0], 2),
            Err(StepError::VerticalLine(_))
        ));
        assert_eq!(line_equation(0.0, 3.0, 2).0, "y = 3");
        assert_eq!(line_equation(1.0, 0.0, 2).0, "y = x");
        assert_eq!(line_equation(0.0, 0.0, 2).0, "y = 0");
    }
}
