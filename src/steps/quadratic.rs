//! Quadratic-formula derivations.

use super::format::{SIG_FIGS, fmt_paren, fmt_sig, fmt_trim};
use super::{Derivation, LineKind, StepError};

/// `a x² + b x + c`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn discriminant(&self) -> f64 {
        self.b * self.b - 4.0 * self.a * self.c
    }

    /// Real roots, larger first.
    pub fn roots(&self) -> Vec<f64> {
        let d = self.discriminant();
        if self.a == 0.0 || d < 0.0 {
            return Vec::new();
        }
        let s = d.sqrt();
        let (r1, r2) = ((-self.b + s) / (2.0 * self.a), (-self.b - s) / (2.0 * self.a));
        if d == 0.0 {
            vec![r1]
        } else {
            vec![r1.max(r2), r1.min(r2)]
        }
    }

    /// Standard form, e.g. `("x² - 6x + 8", "x^2 - 6x + 8")`.
    pub fn standard_form(&self) -> (String, String) {
        signed_terms(&[(self.a, "x²", "x^2"), (self.b, "x", "x"), (self.c, "", "")])
    }
}

/// Join `coefficient·variable` terms with their signs, skipping zeros.
pub(crate) fn signed_terms(terms: &[(f64, &str, &str)]) -> (String, String) {
    let (mut text, mut tex) = (String::new(), String::new());
    for &(k, var_text, var_tex) in terms {
        if k == 0.0 {
            continue;
        }
        let mag = k.abs();
        let coef = if !var_text.is_empty() && mag == 1.0 {
            String::new()
        } else {
            fmt_sig(mag, SIG_FIGS)
        };
        let sign = match (text.is_empty(), k < 0.0) {
            (true, true) => "-",
            (true, false) => "",
            (false, true) => " - ",
            (false, false) => " + ",
        };
        text.push_str(&format!("{sign}{coef}{var_text}"));
        tex.push_str(&format!("{sign}{coef}{var_tex}"));
    }
    if text.is_empty() {
        ("0".to_string(), "0".to_string())
    } else {
        (text, tex)
    }
}

fn normalize(src: &str) -> String {
    src.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect::<String>()
        .replace('²', "^2")
        .replace("^{2}", "^2")
}

fn term(t: &str, src: &str) -> Result<(f64, usize), StepError> {
    let bad = || StepError::Parse(format!("cannot read term {t:?} of {src:?}"));
    let coef = |s: &str| -> Result<f64, StepError> {
        if s.is_empty() { Ok(1.0) } else { s.parse().map_err(|_| bad()) }
    };
    match t.find('x') {
        None if t.is_empty() => Err(bad()),
        None => Ok((t.parse().map_err(|_| bad())?, 0)),
        Some(i) => {
            let power = match &t[i + 1..] {
                "" | "^1" => 1,
                "^2" => 2,
                _ => return Err(bad()),
            };
            Ok((coef(&t[..i])?, power))
        }
    }
}

/// Coefficients `[c, b, a]` of a polynomial in `x` of degree at most two.
fn polynomial(src: &str) -> Result<[f64; 3], StepError> {
    let s = normalize(src);
    if s.is_empty() {
        return Err(StepError::Parse("empty expression".to_string()));
    }
    let mut coeffs = [0.0; 3];
    let mut rest = s.as_str();
    while !rest.is_empty() {
        let (sign, body) = match rest.as_bytes()[0] {
            b'+' => (1.0, &rest[1..]),
            b'-' => (-1.0, &rest[1..]),
            _ => (1.0, rest),
        };
        let end = body.find(|c: char| c == '+' || c == '-').unwrap_or(body.len());
        let (k, power) = term(&body[..end], src)?;
        coeffs[power] += sign * k;
        rest = &body[end..];
    }
    Ok(coeffs)
}

/// Read `x^2-6x+8`, `x²-6x+8 = 0`, `2x^2 = 3x + 5` or `ax²+bx+c = x²-6x+8`.
pub fn parse_quadratic(src: &str) -> Result<Quadratic, StepError> {
    let [c, b, a] = match src.split_once('=') {
        None => polynomial(src)?,
        Some((lhs, rhs)) if normalize(lhs) == "ax^2+bx+c" => polynomial(rhs)?,
        Some((lhs, rhs)) => {
            let (l, r) = (polynomial(lhs)?, polynomial(rhs)?);
            [l[0] - r[0], l[1] - r[1], l[2] - r[2]]
        }
    };
    if a == 0.0 {
        return Err(StepError::NotQuadratic);
    }
    Ok(Quadratic { a, b, c })
}

/// Solve `q` by the quadratic formula. Roots are shown with at most `precision` decimals.
pub fn quadratic_steps(q: &Quadratic, precision: usize) -> Result<Derivation, StepError> {
    if q.a == 0.0 {
        return Err(StepError::NotQuadratic);
    }
    let s = |x: f64| fmt_sig(x, SIG_FIGS);
    let mut d = Derivation::new();

    let (form, form_tex) = q.standard_form();
    d.push(
        LineKind::Statement,
        format!("{form} = 0"),
        format!("{form_tex} = 0"),
    );
    let (a, b, c) = (s(q.a), s(q.b), s(q.c));
    d.push(
        LineKind::Statement,
        format!("a = {a}, b = {b}, c = {c}"),
        format!(r"a = {a} \quad b = {b} \quad c = {c}"),
    );
    d.push(
        LineKind::Statement,
        "x = (-b ± √(b² - 4ac)) / 2a",
        r"x = \frac{-b \pm \sqrt{b^2 - 4ac}}{2a}",
    );

    let (pa, pb, pc) = (fmt_paren(q.a), fmt_paren(q.b), fmt_paren(q.c));
    d.push(
        LineKind::Substitution,
        format!("x = (-{pb} ± √({pb}² - 4·{pa}·{pc})) / (2·{pa})"),
        format!(r"x = \frac{{-{pb} \pm \sqrt{{{pb}^2 - 4 \cdot {pa} \cdot {pc}}}}}{{2 \cdot {pa}}}"),
    );

    let (neg_b, two_a) = (s(-q.b), s(2.0 * q.a));
    let (b2, four_ac) = (s(q.b * q.b), fmt_paren(4.0 * q.a * q.c));
    d.push(
        LineKind::Isolation,
        format!("x = ({neg_b} ± √({b2} - {four_ac})) / {two_a}"),
        format!(r"x = \frac{{{neg_b} \pm \sqrt{{{b2} - {four_ac}}}}}{{{two_a}}}"),
    );

    let disc = q.discriminant();
    let ds = s(disc);
    if disc < 0.0 {
        d.push(
            LineKind::Result,
            format!("b² - 4ac = {ds} < 0"),
            format!("b^2 - 4ac = {ds} < 0"),
        );
        d.push(LineKind::Result, "no real solutions", r"\text{no real solutions}");
        return Ok(d);
    }
    d.push(
        LineKind::Isolation,
        format!("x = ({neg_b} ± √{ds}) / {two_a}"),
        format!(r"x = \frac{{{neg_b} \pm \sqrt{{{ds}}}}}{{{two_a}}}"),
    );

    if disc == 0.0 {
        d.push(
            LineKind::Isolation,
            format!("x = {neg_b} / {two_a}"),
            format!(r"x = \frac{{{neg_b}}}{{{two_a}}}"),
        );
        let r = fmt_trim(-q.b / (2.0 * q.a), precision);
        d.push(LineKind::Result, format!("x = {r}"), format!("x = {r}"));
        return Ok(d);
    }

    let root = s(disc.sqrt());
    d.push(
        LineKind::Isolation,
        format!("x = ({neg_b} ± {root}) / {two_a}"),
        format!(r"x = \frac{{{neg_b} \pm {root}}}{{{two_a}}}"),
    );
    for op in ['+', '-'] {
        d.push(
            LineKind::Isolation,
            format!("x = ({neg_b} {op} {root}) / {two_a}"),
            format!(r"x = \frac{{{neg_b} {op} {root}}}{{{two_a}}}"),
        );
    }
    let sq = disc.sqrt();
    for v in [(-q.b + sq) / (2.0 * q.a), (-q.b - sq) / (2.0 * q.a)] {
        let r = fmt_trim(v, precision);
        d.push(LineKind::Result, format!("x = {r}"), format!("x = {r}"));
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let expected = Quadratic::new(1.0, -6.0, 8.0);
        assert_eq!(parse_quadratic("x^2-6x+8").unwrap(), expected);
        assert_eq!(parse_quadratic("x² - 6x + 8 = 0").unwrap(), expected);
        assert_eq!(parse_quadratic("ax²+bx+c = x²-6x+8").unwrap(), expected);
        assert_eq!(parse_quadratic("x^2 = 6x - 8").unwrap(), expected);
        assert_eq!(
            parse_quadratic("2x^2 + 0.5x").unwrap(),
            Quadratic::new(2.0, 0.5, 0.0)
        );
        assert_eq!(parse_quadratic("3x + 1"), Err(StepError::NotQuadratic));
        assert!(matches!(parse_quadratic("x^3 + 1"), Err(StepError::Parse(_))));
    }

    #[test]
    fn test_two_roots() {
        let q = parse_quadratic("x²-6x+8").unwrap();
        let d = quadratic_steps(&q, 2).unwrap();
        let t = d.texts();
        assert_eq!(t[0], "x² - 6x + 8 = 0");
        assert_eq!(t[1], "a = 1, b = -6, c = 8");
        assert_eq!(t[4], "x = (6 ± √(36 - 32)) / 2");
        assert_eq!(t[5], "x = (6 ± √4) / 2");
        assert_eq!(t[6], "x = (6 ± 2) / 2");
        assert_eq!(&t[t.len() - 2..], ["x = 4", "x = 2"]);
        assert_eq!(q.roots(), vec![4.0, 2.0]);
    }

    #[test]
    fn test_double_and_no_roots() {
        let d = quadratic_steps(&Quadratic::new(1.0, -4.0, 4.0), 2).unwrap();
        assert_eq!(d.last_text(), Some("x = 2"));

        let d = quadratic_steps(&Quadratic::new(1.0, 0.0, 1.0), 2).unwrap();
        assert_eq!(d.last_text(), Some("no real solutions"));
        assert!(d.texts().iter().any(|t| t == "b² - 4ac = -4 < 0"));
        assert!(Quadratic::new(1.0, 0.0, 1.0).roots().is_empty());
    }

    #[test]
    fn test_standard_form_signs() {
        assert_eq!(Quadratic::new(-1.0, 0.0, -2.5).standard_form().0, "-x² - 2.5");
        assert_eq!(Quadratic::new(2.0, 1.0, 0.0).standard_form().1, "2x^2 + x");
    }
}
