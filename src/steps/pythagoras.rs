//! Pythagoras and altitude-on-hypotenuse derivations.

use super::dms::Angle;
use super::format::{Quantity, SIG_FIGS, fmt_fixed, fmt_sig};
use super::trig::AngleName;
use super::{Derivation, LineKind, StepError};

fn results(d: &mut Derivation, name: &str, value: f64, unit: Option<&str>, precision: usize) {
    let raw = fmt_sig(value, SIG_FIGS);
    d.push(LineKind::Result, format!("{name} = {raw}"), format!("{name} = {raw}"));
    let rounded = fmt_fixed(value, precision);
    d.push(
        LineKind::Result,
        format!("{name} = {rounded}"),
        format!("{name} = {rounded}"),
    );
    if let Some(u) = unit {
        d.push(
            LineKind::Result,
            format!("{name} = {rounded} {u}"),
            format!(r"{name} = {rounded}\text{{ {u}}}"),
        );
    }
}

fn unit_of<'a>(a: &'a Quantity, b: &'a Quantity) -> Option<&'a str> {
    a.unit.as_deref().or(b.unit.as_deref())
}

/// `c` from the legs `a` and `b`.
pub fn hypotenuse(a: &Quantity, b: &Quantity, precision: usize) -> Derivation {
    let (x, y) = (fmt_sig(a.value, SIG_FIGS), fmt_sig(b.value, SIG_FIGS));
    let mut d = Derivation::new();
    d.push(LineKind::Statement, "c² = a² + b²", "c^2 = a^2 + b^2");
    d.push(
        LineKind::Substitution,
        format!("c² = {x}² + {y}²"),
        format!("c^2 = {x}^2 + {y}^2"),
    );
    d.push(
        LineKind::Isolation,
        format!("c = √({x}² + {y}²)"),
        format!(r"c = \sqrt{{{x}^2 + {y}^2}}"),
    );
    d.keys(format!("√ ( {x} x² + {y} x² ) ="));
    results(&mut d, "c", a.value.hypot(b.value), unit_of(a, b), precision);
    d
}

/// A leg from the hypotenuse and the other leg. `leg` names the unknown ("a" or "b").
pub fn leg(
    leg: &str,
    c: &Quantity,
    other: &Quantity,
    precision: usize,
) -> Result<Derivation, StepError> {
    if other.value >= c.value {
        return Err(StepError::Invalid(format!(
            "leg {} is not shorter than hypotenuse {}",
            other.value, c.value
        )));
    }
    let other_name = if leg == "a" { "b" } else { "a" };
    let (h, y) = (fmt_sig(c.value, SIG_FIGS), fmt_sig(other.value, SIG_FIGS));
    let mut d = Derivation::new();
    d.push(
        LineKind::Statement,
        format!("{leg}² = c² - {other_name}²"),
        format!("{leg}^2 = c^2 - {other_name}^2"),
    );
    d.push(
        LineKind::Substitution,
        format!("{leg}² = {h}² - {y}²"),
        format!("{leg}^2 = {h}^2 - {y}^2"),
    );
    d.push(
        LineKind::Isolation,
        format!("{leg} = √({h}² - {y}²)"),
        format!(r"{leg} = \sqrt{{{h}^2 - {y}^2}}"),
    );
    d.keys(format!("√ ( {h} x² - {y} x² ) ="));
    let value = (c.value * c.value - other.value * other.value).sqrt();
    results(&mut d, leg, value, unit_of(c, other), precision);
    Ok(d)
}

/// `h = ab / c`.
pub fn altitude_from_sides(a: &Quantity, b: &Quantity, c: &Quantity, precision: usize) -> Derivation {
    let (x, y, z) = (
        fmt_sig(a.value, SIG_FIGS),
        fmt_sig(b.value, SIG_FIGS),
        fmt_sig(c.value, SIG_FIGS),
    );
    let mut d = Derivation::new();
    d.push(LineKind::Statement, "h = a · b / c", r"h = \frac{a \cdot b}{c}");
    d.push(
        LineKind::Substitution,
        format!("h = {x} · {y} / {z}"),
        format!(r"h = \frac{{{x} \cdot {y}}}{{{z}}}"),
    );
    let product = fmt_sig(a.value * b.value, SIG_FIGS);
    d.push(
        LineKind::Isolation,
        format!("h = {product} / {z}"),
        format!(r"h = \frac{{{product}}}{{{z}}}"),
    );
    d.keys(format!("{x} × {y} ÷ {z} ="));
    results(&mut d, "h", a.value * b.value / c.value, unit_of(a, b), precision);
    d
}

/// `h = leg · sin(angle)` where `angle` sits at the far end of `leg`.
pub fn altitude_from_angle(
    leg_name: &str,
    leg: &Quantity,
    name: AngleName,
    angle: &Angle,
    precision: usize,
) -> Derivation {
    let (l, ang) = (fmt_sig(leg.value, SIG_FIGS), angle.to_string());
    let mut d = Derivation::new();
    d.push(
        LineKind::Statement,
        format!("h = {leg_name} · sin({})", name.text),
        format!(r"h = {leg_name} \cdot \sin({})", name.tex),
    );
    d.push(
        LineKind::Substitution,
        format!("h = {l} · sin({ang})"),
        format!(r"h = {l} \cdot \sin({ang})"),
    );
    d.keys(format!("{l} × sin {} =", angle.keystrokes()));
    results(
        &mut d,
        "h",
        leg.value * angle.radians().sin(),
        leg.unit.as_deref(),
        precision,
    );
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hypotenuse_lines() {
        let d = hypotenuse(&"3 m".parse().unwrap(), &"4 m".parse().unwrap(), 2);
        let t = d.texts();
        assert_eq!(t[0], "c² = a² + b²");
        assert_eq!(t[1], "c² = 3² + 4²");
        assert_eq!(t[3], "√ ( 3 x² + 4 x² ) =");
        assert_eq!(d.last_text(), Some("c = 5.00 m"));
    }

    #[test]
    fn test_leg_requires_shorter_side() {
        let c: Quantity = "13".parse().unwrap();
        let d = leg("b", &c, &"5".parse().unwrap(), 1).unwrap();
        assert_eq!(d.texts()[0], "b² = c² - a²");
        assert_eq!(d.last_text(), Some("b = 12.0"));
        assert!(leg("a", &c, &"13".parse().unwrap(), 2).is_err());
    }

    #[test]
    fn test_altitudes_agree() {
        let (a, b, c) = (Quantity::new(6.0, None), Quantity::new(8.0, None), Quantity::new(10.0, None));
        let d1 = altitude_from_sides(&a, &b, &c, 2);
        assert_eq!(d1.last_text(), Some("h = 4.80"));
        let alpha = Angle::from_degrees((8.0f64 / 6.0).atan().to_degrees());
        let d2 = altitude_from_angle("a", &a, AngleName::ALPHA, &alpha, 2);
        assert_eq!(d2.last_text(), Some("h = 4.80"));
    }
}
