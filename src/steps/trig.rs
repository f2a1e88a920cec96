//! Right-triangle trigonometry derivations.
//!
//! Side cases produce seven lines: ratio, substitution, isolation, keystrokes, the value at
//! six significant figures, the value at the requested decimals, and the value with its unit.
//! Angle cases end with the raw degrees and the DMS value at the requested precision.

use super::dms::{Angle, DmsPrecision, decimal_to_dms};
use super::format::{Quantity, SIG_FIGS, fmt_fixed, fmt_sig};
use super::{Derivation, LineKind, StepError};

/// Side names relative to the reference angle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Opp,
    Adj,
    Hyp,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Opp => "opp",
            Role::Adj => "adj",
            Role::Hyp => "hyp",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ratio {
    Sin,
    Cos,
    Tan,
}

impl Ratio {
    /// The ratio relating two distinct roles.
    pub fn for_roles(a: Role, b: Role) -> Option<Ratio> {
        use Role::*;
        match (a, b) {
            (Opp, Hyp) | (Hyp, Opp) => Some(Ratio::Sin),
            (Adj, Hyp) | (Hyp, Adj) => Some(Ratio::Cos),
            (Opp, Adj) | (Adj, Opp) => Some(Ratio::Tan),
            _ => None,
        }
    }

    /// `(numerator, denominator)`.
    pub fn roles(self) -> (Role, Role) {
        match self {
            Ratio::Sin => (Role::Opp, Role::Hyp),
            Ratio::Cos => (Role::Adj, Role::Hyp),
            Ratio::Tan => (Role::Opp, Role::Adj),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Ratio::Sin => "sin",
            Ratio::Cos => "cos",
            Ratio::Tan => "tan",
        }
    }

    pub fn eval(self, rad: f64) -> f64 {
        match self {
            Ratio::Sin => rad.sin(),
            Ratio::Cos => rad.cos(),
            Ratio::Tan => rad.tan(),
        }
    }

    /// Inverse in degrees.
    pub fn inverse_deg(self, x: f64) -> f64 {
        match self {
            Ratio::Sin => x.asin(),
            Ratio::Cos => x.acos(),
            Ratio::Tan => x.atan(),
        }
        .to_degrees()
    }
}

/// How an angle is written in text and TeX.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AngleName {
    pub text: &'static str,
    pub tex: &'static str,
}

impl AngleName {
    pub const ALPHA: AngleName = AngleName {
        text: "α",
        tex: r"\alpha",
    };
    pub const BETA: AngleName = AngleName {
        text: "β",
        tex: r"\beta",
    };
    pub const THETA: AngleName = AngleName {
        text: "θ",
        tex: r"\theta",
    };
}

fn statement(d: &mut Derivation, ratio: Ratio, name: AngleName) {
    let (num, den) = ratio.roles();
    let f = ratio.name();
    d.push(
        LineKind::Statement,
        format!("{f}({}) = {} / {}", name.text, num.name(), den.name()),
        format!(
            r"\{f}({}) = \frac{{\text{{{}}}}}{{\text{{{}}}}}",
            name.tex,
            num.name(),
            den.name()
        ),
    );
}

/// Push the three result lines for side `x`.
fn side_results(d: &mut Derivation, value: f64, unit: Option<&str>, precision: usize) {
    let raw = fmt_sig(value, SIG_FIGS);
    d.push(LineKind::Result, format!("x = {raw}"), format!("x = {raw}"));
    let rounded = fmt_fixed(value, precision);
    d.push(LineKind::Result, format!("x = {rounded}"), format!("x = {rounded}"));
    if let Some(u) = unit {
        d.push(
            LineKind::Result,
            format!("x = {rounded} {u}"),
            format!(r"x = {rounded}\text{{ {u}}}"),
        );
    }
}

/// Solve the side with role `unknown` from the side `known` and the reference angle.
pub fn solve_side(
    name: AngleName,
    angle: &Angle,
    known: (Role, &Quantity),
    unknown: Role,
    precision: usize,
) -> Result<Derivation, StepError> {
    let (known_role, q) = known;
    let ratio = Ratio::for_roles(known_role, unknown).ok_or_else(|| {
        StepError::Invalid(format!("cannot solve {} from itself", unknown.name()))
    })?;
    if !(angle.degrees > 0.0 && angle.degrees < 90.0) {
        return Err(StepError::Invalid(format!("angle {angle} is not acute")));
    }

    let f = ratio.name();
    let k = fmt_sig(q.value, SIG_FIGS);
    let ang = angle.to_string();
    let x_on_top = ratio.roles().0 == unknown;
    let t = ratio.eval(angle.radians());

    let mut d = Derivation::new();
    statement(&mut d, ratio, name);
    if x_on_top {
        d.push(
            LineKind::Substitution,
            format!("{f}({ang}) = x / {k}"),
            format!(r"\{f}({ang}) = \frac{{x}}{{{k}}}"),
        );
        d.push(
            LineKind::Isolation,
            format!("x = {k} × {f}({ang})"),
            format!(r"x = {k} \times \{f}({ang})"),
        );
        d.keys(format!("{k} × {f} {} =", angle.keystrokes()));
    } else {
        d.push(
            LineKind::Substitution,
            format!("{f}({ang}) = {k} / x"),
            format!(r"\{f}({ang}) = \frac{{{k}}}{{x}}"),
        );
        d.push(
            LineKind::Isolation,
            format!("x = {k} / {f}({ang})"),
            format!(r"x = \frac{{{k}}}{{\{f}({ang})}}"),
        );
        d.keys(format!("{k} ÷ {f} {} =", angle.keystrokes()));
    }

    let value = if x_on_top { q.value * t } else { q.value / t };
    side_results(&mut d, value, q.unit.as_deref(), precision);
    Ok(d)
}

/// Solve the reference angle from two sides.
pub fn solve_angle(
    name: AngleName,
    a: (Role, f64),
    b: (Role, f64),
    precision: DmsPrecision,
) -> Result<Derivation, StepError> {
    let ratio = Ratio::for_roles(a.0, b.0)
        .ok_or_else(|| StepError::Invalid("two distinct sides are needed".to_string()))?;
    let (num_role, _) = ratio.roles();
    let (num, den) = if a.0 == num_role { (a.1, b.1) } else { (b.1, a.1) };
    if num <= 0.0 || den <= 0.0 || (ratio != Ratio::Tan && num >= den) {
        return Err(StepError::Invalid(format!(
            "{} / {} is not a valid {} ratio",
            num,
            den,
            ratio.name()
        )));
    }

    let f = ratio.name();
    let (n, m) = (fmt_sig(num, SIG_FIGS), fmt_sig(den, SIG_FIGS));
    let mut d = Derivation::new();
    statement(&mut d, ratio, name);
    d.push(
        LineKind::Substitution,
        format!("{f}({}) = {n} / {m}", name.text),
        format!(r"\{f}({}) = \frac{{{n}}}{{{m}}}", name.tex),
    );
    d.push(
        LineKind::Isolation,
        format!("{} = {f}^-1({n} / {m})", name.text),
        format!(r"{} = \{f}^{{-1}}(\frac{{{n}}}{{{m}}})", name.tex),
    );
    d.keys(format!("SHIFT {f} ( {n} ÷ {m} ) = °'\""));

    let deg = ratio.inverse_deg(num / den);
    let raw = fmt_sig(deg, SIG_FIGS);
    d.push(
        LineKind::Result,
        format!("{} = {raw}°", name.text),
        format!("{} = {raw}°", name.tex),
    );
    let dms = decimal_to_dms(deg, precision).to_string();
    d.push(
        LineKind::Result,
        format!("{} = {dms}", name.text),
        format!("{} = {dms}", name.tex),
    );
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_from_adjacent_and_dms_angle() {
        let angle: Angle = "20°32'".parse().unwrap();
        let adj: Quantity = "28 cm".parse().unwrap();
        let d = solve_side(AngleName::ALPHA, &angle, (Role::Adj, &adj), Role::Opp, 2).unwrap();
        let texts = d.texts();
        assert_eq!(texts[0], "tan(α) = opp / adj");
        assert_eq!(texts[1], "tan(20°32') = x / 28");
        assert_eq!(texts[2], "x = 28 × tan(20°32')");
        assert_eq!(texts[3], "28 × tan 20 °'\" 32 °'\" =");
        assert_eq!(d.last_text(), Some("x = 10.49 cm"));
        assert_eq!(d.lines[3].kind, LineKind::Keystrokes);
        assert!(d.lines[3].tex.is_none());
    }

    #[test]
    fn test_hypotenuse_goes_in_denominator() {
        let angle = Angle::from_degrees(30.0);
        let opp = Quantity::new(5.0, None);
        let d = solve_side(AngleName::THETA, &angle, (Role::Opp, &opp), Role::Hyp, 2).unwrap();
        assert_eq!(d.texts()[2], "x = 5 / sin(30°)");
        assert_eq!(d.last_text(), Some("x = 10.00"));
    }

    #[test]
    fn test_angle_from_two_sides() {
        let d = solve_angle(
            AngleName::ALPHA,
            (Role::Adj, 20.0),
            (Role::Opp, 15.0),
            DmsPrecision::Minutes,
        )
        .unwrap();
        let texts = d.texts();
        assert_eq!(texts[1], "tan(α) = 15 / 20");
        assert_eq!(texts[3], "SHIFT tan ( 15 ÷ 20 ) = °'\"");
        assert_eq!(texts[4], "α = 36.8699°");
        assert_eq!(d.last_text(), Some("α = 36°52'"));
    }

    #[test]
    fn test_invalid_cases() {
        let q = Quantity::new(3.0, None);
        let a = Angle::from_degrees(40.0);
        assert!(solve_side(AngleName::ALPHA, &a, (Role::Opp, &q), Role::Opp, 2).is_err());
        assert!(solve_side(AngleName::ALPHA, &Angle::from_degrees(90.0), (Role::Opp, &q), Role::Adj, 2).is_err());
        assert!(
            solve_angle(AngleName::ALPHA, (Role::Opp, 5.0), (Role::Hyp, 4.0), DmsPrecision::Minutes)
                .is_err()
        );
    }
}
