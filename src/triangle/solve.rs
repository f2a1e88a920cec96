//! Completing a right triangle from a partial set of sides, angles and altitude.
//!
//! The right angle sits at `C`. Leg `a` and the hypotenuse `c` meet at the vertex carrying
//! `α`, leg `b` and `c` at the vertex carrying `β`, so `b` is opposite `α` and
//! `h = a·sin α = b·sin β = ab / c`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::steps::dms::{Angle, DmsPrecision};
use crate::steps::format::Quantity;
use crate::steps::trig::{self, AngleName, Role};
use crate::steps::{Derivation, StepError, pythagoras};

use super::TriangleError;

/// Completion passes before giving up on a fixed point.
const MAX_PASSES: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    A,
    B,
    C,
    H,
    Alpha,
    Beta,
}

impl Field {
    pub const ALL: [Field; 6] = [Field::A, Field::B, Field::C, Field::H, Field::Alpha, Field::Beta];
    pub const SIDES: [Field; 3] = [Field::A, Field::B, Field::C];

    pub fn name(self) -> &'static str {
        match self {
            Field::A => "a",
            Field::B => "b",
            Field::C => "c",
            Field::H => "h",
            Field::Alpha => "alpha",
            Field::Beta => "beta",
        }
    }

    pub fn is_angle(self) -> bool {
        matches!(self, Field::Alpha | Field::Beta)
    }

    fn index(self) -> usize {
        self as usize
    }

    fn angle_name(self) -> AngleName {
        if self == Field::Beta {
            AngleName::BETA
        } else {
            AngleName::ALPHA
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "a" => Ok(Field::A),
            "b" => Ok(Field::B),
            "c" => Ok(Field::C),
            "h" => Ok(Field::H),
            "alpha" | "α" => Ok(Field::Alpha),
            "beta" | "β" => Ok(Field::Beta),
            other => Err(StepError::Parse(format!("unknown triangle field {other:?}"))),
        }
    }
}

/// Role of `side` relative to the reference angle, if it has one.
pub fn role(reference: Field, side: Field) -> Option<Role> {
    match (reference, side) {
        (Field::Alpha | Field::Beta, Field::C) => Some(Role::Hyp),
        (Field::Alpha, Field::B) | (Field::Beta, Field::A) => Some(Role::Opp),
        (Field::Alpha, Field::A) | (Field::Beta, Field::B) => Some(Role::Adj),
        _ => None,
    }
}

fn role_of(reference: Field, side: Field) -> Result<Role, StepError> {
    role(reference, side)
        .ok_or_else(|| StepError::Invalid(format!("{side} has no role relative to {reference}")))
}

/// The side playing `role` relative to `reference`.
pub fn side_for(reference: Field, role: Role) -> Field {
    match (reference, role) {
        (_, Role::Hyp) => Field::C,
        (Field::Beta, Role::Opp) => Field::A,
        (Field::Beta, Role::Adj) => Field::B,
        (_, Role::Opp) => Field::B,
        (_, Role::Adj) => Field::A,
    }
}

struct Solver {
    values: [Option<f64>; 6],
    tolerance: f64,
}

impl Solver {
    fn put(&mut self, field: Field, value: f64, rule: &str) -> Result<bool, TriangleError> {
        let out_of_range = !value.is_finite() || value <= 0.0 || (field.is_angle() && value >= 90.0);
        if out_of_range {
            return Err(TriangleError::inconsistent(field, format!("{rule} gives {value}")));
        }
        match self.values[field.index()] {
            None => {
                self.values[field.index()] = Some(value);
                Ok(true)
            }
            Some(current) if (current - value).abs() <= self.tolerance * current.abs().max(1.0) => {
                Ok(false)
            }
            Some(current) => Err(TriangleError::inconsistent(
                field,
                format!("{rule} gives {value:.4} but {field} = {current}"),
            )),
        }
    }

    fn check_ordering(&self) -> Result<(), TriangleError> {
        let [a, b, c, h, _, _] = self.values;
        for (leg, name) in [(a, Field::A), (b, Field::B)] {
            if let (Some(leg), Some(c)) = (leg, c) {
                if leg >= c {
                    return Err(TriangleError::inconsistent(
                        Field::C,
                        format!("hypotenuse {c} is not longer than leg {name} = {leg}"),
                    ));
                }
            }
            if let (Some(leg), Some(h)) = (leg, h) {
                if h >= leg {
                    return Err(TriangleError::inconsistent(
                        Field::H,
                        format!("altitude {h} is not shorter than leg {name} = {leg}"),
                    ));
                }
            }
        }
        if let (Some(c), Some(h)) = (c, h) {
            if 2.0 * h > c {
                return Err(TriangleError::inconsistent(
                    Field::H,
                    format!("altitude {h} exceeds half the hypotenuse {c}"),
                ));
            }
        }
        Ok(())
    }

    /// Apply every identity once. Returns whether a new field was determined.
    fn pass(&mut self) -> Result<bool, TriangleError> {
        use Field::*;
        self.check_ordering()?;
        let [a, b, c, h, alpha, beta] = self.values;
        let mut changed = false;

        if let Some(al) = alpha {
            changed |= self.put(Beta, 90.0 - al, "α + β = 90°")?;
        }
        if let Some(be) = beta {
            changed |= self.put(Alpha, 90.0 - be, "α + β = 90°")?;
        }

        if let (Some(a), Some(b)) = (a, b) {
            changed |= self.put(C, a.hypot(b), "c² = a² + b²")?;
            changed |= self.put(Alpha, (b / a).atan().to_degrees(), "tan α = b / a")?;
        }
        if let (Some(a), Some(c)) = (a, c) {
            changed |= self.put(B, (c * c - a * a).sqrt(), "b² = c² - a²")?;
            changed |= self.put(Alpha, (a / c).acos().to_degrees(), "cos α = a / c")?;
        }
        if let (Some(b), Some(c)) = (b, c) {
            changed |= self.put(A, (c * c - b * b).sqrt(), "a² = c² - b²")?;
            changed |= self.put(Alpha, (b / c).asin().to_degrees(), "sin α = b / c")?;
        }

        if let Some(al) = alpha.map(f64::to_radians) {
            if let Some(a) = a {
                changed |= self.put(B, a * al.tan(), "b = a · tan α")?;
                changed |= self.put(C, a / al.cos(), "c = a / cos α")?;
            }
            if let Some(b) = b {
                changed |= self.put(A, b / al.tan(), "a = b / tan α")?;
                changed |= self.put(C, b / al.sin(), "c = b / sin α")?;
            }
            if let Some(c) = c {
                changed |= self.put(A, c * al.cos(), "a = c · cos α")?;
                changed |= self.put(B, c * al.sin(), "b = c · sin α")?;
            }
            if let Some(h) = h {
                changed |= self.put(A, h / al.sin(), "a = h / sin α")?;
                changed |= self.put(B, h / al.cos(), "b = h / sin β")?;
            }
        }

        if let (Some(a), Some(b), Some(c)) = (a, b, c) {
            changed |= self.put(H, a * b / c, "h = ab / c")?;
        }
        if let (Some(h), Some(a)) = (h, a) {
            changed |= self.put(Alpha, (h / a).asin().to_degrees(), "sin α = h / a")?;
        }
        if let (Some(h), Some(b)) = (h, b) {
            changed |= self.put(Beta, (h / b).asin().to_degrees(), "sin β = h / b")?;
        }
        // Hypotenuse and altitude alone fix the legs up to order; the longer one is `a`.
        if let (Some(h), Some(c), None, None, None) = (h, c, a, b, alpha) {
            let sum = (c * c + 2.0 * h * c).sqrt();
            let diff = (c * c - 2.0 * h * c).max(0.0).sqrt();
            changed |= self.put(A, (sum + diff) / 2.0, "a + b = √(c² + 2hc)")?;
            changed |= self.put(B, (sum - diff) / 2.0, "a - b = √(c² - 2hc)")?;
        }
        Ok(changed)
    }
}

/// Parsed descriptor values, completed as far as the identities allow.
#[derive(Debug, Clone, PartialEq)]
pub struct Solved {
    sides: BTreeMap<Field, Quantity>,
    angles: BTreeMap<Field, Angle>,
    values: [Option<f64>; 6],
    unit: Option<String>,
    pub unknown: Option<Field>,
    /// The angle side roles are named against.
    pub reference: Option<Field>,
}

impl Solved {
    /// Complete from the given sides and angles.
    pub fn complete(
        sides: BTreeMap<Field, Quantity>,
        angles: BTreeMap<Field, Angle>,
        unknown: Option<Field>,
        tolerance: f64,
    ) -> Result<Self, TriangleError> {
        if let Some(u) = unknown {
            if sides.contains_key(&u) || angles.contains_key(&u) {
                return Err(TriangleError::inconsistent(u, "is both given and unknown"));
            }
        }

        let mut solver = Solver {
            values: [None; 6],
            tolerance,
        };
        for (&f, q) in &sides {
            solver.put(f, q.value, "given")?;
        }
        for (&f, ang) in &angles {
            solver.put(f, ang.degrees, "given")?;
        }
        for _ in 0..MAX_PASSES {
            if !solver.pass()? {
                break;
            }
        }

        let unit = sides.values().find_map(|q| q.unit.clone());
        let reference = if angles.contains_key(&Field::Alpha) {
            Some(Field::Alpha)
        } else if angles.contains_key(&Field::Beta) {
            Some(Field::Beta)
        } else {
            unknown.filter(|u| u.is_angle())
        };
        Ok(Self {
            sides,
            angles,
            values: solver.values,
            unit,
            unknown,
            reference,
        })
    }

    pub fn value(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }

    pub fn is_given(&self, field: Field) -> bool {
        self.sides.contains_key(&field) || self.angles.contains_key(&field)
    }

    /// Every field has a value.
    pub fn is_determined(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// The given quantity, or the completed value in the triangle's unit.
    pub fn quantity(&self, field: Field) -> Option<Quantity> {
        match self.sides.get(&field) {
            Some(q) => Some(q.clone()),
            None => self
                .value(field)
                .map(|v| Quantity::new(v, self.unit.as_deref())),
        }
    }

    /// The given angle in its own notation, or the completed value in decimal degrees.
    pub fn angle(&self, field: Field) -> Option<Angle> {
        match self.angles.get(&field) {
            Some(a) => Some(*a),
            None => self.value(field).map(Angle::from_degrees),
        }
    }

    fn given_side_except(&self, skip: Field) -> Option<Field> {
        Field::SIDES
            .into_iter()
            .find(|&f| f != skip && self.sides.contains_key(&f))
    }

    fn need_quantity(&self, field: Field) -> Result<Quantity, StepError> {
        self.quantity(field)
            .ok_or_else(|| StepError::Invalid(format!("{field} is undetermined")))
    }

    fn need_angle(&self, field: Field) -> Result<Angle, StepError> {
        self.angle(field)
            .ok_or_else(|| StepError::Invalid(format!("{field} is undetermined")))
    }

    /// Worked derivation of the unknown. Empty when nothing is flagged or the triangle is
    /// underdetermined.
    pub fn derivation(&self, precision: usize) -> Result<Derivation, StepError> {
        let Some(unknown) = self.unknown else {
            return Ok(Derivation::new());
        };
        if !self.is_determined() {
            return Ok(Derivation::new());
        }
        match unknown {
            Field::A | Field::B | Field::C => self.side_steps(unknown, precision),
            Field::H => self.altitude_steps(precision),
            Field::Alpha | Field::Beta => self.angle_steps(unknown),
        }
    }

    fn side_steps(&self, side: Field, precision: usize) -> Result<Derivation, StepError> {
        let given_reference = self.reference.filter(|r| self.angles.contains_key(r));
        if let (Some(r), Some(k)) = (given_reference, self.given_side_except(side)) {
            return trig::solve_side(
                r.angle_name(),
                &self.need_angle(r)?,
                (role_of(r, k)?, &self.need_quantity(k)?),
                role_of(r, side)?,
                precision,
            );
        }

        let others: Vec<Field> = Field::SIDES
            .into_iter()
            .filter(|&f| f != side && self.sides.contains_key(&f))
            .collect();
        if others.len() == 2 {
            let q = |f| self.need_quantity(f);
            return match side {
                Field::C => Ok(pythagoras::hypotenuse(&q(Field::A)?, &q(Field::B)?, precision)),
                Field::A => pythagoras::leg("a", &q(Field::C)?, &q(Field::B)?, precision),
                _ => pythagoras::leg("b", &q(Field::C)?, &q(Field::A)?, precision),
            };
        }

        let r = self.reference.unwrap_or(Field::Alpha);
        let k = if side == Field::A { Field::B } else { Field::A };
        trig::solve_side(
            r.angle_name(),
            &self.need_angle(r)?,
            (role_of(r, k)?, &self.need_quantity(k)?),
            role_of(r, side)?,
            precision,
        )
    }

    fn angle_steps(&self, target: Field) -> Result<Derivation, StepError> {
        let given: Vec<Field> = Field::SIDES
            .into_iter()
            .filter(|f| self.sides.contains_key(f))
            .collect();
        if let [k1, k2, ..] = given[..] {
            return trig::solve_angle(
                target.angle_name(),
                (role_of(target, k1)?, self.need_quantity(k1)?.value),
                (role_of(target, k2)?, self.need_quantity(k2)?.value),
                DmsPrecision::Minutes,
            );
        }
        // In the sub-triangle cut off by the altitude, `h` faces the angle and the leg is its
        // hypotenuse.
        let leg = if target == Field::Alpha { Field::A } else { Field::B };
        if let (Some(h), Some(l)) = (self.sides.get(&Field::H), self.sides.get(&leg)) {
            return trig::solve_angle(
                target.angle_name(),
                (Role::Opp, h.value),
                (Role::Hyp, l.value),
                DmsPrecision::Minutes,
            );
        }
        trig::solve_angle(
            target.angle_name(),
            (role_of(target, Field::A)?, self.need_quantity(Field::A)?.value),
            (role_of(target, Field::B)?, self.need_quantity(Field::B)?.value),
            DmsPrecision::Minutes,
        )
    }

    fn altitude_steps(&self, precision: usize) -> Result<Derivation, StepError> {
        let given = |f: Field| self.sides.contains_key(&f);
        if !(given(Field::A) && given(Field::B)) {
            if given(Field::A) {
                return Ok(pythagoras::altitude_from_angle(
                    "a",
                    &self.need_quantity(Field::A)?,
                    AngleName::ALPHA,
                    &self.need_angle(Field::Alpha)?,
                    precision,
                ));
            }
            if given(Field::B) {
                return Ok(pythagoras::altitude_from_angle(
                    "b",
                    &self.need_quantity(Field::B)?,
                    AngleName::BETA,
                    &self.need_angle(Field::Beta)?,
                    precision,
                ));
            }
        }
        Ok(pythagoras::altitude_from_sides(
            &self.need_quantity(Field::A)?,
            &self.need_quantity(Field::B)?,
            &self.need_quantity(Field::C)?,
            precision,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    fn sides(list: &[(Field, &str)]) -> BTreeMap<Field, Quantity> {
        list.iter().map(|&(f, s)| (f, s.parse().unwrap())).collect()
    }

    fn angles(list: &[(Field, &str)]) -> BTreeMap<Field, Angle> {
        list.iter().map(|&(f, s)| (f, s.parse().unwrap())).collect()
    }

    fn assert_identities(s: &Solved) {
        let v = |f| s.value(f).unwrap();
        assert!(approx(v(Field::A).hypot(v(Field::B)), v(Field::C)));
        assert!(approx(v(Field::Alpha) + v(Field::Beta), 90.0));
        assert!(approx(v(Field::H) * v(Field::C), v(Field::A) * v(Field::B)));
    }

    #[test]
    fn test_two_legs() {
        let s = Solved::complete(sides(&[(Field::A, "3"), (Field::B, "4")]), BTreeMap::new(), Some(Field::C), 1e-3)
            .unwrap();
        assert!(s.is_determined());
        assert!(approx(s.value(Field::C).unwrap(), 5.0));
        assert!(approx(s.value(Field::H).unwrap(), 2.4));
        assert_identities(&s);
        assert_eq!(s.derivation(2).unwrap().last_text(), Some("c = 5.00"));
    }

    #[test]
    fn test_side_and_angle() {
        let s = Solved::complete(
            sides(&[(Field::A, "28 cm")]),
            angles(&[(Field::Alpha, "20°32'")]),
            Some(Field::B),
            1e-3,
        )
        .unwrap();
        assert_eq!(s.reference, Some(Field::Alpha));
        assert_eq!(s.unit(), Some("cm"));
        assert_identities(&s);
        let d = s.derivation(2).unwrap();
        assert_eq!(d.texts()[0], "tan(α) = opp / adj");
        assert_eq!(d.last_text(), Some("x = 10.49 cm"));
    }

    #[test]
    fn test_hypotenuse_and_altitude() {
        let s = Solved::complete(sides(&[(Field::C, "10"), (Field::H, "4.8")]), BTreeMap::new(), None, 1e-3)
            .unwrap();
        assert!(approx(s.value(Field::A).unwrap(), 8.0));
        assert!(approx(s.value(Field::B).unwrap(), 6.0));
        assert_identities(&s);
        assert!(s.derivation(2).unwrap().is_empty());
    }

    #[test]
    fn test_angle_from_altitude_and_leg() {
        let s = Solved::complete(sides(&[(Field::A, "10"), (Field::H, "5")]), BTreeMap::new(), Some(Field::Alpha), 1e-3)
            .unwrap();
        assert!(approx(s.value(Field::Alpha).unwrap(), 30.0));
        let d = s.derivation(2).unwrap();
        assert_eq!(d.texts()[1], "sin(α) = 5 / 10");
        assert_eq!(d.last_text(), Some("α = 30°0'"));
    }

    #[test]
    fn test_inconsistent_inputs_name_the_field() {
        let err = Solved::complete(
            sides(&[(Field::A, "3"), (Field::B, "4"), (Field::C, "6")]),
            BTreeMap::new(),
            None,
            1e-3,
        )
        .unwrap_err();
        assert!(matches!(&err, TriangleError::InconsistentTriangle { field, .. } if field == "c"));

        let err = Solved::complete(
            BTreeMap::new(),
            angles(&[(Field::Alpha, "30"), (Field::Beta, "50")]),
            None,
            1e-3,
        )
        .unwrap_err();
        assert!(err.to_string().contains("beta"));

        assert!(Solved::complete(sides(&[(Field::A, "5"), (Field::C, "4")]), BTreeMap::new(), None, 1e-3).is_err());
        assert!(Solved::complete(sides(&[(Field::A, "5")]), BTreeMap::new(), Some(Field::A), 1e-3).is_err());
    }

    #[test]
    fn test_underdetermined_keeps_what_it_has() {
        let s = Solved::complete(sides(&[(Field::A, "5")]), BTreeMap::new(), Some(Field::B), 1e-3).unwrap();
        assert!(!s.is_determined());
        assert_eq!(s.value(Field::A), Some(5.0));
        assert_eq!(s.value(Field::B), None);
        assert!(s.derivation(2).unwrap().is_empty());
    }

    #[test]
    fn test_roles_follow_reference() {
        assert_eq!(role(Field::Alpha, Field::B), Some(Role::Opp));
        assert_eq!(role(Field::Beta, Field::B), Some(Role::Adj));
        assert_eq!(role(Field::Alpha, Field::H), None);
        assert_eq!(side_for(Field::Beta, Role::Opp), Field::A);
        assert_eq!(side_for(Field::Alpha, Role::Hyp), Field::C);
    }
}
