//! Right triangles built from partial descriptors.
//!
//! A [`Descriptor`] names some of the sides, angles and altitude as strings (`"28 cm"`,
//! `"20°32'"`), flags at most one unknown, and picks the corner holding the right angle.
//! [`RightTriangle::build`] completes the missing values, draws the polygon with side and angle
//! labels into a scene, and keeps the derivation of the unknown for the lesson steps.

mod draw;
mod solve;

use std::collections::BTreeMap;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{LayoutConfig, TriangleConfig};
use crate::layout::LabeledStep;
use crate::scene::{Mobject2D, ObjectId, Rgba, Scene2D, norm, normalize, shapes};
use crate::steps::format::{SIG_FIGS, fmt_sig};
use crate::steps::trig::Role;
use crate::steps::{Derivation, StepError};
use crate::tex::{MathRenderer, MathStyle, TexError};

pub use draw::{VERTEX_ALPHA, VERTEX_BETA, VERTEX_C, VERTEX_FOOT, Vertices, label_direction};
pub use solve::{Field, Solved, role, side_for};

#[derive(thiserror::Error, Debug)]
pub enum TriangleError {
    #[error("inconsistent triangle: {field} {reason}")]
    InconsistentTriangle { field: String, reason: String },

    #[error("cannot read triangle field {field}: {source}")]
    Parse { field: String, source: StepError },

    #[error("derivation failed: {0}")]
    Steps(#[from] StepError),

    #[error(transparent)]
    Tex(#[from] TexError),
}

impl TriangleError {
    pub(crate) fn inconsistent(field: Field, reason: impl Into<String>) -> Self {
        Self::InconsistentTriangle {
            field: field.name().to_string(),
            reason: reason.into(),
        }
    }

    fn parse(field: &str, source: StepError) -> Self {
        Self::Parse {
            field: field.to_string(),
            source,
        }
    }
}

/// Where the right angle is drawn.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    #[default]
    BottomLeft,
    BottomRight,
    /// Hypotenuse at the bottom, altitude dropped from the right angle.
    PerpendicularFoot,
}

impl Corner {
    /// Rotation applied to the bottom-left layout.
    pub fn rotation(self) -> f32 {
        use std::f32::consts::{FRAC_PI_2, PI};
        match self {
            Corner::BottomLeft | Corner::PerpendicularFoot => 0.0,
            Corner::BottomRight => FRAC_PI_2,
            Corner::TopRight => PI,
            Corner::TopLeft => 3.0 * FRAC_PI_2,
        }
    }
}

impl FromStr for Corner {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "top_left" => Ok(Corner::TopLeft),
            "top_right" => Ok(Corner::TopRight),
            "bottom_left" => Ok(Corner::BottomLeft),
            "bottom_right" => Ok(Corner::BottomRight),
            "perpendicular_foot" => Ok(Corner::PerpendicularFoot),
            other => Err(StepError::Parse(format!("unknown corner {other:?}"))),
        }
    }
}

/// Partial description of a right triangle, as lesson scripts write it.
///
/// `unknown` accepts a field name (`a`, `b`, `c`, `h`, `alpha`/`α`, `beta`/`β`) or a role
/// (`opp`, `adj`, `hyp`) relative to the given angle, α first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Descriptor {
    pub a: Option<String>,
    pub b: Option<String>,
    pub c: Option<String>,
    pub h: Option<String>,
    pub alpha: Option<String>,
    pub beta: Option<String>,
    pub unknown: Option<String>,
    pub right_angle: Corner,
}

impl Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn a(mut self, v: &str) -> Self {
        self.a = Some(v.to_string());
        self
    }

    pub fn b(mut self, v: &str) -> Self {
        self.b = Some(v.to_string());
        self
    }

    pub fn c(mut self, v: &str) -> Self {
        self.c = Some(v.to_string());
        self
    }

    pub fn h(mut self, v: &str) -> Self {
        self.h = Some(v.to_string());
        self
    }

    pub fn alpha(mut self, v: &str) -> Self {
        self.alpha = Some(v.to_string());
        self
    }

    pub fn beta(mut self, v: &str) -> Self {
        self.beta = Some(v.to_string());
        self
    }

    pub fn unknown(mut self, v: &str) -> Self {
        self.unknown = Some(v.to_string());
        self
    }

    pub fn right_angle(mut self, corner: Corner) -> Self {
        self.right_angle = corner;
        self
    }

    /// Parse every field and complete the triangle.
    pub fn solve(&self, tolerance: f64) -> Result<Solved, TriangleError> {
        let mut sides = BTreeMap::new();
        for (field, src) in [
            (Field::A, &self.a),
            (Field::B, &self.b),
            (Field::C, &self.c),
            (Field::H, &self.h),
        ] {
            if let Some(s) = src {
                let q = s.parse().map_err(|e| TriangleError::parse(field.name(), e))?;
                sides.insert(field, q);
            }
        }
        let mut angles = BTreeMap::new();
        for (field, src) in [(Field::Alpha, &self.alpha), (Field::Beta, &self.beta)] {
            if let Some(s) = src {
                let a = s.parse().map_err(|e| TriangleError::parse(field.name(), e))?;
                angles.insert(field, a);
            }
        }

        let unknown = match self.unknown.as_deref().map(str::trim) {
            None => None,
            Some(u) => Some(self.resolve_unknown(u)?),
        };
        Solved::complete(sides, angles, unknown, tolerance)
    }

    fn resolve_unknown(&self, name: &str) -> Result<Field, TriangleError> {
        let role = match name {
            "opp" | "opposite" => Role::Opp,
            "adj" | "adjacent" => Role::Adj,
            "hyp" | "hypotenuse" => Role::Hyp,
            other => return other.parse().map_err(|e| TriangleError::parse("unknown", e)),
        };
        let reference = if self.alpha.is_some() {
            Field::Alpha
        } else if self.beta.is_some() {
            Field::Beta
        } else if role == Role::Hyp {
            Field::Alpha
        } else {
            return Err(TriangleError::parse(
                "unknown",
                StepError::Invalid(format!("{name:?} needs a given angle")),
            ));
        };
        Ok(side_for(reference, role))
    }

    /// The corner actually drawn: the perpendicular-foot layout needs the altitude in play.
    fn effective_corner(&self) -> Corner {
        let altitude_in_play = self.h.is_some() || self.unknown.as_deref().map(str::trim) == Some("h");
        match self.right_angle {
            Corner::PerpendicularFoot if !altitude_in_play => Corner::BottomLeft,
            c => c,
        }
    }
}

/// A built triangle: the scene block, its named pieces and the derivation of the unknown.
#[derive(Debug, Clone)]
pub struct RightTriangle {
    id: ObjectId,
    components: BTreeMap<String, ObjectId>,
    solved: Solved,
    corner: Corner,
    vertices: Vertices,
    /// Center of the polygon when the vertices were laid out.
    laid_out_center: [f32; 2],
    derivation: Derivation,
    unknown_color: Rgba,
}

fn side_tex(value: f64, unit: Option<&str>) -> String {
    let v = fmt_sig(value, SIG_FIGS);
    match unit {
        Some(u) => format!(r"{v}\text{{ {u}}}"),
        None => v,
    }
}

struct Builder<'a> {
    scene: &'a mut Scene2D,
    renderer: &'a dyn MathRenderer,
    config: &'a TriangleConfig,
    root: ObjectId,
    components: BTreeMap<String, ObjectId>,
}

impl Builder<'_> {
    fn add(&mut self, name: String, m: Mobject2D) -> ObjectId {
        let id = self.scene.insert_child(self.root, m);
        self.components.insert(name, id);
        id
    }

    fn label(&mut self, name: String, tex: &str, color: Rgba) -> Result<ObjectId, TriangleError> {
        let mut m = self.renderer.render_math(&[tex], MathStyle::Display, None)?;
        m.scale(self.config.label_scale);
        m.set_color(color);
        m.name = name.clone();
        Ok(self.add(name, m))
    }

    fn role_label(&mut self, name: String, role: Role) -> Result<ObjectId, TriangleError> {
        let mut m = self.renderer.render_text(role.name())?;
        m.scale(self.config.label_scale * 0.8);
        m.set_color(Rgba::GRAY);
        m.name = name.clone();
        Ok(self.add(name, m))
    }
}

impl RightTriangle {
    /// Complete `descriptor`, draw it into `scene` and derive the unknown.
    ///
    /// The block is inserted off stage. Underdetermined descriptors yield a triangle with only
    /// the given labels and no derivation.
    pub fn build(
        descriptor: &Descriptor,
        scene: &mut Scene2D,
        renderer: &dyn MathRenderer,
        config: &TriangleConfig,
    ) -> Result<Self, TriangleError> {
        let solved = descriptor.solve(config.tolerance)?;
        let derivation = solved.derivation(config.precision)?;
        let corner = descriptor.effective_corner();

        let (a, b) = Self::drawn_legs(&solved);
        let vertices = Vertices::layout(a, b, corner, config.max_side);

        let root = scene.insert(Mobject2D::new("RightTriangle"));
        let mut builder = Builder {
            scene: &mut *scene,
            renderer,
            config,
            root,
            components: BTreeMap::new(),
        };

        let polygon = shapes::polygon(&vertices.triangle()).with_color(config.stroke);
        let polygon_id = builder.add("polygon".to_string(), polygon);

        let altitude_in_play = corner == Corner::PerpendicularFoot
            || solved.is_given(Field::H)
            || solved.unknown == Some(Field::H);
        if altitude_in_play {
            let alt = shapes::line(vertices.get(VERTEX_C), vertices.get(VERTEX_FOOT))
                .with_color(config.stroke);
            builder.add("altitude".to_string(), alt);
        }

        let marker = if corner == Corner::PerpendicularFoot {
            shapes::right_angle_marker(
                vertices.get(VERTEX_FOOT),
                vertices.get(VERTEX_C),
                vertices.get(VERTEX_ALPHA),
                config.right_angle_size,
            )
        } else {
            shapes::right_angle_marker(
                vertices.get(VERTEX_C),
                vertices.get(VERTEX_ALPHA),
                vertices.get(VERTEX_BETA),
                config.right_angle_size,
            )
        };
        builder.add("right_angle".to_string(), marker.with_color(config.stroke));

        let mut sides = vec![Field::A, Field::B, Field::C];
        if altitude_in_play {
            sides.push(Field::H);
        }
        for side in sides {
            Self::label_side(&mut builder, &vertices, corner, &solved, side)?;
        }
        for angle in [Field::Alpha, Field::Beta] {
            Self::label_angle(&mut builder, &vertices, &solved, angle)?;
        }

        let components = builder.components;
        let laid_out_center = scene.center(polygon_id);
        debug!(
            "triangle built: corner {:?}, unknown {:?}, {} components, {} derivation lines",
            corner,
            solved.unknown,
            components.len(),
            derivation.len()
        );
        Ok(Self {
            id: root,
            components,
            solved,
            corner,
            vertices,
            laid_out_center,
            derivation,
            unknown_color: config.unknown_color,
        })
    }

    /// Leg lengths to draw; a representative shape when the triangle is underdetermined.
    fn drawn_legs(solved: &Solved) -> (f64, f64) {
        let v = |f| solved.value(f);
        match (v(Field::A), v(Field::B), v(Field::Alpha), v(Field::C)) {
            (Some(a), Some(b), _, _) => (a, b),
            (_, _, Some(alpha), _) => (alpha.to_radians().cos(), alpha.to_radians().sin()),
            (Some(a), None, None, _) => (a, a * 0.75),
            (None, Some(b), None, _) => (b / 0.75, b),
            (None, None, None, Some(c)) => (c * 0.8, c * 0.6),
            _ => (4.0, 3.0),
        }
    }

    fn label_side(
        b: &mut Builder<'_>,
        vertices: &Vertices,
        corner: Corner,
        solved: &Solved,
        side: Field,
    ) -> Result<(), TriangleError> {
        let Some(segment) = Vertices::segment(side) else {
            return Ok(());
        };
        let dir = label_direction(vertices, corner, side);
        let mid = vertices.midpoint(segment);
        let buff = b.config.label_buff;

        let value = if solved.unknown == Some(side) {
            Some(b.label(format!("label_{side}"), "x", b.config.unknown_color)?)
        } else if solved.is_given(side) {
            let v = solved.value(side).unwrap_or_default();
            let tex = side_tex(v, solved.unit());
            Some(b.label(format!("label_{side}"), &tex, b.config.known_color)?)
        } else {
            None
        };
        if let Some(id) = value {
            b.scene.next_to_point(id, mid, dir, buff);
        }

        let Some(r) = solved.reference.and_then(|r| role(r, side)) else {
            return Ok(());
        };
        let rid = b.role_label(format!("role_{side}"), r)?;
        match value {
            Some(v) => b.scene.next_to(rid, v, dir, buff * 0.4),
            None => b.scene.next_to_point(rid, mid, dir, buff),
        }
        Ok(())
    }

    fn label_angle(
        b: &mut Builder<'_>,
        vertices: &Vertices,
        solved: &Solved,
        angle: Field,
    ) -> Result<(), TriangleError> {
        let unknown = solved.unknown == Some(angle);
        if !unknown && !solved.is_given(angle) {
            return Ok(());
        }
        let Some(v) = Vertices::vertex_of(angle) else {
            return Ok(());
        };
        let other = if v == VERTEX_ALPHA { VERTEX_BETA } else { VERTEX_ALPHA };
        let cfg = b.config;

        let arc = shapes::angle_arc(vertices.get(v), vertices.get(VERTEX_C), vertices.get(other), cfg.arc_radius);
        b.add(format!("arc_{angle}"), arc.with_color(cfg.stroke));

        let (tex, color) = match solved.angle(angle) {
            Some(a) if !unknown => (a.to_string(), cfg.known_color),
            _ => {
                let tex = if angle == Field::Alpha { r"\alpha" } else { r"\beta" };
                (tex.to_string(), cfg.unknown_color)
            }
        };
        let id = b.label(format!("label_{angle}"), &tex, color)?;

        let bisector = vertices.bisector(v, VERTEX_C, other);
        let size = b.scene.bounds(id).size();
        if size[0] <= cfg.long_label_width {
            let reach = cfg.arc_radius + cfg.label_buff + size[0].max(size[1]) * 0.5;
            b.scene.move_to(id, vertices.offset(v, bisector, reach));
            return Ok(());
        }

        // Too wide for the corner: park it outside and point back at the arc.
        let outward = normalize([
            vertices.get(v)[0] - vertices.centroid()[0],
            vertices.get(v)[1] - vertices.centroid()[1],
        ]);
        let half = norm(size) * 0.5;
        let center = vertices.offset(v, outward, cfg.long_label_offset + half);
        b.scene.move_to(id, center);

        let arc_mid = vertices.offset(v, bisector, cfg.arc_radius);
        let toward = normalize([arc_mid[0] - center[0], arc_mid[1] - center[1]]);
        let start = [center[0] + toward[0] * half, center[1] + toward[1] * half];
        let arrow = shapes::curved_arrow(start, arc_mid, 0.6).with_color(color);
        b.add(format!("arrow_{angle}"), arrow);
        Ok(())
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// A named piece: `polygon`, `right_angle`, `altitude`, `label_<field>`, `role_<side>`,
    /// `arc_<angle>`, `arrow_<angle>`.
    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.components.get(name).copied()
    }

    pub fn components(&self) -> &BTreeMap<String, ObjectId> {
        &self.components
    }

    /// Label of the unknown, if one is flagged.
    pub fn unknown_label(&self) -> Option<ObjectId> {
        self.solved
            .unknown
            .and_then(|f| self.get(&format!("label_{f}")))
    }

    pub fn unknown_color(&self) -> Rgba {
        self.unknown_color
    }

    pub fn solved(&self) -> &Solved {
        &self.solved
    }

    pub fn corner(&self) -> Corner {
        self.corner
    }

    /// Current position of a `VERTEX_*` point, following any shift of the block since build.
    pub fn vertex(&self, scene: &Scene2D, index: usize) -> [f32; 2] {
        let p = self.vertices.get(index);
        let now = self
            .get("polygon")
            .map(|id| scene.center(id))
            .unwrap_or(self.laid_out_center);
        [
            p[0] + now[0] - self.laid_out_center[0],
            p[1] + now[1] - self.laid_out_center[1],
        ]
    }

    pub fn derivation(&self) -> &Derivation {
        &self.derivation
    }

    /// Derivation lines of the unknown, in order.
    pub fn get_steps(&self) -> Vec<String> {
        self.derivation.texts()
    }

    /// The derivation as a labeled step.
    pub fn to_step(&self, caption: Option<&str>, config: LayoutConfig) -> LabeledStep {
        self.derivation.to_step(caption, config)
    }
}
