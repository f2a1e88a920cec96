//! Scene graph abstractions.
//!
//! This module follows manim's mental model:
//! - You build a scene out of objects ("mobjects"), here called blocks.
//! - Blocks form a tree: a math block holds glyph runs, a run holds glyphs.
//! - Geometry is stored as vector outlines (`lyon::path::Path`) in **world units**.
//!
//! Design goals:
//! - Outlines are baked in world space. `shift`/`scale`/`rotate` rewrite the points of the
//!   whole subtree, like manim does, so every node can answer "where am I on screen" without
//!   walking parent transforms.
//! - `Affine2` is the single tool used to move geometry around.
//! - The arena (`Scene2D`) owns every node; everything else holds `ObjectId`s. This keeps
//!   back-references (labels pointing at triangle vertices, annotations pointing at glyphs)
//!   free of ownership cycles.
//!
//! Coordinate convention:
//! - y-up, origin at the frame center.
//! - Units follow the layout config (the default frame is 14.2 x 8.0 units).

pub mod arena;
pub mod shapes;

use lyon::math::{Point, point};
use lyon::path::{Path, PathEvent};
use serde::{Deserialize, Serialize};

pub use arena::{Node, ObjectId, Scene2D};

/// Unit direction vectors (manim's `UP`, `DOWN`, ...).
pub const UP: [f32; 2] = [0.0, 1.0];
pub const DOWN: [f32; 2] = [0.0, -1.0];
pub const LEFT: [f32; 2] = [-1.0, 0.0];
pub const RIGHT: [f32; 2] = [1.0, 0.0];
pub const ORIGIN: [f32; 2] = [0.0, 0.0];

/// 2D affine transform stored as a 3x3 matrix in column-major order.
///
/// Convention:
/// - Column vectors (x, y, 1)
/// - `a.mul(b)` applies `b` first, then `a`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2 {
    /// Column-major 3x3 matrix.
    pub m: [[f32; 3]; 3],
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    #[inline]
    pub fn translate(tx: f32, ty: f32) -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [tx, ty, 1.0]],
        }
    }

    #[inline]
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    #[inline]
    pub fn rotate(rad: f32) -> Self {
        let (s, c) = rad.sin_cos();
        Self {
            m: [[c, s, 0.0], [-s, c, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Compose transforms: `self * rhs` (rhs applies first).
    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        let a = self.m;
        let b = rhs.m;

        let mut out = [[0.0f32; 3]; 3];
        for col in 0..3 {
            for row in 0..3 {
                out[col][row] =
                    a[0][row] * b[col][0] + a[1][row] * b[col][1] + a[2][row] * b[col][2];
            }
        }
        Self { m: out }
    }

    /// Conjugate `self` so it acts around `pivot` instead of the origin.
    #[inline]
    pub fn about(self, pivot: [f32; 2]) -> Self {
        Affine2::translate(pivot[0], pivot[1])
            .mul(self)
            .mul(Affine2::translate(-pivot[0], -pivot[1]))
    }

    #[inline]
    pub fn transform_point(self, x: f32, y: f32) -> (f32, f32) {
        let nx = self.m[0][0] * x + self.m[1][0] * y + self.m[2][0];
        let ny = self.m[0][1] * x + self.m[1][1] * y + self.m[2][1];
        (nx, ny)
    }

    #[inline]
    fn map(self, p: Point) -> Point {
        let (x, y) = self.transform_point(p.x, p.y);
        point(x, y)
    }
}

/// Axis-aligned bounding box in world units.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Aabb2 {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Aabb2 {
    #[inline]
    pub fn from_min_max(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY, f32::INFINITY],
            max: [f32::NEG_INFINITY, f32::NEG_INFINITY],
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    #[inline]
    pub fn include_point(&mut self, p: [f32; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    #[inline]
    pub fn center(&self) -> [f32; 2] {
        if self.is_empty() {
            return ORIGIN;
        }
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
        ]
    }

    #[inline]
    pub fn size(&self) -> [f32; 2] {
        if self.is_empty() {
            return [0.0, 0.0];
        }
        [self.max[0] - self.min[0], self.max[1] - self.min[1]]
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size()[0]
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size()[1]
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.max[1]
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.min[1]
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.min[0]
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.max[0]
    }

    /// The point on the box boundary in `direction` (manim's `get_critical_point`).
    ///
    /// Each axis picks max for a positive component, min for a negative one, center for 0.
    pub fn critical_point(&self, direction: [f32; 2]) -> [f32; 2] {
        let c = self.center();
        let pick = |axis: usize| {
            if direction[axis] > 0.0 {
                self.max[axis]
            } else if direction[axis] < 0.0 {
                self.min[axis]
            } else {
                c[axis]
            }
        };
        [pick(0), pick(1)]
    }
}

/// Simple RGBA color (components in 0..1).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const GRAY: Self = Self::rgb(0.53, 0.53, 0.53);
    pub const YELLOW: Self = Self::rgb(1.0, 1.0, 0.0);
    pub const GOLD: Self = Self::rgb(0.94, 0.67, 0.26);
    pub const ORANGE: Self = Self::rgb(1.0, 0.53, 0.24);
    pub const RED: Self = Self::rgb(0.99, 0.38, 0.33);
    pub const GREEN: Self = Self::rgb(0.51, 0.76, 0.4);
    pub const TEAL: Self = Self::rgb(0.36, 0.81, 0.7);
    pub const BLUE: Self = Self::rgb(0.35, 0.76, 0.92);
    pub const PURPLE: Self = Self::rgb(0.6, 0.4, 0.8);

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[inline]
    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a.clamp(0.0, 1.0);
        self
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if digits.len() == 8 { channel(6)? } else { 1.0 },
        })
    }
}

/// How a node's outline is painted.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Style {
    pub color: Rgba,
    /// Stroke width in world units; `0.0` means fill only.
    pub stroke_width: f32,
    /// Fill the closed contours of the outline.
    pub filled: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Rgba::WHITE,
            stroke_width: 0.04,
            filled: false,
        }
    }
}

/// An owned block tree, used to build geometry before it is inserted into a [`Scene2D`].
///
/// Renderers and shape constructors produce these; [`Scene2D::insert`] moves them into the
/// arena and hands back an [`ObjectId`].
#[derive(Debug, Clone)]
pub struct Mobject2D {
    pub name: String,
    pub z: i32,
    pub style: Style,
    pub hidden: bool,
    pub outline: Option<Path>,
    pub children: Vec<Mobject2D>,
}

impl Default for Mobject2D {
    fn default() -> Self {
        Self {
            name: "mobject".to_string(),
            z: 0,
            style: Style::default(),
            hidden: false,
            outline: None,
            children: Vec::new(),
        }
    }
}

impl Mobject2D {
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_outline(mut self, outline: Path) -> Self {
        self.outline = Some(outline);
        self
    }

    #[inline]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Set the color of this node and every descendant.
    pub fn with_color(mut self, color: Rgba) -> Self {
        self.set_color(color);
        self
    }

    #[inline]
    pub fn with_z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    #[inline]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[inline]
    pub fn add_child(&mut self, child: Mobject2D) {
        self.children.push(child);
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Mobject2D>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn set_color(&mut self, color: Rgba) {
        self.style.color = color;
        for child in &mut self.children {
            child.set_color(color);
        }
    }

    /// Rewrite every outline in this subtree through `xf`.
    pub fn apply_transform(&mut self, xf: Affine2) {
        if let Some(outline) = &self.outline {
            self.outline = Some(transform_path(outline, xf));
        }
        for child in &mut self.children {
            child.apply_transform(xf);
        }
    }

    pub fn shift(&mut self, by: [f32; 2]) {
        self.apply_transform(Affine2::translate(by[0], by[1]));
    }

    /// Uniform scale around the current bounds center.
    pub fn scale(&mut self, factor: f32) {
        let c = self.bounds().center();
        self.apply_transform(Affine2::scale(factor, factor).about(c));
    }

    pub fn move_to(&mut self, target: [f32; 2]) {
        let c = self.bounds().center();
        self.shift([target[0] - c[0], target[1] - c[1]]);
    }

    /// Bounds over all outlines in this subtree.
    pub fn bounds(&self) -> Aabb2 {
        let mut bounds = self
            .outline
            .as_ref()
            .map(path_bounds)
            .unwrap_or_else(Aabb2::empty);
        for child in &self.children {
            bounds = bounds.union(child.bounds());
        }
        bounds
    }

    /// Outlined nodes of this subtree in pre-order (the glyph order of a rendered block).
    pub fn leaves(&self) -> Vec<&Mobject2D> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(m: &'a Mobject2D, out: &mut Vec<&'a Mobject2D>) {
    if m.outline.is_some() {
        out.push(m);
    }
    for child in &m.children {
        collect_leaves(child, out);
    }
}

/// Rebuild `path` with every point (including control points) mapped through `xf`.
pub fn transform_path(path: &Path, xf: Affine2) -> Path {
    let mut b = Path::builder();
    for evt in path.iter() {
        match evt {
            PathEvent::Begin { at } => {
                b.begin(xf.map(at));
            }
            PathEvent::Line { to, .. } => {
                b.line_to(xf.map(to));
            }
            PathEvent::Quadratic { ctrl, to, .. } => {
                b.quadratic_bezier_to(xf.map(ctrl), xf.map(to));
            }
            PathEvent::Cubic {
                ctrl1, ctrl2, to, ..
            } => {
                b.cubic_bezier_to(xf.map(ctrl1), xf.map(ctrl2), xf.map(to));
            }
            PathEvent::End { close, .. } => b.end(close),
        }
    }
    b.build()
}

/// Conservative bounds of a path (control points included).
pub fn path_bounds(path: &Path) -> Aabb2 {
    let mut bounds = Aabb2::empty();
    for (_, p) in path_points(path) {
        bounds.include_point(p);
    }
    bounds
}

/// Flatten a path into `(verb, point)` pairs in drawing order.
///
/// Verbs: `M` begin, `L` line end, `Q` quadratic control/end, `C` cubic control/end,
/// `Z` closing segment. End events of open subpaths produce nothing.
pub fn path_points(path: &Path) -> Vec<(char, [f32; 2])> {
    let mut out = Vec::new();
    for evt in path.iter() {
        match evt {
            PathEvent::Begin { at } => out.push(('M', [at.x, at.y])),
            PathEvent::Line { to, .. } => out.push(('L', [to.x, to.y])),
            PathEvent::Quadratic { ctrl, to, .. } => {
                out.push(('Q', [ctrl.x, ctrl.y]));
                out.push(('Q', [to.x, to.y]));
            }
            PathEvent::Cubic {
                ctrl1, ctrl2, to, ..
            } => {
                out.push(('C', [ctrl1.x, ctrl1.y]));
                out.push(('C', [ctrl2.x, ctrl2.y]));
                out.push(('C', [to.x, to.y]));
            }
            PathEvent::End { first, close, .. } => {
                if close {
                    out.push(('Z', [first.x, first.y]));
                }
            }
        }
    }
    out
}

/// Euclidean length of a 2D vector.
#[inline]
pub fn norm(v: [f32; 2]) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

/// `v` scaled to unit length (zero stays zero).
#[inline]
pub fn normalize(v: [f32; 2]) -> [f32; 2] {
    let n = norm(v);
    if n < 1e-9 { [0.0, 0.0] } else { [v[0] / n, v[1] / n] }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Path {
        let mut b = Path::builder();
        b.begin(point(0.0, 0.0));
        b.line_to(point(1.0, 0.0));
        b.line_to(point(1.0, 1.0));
        b.line_to(point(0.0, 1.0));
        b.close();
        b.build()
    }

    #[test]
    fn test_affine_about_pivot() {
        let xf = Affine2::scale(2.0, 2.0).about([1.0, 1.0]);
        let (x, y) = xf.transform_point(1.0, 1.0);
        assert!((x - 1.0).abs() < 1e-6 && (y - 1.0).abs() < 1e-6);
        let (x, y) = xf.transform_point(2.0, 1.0);
        assert!((x - 3.0).abs() < 1e-6 && (y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_transform_path_moves_bounds() {
        let moved = transform_path(&unit_square(), Affine2::translate(2.0, -1.0));
        let b = path_bounds(&moved);
        assert_eq!(b.min, [2.0, -1.0]);
        assert_eq!(b.max, [3.0, 0.0]);
    }

    #[test]
    fn test_path_points_include_close() {
        let pts = path_points(&unit_square());
        assert_eq!(pts.first().map(|p| p.0), Some('M'));
        assert_eq!(pts.last().map(|p| p.0), Some('Z'));
        assert_eq!(pts.len(), 5);
    }

    #[test]
    fn test_mobject_bounds_union_children() {
        let mut parent = Mobject2D::new("parent").with_outline(unit_square());
        let mut child = Mobject2D::new("child").with_outline(unit_square());
        child.shift([3.0, 0.0]);
        parent.add_child(child);
        let b = parent.bounds();
        assert_eq!(b.min, [0.0, 0.0]);
        assert_eq!(b.max, [4.0, 1.0]);
        assert_eq!(parent.leaves().len(), 2);
    }

    #[test]
    fn test_critical_point() {
        let b = Aabb2::from_min_max([0.0, 0.0], [2.0, 4.0]);
        assert_eq!(b.critical_point(UP), [1.0, 4.0]);
        assert_eq!(b.critical_point([1.0, -1.0]), [2.0, 0.0]);
    }

    #[test]
    fn test_rgba_from_hex() {
        let c = Rgba::from_hex("#ff0000").unwrap();
        assert_eq!(c, Rgba::rgb(1.0, 0.0, 0.0));
        assert!(Rgba::from_hex("#zz0000").is_none());
        assert!(Rgba::from_hex("#fff").is_none());
    }
}
