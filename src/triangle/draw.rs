//! Vertex layout and label placement.

use crate::scene::{DOWN, LEFT, RIGHT, UP, normalize};

use super::Corner;
use super::solve::Field;

pub const VERTEX_C: usize = 0;
pub const VERTEX_ALPHA: usize = 1;
pub const VERTEX_BETA: usize = 2;
/// Foot of the altitude from `C` on the hypotenuse.
pub const VERTEX_FOOT: usize = 3;

/// Triangle corners in world space, indexed by the `VERTEX_*` constants.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertices {
    points: [[f32; 2]; 4],
}

fn rotate(p: [f32; 2], rad: f32) -> [f32; 2] {
    let (s, c) = rad.sin_cos();
    [p[0] * c - p[1] * s, p[0] * s + p[1] * c]
}

fn sub(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

fn add_scaled(a: [f32; 2], v: [f32; 2], k: f32) -> [f32; 2] {
    [a[0] + v[0] * k, a[1] + v[1] * k]
}

impl Vertices {
    /// Lay out legs `a` and `b` scaled so the hypotenuse is `max_side`, centered on the origin.
    pub fn layout(a: f64, b: f64, corner: Corner, max_side: f32) -> Self {
        let c = a.hypot(b);
        let k = if c > 0.0 { max_side as f64 / c } else { 1.0 };
        let (a, b, c) = ((a * k) as f32, (b * k) as f32, (c * k) as f32);

        let mut points = if corner == Corner::PerpendicularFoot {
            // Hypotenuse along the bottom, right angle on top.
            let (cos, sin) = (a / c, b / c);
            let apex = [c - a * cos, a * sin];
            [apex, [c, 0.0], [0.0, 0.0], [apex[0], 0.0]]
        } else {
            let rad = corner.rotation();
            let (pc, pa, pb) = ([0.0, 0.0], rotate([a, 0.0], rad), rotate([0.0, b], rad));
            [pc, pa, pb, foot(pc, pa, pb)]
        };

        let (mut min, mut max) = ([f32::MAX; 2], [f32::MIN; 2]);
        for p in &points[..3] {
            for axis in 0..2 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        let center = [(min[0] + max[0]) * 0.5, (min[1] + max[1]) * 0.5];
        for p in &mut points {
            *p = sub(*p, center);
        }
        Self { points }
    }

    pub fn get(&self, index: usize) -> [f32; 2] {
        self.points[index.min(VERTEX_FOOT)]
    }

    pub fn triangle(&self) -> [[f32; 2]; 3] {
        [self.points[VERTEX_C], self.points[VERTEX_ALPHA], self.points[VERTEX_BETA]]
    }

    pub fn centroid(&self) -> [f32; 2] {
        let [p, q, r] = self.triangle();
        [(p[0] + q[0] + r[0]) / 3.0, (p[1] + q[1] + r[1]) / 3.0]
    }

    /// Endpoints of the segment drawn for `field`, or `None` for angles.
    pub fn segment(field: Field) -> Option<(usize, usize)> {
        match field {
            Field::A => Some((VERTEX_C, VERTEX_ALPHA)),
            Field::B => Some((VERTEX_C, VERTEX_BETA)),
            Field::C => Some((VERTEX_ALPHA, VERTEX_BETA)),
            Field::H => Some((VERTEX_C, VERTEX_FOOT)),
            Field::Alpha | Field::Beta => None,
        }
    }

    /// Vertex carrying an angle field.
    pub fn vertex_of(field: Field) -> Option<usize> {
        match field {
            Field::Alpha => Some(VERTEX_ALPHA),
            Field::Beta => Some(VERTEX_BETA),
            _ => None,
        }
    }

    pub fn midpoint(&self, (i, j): (usize, usize)) -> [f32; 2] {
        let (p, q) = (self.get(i), self.get(j));
        [(p[0] + q[0]) * 0.5, (p[1] + q[1]) * 0.5]
    }

    /// Unit normal of segment `(i, j)` pointing away from `away_from`.
    pub fn outward_normal(&self, (i, j): (usize, usize), away_from: [f32; 2]) -> [f32; 2] {
        let d = sub(self.get(j), self.get(i));
        let n = normalize([-d[1], d[0]]);
        let m = self.midpoint((i, j));
        let to_inside = sub(away_from, m);
        if n[0] * to_inside[0] + n[1] * to_inside[1] > 0.0 {
            [-n[0], -n[1]]
        } else {
            n
        }
    }

    /// Unit bisector of the interior angle at vertex `v` between vertices `p` and `q`.
    pub fn bisector(&self, v: usize, p: usize, q: usize) -> [f32; 2] {
        let o = self.get(v);
        let u1 = normalize(sub(self.get(p), o));
        let u2 = normalize(sub(self.get(q), o));
        normalize([u1[0] + u2[0], u1[1] + u2[1]])
    }

    /// The point `distance` from vertex `v` along `dir`.
    pub fn offset(&self, v: usize, dir: [f32; 2], distance: f32) -> [f32; 2] {
        add_scaled(self.get(v), dir, distance)
    }
}

fn foot(c: [f32; 2], p: [f32; 2], q: [f32; 2]) -> [f32; 2] {
    let d = sub(q, p);
    let len2 = d[0] * d[0] + d[1] * d[1];
    if len2 == 0.0 {
        return p;
    }
    let t = ((c[0] - p[0]) * d[0] + (c[1] - p[1]) * d[1]) / len2;
    add_scaled(p, d, t)
}

/// Which way a leg's label leans for each right-angle corner.
fn leg_edge(corner: Corner, side: Field) -> Option<[f32; 2]> {
    use Corner::*;
    match (corner, side) {
        (BottomLeft, Field::A) | (BottomRight, Field::B) => Some(DOWN),
        (BottomLeft, Field::B) | (TopLeft, Field::A) => Some(LEFT),
        (BottomRight, Field::A) | (TopRight, Field::B) => Some(RIGHT),
        (TopRight, Field::A) | (TopLeft, Field::B) => Some(UP),
        _ => None,
    }
}

/// Direction a side label is pushed from its segment's midpoint.
pub fn label_direction(vertices: &Vertices, corner: Corner, side: Field) -> [f32; 2] {
    if let Some(d) = leg_edge(corner, side) {
        return d;
    }
    let Some(segment) = Vertices::segment(side) else {
        return DOWN;
    };
    let away_from = if side == Field::H {
        vertices.get(VERTEX_ALPHA)
    } else {
        vertices.centroid()
    };
    snap(vertices.outward_normal(segment, away_from))
}

/// Zero out near-zero components so edge alignment picks the box center on that axis.
fn snap(v: [f32; 2]) -> [f32; 2] {
    let s = |x: f32| if x.abs() < 1e-3 { 0.0 } else { x };
    [s(v[0]), s(v[1])]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(p: [f32; 2], q: [f32; 2]) -> f32 {
        crate::scene::norm(sub(q, p))
    }

    fn close(p: [f32; 2], q: [f32; 2]) -> bool {
        distance(p, q) < 1e-4
    }

    #[test]
    fn test_right_angle_sits_in_corner() {
        for (corner, sx, sy) in [
            (Corner::BottomLeft, -1.0, -1.0),
            (Corner::BottomRight, 1.0, -1.0),
            (Corner::TopRight, 1.0, 1.0),
            (Corner::TopLeft, -1.0, 1.0),
        ] {
            let v = Vertices::layout(4.0, 3.0, corner, 5.0);
            let c = v.get(VERTEX_C);
            assert!(c[0] * sx > 0.0 && c[1] * sy > 0.0, "{corner:?}: {c:?}");
            assert!((distance(v.get(VERTEX_ALPHA), v.get(VERTEX_BETA)) - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_perpendicular_foot_layout() {
        let v = Vertices::layout(8.0, 6.0, Corner::PerpendicularFoot, 10.0);
        let (a, b) = (v.get(VERTEX_ALPHA), v.get(VERTEX_BETA));
        assert!((a[1] - b[1]).abs() < 1e-5);
        let (c, f) = (v.get(VERTEX_C), v.get(VERTEX_FOOT));
        assert!((c[0] - f[0]).abs() < 1e-5);
        assert!((distance(c, f) - 4.8).abs() < 1e-4);
        assert!((distance(c, a) - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_foot_is_on_hypotenuse() {
        let v = Vertices::layout(3.0, 4.0, Corner::BottomLeft, 5.0);
        let f = v.get(VERTEX_FOOT);
        let (a, b) = (v.get(VERTEX_ALPHA), v.get(VERTEX_BETA));
        assert!((distance(a, f) + distance(f, b) - 5.0).abs() < 1e-4);
        assert!((distance(v.get(VERTEX_C), f) - 2.4).abs() < 1e-4);
    }

    #[test]
    fn test_label_directions() {
        let v = Vertices::layout(4.0, 3.0, Corner::BottomLeft, 5.0);
        assert_eq!(label_direction(&v, Corner::BottomLeft, Field::A), DOWN);
        let n = label_direction(&v, Corner::BottomLeft, Field::C);
        assert!(n[0] > 0.0 && n[1] > 0.0);
        let p = Vertices::layout(4.0, 3.0, Corner::PerpendicularFoot, 5.0);
        assert!(close(label_direction(&p, Corner::PerpendicularFoot, Field::C), DOWN));
    }
}
