//! Primitive shape constructors.
//!
//! All shapes are returned as owned [`Mobject2D`] trees with outlines in world units.

use std::f32::consts::FRAC_PI_2;

use lyon::math::{Point, point};
use lyon::path::Path;

use super::{Aabb2, Mobject2D, Rgba, Style, norm, normalize};

const DEFAULT_TIP: f32 = 0.2;

fn p(v: [f32; 2]) -> Point {
    point(v[0], v[1])
}

fn stroked() -> Style {
    Style::default()
}

fn filled(color: Rgba) -> Style {
    Style {
        color,
        stroke_width: 0.0,
        filled: true,
    }
}

pub fn line(start: [f32; 2], end: [f32; 2]) -> Mobject2D {
    polyline(&[start, end], false)
}

pub fn polyline(points: &[[f32; 2]], closed: bool) -> Mobject2D {
    let mut b = Path::builder();
    if let Some((first, rest)) = points.split_first() {
        b.begin(p(*first));
        for pt in rest {
            b.line_to(p(*pt));
        }
        b.end(closed);
    }
    Mobject2D::new(if closed { "polygon" } else { "line" })
        .with_outline(b.build())
        .with_style(stroked())
}

pub fn polygon(points: &[[f32; 2]]) -> Mobject2D {
    polyline(points, true)
}

/// Rectangle of the given size centered on the origin.
pub fn rectangle(width: f32, height: f32) -> Mobject2D {
    let (w, h) = (width * 0.5, height * 0.5);
    let mut m = polygon(&[[-w, -h], [w, -h], [w, h], [-w, h]]);
    m.name = "rectangle".to_string();
    m
}

/// Rectangle around `bounds` with `buff` padding on every side.
pub fn surrounding_rect(bounds: Aabb2, buff: f32) -> Mobject2D {
    let size = bounds.size();
    let mut m = rectangle(size[0] + 2.0 * buff, size[1] + 2.0 * buff);
    m.move_to(bounds.center());
    m.name = "surrounding_rect".to_string();
    m
}

pub fn circle(center: [f32; 2], radius: f32) -> Mobject2D {
    let mut b = Path::builder();
    b.begin(p([center[0] + radius, center[1]]));
    push_arc(&mut b, center, radius, 0.0, std::f32::consts::TAU);
    b.close();
    Mobject2D::new("circle")
        .with_outline(b.build())
        .with_style(stroked())
}

pub fn dot(center: [f32; 2], radius: f32) -> Mobject2D {
    let mut m = circle(center, radius);
    m.name = "dot".to_string();
    m.style = filled(Rgba::WHITE);
    m
}

/// Arc around `center` from `start_angle`, sweeping `sweep` radians (counter-clockwise if positive).
pub fn arc(center: [f32; 2], radius: f32, start_angle: f32, sweep: f32) -> Mobject2D {
    let mut b = Path::builder();
    b.begin(p(polar(center, radius, start_angle)));
    push_arc(&mut b, center, radius, start_angle, sweep);
    b.end(false);
    Mobject2D::new("arc")
        .with_outline(b.build())
        .with_style(stroked())
}

/// The small arc marking the interior angle at `vertex` between rays towards `a` and `b`.
pub fn angle_arc(vertex: [f32; 2], a: [f32; 2], b: [f32; 2], radius: f32) -> Mobject2D {
    let (start, sweep) = interior_sweep(vertex, a, b);
    let mut m = arc(vertex, radius, start, sweep);
    m.name = "angle_arc".to_string();
    m
}

/// Start angle and signed sweep of the interior angle at `vertex`.
pub fn interior_sweep(vertex: [f32; 2], a: [f32; 2], b: [f32; 2]) -> (f32, f32) {
    let start = (a[1] - vertex[1]).atan2(a[0] - vertex[0]);
    let end = (b[1] - vertex[1]).atan2(b[0] - vertex[0]);
    let mut sweep = end - start;
    while sweep > std::f32::consts::PI {
        sweep -= std::f32::consts::TAU;
    }
    while sweep < -std::f32::consts::PI {
        sweep += std::f32::consts::TAU;
    }
    (start, sweep)
}

/// Square corner marker for a right angle at `vertex` between rays towards `a` and `b`.
pub fn right_angle_marker(vertex: [f32; 2], a: [f32; 2], b: [f32; 2], size: f32) -> Mobject2D {
    let u = normalize([a[0] - vertex[0], a[1] - vertex[1]]);
    let v = normalize([b[0] - vertex[0], b[1] - vertex[1]]);
    let p1 = [vertex[0] + u[0] * size, vertex[1] + u[1] * size];
    let p3 = [vertex[0] + v[0] * size, vertex[1] + v[1] * size];
    let p2 = [p1[0] + v[0] * size, p1[1] + v[1] * size];
    let mut m = polyline(&[p1, p2, p3], false);
    m.name = "right_angle".to_string();
    m
}

/// Straight arrow with a filled triangular tip at `end`.
pub fn arrow(start: [f32; 2], end: [f32; 2]) -> Mobject2D {
    let dir = normalize([end[0] - start[0], end[1] - start[1]]);
    let tip = DEFAULT_TIP.min(norm([end[0] - start[0], end[1] - start[1]]) * 0.5);
    let base = [end[0] - dir[0] * tip, end[1] - dir[1] * tip];

    let mut shaft = line(start, base);
    shaft.name = "arrow_shaft".to_string();
    Mobject2D::new("arrow")
        .with_children([shaft, arrow_tip(end, dir, tip)])
}

/// Arrow along a circular arc subtending `angle` radians (positive runs counter-clockwise).
pub fn curved_arrow(start: [f32; 2], end: [f32; 2], angle: f32) -> Mobject2D {
    let chord = [end[0] - start[0], end[1] - start[1]];
    let len = norm(chord);
    if angle.abs() < 1e-4 || len < 1e-6 {
        return arrow(start, end);
    }
    let radius = len / (2.0 * (angle * 0.5).sin()).abs();
    let mid = [(start[0] + end[0]) * 0.5, (start[1] + end[1]) * 0.5];
    let n = normalize([-chord[1], chord[0]]);
    let h = radius * (angle * 0.5).cos();
    let sign = if angle > 0.0 { 1.0 } else { -1.0 };
    let center = [mid[0] + n[0] * h * sign, mid[1] + n[1] * h * sign];
    let a0 = (start[1] - center[1]).atan2(start[0] - center[0]);

    let mut b = Path::builder();
    b.begin(p(start));
    push_arc(&mut b, center, radius, a0, angle);
    b.end(false);

    let end_angle = a0 + angle;
    let tangent = [-end_angle.sin() * sign, end_angle.cos() * sign];
    let shaft = Mobject2D::new("arrow_shaft")
        .with_outline(b.build())
        .with_style(stroked());
    Mobject2D::new("curved_arrow").with_children([shaft, arrow_tip(end, tangent, DEFAULT_TIP)])
}

fn arrow_tip(end: [f32; 2], dir: [f32; 2], size: f32) -> Mobject2D {
    let base = [end[0] - dir[0] * size, end[1] - dir[1] * size];
    let n = [-dir[1] * size * 0.5, dir[0] * size * 0.5];
    let mut tip = polygon(&[end, [base[0] + n[0], base[1] + n[1]], [base[0] - n[0], base[1] - n[1]]]);
    tip.name = "arrow_tip".to_string();
    tip.style = filled(Rgba::WHITE);
    tip
}

#[inline]
fn polar(center: [f32; 2], radius: f32, angle: f32) -> [f32; 2] {
    [center[0] + radius * angle.cos(), center[1] + radius * angle.sin()]
}

/// Append cubic segments (at most a quarter turn each) approximating an arc.
/// The builder's current point must already be at the arc start.
fn push_arc(
    b: &mut lyon::path::Builder,
    center: [f32; 2],
    radius: f32,
    start_angle: f32,
    sweep: f32,
) {
    let segments = (sweep.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
    let step = sweep / segments as f32;
    let k = 4.0 / 3.0 * (step / 4.0).tan();
    let mut a0 = start_angle;
    for _ in 0..segments {
        let a1 = a0 + step;
        let p0 = polar(center, radius, a0);
        let p3 = polar(center, radius, a1);
        let c1 = [p0[0] - k * radius * a0.sin(), p0[1] + k * radius * a0.cos()];
        let c2 = [p3[0] + k * radius * a1.sin(), p3[1] - k * radius * a1.cos()];
        b.cubic_bezier_to(p(c1), p(c2), p(p3));
        a0 = a1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_bounds() {
        let c = circle([1.0, 1.0], 2.0);
        let b = c.bounds();
        assert!((b.center()[0] - 1.0).abs() < 1e-3);
        assert!((b.width() - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_arrow_reaches_end() {
        let a = arrow([0.0, 0.0], [2.0, 0.0]);
        let b = a.bounds();
        assert!((b.right() - 2.0).abs() < 1e-4);
        assert_eq!(a.leaves().len(), 2);
    }

    #[test]
    fn test_interior_sweep_short_way() {
        let (start, sweep) = interior_sweep([0.0, 0.0], [1.0, 0.0], [0.0, 1.0]);
        assert!(start.abs() < 1e-6);
        assert!((sweep - FRAC_PI_2).abs() < 1e-5);
        let (_, sweep) = interior_sweep([0.0, 0.0], [0.0, 1.0], [1.0, 0.0]);
        assert!((sweep + FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_surrounding_rect_pads() {
        let r = surrounding_rect(Aabb2::from_min_max([0.0, 0.0], [2.0, 1.0]), 0.1);
        let b = r.bounds();
        assert!((b.left() + 0.1).abs() < 1e-5);
        assert!((b.top() - 1.1).abs() < 1e-5);
    }
}
