//! Compiled Typst frames → positioned outline leaves.
//!
//! Walks nested frames (`FrameItem::Group`) while accumulating transforms, and emits:
//! - one leaf per outlined glyph of every `FrameItem::Text`, via the font's `ttf-parser` face;
//! - one leaf per `FrameItem::Shape` (fraction bars, radical overlines, curves).
//!
//! Coordinates stay in Typst page points (y down) until the caller picks a baseline.
//! Every leaf carries the source byte it was laid out from, so glyphs can be sorted back
//! into the fragments that produced them.

use lyon::math::point;
use lyon::path::Path;
use typst::{
    layout::{Frame, FrameItem, PagedDocument, Transform},
    syntax::{Source, Span},
    text::TextItem,
    visualize::{CurveItem, Geometry, Shape},
};

use super::markup::BASE_PT;
use crate::scene::{Affine2, Mobject2D, Style, transform_path};

#[derive(Debug, Clone)]
pub struct Leaf {
    pub mobject: Mobject2D,
    /// Source byte the leaf came from; `None` for generated content.
    pub at: Option<usize>,
    /// Baseline y (page points) of the text item a glyph belongs to; `None` for shapes.
    pub baseline: Option<f32>,
}

pub fn collect_leaves(doc: &PagedDocument, source: &Source) -> Vec<Leaf> {
    let mut out = Vec::new();
    for page in &doc.pages {
        walk(&page.frame, Affine2::IDENTITY, source, &mut out);
    }
    out
}

fn walk(frame: &Frame, world_from_frame: Affine2, source: &Source, out: &mut Vec<Leaf>) {
    for (pos, item) in frame.items() {
        let world_from_item = world_from_frame.mul(Affine2::translate(
            pos.x.to_pt() as f32,
            pos.y.to_pt() as f32,
        ));
        match item {
            FrameItem::Group(group) => {
                let world_from_group = world_from_item.mul(affine2_from_typst_transform(group.transform));
                walk(&group.frame, world_from_group, source, out);
            }
            FrameItem::Text(text) => glyph_leaves(text, world_from_item, source, out),
            FrameItem::Shape(shape, span) => {
                if let Some(leaf) = shape_leaf(shape, world_from_item, source_byte(source, *span, 0)) {
                    out.push(leaf);
                }
            }
            _ => {}
        }
    }
}

fn source_byte(source: &Source, span: Span, offset: u16) -> Option<usize> {
    source.range(span).map(|r| r.start + offset as usize)
}

fn glyph_leaves(text: &TextItem, world_from_item: Affine2, source: &Source, out: &mut Vec<Leaf>) {
    let face = text.font.ttf();
    let upm = face.units_per_em() as f32;
    if upm <= 0.0 {
        return;
    }
    let font_units_to_pt = text.size.to_pt() as f32 / upm;
    let (_, baseline) = world_from_item.transform_point(0.0, 0.0);
    let style = Style {
        stroke_width: 0.0,
        filled: true,
        ..Style::default()
    };

    let mut pen_x = 0.0f32;
    for g in &text.glyphs {
        let x_off = g.x_offset.at(text.size).to_pt() as f32;
        let y_off = g.y_offset.at(text.size).to_pt() as f32;

        let mut builder = LyonOutlineBuilder::new();
        // Blank glyphs (spaces, zero-width characters) have no outline.
        if face
            .outline_glyph(ttf_parser::GlyphId(g.id), &mut builder)
            .is_some()
        {
            // Font units are y-up; page points are y-down.
            let xf = world_from_item
                .mul(Affine2::translate(pen_x + x_off, -y_off))
                .mul(Affine2::scale(font_units_to_pt, -font_units_to_pt));
            let name = text.text.get(g.range()).unwrap_or("glyph");
            out.push(Leaf {
                mobject: Mobject2D::new(name)
                    .with_outline(transform_path(&builder.build(), xf))
                    .with_style(style),
                at: source_byte(source, g.span.0, g.span.1),
                baseline: Some(baseline),
            });
        }
        pen_x += g.x_advance.at(text.size).to_pt() as f32;
    }
}

fn shape_leaf(shape: &Shape, world_from_item: Affine2, at: Option<usize>) -> Option<Leaf> {
    let (name, path) = match &shape.geometry {
        Geometry::Line(delta) => {
            let mut b = Path::builder();
            b.begin(point(0.0, 0.0));
            b.line_to(point(delta.x.to_pt() as f32, delta.y.to_pt() as f32));
            b.end(false);
            ("rule", b.build())
        }
        Geometry::Rect(size) => {
            let (w, h) = (size.x.to_pt() as f32, size.y.to_pt() as f32);
            let mut b = Path::builder();
            b.begin(point(0.0, 0.0));
            b.line_to(point(w, 0.0));
            b.line_to(point(w, h));
            b.line_to(point(0.0, h));
            b.close();
            ("rule", b.build())
        }
        Geometry::Curve(curve) => ("curve", curve_path(&curve.0)),
    };
    if path.iter().next().is_none() {
        return None;
    }

    let style = match (&shape.fill, &shape.stroke) {
        (Some(_), _) => Style {
            stroke_width: 0.0,
            filled: true,
            ..Style::default()
        },
        (None, Some(stroke)) => Style {
            stroke_width: stroke.thickness.to_pt() as f32 / BASE_PT,
            filled: false,
            ..Style::default()
        },
        (None, None) => return None,
    };
    Some(Leaf {
        mobject: Mobject2D::new(name)
            .with_outline(transform_path(&path, world_from_item))
            .with_style(style),
        at,
        baseline: None,
    })
}

fn curve_path(items: &[CurveItem]) -> Path {
    let p = |pt: &typst::layout::Point| point(pt.x.to_pt() as f32, pt.y.to_pt() as f32);
    let mut b = Path::builder();
    let mut started = false;
    for item in items {
        match item {
            CurveItem::Move(to) => {
                if started {
                    b.end(false);
                }
                b.begin(p(to));
                started = true;
            }
            CurveItem::Line(to) => {
                if !started {
                    b.begin(point(0.0, 0.0));
                    started = true;
                }
                b.line_to(p(to));
            }
            CurveItem::Cubic(c1, c2, to) => {
                if !started {
                    b.begin(point(0.0, 0.0));
                    started = true;
                }
                b.cubic_bezier_to(p(c1), p(c2), p(to));
            }
            CurveItem::Close => {
                if started {
                    b.close();
                    started = false;
                }
            }
        }
    }
    if started {
        b.end(false);
    }
    b.build()
}

/// Convert a Typst `Transform` into our `Affine2`.
fn affine2_from_typst_transform(t: Transform) -> Affine2 {
    let sx = t.sx.get() as f32;
    let sy = t.sy.get() as f32;
    let kx = t.kx.get() as f32;
    let ky = t.ky.get() as f32;
    let tx = t.tx.to_pt() as f32;
    let ty = t.ty.to_pt() as f32;

    Affine2 {
        m: [[sx, ky, 0.0], [kx, sy, 0.0], [tx, ty, 1.0]],
    }
}

/// Convert `ttf-parser` outline callbacks into a `lyon::path::Path`.
///
/// A glyph may contain multiple contours; `move_to` starts a new one.
pub(crate) struct LyonOutlineBuilder {
    builder: lyon::path::Builder,
    contour_open: bool,
}

impl LyonOutlineBuilder {
    pub(crate) fn new() -> Self {
        Self {
            builder: Path::builder(),
            contour_open: false,
        }
    }

    pub(crate) fn build(mut self) -> Path {
        if self.contour_open {
            self.builder.close();
            self.contour_open = false;
        }
        self.builder.build()
    }
}

impl ttf_parser::OutlineBuilder for LyonOutlineBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        if self.contour_open {
            self.builder.close();
        }
        self.builder.begin(point(x, y));
        self.contour_open = true;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(point(x, y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quadratic_bezier_to(point(x1, y1), point(x, y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder
            .cubic_bezier_to(point(x1, y1), point(x2, y2), point(x, y));
    }

    fn close(&mut self) {
        if self.contour_open {
            self.builder.close();
            self.contour_open = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::path_bounds;

    #[test]
    fn test_outline_builder_closes_contours() {
        let mut b = LyonOutlineBuilder::new();
        ttf_parser::OutlineBuilder::move_to(&mut b, 0.0, 0.0);
        ttf_parser::OutlineBuilder::line_to(&mut b, 10.0, 0.0);
        ttf_parser::OutlineBuilder::line_to(&mut b, 10.0, 10.0);
        ttf_parser::OutlineBuilder::move_to(&mut b, 20.0, 0.0);
        ttf_parser::OutlineBuilder::line_to(&mut b, 30.0, 5.0);
        let path = b.build();
        assert_eq!(path_bounds(&path).max, [30.0, 10.0]);
        let closes = path
            .iter()
            .filter(|e| matches!(e, lyon::path::PathEvent::End { close: true, .. }))
            .count();
        assert_eq!(closes, 2);
    }

    #[test]
    fn test_typst_transform_order() {
        let t = Transform {
            sx: typst::layout::Ratio::new(2.0),
            ky: typst::layout::Ratio::zero(),
            kx: typst::layout::Ratio::zero(),
            sy: typst::layout::Ratio::new(0.5),
            tx: typst::layout::Abs::pt(3.0),
            ty: typst::layout::Abs::pt(-1.0),
        };
        let (x, y) = affine2_from_typst_transform(t).transform_point(1.0, 4.0);
        assert!((x - 5.0).abs() < 1e-6 && (y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_curve_path_splits_subpaths() {
        use typst::layout::{Abs, Point};
        let pt = |x: f64, y: f64| Point::new(Abs::pt(x), Abs::pt(y));
        let path = curve_path(&[
            CurveItem::Move(pt(0.0, 0.0)),
            CurveItem::Line(pt(4.0, 0.0)),
            CurveItem::Close,
            CurveItem::Move(pt(0.0, 2.0)),
            CurveItem::Cubic(pt(1.0, 3.0), pt(2.0, 3.0), pt(3.0, 2.0)),
        ]);
        let begins = path
            .iter()
            .filter(|e| matches!(e, lyon::path::PathEvent::Begin { .. }))
            .count();
        assert_eq!(begins, 2);
        assert_eq!(path_bounds(&path).max, [4.0, 3.0]);
    }
}
