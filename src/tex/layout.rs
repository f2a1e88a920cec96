//! Box-model layout of parsed math.
//!
//! Every box has a width, an ascent above its baseline and a descent below it. Glyphs are
//! collected in drawing order together with the index of the source fragment they came from,
//! so the renderer can split them into one run per fragment.

use lyon::path::Path;

use super::parse::{Class, Node};
use super::{MathStyle, TexError};
use crate::font::{FontMetrics, FontVariant, GlyphSource};
use crate::scene::{Affine2, path_bounds, transform_path};
use lyon::math::point;

const THIN: f32 = 0.167;
const MEDIUM: f32 = 0.22;
const THICK: f32 = 0.28;

/// A glyph placed relative to its box origin.
#[derive(Debug, Clone)]
pub struct Placed {
    pub part: usize,
    pub name: String,
    /// Outline in em units, already scaled, positioned at `offset`.
    pub path: Path,
    pub offset: [f32; 2],
}

impl Placed {
    /// The outline moved to its final position.
    pub fn finish(&self) -> Path {
        transform_path(&self.path, Affine2::translate(self.offset[0], self.offset[1]))
    }
}

#[derive(Debug, Clone, Default)]
pub struct HBox {
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
    pub glyphs: Vec<Placed>,
}

impl HBox {
    fn shift(&mut self, dx: f32, dy: f32) {
        for g in &mut self.glyphs {
            g.offset[0] += dx;
            g.offset[1] += dy;
        }
    }

    /// Add `other` with its origin at `(dx, dy)`; extents grow, width does not.
    fn place(&mut self, mut other: HBox, dx: f32, dy: f32) {
        other.shift(dx, dy);
        self.ascent = self.ascent.max(other.ascent + dy);
        self.descent = self.descent.max(other.descent - dy);
        self.glyphs.extend(other.glyphs);
    }
}

pub struct Layouter<'a> {
    font: &'a dyn GlyphSource,
    metrics: FontMetrics,
}

impl<'a> Layouter<'a> {
    pub fn new(font: &'a dyn GlyphSource) -> Self {
        Self {
            font,
            metrics: font.metrics(),
        }
    }

    /// Lay out a top-level list where each atom carries its fragment index.
    pub fn layout_parts(&self, atoms: &[(usize, &Node)], style: MathStyle) -> Result<HBox, TexError> {
        self.layout_list(atoms, style)
    }

    fn layout_list(&self, atoms: &[(usize, &Node)], style: MathStyle) -> Result<HBox, TexError> {
        let s = style.scale();
        let classes = resolve_classes(atoms.iter().map(|(_, n)| n.class()).collect());

        let mut out = HBox::default();
        let mut x = 0.0;
        let mut prev: Option<Class> = None;
        for (i, &(part, node)) in atoms.iter().enumerate() {
            if let Node::Space(w) = node {
                x += w * s;
                continue;
            }
            let class = classes[i].unwrap_or(Class::Ord);
            if let Some(p) = prev {
                x += spacing(p, class, style) * s;
            }
            let b = self.layout_node(node, part, style)?;
            let w = b.width;
            out.place(b, x, 0.0);
            x += w;
            prev = Some(class);
        }
        out.width = x;
        Ok(out)
    }

    fn layout_node(&self, node: &Node, part: usize, style: MathStyle) -> Result<HBox, TexError> {
        let s = style.scale();
        match node {
            Node::Char { ch, variant, .. } => self.glyph(*ch, *variant, s, part),
            Node::Group(list) => {
                let atoms: Vec<(usize, &Node)> = list.iter().map(|n| (part, n)).collect();
                self.layout_list(&atoms, style)
            }
            Node::Text(text) => self.text(text, s, part),
            Node::Op { name, .. } => self.text(name, s, part),
            Node::BigOp { ch } => {
                let factor = if style == MathStyle::Display { 1.5 } else { 1.0 };
                let mut b = self.glyph(*ch, FontVariant::Upright, s * factor, part)?;
                // Center the operator on the math axis.
                let mid = (b.ascent - b.descent) * 0.5;
                let dy = self.metrics.axis_height * s - mid;
                b.shift(0.0, dy);
                b.ascent += dy;
                b.descent -= dy;
                Ok(b)
            }
            Node::Space(w) => Ok(HBox {
                width: w * s,
                ..HBox::default()
            }),
            Node::Scripts {
                base,
                sup,
                sub,
                sup_first,
            } => self.scripts(base.as_deref(), sup.as_deref(), sub.as_deref(), *sup_first, part, style),
            Node::Frac { num, den, style: forced } => {
                self.fraction(num, den, forced.unwrap_or(style), style, part)
            }
            Node::Sqrt { index, body } => self.radical(index.as_deref(), body, part, style),
            Node::Delimited { left, body, right } => {
                self.delimited(*left, body, *right, part, style)
            }
        }
    }

    fn glyph(&self, ch: char, variant: FontVariant, scale: f32, part: usize) -> Result<HBox, TexError> {
        let g = self.font.glyph(ch, variant)?;
        let path = transform_path(&g.path, Affine2::scale(scale, scale));
        let bounds = path_bounds(&path);
        let (ascent, descent) = if bounds.is_empty() {
            (0.0, 0.0)
        } else {
            (bounds.max[1].max(0.0), (-bounds.min[1]).max(0.0))
        };
        let mut glyphs = Vec::new();
        if !bounds.is_empty() {
            glyphs.push(Placed {
                part,
                name: ch.to_string(),
                path,
                offset: [0.0, 0.0],
            });
        }
        Ok(HBox {
            width: g.advance * scale,
            ascent,
            descent,
            glyphs,
        })
    }

    /// Upright run of characters; spaces advance the pen only.
    fn text(&self, text: &str, scale: f32, part: usize) -> Result<HBox, TexError> {
        let mut out = HBox::default();
        let mut x = 0.0;
        for ch in text.chars() {
            if ch.is_whitespace() {
                x += self.font.space_advance() * scale;
                continue;
            }
            let b = self.glyph(ch, FontVariant::Upright, scale, part)?;
            let w = b.width;
            out.place(b, x, 0.0);
            x += w;
        }
        out.width = x;
        Ok(out)
    }

    fn scripts(
        &self,
        base: Option<&Node>,
        sup: Option<&Node>,
        sub: Option<&Node>,
        sup_first: bool,
        part: usize,
        style: MathStyle,
    ) -> Result<HBox, TexError> {
        let s = style.scale();
        let limits = style == MathStyle::Display
            && matches!(
                base,
                Some(Node::BigOp { .. }) | Some(Node::Op { limits: true, .. })
            );

        let base_box = match base {
            Some(b) => self.layout_node(b, part, style)?,
            None => HBox::default(),
        };
        let script_style = style.script();
        let lay = |n: Option<&Node>| -> Result<Option<HBox>, TexError> {
            n.map(|n| self.layout_node(n, part, script_style)).transpose()
        };
        let (sup_box, sub_box) = (lay(sup)?, lay(sub)?);

        let mut out = HBox::default();
        let base_w = base_box.width;
        let base_asc = base_box.ascent;
        let base_desc = base_box.descent;

        if limits {
            let width = [
                Some(base_w),
                sup_box.as_ref().map(|b| b.width),
                sub_box.as_ref().map(|b| b.width),
            ]
            .into_iter()
            .flatten()
            .fold(0.0f32, f32::max);
            let gap = 0.1 * s;
            out.place(base_box, (width - base_w) * 0.5, 0.0);
            let mut placed = Vec::new();
            if let Some(b) = sup_box {
                let dy = base_asc + gap + b.descent;
                placed.push((true, b, dy));
            }
            if let Some(b) = sub_box {
                let dy = -(base_desc + gap + b.ascent);
                placed.push((false, b, dy));
            }
            if !sup_first {
                placed.reverse();
            }
            for (_, b, dy) in placed {
                let dx = (width - b.width) * 0.5;
                out.place(b, dx, dy);
            }
            out.width = width;
            return Ok(out);
        }

        out.place(base_box, 0.0, 0.0);
        let both = sup_box.is_some() && sub_box.is_some();
        let sup_y = (0.42 * s).max(base_asc - 0.35 * s);
        let sub_y = if both { -0.25 * s } else { -0.15 * s };
        let mut script_w = 0.0f32;
        let mut placed = Vec::new();
        if let Some(b) = sup_box {
            script_w = script_w.max(b.width);
            placed.push((b, sup_y));
        }
        if let Some(b) = sub_box {
            script_w = script_w.max(b.width);
            placed.push((b, sub_y));
        }
        if both && !sup_first {
            placed.reverse();
        }
        for (b, dy) in placed {
            out.place(b, base_w, dy);
        }
        out.width = base_w + script_w + 0.05 * s;
        Ok(out)
    }

    fn fraction(
        &self,
        num: &Node,
        den: &Node,
        frac_style: MathStyle,
        outer: MathStyle,
        part: usize,
    ) -> Result<HBox, TexError> {
        let s = outer.scale().max(frac_style.scale());
        let inner = frac_style.fraction();
        let num_box = self.layout_node(num, part, inner)?;
        let den_box = self.layout_node(den, part, inner)?;

        let pad = 0.1 * s;
        let width = num_box.width.max(den_box.width) + 2.0 * pad;
        let axis = self.metrics.axis_height * s;
        let t = self.metrics.rule_thickness * s;
        let gap = 0.12 * s;

        let num_y = axis + t * 0.5 + gap + num_box.descent;
        let den_y = axis - t * 0.5 - gap - den_box.ascent;

        let mut out = HBox::default();
        let (nw, dw) = (num_box.width, den_box.width);
        out.place(num_box, (width - nw) * 0.5, num_y);
        out.place(self.rule(width, t, part), 0.0, axis);
        out.place(den_box, (width - dw) * 0.5, den_y);
        out.width = width;
        Ok(out)
    }

    /// Horizontal bar of the given width, centered on the box baseline.
    fn rule(&self, width: f32, thickness: f32, part: usize) -> HBox {
        let mut b = Path::builder();
        b.begin(point(0.0, 0.0));
        b.line_to(point(width, 0.0));
        b.end(false);
        HBox {
            width,
            ascent: thickness * 0.5,
            descent: thickness * 0.5,
            glyphs: vec![Placed {
                part,
                name: "rule".to_string(),
                path: b.build(),
                offset: [0.0, 0.0],
            }],
        }
    }

    fn radical(
        &self,
        index: Option<&Node>,
        body: &Node,
        part: usize,
        style: MathStyle,
    ) -> Result<HBox, TexError> {
        let s = style.scale();
        let body_box = self.layout_node(body, part, style)?;
        let clearance = 0.1 * s;
        let t = self.metrics.rule_thickness * s;
        let top = body_box.ascent.max(self.metrics.x_height * s) + clearance + t;
        let bottom = -body_box.descent - 0.05 * s;
        let h = top - bottom;

        let mut out = HBox::default();
        let mut x = 0.0;
        if let Some(idx) = index {
            let idx_box = self.layout_node(idx, part, MathStyle::ScriptScript)?;
            let w = idx_box.width;
            out.place(idx_box, 0.0, bottom + 0.6 * h);
            x = (w - 0.25 * s).max(0.0);
        }

        let hook = 0.55 * s;
        let end = hook + body_box.width + 0.1 * s;
        let mut b = Path::builder();
        b.begin(point(x, bottom + 0.5 * h));
        b.line_to(point(x + 0.12 * s, bottom + 0.55 * h));
        b.line_to(point(x + 0.3 * s, bottom));
        b.line_to(point(x + hook, top));
        b.line_to(point(x + end, top));
        b.end(false);
        out.place(
            HBox {
                width: end,
                ascent: top,
                descent: -bottom,
                glyphs: vec![Placed {
                    part,
                    name: "radical".to_string(),
                    path: b.build(),
                    offset: [0.0, 0.0],
                }],
            },
            0.0,
            0.0,
        );
        out.place(body_box, x + hook + 0.05 * s, 0.0);
        out.width = x + end + 0.05 * s;
        Ok(out)
    }

    fn delimited(
        &self,
        left: Option<char>,
        body: &[Node],
        right: Option<char>,
        part: usize,
        style: MathStyle,
    ) -> Result<HBox, TexError> {
        let s = style.scale();
        let atoms: Vec<(usize, &Node)> = body.iter().map(|n| (part, n)).collect();
        let body_box = self.layout_list(&atoms, style)?;
        let axis = self.metrics.axis_height * s;
        // Half-height needed around the axis to cover the body.
        let half = (body_box.ascent - axis).max(body_box.descent + axis) + 0.1 * s;

        let mut out = HBox::default();
        let mut x = 0.0;
        let delim = |ch: char| -> Result<HBox, TexError> {
            let natural = self.glyph(ch, FontVariant::Upright, s, part)?;
            let natural_half = (natural.ascent + natural.descent) * 0.5;
            let factor = if natural_half > 0.0 {
                (half / natural_half).max(1.0)
            } else {
                1.0
            };
            let mut b = self.glyph(ch, FontVariant::Upright, s * factor, part)?;
            let mid = (b.ascent - b.descent) * 0.5;
            let dy = axis - mid;
            b.shift(0.0, dy);
            b.ascent += dy;
            b.descent -= dy;
            Ok(b)
        };

        if let Some(ch) = left {
            let b = delim(ch)?;
            let w = b.width;
            out.place(b, x, 0.0);
            x += w;
        }
        let bw = body_box.width;
        out.place(body_box, x, 0.0);
        x += bw;
        if let Some(ch) = right {
            let b = delim(ch)?;
            let w = b.width;
            out.place(b, x, 0.0);
            x += w;
        }
        out.width = x;
        Ok(out)
    }
}

/// Apply TeX's binary-operator rules: a `Bin` at the start, after an operator, relation,
/// opening or punctuation, or before a relation, closing, punctuation or the end is an `Ord`.
fn resolve_classes(mut classes: Vec<Option<Class>>) -> Vec<Option<Class>> {
    let idx: Vec<usize> = (0..classes.len()).filter(|&i| classes[i].is_some()).collect();
    for (k, &i) in idx.iter().enumerate() {
        if classes[i] != Some(Class::Bin) {
            continue;
        }
        let prev = k.checked_sub(1).and_then(|p| classes[idx[p]]);
        let next = idx.get(k + 1).and_then(|&n| classes[n]);
        let after_operator = matches!(
            prev,
            None | Some(Class::Bin | Class::Op | Class::Rel | Class::Open | Class::Punct)
        );
        let before_closer = matches!(
            next,
            None | Some(Class::Rel | Class::Close | Class::Punct)
        );
        if after_operator || before_closer {
            classes[i] = Some(Class::Ord);
        }
    }
    classes
}

/// Inter-atom space in em (before style scaling).
fn spacing(left: Class, right: Class, style: MathStyle) -> f32 {
    use Class::*;
    let tight = matches!(style, MathStyle::Script | MathStyle::ScriptScript);
    match (left, right) {
        (Ord, Op) | (Op, Ord) | (Op, Op) | (Close, Op) => THIN,
        _ if tight => 0.0,
        (Ord | Close, Bin) | (Bin, Ord | Op | Open) => MEDIUM,
        (Ord | Op | Close, Rel) | (Rel, Ord | Op | Open) => THICK,
        (Punct, _) => THIN,
        _ => 0.0,
    }
}
