use std::fmt;

use crate::config::LayoutConfig;
use crate::glyph::{GlyphKey, GlyphRange, find_all_variants, run_glyphs};
use crate::scene::{Mobject2D, ObjectId, Rgba, Scene2D};
use crate::tex::{MathRenderer, MathStyle, TexTemplate};

use super::LayoutError;

/// Resolver run against `(scene, expression)` when the anchor is needed.
pub type AnchorResolver = Box<dyn Fn(&Scene2D, ObjectId) -> Option<GlyphRange>>;

/// Where an annotation hangs.
pub enum AnchorSpec {
    /// First shape match of this math string, in document order.
    Literal(String),
    /// First window of `glyph_count` glyphs with this key.
    Key { key: GlyphKey, glyph_count: usize },
    Lazy(AnchorResolver),
    Resolved(GlyphRange),
}

impl fmt::Debug for AnchorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorSpec::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            AnchorSpec::Key { key, glyph_count } => f
                .debug_struct("Key")
                .field("key", key)
                .field("glyph_count", glyph_count)
                .finish(),
            AnchorSpec::Lazy(_) => f.write_str("Lazy(..)"),
            AnchorSpec::Resolved(r) => f.debug_tuple("Resolved").field(r).finish(),
        }
    }
}

impl From<&str> for AnchorSpec {
    fn from(s: &str) -> Self {
        AnchorSpec::Literal(s.to_string())
    }
}

impl From<GlyphRange> for AnchorSpec {
    fn from(r: GlyphRange) -> Self {
        AnchorSpec::Resolved(r)
    }
}

impl AnchorSpec {
    /// The `n`-th match of `needle` (document order) instead of the first.
    pub fn nth(needle: &str, n: usize, renderer: std::rc::Rc<dyn MathRenderer>, precision: usize) -> Self {
        let needle = needle.to_string();
        AnchorSpec::Lazy(Box::new(move |scene, expr| {
            find_all_variants(scene, renderer.as_ref(), expr, &needle, None, precision)
                .into_iter()
                .nth(n)
        }))
    }

    fn describe(&self) -> String {
        match self {
            AnchorSpec::Literal(s) => s.clone(),
            AnchorSpec::Key { key, .. } => format!("key {:016x}", key.0),
            AnchorSpec::Lazy(_) => "lazy anchor".to_string(),
            AnchorSpec::Resolved(r) => format!("run {} glyphs {:?}", r.run, r.range),
        }
    }

    fn resolve(
        &self,
        scene: &Scene2D,
        renderer: &dyn MathRenderer,
        expr: ObjectId,
        template: Option<&TexTemplate>,
        precision: usize,
    ) -> Option<GlyphRange> {
        let found = match self {
            AnchorSpec::Literal(s) => {
                find_all_variants(scene, renderer, expr, s, template, precision)
                    .into_iter()
                    .next()
            }
            AnchorSpec::Key { key, glyph_count } => find_key(scene, expr, *key, *glyph_count, precision),
            AnchorSpec::Lazy(f) => f(scene, expr),
            AnchorSpec::Resolved(r) => Some(r.clone()),
        }?;
        // Out-of-range slices do not belong to this expression.
        (found.ids(scene, expr).len() == found.range.len() && !found.range.is_empty()).then_some(found)
    }
}

fn find_key(
    scene: &Scene2D,
    expr: ObjectId,
    key: GlyphKey,
    n: usize,
    precision: usize,
) -> Option<GlyphRange> {
    for run in 0..scene.children(expr).len() {
        let glyphs = run_glyphs(scene, expr, run);
        let outlines: Vec<_> = glyphs
            .iter()
            .filter_map(|id| scene.node(*id).and_then(|n| n.outline.as_ref()))
            .collect();
        if n == 0 || n > outlines.len() {
            continue;
        }
        for i in 0..=outlines.len() - n {
            if GlyphKey::of(&outlines[i..i + n], precision) == key {
                return Some(GlyphRange { run, range: i..i + n });
            }
        }
    }
    None
}

/// A term hung beneath one or two anchors of an expression.
#[derive(Debug)]
pub struct Annotation {
    pub term: String,
    pub left: Option<AnchorSpec>,
    pub right: Option<AnchorSpec>,
    pub color: Option<Rgba>,
    pub h_offset: f32,
}

impl Annotation {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            left: None,
            right: None,
            color: None,
            h_offset: 0.0,
        }
    }

    /// Single term under one anchor.
    pub fn under(mut self, anchor: impl Into<AnchorSpec>) -> Self {
        self.left = Some(anchor.into());
        self.right = None;
        self
    }

    /// One copy of the term under each anchor (e.g. "÷2" on both sides of an equation).
    pub fn between(mut self, left: impl Into<AnchorSpec>, right: impl Into<AnchorSpec>) -> Self {
        self.left = Some(left.into());
        self.right = Some(right.into());
        self
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_h_offset(mut self, h_offset: f32) -> Self {
        self.h_offset = h_offset;
        self
    }

    pub fn anchor_count(&self) -> usize {
        self.left.iter().chain(self.right.iter()).count()
    }

    /// Resolve both anchors inside `expr`.
    ///
    /// On success the anchors are replaced by their resolved slices, so resolving again
    /// returns the same selection.
    pub fn resolve(
        &mut self,
        scene: &Scene2D,
        renderer: &dyn MathRenderer,
        expr: ObjectId,
        template: Option<&TexTemplate>,
        precision: usize,
    ) -> Result<Vec<GlyphRange>, LayoutError> {
        if self.anchor_count() == 0 {
            return Err(LayoutError::PreconditionViolation(format!(
                "annotation {:?} has no anchor",
                self.term
            )));
        }
        let mut ranges = Vec::with_capacity(2);
        for spec in self.left.iter().chain(self.right.iter()) {
            let r = spec
                .resolve(scene, renderer, expr, template, precision)
                .ok_or_else(|| LayoutError::NotFound(spec.describe()))?;
            ranges.push(r);
        }

        let mut it = ranges.iter().cloned();
        if let Some(slot) = self.left.as_mut() {
            if let Some(r) = it.next() {
                *slot = AnchorSpec::Resolved(r);
            }
        }
        if let Some(slot) = self.right.as_mut() {
            if let Some(r) = it.next() {
                *slot = AnchorSpec::Resolved(r);
            }
        }
        Ok(ranges)
    }

    /// Render the term at annotation size, colored.
    pub fn render_term(
        &self,
        renderer: &dyn MathRenderer,
        config: &LayoutConfig,
    ) -> Result<Mobject2D, LayoutError> {
        let mut term = renderer.render_math(&[&self.term], MathStyle::Display, None)?;
        term.scale(config.annotation_scale);
        term.set_color(self.color.unwrap_or(config.annotation_color));
        term.name = "AnnotationTerm".to_string();
        Ok(term)
    }

    /// Height the annotation slot must reserve for this term.
    pub fn reserved_height(
        &self,
        renderer: &dyn MathRenderer,
        config: &LayoutConfig,
    ) -> Result<f32, LayoutError> {
        Ok(self.render_term(renderer, config)?.bounds().height() + config.annotation_buff)
    }

    /// Insert one term copy per anchor beneath `expr`, grouped under a detached node.
    ///
    /// Copies are centered under their anchors, pushed outward by `h_offset` when there are
    /// two, and hang from a common top edge `annotation_buff` below the lower anchor (never
    /// above the expression's bottom edge minus the same buffer).
    pub fn place(
        &self,
        scene: &mut Scene2D,
        renderer: &dyn MathRenderer,
        expr: ObjectId,
        anchors: &[GlyphRange],
        config: &LayoutConfig,
    ) -> Result<ObjectId, LayoutError> {
        let term = self.render_term(renderer, config)?;
        let anchor_bounds: Vec<_> = anchors.iter().map(|r| r.bounds(scene, expr)).collect();

        let lowest = anchor_bounds
            .iter()
            .map(|b| b.bottom())
            .fold(f32::INFINITY, f32::min);
        let top = (lowest - config.annotation_buff).min(scene.bounds(expr).bottom() - config.annotation_buff);

        let group = scene.insert(Mobject2D::new("Annotation"));
        let two = anchor_bounds.len() == 2;
        for (i, b) in anchor_bounds.iter().enumerate() {
            let outward = match (two, i) {
                (false, _) => 0.0,
                (true, 0) => -self.h_offset,
                (true, _) => self.h_offset,
            };
            let copy = scene.insert_child(group, term.clone());
            let tb = scene.bounds(copy);
            scene.shift(copy, [b.center()[0] + outward - tb.center()[0], top - tb.top()]);
        }
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::Typesetter;

    fn expr(src: &str) -> (Scene2D, ObjectId, Typesetter) {
        let tex = Typesetter::default();
        let mut scene = Scene2D::new();
        let id = scene.insert(tex.math(src).unwrap());
        (scene, id, tex)
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (scene, id, tex) = expr("2x = 8");
        let mut ann = Annotation::new(r"\div 2").between("2x", "8");
        let first = ann.resolve(&scene, &tex, id, None, 3).unwrap();
        let second = ann.resolve(&scene, &tex, id, None, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].range, 0..2);
        assert_eq!(first[1].range, 3..4);
        assert!(matches!(ann.left, Some(AnchorSpec::Resolved(_))));
    }

    #[test]
    fn test_missing_anchor_is_not_found() {
        let (scene, id, tex) = expr("a + b");
        let mut ann = Annotation::new("-1").under("z");
        assert!(matches!(
            ann.resolve(&scene, &tex, id, None, 3),
            Err(LayoutError::NotFound(_))
        ));
        let mut bare = Annotation::new("-1");
        assert!(matches!(
            bare.resolve(&scene, &tex, id, None, 3),
            Err(LayoutError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_key_anchor() {
        let (scene, id, tex) = expr("a + b");
        let needle = tex.math("b").unwrap();
        let outline = needle.leaves()[0].outline.clone().unwrap();
        let key = GlyphKey::of(&[&outline], 3);
        let mut ann = Annotation::new("1").under(AnchorSpec::Key { key, glyph_count: 1 });
        let r = ann.resolve(&scene, &tex, id, None, 3).unwrap();
        assert_eq!(r[0].range, 2..3);
    }

    #[test]
    fn test_two_copies_share_top_and_spread_outward() {
        let (mut scene, id, tex) = expr("2x = 8");
        let cfg = LayoutConfig::default();
        let mut ann = Annotation::new(r"\div 2").between("2x", "8").with_h_offset(0.1);
        let ranges = ann.resolve(&scene, &tex, id, None, 3).unwrap();
        let group = ann.place(&mut scene, &tex, id, &ranges, &cfg).unwrap();

        let copies = scene.children(group).to_vec();
        assert_eq!(copies.len(), 2);
        let (a, b) = (scene.bounds(copies[0]), scene.bounds(copies[1]));
        assert!((a.top() - b.top()).abs() < 1e-4);
        assert!((a.top() - (scene.bounds(id).bottom() - cfg.annotation_buff)).abs() < 1e-4);

        let left_anchor = ranges[0].bounds(&scene, id).center()[0];
        assert!((a.center()[0] - (left_anchor - 0.1)).abs() < 1e-4);
        let right_anchor = ranges[1].bounds(&scene, id).center()[0];
        assert!((b.center()[0] - (right_anchor + 0.1)).abs() < 1e-4);
    }
}
