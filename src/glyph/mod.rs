//! Shape-based search inside rendered math.
//!
//! Rendering splits expressions into glyph runs in ways the source string does not predict,
//! so sub-expressions are located by **geometry**: a contiguous window of glyphs is reduced to
//! a [`GlyphKey`] by recentering its combined outline, scaling it to unit height and
//! serializing the control points at a fixed precision. Equal keys mean equal shapes at any
//! size and position, which is what lets a needle rendered in display style find the same
//! symbol inside a subscript.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use log::warn;
use lyon::path::Path;

use crate::scene::{Aabb2, Mobject2D, ObjectId, Rgba, Scene2D, path_bounds, path_points};
use crate::tex::{MathRenderer, MathStyle, TexTemplate};

/// Decimal places used when no precision is given.
pub const DEFAULT_PRECISION: usize = 3;

/// Normalized geometric identity of a glyph sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GlyphKey(pub u64);

impl GlyphKey {
    pub fn of(paths: &[&Path], precision: usize) -> Self {
        let mut hasher = DefaultHasher::new();
        canonical_form(paths, precision).hash(&mut hasher);
        GlyphKey(hasher.finish())
    }
}

/// The serialized, normalized outline that [`GlyphKey`] hashes.
pub fn canonical_form(paths: &[&Path], precision: usize) -> String {
    let points: Vec<(char, [f32; 2])> = paths.iter().flat_map(|p| path_points(p)).collect();
    let bounds = paths
        .iter()
        .map(|p| path_bounds(p))
        .fold(Aabb2::empty(), Aabb2::union);
    if bounds.is_empty() {
        return String::new();
    }

    let c = bounds.center();
    let [w, h] = bounds.size();
    // Flat needles (a minus sign) normalize by width instead.
    let unit = if h > 1e-6 {
        h
    } else if w > 1e-6 {
        w
    } else {
        1.0
    };

    let mut out = String::new();
    for (verb, p) in points {
        out.push(verb);
        for v in [(p[0] - c[0]) / unit, (p[1] - c[1]) / unit] {
            let mut s = format!(" {v:.precision$}");
            if s.starts_with(" -") && s[2..].chars().all(|ch| ch == '0' || ch == '.') {
                s = s.replacen(" -", " ", 1);
            }
            let _ = write!(out, "{s}");
        }
    }
    out
}

/// Every contiguous window of `haystack` whose shape matches `needle`, in document order.
///
/// Overlapping matches are all reported. An empty needle matches nothing.
pub fn find_in_glyphs(needle: &[&Path], haystack: &[&Path], precision: usize) -> Vec<Range<usize>> {
    let n = needle.len();
    if n == 0 || n > haystack.len() {
        return Vec::new();
    }
    let key = GlyphKey::of(needle, precision);
    (0..=haystack.len() - n)
        .filter(|&i| GlyphKey::of(&haystack[i..i + n], precision) == key)
        .map(|i| i..i + n)
        .collect()
}

/// Glyph ids of run `run_index` of a rendered block.
pub fn run_glyphs(scene: &Scene2D, block: ObjectId, run_index: usize) -> Vec<ObjectId> {
    scene
        .child(block, run_index)
        .map(|run| scene.leaves(run))
        .unwrap_or_default()
}

fn outlines<'a>(scene: &'a Scene2D, ids: &[ObjectId]) -> Vec<&'a Path> {
    ids.iter()
        .filter_map(|id| scene.node(*id).and_then(|n| n.outline.as_ref()))
        .collect()
}

/// Outlines of the first run of an owned (not yet inserted) block.
fn needle_outlines(needle: &Mobject2D) -> Vec<&Path> {
    needle
        .children
        .first()
        .map(|run| run.leaves().into_iter().filter_map(|m| m.outline.as_ref()).collect())
        .unwrap_or_default()
}

/// Match `needle.runs[0]` against `haystack.runs[run_index]`, both already in the scene.
pub fn find(
    scene: &Scene2D,
    needle: ObjectId,
    haystack: ObjectId,
    run_index: usize,
    precision: usize,
) -> Vec<Range<usize>> {
    let n = outlines(scene, &run_glyphs(scene, needle, 0));
    let h = outlines(scene, &run_glyphs(scene, haystack, run_index));
    find_in_glyphs(&n, &h, precision)
}

/// Like [`find`], for a needle rendered but not inserted.
pub fn find_rendered(
    scene: &Scene2D,
    needle: &Mobject2D,
    haystack: ObjectId,
    run_index: usize,
    precision: usize,
) -> Vec<Range<usize>> {
    let h = outlines(scene, &run_glyphs(scene, haystack, run_index));
    find_in_glyphs(&needle_outlines(needle), &h, precision)
}

/// A contiguous slice of one glyph run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphRange {
    pub run: usize,
    pub range: Range<usize>,
}

// Document order: by run, then by start, then by end.
impl Ord for GlyphRange {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.run, self.range.start, self.range.end).cmp(&(
            other.run,
            other.range.start,
            other.range.end,
        ))
    }
}

impl PartialOrd for GlyphRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl GlyphRange {
    pub fn ids(&self, scene: &Scene2D, block: ObjectId) -> Vec<ObjectId> {
        let glyphs = run_glyphs(scene, block, self.run);
        glyphs
            .get(self.range.clone())
            .map(<[ObjectId]>::to_vec)
            .unwrap_or_default()
    }

    pub fn bounds(&self, scene: &Scene2D, block: ObjectId) -> Aabb2 {
        scene.bounds_of(&self.ids(scene, block))
    }
}

/// An ordered set of glyph slices within one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphSelection {
    pub block: ObjectId,
    pub ranges: Vec<GlyphRange>,
}

impl GlyphSelection {
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&GlyphRange> {
        self.ranges.get(i)
    }

    /// All selected glyph ids, in selection order.
    pub fn ids(&self, scene: &Scene2D) -> Vec<ObjectId> {
        self.ranges
            .iter()
            .flat_map(|r| r.ids(scene, self.block))
            .collect()
    }

    pub fn bounds(&self, scene: &Scene2D) -> Aabb2 {
        scene.bounds_of(&self.ids(scene))
    }

    pub fn set_color(&self, scene: &mut Scene2D, color: Rgba) {
        for id in self.ids(scene) {
            scene.set_color(id, color);
        }
    }
}

/// Concatenate the matches of several needles in run `run_index` into one selection,
/// in document order.
pub fn find_group(
    scene: &Scene2D,
    haystack: ObjectId,
    needles: &[&Mobject2D],
    run_index: usize,
    precision: usize,
) -> GlyphSelection {
    let found: BTreeSet<GlyphRange> = needles
        .iter()
        .flat_map(|n| find_rendered(scene, n, haystack, run_index, precision))
        .map(|range| GlyphRange {
            run: run_index,
            range,
        })
        .collect();
    GlyphSelection {
        block: haystack,
        ranges: found.into_iter().collect(),
    }
}

/// One `colorize` entry: color every rendering of `needle`, or only the listed matches
/// (ordinals in document order).
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRule {
    pub needle: String,
    pub color: Rgba,
    pub only: Option<Vec<usize>>,
}

impl ColorRule {
    pub fn new(needle: impl Into<String>, color: Rgba) -> Self {
        Self {
            needle: needle.into(),
            color,
            only: None,
        }
    }

    pub fn only(mut self, ordinals: impl IntoIterator<Item = usize>) -> Self {
        self.only = Some(ordinals.into_iter().collect());
        self
    }
}

/// Every distinct match of `needle` in any run of `block`, trying all four math styles under
/// the default template and, if given, `template`.
pub fn find_all_variants(
    scene: &Scene2D,
    renderer: &dyn MathRenderer,
    block: ObjectId,
    needle: &str,
    template: Option<&TexTemplate>,
    precision: usize,
) -> Vec<GlyphRange> {
    let runs = scene.children(block).len();
    let templates: Vec<Option<&TexTemplate>> = match template {
        Some(t) => vec![None, Some(t)],
        None => vec![None],
    };

    let mut found = BTreeSet::new();
    for tpl in templates {
        for style in MathStyle::ALL {
            let rendered = match renderer.render_math(&[needle], style, tpl) {
                Ok(m) => m,
                Err(e) => {
                    warn!("colorize: cannot render needle {needle:?} in {style:?}: {e}");
                    continue;
                }
            };
            for run in 0..runs {
                for range in find_rendered(scene, &rendered, block, run, precision) {
                    found.insert(GlyphRange { run, range });
                }
            }
        }
    }
    found.into_iter().collect()
}

/// Recolor the matches of every rule. Returns how many glyph ranges were recolored.
pub fn colorize(
    scene: &mut Scene2D,
    renderer: &dyn MathRenderer,
    block: ObjectId,
    rules: &[ColorRule],
    template: Option<&TexTemplate>,
    precision: usize,
) -> usize {
    let mut colored = 0;
    for rule in rules {
        let matches = find_all_variants(scene, renderer, block, &rule.needle, template, precision);
        for (ordinal, m) in matches.iter().enumerate() {
            if let Some(only) = &rule.only {
                if !only.contains(&ordinal) {
                    continue;
                }
            }
            for id in m.ids(scene, block) {
                scene.set_color(id, rule.color);
            }
            colored += 1;
        }
    }
    colored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::Typesetter;

    fn setup(src: &str) -> (Scene2D, ObjectId, Typesetter) {
        let tex = Typesetter::default();
        let mut scene = Scene2D::new();
        let block = scene.insert(tex.math(src).unwrap());
        (scene, block, tex)
    }

    #[test]
    fn test_find_self_is_full_range() {
        let (mut scene, block, tex) = setup(r"y = 3x + 2");
        let needle = scene.insert(tex.math(r"y = 3x + 2").unwrap());
        scene.shift(needle, [4.0, -2.0]);
        scene.scale(needle, 2.5);
        let found = find(&scene, needle, block, 0, DEFAULT_PRECISION);
        let n = run_glyphs(&scene, block, 0).len();
        assert_eq!(found, vec![0..n]);
    }

    #[test]
    fn test_find_reports_every_occurrence() {
        let (scene, block, tex) = setup("2x + 2 = 22");
        let needle = tex.math("2").unwrap();
        let found = find_rendered(&scene, &needle, block, 0, DEFAULT_PRECISION);
        assert_eq!(found, vec![0..1, 3..4, 5..6, 6..7]);
    }

    #[test]
    fn test_missing_needle_is_empty() {
        let (scene, block, tex) = setup("a + b");
        let needle = tex.math("c").unwrap();
        assert!(find_rendered(&scene, &needle, block, 0, DEFAULT_PRECISION).is_empty());
        assert!(find_in_glyphs(&[], &[], DEFAULT_PRECISION).is_empty());
    }

    #[test]
    fn test_canonical_form_neutralizes_negative_zero() {
        let mut b = Path::builder();
        b.begin(lyon::math::point(0.0, 0.0));
        b.line_to(lyon::math::point(1.0 - 1e-6, 1.0));
        b.line_to(lyon::math::point(2.0, 2.0));
        b.end(false);
        let path = b.build();
        let form = canonical_form(&[&path], 2);
        assert!(!form.contains("-0.00"));
        assert!(form.contains("L 0.00 0.00"));
    }

    #[test]
    fn test_flat_needle_normalizes_by_width() {
        let (scene, block, tex) = setup("a - b - c");
        let needle = tex.math("-").unwrap();
        let found = find_rendered(&scene, &needle, block, 0, DEFAULT_PRECISION);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_find_group_merges_in_order() {
        let (scene, block, tex) = setup("x + y = y + x");
        let nx = tex.math("x").unwrap();
        let ny = tex.math("y").unwrap();
        let sel = find_group(&scene, block, &[&ny, &nx], 0, DEFAULT_PRECISION);
        let starts: Vec<usize> = sel.ranges.iter().map(|r| r.range.start).collect();
        assert_eq!(starts, vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_colorize_with_ordinal_restriction() {
        let (mut scene, block, tex) = setup("2x + 2");
        let n = colorize(
            &mut scene,
            &tex,
            block,
            &[ColorRule::new("2", Rgba::RED).only([1])],
            None,
            DEFAULT_PRECISION,
        );
        assert_eq!(n, 1);
        let glyphs = run_glyphs(&scene, block, 0);
        assert_eq!(scene.color(glyphs[0]), Some(Rgba::WHITE));
        assert_eq!(scene.color(glyphs[3]), Some(Rgba::RED));
    }
}
