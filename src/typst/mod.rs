//! Math and text through the Typst compiler.
//!
//! [`TypstRenderer`] is the production [`MathRenderer`]: fragments are parsed as TeX, written
//! out as one Typst equation ([`markup`]), compiled against a shared font set ([`world`]) and
//! walked back into outline leaves ([`frame`]). Each leaf remembers the source byte it was laid
//! out from, which decides the glyph run it joins, so every fragment becomes one run no matter
//! how Typst reorders glyphs inside fractions or scripts.

pub mod frame;
pub mod markup;
pub mod world;

use log::debug;
use typst::{Library, utils::LazyHash};

use crate::scene::{Aabb2, Affine2, Mobject2D, transform_path};
use crate::tex::{MathRenderer, MathStyle, TexError, TexTemplate, parse};

use frame::Leaf;
use markup::{BASE_PT, Markup};
use world::{FontSet, TypstWorld};

/// Height of the math axis above the baseline, in em; used to place the baseline of a block
/// that has no atom on it (a bare fraction).
const AXIS_EM: f32 = 0.25;

pub struct TypstRenderer {
    library: LazyHash<Library>,
    fonts: FontSet,
    line_height: f32,
}

impl std::fmt::Debug for TypstRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypstRenderer")
            .field("fonts", &self.fonts.len())
            .field("line_height", &self.line_height)
            .finish()
    }
}

impl TypstRenderer {
    /// System fonts plus the fonts bundled with Typst.
    pub fn new() -> Result<Self, TexError> {
        Self::with_fonts(FontSet::system())
    }

    /// Bundled fonts only.
    pub fn embedded() -> Result<Self, TexError> {
        Self::with_fonts(FontSet::embedded())
    }

    fn with_fonts(fonts: FontSet) -> Result<Self, TexError> {
        if fonts.is_empty() {
            return Err(TexError::NoFonts);
        }
        Ok(Self {
            library: world::library(),
            fonts,
            line_height: 1.2,
        })
    }

    fn compile_leaves(&self, source: String) -> Result<Vec<Leaf>, TexError> {
        let world = TypstWorld::new(&self.library, &self.fonts, source);
        let doc = world.compile()?;
        Ok(frame::collect_leaves(&doc, world.main_source()))
    }
}

/// Page points (y down, baseline at `baseline`) to em units (y up, baseline at 0).
fn to_em(baseline: f32) -> Affine2 {
    Affine2::scale(1.0 / BASE_PT, -1.0 / BASE_PT).mul(Affine2::translate(0.0, -baseline))
}

fn leaf_bounds(leaves: &[Leaf]) -> Aabb2 {
    leaves
        .iter()
        .filter_map(|l| l.mobject.outline.as_ref())
        .map(crate::scene::path_bounds)
        .fold(Aabb2::empty(), Aabb2::union)
}

/// Baseline of the first glyph laid out from a top-level atom; otherwise the math axis
/// through the middle of the block.
fn find_baseline(leaves: &[Leaf], markup: &Markup) -> f32 {
    leaves
        .iter()
        .find_map(|l| match (l.at, l.baseline) {
            (Some(at), Some(y)) if markup.on_baseline(at) => Some(y),
            _ => None,
        })
        .unwrap_or_else(|| {
            let b = leaf_bounds(leaves);
            if b.is_empty() {
                0.0
            } else {
                b.center()[1] + AXIS_EM * BASE_PT
            }
        })
}

fn place(mut leaf: Leaf, xf: Affine2) -> Mobject2D {
    if let Some(path) = leaf.mobject.outline.take() {
        leaf.mobject.outline = Some(transform_path(&path, xf));
    }
    leaf.mobject
}

impl MathRenderer for TypstRenderer {
    fn render_math(
        &self,
        parts: &[&str],
        style: MathStyle,
        template: Option<&TexTemplate>,
    ) -> Result<Mobject2D, TexError> {
        let mut lists = Vec::with_capacity(parts.len());
        for part in parts {
            let src = match template {
                Some(t) => t.expand(part)?,
                None => part.to_string(),
            };
            lists.push(parse::parse(&src)?);
        }
        let markup = markup::math_markup(&lists, style);
        let leaves = self.compile_leaves(markup.source.clone())?;
        let xf = to_em(find_baseline(&leaves, &markup));

        let mut runs: Vec<Mobject2D> = (0..parts.len())
            .map(|i| Mobject2D::new(format!("run{i}")))
            .collect();
        // Generated glyphs (no source byte) stay with the run before them.
        let mut current = 0;
        for leaf in leaves {
            if let Some(i) = leaf.at.and_then(|at| markup.part_at(at)) {
                current = i;
            }
            if let Some(run) = runs.get_mut(current) {
                run.add_child(place(leaf, xf));
            }
        }
        debug!(
            "typst math {parts:?}: {} glyph(s) in {} run(s)",
            runs.iter().map(|r| r.children.len()).sum::<usize>(),
            runs.len()
        );
        Ok(Mobject2D::new("MathTex").with_children(runs))
    }

    fn render_text(&self, text: &str) -> Result<Mobject2D, TexError> {
        let mut run = Mobject2D::new("run0");
        for (line_no, line) in text.lines().enumerate() {
            let leaves = self.compile_leaves(markup::text_markup(line))?;
            let baseline = leaves.iter().find_map(|l| l.baseline).unwrap_or(0.0);
            let xf = Affine2::translate(0.0, -(line_no as f32) * self.line_height).mul(to_em(baseline));
            let mut line_m = Mobject2D::new(format!("line{line_no}"));
            for leaf in leaves {
                line_m.add_child(place(leaf, xf));
            }
            run.add_child(line_m);
        }
        Ok(Mobject2D::new("Text").with_children([run]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{DEFAULT_PRECISION, find_rendered};
    use crate::scene::Scene2D;

    fn renderer() -> TypstRenderer {
        TypstRenderer::embedded().unwrap()
    }

    #[test]
    fn test_every_fragment_becomes_one_run() {
        let tex = renderer();
        let m = tex
            .render_math(&["x", "=", r"\frac{1}{2}"], MathStyle::Display, None)
            .unwrap();
        assert_eq!(m.children.len(), 3);
        assert!(m.children.iter().all(|run| !run.children.is_empty()));
        assert_eq!(m.children[1].children.len(), 1);
        assert_eq!(m.children[1].children[0].name, "=");
        // Numerator, bar, denominator.
        assert!(m.children[2].children.iter().any(|l| l.name == "rule"));
        assert!(m.children[2].children.len() >= 3);

        let (x, eq) = (m.children[0].bounds(), m.children[1].bounds());
        assert!(x.right() <= eq.left());
    }

    #[test]
    fn test_geometry_is_in_em_on_the_baseline() {
        let tex = renderer();
        let m = tex.math("x + 1").unwrap();
        let b = m.bounds();
        assert!(b.bottom().abs() < 0.05, "bottom {}", b.bottom());
        assert!(b.top() > 0.4 && b.top() < 1.0, "top {}", b.top());
        assert!(b.width() > 1.0 && b.width() < 4.0, "width {}", b.width());
        assert!(b.left() >= -0.05);
    }

    #[test]
    fn test_bare_fraction_centers_on_axis() {
        let tex = renderer();
        let b = tex.math(r"\frac{1}{2}").unwrap().bounds();
        assert!(b.top() > 0.3 && b.bottom() < 0.0);
    }

    #[test]
    fn test_repeated_glyphs_are_found() {
        let tex = renderer();
        let mut scene = Scene2D::new();
        let block = scene.insert(tex.math("x + x = 2x").unwrap());
        let needle = tex.math("x").unwrap();
        assert_eq!(find_rendered(&scene, &needle, block, 0, DEFAULT_PRECISION).len(), 3);
    }

    #[test]
    fn test_text_lines_stack() {
        let tex = renderer();
        let m = tex.render_text("ab\ncd").unwrap();
        let lines = &m.children[0].children;
        assert_eq!(lines.len(), 2);
        assert_eq!(m.leaves().len(), 4);
        assert!(lines[1].bounds().top() < lines[0].bounds().top());
    }

    #[test]
    fn test_compile_errors_surface() {
        let tex = renderer();
        let lists = vec![parse::parse("x").unwrap()];
        let mut markup = markup::math_markup(&lists, MathStyle::Display);
        markup.source.push_str("#nope(");
        assert!(matches!(
            tex.compile_leaves(markup.source),
            Err(TexError::Typst(_))
        ));
        assert!(matches!(tex.math(r"\frobnicate"), Err(TexError::UnknownCommand(_))));
    }
}
