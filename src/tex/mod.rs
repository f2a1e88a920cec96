//! Math and text rendering.
//!
//! [`MathRenderer`] is the seam lesson code renders through. A rendered math block is a
//! three-level tree:
//!
//! ```text
//! MathTex            root, one per call
//! ├── run 0          one per source fragment
//! │   ├── glyph      outlined leaves, in drawing order
//! │   └── ...
//! └── run 1 ...
//! ```
//!
//! Geometry is in em units (1 em = 1 world unit), baseline at y = 0, left edge at x = 0.
//! Callers scale and position the block afterwards.
//!
//! Fragments are written in a TeX subset, parsed by [`parse`]. Two renderers consume the parse:
//! - [`crate::typst::TypstRenderer`] compiles them with Typst; lessons render through it.
//! - [`Typesetter`] lays them out with a small box model over a [`GlyphSource`]. Over the
//!   built-in stroke font its output is identical on every machine, which is what the tests
//!   and the glyph-search fixtures rely on.

pub mod layout;
pub mod parse;

use std::fmt;

use crate::font::{FontError, GlyphSource, StrokeFont};
use crate::scene::{Mobject2D, Style};

use layout::Layouter;
use parse::Node;

/// TeX's four math styles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MathStyle {
    Display,
    Text,
    Script,
    ScriptScript,
}

impl MathStyle {
    pub const ALL: [MathStyle; 4] = [
        MathStyle::Display,
        MathStyle::Text,
        MathStyle::Script,
        MathStyle::ScriptScript,
    ];

    /// Size relative to the base font size.
    pub fn scale(self) -> f32 {
        match self {
            MathStyle::Display | MathStyle::Text => 1.0,
            MathStyle::Script => 0.7,
            MathStyle::ScriptScript => 0.5,
        }
    }

    /// Style of super- and subscripts.
    pub fn script(self) -> Self {
        match self {
            MathStyle::Display | MathStyle::Text => MathStyle::Script,
            MathStyle::Script | MathStyle::ScriptScript => MathStyle::ScriptScript,
        }
    }

    /// Style of fraction numerators and denominators.
    pub fn fraction(self) -> Self {
        match self {
            MathStyle::Display => MathStyle::Text,
            MathStyle::Text => MathStyle::Script,
            MathStyle::Script | MathStyle::ScriptScript => MathStyle::ScriptScript,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TexError {
    #[error("unknown command {0}")]
    UnknownCommand(String),

    #[error("unsupported character {0:?}")]
    UnsupportedChar(char),

    #[error("unbalanced braces or \\left/\\right in {0:?}")]
    Unbalanced(String),

    #[error("missing argument in {0:?}")]
    MissingArgument(String),

    #[error("double {0} script")]
    DoubleScript(&'static str),

    #[error("macro expansion of {0} does not terminate")]
    MacroLoop(String),

    #[error("typst: {0}")]
    Typst(String),

    #[error("no fonts available for typesetting")]
    NoFonts,

    #[error(transparent)]
    Font(#[from] FontError),
}

/// Argument-free macro definitions expanded before parsing (a stand-in for a TeX preamble).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TexTemplate {
    macros: Vec<(String, String)>,
}

impl TexTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `\name` expands to `body`. Later definitions of the same name win.
    pub fn with_macro(mut self, name: &str, body: &str) -> Self {
        let name = name.trim_start_matches('\\').to_string();
        self.macros.retain(|(n, _)| *n != name);
        self.macros.push((name, body.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Expand every macro occurrence until none remain.
    pub fn expand(&self, src: &str) -> Result<String, TexError> {
        let mut out = src.to_string();
        for _ in 0..32 {
            let mut changed = false;
            for (name, body) in &self.macros {
                let next = replace_command(&out, name, body);
                if next != out {
                    out = next;
                    changed = true;
                }
            }
            if !changed {
                return Ok(out);
            }
        }
        Err(TexError::MacroLoop(src.to_string()))
    }
}

/// Replace `\name` (not followed by another letter) with `body`.
fn replace_command(src: &str, name: &str, body: &str) -> String {
    let pattern = format!("\\{name}");
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(i) = rest.find(&pattern) {
        let after = &rest[i + pattern.len()..];
        out.push_str(&rest[..i]);
        if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
            out.push_str(&pattern);
        } else {
            out.push_str(body);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Renders math fragments and plain text into block trees.
pub trait MathRenderer {
    /// Render `parts` as one expression, one glyph run per part.
    fn render_math(
        &self,
        parts: &[&str],
        style: MathStyle,
        template: Option<&TexTemplate>,
    ) -> Result<Mobject2D, TexError>;

    /// Render plain upright text; `\n` starts a new line.
    fn render_text(&self, text: &str) -> Result<Mobject2D, TexError>;

    /// Single-fragment display math with no template.
    fn math(&self, src: &str) -> Result<Mobject2D, TexError> {
        self.render_math(&[src], MathStyle::Display, None)
    }
}

/// Box-model renderer over a [`GlyphSource`]; the default source is the stroke font.
pub struct Typesetter {
    font: Box<dyn GlyphSource>,
    line_height: f32,
}

impl fmt::Debug for Typesetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typesetter")
            .field("metrics", &self.font.metrics())
            .field("line_height", &self.line_height)
            .finish()
    }
}

impl Default for Typesetter {
    fn default() -> Self {
        Self::new(Box::new(StrokeFont::new()))
    }
}

impl Typesetter {
    pub fn new(font: Box<dyn GlyphSource>) -> Self {
        Self {
            font,
            line_height: 1.2,
        }
    }

    fn glyph_style(&self) -> Style {
        Style {
            stroke_width: 0.06,
            ..Style::default()
        }
    }
}

impl MathRenderer for Typesetter {
    fn render_math(
        &self,
        parts: &[&str],
        style: MathStyle,
        template: Option<&TexTemplate>,
    ) -> Result<Mobject2D, TexError> {
        let mut lists: Vec<Vec<Node>> = Vec::with_capacity(parts.len());
        for part in parts {
            let src = match template {
                Some(t) => t.expand(part)?,
                None => part.to_string(),
            };
            lists.push(parse::parse(&src)?);
        }
        let atoms: Vec<(usize, &Node)> = lists
            .iter()
            .enumerate()
            .flat_map(|(i, list)| list.iter().map(move |n| (i, n)))
            .collect();

        let hbox = Layouter::new(self.font.as_ref()).layout_parts(&atoms, style)?;

        let glyph_style = self.glyph_style();
        let mut runs: Vec<Mobject2D> = (0..parts.len())
            .map(|i| Mobject2D::new(format!("run{i}")))
            .collect();
        for placed in &hbox.glyphs {
            if let Some(run) = runs.get_mut(placed.part) {
                run.add_child(
                    Mobject2D::new(placed.name.clone())
                        .with_outline(placed.finish())
                        .with_style(glyph_style),
                );
            }
        }
        Ok(Mobject2D::new("MathTex").with_children(runs))
    }

    fn render_text(&self, text: &str) -> Result<Mobject2D, TexError> {
        let glyph_style = self.glyph_style();
        let mut run = Mobject2D::new("run0");
        for (line_no, line) in text.lines().enumerate() {
            let node = Node::Text(line.to_string());
            let hbox = Layouter::new(self.font.as_ref()).layout_parts(&[(0, &node)], MathStyle::Text)?;
            let mut line_m = Mobject2D::new(format!("line{line_no}"));
            for placed in &hbox.glyphs {
                line_m.add_child(
                    Mobject2D::new(placed.name.clone())
                        .with_outline(placed.finish())
                        .with_style(glyph_style),
                );
            }
            line_m.shift([0.0, -(line_no as f32) * self.line_height]);
            run.add_child(line_m);
        }
        Ok(Mobject2D::new("Text").with_children([run]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_follow_parts() {
        let tex = Typesetter::default();
        let m = tex
            .render_math(&["x", "=", "2"], MathStyle::Display, None)
            .unwrap();
        assert_eq!(m.children.len(), 3);
        assert_eq!(m.children[0].children[0].name, "x");
        assert_eq!(m.children[1].children[0].name, "=");
        assert_eq!(m.leaves().len(), 3);
    }

    #[test]
    fn test_parts_share_spacing() {
        let tex = Typesetter::default();
        let joined = tex.math("x=2").unwrap().bounds();
        let split = tex
            .render_math(&["x", "=", "2"], MathStyle::Display, None)
            .unwrap()
            .bounds();
        assert!((joined.width() - split.width()).abs() < 1e-5);
    }

    #[test]
    fn test_template_macros_expand() {
        let t = TexTemplate::new()
            .with_macro(r"\opp", r"\text{opp}")
            .with_macro("hyp", r"\text{hyp}");
        assert_eq!(t.expand(r"\opp/\hyp").unwrap(), r"\text{opp}/\text{hyp}");
        // Longer commands sharing a prefix are left alone.
        assert_eq!(t.expand(r"\oppx").unwrap(), r"\oppx");

        let looping = TexTemplate::new().with_macro("a", r"x\a");
        assert!(matches!(looping.expand(r"\a"), Err(TexError::MacroLoop(_))));
    }

    #[test]
    fn test_unknown_command_fails() {
        let tex = Typesetter::default();
        assert!(matches!(
            tex.math(r"\frobnicate"),
            Err(TexError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_render_text_lines() {
        let tex = Typesetter::default();
        let m = tex.render_text("ab\ncd").unwrap();
        let lines = &m.children[0].children;
        assert_eq!(lines.len(), 2);
        assert!(lines[1].bounds().top() < lines[0].bounds().bottom() + 0.5);
        assert_eq!(m.leaves().len(), 4);
    }

    #[test]
    fn test_style_ladder() {
        assert_eq!(MathStyle::Display.fraction(), MathStyle::Text);
        assert_eq!(MathStyle::Text.script(), MathStyle::Script);
        assert_eq!(MathStyle::Script.script(), MathStyle::ScriptScript);
        assert!(MathStyle::ALL.iter().all(|s| s.scale() > 0.0));
    }
}
