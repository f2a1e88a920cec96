//! Built-in single-stroke vector font.
//!
//! Shapes are drawn on a small grid (cap height 10, x-height 6, descender -3, math axis 4)
//! with a tiny path language:
//!
//! ```text
//! M x y          begin a subpath
//! L x y          line to
//! Q cx cy x y    quadratic curve to
//! Z              close the current subpath
//! ```
//!
//! One grid unit is 0.07 em and every glyph gets one unit of side bearing on each side.

use std::collections::HashMap;

use lyon::math::point;
use lyon::path::Path;

use super::{FontError, FontMetrics, FontVariant, GlyphOutline, GlyphSource};
use crate::scene::{Affine2, transform_path};

const UNIT: f32 = 0.07;
const BEARING: f32 = 1.0;
/// Horizontal shear applied for math italic.
const ITALIC_SLANT: f32 = 0.2;

#[rustfmt::skip]
const GLYPHS: &[(char, f32, &str)] = &[
    ('0', 6.0, "M3 10 Q6 10 6 5 Q6 0 3 0 Q0 0 0 5 Q0 10 3 10 Z"),
    ('1', 5.0, "M1 8 L3 10 L3 0 M1 0 L5 0"),
    ('2', 6.0, "M0 8 Q1 10 3 10 Q6 10 6 7 Q6 5 0 0 L6 0"),
    ('3', 6.0, "M0 9 Q1 10 3 10 Q6 10 6 7.5 Q6 5 3 5 Q6 5 6 2.5 Q6 0 3 0 Q1 0 0 1"),
    ('4', 6.0, "M5 0 L5 10 L0 3 L6 3"),
    ('5', 6.0, "M6 10 L1 10 L0 5 Q2 6 3 6 Q6 6 6 3 Q6 0 3 0 Q1 0 0 1"),
    ('6', 6.0, "M5.5 9.5 Q4.5 10 3 10 Q0 10 0 5 Q0 0 3 0 Q6 0 6 3 Q6 6 3 6 Q0 6 0 3"),
    ('7', 6.0, "M0 10 L6 10 L2 0"),
    ('8', 6.0, "M3 5 Q0 5 0 7.5 Q0 10 3 10 Q6 10 6 7.5 Q6 5 3 5 Q0 5 0 2.5 Q0 0 3 0 Q6 0 6 2.5 Q6 5 3 5 Z"),
    ('9', 6.0, "M6 7 Q6 4 3 4 Q0 4 0 7 Q0 10 3 10 Q6 10 6 5 Q6 0 3 0 Q1.5 0 0.5 0.5"),
    ('\u{b2}', 3.6, "M0 9.8 Q0.6 11 1.8 11 Q3.6 11 3.6 9.2 Q3.6 8 0 5 L3.6 5"),
    ('\u{b3}', 3.6, "M0 10.4 Q0.6 11 1.8 11 Q3.6 11 3.6 9.5 Q3.6 8 1.8 8 Q3.6 8 3.6 6.5 Q3.6 5 1.8 5 Q0.6 5 0 5.6"),

    ('A', 7.0, "M0 0 L3.5 10 L7 0 M1.2 3.5 L5.8 3.5"),
    ('B', 6.5, "M0 0 L0 10 L3.5 10 Q6 10 6 7.5 Q6 5 3.5 5 L0 5 M3.5 5 Q6.5 5 6.5 2.5 Q6.5 0 3.5 0 L0 0"),
    ('C', 6.0, "M6 8.5 Q5 10 3.5 10 Q0 10 0 5 Q0 0 3.5 0 Q5 0 6 1.5"),
    ('D', 6.5, "M0 0 L0 10 L3 10 Q6.5 10 6.5 5 Q6.5 0 3 0 Z"),
    ('E', 6.0, "M6 10 L0 10 L0 0 L6 0 M0 5 L4.5 5"),
    ('F', 6.0, "M6 10 L0 10 L0 0 M0 5 L4.5 5"),
    ('G', 6.5, "M6 8.5 Q5 10 3.5 10 Q0 10 0 5 Q0 0 3.5 0 Q6.5 0 6.5 4 L3.5 4"),
    ('H', 6.0, "M0 0 L0 10 M6 0 L6 10 M0 5 L6 5"),
    ('I', 3.0, "M0 10 L3 10 M1.5 10 L1.5 0 M0 0 L3 0"),
    ('J', 5.0, "M5 10 L5 3 Q5 0 2.5 0 Q0 0 0 3"),
    ('K', 6.0, "M0 0 L0 10 M6 10 L0 4 M2 6 L6 0"),
    ('L', 5.0, "M0 10 L0 0 L5 0"),
    ('M', 8.0, "M0 0 L0 10 L4 3 L8 10 L8 0"),
    ('N', 6.5, "M0 0 L0 10 L6.5 0 L6.5 10"),
    ('O', 7.0, "M3.5 10 Q7 10 7 5 Q7 0 3.5 0 Q0 0 0 5 Q0 10 3.5 10 Z"),
    ('P', 6.0, "M0 0 L0 10 L3.5 10 Q6 10 6 7.5 Q6 5 3.5 5 L0 5"),
    ('Q', 7.0, "M3.5 10 Q7 10 7 5 Q7 0 3.5 0 Q0 0 0 5 Q0 10 3.5 10 Z M4.5 2 L7 -1"),
    ('R', 6.0, "M0 0 L0 10 L3.5 10 Q6 10 6 7.5 Q6 5 3.5 5 L0 5 M3 5 L6 0"),
    ('S', 6.0, "M6 8.5 Q5 10 3 10 Q0 10 0 7.5 Q0 5 3 5 Q6 5 6 2.5 Q6 0 3 0 Q1 0 0 1.5"),
    ('T', 6.0, "M0 10 L6 10 M3 10 L3 0"),
    ('U', 6.0, "M0 10 L0 3 Q0 0 3 0 Q6 0 6 3 L6 10"),
    ('V', 7.0, "M0 10 L3.5 0 L7 10"),
    ('W', 9.0, "M0 10 L2 0 L4.5 7 L7 0 L9 10"),
    ('X', 6.5, "M0 10 L6.5 0 M0 0 L6.5 10"),
    ('Y', 7.0, "M0 10 L3.5 5 L7 10 M3.5 5 L3.5 0"),
    ('Z', 6.0, "M0 10 L6 10 L0 0 L6 0"),

    ('a', 5.0, "M5 6 L5 0 M5 3 Q5 6 2.5 6 Q0 6 0 3 Q0 0 2.5 0 Q5 0 5 3"),
    ('b', 5.0, "M0 10 L0 0 M0 3 Q0 6 2.5 6 Q5 6 5 3 Q5 0 2.5 0 Q0 0 0 3"),
    ('c', 5.0, "M5 5 Q4 6 2.5 6 Q0 6 0 3 Q0 0 2.5 0 Q4 0 5 1"),
    ('d', 5.0, "M5 10 L5 0 M5 3 Q5 6 2.5 6 Q0 6 0 3 Q0 0 2.5 0 Q5 0 5 3"),
    ('e', 5.0, "M0 3 L5 3 Q5 6 2.5 6 Q0 6 0 3 Q0 0 2.5 0 Q4 0 5 1"),
    ('f', 4.0, "M4 9.5 Q3.5 10 2.5 10 Q1 10 1 8 L1 0 M0 6 L3.5 6"),
    ('g', 5.0, "M5 6 L5 -1 Q5 -3 2.5 -3 Q1 -3 0.5 -2.5 M5 3 Q5 6 2.5 6 Q0 6 0 3 Q0 0 2.5 0 Q5 0 5 3"),
    ('h', 5.0, "M0 10 L0 0 M0 3.5 Q0 6 2.5 6 Q5 6 5 3.5 L5 0"),
    ('i', 1.0, "M0.5 0 L0.5 6 M0.5 8 L0.5 8.6"),
    ('j', 3.0, "M2.5 6 L2.5 -1.5 Q2.5 -3 1 -3 Q0 -3 0 -2.5 M2.5 8 L2.5 8.6"),
    ('k', 5.0, "M0 10 L0 0 M5 6 L0 2 M1.5 3 L5 0"),
    ('l', 1.0, "M0.5 10 L0.5 0"),
    ('m', 8.0, "M0 0 L0 6 M0 4 Q0 6 2 6 Q4 6 4 4 L4 0 M4 4 Q4 6 6 6 Q8 6 8 4 L8 0"),
    ('n', 5.0, "M0 0 L0 6 M0 3.5 Q0 6 2.5 6 Q5 6 5 3.5 L5 0"),
    ('o', 5.0, "M2.5 6 Q5 6 5 3 Q5 0 2.5 0 Q0 0 0 3 Q0 6 2.5 6 Z"),
    ('p', 5.0, "M0 6 L0 -3 M0 3 Q0 6 2.5 6 Q5 6 5 3 Q5 0 2.5 0 Q0 0 0 3"),
    ('q', 5.0, "M5 6 L5 -3 M5 3 Q5 6 2.5 6 Q0 6 0 3 Q0 0 2.5 0 Q5 0 5 3"),
    ('r', 4.0, "M0 0 L0 6 M0 3.5 Q0.5 6 3 6 L4 5.5"),
    ('s', 5.0, "M5 5 Q4.5 6 2.5 6 Q0 6 0 4.5 Q0 3 2.5 3 Q5 3 5 1.5 Q5 0 2.5 0 Q0.5 0 0 1"),
    ('t', 4.0, "M1.5 9 L1.5 1 Q1.5 0 3 0 L4 0.3 M0 6 L3.5 6"),
    ('u', 5.0, "M0 6 L0 2.5 Q0 0 2.5 0 Q5 0 5 2.5 M5 6 L5 0"),
    ('v', 5.0, "M0 6 L2.5 0 L5 6"),
    ('w', 8.0, "M0 6 L2 0 L4 5 L6 0 L8 6"),
    ('x', 5.0, "M0 6 L5 0 M0 0 L5 6"),
    ('y', 5.0, "M0 6 L2.5 0 M5 6 L1.5 -3 L0.5 -3"),
    ('z', 5.0, "M0 6 L5 6 L0 0 L5 0"),

    ('+', 6.0, "M3 1 L3 7 M0 4 L6 4"),
    ('-', 6.0, "M0 4 L6 4"),
    ('\u{2212}', 6.0, "M0 4 L6 4"),
    ('=', 6.0, "M0 5.2 L6 5.2 M0 2.8 L6 2.8"),
    ('(', 3.0, "M3 11 Q-3 4 3 -3"),
    (')', 3.0, "M0 11 Q6 4 0 -3"),
    ('[', 3.0, "M3 11 L0 11 L0 -3 L3 -3"),
    (']', 3.0, "M0 11 L3 11 L3 -3 L0 -3"),
    ('{', 3.0, "M3 11 Q1.5 11 1.5 8 L1.5 5.5 Q1.5 4 0 4 Q1.5 4 1.5 2.5 L1.5 0 Q1.5 -3 3 -3"),
    ('}', 3.0, "M0 11 Q1.5 11 1.5 8 L1.5 5.5 Q1.5 4 3 4 Q1.5 4 1.5 2.5 L1.5 0 Q1.5 -3 0 -3"),
    ('/', 4.0, "M0 -2 L4 11"),
    ('!', 1.0, "M0.5 10 L0.5 2.5 M0.5 0.6 L0.5 0"),
    (',', 1.5, "M1 0.6 L1 0 L0 -2"),
    ('.', 1.0, "M0.5 0.6 L0.5 0"),
    ('\'', 1.0, "M0.5 10 L0.5 7"),
    ('"', 2.5, "M0.5 10 L0.5 7 M2 10 L2 7"),
    ('\u{2032}', 1.5, "M1.5 10 L0 7"),
    ('<', 6.0, "M6 8 L0 4 L6 0"),
    ('>', 6.0, "M0 8 L6 4 L0 0"),
    ('|', 1.0, "M0.5 11 L0.5 -3"),
    (':', 1.0, "M0.5 6 L0.5 5.4 M0.5 0.6 L0.5 0"),
    (';', 1.5, "M1 6 L1 5.4 M1 0.6 L1 0 L0 -2"),
    ('?', 5.0, "M0 8 Q0.5 10 2.5 10 Q5 10 5 7.5 Q5 5.5 2.5 4.5 L2.5 2.5 M2.5 0.6 L2.5 0"),
    ('*', 4.0, "M2 8 L2 3 M0 7 L4 4 M0 4 L4 7"),
    ('%', 7.0, "M0 0 L7 10 M1.5 10 Q3 10 3 8 Q3 6 1.5 6 Q0 6 0 8 Q0 10 1.5 10 Z M5.5 4 Q7 4 7 2 Q7 0 5.5 0 Q4 0 4 2 Q4 4 5.5 4 Z"),
    ('_', 6.0, "M0 -1 L6 -1"),
    ('\u{b0}', 3.0, "M1.5 10 Q3 10 3 8.5 Q3 7 1.5 7 Q0 7 0 8.5 Q0 10 1.5 10 Z"),
    ('\u{d7}', 5.0, "M0 1.5 L5 6.5 M0 6.5 L5 1.5"),
    ('\u{f7}', 6.0, "M0 4 L6 4 M3 6.6 L3 7 M3 1 L3 1.4"),
    ('\u{b7}', 1.0, "M0.5 4.3 L0.5 3.7"),
    ('\u{b1}', 6.0, "M3 2.5 L3 8.5 M0 5.5 L6 5.5 M0 0.5 L6 0.5"),
    ('\u{2248}', 6.0, "M0 5 Q1.5 6.5 3 5 Q4.5 3.5 6 5 M0 2.5 Q1.5 4 3 2.5 Q4.5 1 6 2.5"),
    ('\u{2264}', 6.0, "M6 9 L0 5.5 L6 2 M0 0 L6 0"),
    ('\u{2265}', 6.0, "M0 9 L6 5.5 L0 2 M0 0 L6 0"),
    ('\u{2260}', 6.0, "M0 5.2 L6 5.2 M0 2.8 L6 2.8 M4.5 8 L1.5 0"),
    ('\u{2192}', 8.0, "M0 4 L8 4 M6 6 L8 4 L6 2"),
    ('\u{221e}', 9.0, "M4.5 4 Q6.5 7 8 5.5 Q9 4 8 2.5 Q6.5 1 4.5 4 Q2.5 7 1 5.5 Q0 4 1 2.5 Q2.5 1 4.5 4 Z"),
    ('\u{2211}', 7.0, "M7 10 L0 10 L3.5 5 L0 0 L7 0"),
    ('\u{221a}', 8.0, "M0 5 L1.5 6 L3 0 L6 11 L8 11"),
    ('\u{2220}', 6.0, "M6 8 L0 0 L6 0"),
    ('\u{22a5}', 6.0, "M3 10 L3 0 M0 0 L6 0"),

    ('\u{3b1}', 5.5, "M5.5 6 Q4 0 2.5 0 Q0 0 0 3 Q0 6 2.5 6 Q4 6 5.5 0"),
    ('\u{3b2}', 5.0, "M0 -3 L0 7.5 Q0 10 2.5 10 Q4.5 10 4.5 8 Q4.5 5.5 2 5.5 Q5 5.5 5 3 Q5 0 2.5 0 Q1 0 0 1"),
    ('\u{3b3}', 5.0, "M0 6 Q2 6 2.5 2 L2.5 -3 M2.5 2 L5 6"),
    ('\u{3b4}', 5.0, "M4 9.5 Q3 10 2 10 Q0.5 10 0.5 8.5 Q0.5 7 2.5 6 Q5 5 5 3 Q5 0 2.5 0 Q0 0 0 3 Q0 5 2.5 6"),
    ('\u{3b5}', 4.5, "M4.5 5.5 Q4 6 2.5 6 Q0.5 6 0.5 4.5 Q0.5 3 2.5 3 L3 3 M2.5 3 Q0 3 0 1.5 Q0 0 2.5 0 Q4 0 4.5 0.5"),
    ('\u{3b8}', 5.0, "M2.5 10 Q5 10 5 5 Q5 0 2.5 0 Q0 0 0 5 Q0 10 2.5 10 Z M0 5 L5 5"),
    ('\u{3bb}', 5.0, "M0 10 L1 10 L5 0 M2.5 6 L0 0"),
    ('\u{3bc}', 5.0, "M0 6 L0 -3 M0 2.5 Q0 0 2.5 0 Q5 0 5 2.5 M5 6 L5 0"),
    ('\u{3c0}', 6.0, "M0 6 L6 6 M1.8 6 L1.8 0 M4.5 6 L4.5 0"),
    ('\u{3c3}', 5.5, "M5.5 6 L2.5 6 Q0 6 0 3 Q0 0 2.5 0 Q5 0 5 3 Q5 6 2.5 6"),
    ('\u{3c6}', 6.0, "M3 10 L3 -3 M3 6 Q6 6 6 3 Q6 0 3 0 Q0 0 0 3 Q0 6 3 6"),
    ('\u{3c9}', 7.0, "M1 6 Q0 6 0 3 Q0 0 2 0 Q3.5 0 3.5 3 Q3.5 0 5 0 Q7 0 7 3 Q7 6 6 6"),
    ('\u{394}', 7.0, "M3.5 10 L7 0 L0 0 Z"),
    ('\u{398}', 7.0, "M3.5 10 Q7 10 7 5 Q7 0 3.5 0 Q0 0 0 5 Q0 10 3.5 10 Z M2 5 L5 5"),
    ('\u{3a3}', 7.0, "M7 10 L0 10 L3.5 5 L0 0 L7 0"),
    ('\u{3a0}', 7.0, "M0 0 L0 10 L7 10 L7 0"),
    ('\u{3a9}', 7.0, "M0 0 L2.5 0 Q0 3 0 6 Q0 10 3.5 10 Q7 10 7 6 Q7 3 4.5 0 L7 0"),
];

/// Deterministic built-in glyph source.
#[derive(Debug, Clone)]
pub struct StrokeFont {
    table: HashMap<char, (f32, &'static str)>,
    metrics: FontMetrics,
}

impl Default for StrokeFont {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeFont {
    pub fn new() -> Self {
        Self {
            table: GLYPHS.iter().map(|&(c, w, d)| (c, (w, d))).collect(),
            metrics: FontMetrics {
                ascender: 11.0 * UNIT,
                descender: -3.0 * UNIT,
                x_height: 6.0 * UNIT,
                cap_height: 10.0 * UNIT,
                axis_height: 4.0 * UNIT,
                rule_thickness: 0.05,
            },
        }
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        ch == ' ' || self.table.contains_key(&ch)
    }

    /// Every character the font can draw.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.table.keys().copied()
    }
}

impl GlyphSource for StrokeFont {
    fn glyph(&self, ch: char, variant: FontVariant) -> Result<GlyphOutline, FontError> {
        if ch == ' ' {
            return Ok(GlyphOutline {
                path: Path::new(),
                advance: self.space_advance(),
            });
        }
        let &(width, data) = self.table.get(&ch).ok_or(FontError::MissingChar(ch))?;
        let grid = parse_outline(ch, data)?;

        // grid -> em, with the left side bearing applied.
        let mut xf = Affine2::scale(UNIT, UNIT).mul(Affine2::translate(BEARING, 0.0));
        if variant == FontVariant::Italic {
            xf = shear_x(ITALIC_SLANT).mul(xf);
        }
        Ok(GlyphOutline {
            path: transform_path(&grid, xf),
            advance: (width + 2.0 * BEARING) * UNIT,
        })
    }

    fn metrics(&self) -> FontMetrics {
        self.metrics
    }
}

fn shear_x(k: f32) -> Affine2 {
    Affine2 {
        m: [[1.0, 0.0, 0.0], [k, 1.0, 0.0], [0.0, 0.0, 1.0]],
    }
}

/// Parse the glyph path language into a lyon path (grid units).
fn parse_outline(ch: char, data: &str) -> Result<Path, FontError> {
    let bad = |reason: &str| FontError::BadOutline {
        ch,
        reason: reason.to_string(),
    };
    let mut tokens = outline_tokens(data);
    let mut b = Path::builder();
    let mut open = false;
    while let Some(tok) = tokens.next() {
        match tok {
            "M" => {
                if open {
                    b.end(false);
                }
                let (x, y) = (next_number(&mut tokens, ch)?, next_number(&mut tokens, ch)?);
                b.begin(point(x, y));
                open = true;
            }
            "L" | "Q" if !open => return Err(bad("segment before M")),
            "L" => {
                let (x, y) = (next_number(&mut tokens, ch)?, next_number(&mut tokens, ch)?);
                b.line_to(point(x, y));
            }
            "Q" => {
                let (cx, cy) = (next_number(&mut tokens, ch)?, next_number(&mut tokens, ch)?);
                let (x, y) = (next_number(&mut tokens, ch)?, next_number(&mut tokens, ch)?);
                b.quadratic_bezier_to(point(cx, cy), point(x, y));
            }
            "Z" if open => {
                b.close();
                open = false;
            }
            other => return Err(bad(&format!("unexpected token {other:?}"))),
        }
    }
    if open {
        b.end(false);
    }
    Ok(b.build())
}

/// Whitespace-separated tokens, with a command letter split off a number attached to it
/// (`M0` reads as `M`, `0`).
fn outline_tokens(data: &str) -> impl Iterator<Item = &str> {
    data.split_whitespace().flat_map(|tok| {
        let split = tok.len() > 1 && tok.starts_with(|c: char| c.is_ascii_alphabetic());
        let (head, rest) = if split { tok.split_at(1) } else { (tok, "") };
        [head, rest].into_iter().filter(|t| !t.is_empty())
    })
}

fn next_number<'a>(tokens: &mut impl Iterator<Item = &'a str>, ch: char) -> Result<f32, FontError> {
    tokens
        .next()
        .and_then(|t| t.parse::<f32>().ok())
        .ok_or_else(|| FontError::BadOutline {
            ch,
            reason: "expected a number".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::path_bounds;

    #[test]
    fn test_every_glyph_parses() {
        let font = StrokeFont::new();
        for ch in font.chars() {
            let g = font.glyph(ch, FontVariant::Upright);
            assert!(g.is_ok(), "glyph {ch:?} failed: {:?}", g.err());
        }
    }

    #[test]
    fn test_digit_sits_on_baseline() {
        let font = StrokeFont::new();
        let g = font.glyph('7', FontVariant::Upright).unwrap();
        let b = path_bounds(&g.path);
        assert!(b.min[1].abs() < 1e-6);
        assert!((b.max[1] - 0.7).abs() < 1e-5);
        assert!((b.min[0] - UNIT).abs() < 1e-6);
        assert!((g.advance - 8.0 * UNIT).abs() < 1e-6);
    }

    #[test]
    fn test_italic_leans_right() {
        let font = StrokeFont::new();
        let up = path_bounds(&font.glyph('l', FontVariant::Upright).unwrap().path);
        let it = path_bounds(&font.glyph('l', FontVariant::Italic).unwrap().path);
        assert!(it.max[0] > up.max[0]);
    }

    #[test]
    fn test_missing_char() {
        let font = StrokeFont::new();
        assert!(matches!(
            font.glyph('\u{2603}', FontVariant::Upright),
            Err(FontError::MissingChar('\u{2603}'))
        ));
        assert!(font.glyph(' ', FontVariant::Upright).is_ok());
    }

    #[test]
    fn test_command_letter_may_touch_its_number() {
        let attached = parse_outline('x', "M0 8 Q1 10 3 10 L6 0").unwrap();
        let spaced = parse_outline('x', "M 0 8 Q 1 10 3 10 L 6 0").unwrap();
        assert_eq!(path_bounds(&attached), path_bounds(&spaced));
        assert!(parse_outline('x', "M0 0 L1 1 Z").is_ok());
        assert!(parse_outline('x', "M0 0 K1 1").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_outline('x', "L 1 2").is_err());
        assert!(parse_outline('x', "M 1").is_err());
        assert!(parse_outline('x', "M 0 0 K 1 1").is_err());
    }
}
