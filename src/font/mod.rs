//! Glyph sources for the box-model [`crate::tex::Typesetter`].
//!
//! A [`GlyphSource`] hands out one outline per character as a `lyon::path::Path` in em units
//! (baseline at y = 0, pen at x = 0, y-up); the typesetter scales and places them.
//! [`StrokeFont`] is the built-in single-stroke vector font: deterministic and available
//! everywhere, so layout and glyph search behave identically on every machine.
//!
//! Real font files are only read by the Typst world (`crate::typst::world`).

pub mod stroke;

use lyon::path::Path;

pub use stroke::StrokeFont;

/// Which face of a family a glyph is drawn from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum FontVariant {
    #[default]
    Upright,
    /// Math italic (single-letter variables).
    Italic,
}

/// One glyph outline in em units.
#[derive(Debug, Clone)]
pub struct GlyphOutline {
    pub path: Path,
    /// Horizontal advance in em units.
    pub advance: f32,
}

/// Vertical metrics in em units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FontMetrics {
    pub ascender: f32,
    pub descender: f32,
    pub x_height: f32,
    pub cap_height: f32,
    /// Height of the math axis (center of `+`, `=`, fraction bars) above the baseline.
    pub axis_height: f32,
    pub rule_thickness: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            ascender: 0.75,
            descender: -0.25,
            x_height: 0.42,
            cap_height: 0.7,
            axis_height: 0.28,
            rule_thickness: 0.05,
        }
    }
}

/// Supplies glyph outlines to the typesetter.
pub trait GlyphSource {
    /// Outline for `ch`. Characters without a shape (space) return an empty path.
    fn glyph(&self, ch: char, variant: FontVariant) -> Result<GlyphOutline, FontError>;

    fn metrics(&self) -> FontMetrics;

    /// Advance used for an inter-word space.
    fn space_advance(&self) -> f32 {
        0.3
    }
}

/// Errors produced by a glyph source.
#[derive(thiserror::Error, Debug)]
pub enum FontError {
    #[error("no glyph for character {0:?}")]
    MissingChar(char),

    #[error("malformed outline for {ch:?}: {reason}")]
    BadOutline { ch: char, reason: String },
}
