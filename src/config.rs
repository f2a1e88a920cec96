//! Layout, scroll and triangle settings.
//!
//! Components take these records explicitly. A lesson that needs a local override clones the
//! record and changes fields; nothing here is global.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::glyph::DEFAULT_PRECISION;
use crate::scene::Rgba;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Named colors used across lessons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub text: Rgba,
    pub muted: Rgba,
    pub highlight: Rgba,
    pub known: Rgba,
    pub unknown: Rgba,
    pub annotation: Rgba,
    pub callout: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            text: Rgba::WHITE,
            muted: Rgba::GRAY,
            highlight: Rgba::YELLOW,
            known: Rgba::BLUE,
            unknown: Rgba::RED,
            annotation: Rgba::GOLD,
            callout: Rgba::ORANGE,
        }
    }
}

/// Labeled-step geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Scale applied to rendered expressions (1.0 = 1 em per world unit).
    pub math_scale: f32,
    pub caption_scale: f32,
    pub caption_color: Rgba,
    pub annotation_scale: f32,
    pub annotation_color: Rgba,
    /// Gap between an expression's bottom and the top of its annotations.
    pub annotation_buff: f32,
    /// Default outward shift of two-anchor annotation copies.
    pub annotation_h_offset: f32,
    pub caption_gap: f32,
    pub expression_gap: f32,
    /// Gap between consecutive steps of a solution.
    pub step_gap: f32,
    /// Decimal places of glyph keys.
    pub glyph_precision: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            math_scale: 0.8,
            caption_scale: 0.5,
            caption_color: Rgba::GRAY,
            annotation_scale: 0.55,
            annotation_color: Rgba::GOLD,
            annotation_buff: 0.15,
            annotation_h_offset: 0.0,
            caption_gap: 0.2,
            expression_gap: 0.25,
            step_gap: 0.45,
            glyph_precision: DEFAULT_PRECISION,
        }
    }
}

/// Scroll viewport behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Top-left corner of the first visible block.
    pub start_position: [f32; 2],
    /// Vertical gap between blocks of the column.
    pub buff: f32,
    pub base_time: f32,
    pub auto_adjust_timing: bool,
    /// Lag of the staggered reveal strategy.
    pub lag_ratio: f32,
    /// Upward travel of revealed blocks.
    pub reveal_shift: f32,
    pub highlight_color: Rgba,
    pub highlight_scale: f32,
    pub callout_color: Rgba,
    pub callout_buff: f32,
    pub cascade_delay: f32,
    pub cascade_shift: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            start_position: [-6.5, 3.5],
            buff: 0.4,
            base_time: 1.0,
            auto_adjust_timing: true,
            lag_ratio: 0.3,
            reveal_shift: 0.25,
            highlight_color: Rgba::YELLOW,
            highlight_scale: 1.15,
            callout_color: Rgba::ORANGE,
            callout_buff: 0.5,
            cascade_delay: 0.15,
            cascade_shift: 0.2,
        }
    }
}

/// Right-triangle construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangleConfig {
    /// World length of the longest side.
    pub max_side: f32,
    pub label_scale: f32,
    /// Distance of side labels from their side.
    pub label_buff: f32,
    pub arc_radius: f32,
    pub right_angle_size: f32,
    /// Angle labels wider than this move out and get a curved arrow.
    pub long_label_width: f32,
    pub long_label_offset: f32,
    /// Decimal places of computed sides.
    pub precision: usize,
    /// Relative tolerance of consistency checks.
    pub tolerance: f64,
    pub stroke: Rgba,
    pub known_color: Rgba,
    pub unknown_color: Rgba,
}

impl Default for TriangleConfig {
    fn default() -> Self {
        Self {
            max_side: 4.0,
            label_scale: 0.55,
            label_buff: 0.25,
            arc_radius: 0.45,
            right_angle_size: 0.25,
            long_label_width: 0.9,
            long_label_offset: 0.9,
            precision: 2,
            tolerance: 1e-3,
            stroke: Rgba::WHITE,
            known_color: Rgba::BLUE,
            unknown_color: Rgba::RED,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub scroll: ScrollConfig,
    pub triangle: TriangleConfig,
    pub palette: Palette,
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&s)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = Config::from_json_str(r#"{ "scroll": { "buff": 0.8 } }"#).unwrap();
        assert_eq!(cfg.scroll.buff, 0.8);
        assert_eq!(cfg.scroll.base_time, ScrollConfig::default().base_time);
        assert_eq!(cfg.layout, LayoutConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut cfg = Config::default();
        cfg.triangle.precision = 3;
        cfg.palette.highlight = Rgba::TEAL;
        let back = Config::from_json_str(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            Config::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::load("/nonexistent/stepwise.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
