//! Worked-derivation generators.
//!
//! Every generator returns a [`Derivation`]: ordered lines, each with a plain-text form (what
//! `get_steps` hands to lesson scripts) and, for math lines, a TeX form for rendering.
//! Keystroke lines have no TeX form and render as text.

pub mod dms;
pub mod format;
pub mod linear;
pub mod pythagoras;
pub mod quadratic;
pub mod trig;

use crate::config::LayoutConfig;
use crate::layout::LabeledStep;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("leading coefficient is zero; not a quadratic")]
    NotQuadratic,

    #[error("points share x = {0}; the line is vertical")]
    VerticalLine(f64),

    #[error("invalid input: {0}")]
    Invalid(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// A formula or fact, stated before numbers go in.
    Statement,
    Substitution,
    Isolation,
    Keystrokes,
    Result,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepLine {
    pub kind: LineKind,
    pub text: String,
    pub tex: Option<String>,
}

impl StepLine {
    fn add_to(&self, step: &mut LabeledStep) {
        match &self.tex {
            Some(tex) => step.add_expression(tex),
            None => step.add_text(&self.text),
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derivation {
    pub lines: Vec<StepLine>,
}

impl Derivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: LineKind, text: impl Into<String>, tex: impl Into<String>) {
        self.lines.push(StepLine {
            kind,
            text: text.into(),
            tex: Some(tex.into()),
        });
    }

    pub fn keys(&mut self, text: impl Into<String>) {
        self.lines.push(StepLine {
            kind: LineKind::Keystrokes,
            text: text.into(),
            tex: None,
        });
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }

    pub fn last_text(&self) -> Option<&str> {
        self.lines.last().map(|l| l.text.as_str())
    }

    /// One labeled step with a line per derivation line.
    pub fn to_step(&self, caption: Option<&str>, config: LayoutConfig) -> LabeledStep {
        let mut step = LabeledStep::new().with_config(config);
        if let Some(c) = caption {
            step = step.with_caption(c);
        }
        for line in &self.lines {
            line.add_to(&mut step);
        }
        step
    }

    /// One single-line step per derivation line, for revealing line by line.
    pub fn to_steps(&self, config: LayoutConfig) -> Vec<LabeledStep> {
        self.lines
            .iter()
            .map(|line| {
                let mut step = LabeledStep::new().with_config(config);
                line.add_to(&mut step);
                step
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_step_keeps_every_line() {
        let mut d = Derivation::new();
        d.push(LineKind::Statement, "y = mx + b", "y = mx + b");
        d.keys("2 × 3 =");
        d.push(LineKind::Result, "y = 6", "y = 6");
        let step = d.to_step(Some("Evaluate"), LayoutConfig::default());
        assert_eq!(step.expression_count(), 3);
        assert_eq!(step.caption(), Some("Evaluate"));
        assert_eq!(d.last_text(), Some("y = 6"));
        assert_eq!(d.texts().len(), 3);
    }

    #[test]
    fn test_to_steps_splits_lines() {
        let mut d = Derivation::new();
        d.push(LineKind::Statement, "c² = a² + b²", "c^2 = a^2 + b^2");
        d.keys("3 x² + 4 x² =");
        let steps = d.to_steps(LayoutConfig::default());
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.expression_count() == 1 && s.caption().is_none()));
    }
}
