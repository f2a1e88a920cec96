//! Labeled-step layout.
//!
//! A [`LabeledStep`] stacks an optional caption over one or more expressions. Every expression
//! that carries annotations is followed by a reserved slot as tall as its tallest annotation,
//! so revealing an annotation later never moves anything. A [`Solution`] stacks steps into a
//! left-aligned column.

pub mod annotation;
pub mod solution;
pub mod step;

pub use annotation::{AnchorSpec, Annotation};
pub use solution::{BuiltSolution, Solution, arrange_column};
pub use step::{BuiltStep, LabeledStep};

use crate::tex::TexError;

#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("anchor {0:?} not found")]
    NotFound(String),

    #[error(transparent)]
    Tex(#[from] TexError),
}
