//! `stepwise` library crate root.
//!
//! Authoring primitives for narrated math lessons: lessons build labeled derivation steps
//! (`layout`), locate sub-expressions by glyph shape (`glyph`), construct right triangles
//! and their derivations (`triangle`, `steps`), and drive everything one reveal, scroll or
//! replace at a time through a scrolling viewport (`scroll`) on a [`stage::Stage`].
//!
//! Math is typeset by Typst ([`TypstRenderer`]); the stroke-font [`Typesetter`] gives
//! machine-independent output for tests.
//!
//! The library never installs a logger; binaries and demos do.

pub mod anim;
pub mod config;
pub mod font;
pub mod glyph;
pub mod layout;
pub mod scene;
pub mod scroll;
pub mod stage;
pub mod steps;
pub mod tex;
pub mod triangle;
pub mod typst;
pub mod voiceover;

pub use config::Config;
pub use scene::{ObjectId, Rgba, Scene2D};
pub use stage::{Recorder, Stage};
pub use crate::typst::TypstRenderer;
pub use tex::{MathRenderer, Typesetter};
