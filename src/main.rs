//! Thin binary wrapper for local development.
//!
//! Runs the right-triangle lesson headlessly on a [`Recorder`] and prints the recorded
//! timeline. An optional first argument names a JSON config file. Math is typeset with Typst;
//! `STEPWISE_STROKE_FONT=1` switches to the built-in stroke font.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -- config.json`

use std::collections::BTreeMap;

use anyhow::Context as _;
use log::{info, warn};

use stepwise::anim::Animation;
use stepwise::layout::Solution;
use stepwise::scroll::{RevealStrategy, ScrollManager};
use stepwise::triangle::{Descriptor, RightTriangle};
use stepwise::voiceover::{ScriptedSpeech, voiceover};
use stepwise::{Config, MathRenderer, Recorder, Stage, Typesetter, TypstRenderer};

/// Typst over system and bundled fonts, or the stroke font when asked for or when Typst has
/// no fonts to work with.
fn renderer() -> Box<dyn MathRenderer> {
    if std::env::var_os("STEPWISE_STROKE_FONT").is_some() {
        info!("typesetting with the stroke font");
        return Box::new(Typesetter::default());
    }
    match TypstRenderer::new() {
        Ok(r) => {
            info!("typesetting with {r:?}");
            Box::new(r)
        }
        Err(e) => {
            warn!("typst unavailable ({e}), using the stroke font");
            Box::new(Typesetter::default())
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Keep logging setup in the binary so the library remains unopinionated.
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading config {path}"))?,
        None => Config::default(),
    };
    let tex = renderer();
    let speech = ScriptedSpeech::default();
    let mut stage = Recorder::default();

    let descriptor = Descriptor::new().a("28 cm").alpha("20°32'").unknown("opp");
    let triangle = RightTriangle::build(&descriptor, &mut stage.scene, tex.as_ref(), &config.triangle)
        .context("building triangle")?;
    stage.scene.move_to(triangle.id(), [3.5, 0.0]);

    let mut solution = Solution::new(config.layout);
    for step in triangle.derivation().to_steps(config.layout) {
        solution.push(step);
    }
    let built = solution
        .build(&mut stage.scene, tex.as_ref())
        .context("laying out derivation")?;
    let mut scroll = ScrollManager::from_solution(&mut stage.scene, &built, config.scroll);

    {
        let mut vo = voiceover(
            &mut stage,
            &speech,
            "Here is our triangle. <bookmark mark=\"x\"/> We are looking for the side x.",
        )?;
        vo.stage().play(vec![Animation::Create(triangle.id())], None)?;
        vo.wait_until_bookmark("x")?;
        if let Some(label) = triangle.unknown_label() {
            vo.stage().play(
                vec![Animation::Indicate {
                    target: label,
                    color: triangle.unknown_color(),
                    scale: 1.2,
                }],
                None,
            )?;
        }
    }

    while scroll.next_to_reveal() < scroll.len() {
        let mut vo = voiceover(&mut stage, &speech, "Next, we write down the following line.")?;
        scroll.prepare_next(vo.stage(), 1, false, RevealStrategy::OneByOne, None)?;
        if scroll.get_visible_range().len() > 3 {
            scroll.scroll_down(vo.stage(), 1, None)?;
        }
    }
    info!("lesson finished at {:.2}s", stage.time());

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for clip in &stage.timeline.clips {
        *counts.entry(clip.label.as_str()).or_default() += 1;
    }
    println!("answer: {}", triangle.get_steps().last().map_or("-", String::as_str));
    println!("duration: {:.2}s over {} play(s)", stage.time(), stage.play_count());
    for (label, n) in counts {
        println!("  {label:<22} {n}");
    }
    Ok(())
}
