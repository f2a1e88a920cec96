//! Demo: the line through two points in slope-intercept form.
//!
//! The derivation lines grow out of the point labels, the substituted lines are swapped for
//! their simplified forms in a cascade, and the lesson jumps ahead with `scroll_to`.
//! Layout overrides are read from an inline JSON config.
//!
//! Run:
//! - `RUST_LOG=debug cargo run --example slope_intercept`

use anyhow::Context as _;
use log::info;

use stepwise::config::Config;
use stepwise::layout::Solution;
use stepwise::scene::{DOWN, Rgba, shapes};
use stepwise::scroll::{ReplaceAnimation, ReplaceOptions, ScrollManager};
use stepwise::steps::linear::{line_equation, slope_intercept};
use stepwise::voiceover::{ScriptedSpeech, voiceover};
use stepwise::{MathRenderer, Recorder, Stage, TypstRenderer};

const OVERRIDES: &str = r#"{
    "scroll": { "base_time": 0.8, "cascade_delay": 0.15 },
    "layout": { "math_scale": 0.9 }
}"#;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::from_json_str(OVERRIDES).context("reading overrides")?;
    let tex = TypstRenderer::new().context("loading fonts")?;
    let speech = ScriptedSpeech {
        words_per_minute: 170.0,
        ..ScriptedSpeech::default()
    };
    let mut stage = Recorder::default();

    let (p1, p2) = ([1.0, 3.0], [3.0, 7.0]);
    let derivation = slope_intercept(p1, p2, 2).context("deriving the line")?;
    let (equation, _) = line_equation(2.0, 1.0, 2);
    info!("expecting {equation}");

    // Both points, drawn as dots with their coordinates.
    let mut targets = Vec::new();
    for (i, p) in [p1, p2].iter().enumerate() {
        let at = [3.0 + p[0] as f32, -2.0 + p[1] as f32 * 0.5];
        let dot = stage.scene.insert(shapes::dot(at, 0.08).with_color(Rgba::YELLOW));
        let mut label = tex.math(&format!("P_{} = ({}, {})", i + 1, p[0], p[1]))?;
        label.scale(0.6);
        let label = stage.scene.insert(label);
        stage.scene.next_to_point(label, at, [1.0, 1.0], 0.1);
        stage.add(dot);
        stage.add(label);
        targets.push(label);
    }

    let mut solution = Solution::new(config.layout);
    for step in derivation.to_steps(config.layout) {
        solution.push(step);
    }
    let built = solution.build(&mut stage.scene, &tex)?;
    let mut scroll = ScrollManager::from_solution(&mut stage.scene, &built, config.scroll);
    scroll.set_custom_duration(0, 1.5);

    {
        let mut vo = voiceover(
            &mut stage,
            &speech,
            "The slope is rise over run. <bookmark mark=\"sub\"/> Put in the two points.",
        )?;
        scroll.fade_in_from_target(vo.stage(), targets[0], 1, Some(0.3), None)?;
        vo.wait_until_bookmark("sub")?;
        scroll.fade_in_from_target(vo.stage(), targets[1], 2, Some(0.3), Some(DOWN))?;
    }

    // Swap the fraction lines for their simplified values, one after the other.
    let mut simplified = Vec::new();
    for src in [r"m = \frac{4}{2}", "m = 2"] {
        let mut m = tex.math(src)?;
        m.scale(config.layout.math_scale);
        simplified.push(stage.scene.insert(m));
    }
    scroll.cascade_update(&mut stage, 1, &simplified, None, DOWN)?;

    // Jump to the intercept, then to the equation, which fades through to its boxed form.
    scroll.scroll_to(&mut stage, 3)?;
    let last = scroll.len().checked_sub(1).context("empty derivation")?;
    scroll.scroll_to(&mut stage, last)?;
    let mut boxed = tex.math(&equation)?;
    boxed.scale(config.layout.math_scale * 1.2);
    boxed.set_color(config.palette.highlight);
    let boxed = stage.scene.insert(boxed);
    scroll.replace_in_place(
        &mut stage,
        last,
        boxed,
        ReplaceOptions {
            animation: ReplaceAnimation::FadeThrough,
            ..ReplaceOptions::default()
        },
    )?;
    scroll.highlight_element(&mut stage, last, None)?;
    stage.wait(1.0)?;
    scroll.fadeout_all(&mut stage)?;

    info!(
        "recorded {:.2}s across {} play(s)",
        stage.time(),
        stage.play_count()
    );
    Ok(())
}
