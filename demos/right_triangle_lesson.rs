//! Demo: two right-triangle problems solved side by side with a scrolling derivation.
//!
//! The first triangle asks for the side opposite a known angle; the second is drawn with
//! the right angle on top and asks for the altitude. Each derivation is revealed line by
//! line, the rounded answer is swapped in with a callout, then the view is reset for the
//! next problem.
//!
//! Run:
//! - `RUST_LOG=info cargo run --example right_triangle_lesson`

use anyhow::Context as _;
use log::info;

use stepwise::anim::Animation;
use stepwise::config::Config;
use stepwise::layout::Solution;
use stepwise::scroll::{CalloutPosition, RevealStrategy, ScrollManager};
use stepwise::triangle::{Corner, Descriptor, RightTriangle};
use stepwise::voiceover::{ScriptedSpeech, SpeechService, voiceover};
use stepwise::{MathRenderer, Recorder, Stage, TypstRenderer};

fn lesson(
    stage: &mut Recorder,
    tex: &TypstRenderer,
    speech: &dyn SpeechService,
    config: &Config,
    descriptor: &Descriptor,
    intro: &str,
) -> anyhow::Result<()> {
    let triangle = RightTriangle::build(descriptor, &mut stage.scene, tex, &config.triangle)
        .context("building triangle")?;
    stage.scene.move_to(triangle.id(), [3.5, 0.0]);
    info!("derivation: {:?}", triangle.get_steps());

    let mut solution = Solution::new(config.layout);
    for step in triangle.derivation().to_steps(config.layout) {
        solution.push(step);
    }
    let built = solution.build(&mut stage.scene, tex)?;
    let mut scroll = ScrollManager::from_solution(&mut stage.scene, &built, config.scroll);

    {
        let mut vo = voiceover(&mut *stage, speech, intro)?;
        vo.stage().play(vec![Animation::Write(triangle.id())], Some(1.5))?;
        vo.wait_until_bookmark("unknown")?;
        if let Some(label) = triangle.unknown_label() {
            vo.stage().play(
                vec![Animation::Indicate {
                    target: label,
                    color: triangle.unknown_color(),
                    scale: 1.3,
                }],
                None,
            )?;
        }
    }

    scroll.prepare_next(stage, 2, false, RevealStrategy::Staggered, None)?;
    // One narrated segment per remaining line.
    while scroll.next_to_reveal() < scroll.len() {
        let mut vo = voiceover(&mut *stage, speech, "Carry on with the next line.")?;
        scroll.reveal(vo.stage())?;
        if scroll.get_visible_range().len() > 4 {
            scroll.scroll_down(vo.stage(), 1, None)?;
        }
    }

    let steps = triangle.get_steps();
    if let (Some(answer), Some(last)) = (steps.last(), scroll.len().checked_sub(1)) {
        let mut boxed = tex.render_text(answer)?;
        boxed.scale(config.layout.math_scale);
        boxed.set_color(config.palette.highlight);
        let boxed = stage.scene.insert(boxed);
        scroll.replace_with_callout(
            stage,
            tex,
            last,
            boxed,
            "rounded to two places",
            CalloutPosition::Right,
            None,
        )?;
        stage.wait(1.0)?;
        scroll.restore_original(stage, last, None)?;
    }

    scroll.reset_view(stage)?;
    stage.play(vec![Animation::fade_out(triangle.id())], None)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::default();
    let tex = TypstRenderer::new().context("loading fonts")?;
    let speech = ScriptedSpeech::default();
    let mut stage = Recorder::default();

    let opposite = Descriptor::new().a("28 cm").alpha("20°32'").unknown("opp");
    lesson(
        &mut stage,
        &tex,
        &speech,
        &config,
        &opposite,
        "We know one leg and one angle. <bookmark mark=\"unknown\"/> We want the opposite side.",
    )
    .context("opposite-side lesson")?;

    let altitude = Descriptor::new()
        .a("8")
        .b("6")
        .unknown("h")
        .right_angle(Corner::PerpendicularFoot);
    lesson(
        &mut stage,
        &tex,
        &speech,
        &config,
        &altitude,
        "Both legs are known. <bookmark mark=\"unknown\"/> How long is the altitude?",
    )
    .context("altitude lesson")?;

    info!(
        "recorded {:.2}s across {} play(s)",
        stage.time(),
        stage.play_count()
    );
    Ok(())
}
