//! Demo: solving `x² - 6x + 8 = 0` with the quadratic formula.
//!
//! Shows annotated steps (coefficients hung under the standard form), shape-based coloring
//! of the coefficients wherever they reappear, a highlight-then-replace of the final line,
//! and a batched fast-forward for the recap.
//!
//! Run:
//! - `RUST_LOG=info cargo run --example quadratic_formula`

use anyhow::Context as _;
use log::info;

use stepwise::config::Config;
use stepwise::glyph::{ColorRule, colorize};
use stepwise::layout::{LabeledStep, Solution};
use stepwise::scene::Rgba;
use stepwise::scroll::{HighlightReplace, RevealStrategy, ScrollManager, ScrollOp};
use stepwise::steps::quadratic::{parse_quadratic, quadratic_steps};
use stepwise::voiceover::{ScriptedSpeech, voiceover};
use stepwise::{MathRenderer, Recorder, Stage, TypstRenderer};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::default();
    let tex = TypstRenderer::new().context("loading fonts")?;
    let speech = ScriptedSpeech::default();
    let mut stage = Recorder::default();
    let precision = config.layout.glyph_precision;

    let q = parse_quadratic("ax^2+bx+c = x^2-6x+8").context("parsing equation")?;
    let derivation = quadratic_steps(&q, 2).context("deriving roots")?;
    info!("roots: {:?}", q.roots());

    let mut steps = derivation.to_steps(config.layout);
    // Hang the coefficients under the standard form.
    if let Some(first) = steps.first_mut() {
        *first = LabeledStep::new()
            .with_caption("Standard form")
            .with_config(config.layout);
        let (_, form_tex) = q.standard_form();
        first.add_expression(&format!("{form_tex} = 0"));
        first.annotate("a", "x^2", None, Some(config.palette.known), None)?;
        first.annotate("b", "6x", None, Some(config.palette.known), None)?;
        first.annotate("c", "8", None, Some(config.palette.known), None)?;
    }
    let mut solution = Solution::new(config.layout);
    for step in steps {
        solution.push(step);
    }
    let built = solution.build(&mut stage.scene, &tex)?;

    let rules = [
        ColorRule::new("-6", Rgba::BLUE),
        ColorRule::new("8", Rgba::GREEN).only([0]),
    ];
    for (i, step) in built.steps.iter().enumerate().skip(1) {
        let recolored = colorize(&mut stage.scene, &tex, step.id, &rules, None, precision);
        info!("step {i}: {recolored} coefficient(s) colored");
    }

    let mut scroll = ScrollManager::from_solution(&mut stage.scene, &built, config.scroll);
    {
        let mut vo = voiceover(
            &mut stage,
            &speech,
            "First bring the equation into standard form <bookmark mark=\"coeffs\"/> and read off a, b and c.",
        )?;
        scroll.reveal(vo.stage())?;
        vo.wait_until_bookmark("coeffs")?;
        let reveal = built.steps[0].reveal_annotations(0);
        vo.stage().play(reveal, None)?;
    }

    while scroll.next_to_reveal() < scroll.len() {
        let mut vo = voiceover(&mut stage, &speech, "Substitute and simplify.")?;
        scroll.prepare_next(vo.stage(), 1, false, RevealStrategy::OneByOne, None)?;
        if scroll.get_visible_range().len() > 4 {
            scroll.scroll_down(vo.stage(), 1, None)?;
        }
    }

    let last = scroll.len().checked_sub(1).context("empty derivation")?;
    let mut answer = tex.math(r"x = 4 \quad x = 2")?;
    answer.scale(config.layout.math_scale);
    let answer = stage.scene.insert(answer);
    scroll.highlight_and_replace(
        &mut stage,
        last,
        answer,
        HighlightReplace {
            final_color: Some(config.palette.highlight),
            ..HighlightReplace::default()
        },
    )?;
    stage.wait(1.0)?;

    // Recap: jump back to the top and replay the first lines instantly.
    scroll.batch_operations(
        &mut stage,
        [
            ScrollOp::ResetView,
            ScrollOp::PrepareNext {
                steps: 3,
                strategy: RevealStrategy::Together,
            },
        ],
    )?;
    scroll.flash(&mut stage, 2, None)?;

    info!(
        "recorded {:.2}s across {} play(s)",
        stage.time(),
        stage.play_count()
    );
    Ok(())
}
