//! End-to-end lesson scenarios on the headless stage.

use stepwise::anim::Animation;
use stepwise::config::{Config, LayoutConfig, ScrollConfig};
use stepwise::glyph::{DEFAULT_PRECISION, GlyphKey, find_group, run_glyphs};
use stepwise::layout::{LabeledStep, Solution};
use stepwise::scene::{ObjectId, Scene2D, shapes};
use stepwise::scroll::{CalloutPosition, ReplaceOptions, RevealStrategy, ScrollManager};
use stepwise::steps::quadratic::{parse_quadratic, quadratic_steps};
use stepwise::tex::MathStyle;
use stepwise::triangle::{Descriptor, RightTriangle};
use stepwise::{MathRenderer, Recorder, Stage, Typesetter};

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn close2(a: [f32; 2], b: [f32; 2]) -> bool {
    close(a[0], b[0]) && close(a[1], b[1])
}

fn column(rec: &mut Recorder, n: usize) -> ScrollManager {
    let ids: Vec<ObjectId> = (0..n)
        .map(|i| rec.scene.insert(shapes::rectangle(3.0, 0.4 + 0.1 * i as f32)))
        .collect();
    ScrollManager::new(&mut rec.scene, ids, ScrollConfig::default())
}

#[test]
fn step_layout_is_stable_when_annotation_appears() {
    let tex = Typesetter::default();
    let mut rec = Recorder::default();
    let cfg = LayoutConfig::default();

    let mut step = LabeledStep::new().with_config(cfg);
    step.add_expression("y = 3x + 2");
    step.annotate("+5", "2", None, None, None).unwrap();
    let built = Solution::new(cfg)
        .with_step(step)
        .build(&mut rec.scene, &tex)
        .unwrap();
    let mut scroll = ScrollManager::from_solution(&mut rec.scene, &built, ScrollConfig::default());

    scroll.prepare_next(&mut rec, 1, false, RevealStrategy::OneByOne, None).unwrap();
    let expr = built.steps[0].get_expression(0).unwrap();
    let ann = built.steps[0].get_annotation(0, 0).unwrap();
    let before = rec.scene.center(expr);
    assert!(!rec.scene.is_visible(ann));

    rec.play(built.steps[0].reveal_annotations(0), None).unwrap();
    assert!(rec.scene.is_visible(ann));
    assert!(close(rec.scene.center(expr)[1], before[1]));

    let two = *run_glyphs(&rec.scene, expr, 0).last().unwrap();
    let (ab, gb) = (rec.scene.bounds(ann), rec.scene.bounds(two));
    assert!(close(ab.center()[0], gb.center()[0]));
    assert!(close(ab.top(), rec.scene.bounds(expr).bottom() - cfg.annotation_buff));
}

#[test]
fn glyph_search_finds_x_at_every_script_level() {
    let tex = Typesetter::default();
    let mut scene = Scene2D::new();
    let block = scene.insert(tex.math(r"\sum_{x=0}^\infty \frac{1}{x!} = e^x").unwrap());

    let x = tex.math("x").unwrap();
    let sup_x = tex.render_math(&["x"], MathStyle::Script, None).unwrap();
    let sel = find_group(&scene, block, &[&x, &sup_x], 0, DEFAULT_PRECISION);

    // Which glyphs are x, judged one glyph at a time.
    let needle_block = scene.insert(tex.math("x").unwrap());
    let needle_glyph = run_glyphs(&scene, needle_block, 0)[0];
    let outline = |s: &Scene2D, id: ObjectId| s.node(id).and_then(|n| n.outline.clone());
    let key_x = GlyphKey::of(&[&outline(&scene, needle_glyph).unwrap()], DEFAULT_PRECISION);
    let glyphs = run_glyphs(&scene, block, 0);
    let xs: Vec<usize> = glyphs
        .iter()
        .enumerate()
        .filter(|(_, id)| {
            outline(&scene, **id)
                .is_some_and(|p| GlyphKey::of(&[&p], DEFAULT_PRECISION) == key_x)
        })
        .map(|(i, _)| i)
        .collect();
    assert!(xs.len() >= 3);

    let covered: Vec<usize> = sel.ranges.iter().flat_map(|r| r.range.clone()).collect();
    assert_eq!(covered, xs);
    for pair in sel.ranges.windows(2) {
        assert!(pair[0].range.end <= pair[1].range.start);
    }
}

#[test]
fn triangle_solve_ends_with_rounded_side() {
    let tex = Typesetter::default();
    let mut scene = Scene2D::new();
    let descriptor = Descriptor::new().a("28 cm").alpha("20°32'").unknown("opp");
    let triangle =
        RightTriangle::build(&descriptor, &mut scene, &tex, &Config::default().triangle).unwrap();
    let steps = triangle.get_steps();
    assert_eq!(steps.last().map(String::as_str), Some("x = 10.49 cm"));
    assert!(triangle.unknown_label().is_some());
}

#[test]
fn quadratic_formula_scene_ends_with_both_roots() {
    let tex = Typesetter::default();
    let mut rec = Recorder::default();
    let cfg = Config::default();

    let q = parse_quadratic("ax^2+bx+c = x^2-6x+8").unwrap();
    let d = quadratic_steps(&q, 2).unwrap();
    let texts = d.texts();
    assert_eq!(&texts[texts.len() - 2..], ["x = 4", "x = 2"]);

    let mut solution = Solution::new(cfg.layout);
    for step in d.to_steps(cfg.layout) {
        solution.push(step);
    }
    let built = solution.build(&mut rec.scene, &tex).unwrap();
    let mut scroll = ScrollManager::from_solution(&mut rec.scene, &built, cfg.scroll);
    let last = scroll.len() - 1;
    scroll.scroll_to(&mut rec, last).unwrap();
    assert_eq!(scroll.get_visible_range(), last..last + 1);
    assert!(rec.scene.is_visible(built.steps[last].id));
}

#[test]
fn scroll_cycle_retires_and_fades_callouts() {
    let tex = Typesetter::default();
    let mut rec = Recorder::default();
    let mut scroll = column(&mut rec, 5);

    scroll.prepare_next(&mut rec, 5, false, RevealStrategy::OneByOne, None).unwrap();
    let swap = rec.scene.insert(shapes::rectangle(2.0, 0.4));
    let callout = scroll
        .replace_with_callout(&mut rec, &tex, 3, swap, "note", CalloutPosition::Right, None)
        .unwrap();
    assert!(rec.scene.is_visible(callout));

    let tick = scroll.scroll_tick();
    assert_eq!(scroll.scroll_down(&mut rec, 2, None).unwrap(), 2);
    assert_eq!(scroll.first_visible(), 2);
    assert_eq!(scroll.next_to_reveal(), 5);
    assert_eq!(scroll.scroll_tick(), tick + 2);
    assert!(!rec.scene.is_visible(callout));
    assert_eq!(scroll.pending_callouts(), 0);
}

#[test]
fn replace_then_restore_is_congruent() {
    let mut rec = Recorder::default();
    let mut scroll = column(&mut rec, 1);
    scroll.reveal(&mut rec).unwrap();
    let a = scroll.blocks()[0];
    let before = rec.scene.bounds(a);

    let b = rec.scene.insert(shapes::circle([5.0, 5.0], 0.3));
    scroll
        .replace_in_place(&mut rec, 0, b, ReplaceOptions::default())
        .unwrap();
    assert!(close2(rec.scene.center(b), before.center()));

    scroll.restore_original(&mut rec, 0, None).unwrap();
    assert_eq!(scroll.get_element(0), Some(a));
    let after = rec.scene.bounds(a);
    assert!(close2(after.min, before.min) && close2(after.max, before.max));
    assert!(rec.scene.is_visible(a) && !rec.scene.is_visible(b));

    rec.play(vec![Animation::fade_out(a)], None).unwrap();
    assert!(!rec.scene.is_visible(a));
}
