//! In-place replacement, highlighting and callouts on visible blocks.

use log::debug;

use crate::anim::Animation;
use crate::scene::{DOWN, LEFT, ObjectId, RIGHT, Rgba, Scene2D, UP, shapes};
use crate::stage::{EngineError, Stage};
use crate::tex::MathRenderer;

use super::{RevealStrategy, ScrollError, ScrollManager};

/// How a replacement is animated.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ReplaceAnimation {
    /// Morph the old block into the new one.
    #[default]
    Transform,
    /// Fade the old block out while the new one fades in.
    FadeThrough,
    /// Swap without consuming scene time.
    Instant,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReplaceOptions {
    pub animation: ReplaceAnimation,
    /// Center the new block on the old one.
    pub preserve_position: bool,
    /// Give the new block the old one's z-order.
    pub preserve_z: bool,
    pub run_time: Option<f32>,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            animation: ReplaceAnimation::Transform,
            preserve_position: true,
            preserve_z: true,
            run_time: None,
        }
    }
}

/// Colors and timings of [`ScrollManager::highlight_and_replace`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HighlightReplace {
    /// Defaults to the configured highlight color.
    pub highlight: Option<Rgba>,
    /// Defaults to the new block's own color.
    pub final_color: Option<Rgba>,
    pub recolor_time: f32,
    pub transform_time: f32,
    pub settle_time: f32,
}

impl Default for HighlightReplace {
    fn default() -> Self {
        Self {
            highlight: None,
            final_color: None,
            recolor_time: 0.5,
            transform_time: 1.0,
            settle_time: 0.5,
        }
    }
}

/// Side of the replaced block a callout note is placed on.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CalloutPosition {
    #[default]
    Right,
    Left,
    Above,
    Below,
}

impl CalloutPosition {
    pub fn direction(self) -> [f32; 2] {
        match self {
            CalloutPosition::Right => RIGHT,
            CalloutPosition::Left => LEFT,
            CalloutPosition::Above => UP,
            CalloutPosition::Below => DOWN,
        }
    }
}

fn z_of(scene: &Scene2D, id: ObjectId) -> Option<i32> {
    scene.node(id).map(|n| n.z)
}

/// Detach `new` and line it up with `old`.
fn stage_replacement(scene: &mut Scene2D, old: ObjectId, new: ObjectId, position: bool, z: bool) {
    scene.detach(new);
    if position {
        let c = scene.center(old);
        scene.move_to(new, c);
    }
    if z {
        if let Some(z) = z_of(scene, old) {
            scene.set_z(new, z);
        }
    }
}

fn ensure_exists(scene: &Scene2D, id: ObjectId) -> Result<(), ScrollError> {
    if scene.contains(id) {
        Ok(())
    } else {
        Err(EngineError::UnknownObject(id).into())
    }
}

impl ScrollManager {
    fn check_distinct(&self, new: ObjectId) -> Result<(), ScrollError> {
        if self.blocks.contains(&new) {
            return Err(ScrollError::PreconditionViolation(format!(
                "{new:?} is already a block of this column"
            )));
        }
        Ok(())
    }

    /// Swap the visible block `index` for `new`, keeping the old one for
    /// [`ScrollManager::restore_original`]. Returns the replaced block.
    pub fn replace_in_place(
        &mut self,
        stage: &mut dyn Stage,
        index: usize,
        new: ObjectId,
        options: ReplaceOptions,
    ) -> Result<ObjectId, ScrollError> {
        let old = self.check_visible(index)?;
        self.check_distinct(new)?;
        ensure_exists(stage.scene(), new)?;
        stage_replacement(
            stage.scene_mut(),
            old,
            new,
            options.preserve_position,
            options.preserve_z,
        );

        let swap = Animation::ReplacementTransform { from: old, to: new };
        match options.animation {
            ReplaceAnimation::Transform => self.run(stage, vec![swap], options.run_time)?,
            ReplaceAnimation::FadeThrough => self.run(
                stage,
                vec![Animation::fade_out(old), Animation::fade_in(new)],
                options.run_time,
            )?,
            ReplaceAnimation::Instant => stage.jump(vec![swap])?,
        }

        self.blocks[index] = new;
        self.push_original(index, old);
        debug!("replaced block {index}: {old:?} -> {new:?}");
        Ok(old)
    }

    /// Undo the most recent replacement at `index`.
    pub fn restore_original(
        &mut self,
        stage: &mut dyn Stage,
        index: usize,
        run_time: Option<f32>,
    ) -> Result<(), ScrollError> {
        let current = self.check_visible(index)?;
        let Some(original) = self.originals.get(&index).and_then(|s| s.last()).copied() else {
            return Err(ScrollError::NothingToRestore(index));
        };
        self.run(
            stage,
            vec![Animation::ReplacementTransform {
                from: current,
                to: original,
            }],
            run_time,
        )?;

        if let Some(stack) = self.originals.get_mut(&index) {
            stack.pop();
            if stack.is_empty() {
                self.originals.remove(&index);
            }
        }
        self.blocks[index] = original;
        debug!("restored block {index}: {current:?} -> {original:?}");
        Ok(())
    }

    /// Recolor the old block, morph it into `new` shown in the same color, then settle `new`
    /// on its final color.
    pub fn highlight_and_replace(
        &mut self,
        stage: &mut dyn Stage,
        index: usize,
        new: ObjectId,
        spec: HighlightReplace,
    ) -> Result<(), ScrollError> {
        let old = self.check_visible(index)?;
        self.check_distinct(new)?;
        ensure_exists(stage.scene(), new)?;

        let highlight = spec.highlight.unwrap_or(self.config.highlight_color);
        let old_color = stage.scene().color(old);
        let final_color = spec
            .final_color
            .or_else(|| stage.scene().color(new))
            .unwrap_or(Rgba::WHITE);

        self.run(
            stage,
            vec![Animation::SetColor {
                target: old,
                color: highlight,
            }],
            Some(spec.recolor_time),
        )?;

        let scene = stage.scene_mut();
        stage_replacement(scene, old, new, true, true);
        scene.set_color(new, highlight);
        self.run(
            stage,
            vec![Animation::ReplacementTransform { from: old, to: new }],
            Some(spec.transform_time),
        )?;
        self.blocks[index] = new;
        if let Some(c) = old_color {
            stage.scene_mut().set_color(old, c);
        }
        self.push_original(index, old);

        self.run(
            stage,
            vec![Animation::SetColor {
                target: new,
                color: final_color,
            }],
            Some(spec.settle_time),
        )?;
        debug!("highlight-replaced block {index}");
        Ok(())
    }

    /// Replace the visible run starting at `start` with `new_blocks`, each arriving from
    /// `direction` and settling in place, `delay` seconds apart.
    pub fn cascade_update(
        &mut self,
        stage: &mut dyn Stage,
        start: usize,
        new_blocks: &[ObjectId],
        delay: Option<f32>,
        direction: [f32; 2],
    ) -> Result<(), ScrollError> {
        if new_blocks.is_empty() {
            return Ok(());
        }
        let mut olds = Vec::with_capacity(new_blocks.len());
        for (k, &new) in new_blocks.iter().enumerate() {
            olds.push(self.check_visible(start + k)?);
            self.check_distinct(new)?;
            ensure_exists(stage.scene(), new)?;
        }

        let shift = self.config.cascade_shift;
        let offset = [direction[0] * shift, direction[1] * shift];
        let scene = stage.scene_mut();
        let mut anims = Vec::with_capacity(new_blocks.len());
        for (&old, &new) in olds.iter().zip(new_blocks) {
            stage_replacement(scene, old, new, true, true);
            scene.shift(new, offset);
            anims.push(Animation::group(vec![
                Animation::ReplacementTransform { from: old, to: new },
                Animation::Shift {
                    target: new,
                    by: [-offset[0], -offset[1]],
                },
            ]));
        }

        let delay = delay.unwrap_or(self.config.cascade_delay).max(0.0);
        let per_block = self.config.base_time * 0.5;
        let n = anims.len() as f32;
        let total = per_block + delay * (n - 1.0);
        self.run(stage, vec![Animation::lagged(anims, delay / per_block)], Some(total))?;

        for (k, (&old, &new)) in olds.iter().zip(new_blocks).enumerate() {
            self.blocks[start + k] = new;
            self.push_original(start + k, old);
        }
        debug!("cascade-updated blocks {}..{}", start, start + new_blocks.len());
        Ok(())
    }

    /// Replace the visible block `index` and point a framed note at the new block. The note
    /// fades out on the next scroll. Returns the callout.
    #[allow(clippy::too_many_arguments)]
    pub fn replace_with_callout(
        &mut self,
        stage: &mut dyn Stage,
        renderer: &dyn MathRenderer,
        index: usize,
        new: ObjectId,
        text: &str,
        position: CalloutPosition,
        color: Option<Rgba>,
    ) -> Result<ObjectId, ScrollError> {
        let color = color.unwrap_or(self.config.callout_color);
        let mut note = renderer.render_text(text)?;
        note.scale(0.5);
        note.set_color(color);
        note.name = "CalloutText".to_string();

        self.replace_in_place(stage, index, new, ReplaceOptions::default())?;

        let dir = position.direction();
        let buff = self.config.callout_buff;
        let scene = stage.scene_mut();
        let text_id = scene.insert(note);
        let frame = shapes::surrounding_rect(scene.bounds(text_id), 0.12).with_color(color);
        let frame_id = scene.insert(frame);
        let callout = scene.group("Callout", &[frame_id, text_id]);
        scene.next_to(callout, new, dir, buff);

        let from = scene.bounds(callout).critical_point([-dir[0], -dir[1]]);
        let to = scene.bounds(new).critical_point(dir);
        let gap = 0.1f32.min(buff * 0.25);
        let start = [from[0] - dir[0] * gap, from[1] - dir[1] * gap];
        let end = [to[0] + dir[0] * gap, to[1] + dir[1] * gap];
        scene.insert_child(callout, shapes::arrow(start, end).with_color(color));

        self.run(stage, vec![Animation::fade_in(callout)], None)?;
        let tick = self.scroll_tick + 1;
        self.register_callout(tick, callout);
        debug!("callout {callout:?} on block {index}, fades at tick {tick}");
        Ok(callout)
    }

    /// Reveal the next `steps` blocks as if they came out of `target`.
    pub fn fade_in_from_target(
        &mut self,
        stage: &mut dyn Stage,
        target: ObjectId,
        steps: usize,
        scale: Option<f32>,
        direction: Option<[f32; 2]>,
    ) -> Result<usize, ScrollError> {
        ensure_exists(stage.scene(), target)?;
        let n = steps.min(self.blocks.len() - self.next_to_reveal);
        if n == 0 {
            return Ok(0);
        }
        let point = stage.scene().center(target);
        let shift = direction
            .map(|d| [d[0] * self.config.reveal_shift, d[1] * self.config.reveal_shift])
            .unwrap_or([0.0, 0.0]);
        let range = self.next_to_reveal..self.next_to_reveal + n;
        let anims: Vec<Animation> = range
            .clone()
            .map(|i| {
                Animation::fade_in(self.blocks[i])
                    .from_point(point)
                    .with_scale(scale.unwrap_or(0.5))
                    .with_shift(shift)
            })
            .collect();
        let rt = self.custom_time(range.clone()).unwrap_or_else(|| self.reveal_time(n));
        self.run(stage, anims, Some(rt))?;

        self.next_to_reveal = range.end;
        self.last_reveal_count = n;
        self.last_strategy = RevealStrategy::Together;
        debug!("revealed {range:?} from {target:?}");
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll::tests::column;
    use crate::stage::Recorder;
    use crate::tex::Typesetter;

    fn approx(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-4 && (a[1] - b[1]).abs() < 1e-4
    }

    fn square(rec: &mut Recorder, size: f32) -> ObjectId {
        rec.scene.insert(shapes::rectangle(size, size))
    }

    #[test]
    fn test_replace_then_restore() {
        let (mut rec, mut m) = column(2);
        m.reveal(&mut rec).unwrap();
        let a = m.blocks()[0];
        let (center, size) = (rec.scene.center(a), rec.scene.bounds(a).size());

        let b = square(&mut rec, 0.8);
        assert_eq!(m.replace_in_place(&mut rec, 0, b, ReplaceOptions::default()).unwrap(), a);
        assert!(approx(rec.scene.center(b), center));
        assert_eq!(m.get_element(0), Some(b));
        assert!(rec.scene.is_visible(b) && !rec.scene.is_visible(a));

        m.restore_original(&mut rec, 0, None).unwrap();
        assert_eq!(m.get_element(0), Some(a));
        assert!(rec.scene.is_visible(a));
        assert!(approx(rec.scene.center(a), center));
        assert!(approx(rec.scene.bounds(a).size(), size));
        assert!(matches!(
            m.restore_original(&mut rec, 0, None),
            Err(ScrollError::NothingToRestore(0))
        ));
    }

    #[test]
    fn test_repeated_replaces_restore_in_reverse() {
        let (mut rec, mut m) = column(1);
        m.reveal(&mut rec).unwrap();
        let a = m.blocks()[0];
        let (b, c) = (square(&mut rec, 0.5), square(&mut rec, 0.6));
        m.replace_in_place(&mut rec, 0, b, ReplaceOptions::default()).unwrap();
        let opts = ReplaceOptions {
            animation: ReplaceAnimation::Instant,
            ..ReplaceOptions::default()
        };
        let t = rec.time();
        m.replace_in_place(&mut rec, 0, c, opts).unwrap();
        assert_eq!(rec.time(), t);
        m.restore_original(&mut rec, 0, None).unwrap();
        assert_eq!(m.get_element(0), Some(b));
        m.restore_original(&mut rec, 0, None).unwrap();
        assert_eq!(m.get_element(0), Some(a));
    }

    #[test]
    fn test_replace_outside_window_changes_nothing() {
        let (mut rec, mut m) = column(3);
        m.reveal(&mut rec).unwrap();
        let b = square(&mut rec, 0.5);
        let err = m.replace_in_place(&mut rec, 1, b, ReplaceOptions::default()).unwrap_err();
        assert!(matches!(err, ScrollError::IndexOutOfVisibleRange { index: 1, first: 0, next: 1 }));
        assert!(!rec.scene.is_on_stage(b));
        assert!(matches!(
            m.restore_original(&mut rec, 0, None),
            Err(ScrollError::NothingToRestore(0))
        ));
    }

    #[test]
    fn test_restored_original_follows_scroll() {
        let (mut rec, mut m) = column(3);
        m.prepare_next(&mut rec, 2, false, RevealStrategy::Together, None).unwrap();
        let a = m.blocks()[1];
        let b = square(&mut rec, 0.3);
        m.replace_in_place(&mut rec, 1, b, ReplaceOptions::default()).unwrap();
        m.scroll_down(&mut rec, 1, None).unwrap();
        m.restore_original(&mut rec, 1, None).unwrap();
        assert!(approx(rec.scene.center(a), rec.scene.center(b)));
    }

    #[test]
    fn test_highlight_and_replace_sequence() {
        let (mut rec, mut m) = column(1);
        m.reveal(&mut rec).unwrap();
        let a = m.blocks()[0];
        let a_color = rec.scene.color(a).unwrap();
        let b = square(&mut rec, 0.5);
        rec.scene.set_color(b, Rgba::GREEN);
        let plays = rec.play_count();

        m.highlight_and_replace(&mut rec, 0, b, HighlightReplace::default()).unwrap();
        assert_eq!(rec.play_count(), plays + 3);
        assert_eq!(rec.clips_labeled("SetColor").count(), 2);
        assert_eq!(rec.scene.color(b), Some(Rgba::GREEN));
        assert_eq!(rec.scene.color(a), Some(a_color));
        assert_eq!(m.get_element(0), Some(b));
    }

    #[test]
    fn test_cascade_update() {
        let (mut rec, mut m) = column(3);
        m.prepare_next(&mut rec, 3, false, RevealStrategy::Together, None).unwrap();
        let centers: Vec<[f32; 2]> = m.blocks()[1..].iter().map(|&b| rec.scene.center(b)).collect();
        let news = [square(&mut rec, 0.4), square(&mut rec, 0.4)];
        let plays = rec.play_count();
        m.cascade_update(&mut rec, 1, &news, Some(0.2), DOWN).unwrap();
        assert_eq!(rec.play_count(), plays + 1);
        for (k, &n) in news.iter().enumerate() {
            assert!(approx(rec.scene.center(n), centers[k]));
            assert_eq!(m.get_element(1 + k), Some(n));
        }

        let more = [square(&mut rec, 0.4), square(&mut rec, 0.4)];
        assert!(m.cascade_update(&mut rec, 2, &more, None, DOWN).is_err());
        assert_eq!(m.get_element(2), Some(news[1]));
    }

    #[test]
    fn test_callout_fades_on_next_scroll() {
        let (mut rec, mut m) = column(3);
        m.prepare_next(&mut rec, 2, false, RevealStrategy::Together, None).unwrap();
        let b = square(&mut rec, 0.4);
        let callout = m
            .replace_with_callout(&mut rec, &Typesetter::default(), 1, b, "simplify", CalloutPosition::Right, None)
            .unwrap();
        assert!(rec.scene.is_visible(callout));
        assert!(rec.scene.bounds(callout).left() > rec.scene.bounds(b).right());
        assert_eq!(m.pending_callouts(), 1);

        m.scroll_down(&mut rec, 1, None).unwrap();
        assert!(!rec.scene.is_visible(callout));
        assert_eq!(m.pending_callouts(), 0);
    }

    #[test]
    fn test_fade_in_from_target() {
        let (mut rec, mut m) = column(3);
        let label = square(&mut rec, 0.2);
        rec.scene.add(label);
        assert_eq!(m.fade_in_from_target(&mut rec, label, 2, None, None).unwrap(), 2);
        assert_eq!(m.get_visible_range(), 0..2);
        assert_eq!(rec.clips_labeled("FadeIn").count(), 2);
        assert!(m.fade_in_from_target(&mut rec, ObjectId(999), 1, None, None).is_err());
        assert_eq!(m.next_to_reveal(), 2);
    }
}
