//! A scrolling viewport over an ordered column of blocks.
//!
//! Blocks are laid out once, top to bottom from `start_position`. Revealing appends blocks
//! to the visible window without moving anything already shown; scrolling slides the whole
//! column up by the height of the retired blocks and fades them out. The window is
//! `first_visible..next_to_reveal`.
//!
//! Every operation builds its animations first and commits state only after the stage has
//! played (or, in batch mode, jumped) them, so a failed play leaves the manager untouched.

mod batch;
mod replace;

use std::collections::BTreeMap;
use std::ops::Range;

use log::debug;

use crate::anim::Animation;
use crate::config::ScrollConfig;
use crate::layout::{BuiltSolution, arrange_column};
use crate::scene::{ObjectId, Rgba, Scene2D};
use crate::stage::{EngineError, Stage};
use crate::tex::TexError;

pub use batch::ScrollOp;
pub use replace::{CalloutPosition, HighlightReplace, ReplaceAnimation, ReplaceOptions};

#[derive(thiserror::Error, Debug)]
pub enum ScrollError {
    #[error("index {index} is outside the visible range {first}..{next}")]
    IndexOutOfVisibleRange {
        index: usize,
        first: usize,
        next: usize,
    },

    #[error("nothing to restore at index {0}")]
    NothingToRestore(usize),

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Tex(#[from] TexError),
}

/// How `prepare_next` brings several blocks in.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum RevealStrategy {
    /// One play per block.
    #[default]
    OneByOne,
    /// All blocks in a single play.
    Together,
    /// A single play with the blocks lagged by `lag_ratio`.
    Staggered,
}

#[derive(Debug, Clone)]
pub struct ScrollManager {
    blocks: Vec<ObjectId>,
    first_visible: usize,
    next_to_reveal: usize,
    last_reveal_count: usize,
    last_strategy: RevealStrategy,
    scroll_tick: u64,
    /// Replaced blocks per index, most recent last.
    originals: BTreeMap<usize, Vec<ObjectId>>,
    /// Callouts to fade once `scroll_tick` reaches the key.
    callouts: BTreeMap<u64, Vec<ObjectId>>,
    custom_durations: BTreeMap<usize, f32>,
    animations_enabled: bool,
    /// Upward travel of the column since it was laid out.
    scrolled: f32,
    config: ScrollConfig,
}

impl ScrollManager {
    /// Stack `blocks` into a column at the configured start position.
    pub fn new(scene: &mut Scene2D, blocks: Vec<ObjectId>, config: ScrollConfig) -> Self {
        arrange_column(scene, &blocks, config.start_position, config.buff);
        Self::with_blocks(blocks, config)
    }

    /// Take over the steps of a built solution, keeping their spacing.
    ///
    /// The solution is moved so its top-left corner sits at the start position and each step
    /// is detached into a block of its own.
    pub fn from_solution(scene: &mut Scene2D, solution: &BuiltSolution, config: ScrollConfig) -> Self {
        let b = solution.bounds(scene);
        if !b.is_empty() {
            let [x, y] = config.start_position;
            scene.shift(solution.id, [x - b.left(), y - b.top()]);
        }
        let blocks = solution.step_ids();
        for &id in &blocks {
            scene.detach(id);
        }
        Self::with_blocks(blocks, config)
    }

    fn with_blocks(blocks: Vec<ObjectId>, config: ScrollConfig) -> Self {
        Self {
            blocks,
            first_visible: 0,
            next_to_reveal: 0,
            last_reveal_count: 0,
            last_strategy: RevealStrategy::default(),
            scroll_tick: 0,
            originals: BTreeMap::new(),
            callouts: BTreeMap::new(),
            custom_durations: BTreeMap::new(),
            animations_enabled: true,
            scrolled: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[ObjectId] {
        &self.blocks
    }

    pub fn first_visible(&self) -> usize {
        self.first_visible
    }

    pub fn next_to_reveal(&self) -> usize {
        self.next_to_reveal
    }

    pub fn last_reveal_count(&self) -> usize {
        self.last_reveal_count
    }

    pub fn scroll_tick(&self) -> u64 {
        self.scroll_tick
    }

    pub fn animations_enabled(&self) -> bool {
        self.animations_enabled
    }

    pub fn set_animations_enabled(&mut self, enabled: bool) {
        self.animations_enabled = enabled;
    }

    pub fn get_visible_range(&self) -> Range<usize> {
        self.first_visible..self.next_to_reveal
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.get_visible_range().contains(&index)
    }

    pub fn get_element(&self, index: usize) -> Option<ObjectId> {
        self.blocks.get(index).copied()
    }

    /// Callouts still waiting for their scroll tick.
    pub fn pending_callouts(&self) -> usize {
        self.callouts.values().map(Vec::len).sum()
    }

    /// Reveal time for block `index`, used when no run time is given.
    pub fn set_custom_duration(&mut self, index: usize, seconds: f32) {
        self.custom_durations.insert(index, seconds);
    }

    pub(crate) fn check_visible(&self, index: usize) -> Result<ObjectId, ScrollError> {
        if !self.is_visible(index) {
            return Err(ScrollError::IndexOutOfVisibleRange {
                index,
                first: self.first_visible,
                next: self.next_to_reveal,
            });
        }
        Ok(self.blocks[index])
    }

    /// Play, or apply end states instantly when animations are off.
    pub(crate) fn run(
        &self,
        stage: &mut dyn Stage,
        animations: Vec<Animation>,
        run_time: Option<f32>,
    ) -> Result<(), EngineError> {
        if self.animations_enabled {
            stage.play(animations, run_time)
        } else {
            stage.jump(animations)
        }
    }

    /// `base_time · min(1.5, 1 + 0.1·steps)` with auto timing, else `base_time`.
    pub fn reveal_time(&self, steps: usize) -> f32 {
        let base = self.config.base_time;
        if self.config.auto_adjust_timing {
            base * (1.0 + 0.1 * steps as f32).min(1.5)
        } else {
            base
        }
    }

    /// `0.5 + 0.2·min(steps, 5)` with auto timing, else `base_time`.
    pub fn scroll_time(&self, steps: usize) -> f32 {
        if self.config.auto_adjust_timing {
            0.5 + 0.2 * steps.min(5) as f32
        } else {
            self.config.base_time
        }
    }

    fn custom_time(&self, range: Range<usize>) -> Option<f32> {
        range
            .filter_map(|i| self.custom_durations.get(&i).copied())
            .reduce(f32::max)
    }

    fn reveal_animation(&self, id: ObjectId) -> Animation {
        Animation::fade_in(id).with_shift([0.0, self.config.reveal_shift])
    }

    fn reveal_range(
        &self,
        stage: &mut dyn Stage,
        range: Range<usize>,
        strategy: RevealStrategy,
        run_time: Option<f32>,
    ) -> Result<(), EngineError> {
        let n = range.len();
        match strategy {
            RevealStrategy::OneByOne => {
                for i in range {
                    let rt = run_time
                        .or_else(|| self.custom_time(i..i + 1))
                        .unwrap_or_else(|| self.reveal_time(1));
                    self.run(stage, vec![self.reveal_animation(self.blocks[i])], Some(rt))?;
                }
                Ok(())
            }
            RevealStrategy::Together | RevealStrategy::Staggered => {
                let rt = run_time
                    .or_else(|| self.custom_time(range.clone()))
                    .unwrap_or_else(|| self.reveal_time(n));
                let anims: Vec<Animation> = range.map(|i| self.reveal_animation(self.blocks[i])).collect();
                let anims = if strategy == RevealStrategy::Staggered {
                    vec![Animation::lagged(anims, self.config.lag_ratio)]
                } else {
                    anims
                };
                self.run(stage, anims, Some(rt))
            }
        }
    }

    /// Reveal the next `steps` blocks, clamped to what is left. Returns how many were shown.
    ///
    /// With `same_item` the previous reveal is replayed instead and no state advances.
    pub fn prepare_next(
        &mut self,
        stage: &mut dyn Stage,
        steps: usize,
        same_item: bool,
        strategy: RevealStrategy,
        run_time: Option<f32>,
    ) -> Result<usize, ScrollError> {
        if same_item {
            let start = self
                .next_to_reveal
                .saturating_sub(self.last_reveal_count)
                .max(self.first_visible);
            if start == self.next_to_reveal {
                return Err(ScrollError::PreconditionViolation(
                    "no visible reveal to repeat".to_string(),
                ));
            }
            let hide: Vec<Animation> = (start..self.next_to_reveal)
                .map(|i| Animation::fade_out(self.blocks[i]))
                .collect();
            stage.jump(hide)?;
            self.reveal_range(stage, start..self.next_to_reveal, strategy, run_time)?;
            debug!("replayed reveal of {}..{}", start, self.next_to_reveal);
            return Ok(self.next_to_reveal - start);
        }

        let n = steps.min(self.blocks.len() - self.next_to_reveal);
        if n == 0 {
            return Ok(0);
        }
        let range = self.next_to_reveal..self.next_to_reveal + n;
        self.last_strategy = strategy;
        if strategy == RevealStrategy::OneByOne {
            // Commit block by block so a failed play keeps the window honest.
            for i in range.clone() {
                self.reveal_range(stage, i..i + 1, strategy, run_time)?;
                self.next_to_reveal = i + 1;
                self.last_reveal_count = i + 1 - range.start;
            }
        } else {
            self.reveal_range(stage, range.clone(), strategy, run_time)?;
            self.next_to_reveal = range.end;
            self.last_reveal_count = n;
        }
        debug!(
            "revealed {:?} ({:?}); window {:?}",
            range,
            strategy,
            self.get_visible_range()
        );
        Ok(n)
    }

    /// Reveal the next block one by one with adaptive timing.
    pub fn reveal(&mut self, stage: &mut dyn Stage) -> Result<usize, ScrollError> {
        self.prepare_next(stage, 1, false, RevealStrategy::OneByOne, None)
    }

    /// Strategy of the most recent reveal.
    pub fn last_strategy(&self) -> RevealStrategy {
        self.last_strategy
    }

    /// Vertical travel that retires `first_visible..first_visible + k`.
    fn scroll_distance(&self, scene: &Scene2D, k: usize) -> f32 {
        let top = scene.bounds(self.blocks[self.first_visible]).top();
        match self.blocks.get(self.first_visible + k) {
            Some(&next) => top - scene.bounds(next).top(),
            None => {
                let last = self.blocks[self.first_visible + k - 1];
                top - scene.bounds(last).bottom() + self.config.buff
            }
        }
    }

    /// Shift blocks that are not on screen, plus stored originals, without animation.
    fn shift_offscreen(&self, scene: &mut Scene2D, skip: Range<usize>, by: [f32; 2]) {
        for (i, &id) in self.blocks.iter().enumerate() {
            if !skip.contains(&i) {
                scene.shift(id, by);
            }
        }
        for &id in self.originals.values().flatten() {
            scene.shift(id, by);
        }
    }

    /// Retire the top `steps` visible blocks, sliding the rest up. Returns how many retired.
    pub fn scroll_down(
        &mut self,
        stage: &mut dyn Stage,
        steps: usize,
        run_time: Option<f32>,
    ) -> Result<usize, ScrollError> {
        let k = steps.min(self.next_to_reveal - self.first_visible);
        if k == 0 {
            return Ok(0);
        }
        let d = self.scroll_distance(stage.scene(), k);
        let by = [0.0, d];
        let new_tick = self.scroll_tick + k as u64;

        let retired = self.first_visible..self.first_visible + k;
        let staying = retired.end..self.next_to_reveal;
        let mut anims: Vec<Animation> = retired
            .clone()
            .map(|i| Animation::fade_out(self.blocks[i]).with_shift(by))
            .collect();
        anims.extend(staying.clone().map(|i| Animation::Shift {
            target: self.blocks[i],
            by,
        }));

        let due: Vec<u64> = self.callouts.range(..=new_tick).map(|(t, _)| *t).collect();
        let faded: Vec<ObjectId> = due
            .iter()
            .filter_map(|t| self.callouts.get(t))
            .flatten()
            .copied()
            .collect();
        anims.extend(faded.iter().map(|&c| Animation::fade_out(c)));

        let rt = run_time.unwrap_or_else(|| self.scroll_time(k));
        self.run(stage, anims, Some(rt))?;

        self.shift_offscreen(stage.scene_mut(), staying, by);
        for t in due {
            self.callouts.remove(&t);
        }
        self.first_visible += k;
        self.scroll_tick = new_tick;
        self.scrolled += d;
        debug!(
            "scrolled {} block(s) by {:.3}; window {:?}, tick {}, {} callout(s) faded",
            k,
            d,
            self.get_visible_range(),
            self.scroll_tick,
            faded.len()
        );
        Ok(k)
    }

    /// Reveal up to `index` if needed, then scroll so it is the first visible block.
    pub fn scroll_to(&mut self, stage: &mut dyn Stage, index: usize) -> Result<(), ScrollError> {
        if index >= self.blocks.len() {
            return Err(ScrollError::PreconditionViolation(format!(
                "index {index} is past the last block ({})",
                self.blocks.len()
            )));
        }
        if index < self.first_visible {
            return Err(ScrollError::PreconditionViolation(format!(
                "cannot scroll back to {index}; first visible is {}",
                self.first_visible
            )));
        }
        if index >= self.next_to_reveal {
            let missing = index + 1 - self.next_to_reveal;
            self.prepare_next(stage, missing, false, RevealStrategy::Together, None)?;
        }
        self.scroll_down(stage, index - self.first_visible, None)?;
        Ok(())
    }

    /// Flash at the center of the visible block `index`.
    pub fn flash(&self, stage: &mut dyn Stage, index: usize, color: Option<Rgba>) -> Result<(), ScrollError> {
        let id = self.check_visible(index)?;
        let point = stage.scene().center(id);
        let color = color.unwrap_or(self.config.highlight_color);
        self.run(stage, vec![Animation::Flash { point, color }], None)?;
        Ok(())
    }

    /// Pulse the visible block `index` in the highlight color and scale.
    pub fn highlight_element(
        &self,
        stage: &mut dyn Stage,
        index: usize,
        color: Option<Rgba>,
    ) -> Result<(), ScrollError> {
        let target = self.check_visible(index)?;
        let anim = Animation::Indicate {
            target,
            color: color.unwrap_or(self.config.highlight_color),
            scale: self.config.highlight_scale,
        };
        self.run(stage, vec![anim], None)?;
        Ok(())
    }

    fn visible_and_callouts(&self) -> Vec<ObjectId> {
        self.get_visible_range()
            .map(|i| self.blocks[i])
            .chain(self.callouts.values().flatten().copied())
            .collect()
    }

    /// Fade out every visible block and callout; the window becomes empty.
    pub fn fadeout_all(&mut self, stage: &mut dyn Stage) -> Result<(), ScrollError> {
        let anims: Vec<Animation> = self
            .visible_and_callouts()
            .into_iter()
            .map(Animation::fade_out)
            .collect();
        self.run(stage, anims, None)?;
        self.callouts.clear();
        self.first_visible = self.next_to_reveal;
        debug!("faded out everything; window {:?}", self.get_visible_range());
        Ok(())
    }

    /// Fade out what is shown, move the column home and rewind to the first block.
    ///
    /// `scroll_tick` keeps counting.
    pub fn reset_view(&mut self, stage: &mut dyn Stage) -> Result<(), ScrollError> {
        let anims: Vec<Animation> = self
            .visible_and_callouts()
            .into_iter()
            .map(Animation::fade_out)
            .collect();
        self.run(stage, anims, None)?;
        self.shift_offscreen(stage.scene_mut(), 0..0, [0.0, -self.scrolled]);
        self.callouts.clear();
        self.scrolled = 0.0;
        self.first_visible = 0;
        self.next_to_reveal = 0;
        self.last_reveal_count = 0;
        debug!("view reset; tick stays {}", self.scroll_tick);
        Ok(())
    }

    /// Append blocks under the current last block, left-aligned with the column.
    pub fn append_elements(&mut self, scene: &mut Scene2D, ids: &[ObjectId]) {
        let x = self.config.start_position[0];
        let top = match self.blocks.last() {
            Some(&last) => scene.bounds(last).bottom() - self.config.buff,
            None => self.config.start_position[1] + self.scrolled,
        };
        arrange_column(scene, ids, [x, top], self.config.buff);
        self.blocks.extend_from_slice(ids);
    }

    pub(crate) fn push_original(&mut self, index: usize, original: ObjectId) {
        self.originals.entry(index).or_default().push(original);
    }

    pub(crate) fn register_callout(&mut self, tick: u64, id: ObjectId) {
        self.callouts.entry(tick).or_default().push(id);
    }

    /// Upward travel of the column since it was laid out or last reset.
    pub fn scrolled(&self) -> f32 {
        self.scrolled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::shapes;
    use crate::stage::Recorder;

    pub(crate) fn column(n: usize) -> (Recorder, ScrollManager) {
        let mut rec = Recorder::default();
        let ids: Vec<ObjectId> = (0..n)
            .map(|i| rec.scene.insert(shapes::rectangle(2.0 + i as f32 * 0.1, 0.5)))
            .collect();
        let m = ScrollManager::new(&mut rec.scene, ids, ScrollConfig::default());
        (rec, m)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_column_starts_at_start_position() {
        let (rec, m) = column(3);
        let b0 = rec.scene.bounds(m.blocks()[0]);
        assert!(approx(b0.left(), -6.5) && approx(b0.top(), 3.5));
        let b1 = rec.scene.bounds(m.blocks()[1]);
        assert!(approx(b0.bottom() - b1.top(), 0.4));
    }

    #[test]
    fn test_reveal_clamps_and_keeps_positions() {
        let (mut rec, mut m) = column(3);
        assert_eq!(m.prepare_next(&mut rec, 1, false, RevealStrategy::OneByOne, None).unwrap(), 1);
        let c0 = rec.scene.center(m.blocks()[0]);
        assert_eq!(m.prepare_next(&mut rec, 10, false, RevealStrategy::Staggered, None).unwrap(), 2);
        assert_eq!(rec.scene.center(m.blocks()[0]), c0);
        assert_eq!(m.get_visible_range(), 0..3);
        assert_eq!(m.last_reveal_count(), 2);
        assert_eq!(m.prepare_next(&mut rec, 1, false, RevealStrategy::OneByOne, None).unwrap(), 0);
        assert!(m.blocks().iter().all(|&b| rec.scene.is_visible(b)));
    }

    #[test]
    fn test_adaptive_timing() {
        let (mut rec, mut m) = column(6);
        assert!(approx(m.reveal_time(3), 1.3));
        assert!(approx(m.reveal_time(9), 1.5));
        assert!(approx(m.scroll_time(2), 0.9));
        assert!(approx(m.scroll_time(8), 1.5));

        m.prepare_next(&mut rec, 2, false, RevealStrategy::Together, None).unwrap();
        assert!(approx(rec.time(), 1.2));
        m.set_custom_duration(2, 3.0);
        m.prepare_next(&mut rec, 1, false, RevealStrategy::OneByOne, None).unwrap();
        assert!(approx(rec.time(), 4.2));
        m.prepare_next(&mut rec, 1, false, RevealStrategy::OneByOne, Some(0.5)).unwrap();
        assert!(approx(rec.time(), 4.7));
    }

    #[test]
    fn test_scroll_retires_and_slides() {
        let (mut rec, mut m) = column(4);
        m.prepare_next(&mut rec, 3, false, RevealStrategy::Together, None).unwrap();
        let top0 = rec.scene.bounds(m.blocks()[0]).top();
        let top1 = rec.scene.bounds(m.blocks()[1]).top();
        assert_eq!(m.scroll_down(&mut rec, 1, None).unwrap(), 1);
        assert!(approx(rec.scene.bounds(m.blocks()[1]).top(), top0));
        assert!(!rec.scene.is_visible(m.blocks()[0]));
        assert_eq!(m.get_visible_range(), 1..3);
        assert_eq!(m.scroll_tick(), 1);
        assert!(top0 > top1);

        // Past the end retires only what is visible.
        assert_eq!(m.scroll_down(&mut rec, 10, None).unwrap(), 2);
        assert_eq!(m.get_visible_range(), 3..3);
        assert_eq!(m.scroll_tick(), 3);
        // The unrevealed block moved with the column and reveals at the top.
        m.reveal(&mut rec).unwrap();
        assert!(approx(rec.scene.bounds(m.blocks()[3]).top(), top0));
    }

    #[test]
    fn test_same_item_replays_without_advancing() {
        let (mut rec, mut m) = column(3);
        assert!(matches!(
            m.prepare_next(&mut rec, 1, true, RevealStrategy::OneByOne, None),
            Err(ScrollError::PreconditionViolation(_))
        ));
        m.prepare_next(&mut rec, 2, false, RevealStrategy::Together, None).unwrap();
        let plays = rec.play_count();
        assert_eq!(m.prepare_next(&mut rec, 1, true, RevealStrategy::Together, None).unwrap(), 2);
        assert_eq!(m.next_to_reveal(), 2);
        assert_eq!(rec.play_count(), plays + 1);
        assert!(rec.scene.is_visible(m.blocks()[1]));
    }

    #[test]
    fn test_scroll_to_and_reset() {
        let (mut rec, mut m) = column(5);
        let home = rec.scene.center(m.blocks()[0]);
        m.scroll_to(&mut rec, 3).unwrap();
        assert_eq!(m.first_visible(), 3);
        assert_eq!(m.next_to_reveal(), 4);
        assert!(matches!(m.scroll_to(&mut rec, 1), Err(ScrollError::PreconditionViolation(_))));

        m.reset_view(&mut rec).unwrap();
        assert_eq!(m.get_visible_range(), 0..0);
        assert_eq!(m.scroll_tick(), 3);
        let back = rec.scene.center(m.blocks()[0]);
        assert!(approx(back[0], home[0]) && approx(back[1], home[1]));
        assert_eq!(m.scrolled(), 0.0);
        assert!(m.blocks().iter().all(|&b| !rec.scene.is_visible(b)));
    }

    #[test]
    fn test_utilities_check_visibility() {
        let (mut rec, mut m) = column(3);
        assert!(matches!(
            m.flash(&mut rec, 0, None),
            Err(ScrollError::IndexOutOfVisibleRange { index: 0, first: 0, next: 0 })
        ));
        m.reveal(&mut rec).unwrap();
        m.flash(&mut rec, 0, None).unwrap();
        m.highlight_element(&mut rec, 0, Some(Rgba::RED)).unwrap();
        assert_eq!(rec.clips_labeled("Indicate").count(), 1);
        assert!(m.is_visible(0) && !m.is_visible(1));
        assert_eq!(m.get_element(2), Some(m.blocks()[2]));
        assert_eq!(m.get_element(3), None);

        m.fadeout_all(&mut rec).unwrap();
        assert_eq!(m.get_visible_range(), 1..1);
        assert!(!rec.scene.is_visible(m.blocks()[0]));
    }

    #[test]
    fn test_append_continues_column() {
        let (mut rec, mut m) = column(2);
        let extra = rec.scene.insert(shapes::rectangle(1.0, 1.0));
        m.append_elements(&mut rec.scene, &[extra]);
        assert_eq!(m.len(), 3);
        let last = rec.scene.bounds(m.blocks()[1]);
        let b = rec.scene.bounds(extra);
        assert!(approx(last.bottom() - b.top(), 0.4));
        assert!(approx(b.left(), -6.5));
    }
}
