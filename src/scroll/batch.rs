//! Applying several column operations at once, without consuming scene time.

use log::debug;

use crate::scene::{DOWN, ObjectId};
use crate::stage::Stage;

use super::{ReplaceOptions, RevealStrategy, ScrollError, ScrollManager};

/// One queued column operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollOp {
    PrepareNext {
        steps: usize,
        strategy: RevealStrategy,
    },
    ScrollDown {
        steps: usize,
    },
    ReplaceInPlace {
        index: usize,
        block: ObjectId,
    },
    RestoreOriginal {
        index: usize,
    },
    CascadeUpdate {
        start: usize,
        blocks: Vec<ObjectId>,
    },
    FadeInFromTarget {
        target: ObjectId,
        steps: usize,
    },
    ScrollTo {
        index: usize,
    },
    AppendElements(Vec<ObjectId>),
    FadeOutAll,
    ResetView,
}

/// Animations-off section of a manager. Dropping it, on return or unwind, puts the previous
/// setting back.
struct BatchGuard<'m> {
    manager: &'m mut ScrollManager,
    previous: bool,
}

impl<'m> BatchGuard<'m> {
    fn begin(manager: &'m mut ScrollManager) -> Self {
        let previous = manager.animations_enabled;
        manager.animations_enabled = false;
        Self { manager, previous }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.manager.animations_enabled = self.previous;
    }
}

impl ScrollManager {
    fn apply(&mut self, stage: &mut dyn Stage, op: ScrollOp) -> Result<(), ScrollError> {
        match op {
            ScrollOp::PrepareNext { steps, strategy } => {
                self.prepare_next(stage, steps, false, strategy, None)?;
            }
            ScrollOp::ScrollDown { steps } => {
                self.scroll_down(stage, steps, None)?;
            }
            ScrollOp::ReplaceInPlace { index, block } => {
                self.replace_in_place(stage, index, block, ReplaceOptions::default())?;
            }
            ScrollOp::RestoreOriginal { index } => self.restore_original(stage, index, None)?,
            ScrollOp::CascadeUpdate { start, blocks } => {
                self.cascade_update(stage, start, &blocks, None, DOWN)?
            }
            ScrollOp::FadeInFromTarget { target, steps } => {
                self.fade_in_from_target(stage, target, steps, None, None)?;
            }
            ScrollOp::ScrollTo { index } => self.scroll_to(stage, index)?,
            ScrollOp::AppendElements(ids) => self.append_elements(stage.scene_mut(), &ids),
            ScrollOp::FadeOutAll => self.fadeout_all(stage)?,
            ScrollOp::ResetView => self.reset_view(stage)?,
        }
        Ok(())
    }

    /// Run `f` with animations disabled, restoring the previous setting afterwards
    /// whether `f` succeeds, fails or panics.
    pub fn batch<R>(
        &mut self,
        stage: &mut dyn Stage,
        f: impl FnOnce(&mut Self, &mut dyn Stage) -> Result<R, ScrollError>,
    ) -> Result<R, ScrollError> {
        let mut guard = BatchGuard::begin(self);
        f(&mut *guard.manager, stage)
    }

    /// Apply `ops` in order, jumping straight to each end state. Stops at the first failure;
    /// operations before it stay applied.
    pub fn batch_operations(
        &mut self,
        stage: &mut dyn Stage,
        ops: impl IntoIterator<Item = ScrollOp>,
    ) -> Result<(), ScrollError> {
        self.batch(stage, |m, stage| {
            for (i, op) in ops.into_iter().enumerate() {
                debug!("batch op {i}: {op:?}");
                m.apply(stage, op)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::shapes;
    use crate::scroll::tests::column;
    use crate::stage::Recorder;

    fn ops(rec: &mut Recorder) -> Vec<ScrollOp> {
        let swap = rec.scene.insert(shapes::rectangle(1.0, 1.0));
        vec![
            ScrollOp::PrepareNext {
                steps: 3,
                strategy: RevealStrategy::Together,
            },
            ScrollOp::ScrollDown { steps: 1 },
            ScrollOp::ReplaceInPlace {
                index: 2,
                block: swap,
            },
            ScrollOp::PrepareNext {
                steps: 1,
                strategy: RevealStrategy::OneByOne,
            },
        ]
    }

    #[test]
    fn test_batch_matches_sequential_end_state() {
        let (mut seq, mut m_seq) = column(5);
        for op in ops(&mut seq) {
            m_seq.apply(&mut seq, op).unwrap();
        }

        let (mut bat, mut m_bat) = column(5);
        let queued = ops(&mut bat);
        m_bat.batch_operations(&mut bat, queued).unwrap();

        assert_eq!(bat.time(), 0.0);
        assert!(seq.time() > 0.0);
        assert_eq!(m_seq.get_visible_range(), m_bat.get_visible_range());
        assert_eq!(m_seq.blocks(), m_bat.blocks());
        for &id in m_bat.blocks() {
            assert_eq!(seq.scene.is_visible(id), bat.scene.is_visible(id));
            let (a, b) = (seq.scene.center(id), bat.scene.center(id));
            assert!((a[0] - b[0]).abs() < 1e-4 && (a[1] - b[1]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_batch_restores_flag_on_error() {
        let (mut rec, mut m) = column(3);
        let err = m.batch_operations(
            &mut rec,
            vec![
                ScrollOp::PrepareNext {
                    steps: 2,
                    strategy: RevealStrategy::Together,
                },
                ScrollOp::RestoreOriginal { index: 0 },
            ],
        );
        assert!(matches!(err, Err(ScrollError::NothingToRestore(0))));
        assert!(m.animations_enabled());
        assert_eq!(m.get_visible_range(), 0..2);

        m.set_animations_enabled(false);
        m.batch(&mut rec, |m, stage| m.scroll_down(stage, 1, None)).unwrap();
        assert!(!m.animations_enabled());
    }

    #[test]
    fn test_batch_restores_flag_on_panic() {
        let (mut rec, mut m) = column(3);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            m.batch(&mut rec, |m, stage| -> Result<(), ScrollError> {
                m.reveal(stage)?;
                assert!(!m.animations_enabled());
                panic!("lesson code bailed out mid-batch");
            })
        }));
        assert!(outcome.is_err());
        assert!(m.animations_enabled());
        assert_eq!(m.get_visible_range(), 0..1);
    }
}
