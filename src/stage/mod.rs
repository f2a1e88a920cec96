//! The play loop seam.
//!
//! Lesson components never talk to a renderer directly; they drive a [`Stage`]:
//! `play` runs animations to completion and advances the scene clock, `wait` idles,
//! `jump` applies end states instantly (batch mode).
//!
//! [`Recorder`] is the headless implementation used by demos and tests: it validates,
//! records every animation into a [`Timeline`], settles end states and advances its clock.

use std::fmt;

use log::debug;

use crate::anim::{Animation, Clip, Timeline};
use crate::scene::{ObjectId, Scene2D};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown object {0:?}")]
    UnknownObject(ObjectId),

    #[error("run time must be positive and finite, got {0}")]
    InvalidRunTime(f32),

    #[error("engine failure: {0}")]
    Other(String),
}

pub trait Stage {
    fn scene(&self) -> &Scene2D;

    fn scene_mut(&mut self) -> &mut Scene2D;

    /// Play `animations` together, blocking until they complete.
    fn play(&mut self, animations: Vec<Animation>, run_time: Option<f32>)
    -> Result<(), EngineError>;

    fn wait(&mut self, seconds: f32) -> Result<(), EngineError>;

    /// Current scene clock in seconds.
    fn time(&self) -> f32;

    /// Apply end states without consuming scene time.
    fn jump(&mut self, animations: Vec<Animation>) -> Result<(), EngineError> {
        validate(self.scene(), &animations)?;
        for a in &animations {
            a.settle(self.scene_mut());
        }
        Ok(())
    }

    fn add(&mut self, id: ObjectId) {
        self.scene_mut().add(id);
    }

    fn remove(&mut self, id: ObjectId) {
        self.scene_mut().remove(id);
    }
}

/// Fail on the first animation target that does not exist in `scene`.
pub fn validate(scene: &Scene2D, animations: &[Animation]) -> Result<(), EngineError> {
    match animations.iter().find_map(|a| a.unknown_target(scene)) {
        Some(id) => Err(EngineError::UnknownObject(id)),
        None => Ok(()),
    }
}

/// Headless stage that records a timeline.
#[derive(Debug, Clone)]
pub struct Recorder {
    pub scene: Scene2D,
    pub timeline: Timeline,
    pub default_run_time: f32,
    clock: f32,
    plays: usize,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(Scene2D::new())
    }
}

impl Recorder {
    pub fn new(scene: Scene2D) -> Self {
        Self {
            scene,
            timeline: Timeline::new(),
            default_run_time: 1.0,
            clock: 0.0,
            plays: 0,
        }
    }

    /// Number of non-empty `play` calls so far.
    pub fn play_count(&self) -> usize {
        self.plays
    }

    /// Clips whose label matches `label`.
    pub fn clips_labeled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Clip> + 'a {
        self.timeline.clips.iter().filter(move |c| c.label == label)
    }
}

impl Stage for Recorder {
    fn scene(&self) -> &Scene2D {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene2D {
        &mut self.scene
    }

    fn play(
        &mut self,
        animations: Vec<Animation>,
        run_time: Option<f32>,
    ) -> Result<(), EngineError> {
        if animations.is_empty() {
            return Ok(());
        }
        let rt = run_time.unwrap_or(self.default_run_time);
        if !(rt.is_finite() && rt > 0.0) {
            return Err(EngineError::InvalidRunTime(rt));
        }
        validate(&self.scene, &animations)?;

        debug!(
            "play {} animation(s) at t={:.2}s for {:.2}s",
            animations.len(),
            self.clock,
            rt
        );
        for a in &animations {
            a.record(&mut self.timeline, &self.scene, self.clock, rt);
        }
        for a in &animations {
            a.settle(&mut self.scene);
        }
        self.clock += rt;
        self.plays += 1;
        Ok(())
    }

    fn wait(&mut self, seconds: f32) -> Result<(), EngineError> {
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err(EngineError::InvalidRunTime(seconds));
        }
        if seconds > 0.0 {
            self.timeline.add_clip(Clip {
                label: "Wait".to_string(),
                start_s: self.clock,
                end_s: self.clock + seconds,
                targets: Vec::new(),
            });
            self.clock += seconds;
        }
        Ok(())
    }

    fn time(&self) -> f32 {
        self.clock
    }
}

impl fmt::Display for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} clip(s), {} track(s), {:.2}s",
            self.timeline.clips.len(),
            self.timeline.tracks.len(),
            self.clock
        )?;
        for clip in &self.timeline.clips {
            writeln!(
                f,
                "  [{:>7.2} .. {:>7.2}] {} {:?}",
                clip.start_s,
                clip.end_s,
                clip.label,
                clip.targets.iter().map(|t| t.0).collect::<Vec<_>>()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::shapes;

    #[test]
    fn test_play_advances_clock_and_settles() {
        let mut rec = Recorder::default();
        let a = rec.scene.insert(shapes::rectangle(1.0, 1.0));
        rec.play(vec![Animation::Write(a)], Some(2.0)).unwrap();
        assert_eq!(rec.time(), 2.0);
        assert!(rec.scene.is_visible(a));
        assert_eq!(rec.play_count(), 1);
        assert_eq!(rec.clips_labeled("Write").count(), 1);
    }

    #[test]
    fn test_empty_play_is_noop() {
        let mut rec = Recorder::default();
        rec.play(Vec::new(), None).unwrap();
        assert_eq!(rec.time(), 0.0);
        assert_eq!(rec.play_count(), 0);
    }

    #[test]
    fn test_invalid_play_mutates_nothing() {
        let mut rec = Recorder::default();
        let a = rec.scene.insert(shapes::rectangle(1.0, 1.0));
        let err = rec
            .play(
                vec![
                    Animation::Write(a),
                    Animation::Write(ObjectId(42)),
                ],
                None,
            )
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownObject(ObjectId(42)));
        assert!(!rec.scene.is_on_stage(a));
        assert_eq!(rec.time(), 0.0);

        let err = rec.play(vec![Animation::Write(a)], Some(0.0)).unwrap_err();
        assert_eq!(err, EngineError::InvalidRunTime(0.0));
    }

    #[test]
    fn test_jump_takes_no_time() {
        let mut rec = Recorder::default();
        let a = rec.scene.insert(shapes::rectangle(1.0, 1.0));
        rec.jump(vec![Animation::fade_in(a)]).unwrap();
        assert!(rec.scene.is_visible(a));
        assert_eq!(rec.time(), 0.0);
        assert!(rec.timeline.clips.is_empty());
    }
}
