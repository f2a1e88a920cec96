//! Animations and the recorded timeline.
//!
//! Two layers:
//! - [`Animation`] is what lesson code plays (`FadeIn`, `Transform`, ...). Each animation has a
//!   deterministic end state: [`Animation::settle`] applies it to the scene when it completes.
//! - [`Timeline`] is the record of what was played: eased scalar keyframes per target plus a
//!   labeled clip per animation. Track values are offsets relative to the settled geometry, so a
//!   renderer can sample `(alpha, translation, rotation, scale)` for any time without replaying
//!   the scene.
//!
//! Usage sketch:
//! ```ignore
//! use stepwise::anim::{Animation, Timeline};
//! let mut tl = Timeline::new();
//! let anim = Animation::fade_in(label).with_shift(UP);
//! anim.record(&mut tl, &scene, 0.0, 1.0);
//! anim.settle(&mut scene);
//! ```

use crate::scene::{ObjectId, Rgba, Scene2D};

/// How to map animation time into a normalized [0,1] parameter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    /// manim's default `smooth` rate function.
    Smooth,
    /// Up and back down: 0 → 1 → 0 (manim's `there_and_back`).
    ThereAndBack,
}

impl Ease {
    #[inline]
    pub fn sample(self, x: f32) -> f32 {
        let t = x.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::InQuad => t * t,
            Ease::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }
            Ease::InCubic => t * t * t,
            Ease::OutCubic => 1.0 - (1.0 - t).powi(3),
            Ease::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
            Ease::Smooth => t * t * (3.0 - 2.0 * t),
            Ease::ThereAndBack => {
                let u = if t < 0.5 { 2.0 * t } else { 2.0 - 2.0 * t };
                u * u * (3.0 - 2.0 * u)
            }
        }
    }
}

/// A keyframe in seconds with a scalar value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Keyframe {
    pub time_s: f32,
    pub value: f32,
    pub ease: Ease,
}

impl Keyframe {
    #[inline]
    pub fn at(time_s: f32, value: f32) -> Self {
        Self {
            time_s: time_s.max(0.0),
            value,
            ease: Ease::Linear,
        }
    }

    #[inline]
    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }
}

/// Interpolate a scalar track across keyframes.
fn sample_keyframes(frames: &[Keyframe], t_s: f32) -> Option<f32> {
    let first = frames.first()?;
    if frames.len() == 1 || t_s <= first.time_s {
        return Some(first.value);
    }

    let mut prev = *first;
    for next in &frames[1..] {
        if t_s < next.time_s {
            let dt = (next.time_s - prev.time_s).max(1e-6);
            let u = (t_s - prev.time_s) / dt;
            let k = prev.ease.sample(u);
            return Some(lerp(prev.value, next.value, k));
        }
        prev = *next;
    }

    // Past end: hold last value.
    frames.last().map(|k| k.value)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Which scalar a track drives.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Property {
    Alpha,
    TranslateX,
    TranslateY,
    Rotate,
    Scale,
}

/// One animation track applies one property to one target.
#[derive(Debug, Clone)]
pub struct Track {
    pub target: ObjectId,
    pub property: Property,
    pub keyframes: Vec<Keyframe>,
}

impl Track {
    pub fn new(target: ObjectId, property: Property) -> Self {
        Self {
            target,
            property,
            keyframes: Vec::new(),
        }
    }

    pub fn with_keyframes(mut self, mut keyframes: Vec<Keyframe>) -> Self {
        // Keep deterministic ordering.
        keyframes.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
        self.keyframes = keyframes;
        self
    }

    pub fn bounds(&self) -> Option<(f32, f32)> {
        let start = self.keyframes.first()?.time_s;
        let end = self.keyframes.last()?.time_s;
        Some((start, end))
    }

    pub fn sample(&self, t_s: f32) -> Option<f32> {
        sample_keyframes(&self.keyframes, t_s)
    }
}

/// One played animation, as it appears on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub label: String,
    pub start_s: f32,
    pub end_s: f32,
    pub targets: Vec<ObjectId>,
}

/// Sampled animated state of one target, relative to its settled geometry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose {
    pub alpha: f32,
    pub offset: [f32; 2],
    pub rotation: f32,
    pub scale: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            offset: [0.0, 0.0],
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

/// A timeline holds clips and tracks. Tracks are evaluated independently at time t.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    pub clips: Vec<Clip>,
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_track(&mut self, track: Track) -> &mut Self {
        self.tracks.push(track);
        self
    }

    pub fn add_clip(&mut self, clip: Clip) -> &mut Self {
        self.clips.push(clip);
        self
    }

    /// Compute the time bounds of the whole timeline.
    pub fn bounds(&self) -> Option<(f32, f32)> {
        let spans = self
            .tracks
            .iter()
            .filter_map(Track::bounds)
            .chain(self.clips.iter().map(|c| (c.start_s, c.end_s)));

        let mut any = false;
        let (mut start, mut end) = (f32::INFINITY, f32::NEG_INFINITY);
        for (s, e) in spans {
            start = start.min(s);
            end = end.max(e);
            any = true;
        }
        if any { Some((start, end)) } else { None }
    }

    /// Sample the pose of `target` at `t_s`.
    ///
    /// Tracks that have not started yet are ignored, so an object's pose before its first
    /// clip is the default. When several started tracks drive the same property, the one that
    /// started last wins.
    pub fn sample(&self, target: ObjectId, t_s: f32) -> Pose {
        let mut pose = Pose::default();
        for tr in self.tracks.iter().filter(|tr| tr.target == target) {
            let Some((start, _)) = tr.bounds() else {
                continue;
            };
            if t_s < start {
                continue;
            }
            let Some(v) = tr.sample(t_s) else {
                continue;
            };
            match tr.property {
                Property::Alpha => pose.alpha = v.clamp(0.0, 1.0),
                Property::TranslateX => pose.offset[0] = v,
                Property::TranslateY => pose.offset[1] = v,
                Property::Rotate => pose.rotation = v,
                Property::Scale => pose.scale = v,
            }
        }
        pose
    }

    /// Clips overlapping `t_s`.
    pub fn active_clips(&self, t_s: f32) -> impl Iterator<Item = &Clip> {
        self.clips
            .iter()
            .filter(move |c| c.start_s <= t_s && t_s <= c.end_s)
    }
}

/// An animation request, mirroring manim's animation constructors.
#[derive(Debug, Clone, PartialEq)]
pub enum Animation {
    Write(ObjectId),
    Create(ObjectId),
    GrowArrow(ObjectId),
    /// Fade in while travelling by `shift`, growing from `scale`, optionally emanating
    /// from the point `from`.
    FadeIn {
        target: ObjectId,
        shift: [f32; 2],
        scale: f32,
        from: Option<[f32; 2]>,
    },
    FadeOut {
        target: ObjectId,
        shift: [f32; 2],
        scale: f32,
    },
    /// Morph `from` into a copy of `to`; `from` keeps its identity.
    Transform { from: ObjectId, to: ObjectId },
    /// Morph `from` into `to`; afterwards `to` is on stage and `from` is not.
    ReplacementTransform { from: ObjectId, to: ObjectId },
    Shift { target: ObjectId, by: [f32; 2] },
    MoveTo { target: ObjectId, point: [f32; 2] },
    SetColor { target: ObjectId, color: Rgba },
    Indicate {
        target: ObjectId,
        color: Rgba,
        scale: f32,
    },
    FocusOn { point: [f32; 2] },
    Flash { point: [f32; 2], color: Rgba },
    /// Play children together; child `i` starts `i * lag_ratio` sub-durations in.
    Group {
        animations: Vec<Animation>,
        lag_ratio: f32,
    },
}

impl Animation {
    pub fn fade_in(target: ObjectId) -> Self {
        Animation::FadeIn {
            target,
            shift: [0.0, 0.0],
            scale: 1.0,
            from: None,
        }
    }

    pub fn fade_out(target: ObjectId) -> Self {
        Animation::FadeOut {
            target,
            shift: [0.0, 0.0],
            scale: 1.0,
        }
    }

    /// Set the travel of a fade; no-op on other variants.
    pub fn with_shift(mut self, by: [f32; 2]) -> Self {
        if let Animation::FadeIn { shift, .. } | Animation::FadeOut { shift, .. } = &mut self {
            *shift = by;
        }
        self
    }

    /// Set the start (fade-in) or end (fade-out) scale; no-op on other variants.
    pub fn with_scale(mut self, factor: f32) -> Self {
        if let Animation::FadeIn { scale, .. } | Animation::FadeOut { scale, .. } = &mut self {
            *scale = factor;
        }
        self
    }

    /// Make a fade-in emanate from `point`; no-op on other variants.
    pub fn from_point(mut self, point: [f32; 2]) -> Self {
        if let Animation::FadeIn { from, .. } = &mut self {
            *from = Some(point);
        }
        self
    }

    pub fn group(animations: Vec<Animation>) -> Self {
        Animation::Group {
            animations,
            lag_ratio: 0.0,
        }
    }

    pub fn lagged(animations: Vec<Animation>, lag_ratio: f32) -> Self {
        Animation::Group {
            animations,
            lag_ratio,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Animation::Write(_) => "Write",
            Animation::Create(_) => "Create",
            Animation::GrowArrow(_) => "GrowArrow",
            Animation::FadeIn { .. } => "FadeIn",
            Animation::FadeOut { .. } => "FadeOut",
            Animation::Transform { .. } => "Transform",
            Animation::ReplacementTransform { .. } => "ReplacementTransform",
            Animation::Shift { .. } => "Shift",
            Animation::MoveTo { .. } => "MoveTo",
            Animation::SetColor { .. } => "SetColor",
            Animation::Indicate { .. } => "Indicate",
            Animation::FocusOn { .. } => "FocusOn",
            Animation::Flash { .. } => "Flash",
            Animation::Group { .. } => "AnimationGroup",
        }
    }

    /// Every object this animation touches, in order.
    pub fn targets(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.collect_targets(&mut out);
        out
    }

    fn collect_targets(&self, out: &mut Vec<ObjectId>) {
        match self {
            Animation::Write(t) | Animation::Create(t) | Animation::GrowArrow(t) => out.push(*t),
            Animation::FadeIn { target, .. }
            | Animation::FadeOut { target, .. }
            | Animation::Shift { target, .. }
            | Animation::MoveTo { target, .. }
            | Animation::SetColor { target, .. }
            | Animation::Indicate { target, .. } => out.push(*target),
            Animation::Transform { from, to } | Animation::ReplacementTransform { from, to } => {
                out.push(*from);
                out.push(*to);
            }
            Animation::FocusOn { .. } | Animation::Flash { .. } => {}
            Animation::Group { animations, .. } => {
                for a in animations {
                    a.collect_targets(out);
                }
            }
        }
    }

    /// First target missing from `scene`, if any.
    pub fn unknown_target(&self, scene: &Scene2D) -> Option<ObjectId> {
        self.targets().into_iter().find(|t| !scene.contains(*t))
    }

    /// Apply the end state of this animation to the scene.
    pub fn settle(&self, scene: &mut Scene2D) {
        match self {
            Animation::Write(t) | Animation::Create(t) | Animation::GrowArrow(t) => {
                show(scene, *t)
            }
            Animation::FadeIn { target, .. } => show(scene, *target),
            Animation::FadeOut { target, .. } => hide(scene, *target),
            Animation::Transform { from, to } => {
                scene.become_copy(*from, *to);
                show(scene, *from);
            }
            Animation::ReplacementTransform { from, to } => {
                hide(scene, *from);
                show(scene, *to);
            }
            Animation::Shift { target, by } => scene.shift(*target, *by),
            Animation::MoveTo { target, point } => scene.move_to(*target, *point),
            Animation::SetColor { target, color } => scene.set_color(*target, *color),
            Animation::Indicate { .. } | Animation::FocusOn { .. } | Animation::Flash { .. } => {}
            Animation::Group { animations, .. } => {
                for a in animations {
                    a.settle(scene);
                }
            }
        }
    }

    /// Record this animation into `timeline` over `[start_s, start_s + run_time]`.
    ///
    /// Must be called before [`Animation::settle`]: offsets are measured against the
    /// pre-animation scene.
    pub fn record(&self, timeline: &mut Timeline, scene: &Scene2D, start_s: f32, run_time: f32) {
        let end_s = start_s + run_time;
        timeline.add_clip(Clip {
            label: self.label().to_string(),
            start_s,
            end_s,
            targets: self.targets(),
        });

        let ramp = |target: ObjectId, property: Property, from: f32, to: f32| {
            Track::new(target, property).with_keyframes(vec![
                Keyframe::at(start_s, from).ease(Ease::Smooth),
                Keyframe::at(end_s, to),
            ])
        };
        let travel = |timeline: &mut Timeline, target: ObjectId, from: [f32; 2], to: [f32; 2]| {
            if from != to {
                timeline.add_track(ramp(target, Property::TranslateX, from[0], to[0]));
                timeline.add_track(ramp(target, Property::TranslateY, from[1], to[1]));
            }
        };

        match self {
            Animation::Write(t) | Animation::Create(t) | Animation::GrowArrow(t) => {
                timeline.add_track(ramp(*t, Property::Alpha, 0.0, 1.0));
            }
            Animation::FadeIn {
                target,
                shift,
                scale,
                from,
            } => {
                timeline.add_track(ramp(*target, Property::Alpha, 0.0, 1.0));
                let start = match from {
                    Some(p) => {
                        let c = scene.center(*target);
                        [p[0] - c[0], p[1] - c[1]]
                    }
                    None => [-shift[0], -shift[1]],
                };
                travel(timeline, *target, start, [0.0, 0.0]);
                if (*scale - 1.0).abs() > f32::EPSILON {
                    timeline.add_track(ramp(*target, Property::Scale, *scale, 1.0));
                }
            }
            Animation::FadeOut {
                target,
                shift,
                scale,
            } => {
                timeline.add_track(ramp(*target, Property::Alpha, 1.0, 0.0));
                travel(timeline, *target, [0.0, 0.0], *shift);
                if (*scale - 1.0).abs() > f32::EPSILON {
                    timeline.add_track(ramp(*target, Property::Scale, 1.0, *scale));
                }
            }
            Animation::Transform { from, to } | Animation::ReplacementTransform { from, to } => {
                let (cf, ct) = (scene.center(*from), scene.center(*to));
                if matches!(self, Animation::ReplacementTransform { .. }) {
                    timeline.add_track(ramp(*from, Property::Alpha, 1.0, 0.0));
                    timeline.add_track(ramp(*to, Property::Alpha, 0.0, 1.0));
                    travel(timeline, *to, [cf[0] - ct[0], cf[1] - ct[1]], [0.0, 0.0]);
                } else {
                    travel(timeline, *from, [cf[0] - ct[0], cf[1] - ct[1]], [0.0, 0.0]);
                }
            }
            Animation::Shift { target, by } => {
                travel(timeline, *target, [-by[0], -by[1]], [0.0, 0.0]);
            }
            Animation::MoveTo { target, point } => {
                let c = scene.center(*target);
                travel(timeline, *target, [c[0] - point[0], c[1] - point[1]], [0.0, 0.0]);
            }
            Animation::SetColor { .. } | Animation::FocusOn { .. } | Animation::Flash { .. } => {}
            Animation::Indicate { target, scale, .. } => {
                let mid = start_s + run_time * 0.5;
                timeline.add_track(Track::new(*target, Property::Scale).with_keyframes(vec![
                    Keyframe::at(start_s, 1.0).ease(Ease::Smooth),
                    Keyframe::at(mid, *scale).ease(Ease::Smooth),
                    Keyframe::at(end_s, 1.0),
                ]));
            }
            Animation::Group {
                animations,
                lag_ratio,
            } => {
                for (a, (offset, dur)) in animations
                    .iter()
                    .zip(lag_schedule(animations.len(), *lag_ratio, run_time))
                {
                    a.record(timeline, scene, start_s + offset, dur);
                }
            }
        }
    }
}

/// `(start offset, duration)` of each child of a lagged group of total length `total`.
///
/// Each child runs `d = total / (1 + lag_ratio * (n - 1))`; child `i` starts at
/// `i * lag_ratio * d`, so the last one ends exactly at `total`.
pub fn lag_schedule(n: usize, lag_ratio: f32, total: f32) -> Vec<(f32, f32)> {
    if n == 0 {
        return Vec::new();
    }
    let r = lag_ratio.max(0.0);
    let d = total / (1.0 + r * (n as f32 - 1.0));
    (0..n).map(|i| (i as f32 * r * d, d)).collect()
}

/// Put `id` on stage: roots are added, children are unhidden along with their root.
fn show(scene: &mut Scene2D, id: ObjectId) {
    match scene.parent(id) {
        None => scene.add(id),
        Some(_) => {
            scene.set_hidden(id, false);
            let root = scene.root_of(id);
            scene.add(root);
        }
    }
    scene.set_opacity(id, 1.0);
}

fn hide(scene: &mut Scene2D, id: ObjectId) {
    match scene.parent(id) {
        None => {
            scene.remove(id);
        }
        Some(_) => scene.set_hidden(id, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::shapes;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_ease_endpoints() {
        for ease in [Ease::Linear, Ease::Smooth, Ease::InOutCubic, Ease::OutQuad] {
            assert!(approx(ease.sample(0.0), 0.0));
            assert!(approx(ease.sample(1.0), 1.0));
        }
        assert!(approx(Ease::ThereAndBack.sample(0.5), 1.0));
        assert!(approx(Ease::ThereAndBack.sample(1.0), 0.0));
    }

    #[test]
    fn test_lag_schedule_ends_on_total() {
        let sched = lag_schedule(3, 0.5, 2.0);
        let (last_start, d) = sched[2];
        assert!(approx(last_start + d, 2.0));
        assert!(approx(sched[0].0, 0.0));

        let together = lag_schedule(4, 0.0, 1.0);
        assert!(together.iter().all(|&(s, d)| s == 0.0 && approx(d, 1.0)));
    }

    #[test]
    fn test_fade_in_settles_on_stage() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(1.0, 1.0));
        let anim = Animation::fade_in(a).with_shift([0.0, 1.0]);
        let mut tl = Timeline::new();
        anim.record(&mut tl, &scene, 0.0, 1.0);
        anim.settle(&mut scene);

        assert!(scene.is_visible(a));
        assert!(approx(tl.sample(a, 0.0).offset[1], -1.0));
        assert!(approx(tl.sample(a, 1.0).offset[1], 0.0));
        assert!(approx(tl.sample(a, 1.0).alpha, 1.0));
    }

    #[test]
    fn test_fade_out_hides_child_but_keeps_geometry() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(1.0, 1.0));
        let g = scene.group("g", &[a]);
        scene.add(g);
        Animation::fade_out(a).with_shift([0.0, 2.0]).settle(&mut scene);
        assert!(!scene.is_visible(a));
        assert!(scene.is_visible(g));
        assert!(approx(scene.center(a)[1], 0.0));
    }

    #[test]
    fn test_replacement_transform_swaps_stage() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(1.0, 1.0));
        let b = scene.insert(shapes::rectangle(2.0, 1.0));
        scene.add(a);
        Animation::ReplacementTransform { from: a, to: b }.settle(&mut scene);
        assert!(!scene.is_on_stage(a));
        assert!(scene.is_on_stage(b));
    }

    #[test]
    fn test_group_targets_and_unknown() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(1.0, 1.0));
        let anim = Animation::group(vec![
            Animation::Write(a),
            Animation::Shift {
                target: ObjectId(99),
                by: [1.0, 0.0],
            },
        ]);
        assert_eq!(anim.targets(), vec![a, ObjectId(99)]);
        assert_eq!(anim.unknown_target(&scene), Some(ObjectId(99)));
    }
}
