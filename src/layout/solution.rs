use crate::config::LayoutConfig;
use crate::scene::{Aabb2, Mobject2D, ObjectId, Scene2D};
use crate::tex::MathRenderer;

use super::{BuiltStep, LabeledStep, LayoutError};

/// Stack `ids` top to bottom, left edges on `top_left[0]`, separated by `gap`.
pub fn arrange_column(scene: &mut Scene2D, ids: &[ObjectId], top_left: [f32; 2], gap: f32) {
    let mut top = top_left[1];
    for &id in ids {
        let b = scene.bounds(id);
        scene.shift(id, [top_left[0] - b.left(), top - b.top()]);
        top -= b.height() + gap;
    }
}

/// Ordered labeled steps forming one worked solution.
#[derive(Debug, Default)]
pub struct Solution {
    steps: Vec<LabeledStep>,
    config: LayoutConfig,
}

impl Solution {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            steps: Vec::new(),
            config,
        }
    }

    pub fn push(&mut self, step: LabeledStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn with_step(mut self, step: LabeledStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Build every step and stack them with the top-left corner at the origin.
    pub fn build(
        self,
        scene: &mut Scene2D,
        renderer: &dyn MathRenderer,
    ) -> Result<BuiltSolution, LayoutError> {
        let steps = self
            .steps
            .into_iter()
            .map(|s| s.build(scene, renderer))
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<ObjectId> = steps.iter().map(|s| s.id).collect();
        arrange_column(scene, &ids, [0.0, 0.0], self.config.step_gap);

        let id = scene.insert(Mobject2D::new("Solution"));
        for &step in &ids {
            scene.attach(id, step);
        }
        Ok(BuiltSolution { id, steps })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltSolution {
    pub id: ObjectId,
    pub steps: Vec<BuiltStep>,
}

impl BuiltSolution {
    pub fn bounds(&self, scene: &Scene2D) -> Aabb2 {
        scene.bounds(self.id)
    }

    pub fn step_ids(&self) -> Vec<ObjectId> {
        self.steps.iter().map(|s| s.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::Typesetter;

    fn step(src: &str) -> LabeledStep {
        let mut s = LabeledStep::new().with_caption("Step");
        s.add_expression(src);
        s
    }

    #[test]
    fn test_steps_left_aligned_with_gap() {
        let tex = Typesetter::default();
        let mut scene = Scene2D::new();
        let cfg = LayoutConfig::default();
        let built = Solution::new(cfg)
            .with_step(step("2x + 3 = 7"))
            .with_step(step("2x = 4"))
            .with_step(step("x = 2"))
            .build(&mut scene, &tex)
            .unwrap();

        let ids = built.step_ids();
        assert_eq!(ids.len(), 3);
        for pair in ids.windows(2) {
            let (a, b) = (scene.bounds(pair[0]), scene.bounds(pair[1]));
            assert!((a.left() - b.left()).abs() < 1e-5);
            assert!((a.bottom() - b.top() - cfg.step_gap).abs() < 1e-4);
        }
        assert!((built.bounds(&scene).top()).abs() < 1e-5);
    }

    #[test]
    fn test_geometry_is_a_function_of_contents() {
        let tex = Typesetter::default();
        let mut scene = Scene2D::new();
        let a = Solution::default().with_step(step("x = 1")).build(&mut scene, &tex).unwrap();
        let b = Solution::default().with_step(step("x = 1")).build(&mut scene, &tex).unwrap();
        assert_eq!(a.bounds(&scene), b.bounds(&scene));
    }
}
