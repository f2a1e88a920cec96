use log::{debug, warn};

use crate::anim::Animation;
use crate::config::LayoutConfig;
use crate::scene::{Mobject2D, ObjectId, Rgba, Scene2D, shapes};
use crate::tex::{MathRenderer, MathStyle, TexTemplate};

use super::{AnchorSpec, Annotation, LayoutError};

#[derive(Debug, Default)]
struct ExpressionSlot {
    parts: Vec<String>,
    /// Plain text rather than math.
    text: bool,
    annotations: Vec<Annotation>,
}

/// Caption over expressions, each followed by its reserved annotation slot.
#[derive(Debug, Default)]
pub struct LabeledStep {
    caption: Option<String>,
    expressions: Vec<ExpressionSlot>,
    template: Option<TexTemplate>,
    config: LayoutConfig,
}

impl LabeledStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_template(mut self, template: TexTemplate) -> Self {
        self.template = Some(template);
        self
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn expression_count(&self) -> usize {
        self.expressions.len()
    }

    /// Append an expression; returns its index.
    pub fn add_expression(&mut self, latex: &str) -> usize {
        self.add_expression_parts(&[latex])
    }

    /// Append an expression rendered as one glyph run per part.
    pub fn add_expression_parts(&mut self, parts: &[&str]) -> usize {
        self.expressions.push(ExpressionSlot {
            parts: parts.iter().map(|p| p.to_string()).collect(),
            text: false,
            annotations: Vec::new(),
        });
        self.expressions.len() - 1
    }

    /// Append a plain-text line (keystrokes, remarks) in the expression column.
    pub fn add_text(&mut self, text: &str) -> usize {
        self.expressions.push(ExpressionSlot {
            parts: vec![text.to_string()],
            text: true,
            annotations: Vec::new(),
        });
        self.expressions.len() - 1
    }

    /// Attach `annotation` to the most recent expression.
    ///
    /// Returns `(expression index, annotation index)`.
    pub fn register_annotation(
        &mut self,
        annotation: Annotation,
    ) -> Result<(usize, usize), LayoutError> {
        let e = self.expressions.len().checked_sub(1).ok_or_else(|| {
            LayoutError::PreconditionViolation(format!(
                "annotation {:?} registered before any expression",
                annotation.term
            ))
        })?;
        let slot = &mut self.expressions[e];
        slot.annotations.push(annotation);
        Ok((e, slot.annotations.len() - 1))
    }

    /// Positional form of [`LabeledStep::register_annotation`].
    pub fn annotate(
        &mut self,
        term: &str,
        left: impl Into<AnchorSpec>,
        right: Option<AnchorSpec>,
        color: Option<Rgba>,
        h_offset: Option<f32>,
    ) -> Result<(usize, usize), LayoutError> {
        let mut ann = Annotation::new(term).with_h_offset(h_offset.unwrap_or(self.config.annotation_h_offset));
        ann = match right {
            Some(r) => ann.between(left, r),
            None => ann.under(left),
        };
        ann.color = color;
        self.register_annotation(ann)
    }

    /// Lay the step out with its top-left corner at the origin.
    ///
    /// Annotations are placed hidden; an annotation whose anchors cannot be found is
    /// omitted with a warning, but its slot is still reserved.
    pub fn build(
        self,
        scene: &mut Scene2D,
        renderer: &dyn MathRenderer,
    ) -> Result<BuiltStep, LayoutError> {
        let cfg = self.config;
        let template = self.template.as_ref();
        let root = scene.insert(Mobject2D::new("LabeledStep"));
        let mut cursor = 0.0_f32;

        let caption = match &self.caption {
            Some(text) => {
                let mut m = renderer.render_text(text)?;
                m.scale(cfg.caption_scale);
                m.set_color(cfg.caption_color);
                let id = scene.insert_child(root, m);
                put_top_left(scene, id, [0.0, cursor]);
                cursor = scene.bounds(id).bottom() - cfg.caption_gap;
                Some(id)
            }
            None => None,
        };

        let mut expressions = Vec::with_capacity(self.expressions.len());
        let mut annotations = Vec::with_capacity(self.expressions.len());
        for (i, slot) in self.expressions.into_iter().enumerate() {
            if i > 0 {
                cursor -= cfg.expression_gap;
            }
            let parts: Vec<&str> = slot.parts.iter().map(String::as_str).collect();
            let mut m = if slot.text {
                renderer.render_text(&parts.concat())?
            } else {
                renderer.render_math(&parts, MathStyle::Display, template)?
            };
            m.scale(cfg.math_scale);
            let expr = scene.insert_child(root, m);
            put_top_left(scene, expr, [0.0, cursor]);
            let eb = scene.bounds(expr);
            cursor = eb.bottom();
            expressions.push(expr);

            let mut placed = Vec::with_capacity(slot.annotations.len());
            let mut reserve = 0.0_f32;
            for mut ann in slot.annotations {
                reserve = reserve.max(ann.reserved_height(renderer, &cfg)?);
                let ranges = match ann.resolve(scene, renderer, expr, template, cfg.glyph_precision) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("annotation {:?} on expression {i} omitted: {e}", ann.term);
                        placed.push(None);
                        continue;
                    }
                };
                let group = ann.place(scene, renderer, expr, &ranges, &cfg)?;
                scene.attach(root, group);
                scene.set_hidden(group, true);
                placed.push(Some(group));
            }
            if reserve > 0.0 {
                let mut spacer = shapes::rectangle(eb.width().max(1e-3), reserve).hidden();
                spacer.name = "AnnotationSlot".to_string();
                let id = scene.insert_child(root, spacer);
                put_top_left(scene, id, [eb.left(), cursor]);
                cursor -= reserve;
            }
            annotations.push(placed);
        }

        debug!(
            "built step {:?}: {} expression(s), height {:.2}",
            self.caption,
            expressions.len(),
            scene.height(root)
        );
        Ok(BuiltStep {
            id: root,
            caption,
            expressions,
            annotations,
        })
    }
}

fn put_top_left(scene: &mut Scene2D, id: ObjectId, p: [f32; 2]) {
    let b = scene.bounds(id);
    scene.shift(id, [p[0] - b.left(), p[1] - b.top()]);
}

/// Handles into a laid-out step.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStep {
    pub id: ObjectId,
    pub caption: Option<ObjectId>,
    pub expressions: Vec<ObjectId>,
    /// Per expression, per registered annotation; `None` when it was omitted.
    pub annotations: Vec<Vec<Option<ObjectId>>>,
}

impl BuiltStep {
    pub fn get_expression(&self, i: usize) -> Option<ObjectId> {
        self.expressions.get(i).copied()
    }

    pub fn get_annotation(&self, expr: usize, ann: usize) -> Option<ObjectId> {
        self.annotations.get(expr)?.get(ann).copied().flatten()
    }

    /// Fade-ins revealing every placed annotation of expression `expr`.
    pub fn reveal_annotations(&self, expr: usize) -> Vec<Animation> {
        self.annotations
            .get(expr)
            .into_iter()
            .flatten()
            .flatten()
            .map(|id| Animation::fade_in(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::run_glyphs;
    use crate::tex::Typesetter;

    #[test]
    fn test_annotation_before_expression_fails() {
        let mut step = LabeledStep::new();
        assert!(matches!(
            step.register_annotation(Annotation::new("+5").under("2")),
            Err(LayoutError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_annotation_sits_under_anchor() {
        let tex = Typesetter::default();
        let mut scene = Scene2D::new();
        let cfg = LayoutConfig::default();
        let mut step = LabeledStep::new().with_caption("Subtract").with_config(cfg);
        step.add_expression("y = 3x + 2");
        step.annotate("+5", "2", None, None, None).unwrap();
        let built = step.build(&mut scene, &tex).unwrap();

        let expr = built.get_expression(0).unwrap();
        let ann = built.get_annotation(0, 0).unwrap();
        assert!(!scene.is_visible(ann));

        let two = *run_glyphs(&scene, expr, 0).last().unwrap();
        let (ab, gb) = (scene.bounds(ann), scene.bounds(two));
        assert!((ab.center()[0] - gb.center()[0]).abs() < 1e-4);
        assert!((ab.top() - (scene.bounds(expr).bottom() - cfg.annotation_buff)).abs() < 1e-4);
        // The slot is part of the step before the annotation shows.
        assert!(scene.bounds(built.id).bottom() <= ab.bottom() + 1e-4);
    }

    #[test]
    fn test_unresolved_anchor_keeps_slot() {
        let tex = Typesetter::default();
        let mut scene = Scene2D::new();

        let mut good = LabeledStep::new();
        good.add_expression("a + b");
        good.annotate("-1", "b", None, None, None).unwrap();
        let good = good.build(&mut scene, &tex).unwrap();

        let mut bad = LabeledStep::new();
        bad.add_expression("a + b");
        bad.annotate("-1", "q", None, None, None).unwrap();
        let bad = bad.build(&mut scene, &tex).unwrap();

        assert!(bad.get_annotation(0, 0).is_none());
        assert!((scene.height(good.id) - scene.height(bad.id)).abs() < 1e-4);
    }

    #[test]
    fn test_expressions_stack_downward() {
        let tex = Typesetter::default();
        let mut scene = Scene2D::new();
        let mut step = LabeledStep::new();
        step.add_expression("x + 1 = 3");
        step.add_expression_parts(&["x", "=", "2"]);
        step.add_text("SHIFT tan ( 0.75 ) =");
        let built = step.build(&mut scene, &tex).unwrap();
        let (a, b) = (built.expressions[0], built.expressions[1]);
        assert!(scene.bounds(b).top() < scene.bounds(a).bottom());
        assert!((scene.bounds(a).left() - scene.bounds(b).left()).abs() < 1e-5);
        assert_eq!(scene.children(b).len(), 3);
        assert_eq!(built.expressions.len(), 3);
        assert_eq!(scene.node(built.expressions[2]).map(|n| n.name.as_str()), Some("Text"));
        assert!(built.reveal_annotations(0).is_empty());
    }
}
