//! Arena storage for the scene graph.
//!
//! Every block lives in one `Vec<Node>` and is addressed by [`ObjectId`]. Parents own their
//! children by id, so labels and annotations can point back into other blocks (a triangle's
//! vertex labels, an annotation's anchor glyphs) without owning them.
//!
//! `roots` is the set of blocks currently on stage. A node is visible when its root is on
//! stage and neither it nor any ancestor is hidden.

use std::collections::BTreeMap;

use lyon::path::Path;

use super::{Aabb2, Affine2, Mobject2D, Rgba, Style, path_bounds, transform_path};

/// Handle to a node in a [`Scene2D`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub z: i32,
    pub style: Style,
    pub opacity: f32,
    pub hidden: bool,
    pub outline: Option<Path>,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
}

/// A flattened visible outline, ready to be drawn.
#[derive(Debug, Clone)]
pub struct DrawItem2D<'a> {
    pub id: ObjectId,
    pub outline: &'a Path,
    pub style: Style,
    pub opacity: f32,
    pub z: i32,
}

#[derive(Debug, Default, Clone)]
pub struct Scene2D {
    nodes: Vec<Node>,
    roots: Vec<ObjectId>,
    index: BTreeMap<String, ObjectId>,
}

impl Scene2D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move an owned tree into the arena. The new block is detached and off stage.
    pub fn insert(&mut self, m: Mobject2D) -> ObjectId {
        self.insert_under(m, None)
    }

    /// Insert an owned tree as the last child of `parent`.
    pub fn insert_child(&mut self, parent: ObjectId, m: Mobject2D) -> ObjectId {
        let id = self.insert_under(m, Some(parent));
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    fn insert_under(&mut self, m: Mobject2D, parent: Option<ObjectId>) -> ObjectId {
        let id = ObjectId(self.nodes.len());
        self.index.entry(m.name.clone()).or_insert(id);
        self.nodes.push(Node {
            name: m.name,
            z: m.z,
            style: m.style,
            opacity: 1.0,
            hidden: m.hidden,
            outline: m.outline,
            parent,
            children: Vec::new(),
        });
        for child in m.children {
            let c = self.insert_under(child, Some(id));
            self.nodes[id.0].children.push(c);
        }
        id
    }

    /// Create an empty group node and reparent `children` under it, in order.
    pub fn group(&mut self, name: impl Into<String>, children: &[ObjectId]) -> ObjectId {
        let id = self.insert(Mobject2D::new(name));
        for &c in children {
            self.attach(id, c);
        }
        id
    }

    /// Make `child` the last child of `parent`, detaching it from wherever it was.
    pub fn attach(&mut self, parent: ObjectId, child: ObjectId) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        self.roots.retain(|r| *r != child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Detach `child` from its parent (it keeps its geometry and subtree).
    pub fn detach(&mut self, child: ObjectId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        self.nodes[parent.0].children.retain(|c| *c != child);
        self.nodes[child.0].parent = None;
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        id.0 < self.nodes.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, id: ObjectId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn node_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// First node inserted under `name`.
    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.index.get(name).copied()
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child(&self, id: ObjectId, i: usize) -> Option<ObjectId> {
        self.children(id).get(i).copied()
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn root_of(&self, mut id: ObjectId) -> ObjectId {
        while let Some(p) = self.parent(id) {
            id = p;
        }
        id
    }

    /// `id` and every node below it, pre-order.
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if !self.contains(cur) {
                continue;
            }
            out.push(cur);
            stack.extend(self.children(cur).iter().rev().copied());
        }
        out
    }

    /// Outlined nodes of the subtree in drawing order (a math block's glyphs).
    pub fn leaves(&self, id: ObjectId) -> Vec<ObjectId> {
        self.descendants(id)
            .into_iter()
            .filter(|d| self.nodes[d.0].outline.is_some())
            .collect()
    }

    /// Bounds of every outline in the subtree, hidden nodes included.
    pub fn bounds(&self, id: ObjectId) -> Aabb2 {
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.nodes[d.0].outline.as_ref().map(path_bounds))
            .fold(Aabb2::empty(), Aabb2::union)
    }

    /// Bounds over a slice of blocks.
    pub fn bounds_of(&self, ids: &[ObjectId]) -> Aabb2 {
        ids.iter()
            .map(|&id| self.bounds(id))
            .fold(Aabb2::empty(), Aabb2::union)
    }

    #[inline]
    pub fn center(&self, id: ObjectId) -> [f32; 2] {
        self.bounds(id).center()
    }

    #[inline]
    pub fn width(&self, id: ObjectId) -> f32 {
        self.bounds(id).width()
    }

    #[inline]
    pub fn height(&self, id: ObjectId) -> f32 {
        self.bounds(id).height()
    }

    /// Rewrite every outline in the subtree through `xf`.
    pub fn apply_transform(&mut self, id: ObjectId, xf: Affine2) {
        for d in self.descendants(id) {
            let node = &mut self.nodes[d.0];
            if let Some(outline) = &node.outline {
                node.outline = Some(transform_path(outline, xf));
            }
        }
    }

    pub fn shift(&mut self, id: ObjectId, by: [f32; 2]) {
        if by != [0.0, 0.0] {
            self.apply_transform(id, Affine2::translate(by[0], by[1]));
        }
    }

    /// Move the subtree so its bounds center lands on `target`.
    pub fn move_to(&mut self, id: ObjectId, target: [f32; 2]) {
        let c = self.center(id);
        self.shift(id, [target[0] - c[0], target[1] - c[1]]);
    }

    /// Uniform scale about the bounds center.
    pub fn scale(&mut self, id: ObjectId, factor: f32) {
        let c = self.center(id);
        self.scale_about(id, factor, c);
    }

    pub fn scale_about(&mut self, id: ObjectId, factor: f32, pivot: [f32; 2]) {
        self.apply_transform(id, Affine2::scale(factor, factor).about(pivot));
    }

    /// Counter-clockwise rotation about the bounds center.
    pub fn rotate(&mut self, id: ObjectId, rad: f32) {
        let c = self.center(id);
        self.rotate_about(id, rad, c);
    }

    pub fn rotate_about(&mut self, id: ObjectId, rad: f32, pivot: [f32; 2]) {
        self.apply_transform(id, Affine2::rotate(rad).about(pivot));
    }

    /// Place `id` beside `target` in `direction` with a gap of `buff` (manim's `next_to`).
    ///
    /// Along the perpendicular axis the centers are aligned.
    pub fn next_to(&mut self, id: ObjectId, target: ObjectId, direction: [f32; 2], buff: f32) {
        let tb = self.bounds(target);
        self.next_to_box(id, tb, direction, buff);
    }

    pub fn next_to_point(&mut self, id: ObjectId, p: [f32; 2], direction: [f32; 2], buff: f32) {
        self.next_to_box(id, Aabb2::from_min_max(p, p), direction, buff);
    }

    fn next_to_box(&mut self, id: ObjectId, tb: Aabb2, direction: [f32; 2], buff: f32) {
        let mb = self.bounds(id);
        let target = tb.critical_point(direction);
        let own = mb.critical_point([-direction[0], -direction[1]]);
        let delta = [
            target[0] - own[0] + direction[0] * buff,
            target[1] - own[1] + direction[1] * buff,
        ];
        self.shift(id, delta);
    }

    /// Align the `direction` edge of `id` with the same edge of `target` (manim's `align_to`).
    pub fn align_to(&mut self, id: ObjectId, target: ObjectId, direction: [f32; 2]) {
        let tp = self.bounds(target).critical_point(direction);
        self.align_edge_to(id, tp, direction);
    }

    /// Align the `direction` edge of `id` with the coordinate(s) of `p` on the active axes.
    pub fn align_edge_to(&mut self, id: ObjectId, p: [f32; 2], direction: [f32; 2]) {
        let own = self.bounds(id).critical_point(direction);
        let dx = if direction[0] != 0.0 { p[0] - own[0] } else { 0.0 };
        let dy = if direction[1] != 0.0 { p[1] - own[1] } else { 0.0 };
        self.shift(id, [dx, dy]);
    }

    pub fn set_color(&mut self, id: ObjectId, color: Rgba) {
        for d in self.descendants(id) {
            self.nodes[d.0].style.color = color;
        }
    }

    pub fn set_opacity(&mut self, id: ObjectId, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        for d in self.descendants(id) {
            self.nodes[d.0].opacity = opacity;
        }
    }

    pub fn set_z(&mut self, id: ObjectId, z: i32) {
        if let Some(n) = self.node_mut(id) {
            n.z = z;
        }
    }

    pub fn set_hidden(&mut self, id: ObjectId, hidden: bool) {
        if let Some(n) = self.node_mut(id) {
            n.hidden = hidden;
        }
    }

    /// Color of the first outlined node of the subtree, or the node's own color.
    pub fn color(&self, id: ObjectId) -> Option<Rgba> {
        let leaf = self.leaves(id).first().copied().unwrap_or(id);
        self.node(leaf).map(|n| n.style.color)
    }

    /// Extract the subtree as an owned tree (hidden flags, opacity-free).
    pub fn to_mobject(&self, id: ObjectId) -> Mobject2D {
        let Some(node) = self.node(id) else {
            return Mobject2D::default();
        };
        Mobject2D {
            name: node.name.clone(),
            z: node.z,
            style: node.style,
            hidden: node.hidden,
            outline: node.outline.clone(),
            children: node.children.iter().map(|&c| self.to_mobject(c)).collect(),
        }
    }

    /// Deep copy of the subtree as a new detached, off-stage block.
    pub fn copy(&mut self, id: ObjectId) -> ObjectId {
        let m = self.to_mobject(id);
        let copy = self.insert(m);
        let src: Vec<f32> = self
            .descendants(id)
            .iter()
            .map(|d| self.nodes[d.0].opacity)
            .collect();
        for (d, a) in self.descendants(copy).into_iter().zip(src) {
            self.nodes[d.0].opacity = a;
        }
        copy
    }

    /// Make `target` structurally identical to `source` (manim's `become`).
    ///
    /// `target` keeps its id, parent and stage membership; its old children are detached.
    pub fn become_copy(&mut self, target: ObjectId, source: ObjectId) {
        if target == source || !self.contains(target) || !self.contains(source) {
            return;
        }
        let m = self.to_mobject(source);
        let opacity = self.nodes[source.0].opacity;
        for c in self.children(target).to_vec() {
            self.nodes[c.0].parent = None;
        }
        let node = &mut self.nodes[target.0];
        node.children.clear();
        node.style = m.style;
        node.outline = m.outline;
        node.opacity = opacity;
        for child in m.children {
            self.insert_child(target, child);
        }
    }

    /// Put a block on stage as a root (detaching it from any parent).
    pub fn add(&mut self, id: ObjectId) {
        if !self.contains(id) {
            return;
        }
        self.detach(id);
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    /// Take a root block off stage. Returns whether it was on stage.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let before = self.roots.len();
        self.roots.retain(|r| *r != id);
        before != self.roots.len()
    }

    #[inline]
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn is_on_stage(&self, id: ObjectId) -> bool {
        self.roots.contains(&self.root_of(id))
    }

    /// On stage, and neither the node nor any ancestor is hidden.
    pub fn is_visible(&self, id: ObjectId) -> bool {
        if !self.contains(id) || !self.is_on_stage(id) {
            return false;
        }
        let mut cur = Some(id);
        while let Some(c) = cur {
            if self.nodes[c.0].hidden {
                return false;
            }
            cur = self.nodes[c.0].parent;
        }
        true
    }

    /// Flatten visible outlines for drawing, ordered by z then stage order.
    pub fn flatten(&self) -> Vec<DrawItem2D<'_>> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.flatten_node(root, 0, &mut out);
        }
        out.sort_by_key(|item| item.z);
        out
    }

    fn flatten_node<'a>(&'a self, id: ObjectId, z_base: i32, out: &mut Vec<DrawItem2D<'a>>) {
        let node = &self.nodes[id.0];
        if node.hidden {
            return;
        }
        let z = z_base + node.z;
        if let Some(outline) = &node.outline {
            out.push(DrawItem2D {
                id,
                outline,
                style: node.style,
                opacity: node.opacity,
                z,
            });
        }
        for &c in &node.children {
            self.flatten_node(c, z, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DOWN, RIGHT, shapes};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_insert_and_group() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(1.0, 1.0));
        let b = scene.insert(shapes::rectangle(2.0, 1.0));
        scene.shift(b, [3.0, 0.0]);
        let g = scene.group("g", &[a, b]);
        assert_eq!(scene.children(g), &[a, b]);
        assert_eq!(scene.parent(a), Some(g));
        assert!(approx(scene.width(g), 4.5));
        assert_eq!(scene.leaves(g), vec![a, b]);
    }

    #[test]
    fn test_next_to_and_align() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(2.0, 2.0));
        let b = scene.insert(shapes::rectangle(1.0, 1.0));
        scene.next_to(b, a, DOWN, 0.5);
        let bb = scene.bounds(b);
        assert!(approx(bb.top(), -1.5));
        assert!(approx(bb.center()[0], 0.0));

        scene.align_to(b, a, RIGHT);
        assert!(approx(scene.bounds(b).right(), 1.0));
    }

    #[test]
    fn test_copy_is_independent() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(1.0, 1.0));
        let c = scene.copy(a);
        scene.shift(c, [5.0, 0.0]);
        assert!(approx(scene.center(a)[0], 0.0));
        assert!(approx(scene.center(c)[0], 5.0));
    }

    #[test]
    fn test_become_keeps_identity() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(1.0, 1.0));
        let b = scene.insert(shapes::rectangle(3.0, 1.0).with_color(Rgba::RED));
        scene.add(a);
        scene.become_copy(a, b);
        assert!(scene.is_on_stage(a));
        assert!(approx(scene.width(a), 3.0));
        assert_eq!(scene.color(a), Some(Rgba::RED));
    }

    #[test]
    fn test_visibility_follows_hidden_ancestors() {
        let mut scene = Scene2D::new();
        let a = scene.insert(shapes::rectangle(1.0, 1.0));
        let g = scene.group("g", &[a]);
        assert!(!scene.is_visible(a));
        scene.add(g);
        assert!(scene.is_visible(a));
        scene.set_hidden(g, true);
        assert!(!scene.is_visible(a));
        assert!(scene.flatten().is_empty());
    }
}
