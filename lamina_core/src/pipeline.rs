// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render pipeline: dirty queues and the per-frame flush.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cmp::Reverse;
use core::fmt;
use core::mem;

use kurbo::Vec2;

use crate::id::{INVALID, NodeId};
use crate::layer::{LayerKind, LayerTree};
use crate::node::{
    BoxConstraints, Measure, NodeKind, NodeTree, ObserverId, Style, StyleChanges, StyleEffect,
    StyleField, StyleObserver, release_layer,
};
use crate::painting::repaint_composited_child;
use crate::scheduler::FrameScheduler;
use crate::time::HostTime;

/// A one-shot callback run at the start of the next frame.
pub type EnterFrameCallback = Box<dyn FnOnce(&mut RenderPipeline, NodeId, HostTime)>;

/// How much work each phase of a flush did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlushStats {
    /// Enter-frame callbacks run.
    pub enter_frame: u32,
    /// Relayout boundaries laid out.
    pub layout: u32,
    /// Nodes whose compositing flag was recomputed.
    pub compositing: u32,
    /// Repaint boundaries repainted.
    pub paint: u32,
}

impl FlushStats {
    /// Whether the flush did nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Owns the node and layer trees and turns dirty nodes into a fresh layer
/// tree, one phase at a time.
///
/// Mutations mark nodes dirty and queue the node where propagation stops.
/// [`flush`](Self::flush) then drains four queues in a fixed order, each
/// sorted the way its phase requires:
///
/// 1. enter-frame callbacks, shallowest node first,
/// 2. layout, shallowest relayout boundary first, so parents settle each
///    child's boundary before the child is visited,
/// 3. compositing bits, shallowest first,
/// 4. paint, deepest repaint boundary first, so nested layers are fresh
///    before their ancestors re-append them.
///
/// Queue entries whose node was destroyed or detached since it was queued
/// are skipped.
///
/// The first time anything becomes dirty after a flush, the pipeline asks
/// its [`FrameScheduler`] for a frame.
pub struct RenderPipeline {
    nodes: NodeTree,
    layers: LayerTree,
    root: Option<NodeId>,
    root_constraints: BoxConstraints,
    enter_frame_queue: Vec<(NodeId, EnterFrameCallback)>,
    scheduler: Option<Box<dyn FrameScheduler>>,
    frame_requested: bool,
    flushing: bool,
}

impl fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("nodes", &self.nodes)
            .field("layers", &self.layers.len())
            .field("root", &self.root)
            .field("root_constraints", &self.root_constraints)
            .field("enter_frame_queue", &self.enter_frame_queue.len())
            .field("has_scheduler", &self.scheduler.is_some())
            .field("frame_requested", &self.frame_requested)
            .field("flushing", &self.flushing)
            .finish()
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    /// Creates an empty pipeline without a scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: NodeTree::new(),
            layers: LayerTree::new(),
            root: None,
            root_constraints: BoxConstraints::UNBOUNDED,
            enter_frame_queue: Vec::new(),
            scheduler: None,
            frame_requested: false,
            flushing: false,
        }
    }

    /// Creates an empty pipeline that requests frames from `scheduler`.
    #[must_use]
    pub fn with_scheduler(scheduler: Box<dyn FrameScheduler>) -> Self {
        let mut pipeline = Self::new();
        pipeline.scheduler = Some(scheduler);
        pipeline
    }

    /// Replaces the frame scheduler.
    pub fn set_scheduler(&mut self, scheduler: Option<Box<dyn FrameScheduler>>) {
        self.scheduler = scheduler;
        self.frame_requested = false;
        self.request_frame_if_needed();
    }

    // -- Accessors --

    /// The node tree.
    #[must_use]
    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    /// The layer tree produced by painting.
    #[must_use]
    pub fn layers(&self) -> &LayerTree {
        &self.layers
    }

    /// Mutable access to the layer tree, for compositing.
    pub fn layers_mut(&mut self) -> &mut LayerTree {
        &mut self.layers
    }

    /// The attached root node.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The constraints the root is laid out with.
    #[must_use]
    pub fn root_constraints(&self) -> BoxConstraints {
        self.root_constraints
    }

    /// Whether any queue holds work.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.nodes.queues.is_empty() || !self.enter_frame_queue.is_empty()
    }

    /// Whether a frame has been requested and not yet flushed.
    #[must_use]
    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested
    }

    // -- Structure --

    /// Creates a detached node.
    pub fn create_node(&mut self, kind: NodeKind, style: Style) -> NodeId {
        self.nodes.create(kind, style)
    }

    /// Destroys a detached node and all of its descendants.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, the node has a parent, or it is the
    /// root.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.nodes.validate(id);
        assert!(
            self.nodes.parent[id.idx as usize] == INVALID,
            "remove a node from its parent before destroying it"
        );
        assert!(self.root != Some(id), "cannot destroy the root node");
        for n in self.nodes.subtree(id.idx) {
            if let Some(layer) = self.nodes.layer[n as usize].take() {
                release_layer(&mut self.layers, layer);
            }
            self.nodes.free(n);
        }
    }

    /// Attaches `root` as the tree the pipeline renders, or detaches the
    /// current root when `None`.
    ///
    /// The root is its own relayout boundary and always owns a layer, which
    /// becomes the root of the layer tree.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has a parent.
    pub fn set_root(&mut self, root: Option<NodeId>) {
        if root == self.root {
            return;
        }
        if let Some(old) = self.root.take() {
            self.nodes.detach_subtree(old.idx, &mut self.layers);
        }
        self.layers.set_root(None);
        let Some(id) = root else {
            return;
        };
        self.nodes.validate(id);
        let idx = id.idx;
        let i = idx as usize;
        assert!(
            self.nodes.parent[i] == INVALID,
            "the root node must not have a parent"
        );

        let layer = self.layers.create_layer(LayerKind::Offset(Vec2::ZERO));
        self.layers.set_retained(layer, true);
        self.layers.set_root(Some(layer));
        self.nodes.layer[i] = Some(layer);
        self.nodes.was_repaint_boundary[i] = true;
        self.nodes.relayout_boundary[i] = idx;
        self.nodes.constraints[i] = Some(self.root_constraints);
        self.nodes.parent_uses_size[i] = false;
        self.nodes.needs_layout[i] = false;
        self.nodes.needs_paint[i] = false;
        self.nodes.needs_compositing_bits_update[i] = false;
        self.nodes.attach_subtree(idx);
        self.root = Some(id);

        self.nodes.mark_needs_layout(idx);
        self.nodes.mark_needs_compositing_bits_update(idx);
        self.nodes.mark_needs_paint(idx);
        self.request_frame_if_needed();
    }

    /// Sets the constraints the root is laid out with, typically the
    /// viewport size.
    pub fn set_root_constraints(&mut self, constraints: BoxConstraints) {
        if constraints == self.root_constraints {
            return;
        }
        self.root_constraints = constraints;
        if let Some(root) = self.root {
            self.nodes.constraints[root.idx as usize] = Some(constraints);
            self.nodes.mark_needs_layout(root.idx);
            self.request_frame_if_needed();
        }
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, `parent` is not a group, `child`
    /// already has a parent or is the root, or the append would create a
    /// cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.adopt(parent, child, INVALID);
    }

    /// Inserts `child` into `parent` just before `before`.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as
    /// [`append_child`](Self::append_child), or if `before` is not a child
    /// of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) {
        self.nodes.validate(before);
        assert!(
            self.nodes.parent[before.idx as usize] == parent.idx,
            "insertion point is not a child of the parent"
        );
        self.adopt(parent, child, before.idx);
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId, before: u32) {
        self.nodes.validate(parent);
        self.nodes.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.nodes.kind[p as usize].is_container(),
            "only group nodes can have children"
        );
        assert!(
            self.nodes.parent[c as usize] == INVALID,
            "child node already has a parent"
        );
        assert!(self.root != Some(child), "the root node cannot be adopted");
        assert!(
            !self.nodes.is_ancestor_or_self(c, p),
            "appending node would create a cycle"
        );

        self.nodes.link_before(p, c, before);
        self.nodes.mark_needs_layout(p);
        self.nodes.mark_needs_compositing_bits_update(p);
        if self.nodes.attached[p as usize] {
            self.nodes.attach_subtree(c);
        }
        self.request_frame_if_needed();
    }

    /// Detaches `child` from its parent, keeping it and its subtree alive.
    ///
    /// Layers owned by the subtree are released. Boundaries the subtree
    /// inherited from above are forgotten.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_child(&mut self, child: NodeId) {
        self.nodes.validate(child);
        let c = child.idx;
        let p = self.nodes.parent[c as usize];
        assert!(p != INVALID, "node has no parent");

        self.nodes.clean_relayout_boundary(c);
        self.nodes.unlink(c);
        if self.nodes.attached[c as usize] {
            self.nodes.detach_subtree(c, &mut self.layers);
        }
        self.nodes.mark_needs_layout(p);
        self.nodes.mark_needs_compositing_bits_update(p);
        self.request_frame_if_needed();
    }

    // -- Content --

    /// Edits a node's style and invalidates whatever the changed fields
    /// affect.
    ///
    /// Observers watching a changed field run after the new style is stored.
    /// Returns the set of fields that actually changed.
    pub fn update_style(&mut self, id: NodeId, update: impl FnOnce(&mut Style)) -> StyleChanges {
        self.nodes.validate(id);
        let i = id.idx as usize;
        let mut style = self.nodes.style[i].clone();
        update(&mut style);
        let changes = self.nodes.style[i].diff(&style);
        if changes.is_empty() {
            return changes;
        }
        self.nodes.style[i] = style;
        tracing::trace!(node = id.idx, ?changes, "style changed");

        let parent = self.nodes.parent[i];
        if changes.has_effect(StyleEffect::ParentLayout) {
            self.nodes.mark_needs_layout(id.idx);
            if parent != INVALID {
                self.nodes.mark_needs_layout(parent);
            }
        }
        if changes.has_effect(StyleEffect::Layout) {
            self.nodes.mark_needs_layout(id.idx);
        }
        if changes.has_effect(StyleEffect::Paint) {
            self.nodes.mark_needs_paint(id.idx);
        }
        if changes.has_effect(StyleEffect::ParentPaint) {
            self.nodes.mark_needs_paint(id.idx);
            if parent != INVALID {
                self.nodes.mark_needs_paint(parent);
            }
        }
        if changes.has_effect(StyleEffect::Compositing) {
            self.nodes.mark_needs_compositing_bits_update(id.idx);
        }

        self.nodes.observers[i].notify(id, changes, &self.nodes.style[i]);
        self.request_frame_if_needed();
        changes
    }

    /// Replaces what a node draws.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, or the new kind cannot have children
    /// and the node has some.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes.validate(id);
        let i = id.idx as usize;
        assert!(
            kind.is_container() || self.nodes.first_child[i] == INVALID,
            "only group nodes can have children"
        );
        self.nodes.kind[i] = kind;
        self.nodes.mark_needs_layout(id.idx);
        self.nodes.mark_needs_paint(id.idx);
        self.request_frame_if_needed();
    }

    /// Installs or removes the function that sizes a leaf node.
    pub fn set_measure(&mut self, id: NodeId, measure: Option<Box<dyn Measure>>) {
        self.nodes.validate(id);
        self.nodes.measure[id.idx as usize] = measure;
        self.nodes.mark_needs_layout(id.idx);
        self.request_frame_if_needed();
    }

    /// Watches one style field of a node. The observer runs only when the
    /// field's value actually changes.
    pub fn observe_style(
        &mut self,
        id: NodeId,
        field: StyleField,
        observer: StyleObserver,
    ) -> ObserverId {
        self.nodes.validate(id);
        self.nodes.observers[id.idx as usize].add(field, observer)
    }

    /// Removes a style observer. Returns whether it was registered.
    pub fn unobserve_style(&mut self, id: NodeId, observer: ObserverId) -> bool {
        self.nodes.validate(id);
        self.nodes.observers[id.idx as usize].remove(observer)
    }

    /// Queues `callback` to run once at the start of the next frame.
    ///
    /// Callbacks for nodes that are detached by then are dropped unrun.
    pub fn request_enter_frame(
        &mut self,
        id: NodeId,
        callback: impl FnOnce(&mut Self, NodeId, HostTime) + 'static,
    ) {
        self.nodes.validate(id);
        self.enter_frame_queue.push((id, Box::new(callback)));
        self.request_frame_if_needed();
    }

    /// Marks a node's layout stale, for content the pipeline cannot see
    /// change, such as a custom node's internal state.
    pub fn mark_needs_layout(&mut self, id: NodeId) {
        self.nodes.validate(id);
        self.nodes.mark_needs_layout(id.idx);
        self.request_frame_if_needed();
    }

    /// Marks a node's paint stale.
    pub fn mark_needs_paint(&mut self, id: NodeId) {
        self.nodes.validate(id);
        self.nodes.mark_needs_paint(id.idx);
        self.request_frame_if_needed();
    }

    // -- Flushing --

    /// Runs every phase for one frame.
    pub fn flush(&mut self, now: HostTime) -> FlushStats {
        let stats = FlushStats {
            enter_frame: self.flush_enter_frame(now),
            layout: self.flush_layout(),
            compositing: self.flush_compositing_bits(),
            paint: self.flush_paint(),
        };
        tracing::debug!(
            enter_frame = stats.enter_frame,
            layout = stats.layout,
            compositing = stats.compositing,
            paint = stats.paint,
            "pipeline flushed"
        );
        stats
    }

    /// Runs the enter-frame callbacks queued before this call.
    ///
    /// Callbacks queued while this runs wait for the next frame.
    pub fn flush_enter_frame(&mut self, now: HostTime) -> u32 {
        let was_flushing = mem::replace(&mut self.flushing, true);
        let mut entries = mem::take(&mut self.enter_frame_queue);
        entries.retain(|(id, _)| self.owns(*id));
        entries.sort_by_key(|(id, _)| self.nodes.depth[id.idx as usize]);
        let mut count = 0;
        for (id, callback) in entries {
            if self.owns(id) {
                callback(self, id, now);
                count += 1;
            }
        }
        self.flushing = was_flushing;
        count
    }

    /// Lays out every queued relayout boundary, shallowest first, until the
    /// queue stays empty.
    pub fn flush_layout(&mut self) -> u32 {
        let was_flushing = mem::replace(&mut self.flushing, true);
        let mut count = 0;
        while !self.nodes.queues.layout.is_empty() {
            let mut dirty = mem::take(&mut self.nodes.queues.layout);
            dirty.retain(|id| self.owns(*id));
            dirty.sort_by_key(|id| self.nodes.depth[id.idx as usize]);
            for id in dirty {
                if self.owns(id) && self.nodes.needs_layout[id.idx as usize] {
                    self.nodes.layout_without_resize(id.idx);
                    count += 1;
                }
            }
        }
        self.flushing = was_flushing;
        count
    }

    /// Recomputes compositing flags, shallowest first.
    pub fn flush_compositing_bits(&mut self) -> u32 {
        let was_flushing = mem::replace(&mut self.flushing, true);
        let mut count = 0;
        while !self.nodes.queues.compositing.is_empty() {
            let mut dirty = mem::take(&mut self.nodes.queues.compositing);
            dirty.retain(|id| self.owns(*id));
            dirty.sort_by_key(|id| self.nodes.depth[id.idx as usize]);
            for id in dirty {
                if self.owns(id) {
                    count += self.nodes.update_compositing_bits(id.idx, &mut self.layers);
                }
            }
        }
        self.flushing = was_flushing;
        count
    }

    /// Repaints every queued repaint boundary, deepest first.
    ///
    /// A boundary whose layer is not attached cannot be repainted in place;
    /// it stays dirty and is repainted when an ancestor composites it.
    ///
    /// Ends the frame: a new frame is requested if work is still pending.
    pub fn flush_paint(&mut self) -> u32 {
        let was_flushing = mem::replace(&mut self.flushing, true);
        let mut count = 0;
        while !self.nodes.queues.paint.is_empty() {
            let mut dirty = mem::take(&mut self.nodes.queues.paint);
            dirty.retain(|id| self.owns(*id));
            dirty.sort_by_key(|id| Reverse(self.nodes.depth[id.idx as usize]));
            for id in dirty {
                let i = id.idx as usize;
                if !self.owns(id) || !self.nodes.needs_paint[i] {
                    continue;
                }
                match self.nodes.layer[i] {
                    Some(layer) if self.layers.is_attached(layer) => {
                        repaint_composited_child(&mut self.nodes, &mut self.layers, id.idx);
                        count += 1;
                    }
                    _ => self.nodes.skip_paint(id.idx, &self.layers),
                }
            }
        }
        debug_assert!(
            self.nodes.queues.paint.is_empty(),
            "paint queue not empty after flush"
        );
        self.flushing = was_flushing;
        self.frame_requested = false;
        self.request_frame_if_needed();
        count
    }

    fn owns(&self, id: NodeId) -> bool {
        self.nodes.is_alive(id) && self.nodes.attached[id.idx as usize]
    }

    fn request_frame_if_needed(&mut self) {
        if self.flushing || self.frame_requested || !self.has_pending_work() {
            return;
        }
        self.frame_requested = true;
        if let Some(scheduler) = &mut self.scheduler {
            tracing::trace!("frame requested");
            scheduler.schedule_frame();
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    use kurbo::Size;

    use super::*;
    use crate::canvas::{Canvas, Color};
    use crate::error::NodeError;
    use crate::id::LayerId;
    use crate::node::{Dimension, MeasureMode, ShapeGeometry};
    use crate::scheduler::ManualFrameScheduler;

    const T0: HostTime = HostTime(0);

    fn fixed(w: f64, h: f64) -> Style {
        Style {
            width: Dimension::Points(w),
            height: Dimension::Points(h),
            ..Style::DEFAULT
        }
    }

    fn rect(p: &mut RenderPipeline, parent: NodeId, style: Style) -> NodeId {
        let n = p.create_node(NodeKind::shape(ShapeGeometry::Rect, Color::BLACK), style);
        p.append_child(parent, n);
        n
    }

    fn group(p: &mut RenderPipeline, parent: Option<NodeId>, style: Style) -> NodeId {
        let n = p.create_node(NodeKind::Group, style);
        if let Some(parent) = parent {
            p.append_child(parent, n);
        }
        n
    }

    fn viewport(p: &mut RenderPipeline) -> NodeId {
        p.set_root_constraints(BoxConstraints::tight(Size::new(200.0, 200.0)));
        let root = group(p, None, Style::DEFAULT);
        p.set_root(Some(root));
        root
    }

    fn child_layers(p: &RenderPipeline, layer: LayerId) -> Vec<LayerId> {
        p.layers().children(layer).collect()
    }

    fn picture_id(p: &RenderPipeline, layer: LayerId) -> Option<crate::id::PictureId> {
        match p.layers().kind(layer) {
            LayerKind::Picture(pic) => pic.picture.as_ref().map(|pic| pic.id()),
            _ => None,
        }
    }

    #[test]
    fn column_layout_with_padding_and_gap() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let col = group(
            &mut p,
            Some(root),
            Style {
                padding: 5.0,
                gap: 2.0,
                ..Style::DEFAULT
            },
        );
        let a = rect(&mut p, col, fixed(30.0, 10.0));
        let b = rect(&mut p, col, fixed(50.0, 20.0));
        p.flush(T0);

        let nodes = p.nodes();
        assert_eq!(nodes.size(root), Size::new(200.0, 200.0));
        assert_eq!(nodes.offset(a), Vec2::new(5.0, 5.0));
        assert_eq!(nodes.offset(b), Vec2::new(5.0, 17.0));
        assert_eq!(nodes.size(col), Size::new(60.0, 42.0));
    }

    #[test]
    fn absolute_children_do_not_take_flow_space() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let row = group(
            &mut p,
            Some(root),
            Style {
                axis: crate::node::Axis::Row,
                ..Style::DEFAULT
            },
        );
        let a = rect(&mut p, row, fixed(10.0, 10.0));
        let floating = rect(
            &mut p,
            row,
            Style {
                position: crate::node::Position::Absolute {
                    left: 40.0,
                    top: 3.0,
                },
                ..fixed(80.0, 80.0)
            },
        );
        let b = rect(&mut p, row, fixed(10.0, 10.0));
        p.flush(T0);
        assert_eq!(p.nodes().offset(a), Vec2::new(0.0, 0.0));
        assert_eq!(p.nodes().offset(b), Vec2::new(10.0, 0.0));
        assert_eq!(p.nodes().offset(floating), Vec2::new(40.0, 3.0));
        assert_eq!(p.nodes().size(row), Size::new(20.0, 10.0));
    }

    #[test]
    fn second_flush_does_nothing() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let g = group(&mut p, Some(root), Style::DEFAULT);
        rect(&mut p, g, fixed(10.0, 10.0));
        rect(
            &mut p,
            root,
            Style {
                repaint_boundary: true,
                ..fixed(20.0, 20.0)
            },
        );

        let first = p.flush(T0);
        assert!(first.layout > 0);
        assert!(first.paint > 0);
        assert!(!p.has_pending_work());
        assert!(p.flush(T0).is_empty());
        for id in p.nodes().children(root) {
            assert!(!p.nodes().needs_layout(id));
            assert!(!p.nodes().needs_paint(id));
            assert!(!p.nodes().needs_compositing_bits_update(id));
        }
    }

    #[test]
    fn every_attached_node_has_a_boundary() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let sized = group(&mut p, Some(root), fixed(100.0, 100.0));
        let inner = group(&mut p, Some(sized), Style::DEFAULT);
        let leaf = rect(&mut p, inner, Style::DEFAULT);
        let loose = group(&mut p, Some(root), Style::DEFAULT);
        p.flush(T0);

        let n = p.nodes();
        assert_eq!(n.relayout_boundary(root), Some(root));
        // Tight constraints make the parent independent of the child's size.
        assert_eq!(n.relayout_boundary(sized), Some(sized));
        assert_eq!(n.relayout_boundary(inner), Some(sized));
        assert_eq!(n.relayout_boundary(leaf), Some(sized));
        assert_eq!(n.relayout_boundary(loose), Some(root));
    }

    #[test]
    fn layout_marks_climb_to_the_boundary_only() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let boundary = group(&mut p, Some(root), fixed(100.0, 100.0));
        let mid = group(&mut p, Some(boundary), Style::DEFAULT);
        let leaf = rect(&mut p, mid, Style::DEFAULT);
        let sibling = rect(&mut p, mid, Style::DEFAULT);
        let cousin = rect(&mut p, root, fixed(5.0, 5.0));
        p.flush(T0);

        p.mark_needs_layout(leaf);
        let n = p.nodes();
        assert!(n.needs_layout(leaf));
        assert!(n.needs_layout(mid));
        assert!(n.needs_layout(boundary));
        assert!(!n.needs_layout(root));
        assert!(!n.needs_layout(sibling));
        assert!(!n.needs_layout(cousin));
        assert_eq!(p.nodes().queues.layout, vec![boundary]);

        assert_eq!(p.flush_layout(), 1);
        assert!(!p.nodes().needs_layout(leaf));
    }

    #[test]
    fn losing_a_boundary_reassigns_descendants() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let outer = group(&mut p, Some(root), fixed(100.0, 100.0));
        let inner = group(&mut p, Some(outer), Style::DEFAULT);
        let leaf = rect(&mut p, inner, Style::DEFAULT);
        p.flush(T0);
        assert_eq!(p.nodes().relayout_boundary(leaf), Some(outer));

        p.update_style(outer, |s| {
            s.width = Dimension::Auto;
            s.height = Dimension::Auto;
        });
        p.flush(T0);
        let n = p.nodes();
        assert_eq!(n.relayout_boundary(outer), Some(root));
        assert_eq!(n.relayout_boundary(inner), Some(root));
        assert_eq!(n.relayout_boundary(leaf), Some(root));
    }

    #[test]
    fn removed_subtree_forgets_inherited_boundary() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let g = group(&mut p, Some(root), Style::DEFAULT);
        let leaf = rect(&mut p, g, Style::DEFAULT);
        p.flush(T0);
        assert_eq!(p.nodes().relayout_boundary(leaf), Some(root));

        p.remove_child(g);
        assert_eq!(p.nodes().relayout_boundary(g), None);
        assert_eq!(p.nodes().relayout_boundary(leaf), None);
        assert!(!p.nodes().is_attached(leaf));

        p.append_child(root, g);
        p.flush(T0);
        assert_eq!(p.nodes().relayout_boundary(leaf), Some(root));
    }

    #[test]
    fn stale_queue_entries_are_skipped() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let boundary = rect(
            &mut p,
            root,
            Style {
                repaint_boundary: true,
                ..fixed(10.0, 10.0)
            },
        );
        let doomed = rect(
            &mut p,
            root,
            Style {
                repaint_boundary: true,
                ..fixed(10.0, 10.0)
            },
        );
        p.flush(T0);

        p.mark_needs_paint(boundary);
        p.mark_needs_paint(doomed);
        p.request_enter_frame(doomed, |_, _, _| panic!("detached node ran"));
        p.remove_child(doomed);
        p.destroy_node(doomed);

        let stats = p.flush(T0);
        assert_eq!(stats.enter_frame, 0);
        // The root repaints because a child was removed; the surviving
        // boundary is repainted on its own first.
        assert_eq!(stats.paint, 2);
        assert!(!p.has_pending_work());
    }

    #[test]
    fn clean_boundary_layer_is_reused() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        rect(&mut p, root, fixed(10.0, 10.0));
        let boundary = group(
            &mut p,
            Some(root),
            Style {
                repaint_boundary: true,
                ..fixed(50.0, 50.0)
            },
        );
        let inside = rect(&mut p, boundary, fixed(10.0, 10.0));
        p.flush(T0);

        let root_layer = p.nodes().layer(root).unwrap();
        let boundary_layer = p.nodes().layer(boundary).unwrap();
        let children = child_layers(&p, root_layer);
        assert_eq!(children.len(), 2);
        assert_eq!(children[1], boundary_layer);
        let root_picture = picture_id(&p, children[0]);
        let boundary_picture = picture_id(&p, child_layers(&p, boundary_layer)[0]);

        // Repainting the boundary leaves the root's recording alone.
        p.update_style(inside, |s| s.background = Some(Color::WHITE));
        assert_eq!(p.flush(T0).paint, 1);
        assert_eq!(picture_id(&p, child_layers(&p, root_layer)[0]), root_picture);
        assert_ne!(
            picture_id(&p, child_layers(&p, boundary_layer)[0]),
            boundary_picture
        );

        // Repainting the root re-appends the same boundary layer unpainted.
        p.mark_needs_paint(root);
        assert_eq!(p.flush(T0).paint, 1);
        assert_eq!(p.nodes().layer(boundary), Some(boundary_layer));
        assert_eq!(child_layers(&p, root_layer)[1], boundary_layer);
    }

    #[test]
    fn recordings_split_around_composited_children() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        rect(&mut p, root, fixed(10.0, 10.0));
        rect(
            &mut p,
            root,
            Style {
                repaint_boundary: true,
                ..fixed(10.0, 10.0)
            },
        );
        rect(&mut p, root, fixed(10.0, 10.0));
        p.flush(T0);

        let root_layer = p.nodes().layer(root).unwrap();
        let kinds: Vec<&str> = p
            .layers()
            .children(root_layer)
            .map(|l| p.layers().kind(l).name())
            .collect();
        assert_eq!(kinds, vec!["Picture", "Offset", "Picture"]);
    }

    #[test]
    fn clip_over_composited_child_becomes_a_layer() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let clipped = group(
            &mut p,
            Some(root),
            Style {
                clip: true,
                ..fixed(40.0, 40.0)
            },
        );
        let plain = group(
            &mut p,
            Some(root),
            Style {
                clip: true,
                ..fixed(40.0, 40.0)
            },
        );
        rect(
            &mut p,
            clipped,
            Style {
                repaint_boundary: true,
                ..fixed(10.0, 10.0)
            },
        );
        rect(&mut p, plain, fixed(10.0, 10.0));
        p.flush(T0);

        assert!(p.nodes().needs_compositing(clipped));
        assert!(!p.nodes().needs_compositing(plain));
        let root_layer = p.nodes().layer(root).unwrap();
        let kinds: Vec<&str> = p
            .layers()
            .children(root_layer)
            .map(|l| p.layers().kind(l).name())
            .collect();
        assert_eq!(kinds, vec!["ClipRect", "Picture"]);
    }

    #[test]
    fn toggling_boundary_moves_paint_ownership() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let g = group(&mut p, Some(root), Style::DEFAULT);
        let leaf = rect(&mut p, g, fixed(10.0, 10.0));
        p.flush(T0);
        assert!(p.nodes().layer(leaf).is_none());

        p.update_style(leaf, |s| s.repaint_boundary = true);
        p.flush(T0);
        assert!(p.nodes().is_boundary(leaf));
        assert!(p.nodes().needs_compositing(g));
        let layer = p.nodes().layer(leaf).unwrap();
        assert!(p.layers().is_attached(layer));

        p.update_style(leaf, |s| s.repaint_boundary = false);
        p.flush(T0);
        assert!(p.nodes().layer(leaf).is_none());
        assert!(!p.layers().is_alive(layer));
        assert!(!p.nodes().needs_compositing(g));
        assert!(!p.has_pending_work());
    }

    #[test]
    fn skipped_paint_marks_boundaries_with_detached_layers() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let outer = group(
            &mut p,
            Some(root),
            Style {
                repaint_boundary: true,
                ..fixed(100.0, 100.0)
            },
        );
        let middle = group(&mut p, Some(outer), Style::DEFAULT);
        let inner = rect(
            &mut p,
            middle,
            Style {
                repaint_boundary: true,
                ..fixed(10.0, 10.0)
            },
        );
        p.flush(T0);

        // Detach the inner layer behind the pipeline's back: the ancestor
        // boundary's layer is still attached, so only the inner node stays
        // dirty and nothing above it is marked.
        let inner_layer = p.nodes().layer(inner).unwrap();
        p.layers_mut().remove_from_parent(inner_layer);
        p.mark_needs_paint(inner);
        assert_eq!(p.flush_paint(), 0);
        assert!(p.nodes().needs_paint(inner));
        assert!(!p.nodes().needs_paint(outer));
        assert!(!p.nodes().needs_paint(middle));

        // Once the outer layer is detached too, the walk marks it and stops
        // at the root, whose layer is attached.
        let outer_layer = p.nodes().layer(outer).unwrap();
        p.layers_mut().remove_from_parent(outer_layer);
        p.nodes.needs_paint[inner.idx as usize] = false;
        p.mark_needs_paint(inner);
        assert_eq!(p.flush_paint(), 0);
        assert!(p.nodes().needs_paint(outer));
        assert!(!p.nodes().needs_paint(root));

        // Repainting the root re-attaches both.
        p.mark_needs_paint(root);
        p.flush(T0);
        assert!(p.layers().is_attached(outer_layer));
        assert!(p.layers().is_attached(inner_layer));
        assert!(!p.nodes().needs_paint(inner));
    }

    #[test]
    fn skipped_paint_stops_at_unpainted_boundary() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let hidden = group(
            &mut p,
            Some(root),
            Style {
                visible: false,
                repaint_boundary: true,
                ..fixed(50.0, 50.0)
            },
        );
        let inner = rect(
            &mut p,
            hidden,
            Style {
                repaint_boundary: true,
                ..fixed(10.0, 10.0)
            },
        );
        p.flush(T0);
        // The hidden boundary painted nothing, so the inner boundary never
        // got a layer.
        assert!(p.nodes().layer(hidden).is_some());
        assert!(p.nodes().layer(inner).is_none());
        assert!(p.nodes().needs_paint(inner));

        p.update_style(hidden, |s| s.visible = true);
        p.flush(T0);
        let layer = p.nodes().layer(inner).unwrap();
        assert!(p.layers().is_attached(layer));
        assert!(!p.nodes().needs_paint(inner));
    }

    /// Painted boundaries reachable through visible ancestors.
    fn assert_boundaries_painted(p: &RenderPipeline, nodes: &[NodeId], step: usize) {
        for &id in nodes {
            if !p.nodes().is_attached(id) || !p.nodes().is_boundary(id) {
                continue;
            }
            let mut shown = true;
            let mut up = p.nodes().parent(id);
            while let Some(a) = up {
                shown &= p.nodes().style(a).visible;
                up = p.nodes().parent(a);
            }
            if !shown {
                continue;
            }
            assert!(!p.nodes().needs_paint(id), "step {step}: {id:?} left dirty");
            let layer = p.nodes().layer(id);
            assert!(
                layer.is_some_and(|l| p.layers().is_attached(l)),
                "step {step}: {id:?} has no attached layer"
            );
        }
    }

    #[test]
    fn random_mutations_leave_no_boundary_unpainted() {
        for seed in 1..=8_u64 {
            let mut p = RenderPipeline::new();
            let root = viewport(&mut p);
            let mut nodes = vec![root];
            let mut groups = vec![root];
            for i in 0..4 {
                let parent = groups[i / 2];
                let g = group(&mut p, Some(parent), Style::DEFAULT);
                nodes.push(g);
                groups.push(g);
            }
            for i in 0..6 {
                nodes.push(rect(&mut p, groups[1 + i % 4], fixed(10.0, 10.0)));
            }
            p.flush(T0);

            let mut state = seed;
            let mut next = |n: usize| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                usize::try_from(state % n as u64).unwrap()
            };
            for step in 0..200 {
                let id = nodes[1 + next(nodes.len() - 1)];
                let attached = p.nodes().is_attached(id);
                match next(6) {
                    0 if attached => {
                        p.update_style(id, |s| s.repaint_boundary = !s.repaint_boundary);
                    }
                    1 if attached => {
                        p.update_style(id, |s| s.visible = !s.visible);
                    }
                    2 if attached => p.mark_needs_paint(id),
                    3 => {
                        let target = groups[next(groups.len())];
                        if p.nodes().is_ancestor_or_self(id.idx, target.idx) {
                            continue;
                        }
                        if p.nodes().parent(id).is_some() {
                            p.remove_child(id);
                        }
                        p.append_child(target, id);
                    }
                    4 if p.nodes().parent(id).is_some() => p.remove_child(id),
                    _ => {
                        p.flush(T0);
                        assert_boundaries_painted(&p, &nodes, step);
                    }
                }
            }
            p.flush(T0);
            assert_boundaries_painted(&p, &nodes, usize::MAX);
            assert!(!p.has_pending_work(), "seed {seed}: work left after flush");
        }
    }

    #[test]
    fn observers_fire_on_real_changes_only() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = p.observe_style(
            root,
            StyleField::Padding,
            Box::new(move |_, field, style| sink.borrow_mut().push((field, style.padding))),
        );

        p.update_style(root, |s| s.padding = 4.0);
        p.update_style(root, |s| s.padding = 4.0);
        p.update_style(root, |s| s.gap = 1.0);
        assert_eq!(*seen.borrow(), vec![(StyleField::Padding, 4.0)]);

        assert!(p.unobserve_style(root, id));
        p.update_style(root, |s| s.padding = 8.0);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn frame_requested_once_per_flush() {
        let scheduler = ManualFrameScheduler::new();
        let mut p = RenderPipeline::with_scheduler(Box::new(scheduler.clone()));
        let root = viewport(&mut p);
        rect(&mut p, root, fixed(5.0, 5.0));
        assert_eq!(scheduler.request_count(), 1);

        p.flush(T0);
        assert!(!p.is_frame_requested());
        p.update_style(root, |s| s.background = Some(Color::WHITE));
        p.update_style(root, |s| s.padding = 2.0);
        assert_eq!(scheduler.request_count(), 2);
        assert!(p.is_frame_requested());
    }

    #[test]
    fn enter_frame_runs_shallowest_first_and_once() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let g = group(&mut p, Some(root), Style::DEFAULT);
        let leaf = rect(&mut p, g, Style::DEFAULT);
        let order = Rc::new(RefCell::new(Vec::new()));

        for id in [leaf, root, g] {
            let order = Rc::clone(&order);
            p.request_enter_frame(id, move |p, id, now| {
                order.borrow_mut().push((id, now));
                if id == leaf {
                    // Re-requests wait for the next frame.
                    let order = Rc::clone(&order);
                    p.request_enter_frame(id, move |_, id, now| order.borrow_mut().push((id, now)));
                }
            });
        }
        assert_eq!(p.flush(HostTime(5)).enter_frame, 3);
        assert_eq!(
            *order.borrow(),
            vec![(root, HostTime(5)), (g, HostTime(5)), (leaf, HostTime(5))]
        );
        assert!(p.has_pending_work());
        assert_eq!(p.flush(HostTime(9)).enter_frame, 1);
        assert_eq!(order.borrow().last(), Some(&(leaf, HostTime(9))));
    }

    #[test]
    fn failing_measure_falls_back_to_smallest() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let text = p.create_node(NodeKind::text("hello", 10.0, Color::BLACK), Style::DEFAULT);
        p.append_child(root, text);
        p.set_measure(
            text,
            Some(Box::new(
                |_: f64, _: MeasureMode, _: f64, _: MeasureMode| -> Result<Size, NodeError> {
                    Err(NodeError::Measure("no font".into()))
                },
            )),
        );
        let ok = p.create_node(NodeKind::text("hello", 10.0, Color::BLACK), Style::DEFAULT);
        p.append_child(root, ok);
        p.flush(T0);
        assert_eq!(p.nodes().size(text), Size::ZERO);
        assert_eq!(p.nodes().size(ok), Size::new(30.0, 10.0));
    }

    #[test]
    fn failing_custom_paint_keeps_the_rest_of_the_frame() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let custom = p.create_node(
            NodeKind::custom(move |canvas: &mut dyn Canvas, _| {
                counter.set(counter.get() + 1);
                canvas.save();
                canvas.save();
                Err(NodeError::Paint("boom".into()))
            }),
            fixed(10.0, 10.0),
        );
        p.append_child(root, custom);
        rect(&mut p, root, fixed(10.0, 10.0));
        p.flush(T0);

        assert_eq!(calls.get(), 1);
        let root_layer = p.nodes().layer(root).unwrap();
        let picture = match p.layers().kind(child_layers(&p, root_layer)[0]) {
            LayerKind::Picture(pic) => pic.picture.clone().unwrap(),
            other => panic!("unexpected {other:?}"),
        };
        // Unbalanced saves were unwound and the following sibling recorded.
        let saves = picture
            .ops()
            .iter()
            .filter(|op| matches!(op, crate::picture::DrawOp::Save))
            .count();
        let restores = picture
            .ops()
            .iter()
            .filter(|op| matches!(op, crate::picture::DrawOp::Restore))
            .count();
        assert_eq!(saves, restores);
        assert_eq!(picture.draw_op_count(), 1);
    }

    #[test]
    #[should_panic(expected = "appending node would create a cycle")]
    fn cycles_are_rejected() {
        let mut p = RenderPipeline::new();
        let a = group(&mut p, None, Style::DEFAULT);
        let b = group(&mut p, Some(a), Style::DEFAULT);
        p.append_child(b, a);
    }

    #[test]
    #[should_panic(expected = "only group nodes can have children")]
    fn leaves_cannot_adopt() {
        let mut p = RenderPipeline::new();
        let root = viewport(&mut p);
        let leaf = rect(&mut p, root, Style::DEFAULT);
        let other = group(&mut p, None, Style::DEFAULT);
        p.append_child(leaf, other);
    }
}
