// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Size, Vec2};

use super::kind::NodeKind;
use super::layout::{BoxConstraints, Measure};
use super::style::{StyleObservers, Style};
use crate::id::{INVALID, LayerId, NodeId, Slot, Slots};

/// Nodes waiting for a pipeline phase.
///
/// Entries are plain handles; a node may appear more than once and stale or
/// detached entries are skipped when the queue is flushed.
#[derive(Debug, Default)]
pub(crate) struct DirtyQueues {
    pub(crate) layout: Vec<NodeId>,
    pub(crate) compositing: Vec<NodeId>,
    pub(crate) paint: Vec<NodeId>,
}

impl DirtyQueues {
    pub(crate) fn is_empty(&self) -> bool {
        self.layout.is_empty() && self.compositing.is_empty() && self.paint.is_empty()
    }
}

/// Struct-of-arrays storage for the retained node tree.
///
/// Nodes are addressed by [`NodeId`] handles. Each node occupies a slot in
/// parallel arrays; destroyed nodes are recycled through a free list and
/// generation counters reject stale handles.
///
/// The tree only exposes read access publicly. Structural edits and style
/// changes go through [`RenderPipeline`](crate::pipeline::RenderPipeline),
/// which keeps the dirty flags and queues consistent.
pub struct NodeTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) depth: Vec<u32>,

    // -- Lifecycle --
    pub(crate) attached: Vec<bool>,
    pub(crate) needs_layout: Vec<bool>,
    pub(crate) needs_paint: Vec<bool>,
    pub(crate) needs_compositing_bits_update: Vec<bool>,

    // -- Layout --
    /// `INVALID` while undefined.
    pub(crate) relayout_boundary: Vec<u32>,
    pub(crate) constraints: Vec<Option<BoxConstraints>>,
    pub(crate) parent_uses_size: Vec<bool>,
    pub(crate) size: Vec<Size>,
    pub(crate) offset: Vec<Vec2>,

    // -- Compositing --
    pub(crate) needs_compositing: Vec<bool>,
    pub(crate) was_repaint_boundary: Vec<bool>,
    pub(crate) layer: Vec<Option<LayerId>>,

    // -- Content --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) style: Vec<Style>,
    pub(crate) measure: Vec<Option<Box<dyn Measure>>>,
    pub(crate) observers: Vec<StyleObservers>,

    pub(crate) queues: DirtyQueues,
    slots: Slots,
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("len", &self.len())
            .field("capacity", &self.slots.capacity())
            .field("queues", &self.queues)
            .finish_non_exhaustive()
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            depth: Vec::new(),
            attached: Vec::new(),
            needs_layout: Vec::new(),
            needs_paint: Vec::new(),
            needs_compositing_bits_update: Vec::new(),
            relayout_boundary: Vec::new(),
            constraints: Vec::new(),
            parent_uses_size: Vec::new(),
            size: Vec::new(),
            offset: Vec::new(),
            needs_compositing: Vec::new(),
            was_repaint_boundary: Vec::new(),
            layer: Vec::new(),
            kind: Vec::new(),
            style: Vec::new(),
            measure: Vec::new(),
            observers: Vec::new(),
            queues: DirtyQueues::default(),
            slots: Slots::default(),
        }
    }

    // -- Allocation --

    pub(crate) fn create(&mut self, kind: NodeKind, style: Style) -> NodeId {
        let boundary = style.repaint_boundary;
        let idx = match self.slots.allocate() {
            Slot::Reused(idx, _) => {
                let i = idx as usize;
                self.parent[i] = INVALID;
                self.first_child[i] = INVALID;
                self.last_child[i] = INVALID;
                self.next_sibling[i] = INVALID;
                self.prev_sibling[i] = INVALID;
                self.depth[i] = 0;
                self.attached[i] = false;
                self.needs_layout[i] = true;
                self.needs_paint[i] = true;
                self.needs_compositing_bits_update[i] = false;
                self.relayout_boundary[i] = INVALID;
                self.constraints[i] = None;
                self.parent_uses_size[i] = false;
                self.size[i] = Size::ZERO;
                self.offset[i] = Vec2::ZERO;
                self.needs_compositing[i] = boundary;
                self.was_repaint_boundary[i] = boundary;
                self.layer[i] = None;
                self.kind[i] = kind;
                self.style[i] = style;
                self.measure[i] = None;
                self.observers[i] = StyleObservers::default();
                idx
            }
            Slot::Fresh(idx) => {
                self.parent.push(INVALID);
                self.first_child.push(INVALID);
                self.last_child.push(INVALID);
                self.next_sibling.push(INVALID);
                self.prev_sibling.push(INVALID);
                self.depth.push(0);
                self.attached.push(false);
                self.needs_layout.push(true);
                self.needs_paint.push(true);
                self.needs_compositing_bits_update.push(false);
                self.relayout_boundary.push(INVALID);
                self.constraints.push(None);
                self.parent_uses_size.push(false);
                self.size.push(Size::ZERO);
                self.offset.push(Vec2::ZERO);
                self.needs_compositing.push(boundary);
                self.was_repaint_boundary.push(boundary);
                self.layer.push(None);
                self.kind.push(kind);
                self.style.push(style);
                self.measure.push(None);
                self.observers.push(StyleObservers::default());
                idx
            }
        };
        self.handle(idx)
    }

    /// Frees a detached, childless node's slot.
    pub(crate) fn free(&mut self, idx: u32) {
        let i = idx as usize;
        debug_assert!(self.layer[i].is_none(), "freeing a node that owns a layer");
        self.kind[i] = NodeKind::Group;
        self.measure[i] = None;
        self.observers[i].clear();
        self.attached[i] = false;
        self.slots.free(idx);
    }

    /// Returns whether the handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slots.is_alive(id.idx, id.generation)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.live_count()
    }

    /// Whether the tree holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Topology --

    pub(crate) fn link_before(&mut self, p: u32, c: u32, before: u32) {
        self.parent[c as usize] = p;
        if before == INVALID {
            let last = self.last_child[p as usize];
            self.prev_sibling[c as usize] = last;
            self.next_sibling[c as usize] = INVALID;
            if last == INVALID {
                self.first_child[p as usize] = c;
            } else {
                self.next_sibling[last as usize] = c;
            }
            self.last_child[p as usize] = c;
        } else {
            let prev = self.prev_sibling[before as usize];
            self.prev_sibling[c as usize] = prev;
            self.next_sibling[c as usize] = before;
            self.prev_sibling[before as usize] = c;
            if prev == INVALID {
                self.first_child[p as usize] = c;
            } else {
                self.next_sibling[prev as usize] = c;
            }
        }
        self.redepth(c, self.depth[p as usize] + 1);
    }

    pub(crate) fn unlink(&mut self, c: u32) {
        let p = self.parent[c as usize];
        let prev = self.prev_sibling[c as usize];
        let next = self.next_sibling[c as usize];
        if prev == INVALID {
            self.first_child[p as usize] = next;
        } else {
            self.next_sibling[prev as usize] = next;
        }
        if next == INVALID {
            self.last_child[p as usize] = prev;
        } else {
            self.prev_sibling[next as usize] = prev;
        }
        self.parent[c as usize] = INVALID;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;
        self.redepth(c, 0);
    }

    fn redepth(&mut self, idx: u32, depth: u32) {
        if self.depth[idx as usize] == depth && depth != 0 {
            return;
        }
        self.depth[idx as usize] = depth;
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.redepth(child, depth + 1);
            child = self.next_sibling[child as usize];
        }
    }

    /// Whether `ancestor` is `idx` or one of its ancestors.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: u32, idx: u32) -> bool {
        let mut cur = idx;
        while cur != INVALID {
            if cur == ancestor {
                return true;
            }
            cur = self.parent[cur as usize];
        }
        false
    }

    /// Collects `idx` and its descendants in pre-order.
    pub(crate) fn subtree(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![idx];
        while let Some(n) = stack.pop() {
            out.push(n);
            let mut child = self.last_child[n as usize];
            while child != INVALID {
                stack.push(child);
                child = self.prev_sibling[child as usize];
            }
        }
        out
    }

    // -- Queries --

    /// Whether the node paints into a layer of its own.
    ///
    /// The attached root always does.
    #[must_use]
    pub(crate) fn is_repaint_boundary(&self, idx: u32) -> bool {
        let i = idx as usize;
        self.style[i].repaint_boundary || (self.parent[i] == INVALID && self.attached[i])
    }

    /// The parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.handle(p))
    }

    /// The direct children of a node, in paint order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.validate(id);
        let mut out = Vec::new();
        let mut child = self.first_child[id.idx as usize];
        while child != INVALID {
            out.push(self.handle(child));
            child = self.next_sibling[child as usize];
        }
        out
    }

    /// Distance from the root of the node's tree.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.depth[id.idx as usize]
    }

    /// Whether the node belongs to the pipeline's attached tree.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.validate(id);
        self.attached[id.idx as usize]
    }

    /// Whether the node's layout is stale.
    #[must_use]
    pub fn needs_layout(&self, id: NodeId) -> bool {
        self.validate(id);
        self.needs_layout[id.idx as usize]
    }

    /// Whether the node's recording is stale.
    #[must_use]
    pub fn needs_paint(&self, id: NodeId) -> bool {
        self.validate(id);
        self.needs_paint[id.idx as usize]
    }

    /// Whether the node's compositing flag must be recomputed.
    #[must_use]
    pub fn needs_compositing_bits_update(&self, id: NodeId) -> bool {
        self.validate(id);
        self.needs_compositing_bits_update[id.idx as usize]
    }

    /// Whether the node or a descendant introduces a layer.
    #[must_use]
    pub fn needs_compositing(&self, id: NodeId) -> bool {
        self.validate(id);
        self.needs_compositing[id.idx as usize]
    }

    /// Whether the node currently acts as a repaint boundary.
    #[must_use]
    pub fn is_boundary(&self, id: NodeId) -> bool {
        self.validate(id);
        self.is_repaint_boundary(id.idx)
    }

    /// The nearest ancestor-or-self whose layout does not affect its
    /// parent, if known.
    #[must_use]
    pub fn relayout_boundary(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let b = self.relayout_boundary[id.idx as usize];
        (b != INVALID).then(|| self.handle(b))
    }

    /// The constraints the node was last laid out with.
    #[must_use]
    pub fn constraints(&self, id: NodeId) -> Option<BoxConstraints> {
        self.validate(id);
        self.constraints[id.idx as usize]
    }

    /// The layer owned by a repaint boundary, once painted.
    #[must_use]
    pub fn layer(&self, id: NodeId) -> Option<LayerId> {
        self.validate(id);
        self.layer[id.idx as usize]
    }

    /// The size computed by the last layout.
    #[must_use]
    pub fn size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.size[id.idx as usize]
    }

    /// The offset from the parent's origin computed by the last layout.
    #[must_use]
    pub fn offset(&self, id: NodeId) -> Vec2 {
        self.validate(id);
        self.offset[id.idx as usize]
    }

    /// The node's style.
    #[must_use]
    pub fn style(&self, id: NodeId) -> &Style {
        self.validate(id);
        &self.style[id.idx as usize]
    }

    /// What the node draws.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        self.validate(id);
        &self.kind[id.idx as usize]
    }

    // -- Internal helpers --

    pub(crate) fn handle(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.slots.generation(idx),
        }
    }

    /// Panics if the handle is stale.
    #[inline]
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(self.is_alive(id), "stale NodeId {id:?}");
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn group(tree: &mut NodeTree) -> u32 {
        tree.create(NodeKind::Group, Style::DEFAULT).idx
    }

    #[test]
    fn link_before_orders_and_depths() {
        let mut tree = NodeTree::new();
        let root = group(&mut tree);
        let a = group(&mut tree);
        let b = group(&mut tree);
        let c = group(&mut tree);
        tree.link_before(root, a, INVALID);
        tree.link_before(root, c, INVALID);
        tree.link_before(root, b, c);
        let root_id = tree.handle(root);
        let kids: Vec<u32> = tree.children(root_id).iter().map(|n| n.idx).collect();
        assert_eq!(kids, vec![a, b, c]);
        assert_eq!(tree.depth[b as usize], 1);

        let d = group(&mut tree);
        tree.link_before(b, d, INVALID);
        assert_eq!(tree.depth[d as usize], 2);
        assert_eq!(tree.subtree(root), vec![root, a, b, d, c]);

        tree.unlink(b);
        assert_eq!(tree.depth[b as usize], 0);
        assert_eq!(tree.depth[d as usize], 1);
        assert!(tree.is_ancestor_or_self(b, d));
        assert!(!tree.is_ancestor_or_self(root, d));
    }

    #[test]
    fn freed_slots_reject_old_handles() {
        let mut tree = NodeTree::new();
        let a = tree.create(NodeKind::Group, Style::DEFAULT);
        tree.free(a.idx);
        assert!(!tree.is_alive(a));
        let b = tree.create(NodeKind::Group, Style::DEFAULT);
        assert_eq!(a.idx, b.idx);
        assert_ne!(a.generation, b.generation);
        assert!(tree.needs_layout(b));
    }
}
