// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation and topology management.

use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

use super::kind::{LayerKind, PictureLayer};
use super::traverse::Children;
use crate::id::{INVALID, LayerId, Slot, Slots};
use crate::picture::Picture;

/// Struct-of-arrays storage for the composited layer tree.
///
/// Layers are addressed by [`LayerId`] handles. Each layer occupies a slot
/// in parallel arrays; destroyed layers are recycled through a free list and
/// generation counters reject stale handles.
///
/// Children form a doubly-linked list so appends and removals are O(1).
/// Layers marked *retained* belong to a repaint boundary in the node tree and
/// survive [`remove_all_children`](Self::remove_all_children) on their
/// parent; every other layer is rebuilt each time its container repaints.
#[derive(Debug)]
pub struct LayerTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Properties --
    pub(crate) kind: Vec<LayerKind>,
    pub(crate) retained: Vec<bool>,

    // -- Computed by preroll --
    pub(crate) paint_bounds: Vec<Rect>,

    slots: Slots,
    root: u32,
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTree {
    /// Creates an empty layer tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            retained: Vec::new(),
            paint_bounds: Vec::new(),
            slots: Slots::default(),
            root: INVALID,
        }
    }

    // -- Allocation --

    /// Creates a detached layer.
    pub fn create_layer(&mut self, kind: LayerKind) -> LayerId {
        let idx = match self.slots.allocate() {
            Slot::Reused(idx, _) => {
                let i = idx as usize;
                self.parent[i] = INVALID;
                self.first_child[i] = INVALID;
                self.last_child[i] = INVALID;
                self.next_sibling[i] = INVALID;
                self.prev_sibling[i] = INVALID;
                self.kind[i] = kind;
                self.retained[i] = false;
                self.paint_bounds[i] = Rect::ZERO;
                idx
            }
            Slot::Fresh(idx) => {
                self.parent.push(INVALID);
                self.first_child.push(INVALID);
                self.last_child.push(INVALID);
                self.next_sibling.push(INVALID);
                self.prev_sibling.push(INVALID);
                self.kind.push(kind);
                self.retained.push(false);
                self.paint_bounds.push(Rect::ZERO);
                idx
            }
        };
        self.handle(idx)
    }

    /// Destroys a childless layer, unlinking it from its parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has children.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );
        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }
        if self.root == idx {
            self.root = INVALID;
        }
        // Drop the picture reference now rather than when the slot is reused.
        self.kind[idx as usize] = LayerKind::Container;
        self.slots.free(idx);
    }

    /// Destroys a layer and every layer below it, retained or not.
    pub fn destroy_subtree(&mut self, id: LayerId) {
        self.validate(id);
        self.destroy_subtree_idx(id.idx);
    }

    fn destroy_subtree_idx(&mut self, idx: u32) {
        while self.first_child[idx as usize] != INVALID {
            let child = self.first_child[idx as usize];
            self.destroy_subtree_idx(child);
        }
        let id = self.handle(idx);
        self.destroy_layer(id);
    }

    /// Returns whether the handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        self.slots.is_alive(id.idx, id.generation)
    }

    /// Number of live layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.live_count()
    }

    /// Whether the tree holds no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Topology --

    /// Sets the layer that compositing starts from.
    ///
    /// # Panics
    ///
    /// Panics if the layer is stale or has a parent.
    pub fn set_root(&mut self, root: Option<LayerId>) {
        self.root = match root {
            Some(id) => {
                self.validate(id);
                assert!(
                    self.parent[id.idx as usize] == INVALID,
                    "root layer must not have a parent"
                );
                id.idx
            }
            None => INVALID,
        };
    }

    /// The root layer, if set.
    #[must_use]
    pub fn root(&self) -> Option<LayerId> {
        (self.root != INVALID).then(|| self.handle(self.root))
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, `parent` is a picture layer,
    /// `child` already has a parent, or the append would create a cycle.
    pub fn append_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.kind[p as usize].is_container(),
            "picture layers cannot have children"
        );
        assert!(
            self.parent[c as usize] == INVALID,
            "child layer already has a parent"
        );
        assert!(c != self.root, "the root layer cannot be adopted");
        let mut ancestor = p;
        while ancestor != INVALID {
            assert!(ancestor != c, "appending layer would create a cycle");
            ancestor = self.parent[ancestor as usize];
        }

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = INVALID;
        let last = self.last_child[p as usize];
        self.prev_sibling[c as usize] = last;
        if last == INVALID {
            self.first_child[p as usize] = c;
        } else {
            self.next_sibling[last as usize] = c;
        }
        self.last_child[p as usize] = c;
    }

    /// Detaches a layer from its parent, keeping it and its subtree alive.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] != INVALID,
            "layer has no parent"
        );
        self.unlink_from_parent(child.idx);
    }

    /// Removes every child of `id`.
    ///
    /// Retained children are only detached. Other children are destroyed
    /// after their own children have been removed the same way, so retained
    /// layers nested anywhere below survive.
    pub fn remove_all_children(&mut self, id: LayerId) {
        self.validate(id);
        self.remove_all_children_idx(id.idx);
    }

    fn remove_all_children_idx(&mut self, idx: u32) {
        while self.first_child[idx as usize] != INVALID {
            let child = self.first_child[idx as usize];
            self.unlink_from_parent(child);
            if !self.retained[child as usize] {
                self.remove_all_children_idx(child);
                let id = self.handle(child);
                self.destroy_layer(id);
            }
        }
    }

    fn unlink_from_parent(&mut self, c: u32) {
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
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.handle(p))
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Whether the layer is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: LayerId) -> bool {
        if !self.is_alive(id) || self.root == INVALID {
            return false;
        }
        let mut idx = id.idx;
        loop {
            if idx == self.root {
                return true;
            }
            idx = self.parent[idx as usize];
            if idx == INVALID {
                return false;
            }
        }
    }

    // -- Properties --

    /// Returns what a layer is.
    #[must_use]
    pub fn kind(&self, id: LayerId) -> &LayerKind {
        self.validate(id);
        &self.kind[id.idx as usize]
    }

    /// Returns a mutable reference to a layer's variant data.
    pub fn kind_mut(&mut self, id: LayerId) -> &mut LayerKind {
        self.validate(id);
        &mut self.kind[id.idx as usize]
    }

    /// Updates the translation of an offset layer.
    ///
    /// # Panics
    ///
    /// Panics if the layer is not an offset layer.
    pub fn set_offset(&mut self, id: LayerId, offset: Vec2) {
        match self.kind_mut(id) {
            LayerKind::Offset(v) => *v = offset,
            other => panic!("set_offset on a {} layer", other.name()),
        }
    }

    /// Stores a finished recording in a picture layer.
    ///
    /// # Panics
    ///
    /// Panics if the layer is not a picture layer.
    pub fn set_picture(&mut self, id: LayerId, picture: Arc<Picture>) {
        match self.kind_mut(id) {
            LayerKind::Picture(PictureLayer { picture: slot, .. }) => *slot = Some(picture),
            other => panic!("set_picture on a {} layer", other.name()),
        }
    }

    /// Marks a layer as owned by a repaint boundary.
    pub fn set_retained(&mut self, id: LayerId, retained: bool) {
        self.validate(id);
        self.retained[id.idx as usize] = retained;
    }

    /// Whether the layer is owned by a repaint boundary.
    #[must_use]
    pub fn is_retained(&self, id: LayerId) -> bool {
        self.validate(id);
        self.retained[id.idx as usize]
    }

    /// Bounds of everything the layer draws, in its parent's coordinate
    /// space, as computed by the last preroll.
    #[must_use]
    pub fn paint_bounds(&self, id: LayerId) -> Rect {
        self.validate(id);
        self.paint_bounds[id.idx as usize]
    }

    /// Whether the last preroll found anything to draw.
    #[must_use]
    pub fn needs_painting(&self, id: LayerId) -> bool {
        self.validate(id);
        !self.paint_bounds[id.idx as usize].is_zero_area()
    }

    // -- Internal helpers --

    pub(crate) fn handle(&self, idx: u32) -> LayerId {
        LayerId {
            idx,
            generation: self.slots.generation(idx),
        }
    }

    /// Panics if the handle is stale.
    #[inline]
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(self.is_alive(id), "stale LayerId {id:?}");
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn container(tree: &mut LayerTree) -> LayerId {
        tree.create_layer(LayerKind::Container)
    }

    #[test]
    fn append_preserves_order() {
        let mut tree = LayerTree::new();
        let root = container(&mut tree);
        let a = container(&mut tree);
        let b = container(&mut tree);
        let c = container(&mut tree);
        tree.append_child(root, a);
        tree.append_child(root, b);
        tree.append_child(root, c);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b, c]);

        tree.remove_from_parent(b);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, c]);
        tree.remove_from_parent(c);
        tree.append_child(root, b);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn cycles_are_rejected() {
        let mut tree = LayerTree::new();
        let a = container(&mut tree);
        let b = container(&mut tree);
        tree.append_child(a, b);
        tree.append_child(b, a);
    }

    #[test]
    #[should_panic(expected = "already has a parent")]
    fn double_adoption_is_rejected() {
        let mut tree = LayerTree::new();
        let a = container(&mut tree);
        let b = container(&mut tree);
        let c = container(&mut tree);
        tree.append_child(a, c);
        tree.append_child(b, c);
    }

    #[test]
    #[should_panic(expected = "picture layers cannot have children")]
    fn picture_layers_are_leaves() {
        let mut tree = LayerTree::new();
        let pic = tree.create_layer(LayerKind::Picture(PictureLayer::default()));
        let c = container(&mut tree);
        tree.append_child(pic, c);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn stale_handles_panic() {
        let mut tree = LayerTree::new();
        let a = container(&mut tree);
        tree.destroy_layer(a);
        let _ = tree.kind(a);
    }

    #[test]
    fn slots_are_reused_with_new_generation() {
        let mut tree = LayerTree::new();
        let a = container(&mut tree);
        tree.destroy_layer(a);
        let b = container(&mut tree);
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(!tree.is_alive(a));
        assert!(tree.is_alive(b));
    }

    #[test]
    fn remove_all_children_keeps_retained_layers() {
        let mut tree = LayerTree::new();
        let root = container(&mut tree);
        let clip = tree.create_layer(LayerKind::ClipRect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        let retained = tree.create_layer(LayerKind::Offset(Vec2::ZERO));
        let inner_pic = tree.create_layer(LayerKind::Picture(PictureLayer::default()));
        let pic = tree.create_layer(LayerKind::Picture(PictureLayer::default()));
        tree.set_retained(retained, true);
        tree.append_child(root, clip);
        tree.append_child(clip, retained);
        tree.append_child(retained, inner_pic);
        tree.append_child(root, pic);

        tree.remove_all_children(root);
        assert_eq!(tree.children(root).count(), 0);
        assert!(!tree.is_alive(clip));
        assert!(!tree.is_alive(pic));
        assert!(tree.is_alive(retained), "retained layer survives");
        assert!(tree.parent(retained).is_none());
        assert_eq!(
            tree.children(retained).collect::<Vec<_>>(),
            vec![inner_pic],
            "retained layer keeps its own content"
        );
    }

    #[test]
    fn attachment_follows_root() {
        let mut tree = LayerTree::new();
        let root = container(&mut tree);
        let a = container(&mut tree);
        let b = container(&mut tree);
        tree.append_child(root, a);
        tree.append_child(a, b);
        assert!(!tree.is_attached(b), "no root set yet");
        tree.set_root(Some(root));
        assert!(tree.is_attached(b));
        tree.remove_from_parent(a);
        assert!(!tree.is_attached(b));
    }

    #[test]
    fn destroy_subtree_frees_everything() {
        let mut tree = LayerTree::new();
        let root = container(&mut tree);
        let a = container(&mut tree);
        let b = tree.create_layer(LayerKind::Offset(Vec2::ZERO));
        tree.set_retained(b, true);
        tree.append_child(root, a);
        tree.append_child(a, b);
        tree.destroy_subtree(a);
        assert!(!tree.is_alive(a));
        assert!(!tree.is_alive(b));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.children(root).count(), 0);
    }
}
