// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty marking, attach and detach, and the compositing-bits pass.

use super::tree::NodeTree;
use crate::id::INVALID;
use crate::layer::LayerTree;

impl NodeTree {
    /// Marks a node's layout stale.
    ///
    /// The request climbs to the nearest relayout boundary, marking every
    /// node on the way. Only the boundary is queued. Nodes whose boundary is
    /// not known yet forward the request to their parent.
    pub(crate) fn mark_needs_layout(&mut self, idx: u32) {
        let mut idx = idx;
        loop {
            let i = idx as usize;
            if self.needs_layout[i] {
                return;
            }
            self.needs_layout[i] = true;
            let parent = self.parent[i];
            if self.relayout_boundary[i] == idx || parent == INVALID {
                if self.attached[i] {
                    self.queues.layout.push(self.handle(idx));
                }
                return;
            }
            idx = parent;
        }
    }

    /// Marks a node's recording stale.
    ///
    /// A repaint boundary that already owns a layer is queued; any other
    /// node forwards the request to its parent.
    pub(crate) fn mark_needs_paint(&mut self, idx: u32) {
        let mut idx = idx;
        loop {
            let i = idx as usize;
            if self.needs_paint[i] {
                return;
            }
            self.needs_paint[i] = true;
            let parent = self.parent[i];
            let owns_layer = self.is_repaint_boundary(idx) && self.layer[i].is_some();
            if owns_layer || parent == INVALID {
                if self.attached[i] {
                    self.queues.paint.push(self.handle(idx));
                }
                return;
            }
            idx = parent;
        }
    }

    /// Marks a node's compositing flag stale.
    ///
    /// When neither the node nor its parent is a settled repaint boundary
    /// the request moves to the parent, whose update will revisit this
    /// node.
    pub(crate) fn mark_needs_compositing_bits_update(&mut self, idx: u32) {
        let mut idx = idx;
        loop {
            let i = idx as usize;
            if self.needs_compositing_bits_update[i] {
                return;
            }
            self.needs_compositing_bits_update[i] = true;
            let parent = self.parent[i];
            if parent != INVALID {
                if self.needs_compositing_bits_update[parent as usize] {
                    return;
                }
                let settled = self.was_repaint_boundary[i] && self.is_repaint_boundary(idx);
                if !settled && !self.is_repaint_boundary(parent) {
                    idx = parent;
                    continue;
                }
            }
            if self.attached[i] {
                self.queues.compositing.push(self.handle(idx));
            }
            return;
        }
    }

    /// Records that a queued boundary could not repaint because its layer
    /// is not attached.
    ///
    /// Walks the ancestors and re-marks each repaint boundary whose layer is
    /// also detached, stopping at the first boundary that has no layer yet
    /// or whose layer is attached. That boundary's next paint reaches the
    /// skipped node.
    pub(crate) fn skip_paint(&mut self, idx: u32, layers: &LayerTree) {
        let mut node = self.parent[idx as usize];
        while node != INVALID {
            let n = node as usize;
            if self.is_repaint_boundary(node) {
                match self.layer[n] {
                    None => break,
                    Some(layer) if layers.is_attached(layer) => break,
                    Some(_) => self.needs_paint[n] = true,
                }
            }
            node = self.parent[n];
        }
    }

    /// Marks a subtree attached and re-queues whatever it left dirty.
    pub(crate) fn attach_subtree(&mut self, idx: u32) {
        for n in self.subtree(idx) {
            let i = n as usize;
            self.attached[i] = true;
            if self.needs_layout[i] && self.relayout_boundary[i] != INVALID {
                self.needs_layout[i] = false;
                self.mark_needs_layout(n);
            }
            if self.needs_compositing_bits_update[i] {
                self.needs_compositing_bits_update[i] = false;
                self.mark_needs_compositing_bits_update(n);
            }
            if self.needs_paint[i] && self.layer[i].is_some() {
                self.needs_paint[i] = false;
                self.mark_needs_paint(n);
            }
        }
    }

    /// Marks a subtree detached and releases the layers it owns.
    pub(crate) fn detach_subtree(&mut self, idx: u32, layers: &mut LayerTree) {
        for n in self.subtree(idx) {
            let i = n as usize;
            self.attached[i] = false;
            if let Some(layer) = self.layer[i].take() {
                release_layer(layers, layer);
                self.needs_paint[i] = true;
            }
        }
    }

    /// Recomputes `needs_compositing` for a node and its dirty descendants.
    ///
    /// A node whose repaint-boundary status changed loses its old layer and
    /// has its paint redone by whoever now owns its drawing.
    pub(crate) fn update_compositing_bits(&mut self, idx: u32, layers: &mut LayerTree) -> u32 {
        let i = idx as usize;
        if !self.needs_compositing_bits_update[i] {
            return 0;
        }
        let mut visited = 1;
        let old = self.needs_compositing[i];
        let mut needs = false;
        let mut child = self.first_child[i];
        while child != INVALID {
            visited += self.update_compositing_bits(child, layers);
            needs |= self.needs_compositing[child as usize];
            child = self.next_sibling[child as usize];
        }
        let is_boundary = self.is_repaint_boundary(idx);
        needs |= is_boundary;
        self.needs_compositing[i] = needs;
        self.needs_compositing_bits_update[i] = false;

        let was_boundary = self.was_repaint_boundary[i];
        if was_boundary != is_boundary {
            self.was_repaint_boundary[i] = is_boundary;
            if let Some(layer) = self.layer[i].take() {
                release_layer(layers, layer);
            }
            self.needs_paint[i] = false;
            self.mark_needs_paint(idx);
            let parent = self.parent[i];
            if parent != INVALID {
                self.mark_needs_paint(parent);
            }
        } else if old != needs {
            self.mark_needs_paint(idx);
        }
        visited
    }
}

/// Detaches a boundary's layer and destroys it together with everything
/// below it that is not owned by another boundary.
pub(crate) fn release_layer(layers: &mut LayerTree, layer: crate::id::LayerId) {
    if !layers.is_alive(layer) {
        return;
    }
    if layers.parent(layer).is_some() {
        layers.remove_from_parent(layer);
    }
    if layers.root() == Some(layer) {
        layers.set_root(None);
    }
    layers.remove_all_children(layer);
    layers.destroy_layer(layer);
}
