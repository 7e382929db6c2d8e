// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording node paint into layers.

use alloc::sync::Arc;

use kurbo::{Affine, Circle, Rect, RoundedRect, Size, Vec2};

use crate::canvas::Canvas;
use crate::id::LayerId;
use crate::layer::{LayerKind, LayerTree, PictureHints, PictureLayer};
use crate::node::NodeTree;
use crate::node::paint::paint_node;
use crate::picture::PictureRecorder;

/// Where a paint pass records.
///
/// A context appends layers to one container layer. Drawing goes through
/// [`canvas`](Self::canvas), which lazily opens a picture layer at the end
/// of the container and records into it until the next layer is appended.
/// Each recording is therefore a contiguous run of drawing between layers,
/// and the container's children stay in paint order.
#[derive(Debug)]
pub struct PaintingContext<'a> {
    layers: &'a mut LayerTree,
    container: LayerId,
    current: Option<(LayerId, PictureRecorder)>,
    hints: PictureHints,
}

impl<'a> PaintingContext<'a> {
    /// Creates a context that appends to `container`.
    pub fn new(layers: &'a mut LayerTree, container: LayerId) -> Self {
        Self {
            layers,
            container,
            current: None,
            hints: PictureHints::default(),
        }
    }

    /// The container this context appends to.
    #[must_use]
    pub fn container(&self) -> LayerId {
        self.container
    }

    /// The canvas for the current recording, starting one if needed.
    pub fn canvas(&mut self) -> &mut PictureRecorder {
        let layers = &mut *self.layers;
        let container = self.container;
        let (_, recorder) = self.current.get_or_insert_with(|| {
            let layer = layers.create_layer(LayerKind::Picture(PictureLayer::default()));
            layers.append_child(container, layer);
            (layer, PictureRecorder::new())
        });
        recorder
    }

    /// Finishes the current recording, if any, into its picture layer.
    pub fn stop_recording_if_needed(&mut self) {
        let Some((layer, recorder)) = self.current.take() else {
            return;
        };
        let picture = Arc::new(recorder.finish());
        if let LayerKind::Picture(slot) = self.layers.kind_mut(layer) {
            slot.picture = Some(picture);
            slot.hints = self.hints;
        }
        self.hints = PictureHints::default();
    }

    /// Hints that the current recording will change soon.
    pub fn set_will_change_hint(&mut self) {
        self.hints.will_change = true;
    }

    /// Hints that the current recording is expensive to draw.
    pub fn set_is_complex_hint(&mut self) {
        self.hints.is_complex = true;
    }

    /// Appends an existing layer after everything recorded so far.
    ///
    /// A layer that still hangs under an old parent is moved.
    pub fn append_layer(&mut self, layer: LayerId) {
        self.stop_recording_if_needed();
        if self.layers.parent(layer).is_some() {
            self.layers.remove_from_parent(layer);
        }
        self.layers.append_child(self.container, layer);
    }

    /// Appends `layer` and runs `painter` with a context that records into
    /// it.
    pub fn push_layer(
        &mut self,
        layer: LayerId,
        offset: Vec2,
        painter: impl FnOnce(&mut PaintingContext<'_>, Vec2),
    ) {
        self.append_layer(layer);
        let mut child = PaintingContext::new(&mut *self.layers, layer);
        painter(&mut child, offset);
        child.stop_recording_if_needed();
    }

    /// Clips `painter`'s drawing to `clip`, given relative to `offset`.
    ///
    /// Uses a clip layer when the subtree composites and a canvas clip
    /// otherwise.
    pub fn push_clip_rect(
        &mut self,
        needs_compositing: bool,
        offset: Vec2,
        clip: Rect,
        painter: impl FnOnce(&mut PaintingContext<'_>, Vec2),
    ) {
        let clip = clip + offset;
        if needs_compositing {
            let layer = self.layers.create_layer(LayerKind::ClipRect(clip));
            self.push_layer(layer, offset, painter);
        } else {
            let canvas = self.canvas();
            canvas.save();
            canvas.clip_rect(clip);
            painter(self, offset);
            self.canvas().restore();
        }
    }

    /// Clips `painter`'s drawing to a rounded rectangle.
    pub fn push_clip_rrect(
        &mut self,
        needs_compositing: bool,
        offset: Vec2,
        clip: RoundedRect,
        painter: impl FnOnce(&mut PaintingContext<'_>, Vec2),
    ) {
        let clip = RoundedRect::from_rect(clip.rect() + offset, clip.radii());
        if needs_compositing {
            let layer = self.layers.create_layer(LayerKind::ClipRRect(clip));
            self.push_layer(layer, offset, painter);
        } else {
            let canvas = self.canvas();
            canvas.save();
            canvas.clip_rrect(clip);
            painter(self, offset);
            self.canvas().restore();
        }
    }

    /// Clips `painter`'s drawing to a circle.
    pub fn push_clip_circle(
        &mut self,
        needs_compositing: bool,
        offset: Vec2,
        clip: Circle,
        painter: impl FnOnce(&mut PaintingContext<'_>, Vec2),
    ) {
        let clip = Circle::new(clip.center + offset, clip.radius);
        if needs_compositing {
            let layer = self.layers.create_layer(LayerKind::ClipCircle(clip));
            self.push_layer(layer, offset, painter);
        } else {
            let canvas = self.canvas();
            canvas.save();
            canvas.clip_circle(clip);
            painter(self, offset);
            self.canvas().restore();
        }
    }

    /// Transforms `painter`'s drawing about `offset`.
    pub fn push_transform(
        &mut self,
        needs_compositing: bool,
        offset: Vec2,
        transform: Affine,
        painter: impl FnOnce(&mut PaintingContext<'_>, Vec2),
    ) {
        let effective = Affine::translate(offset) * transform * Affine::translate(-offset);
        if needs_compositing {
            let layer = self.layers.create_layer(LayerKind::Transform(effective));
            self.push_layer(layer, offset, painter);
        } else {
            let canvas = self.canvas();
            canvas.save();
            canvas.transform(effective);
            painter(self, offset);
            self.canvas().restore();
        }
    }

    /// Paints a child node at `offset`.
    ///
    /// Repaint boundaries are composited: their retained layer is repainted
    /// only if stale, then moved to `offset` and appended. Other children
    /// draw into the current recording.
    pub(crate) fn paint_child(&mut self, nodes: &mut NodeTree, child: u32, offset: Vec2) {
        if nodes.is_repaint_boundary(child) {
            self.stop_recording_if_needed();
            self.composite_child(nodes, child, offset);
        } else {
            paint_node(nodes, child, self, offset);
        }
    }

    fn composite_child(&mut self, nodes: &mut NodeTree, child: u32, offset: Vec2) {
        let c = child as usize;
        let stale = match nodes.layer[c] {
            Some(layer) => nodes.needs_paint[c] || !self.layers.is_alive(layer),
            None => true,
        };
        if stale {
            repaint_composited_child(nodes, self.layers, child);
        }
        if let Some(layer) = nodes.layer[c] {
            self.layers.set_offset(layer, offset);
            self.append_layer(layer);
        }
    }
}

/// Repaints a repaint boundary into its own offset layer.
///
/// The layer is reused when it exists; its old content is dropped first.
/// Retained layers of nested boundaries are only detached, and are
/// re-appended when the boundary's paint reaches them.
pub(crate) fn repaint_composited_child(nodes: &mut NodeTree, layers: &mut LayerTree, idx: u32) {
    let i = idx as usize;
    debug_assert!(
        nodes.is_repaint_boundary(idx),
        "only repaint boundaries own layers"
    );
    let layer = match nodes.layer[i] {
        Some(layer) if layers.is_alive(layer) => {
            layers.remove_all_children(layer);
            layer
        }
        _ => {
            let layer = layers.create_layer(LayerKind::Offset(Vec2::ZERO));
            layers.set_retained(layer, true);
            nodes.layer[i] = Some(layer);
            layer
        }
    };
    nodes.was_repaint_boundary[i] = true;
    let mut ctx = PaintingContext::new(layers, layer);
    paint_node(nodes, idx, &mut ctx, Vec2::ZERO);
    ctx.stop_recording_if_needed();
}

/// Bounds of a node in its own coordinate space.
pub(crate) fn local_bounds(size: Size) -> Rect {
    Rect::from_origin_size((0.0, 0.0), size)
}
