// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Preroll and paint passes over the layer tree.

use kurbo::{Affine, Rect, Shape};

use super::cache::PictureCache;
use super::kind::LayerKind;
use super::tree::LayerTree;
use crate::canvas::{Canvas, Color, Paint};
use crate::debug::{DebugFlags, debug_flags};
use crate::geometry::{intersect_or_zero, union_opt};
use crate::id::INVALID;

const LAYER_BOUNDS_COLOR: Color = Color::rgba8(255, 128, 0, 192);

impl LayerTree {
    /// Computes paint bounds bottom-up and registers every picture with
    /// `cache` under the matrix it will be drawn with.
    ///
    /// `matrix` is the transform from the root layer's space to the target
    /// device space.
    pub fn preroll(&mut self, cache: &mut dyn PictureCache, matrix: Affine) {
        if let Some(root) = self.root() {
            self.preroll_layer(root.idx, cache, matrix);
        }
    }

    fn preroll_children(&mut self, idx: u32, cache: &mut dyn PictureCache, matrix: Affine) -> Rect {
        let mut bounds = None;
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            bounds = union_opt(bounds, self.preroll_layer(child, cache, matrix));
            child = self.next_sibling[child as usize];
        }
        bounds.unwrap_or(Rect::ZERO)
    }

    fn preroll_layer(&mut self, idx: u32, cache: &mut dyn PictureCache, matrix: Affine) -> Rect {
        let bounds = match &self.kind[idx as usize] {
            LayerKind::Container => self.preroll_children(idx, cache, matrix),
            LayerKind::Offset(offset) => {
                let offset = *offset;
                let child = self.preroll_children(idx, cache, matrix * Affine::translate(offset));
                if child.is_zero_area() {
                    Rect::ZERO
                } else {
                    child + offset
                }
            }
            LayerKind::Transform(transform) => {
                let transform = *transform;
                let child = self.preroll_children(idx, cache, matrix * transform);
                if child.is_zero_area() {
                    Rect::ZERO
                } else {
                    transform.transform_rect_bbox(child)
                }
            }
            LayerKind::ClipRect(clip) => {
                let clip = *clip;
                intersect_or_zero(self.preroll_children(idx, cache, matrix), clip)
            }
            LayerKind::ClipRRect(clip) => {
                let clip = clip.rect();
                intersect_or_zero(self.preroll_children(idx, cache, matrix), clip)
            }
            LayerKind::ClipCircle(clip) => {
                let clip = clip.bounding_box();
                intersect_or_zero(self.preroll_children(idx, cache, matrix), clip)
            }
            LayerKind::Picture(layer) => match &layer.picture {
                Some(picture) => {
                    let cull = picture.cull_rect();
                    if cull.is_zero_area() {
                        Rect::ZERO
                    } else {
                        cache.prepare(
                            picture,
                            matrix * Affine::translate(layer.offset),
                            layer.hints,
                        );
                        cull + layer.offset
                    }
                }
                None => Rect::ZERO,
            },
        };
        self.paint_bounds[idx as usize] = bounds;
        bounds
    }

    /// Draws the tree top-down onto `canvas`, substituting cached images
    /// where `cache` has them.
    ///
    /// Layers whose last preroll found nothing to draw are skipped along
    /// with their subtrees.
    pub fn paint(&self, canvas: &mut dyn Canvas, cache: &mut dyn PictureCache) {
        let Some(root) = self.root() else {
            return;
        };
        let show_bounds = debug_flags().contains(DebugFlags::LAYER_BOUNDS);
        self.paint_layer(root.idx, canvas, cache, show_bounds);
    }

    fn paint_children(
        &self,
        idx: u32,
        canvas: &mut dyn Canvas,
        cache: &mut dyn PictureCache,
        show_bounds: bool,
    ) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.paint_layer(child, canvas, cache, show_bounds);
            child = self.next_sibling[child as usize];
        }
    }

    fn paint_layer(
        &self,
        idx: u32,
        canvas: &mut dyn Canvas,
        cache: &mut dyn PictureCache,
        show_bounds: bool,
    ) {
        let bounds = self.paint_bounds[idx as usize];
        if bounds.is_zero_area() {
            return;
        }
        match &self.kind[idx as usize] {
            LayerKind::Container => self.paint_children(idx, canvas, cache, show_bounds),
            LayerKind::Offset(offset) => {
                canvas.save();
                canvas.translate(offset.x, offset.y);
                self.paint_children(idx, canvas, cache, show_bounds);
                canvas.restore();
            }
            LayerKind::Transform(transform) => {
                canvas.save();
                canvas.transform(*transform);
                self.paint_children(idx, canvas, cache, show_bounds);
                canvas.restore();
            }
            LayerKind::ClipRect(clip) => {
                canvas.save();
                canvas.clip_rect(*clip);
                self.paint_children(idx, canvas, cache, show_bounds);
                canvas.restore();
            }
            LayerKind::ClipRRect(clip) => {
                canvas.save();
                canvas.clip_rrect(*clip);
                self.paint_children(idx, canvas, cache, show_bounds);
                canvas.restore();
            }
            LayerKind::ClipCircle(clip) => {
                canvas.save();
                canvas.clip_circle(*clip);
                self.paint_children(idx, canvas, cache, show_bounds);
                canvas.restore();
            }
            LayerKind::Picture(layer) => {
                if let Some(picture) = &layer.picture {
                    canvas.save();
                    canvas.translate(layer.offset.x, layer.offset.y);
                    let matrix = canvas.total_matrix();
                    if !cache.draw_picture(canvas, picture, matrix) {
                        picture.playback(canvas);
                    }
                    canvas.restore();
                }
            }
        }
        if show_bounds {
            canvas.draw_rect(bounds, &Paint::stroke(LAYER_BOUNDS_COLOR, 1.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use kurbo::{Circle, Vec2};

    use super::*;
    use crate::id::LayerId;
    use crate::layer::{NoCache, PictureHints, PictureLayer};
    use crate::picture::{DrawOp, Picture, PictureRecorder};

    fn picture(rect: Rect) -> Arc<Picture> {
        let mut rec = PictureRecorder::new();
        rec.draw_rect(rect, &Paint::default());
        Arc::new(rec.finish())
    }

    fn picture_layer(tree: &mut LayerTree, pic: Arc<Picture>) -> LayerId {
        tree.create_layer(LayerKind::Picture(PictureLayer {
            picture: Some(pic),
            ..PictureLayer::default()
        }))
    }

    #[derive(Default)]
    struct PrepareLog(Vec<Affine>);

    impl PictureCache for PrepareLog {
        fn prepare(&mut self, _: &Arc<Picture>, matrix: Affine, _: PictureHints) -> bool {
            self.0.push(matrix);
            false
        }

        fn draw_picture(&mut self, _: &mut dyn Canvas, _: &Picture, _: Affine) -> bool {
            false
        }
    }

    #[test]
    fn offset_and_transform_bounds() {
        let mut tree = LayerTree::new();
        let root = tree.create_layer(LayerKind::Container);
        let offset = tree.create_layer(LayerKind::Offset(Vec2::new(10.0, 20.0)));
        let scale = tree.create_layer(LayerKind::Transform(Affine::scale(2.0)));
        let pic = picture_layer(&mut tree, picture(Rect::new(0.0, 0.0, 5.0, 5.0)));
        tree.set_root(Some(root));
        tree.append_child(root, offset);
        tree.append_child(offset, scale);
        tree.append_child(scale, pic);

        let mut log = PrepareLog::default();
        tree.preroll(&mut log, Affine::IDENTITY);
        assert_eq!(tree.paint_bounds(pic), Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(tree.paint_bounds(scale), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(tree.paint_bounds(offset), Rect::new(10.0, 20.0, 20.0, 30.0));
        assert_eq!(tree.paint_bounds(root), Rect::new(10.0, 20.0, 20.0, 30.0));
        assert_eq!(
            log.0,
            [Affine::translate((10.0, 20.0)) * Affine::scale(2.0)],
            "pictures are registered under the accumulated matrix"
        );
    }

    #[test]
    fn clip_shrinks_bounds_to_empty() {
        let mut tree = LayerTree::new();
        let root = tree.create_layer(LayerKind::Container);
        let clip = tree.create_layer(LayerKind::ClipRect(Rect::new(100.0, 100.0, 110.0, 110.0)));
        let circle = tree.create_layer(LayerKind::ClipCircle(Circle::new((2.0, 2.0), 2.0)));
        let a = picture_layer(&mut tree, picture(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let b = picture_layer(&mut tree, picture(Rect::new(0.0, 0.0, 10.0, 10.0)));
        tree.set_root(Some(root));
        tree.append_child(root, clip);
        tree.append_child(clip, a);
        tree.append_child(root, circle);
        tree.append_child(circle, b);

        tree.preroll(&mut NoCache, Affine::IDENTITY);
        assert!(!tree.needs_painting(clip));
        assert_eq!(tree.paint_bounds(circle), Rect::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(tree.paint_bounds(root), Rect::new(0.0, 0.0, 4.0, 4.0));
    }

    #[test]
    fn paint_skips_empty_subtrees() {
        let mut tree = LayerTree::new();
        let root = tree.create_layer(LayerKind::Container);
        let clip = tree.create_layer(LayerKind::ClipRect(Rect::new(100.0, 100.0, 110.0, 110.0)));
        let hidden = picture_layer(&mut tree, picture(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let shown = picture_layer(&mut tree, picture(Rect::new(0.0, 0.0, 10.0, 10.0)));
        tree.set_root(Some(root));
        tree.append_child(root, clip);
        tree.append_child(clip, hidden);
        tree.append_child(root, shown);
        tree.preroll(&mut NoCache, Affine::IDENTITY);

        let mut out = PictureRecorder::new();
        tree.paint(&mut out, &mut NoCache);
        let out = out.finish();
        let draws = out.ops().iter().filter(|op| op.is_draw()).count();
        assert_eq!(draws, 1, "only the visible picture is played back");
        assert!(!out.ops().iter().any(|op| matches!(op, DrawOp::ClipRect(_))));
    }

    #[test]
    fn cache_hit_replaces_playback() {
        struct AlwaysHit;
        impl PictureCache for AlwaysHit {
            fn prepare(&mut self, _: &Arc<Picture>, _: Affine, _: PictureHints) -> bool {
                true
            }
            fn draw_picture(&mut self, canvas: &mut dyn Canvas, _: &Picture, _: Affine) -> bool {
                canvas.draw_circle(Circle::new((0.0, 0.0), 1.0), &Paint::default());
                true
            }
        }

        let mut tree = LayerTree::new();
        let root = tree.create_layer(LayerKind::Container);
        let pic = picture_layer(&mut tree, picture(Rect::new(0.0, 0.0, 10.0, 10.0)));
        tree.set_root(Some(root));
        tree.append_child(root, pic);
        tree.preroll(&mut AlwaysHit, Affine::IDENTITY);

        let mut out = PictureRecorder::new();
        tree.paint(&mut out, &mut AlwaysHit);
        let out = out.finish();
        assert!(out.ops().iter().any(|op| matches!(op, DrawOp::Circle(..))));
        assert!(!out.ops().iter().any(|op| matches!(op, DrawOp::Rect(..))));
    }
}
