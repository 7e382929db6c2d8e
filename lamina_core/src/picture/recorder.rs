// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::{Affine, BezPath, Circle, Point, Rect, RoundedRect, Shape};

use super::{DrawOp, Picture};
use crate::canvas::{Canvas, Color, Image, Paint, text_bounds};
use crate::geometry::union_opt;

/// A [`Canvas`] that records commands into a [`Picture`].
///
/// The recorder tracks the union of everything drawn and the union of every
/// clip applied, both in recording space. [`finish`](Self::finish) turns
/// them into the picture's cull rect, unless one was supplied up front with
/// [`with_cull_rect`](Self::with_cull_rect).
#[derive(Debug, Default)]
pub struct PictureRecorder {
    ops: Vec<DrawOp>,
    cull_rect: Option<Rect>,
    matrix: Affine,
    stack: Vec<Affine>,
    draw_bounds: Option<Rect>,
    clip_bounds: Option<Rect>,
    has_text: bool,
}

impl PictureRecorder {
    /// Starts an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an empty recording whose picture uses `cull_rect` instead of
    /// the computed bounds.
    #[must_use]
    pub fn with_cull_rect(cull_rect: Rect) -> Self {
        Self {
            cull_rect: Some(cull_rect),
            ..Self::default()
        }
    }

    /// Number of commands recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Ends the recording.
    ///
    /// A supplied cull rect is used as is. Otherwise the cull rect is the
    /// drawn area intersected with the clipped area when both exist, the
    /// drawn area when nothing was clipped, and empty when nothing was
    /// drawn.
    #[must_use]
    pub fn finish(self) -> Picture {
        if let Some(cull_rect) = self.cull_rect {
            return Picture::new(self.ops, cull_rect, self.has_text);
        }
        let cull_rect = match (self.draw_bounds, self.clip_bounds) {
            (Some(draw), Some(clip)) => {
                let cull = draw.intersect(clip);
                if cull.is_zero_area() { Rect::ZERO } else { cull }
            }
            (Some(draw), None) => draw,
            (None, _) => Rect::ZERO,
        };
        Picture::new(self.ops, cull_rect, self.has_text)
    }

    fn record_draw(&mut self, op: DrawOp, local_bounds: Rect) {
        let bounds = self.matrix.transform_rect_bbox(local_bounds);
        self.draw_bounds = union_opt(self.draw_bounds, bounds);
        self.ops.push(op);
    }

    fn record_clip(&mut self, op: DrawOp, local_bounds: Rect) {
        let bounds = self.matrix.transform_rect_bbox(local_bounds);
        self.clip_bounds = union_opt(self.clip_bounds, bounds);
        self.ops.push(op);
    }
}

impl Canvas for PictureRecorder {
    fn save(&mut self) {
        self.stack.push(self.matrix);
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        if let Some(matrix) = self.stack.pop() {
            self.matrix = matrix;
            self.ops.push(DrawOp::Restore);
        }
    }

    fn save_count(&self) -> usize {
        self.stack.len()
    }

    fn transform(&mut self, affine: Affine) {
        self.matrix *= affine;
        self.ops.push(DrawOp::Transform(affine));
    }

    fn reset_transform(&mut self) {
        self.matrix = Affine::IDENTITY;
        self.ops.push(DrawOp::ResetTransform);
    }

    fn total_matrix(&self) -> Affine {
        self.matrix
    }

    fn clear(&mut self, color: Color) {
        self.ops.push(DrawOp::Clear(color));
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.record_clip(DrawOp::ClipRect(rect), rect);
    }

    fn clip_rrect(&mut self, rrect: RoundedRect) {
        self.record_clip(DrawOp::ClipRRect(rrect), rrect.rect());
    }

    fn clip_circle(&mut self, circle: Circle) {
        self.record_clip(DrawOp::ClipCircle(circle), circle.bounding_box());
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.record_draw(DrawOp::Rect(rect, *paint), paint.inflate(rect));
    }

    fn draw_rrect(&mut self, rrect: RoundedRect, paint: &Paint) {
        self.record_draw(DrawOp::RRect(rrect, *paint), paint.inflate(rrect.rect()));
    }

    fn draw_circle(&mut self, circle: Circle, paint: &Paint) {
        self.record_draw(
            DrawOp::Circle(circle, *paint),
            paint.inflate(circle.bounding_box()),
        );
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        let bounds = paint.inflate(path.bounding_box());
        self.record_draw(DrawOp::Path(path.clone(), *paint), bounds);
    }

    fn draw_image_rect(&mut self, image: &Image, src: Rect, dst: Rect) {
        self.record_draw(
            DrawOp::Image {
                image: image.clone(),
                src,
                dst,
            },
            dst,
        );
    }

    fn draw_text(&mut self, text: &str, origin: Point, font_size: f64, paint: &Paint) {
        self.has_text = true;
        self.record_draw(
            DrawOp::Text {
                text: text.to_string(),
                origin,
                font_size,
                paint: *paint,
            },
            text_bounds(text, origin, font_size),
        );
    }

    fn draw_picture(&mut self, picture: &Arc<Picture>) {
        self.has_text |= picture.has_text();
        let cull = picture.cull_rect();
        if cull.is_zero_area() {
            self.ops.push(DrawOp::Picture(Arc::clone(picture)));
        } else {
            self.record_draw(DrawOp::Picture(Arc::clone(picture)), cull);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cull_rect_is_union_of_draws() {
        let mut rec = PictureRecorder::new();
        rec.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        rec.draw_rect(Rect::new(20.0, 20.0, 30.0, 30.0), &Paint::default());
        rec.draw_rect(Rect::new(40.0, 5.0, 50.0, 15.0), &Paint::default());
        let pic = rec.finish();
        assert_eq!(pic.cull_rect(), Rect::new(0.0, 0.0, 50.0, 30.0));
        assert_eq!(pic.draw_op_count(), 3);
        assert!(!pic.has_text());
    }

    #[test]
    fn supplied_cull_rect_wins() {
        let cull = Rect::new(2.0, 2.0, 8.0, 8.0);
        let mut rec = PictureRecorder::with_cull_rect(cull);
        rec.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        rec.draw_rect(Rect::new(20.0, 20.0, 30.0, 30.0), &Paint::default());
        rec.clip_rect(Rect::new(0.0, 0.0, 25.0, 25.0));
        let pic = rec.finish();
        assert_eq!(pic.cull_rect(), cull);
        assert_eq!(pic.draw_op_count(), 2);

        let empty = PictureRecorder::with_cull_rect(cull).finish();
        assert_eq!(empty.cull_rect(), cull, "kept even when nothing is drawn");
    }

    #[test]
    fn cull_rect_is_clipped() {
        let mut rec = PictureRecorder::new();
        rec.save();
        rec.clip_rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        rec.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        rec.restore();
        assert_eq!(rec.finish().cull_rect(), Rect::new(0.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn disjoint_clip_culls_everything() {
        let mut rec = PictureRecorder::new();
        rec.clip_rect(Rect::new(100.0, 100.0, 110.0, 110.0));
        rec.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        assert!(rec.finish().cull_rect().is_zero_area());
    }

    #[test]
    fn empty_recording_has_empty_cull() {
        let pic = PictureRecorder::new().finish();
        assert_eq!(pic.cull_rect(), Rect::ZERO);
        assert_eq!(pic.draw_op_count(), 0);
    }

    #[test]
    fn transforms_apply_to_bounds() {
        let mut rec = PictureRecorder::new();
        rec.translate(10.0, 5.0);
        rec.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        assert_eq!(rec.finish().cull_rect(), Rect::new(10.0, 5.0, 20.0, 15.0));
    }

    #[test]
    fn text_marks_picture() {
        let mut rec = PictureRecorder::new();
        rec.draw_text("hi", Point::new(0.0, 10.0), 10.0, &Paint::default());
        let inner = Arc::new(rec.finish());
        assert!(inner.has_text());

        let mut outer = PictureRecorder::new();
        outer.draw_picture(&inner);
        let outer = outer.finish();
        assert!(outer.has_text(), "text propagates through nesting");
        assert_eq!(outer.draw_op_count(), 1);
    }

    #[test]
    fn playback_reproduces_ops_and_balances_saves() {
        let mut rec = PictureRecorder::new();
        rec.save();
        rec.translate(3.0, 4.0);
        rec.draw_circle(Circle::new((0.0, 0.0), 2.0), &Paint::default());
        // Unbalanced save: playback must still restore it.
        rec.save();
        let pic = rec.finish();

        let mut target = PictureRecorder::new();
        target.translate(100.0, 0.0);
        pic.playback(&mut target);
        assert_eq!(target.save_count(), 0);
        assert_eq!(target.total_matrix(), Affine::translate((100.0, 0.0)));
        let replay = target.finish();
        assert_eq!(replay.cull_rect(), Rect::new(101.0, 2.0, 105.0, 6.0));
    }

    #[test]
    fn ids_are_unique() {
        let a = PictureRecorder::new().finish();
        let b = PictureRecorder::new().finish();
        assert_ne!(a.id(), b.id());
    }
}
