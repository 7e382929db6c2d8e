// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded drawing commands.
//!
//! A [`Picture`] is an immutable, replayable list of [`DrawOp`]s produced by
//! a [`PictureRecorder`]. Pictures are shared between the layer tree and the
//! raster caches through `Arc`, and are identified by a process-unique
//! [`PictureId`].

mod recorder;

pub use recorder::PictureRecorder;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use kurbo::{Affine, BezPath, Circle, Point, Rect, RoundedRect};

use crate::canvas::{Canvas, Color, Image, Paint};
use crate::id::PictureId;

static NEXT_PICTURE_ID: AtomicU64 = AtomicU64::new(1);

/// A single recorded command.
#[derive(Clone, Debug)]
pub enum DrawOp {
    /// [`Canvas::save`].
    Save,
    /// [`Canvas::restore`].
    Restore,
    /// [`Canvas::transform`].
    Transform(Affine),
    /// [`Canvas::reset_transform`], relative to the playback origin.
    ResetTransform,
    /// [`Canvas::clear`]. Clears the whole playback target.
    Clear(Color),
    /// [`Canvas::clip_rect`].
    ClipRect(Rect),
    /// [`Canvas::clip_rrect`].
    ClipRRect(RoundedRect),
    /// [`Canvas::clip_circle`].
    ClipCircle(Circle),
    /// [`Canvas::draw_rect`].
    Rect(Rect, Paint),
    /// [`Canvas::draw_rrect`].
    RRect(RoundedRect, Paint),
    /// [`Canvas::draw_circle`].
    Circle(Circle, Paint),
    /// [`Canvas::draw_path`].
    Path(BezPath, Paint),
    /// [`Canvas::draw_image_rect`].
    Image {
        /// Source image.
        image: Image,
        /// Region of the image to draw.
        src: Rect,
        /// Destination rectangle.
        dst: Rect,
    },
    /// [`Canvas::draw_text`].
    Text {
        /// The string to draw.
        text: String,
        /// Baseline start.
        origin: Point,
        /// Font size in local units.
        font_size: f64,
        /// Text color.
        paint: Paint,
    },
    /// [`Canvas::draw_picture`].
    Picture(Arc<Picture>),
}

impl DrawOp {
    /// Whether this op puts pixels on the target, as opposed to changing
    /// state.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        !matches!(
            self,
            Self::Save
                | Self::Restore
                | Self::Transform(_)
                | Self::ResetTransform
                | Self::ClipRect(_)
                | Self::ClipRRect(_)
                | Self::ClipCircle(_)
        )
    }
}

/// An immutable recording of drawing commands.
pub struct Picture {
    id: PictureId,
    ops: Vec<DrawOp>,
    cull_rect: Rect,
    has_text: bool,
    draw_op_count: usize,
}

impl Picture {
    pub(crate) fn new(ops: Vec<DrawOp>, cull_rect: Rect, has_text: bool) -> Self {
        let draw_op_count = ops
            .iter()
            .map(|op| match op {
                DrawOp::Picture(nested) => nested.draw_op_count,
                op => usize::from(op.is_draw()),
            })
            .sum();
        Self {
            id: PictureId(NEXT_PICTURE_ID.fetch_add(1, Ordering::Relaxed)),
            ops,
            cull_rect,
            has_text,
            draw_op_count,
        }
    }

    /// Process-unique identity.
    #[must_use]
    pub const fn id(&self) -> PictureId {
        self.id
    }

    /// The recorded commands.
    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Conservative bounds of everything the picture draws, in its own
    /// coordinate space.
    #[must_use]
    pub const fn cull_rect(&self) -> Rect {
        self.cull_rect
    }

    /// Whether the picture, or any picture nested in it, draws text.
    #[must_use]
    pub const fn has_text(&self) -> bool {
        self.has_text
    }

    /// Number of pixel-producing commands, counting nested pictures by
    /// their contents.
    #[must_use]
    pub const fn draw_op_count(&self) -> usize {
        self.draw_op_count
    }

    /// Replays the recording onto `canvas`, relative to its current
    /// transform.
    ///
    /// The canvas save depth is the same before and after.
    pub fn playback<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let base = canvas.total_matrix();
        let depth = canvas.save_count();
        canvas.save();
        for op in &self.ops {
            match op {
                DrawOp::Save => canvas.save(),
                DrawOp::Restore => {
                    if canvas.save_count() > depth + 1 {
                        canvas.restore();
                    }
                }
                DrawOp::Transform(affine) => canvas.transform(*affine),
                DrawOp::ResetTransform => {
                    canvas.reset_transform();
                    canvas.transform(base);
                }
                DrawOp::Clear(color) => canvas.clear(*color),
                DrawOp::ClipRect(rect) => canvas.clip_rect(*rect),
                DrawOp::ClipRRect(rrect) => canvas.clip_rrect(*rrect),
                DrawOp::ClipCircle(circle) => canvas.clip_circle(*circle),
                DrawOp::Rect(rect, paint) => canvas.draw_rect(*rect, paint),
                DrawOp::RRect(rrect, paint) => canvas.draw_rrect(*rrect, paint),
                DrawOp::Circle(circle, paint) => canvas.draw_circle(*circle, paint),
                DrawOp::Path(path, paint) => canvas.draw_path(path, paint),
                DrawOp::Image { image, src, dst } => canvas.draw_image_rect(image, *src, *dst),
                DrawOp::Text {
                    text,
                    origin,
                    font_size,
                    paint,
                } => canvas.draw_text(text, *origin, *font_size, paint),
                DrawOp::Picture(nested) => canvas.draw_picture(nested),
            }
        }
        while canvas.save_count() > depth {
            canvas.restore();
        }
    }
}

impl fmt::Debug for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Picture")
            .field("id", &self.id)
            .field("ops", &self.ops.len())
            .field("cull_rect", &self.cull_rect)
            .field("has_text", &self.has_text)
            .finish_non_exhaustive()
    }
}
