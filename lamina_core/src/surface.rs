// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render-target capability.
//!
//! A [`Surface`] is a pixel buffer a backend can draw into and read back.
//! The rasterizer draws frames into one; raster caches draw pictures into
//! offscreen ones obtained from a [`SurfaceProvider`].

use alloc::boxed::Box;

use crate::canvas::{Canvas, Image};
use crate::error::SurfaceError;
use crate::id::SurfaceId;

/// Pixel dimensions of a surface.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// Creates a size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An integer pixel rectangle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts to a floating-point rectangle.
    #[must_use]
    pub fn to_rect(self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }
}

/// A drawable, readable pixel target.
///
/// The frame protocol is: [`acquire_frame`](Self::acquire_frame), draw
/// through [`canvas`](Self::canvas), then [`submit`](Self::submit).
/// Acquiring resets the canvas transform and clip but keeps pixel contents
/// when the size is unchanged.
pub trait Surface {
    /// Stable identity of this surface.
    fn id(&self) -> SurfaceId;

    /// Current pixel dimensions.
    fn size(&self) -> SurfaceSize;

    /// Prepares the surface for a frame of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidSize`] for empty or oversized
    /// requests, or a backend error.
    fn acquire_frame(&mut self, size: SurfaceSize) -> Result<(), SurfaceError>;

    /// The canvas drawing into this surface.
    fn canvas(&mut self) -> &mut dyn Canvas;

    /// Presents the frame.
    ///
    /// # Errors
    ///
    /// Returns a backend error if presentation fails.
    fn submit(&mut self) -> Result<(), SurfaceError>;

    /// Snapshots the surface, or a region of it, into an immutable image.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::OutOfBounds`] if `region` is not inside the
    /// surface.
    fn to_image(&mut self, region: Option<PixelRect>) -> Result<Image, SurfaceError>;
}

/// A factory for offscreen surfaces.
pub trait SurfaceProvider {
    /// Creates an offscreen surface of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidSize`] or a backend error.
    fn create_surface(&mut self, size: SurfaceSize) -> Result<Box<dyn Surface>, SurfaceError>;
}
