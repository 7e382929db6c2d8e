// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Offscreen and output surfaces backed by tiny-skia pixmaps.

use std::sync::atomic::{AtomicU32, Ordering};

use lamina_core::canvas::{Canvas, Image};
use lamina_core::error::SurfaceError;
use lamina_core::id::SurfaceId;
use lamina_core::surface::{PixelRect, Surface, SurfaceProvider, SurfaceSize};
use tracing::trace;

use crate::canvas::SkiaCanvas;

/// Largest width or height a surface accepts.
pub const MAX_SIDE: u32 = 16_384;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

fn next_id() -> SurfaceId {
    SurfaceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

fn canvas_for(size: SurfaceSize) -> Result<SkiaCanvas, SurfaceError> {
    let invalid = SurfaceError::InvalidSize {
        width: size.width,
        height: size.height,
    };
    if size.is_empty() || size.width > MAX_SIDE || size.height > MAX_SIDE {
        return Err(invalid);
    }
    SkiaCanvas::new(size.width, size.height).ok_or(invalid)
}

/// A CPU surface.
///
/// Surface ids are unique across the process. Submitting only counts
/// frames; read the pixels back with [`Surface::to_image`] or
/// [`canvas`](Self::skia_canvas).
#[derive(Debug)]
pub struct SkiaSurface {
    id: SurfaceId,
    canvas: SkiaCanvas,
    submitted: u64,
}

impl SkiaSurface {
    /// Creates a transparent surface.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidSize`] if either side is zero or
    /// larger than [`MAX_SIDE`].
    pub fn new(size: SurfaceSize) -> Result<Self, SurfaceError> {
        Ok(Self {
            id: next_id(),
            canvas: canvas_for(size)?,
            submitted: 0,
        })
    }

    /// The concrete canvas.
    #[must_use]
    pub fn skia_canvas(&self) -> &SkiaCanvas {
        &self.canvas
    }

    /// Frames submitted so far.
    #[must_use]
    pub fn submitted_frames(&self) -> u64 {
        self.submitted
    }

    fn size_now(&self) -> SurfaceSize {
        SurfaceSize::new(self.canvas.width(), self.canvas.height())
    }
}

impl Surface for SkiaSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn size(&self) -> SurfaceSize {
        self.size_now()
    }

    fn acquire_frame(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        if size == self.size_now() {
            self.canvas.reset_state();
        } else {
            trace!(id = self.id.0, size.width, size.height, "resizing surface");
            self.canvas = canvas_for(size)?;
        }
        Ok(())
    }

    fn canvas(&mut self) -> &mut dyn Canvas {
        &mut self.canvas
    }

    fn submit(&mut self) -> Result<(), SurfaceError> {
        self.submitted += 1;
        Ok(())
    }

    fn to_image(&mut self, region: Option<PixelRect>) -> Result<Image, SurfaceError> {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        let region = region.unwrap_or(PixelRect::new(0, 0, width, height));
        let fits = region.width > 0
            && region.height > 0
            && region.x.checked_add(region.width).is_some_and(|r| r <= width)
            && region.y.checked_add(region.height).is_some_and(|b| b <= height);
        if !fits {
            return Err(SurfaceError::OutOfBounds);
        }
        let data = self.canvas.pixmap().data();
        let stride = width as usize * 4;
        let row = region.width as usize * 4;
        let mut pixels = Vec::with_capacity(row * region.height as usize);
        for y in region.y..region.y + region.height {
            let start = y as usize * stride + region.x as usize * 4;
            pixels.extend_from_slice(&data[start..start + row]);
        }
        Ok(Image::new(region.width, region.height, pixels.into()))
    }
}

/// Creates [`SkiaSurface`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkiaSurfaceProvider;

impl SurfaceProvider for SkiaSurfaceProvider {
    fn create_surface(&mut self, size: SurfaceSize) -> Result<Box<dyn Surface>, SurfaceError> {
        Ok(Box::new(SkiaSurface::new(size)?))
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;
    use lamina_core::canvas::{Color, Paint};

    use super::*;

    #[test]
    fn ids_are_unique() {
        let mut provider = SkiaSurfaceProvider;
        let a = provider.create_surface(SurfaceSize::new(1, 1)).unwrap();
        let b = provider.create_surface(SurfaceSize::new(1, 1)).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        assert_eq!(
            SkiaSurface::new(SurfaceSize::new(0, 4)).unwrap_err(),
            SurfaceError::InvalidSize { width: 0, height: 4 }
        );
        assert!(SkiaSurface::new(SurfaceSize::new(MAX_SIDE + 1, 1)).is_err());
    }

    #[test]
    fn same_size_acquire_keeps_pixels_and_resets_state() {
        let mut surface = SkiaSurface::new(SurfaceSize::new(4, 4)).unwrap();
        let canvas = surface.canvas();
        canvas.clear(Color::BLACK);
        canvas.save();
        canvas.translate(1.0, 1.0);
        surface.acquire_frame(SurfaceSize::new(4, 4)).unwrap();
        assert_eq!(surface.canvas().save_count(), 0);
        assert_eq!(surface.canvas().total_matrix(), kurbo::Affine::IDENTITY);
        let image = surface.to_image(None).unwrap();
        assert_eq!(image.pixel(3, 3), Some([0, 0, 0, 255]));

        surface.acquire_frame(SurfaceSize::new(2, 2)).unwrap();
        let image = surface.to_image(None).unwrap();
        assert_eq!(image.pixel(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn region_readback() {
        let mut surface = SkiaSurface::new(SurfaceSize::new(4, 4)).unwrap();
        surface
            .canvas()
            .draw_rect(Rect::new(2.0, 1.0, 3.0, 2.0), &Paint::fill(Color::WHITE));
        let image = surface.to_image(Some(PixelRect::new(2, 1, 2, 2))).unwrap();
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(1, 0), Some([0, 0, 0, 0]));

        assert_eq!(
            surface.to_image(Some(PixelRect::new(3, 3, 2, 1))).unwrap_err(),
            SurfaceError::OutOfBounds
        );
    }

    #[test]
    fn submit_counts_frames() {
        let mut surface = SkiaSurface::new(SurfaceSize::new(1, 1)).unwrap();
        surface.submit().unwrap();
        surface.submit().unwrap();
        assert_eq!(surface.submitted_frames(), 2);
    }
}
