// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Puts composited frames on a surface.

use alloc::boxed::Box;
use core::fmt;

use kurbo::Affine;
use lamina_core::canvas::Color;
use lamina_core::error::SurfaceError;
use lamina_core::layer::{CacheStats, LayerTree};
use lamina_core::surface::{Surface, SurfaceProvider, SurfaceSize};
use tracing::warn;

use crate::compositor::CompositorContext;
use crate::config::PipelineConfig;

/// A frame could not be drawn.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    /// The requested frame has no pixels.
    #[error("frame size {width}x{height} is empty")]
    EmptyFrame {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The output surface failed.
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),
}

/// Owns the output surface and composites layer trees onto it.
///
/// [`draw`](Self::draw) runs a whole frame. The individual steps are public
/// so a driver can time them separately; they must be called in the order
/// [`begin_frame`](Self::begin_frame), [`preroll`](Self::preroll),
/// [`paint`](Self::paint), [`end_frame`](Self::end_frame).
pub struct Rasterizer {
    surface: Box<dyn Surface>,
    compositor: CompositorContext,
    clear_color: Color,
    root_transform: Affine,
}

impl fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rasterizer")
            .field("surface", &self.surface.id())
            .field("compositor", &self.compositor)
            .field("clear_color", &self.clear_color)
            .field("root_transform", &self.root_transform)
            .finish()
    }
}

impl Rasterizer {
    /// Creates a rasterizer presenting to `surface`.
    #[must_use]
    pub fn new(
        surface: Box<dyn Surface>,
        compositor: CompositorContext,
        clear_color: Color,
    ) -> Self {
        Self {
            surface,
            compositor,
            clear_color,
            root_transform: Affine::IDENTITY,
        }
    }

    /// Creates a rasterizer presenting to `surface`, with the cache and
    /// clear color described by `config`.
    #[must_use]
    pub fn from_config(
        config: &PipelineConfig,
        surface: Box<dyn Surface>,
        provider: Box<dyn SurfaceProvider>,
    ) -> Self {
        Self::new(
            surface,
            CompositorContext::from_config(config, provider),
            config.clear_color,
        )
    }

    /// Sets the transform from root-layer space to surface pixels, for
    /// example a device pixel ratio.
    pub fn set_root_transform(&mut self, transform: Affine) {
        self.root_transform = transform;
    }

    /// The transform from root-layer space to surface pixels.
    #[must_use]
    pub fn root_transform(&self) -> Affine {
        self.root_transform
    }

    /// The output surface.
    #[must_use]
    pub fn surface(&self) -> &dyn Surface {
        &*self.surface
    }

    /// Mutable access to the output surface, for reading back pixels.
    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    /// The compositor.
    #[must_use]
    pub fn compositor(&self) -> &CompositorContext {
        &self.compositor
    }

    /// Mutable access to the compositor.
    pub fn compositor_mut(&mut self) -> &mut CompositorContext {
        &mut self.compositor
    }

    /// Acquires a frame of `size` and clears it.
    ///
    /// # Errors
    ///
    /// Fails if `size` is empty or the surface cannot provide a frame.
    pub fn begin_frame(&mut self, size: SurfaceSize) -> Result<(), RasterError> {
        if size.is_empty() {
            return Err(RasterError::EmptyFrame {
                width: size.width,
                height: size.height,
            });
        }
        self.surface.acquire_frame(size)?;
        let canvas = self.surface.canvas();
        canvas.transform(self.root_transform);
        self.compositor.begin_frame(canvas, self.clear_color);
        Ok(())
    }

    /// Prerolls `layers` under the root transform.
    pub fn preroll(&mut self, layers: &mut LayerTree) {
        self.compositor.preroll(layers, self.root_transform);
    }

    /// Paints the prerolled `layers` onto the frame.
    pub fn paint(&mut self, layers: &LayerTree) {
        self.compositor.paint(layers, self.surface.canvas());
    }

    /// Sweeps the cache and presents the frame.
    ///
    /// The cache is swept even if presenting fails.
    ///
    /// # Errors
    ///
    /// Fails if the surface cannot present.
    pub fn end_frame(&mut self) -> Result<CacheStats, RasterError> {
        let stats = self.compositor.end_frame();
        if let Err(err) = self.surface.submit() {
            warn!(%err, "frame submission failed");
            return Err(err.into());
        }
        Ok(stats)
    }

    /// Draws `layers` as one complete frame of `size`.
    ///
    /// # Errors
    ///
    /// Fails if the surface cannot provide or present the frame.
    pub fn draw(
        &mut self,
        layers: &mut LayerTree,
        size: SurfaceSize,
    ) -> Result<CacheStats, RasterError> {
        self.begin_frame(size)?;
        self.preroll(layers);
        self.paint(layers);
        self.end_frame()
    }
}
