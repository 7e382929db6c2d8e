// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame compositing of a layer tree through a picture cache.

use alloc::boxed::Box;
use core::fmt;

use kurbo::Affine;
use lamina_core::canvas::{Canvas, Color};
use lamina_core::layer::{CacheStats, LayerTree, PictureCache};
use lamina_core::surface::SurfaceProvider;

use crate::atlas::AtlasRasterCache;
use crate::config::PipelineConfig;
use crate::pool::SurfacePool;
use crate::raster_cache::RasterCache;

/// Drives a [`PictureCache`] through the frame protocol.
///
/// A frame is [`begin_frame`](Self::begin_frame), [`raster`](Self::raster)
/// (or [`preroll`](Self::preroll) followed by [`paint`](Self::paint)), then
/// [`end_frame`](Self::end_frame).
pub struct CompositorContext {
    cache: Box<dyn PictureCache>,
    frames: u64,
}

impl fmt::Debug for CompositorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositorContext")
            .field("frames", &self.frames)
            .field("stats", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

impl CompositorContext {
    /// Creates a context around `cache`.
    #[must_use]
    pub fn new(cache: Box<dyn PictureCache>) -> Self {
        Self { cache, frames: 0 }
    }

    /// Creates a context with the cache described by `config`, allocating
    /// offscreen surfaces through `provider`.
    #[must_use]
    pub fn from_config(config: &PipelineConfig, provider: Box<dyn SurfaceProvider>) -> Self {
        let pool = SurfacePool::new(provider, config.surface_pool);
        let cache: Box<dyn PictureCache> = match config.atlas {
            Some(atlas) => Box::new(AtlasRasterCache::new(config.raster_cache, atlas, pool)),
            None => Box::new(RasterCache::new(config.raster_cache, pool)),
        };
        Self::new(cache)
    }

    /// The picture cache.
    #[must_use]
    pub fn cache(&self) -> &dyn PictureCache {
        &*self.cache
    }

    /// Mutable access to the picture cache.
    pub fn cache_mut(&mut self) -> &mut dyn PictureCache {
        &mut *self.cache
    }

    /// Frames completed so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Clears the target and runs any cache work left from the previous
    /// frame.
    pub fn begin_frame(&mut self, canvas: &mut dyn Canvas, clear: Color) {
        canvas.clear(clear);
        self.cache.process_jobs();
    }

    /// Computes paint bounds and registers pictures with the cache, then
    /// runs the rasterization work preroll queued.
    pub fn preroll(&mut self, layers: &mut LayerTree, matrix: Affine) {
        layers.preroll(&mut *self.cache, matrix);
        self.cache.process_jobs();
    }

    /// Draws the prerolled tree onto `canvas`.
    pub fn paint(&mut self, layers: &LayerTree, canvas: &mut dyn Canvas) {
        layers.paint(canvas, &mut *self.cache);
    }

    /// Prerolls and paints `layers` onto `canvas`.
    ///
    /// The preroll matrix is the canvas's current transform, so cache keys
    /// match the matrices seen while painting.
    pub fn raster(&mut self, layers: &mut LayerTree, canvas: &mut dyn Canvas) {
        self.preroll(layers, canvas.total_matrix());
        self.paint(layers, canvas);
    }

    /// Sweeps the cache and returns its counters for the frame.
    pub fn end_frame(&mut self) -> CacheStats {
        self.cache.sweep();
        self.frames += 1;
        self.cache.stats()
    }
}
