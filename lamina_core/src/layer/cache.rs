// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The seam between the layer tree and raster caches.

use alloc::sync::Arc;

use kurbo::Affine;

use super::kind::PictureHints;
use crate::canvas::Canvas;
use crate::picture::Picture;

/// Per-frame raster cache counters.
///
/// `entries` is the number of live entries after the sweep; every other
/// field counts events during the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheStats {
    /// Calls to [`PictureCache::prepare`].
    pub prepared: u32,
    /// Pictures rasterized into the cache.
    pub built: u32,
    /// Pictures drawn from a cached image.
    pub hits: u32,
    /// Entries removed by the sweep.
    pub evicted: u32,
    /// Entries that were rejected permanently.
    pub failed: u32,
    /// Live entries after the sweep.
    pub entries: u32,
}

/// Memoizes pictures as raster images.
///
/// The compositor calls [`prepare`](Self::prepare) for every picture during
/// preroll, [`process_jobs`](Self::process_jobs) before painting,
/// [`draw_picture`](Self::draw_picture) for every picture during paint, and
/// [`sweep`](Self::sweep) once the frame is done.
pub trait PictureCache {
    /// Registers interest in `picture` drawn under `matrix` this frame.
    ///
    /// Returns `true` if a cached image is (or will be, once jobs run)
    /// available for this key.
    fn prepare(&mut self, picture: &Arc<Picture>, matrix: Affine, hints: PictureHints) -> bool;

    /// Draws the cached image for `picture` under `matrix`.
    ///
    /// Returns `false` when there is no image; the caller then plays the
    /// picture back directly.
    fn draw_picture(&mut self, canvas: &mut dyn Canvas, picture: &Picture, matrix: Affine) -> bool;

    /// Runs rasterization work deferred by [`prepare`](Self::prepare).
    fn process_jobs(&mut self) {}

    /// Ends the frame, evicting entries that were not used.
    fn sweep(&mut self) {}

    /// Counters for the frame most recently swept.
    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// A cache that never caches.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

impl PictureCache for NoCache {
    fn prepare(&mut self, _: &Arc<Picture>, _: Affine, _: PictureHints) -> bool {
        false
    }

    fn draw_picture(&mut self, _: &mut dyn Canvas, _: &Picture, _: Affine) -> bool {
        false
    }
}
