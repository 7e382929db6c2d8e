// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Memoizes pictures as offscreen images, one surface per picture.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::fmt;

use kurbo::{Affine, Rect};
use lamina_core::canvas::{Canvas, Color, Image, Paint};
use lamina_core::debug::{DebugFlags, debug_flags};
use lamina_core::error::SurfaceError;
use lamina_core::geometry::{linear_part, round_out};
use lamina_core::id::{PictureId, SurfaceId};
use lamina_core::layer::{CacheStats, PictureCache, PictureHints};
use lamina_core::picture::Picture;
use lamina_core::surface::{Surface, SurfaceSize};
use tracing::{debug, trace, warn};

use crate::config::RasterCacheConfig;
use crate::pool::SurfacePool;

const WATERMARK_COLOR: Color = Color::rgba8(0, 200, 0, 64);

/// Identifies one rasterization: a picture under the linear part of a
/// matrix.
///
/// Translation is ignored, so a picture that only moves keeps its entry.
/// Clips are ignored as well; the enclosing layer applies them when the
/// image is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct CacheKey {
    picture: PictureId,
    linear: [u64; 4],
}

impl CacheKey {
    pub(crate) fn new(picture: &Picture, matrix: Affine) -> Self {
        let [a, b, c, d, _, _] = matrix.as_coeffs();
        // Adding zero folds -0.0 into 0.0.
        Self {
            picture: picture.id(),
            linear: [a, b, c, d].map(|v| (v + 0.0).to_bits()),
        }
    }
}

/// Bookkeeping shared by every cache flavour.
pub(crate) struct Entry<R> {
    pub(crate) access_count: u32,
    pub(crate) used_this_frame: bool,
    pub(crate) failed: bool,
    pub(crate) result: Option<R>,
}

impl<R> Default for Entry<R> {
    fn default() -> Self {
        Self {
            access_count: 0,
            used_this_frame: false,
            failed: false,
            result: None,
        }
    }
}

/// Runs the admission gates for `key`.
///
/// An existing entry is marked used even when a gate rejects, so cached
/// images survive frames in which they are not worth building. Returns
/// `true` when the entry has been seen often enough and should be
/// rasterized now.
pub(crate) fn admit<R>(
    config: &RasterCacheConfig,
    entries: &mut BTreeMap<CacheKey, Entry<R>>,
    key: CacheKey,
    picture: &Picture,
    hints: PictureHints,
    builds_this_frame: u32,
) -> bool {
    if let Some(entry) = entries.get_mut(&key) {
        entry.used_this_frame = true;
    }
    if !config.enabled
        || builds_this_frame >= config.max_builds_per_frame
        || hints.will_change
        || is_trivial(config, picture, hints)
    {
        return false;
    }
    let entry = entries.entry(key).or_default();
    entry.used_this_frame = true;
    entry.access_count = entry.access_count.saturating_add(1);
    config.access_threshold > 0
        && entry.access_count >= config.access_threshold
        && !entry.failed
        && entry.result.is_none()
}

fn is_trivial(config: &RasterCacheConfig, picture: &Picture, hints: PictureHints) -> bool {
    if picture.cull_rect().is_zero_area() {
        return true;
    }
    picture.draw_op_count() < config.min_op_count && !picture.has_text() && !hints.is_complex
}

/// Device-space bounds and pixel size of `cull` under `linear`, or `None`
/// if the result is empty or too large to cache.
pub(crate) fn device_bounds(
    config: &RasterCacheConfig,
    cull: Rect,
    linear: Affine,
) -> Option<(Rect, SurfaceSize)> {
    let rect = round_out(linear.transform_rect_bbox(cull));
    let (w, h) = (rect.width(), rect.height());
    let max_side = f64::from(config.max_side);
    let max_area = config.max_area as f64;
    if w < 1.0 || h < 1.0 || w > max_side || h > max_side || w * h > max_area {
        return None;
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "both sides are whole numbers no larger than max_side"
    )]
    let size = SurfaceSize::new(w as u32, h as u32);
    Some((rect, size))
}

/// Draws a cached image with the canvas transform reset, so `dst` is in
/// device pixels. The current clip still applies.
pub(crate) fn draw_cached(canvas: &mut dyn Canvas, image: &Image, src: Rect, dst: Rect) {
    canvas.save();
    canvas.reset_transform();
    canvas.draw_image_rect(image, src, dst);
    if debug_flags().contains(DebugFlags::CACHE_WATERMARK) {
        canvas.draw_rect(dst, &Paint::fill(WATERMARK_COLOR));
    }
    canvas.restore();
}

/// A rasterized picture and the surface backing it.
pub(crate) struct CacheResult {
    image: Image,
    bounds: Rect,
    surface: Option<Box<dyn Surface>>,
}

/// Draws `picture` under `linear` into a pooled surface sized to `bounds`.
fn rasterize(
    pool: &mut SurfacePool,
    picture: &Picture,
    linear: Affine,
    bounds: Rect,
    size: SurfaceSize,
) -> Result<CacheResult, SurfaceError> {
    let mut surface = pool.take(size)?;
    let canvas = surface.canvas();
    canvas.clear(Color::TRANSPARENT);
    canvas.translate(-bounds.x0, -bounds.y0);
    canvas.transform(linear);
    picture.playback(canvas);
    match surface.to_image(None) {
        Ok(image) => Ok(CacheResult {
            image,
            bounds,
            surface: Some(surface),
        }),
        Err(err) => {
            pool.give(surface);
            Err(err)
        }
    }
}

/// The default [`PictureCache`]: every cached picture gets its own pooled
/// surface.
///
/// A picture is rasterized once it has been prepared under the same linear
/// transform in `access_threshold` frames, and evicted at the first sweep
/// after a frame in which it was neither prepared nor drawn.
pub struct RasterCache {
    config: RasterCacheConfig,
    pool: SurfacePool,
    entries: BTreeMap<CacheKey, Entry<CacheResult>>,
    builds_this_frame: u32,
    frame: CacheStats,
    last: CacheStats,
}

impl fmt::Debug for RasterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterCache")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("entries", &self.entries.len())
            .field("builds_this_frame", &self.builds_this_frame)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl RasterCache {
    /// Creates an empty cache drawing into surfaces from `pool`.
    #[must_use]
    pub fn new(config: RasterCacheConfig, pool: SurfacePool) -> Self {
        Self {
            config,
            pool,
            entries: BTreeMap::new(),
            builds_this_frame: 0,
            frame: CacheStats::default(),
            last: CacheStats::default(),
        }
    }

    /// The admission rules in use.
    #[must_use]
    pub fn config(&self) -> &RasterCacheConfig {
        &self.config
    }

    /// The offscreen surface pool.
    #[must_use]
    pub fn pool(&self) -> &SurfacePool {
        &self.pool
    }

    /// Mutable access to the offscreen surface pool.
    pub fn pool_mut(&mut self) -> &mut SurfacePool {
        &mut self.pool
    }

    /// Number of entries, cached or still counting accesses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an image of `picture` under `matrix` is cached.
    #[must_use]
    pub fn is_cached(&self, picture: &Picture, matrix: Affine) -> bool {
        self.is_ready(&CacheKey::new(picture, matrix))
    }

    /// The surface holding the image of `picture` under `matrix`.
    #[must_use]
    pub fn surface_for(&self, picture: &Picture, matrix: Affine) -> Option<SurfaceId> {
        let entry = self.entries.get(&CacheKey::new(picture, matrix))?;
        entry.result.as_ref()?.surface.as_ref().map(|s| s.id())
    }

    pub(crate) fn is_ready(&self, key: &CacheKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.result.is_some())
    }

    /// Keeps `key` alive through the next sweep.
    pub(crate) fn touch(&mut self, key: &CacheKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.used_this_frame = true;
        }
    }

    /// Rasterizes `picture` now, bypassing admission. Returns whether an
    /// image was produced; on failure the entry is marked failed.
    pub(crate) fn build(&mut self, key: CacheKey, picture: &Picture, matrix: Affine) -> bool {
        self.builds_this_frame += 1;
        let linear = linear_part(matrix);
        let result = match device_bounds(&self.config, picture.cull_rect(), linear) {
            Some((bounds, size)) => {
                match rasterize(&mut self.pool, picture, linear, bounds, size) {
                    Ok(result) => Some(result),
                    Err(err) => {
                        warn!(picture = ?picture.id(), %err, "raster cache build failed");
                        None
                    }
                }
            }
            None => {
                debug!(picture = ?picture.id(), "picture bounds are not cacheable");
                None
            }
        };
        let entry = self.entries.entry(key).or_default();
        entry.used_this_frame = true;
        match result {
            Some(result) => {
                debug!(picture = ?picture.id(), bounds = ?result.bounds, "rasterized picture");
                entry.result = Some(result);
                self.frame.built += 1;
                true
            }
            None => {
                entry.failed = true;
                self.frame.failed += 1;
                false
            }
        }
    }
}

impl PictureCache for RasterCache {
    fn prepare(&mut self, picture: &Arc<Picture>, matrix: Affine, hints: PictureHints) -> bool {
        self.frame.prepared += 1;
        let key = CacheKey::new(picture, matrix);
        if admit(
            &self.config,
            &mut self.entries,
            key,
            picture,
            hints,
            self.builds_this_frame,
        ) {
            self.build(key, picture, matrix);
        }
        self.is_ready(&key)
    }

    fn draw_picture(&mut self, canvas: &mut dyn Canvas, picture: &Picture, matrix: Affine) -> bool {
        let key = CacheKey::new(picture, matrix);
        let Some(result) = self.entries.get_mut(&key).and_then(|entry| {
            entry.used_this_frame = true;
            entry.result.as_ref()
        }) else {
            return false;
        };
        let dst = result.bounds + matrix.translation();
        draw_cached(canvas, &result.image, result.image.bounds(), dst);
        trace!(picture = ?picture.id(), "raster cache hit");
        self.frame.hits += 1;
        true
    }

    fn sweep(&mut self) {
        let pool = &mut self.pool;
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            if core::mem::take(&mut entry.used_this_frame) {
                return true;
            }
            if let Some(CacheResult {
                surface: Some(surface),
                ..
            }) = entry.result.take()
            {
                pool.give(surface);
            }
            evicted += 1;
            false
        });
        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "raster cache sweep");
        }
        self.frame.evicted += evicted;
        self.frame.entries = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        self.last = core::mem::take(&mut self.frame);
        self.builds_this_frame = 0;
    }

    fn stats(&self) -> CacheStats {
        self.last
    }
}
