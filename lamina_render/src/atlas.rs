// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A raster cache that packs small pictures into shared pages.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Affine, Rect};
use lamina_core::canvas::{Canvas, Color, Image};
use lamina_core::geometry::linear_part;
use lamina_core::layer::{CacheStats, PictureCache, PictureHints};
use lamina_core::picture::Picture;
use lamina_core::surface::{PixelRect, Surface, SurfaceSize};
use tracing::{debug, warn};

use crate::config::{AtlasConfig, RasterCacheConfig};
use crate::pool::SurfacePool;
use crate::raster_cache::{CacheKey, Entry, RasterCache, admit, device_bounds, draw_cached};

#[derive(Debug)]
struct Shelf {
    y: u32,
    height: u32,
    cursor: u32,
}

/// Shelf bin packer for one square page.
///
/// Items go on the shortest shelf that fits them; a new shelf is opened
/// below the last one when none does. Space is only reclaimed by
/// [`reset`](Self::reset).
#[derive(Debug)]
struct ShelfPacker {
    size: u32,
    padding: u32,
    shelves: Vec<Shelf>,
    next_y: u32,
}

impl ShelfPacker {
    fn new(size: u32, padding: u32) -> Self {
        Self {
            size,
            padding,
            shelves: Vec::new(),
            next_y: 0,
        }
    }

    fn allocate(&mut self, width: u32, height: u32) -> Option<PixelRect> {
        let size = self.size;
        let w = width.saturating_add(self.padding);
        let h = height.saturating_add(self.padding);
        if w > size || h > size {
            return None;
        }
        if let Some(shelf) = self
            .shelves
            .iter_mut()
            .filter(|s| s.height >= h && size - s.cursor >= w)
            .min_by_key(|s| s.height)
        {
            let rect = PixelRect::new(shelf.cursor, shelf.y, width, height);
            shelf.cursor += w;
            return Some(rect);
        }
        if size - self.next_y < h {
            return None;
        }
        let y = self.next_y;
        self.next_y += h;
        self.shelves.push(Shelf {
            y,
            height: h,
            cursor: w,
        });
        Some(PixelRect::new(0, y, width, height))
    }

    fn is_empty(&self) -> bool {
        self.shelves.is_empty()
    }

    fn reset(&mut self) {
        self.shelves.clear();
        self.next_y = 0;
    }
}

struct Page {
    surface: Box<dyn Surface>,
    packer: ShelfPacker,
    image: Option<Image>,
    live: u32,
    needs_clear: bool,
}

enum AtlasSlot {
    Packed { page: usize, rect: PixelRect, bounds: Rect },
    /// Too big for a page, or every page was full.
    Fallback,
}

struct Job {
    page: usize,
    rect: PixelRect,
    bounds: Rect,
    linear: Affine,
    picture: Arc<Picture>,
}

/// A [`PictureCache`] that packs rasterizations into a few large pages.
///
/// Admission follows the same rules as [`RasterCache`]. An admitted picture
/// is assigned a page region during preroll and drawn into it when
/// [`process_jobs`](PictureCache::process_jobs) runs, so every packing
/// decision for a frame is made before any page is touched. Pictures wider
/// or taller than `max_item_side`, and pictures that fit on no page, are
/// handed to an inner [`RasterCache`] instead.
///
/// A page's space is reclaimed only once every item on it has been evicted.
pub struct AtlasRasterCache {
    config: RasterCacheConfig,
    atlas: AtlasConfig,
    fallback: RasterCache,
    pages: Vec<Page>,
    entries: BTreeMap<CacheKey, Entry<AtlasSlot>>,
    jobs: Vec<Job>,
    builds_this_frame: u32,
    frame: CacheStats,
    last: CacheStats,
}

impl fmt::Debug for AtlasRasterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlasRasterCache")
            .field("atlas", &self.atlas)
            .field("pages", &self.pages.len())
            .field("entries", &self.entries.len())
            .field("jobs", &self.jobs.len())
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl AtlasRasterCache {
    /// Creates an empty atlas. Pages and fallback surfaces both come from
    /// `pool`.
    #[must_use]
    pub fn new(config: RasterCacheConfig, atlas: AtlasConfig, pool: SurfacePool) -> Self {
        Self {
            config,
            atlas,
            fallback: RasterCache::new(config, pool),
            pages: Vec::new(),
            entries: BTreeMap::new(),
            jobs: Vec::new(),
            builds_this_frame: 0,
            frame: CacheStats::default(),
            last: CacheStats::default(),
        }
    }

    /// Number of pages allocated so far.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of rasterizations waiting for
    /// [`process_jobs`](PictureCache::process_jobs).
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// The per-picture cache used for items that do not fit a page.
    #[must_use]
    pub fn fallback(&self) -> &RasterCache {
        &self.fallback
    }

    /// Whether `picture` under `matrix` lives on an atlas page.
    #[must_use]
    pub fn is_packed(&self, picture: &Picture, matrix: Affine) -> bool {
        matches!(
            self.entries
                .get(&CacheKey::new(picture, matrix))
                .and_then(|e| e.result.as_ref()),
            Some(AtlasSlot::Packed { .. })
        )
    }

    fn allocate(&mut self, size: SurfaceSize) -> Option<(usize, PixelRect)> {
        for (index, page) in self.pages.iter_mut().enumerate() {
            if let Some(rect) = page.packer.allocate(size.width, size.height) {
                return Some((index, rect));
            }
        }
        if self.pages.len() >= self.atlas.max_pages {
            return None;
        }
        let side = self.atlas.page_size;
        let surface = match self.fallback.pool_mut().take(SurfaceSize::new(side, side)) {
            Ok(surface) => surface,
            Err(err) => {
                warn!(%err, "could not allocate atlas page");
                return None;
            }
        };
        let mut page = Page {
            surface,
            packer: ShelfPacker::new(side, self.atlas.padding),
            image: None,
            live: 0,
            needs_clear: true,
        };
        let Some(rect) = page.packer.allocate(size.width, size.height) else {
            self.fallback.pool_mut().give(page.surface);
            return None;
        };
        debug!(page = self.pages.len(), side, "allocated atlas page");
        self.pages.push(page);
        Some((self.pages.len() - 1, rect))
    }

    fn build(&mut self, key: CacheKey, picture: &Arc<Picture>, matrix: Affine) {
        self.builds_this_frame += 1;
        let linear = linear_part(matrix);
        let Some((bounds, size)) = device_bounds(&self.config, picture.cull_rect(), linear) else {
            debug!(picture = ?picture.id(), "picture bounds are not cacheable");
            let entry = self.entries.entry(key).or_default();
            entry.failed = true;
            self.frame.failed += 1;
            return;
        };
        let fits_page =
            size.width <= self.atlas.max_item_side && size.height <= self.atlas.max_item_side;
        let slot = if fits_page { self.allocate(size) } else { None };
        let result = match slot {
            Some((page, rect)) => {
                self.pages[page].live += 1;
                self.jobs.push(Job {
                    page,
                    rect,
                    bounds,
                    linear,
                    picture: Arc::clone(picture),
                });
                self.frame.built += 1;
                Some(AtlasSlot::Packed { page, rect, bounds })
            }
            None => self
                .fallback
                .build(key, picture, matrix)
                .then_some(AtlasSlot::Fallback),
        };
        let entry = self.entries.entry(key).or_default();
        entry.used_this_frame = true;
        match result {
            Some(slot) => entry.result = Some(slot),
            None => entry.failed = true,
        }
    }
}

impl PictureCache for AtlasRasterCache {
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
        match self.entries.get(&key).and_then(|e| e.result.as_ref()) {
            Some(AtlasSlot::Packed { .. }) => true,
            Some(AtlasSlot::Fallback) => {
                self.fallback.touch(&key);
                self.fallback.is_ready(&key)
            }
            None => false,
        }
    }

    fn draw_picture(&mut self, canvas: &mut dyn Canvas, picture: &Picture, matrix: Affine) -> bool {
        let key = CacheKey::new(picture, matrix);
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        entry.used_this_frame = true;
        match &entry.result {
            Some(AtlasSlot::Packed { page, rect, bounds }) => {
                let Some(image) = self.pages.get(*page).and_then(|p| p.image.as_ref()) else {
                    return false;
                };
                draw_cached(canvas, image, rect.to_rect(), *bounds + matrix.translation());
                self.frame.hits += 1;
                true
            }
            Some(AtlasSlot::Fallback) => self.fallback.draw_picture(canvas, picture, matrix),
            None => false,
        }
    }

    fn process_jobs(&mut self) {
        if self.jobs.is_empty() {
            return;
        }
        let jobs = core::mem::take(&mut self.jobs);
        let mut touched = alloc::vec![false; self.pages.len()];
        for job in &jobs {
            let Some(page) = self.pages.get_mut(job.page) else {
                continue;
            };
            let canvas = page.surface.canvas();
            if page.needs_clear {
                canvas.clear(Color::TRANSPARENT);
                page.needs_clear = false;
            }
            canvas.save();
            canvas.clip_rect(job.rect.to_rect());
            canvas.translate(
                f64::from(job.rect.x) - job.bounds.x0,
                f64::from(job.rect.y) - job.bounds.y0,
            );
            canvas.transform(job.linear);
            job.picture.playback(canvas);
            canvas.restore();
            touched[job.page] = true;
        }
        for (index, page) in self.pages.iter_mut().enumerate() {
            if !touched[index] {
                continue;
            }
            match page.surface.to_image(None) {
                Ok(image) => page.image = Some(image),
                Err(err) => {
                    warn!(page = index, %err, "atlas page snapshot failed");
                    page.image = None;
                }
            }
        }
        debug!(jobs = jobs.len(), "drew atlas jobs");
    }

    fn sweep(&mut self) {
        let pages = &mut self.pages;
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            if core::mem::take(&mut entry.used_this_frame) {
                return true;
            }
            if let Some(AtlasSlot::Packed { page, .. }) = entry.result {
                if let Some(page) = pages.get_mut(page) {
                    page.live -= 1;
                }
            }
            evicted += 1;
            false
        });
        for page in &mut self.pages {
            if page.live == 0 && !page.packer.is_empty() {
                page.packer.reset();
                page.image = None;
                page.needs_clear = true;
            }
        }
        self.fallback.sweep();
        let inner = self.fallback.stats();
        self.frame.evicted += evicted;
        self.frame.built += inner.built;
        self.frame.hits += inner.hits;
        self.frame.failed += inner.failed;
        self.frame.entries = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        self.last = core::mem::take(&mut self.frame);
        self.builds_this_frame = 0;
    }

    fn stats(&self) -> CacheStats {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use kurbo::Rect;
    use lamina_core::canvas::Paint;
    use lamina_core::picture::{DrawOp, PictureRecorder};

    use super::*;
    use crate::config::SurfacePoolConfig;
    use crate::pool::testing::NullProvider;

    fn atlas(atlas: AtlasConfig) -> AtlasRasterCache {
        let pool = SurfacePool::new(Box::new(NullProvider::default()), SurfacePoolConfig::DEFAULT);
        AtlasRasterCache::new(
            RasterCacheConfig {
                access_threshold: 1,
                max_builds_per_frame: 8,
                ..RasterCacheConfig::DEFAULT
            },
            atlas,
            pool,
        )
    }

    fn square(side: f64) -> Arc<Picture> {
        let mut rec = PictureRecorder::new();
        for _ in 0..5 {
            rec.draw_rect(Rect::new(0.0, 0.0, side, side), &Paint::default());
        }
        Arc::new(rec.finish())
    }

    #[test]
    fn packer_fills_shelves_then_opens_new_ones() {
        let mut packer = ShelfPacker::new(100, 0);
        assert_eq!(packer.allocate(60, 20), Some(PixelRect::new(0, 0, 60, 20)));
        assert_eq!(packer.allocate(40, 10), Some(PixelRect::new(60, 0, 40, 10)));
        assert_eq!(packer.allocate(50, 30), Some(PixelRect::new(0, 20, 50, 30)));
        assert_eq!(packer.allocate(50, 30), Some(PixelRect::new(50, 20, 50, 30)));
        assert_eq!(packer.allocate(10, 60), None);
        assert_eq!(packer.allocate(10, 50), Some(PixelRect::new(0, 50, 10, 50)));
        packer.reset();
        assert_eq!(packer.allocate(100, 100), Some(PixelRect::new(0, 0, 100, 100)));
    }

    #[test]
    fn packer_prefers_the_shortest_fitting_shelf() {
        let mut packer = ShelfPacker::new(100, 1);
        assert_eq!(packer.allocate(50, 40), Some(PixelRect::new(0, 0, 50, 40)));
        assert_eq!(packer.allocate(60, 10), Some(PixelRect::new(0, 41, 60, 10)));
        assert_eq!(packer.allocate(10, 8), Some(PixelRect::new(61, 41, 10, 8)));
    }

    #[test]
    fn small_pictures_share_a_page() {
        let mut cache = atlas(AtlasConfig::DEFAULT);
        let pics = [square(10.0), square(20.0), square(30.0)];
        for pic in &pics {
            assert!(cache.prepare(pic, Affine::IDENTITY, PictureHints::default()));
        }
        assert_eq!(cache.page_count(), 1);
        assert_eq!(cache.pending_jobs(), 3);

        let mut out = PictureRecorder::new();
        assert!(
            !cache.draw_picture(&mut out, &pics[0], Affine::IDENTITY),
            "nothing to draw before jobs run"
        );
        cache.process_jobs();
        assert_eq!(cache.pending_jobs(), 0);
        for pic in &pics {
            assert!(cache.draw_picture(&mut out, pic, Affine::IDENTITY));
        }
        let out = out.finish();
        let dsts: Vec<Rect> = out
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { dst, .. } => Some(*dst),
                _ => None,
            })
            .collect();
        assert_eq!(dsts[2], Rect::new(0.0, 0.0, 30.0, 30.0));
        cache.sweep();
        assert_eq!(cache.stats().built, 3);
        assert_eq!(cache.fallback().pool().created(), 1, "one page surface");
    }

    #[test]
    fn large_pictures_fall_back() {
        let mut cache = atlas(AtlasConfig::DEFAULT);
        let big = square(300.0);
        assert!(cache.prepare(&big, Affine::IDENTITY, PictureHints::default()));
        assert!(!cache.is_packed(&big, Affine::IDENTITY));
        assert!(cache.fallback().is_cached(&big, Affine::IDENTITY));
        assert_eq!(cache.page_count(), 0);

        let mut out = PictureRecorder::new();
        assert!(cache.draw_picture(&mut out, &big, Affine::IDENTITY));
        cache.sweep();
        let stats = cache.stats();
        assert_eq!((stats.built, stats.hits), (1, 1));
    }

    #[test]
    fn full_pages_fall_back() {
        let mut cache = atlas(AtlasConfig {
            page_size: 64,
            max_pages: 1,
            padding: 0,
            max_item_side: 64,
        });
        let a = square(60.0);
        let b = square(60.0);
        cache.prepare(&a, Affine::IDENTITY, PictureHints::default());
        cache.prepare(&b, Affine::IDENTITY, PictureHints::default());
        assert!(cache.is_packed(&a, Affine::IDENTITY));
        assert!(!cache.is_packed(&b, Affine::IDENTITY));
        assert!(cache.fallback().is_cached(&b, Affine::IDENTITY));
    }

    #[test]
    fn page_is_reclaimed_once_empty() {
        let mut cache = atlas(AtlasConfig {
            page_size: 64,
            max_pages: 1,
            padding: 0,
            max_item_side: 64,
        });
        let a = square(60.0);
        cache.prepare(&a, Affine::IDENTITY, PictureHints::default());
        cache.process_jobs();
        cache.sweep();
        cache.sweep();
        assert!(!cache.is_packed(&a, Affine::IDENTITY));

        let b = square(60.0);
        cache.prepare(&b, Affine::IDENTITY, PictureHints::default());
        assert!(cache.is_packed(&b, Affine::IDENTITY), "freed page space is reused");
        assert_eq!(cache.page_count(), 1);
    }

    #[test]
    fn fallback_entries_follow_atlas_lifetime() {
        let mut cache = atlas(AtlasConfig::DEFAULT);
        let big = square(300.0);
        cache.prepare(&big, Affine::IDENTITY, PictureHints::default());
        cache.sweep();
        cache.prepare(&big, Affine::IDENTITY, PictureHints::default());
        cache.sweep();
        assert!(cache.fallback().is_cached(&big, Affine::IDENTITY));
        cache.sweep();
        assert!(!cache.fallback().is_cached(&big, Affine::IDENTITY));
        assert_eq!(cache.stats().evicted, 1);
    }
}
