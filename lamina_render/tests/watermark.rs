// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cache watermark overlay.
//!
//! Debug flags are process-wide, so this lives in its own test binary.

use std::sync::Arc;

use kurbo::{Affine, Rect};
use lamina_backend_skia::{SkiaCanvas, SkiaSurfaceProvider};
use lamina_core::canvas::{Canvas, Color, Paint};
use lamina_core::debug::{DebugFlags, reset_debug_flags, set_debug_flags};
use lamina_core::layer::{PictureCache, PictureHints};
use lamina_core::picture::{Picture, PictureRecorder};
use lamina_render::{RasterCache, RasterCacheConfig, SurfacePool, SurfacePoolConfig};

fn pixel(canvas: &SkiaCanvas, x: u32, y: u32) -> [u8; 4] {
    let p = canvas.pixmap().pixel(x, y).unwrap();
    [p.red(), p.green(), p.blue(), p.alpha()]
}

/// Two squares with a transparent gap between them.
fn picture() -> Arc<Picture> {
    let mut rec = PictureRecorder::new();
    for _ in 0..3 {
        rec.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), &Paint::fill(Color::BLACK));
        rec.draw_rect(Rect::new(8.0, 0.0, 12.0, 4.0), &Paint::fill(Color::BLACK));
    }
    Arc::new(rec.finish())
}

fn draw_once(cache: &mut RasterCache, picture: &Arc<Picture>) -> SkiaCanvas {
    let mut canvas = SkiaCanvas::new(16, 8).unwrap();
    canvas.clear(Color::WHITE);
    cache.prepare(picture, Affine::IDENTITY, PictureHints::default());
    cache.process_jobs();
    assert!(
        cache.draw_picture(&mut canvas, picture, Affine::IDENTITY),
        "the picture should be cached on its first frame"
    );
    cache.sweep();
    canvas
}

#[test]
fn watermark_tints_cached_pictures_only_while_enabled() {
    let mut cache = RasterCache::new(
        RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::DEFAULT
        },
        SurfacePool::new(Box::new(SkiaSurfaceProvider), SurfacePoolConfig::DEFAULT),
    );
    let picture = picture();

    let plain = draw_once(&mut cache, &picture);
    assert_eq!(pixel(&plain, 6, 1), [255, 255, 255, 255]);
    assert_eq!(pixel(&plain, 14, 1), [255, 255, 255, 255]);

    set_debug_flags(DebugFlags::CACHE_WATERMARK);
    let tinted = draw_once(&mut cache, &picture);
    reset_debug_flags();

    let [r, g, b, a] = pixel(&tinted, 6, 1);
    assert!(g > r && g > b, "gap inside the cached image is tinted green");
    assert_eq!(a, 255);
    assert_eq!(
        pixel(&tinted, 14, 1),
        [255, 255, 255, 255],
        "outside the cached image stays untouched"
    );

    let again = draw_once(&mut cache, &picture);
    assert_eq!(pixel(&again, 6, 1), [255, 255, 255, 255]);
}
