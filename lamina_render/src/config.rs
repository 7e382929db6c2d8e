// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tuning knobs for caching and compositing.
//!
//! Every struct has a `const DEFAULT` so hosts can build configurations in
//! `const` context, and with the `serde` feature every struct can be loaded
//! from a config file. Missing fields fall back to their defaults.

use lamina_core::canvas::Color;

/// Admission and budget rules for [`RasterCache`](crate::RasterCache).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RasterCacheConfig {
    /// Master switch. When `false` nothing is ever cached.
    pub enabled: bool,
    /// Number of frames a picture must be drawn under the same matrix
    /// before it is rasterized.
    pub access_threshold: u32,
    /// Rasterizations allowed per frame.
    pub max_builds_per_frame: u32,
    /// Pictures with fewer draw commands than this, and no text, are not
    /// worth caching.
    pub min_op_count: usize,
    /// Largest width or height, in device pixels, of a cached image.
    pub max_side: u32,
    /// Largest area, in device pixels, of a cached image.
    pub max_area: u64,
}

impl RasterCacheConfig {
    /// The default configuration.
    pub const DEFAULT: Self = Self {
        enabled: true,
        access_threshold: 3,
        max_builds_per_frame: 1,
        min_op_count: 5,
        max_side: 8192,
        max_area: 3840 * 2160 / 5,
    };

    /// A configuration that never caches.
    pub const DISABLED: Self = Self {
        enabled: false,
        ..Self::DEFAULT
    };
}

impl Default for RasterCacheConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Page layout for [`AtlasRasterCache`](crate::AtlasRasterCache).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AtlasConfig {
    /// Width and height of each square page in pixels.
    pub page_size: u32,
    /// Most pages kept alive at once.
    pub max_pages: usize,
    /// Empty pixels kept between neighbouring items.
    pub padding: u32,
    /// Items wider or taller than this go to the per-picture fallback.
    pub max_item_side: u32,
}

impl AtlasConfig {
    /// The default configuration.
    pub const DEFAULT: Self = Self {
        page_size: 1024,
        max_pages: 4,
        padding: 1,
        max_item_side: 256,
    };
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Size of the offscreen [`SurfacePool`](crate::SurfacePool).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SurfacePoolConfig {
    /// Most idle surfaces kept for reuse. Extra surfaces are dropped.
    pub capacity: usize,
}

impl SurfacePoolConfig {
    /// The default configuration.
    pub const DEFAULT: Self = Self { capacity: 8 };
}

impl Default for SurfacePoolConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything [`CompositorContext::from_config`] and the
/// [`FrameDriver`](crate::FrameDriver) need.
///
/// [`CompositorContext::from_config`]: crate::CompositorContext::from_config
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Color the frame is cleared to before compositing.
    pub clear_color: Color,
    /// Raster cache admission rules.
    pub raster_cache: RasterCacheConfig,
    /// Offscreen surface pool size.
    pub surface_pool: SurfacePoolConfig,
    /// Pack cached pictures into atlas pages. `None` gives every cached
    /// picture its own surface.
    pub atlas: Option<AtlasConfig>,
}

impl PipelineConfig {
    /// The default configuration: white background, per-picture caching.
    pub const DEFAULT: Self = Self {
        clear_color: Color::WHITE,
        raster_cache: RasterCacheConfig::DEFAULT,
        surface_pool: SurfacePoolConfig::DEFAULT,
        atlas: None,
    };
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = RasterCacheConfig::default();
        assert_eq!(c.access_threshold, 3);
        assert_eq!(c.max_builds_per_frame, 1);
        assert_eq!(c.min_op_count, 5);
        assert_eq!(c.max_side, 8192);
        assert_eq!(c.max_area, 1_658_880);
        assert!(!RasterCacheConfig::DISABLED.enabled);
        assert_eq!(PipelineConfig::default().atlas, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_partial_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [raster_cache]
            access_threshold = 2

            [atlas]
            page_size = 512
            "#,
        )
        .unwrap();
        assert_eq!(config.raster_cache.access_threshold, 2);
        assert_eq!(config.raster_cache.max_side, 8192);
        assert_eq!(
            config.atlas,
            Some(AtlasConfig {
                page_size: 512,
                ..AtlasConfig::DEFAULT
            })
        );
        assert_eq!(config.clear_color, Color::WHITE);
    }
}
