// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster caching, compositing, and frame driving for Lamina.
//!
//! [`lamina_core`] turns a node tree into a layer tree. This crate puts that
//! layer tree on a surface:
//!
//! - [`RasterCache`] memoizes pictures that are drawn unchanged frame after
//!   frame as offscreen images, one pooled surface each.
//! - [`AtlasRasterCache`] packs small cached pictures into shared pages and
//!   falls back to a [`RasterCache`] for the rest.
//! - [`SurfacePool`] recycles the offscreen surfaces both caches draw into.
//! - [`CompositorContext`] runs the begin / preroll / paint / end protocol
//!   against a cache.
//! - [`Rasterizer`] owns the output surface and presents frames.
//! - [`FrameDriver`] ties a [`RenderPipeline`] to a [`Rasterizer`] and
//!   traces every phase of a frame.
//!
//! Every cache and pool knob lives in [`config`].
//!
//! # Caching rules
//!
//! A picture is worth caching when it is drawn under the same scale and
//! rotation in several consecutive frames, has enough draw commands (or any
//! text), and is not flagged as about to change. Entries are keyed by
//! picture identity and the linear part of the paint matrix, so moving a
//! picture reuses its image. An entry that goes one frame without being
//! prepared or drawn is evicted and its surface returned to the pool.
//!
//! # Features
//!
//! - `std` (disabled by default): enables `std` in dependencies.
//! - `trace`: forwards frame-phase events to a [`TraceSink`].
//! - `serde`: derives `Serialize`/`Deserialize` for the config structs.
//!
//! [`RenderPipeline`]: lamina_core::pipeline::RenderPipeline
//! [`TraceSink`]: lamina_core::trace::TraceSink

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod atlas;
mod compositor;
pub mod config;
mod driver;
mod pool;
mod raster_cache;
mod rasterizer;

pub use atlas::AtlasRasterCache;
pub use compositor::CompositorContext;
pub use config::{AtlasConfig, PipelineConfig, RasterCacheConfig, SurfacePoolConfig};
pub use driver::FrameDriver;
pub use pool::SurfacePool;
pub use raster_cache::RasterCache;
pub use rasterizer::{RasterError, Rasterizer};
