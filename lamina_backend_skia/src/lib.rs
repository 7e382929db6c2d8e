// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software backend for Lamina, drawn with [`tiny_skia`].
//!
//! - [`SkiaCanvas`] implements the [`Canvas`] trait over an RGBA pixmap.
//! - [`SkiaSurface`] and [`SkiaSurfaceProvider`] give the rasterizer and the
//!   raster caches something to draw into.
//! - [`StdClock`] is a wall-clock [`HostClock`] for frame timing.
//!
//! Everything here runs on the CPU and needs `std`. Text is drawn as
//! placeholder glyph boxes that match the layout metrics in
//! [`lamina_core::canvas::text_bounds`].
//!
//! [`Canvas`]: lamina_core::canvas::Canvas
//! [`HostClock`]: lamina_core::time::HostClock

mod canvas;
mod surface;
mod time;

pub use canvas::SkiaCanvas;
pub use surface::{MAX_SIDE, SkiaSurface, SkiaSurfaceProvider};
pub use time::StdClock;
