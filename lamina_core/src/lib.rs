// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained node tree, dirty-tracking render pipeline, and layer tree for
//! the Lamina renderer.
//!
//! `lamina_core` holds everything between "the host changed a node" and "a
//! layer tree of recorded pictures is ready to composite". It is `no_std`
//! compatible (with `alloc`), stores both trees as struct-of-arrays arenas
//! addressed by generational handles, and never touches pixels itself.
//!
//! # Architecture
//!
//! ```text
//!   host mutation ──► mark dirty ──► queue ──► FrameScheduler::schedule_frame
//!                                                         │
//!                 ┌───────────────────────────────────────┘
//!                 ▼
//!   RenderPipeline::flush
//!     enter-frame ─► layout ─► compositing bits ─► paint
//!                                                    │
//!                 ┌──────────────────────────────────┘
//!                 ▼
//!   LayerTree (Offset / Transform / Clip / Picture layers)
//!                 │
//!                 ▼
//!   preroll + paint onto a Canvas  (lamina_render)
//! ```
//!
//! **[`node`]**: the retained node tree, typed styles with per-field
//! observers, layout constraints and the measure capability.
//!
//! **[`pipeline`]**: [`RenderPipeline`](pipeline::RenderPipeline), which owns
//! both trees and the dirty queues and runs the per-frame flush.
//!
//! **[`painting`]**: [`PaintingContext`](painting::PaintingContext), which
//! records node paint into picture layers and composites repaint
//! boundaries.
//!
//! **[`layer`]**: the compositor's layer tree with its preroll and paint
//! passes, and the [`PictureCache`](layer::PictureCache) seam.
//!
//! **[`picture`]**: immutable recorded drawing and the recorder that makes
//! it.
//!
//! **[`canvas`]**, **[`surface`]**, **[`scheduler`]**: the capabilities a
//! host supplies: drawing, drawable buffers, and frame timing.
//!
//! **[`debug`]**: process-wide debug overlay flags.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) and event types for
//! frame-loop instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `serde` (disabled by default): Derives `Serialize` and `Deserialize` for
//!   styles, constraints, and statistics.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod canvas;
pub mod debug;
pub mod error;
pub mod geometry;
pub mod id;
pub mod layer;
pub mod node;
pub mod painting;
pub mod picture;
pub mod pipeline;
pub mod scheduler;
pub mod surface;
pub mod time;
pub mod trace;
