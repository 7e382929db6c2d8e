// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The retained node tree.
//!
//! Nodes describe what to draw: a [`NodeKind`] for content and a [`Style`]
//! for size, position, decoration, and compositing hints. Each node carries
//! three dirty flags, one per pipeline phase:
//!
//! - **layout**, propagated up to the nearest relayout boundary,
//! - **compositing bits**, propagated up while neither node nor parent is a
//!   settled repaint boundary,
//! - **paint**, propagated up to the nearest repaint boundary that owns a
//!   layer.
//!
//! Only the node where propagation stops is queued; the
//! [`RenderPipeline`](crate::pipeline::RenderPipeline) flushes the queues
//! once per frame.

mod dirty;
mod kind;
mod layout;
pub(crate) mod paint;
mod style;
mod tree;

pub(crate) use dirty::release_layer;
pub use kind::{CustomPaint, NodeKind, PaintFn, ShapeGeometry, TextContent};
pub use layout::{BoxConstraints, Measure, MeasureMode};
pub use style::{
    Axis, Dimension, ObserverId, Position, Style, StyleChanges, StyleEffect, StyleField,
    StyleObserver,
};
pub use tree::NodeTree;
