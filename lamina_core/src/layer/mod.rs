// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor's retained layer tree.
//!
//! The layer tree is the output of painting and the input of compositing.
//! It is separate from the node tree: only repaint boundaries and
//! composited clips or transforms produce layers, and the leaves are
//! recorded [`Picture`](crate::picture::Picture)s.
//!
//! Each frame the compositor runs two passes over it:
//!
//! 1. [`LayerTree::preroll`] computes paint bounds bottom-up and registers
//!    every picture with a [`PictureCache`] under the matrix it will be drawn
//!    with.
//! 2. [`LayerTree::paint`] walks top-down, skipping subtrees with empty
//!    bounds, and draws each picture either from the cache or by playback.

mod cache;
mod composite;
mod kind;
mod traverse;
mod tree;

pub use cache::{CacheStats, NoCache, PictureCache};
pub use kind::{LayerKind, PictureHints, PictureLayer};
pub use traverse::Children;
pub use tree::LayerTree;
