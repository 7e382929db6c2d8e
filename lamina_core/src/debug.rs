// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide debug overlay flags.
//!
//! The flags are read only while painting and compositing. They add
//! diagnostic drawing on top of normal output and never change layout.
//! The value lives in a single atomic, so it is safe to toggle from any
//! thread, but the pipeline itself only reads it on the frame thread.

use core::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;

static FLAGS: AtomicU32 = AtomicU32::new(0);

bitflags! {
    /// A set of debug overlays.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct DebugFlags: u32 {
        /// Outline every node's box.
        const NODE_BOUNDS = 1 << 0;
        /// Outline every layer's paint bounds.
        const LAYER_BOUNDS = 1 << 1;
        /// Label every node with its slot index.
        const NODE_ID = 1 << 2;
        /// Outline every line of text.
        const TEXT_LINE_BOUNDS = 1 << 3;
        /// Tint pictures drawn from a raster cache.
        const CACHE_WATERMARK = 1 << 4;
        /// Outline every path shape.
        const PATH_BOUNDS = 1 << 5;
    }
}

/// Returns the current process-wide flags.
#[must_use]
pub fn debug_flags() -> DebugFlags {
    DebugFlags::from_bits_truncate(FLAGS.load(Ordering::Relaxed))
}

/// Replaces the process-wide flags.
pub fn set_debug_flags(flags: DebugFlags) {
    FLAGS.store(flags.bits(), Ordering::Relaxed);
}

/// Turns every overlay off.
pub fn reset_debug_flags() {
    set_debug_flags(DebugFlags::empty());
}
