// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handle types shared by the node and layer arenas.

use core::fmt;

/// Sentinel value meaning "no node" or "no layer" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a node in a [`NodeTree`](crate::node::NodeTree).
///
/// Carries a slot index and a generation counter so that handles to
/// destroyed nodes are detected when their slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to a layer in a [`LayerTree`](crate::layer::LayerTree).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl LayerId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}@gen{})", self.idx, self.generation)
    }
}

/// Identity of a recorded [`Picture`](crate::picture::Picture).
///
/// Unique for the lifetime of the process; raster caches key on it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PictureId(pub u64);

impl fmt::Debug for PictureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PictureId({})", self.0)
    }
}

/// An opaque reference to a drawing surface owned by a backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({})", self.0)
    }
}

/// Allocation and generation bookkeeping shared by the struct-of-arrays
/// arenas.
///
/// The arenas keep their per-slot property columns themselves; this type
/// only hands out slots and validates handles.
#[derive(Clone, Debug, Default)]
pub(crate) struct Slots {
    generation: alloc::vec::Vec<u32>,
    alive: alloc::vec::Vec<bool>,
    free_list: alloc::vec::Vec<u32>,
}

/// Result of [`Slots::allocate`].
pub(crate) enum Slot {
    /// A previously freed slot; the caller resets its columns.
    Reused(u32, u32),
    /// A new slot at the end; the caller pushes onto its columns.
    Fresh(u32),
}

impl Slots {
    pub(crate) fn allocate(&mut self) -> Slot {
        if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.alive[i] = true;
            Slot::Reused(idx, self.generation[i])
        } else {
            let idx = u32::try_from(self.generation.len()).unwrap_or(INVALID);
            assert!(idx != INVALID, "arena slot space exhausted");
            self.generation.push(0);
            self.alive.push(true);
            Slot::Fresh(idx)
        }
    }

    pub(crate) fn free(&mut self, idx: u32) {
        let i = idx as usize;
        self.alive[i] = false;
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free_list.push(idx);
    }

    pub(crate) fn is_alive(&self, idx: u32, generation: u32) -> bool {
        let i = idx as usize;
        i < self.generation.len() && self.alive[i] && self.generation[i] == generation
    }

    pub(crate) fn generation(&self, idx: u32) -> u32 {
        self.generation[idx as usize]
    }

    pub(crate) fn live_count(&self) -> usize {
        self.generation.len() - self.free_list.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.generation.len()
    }
}
