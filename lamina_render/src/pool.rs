// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A bounded free list of offscreen surfaces.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use lamina_core::error::SurfaceError;
use lamina_core::surface::{Surface, SurfaceProvider, SurfaceSize};

use crate::config::SurfacePoolConfig;

/// Recycles offscreen surfaces for raster caches.
///
/// [`take`](Self::take) hands out the most recently returned surface, so a
/// surface given back at the end of one frame is the first one reused in
/// the next. At most `capacity` idle surfaces are kept; extras are dropped.
pub struct SurfacePool {
    provider: Box<dyn SurfaceProvider>,
    free: Vec<Box<dyn Surface>>,
    capacity: usize,
    created: u32,
}

impl fmt::Debug for SurfacePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfacePool")
            .field("idle", &self.free.len())
            .field("capacity", &self.capacity)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl SurfacePool {
    /// Creates an empty pool that allocates through `provider`.
    #[must_use]
    pub fn new(provider: Box<dyn SurfaceProvider>, config: SurfacePoolConfig) -> Self {
        Self {
            provider,
            free: Vec::new(),
            capacity: config.capacity,
            created: 0,
        }
    }

    /// Checks out a surface sized for a frame of `size`.
    ///
    /// # Errors
    ///
    /// Propagates allocation and resize failures from the backend.
    pub fn take(&mut self, size: SurfaceSize) -> Result<Box<dyn Surface>, SurfaceError> {
        let mut surface = match self.free.pop() {
            Some(surface) => surface,
            None => {
                self.created += 1;
                self.provider.create_surface(size)?
            }
        };
        surface.acquire_frame(size)?;
        Ok(surface)
    }

    /// Returns a surface to the pool.
    pub fn give(&mut self, surface: Box<dyn Surface>) {
        if self.free.len() < self.capacity {
            self.free.push(surface);
        }
    }

    /// Number of idle surfaces.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    /// Most idle surfaces the pool keeps.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Surfaces allocated through the provider so far.
    #[must_use]
    pub fn created(&self) -> u32 {
        self.created
    }
}
