// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host clock backed by [`std::time::Instant`].

use std::time::Instant;

use lamina_core::time::{HostClock, HostTime};

/// A monotonic clock counting nanoseconds since it was created.
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    /// Starts a clock at [`HostTime(0)`](HostTime).
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for StdClock {
    fn now(&self) -> HostTime {
        let nanos = self.origin.elapsed().as_nanos();
        HostTime(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
