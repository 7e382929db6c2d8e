// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time.
//!
//! [`HostTime`] is a point on the host's monotonic clock in nanoseconds and
//! [`Duration`] is a span in the same unit. The pipeline never reads a clock
//! itself: the frame scheduler hands it a timestamp, and phase timing comes
//! from a [`HostClock`] supplied by the embedder.

use core::cell::Cell;
use core::fmt;
use core::ops::{Add, Sub};

/// A point in time on the host's monotonic clock, in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the time elapsed since `earlier`, or zero if `earlier` is
    /// after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({}ns)", self.0)
    }
}

/// A span of host time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the duration in microseconds, rounded down.
    #[inline]
    #[must_use]
    pub const fn micros(self) -> u64 {
        self.0 / 1_000
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}ns)", self.0)
    }
}

/// A source of monotonic timestamps.
///
/// Backends provide a real clock; tests use [`ManualClock`]. Any
/// `Fn() -> HostTime` closure is also a clock.
pub trait HostClock {
    /// Returns the current time.
    fn now(&self) -> HostTime;
}

impl<F: Fn() -> HostTime> HostClock for F {
    fn now(&self) -> HostTime {
        self()
    }
}

/// A clock that only moves when told to.
///
/// Every call to [`now`](HostClock::now) also advances the clock by the
/// configured step, so consecutive phase timestamps are distinct.
#[derive(Debug, Default)]
pub struct ManualClock {
    current: Cell<u64>,
    step: u64,
}

impl ManualClock {
    /// Creates a clock starting at `start` that advances by `step` on each
    /// read.
    #[must_use]
    pub const fn new(start: HostTime, step: Duration) -> Self {
        Self {
            current: Cell::new(start.0),
            step: step.0,
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by.0);
    }
}

impl HostClock for ManualClock {
    fn now(&self) -> HostTime {
        let t = self.current.get();
        self.current.set(t + self.step);
        HostTime(t)
    }
}
