// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instrumentation for the frame loop.
//!
//! [`TraceSink`] has one method per event with no-op defaults, so a sink
//! implements only what it cares about. [`Tracer`] wraps an optional
//! `&mut dyn TraceSink`; without the `trace` feature every `Tracer` method
//! compiles to nothing, and with it each call costs one branch.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps and work counts while a
//! frame runs and produces a [`FrameSummary`] at the end.
//!
//! Human-readable logging of isolated failures goes through `tracing`
//! instead; these events are for frame timing.

use crate::layer::CacheStats;
use crate::surface::SurfaceSize;
use crate::time::{Duration, HostTime};

/// A stage of the frame loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhaseKind {
    /// Enter-frame callbacks.
    EnterFrame,
    /// Layout flush.
    Layout,
    /// Compositing-bits flush.
    Compositing,
    /// Paint flush (recording pictures and building layers).
    Paint,
    /// Layer-tree preroll (bounds and cache registration).
    Preroll,
    /// Layer-tree paint onto the frame canvas.
    Raster,
    /// Handing the finished frame to the surface.
    Submit,
}

impl PhaseKind {
    /// All phases in frame order.
    pub const ALL: [Self; 7] = [
        Self::EnterFrame,
        Self::Layout,
        Self::Compositing,
        Self::Paint,
        Self::Preroll,
        Self::Raster,
        Self::Submit,
    ];

    /// A short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EnterFrame => "enter-frame",
            Self::Layout => "layout",
            Self::Compositing => "compositing",
            Self::Paint => "paint",
            Self::Preroll => "preroll",
            Self::Raster => "raster",
            Self::Submit => "submit",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::EnterFrame => 0,
            Self::Layout => 1,
            Self::Compositing => 2,
            Self::Paint => 3,
            Self::Preroll => 4,
            Self::Raster => 5,
            Self::Submit => 6,
        }
    }
}

/// Emitted when a frame starts.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Time handed to the frame by the scheduler.
    pub now: HostTime,
    /// Size of the frame being drawn.
    pub size: SurfaceSize,
}

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
    /// Nodes processed by a flush phase; zero for compositor phases.
    pub work: u32,
}

/// Raster cache counters reported after the end-of-frame sweep.
#[derive(Clone, Copy, Debug)]
pub struct CacheStatsEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The counters.
    pub stats: CacheStats,
}

/// Emitted when a frame is handed to the surface.
#[derive(Clone, Copy, Debug)]
pub struct SubmitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time of submission.
    pub submitted_at: HostTime,
}

/// Per-frame summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Time handed to the frame by the scheduler.
    pub now: HostTime,
    /// Duration of each phase, indexed in [`PhaseKind::ALL`] order. Zero if
    /// the phase was not measured.
    pub phase_durations: [Duration; 7],
    /// Work count reported by each phase, in the same order.
    pub phase_work: [u32; 7],
    /// Raster cache counters.
    pub cache: CacheStats,
}

impl FrameSummary {
    /// Duration of one phase.
    #[must_use]
    pub const fn duration(&self, phase: PhaseKind) -> Duration {
        self.phase_durations[phase.index()]
    }

    /// Work reported by one phase.
    #[must_use]
    pub const fn work(&self, phase: PhaseKind) -> u32 {
        self.phase_work[phase.index()]
    }

    /// Sum of all phase durations.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.phase_durations
            .iter()
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(*d))
    }
}

/// Receives trace events from the frame loop.
///
/// All methods default to no-ops.
pub trait TraceSink {
    /// Called when a frame starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after the raster cache sweep.
    fn on_cache_stats(&mut self, e: &CacheStatsEvent) {
        _ = e;
    }

    /// Called when a frame is submitted.
    fn on_submit(&mut self, e: &SubmitEvent) {
        _ = e;
    }

    /// Called with the per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Thin wrapper around an optional [`TraceSink`].
///
/// Without the `trace` feature every method compiles to nothing.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to `sink`.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        dispatch!(self, on_frame_begin, e);
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        dispatch!(self, on_phase_begin, e);
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        dispatch!(self, on_phase_end, e);
    }

    /// Emits a [`CacheStatsEvent`].
    #[inline]
    pub fn cache_stats(&mut self, e: &CacheStatsEvent) {
        dispatch!(self, on_cache_stats, e);
    }

    /// Emits a [`SubmitEvent`].
    #[inline]
    pub fn submit(&mut self, e: &SubmitEvent) {
        dispatch!(self, on_submit, e);
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        dispatch!(self, on_frame_summary, s);
    }
}

/// Collects phase timestamps during a frame and produces a
/// [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    now: HostTime,
    phase_starts: [Option<HostTime>; 7],
    phase_ends: [Option<HostTime>; 7],
    phase_work: [u32; 7],
    cache: CacheStats,
}

impl FrameSummaryBuilder {
    /// Starts a summary for one frame.
    #[must_use]
    pub fn new(frame_index: u64, now: HostTime) -> Self {
        Self {
            frame_index,
            now,
            phase_starts: [None; 7],
            phase_ends: [None; 7],
            phase_work: [0; 7],
            cache: CacheStats::default(),
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase.index()] = Some(t);
    }

    /// Records the end of a phase and the work it did.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime, work: u32) {
        self.phase_ends[phase.index()] = Some(t);
        self.phase_work[phase.index()] = work;
    }

    /// Records the cache counters for the frame.
    pub fn set_cache_stats(&mut self, stats: CacheStats) {
        self.cache = stats;
    }

    /// Consumes the builder.
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        let mut phase_durations = [Duration::ZERO; 7];
        for phase in PhaseKind::ALL {
            let i = phase.index();
            if let (Some(start), Some(end)) = (self.phase_starts[i], self.phase_ends[i]) {
                phase_durations[i] = end.saturating_duration_since(start);
            }
        }
        FrameSummary {
            frame_index: self.frame_index,
            now: self.now,
            phase_durations,
            phase_work: self.phase_work,
            cache: self.cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_begin(&FrameBeginEvent {
            frame_index: 1,
            now: HostTime(0),
            size: SurfaceSize::new(1, 1),
        });
        tracer.submit(&SubmitEvent {
            frame_index: 1,
            submitted_at: HostTime(5),
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(42, HostTime(1_000));
        builder.phase_begin(PhaseKind::Layout, HostTime(1_000));
        builder.phase_end(PhaseKind::Layout, HostTime(1_400), 3);
        builder.phase_begin(PhaseKind::Raster, HostTime(1_400));
        builder.phase_end(PhaseKind::Raster, HostTime(2_900), 0);
        builder.set_cache_stats(CacheStats {
            hits: 2,
            ..CacheStats::default()
        });

        let summary = builder.finish();
        assert_eq!(summary.frame_index, 42);
        assert_eq!(summary.duration(PhaseKind::Layout), Duration(400));
        assert_eq!(summary.work(PhaseKind::Layout), 3);
        assert_eq!(summary.duration(PhaseKind::Raster), Duration(1_500));
        assert_eq!(summary.duration(PhaseKind::Paint), Duration::ZERO);
        assert_eq!(summary.total(), Duration(1_900));
        assert_eq!(summary.cache.hits, 2);
    }

    #[test]
    fn phase_names_are_distinct() {
        for (i, a) in PhaseKind::ALL.iter().enumerate() {
            assert_eq!(a.index(), i);
            for b in &PhaseKind::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct PhaseLog(Vec<PhaseKind>);
        impl TraceSink for PhaseLog {
            fn on_phase_end(&mut self, e: &PhaseEndEvent) {
                self.0.push(e.phase);
            }
        }

        let mut sink = PhaseLog(Vec::new());
        let mut tracer = Tracer::new(&mut sink);
        tracer.phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Paint,
            timestamp: HostTime(0),
            work: 1,
        });
        drop(tracer);
        assert_eq!(sink.0, [PhaseKind::Paint]);
    }
}
