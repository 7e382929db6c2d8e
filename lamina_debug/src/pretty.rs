// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in microseconds.

use std::io::Write;

use lamina_core::time::{Duration, HostTime};
use lamina_core::trace::{
    CacheStatsEvent, FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    SubmitEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write)
/// destination.
///
/// Phase begin events are only printed when `verbose` is set; the end event
/// already carries the phase's work count.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Also prints phase begin events.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

fn dur_us(d: Duration) -> f64 {
    d.nanos() as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] #{} now={:.1}µs size={}x{}",
            e.frame_index,
            us(e.now),
            e.size.width,
            e.size.height,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs work={}",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp),
            e.work,
        );
    }

    fn on_cache_stats(&mut self, e: &CacheStatsEvent) {
        let s = e.stats;
        let _ = writeln!(
            self.writer,
            "[cache] frame={} prepared={} built={} hits={} evicted={} failed={} entries={}",
            e.frame_index, s.prepared, s.built, s.hits, s.evicted, s.failed, s.entries,
        );
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        let _ = writeln!(
            self.writer,
            "[submit] frame={} at {:.1}µs",
            e.frame_index,
            us(e.submitted_at),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = write!(
            self.writer,
            "[summary] frame={} total={:.1}µs",
            s.frame_index,
            dur_us(s.total()),
        );
        for phase in PhaseKind::ALL {
            let _ = write!(
                self.writer,
                " {}={:.1}µs",
                phase.name(),
                dur_us(s.duration(phase))
            );
        }
        let _ = writeln!(self.writer);
    }
}
