// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use lamina_core::layer::CacheStats;
use lamina_core::surface::SurfaceSize;
use lamina_core::time::{Duration, HostTime};
use lamina_core::trace::{
    CacheStatsEvent, FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    SubmitEvent, TraceSink,
};

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_CACHE_STATS: u8 = 4;
const TAG_SUBMIT: u8 = 5;
const TAG_FRAME_SUMMARY: u8 = 6;

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Drops everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_phase(&mut self, p: PhaseKind) {
        let index = PhaseKind::ALL.iter().position(|k| *k == p).unwrap_or(0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "there are seven phases"
        )]
        self.write_u8(index as u8);
    }

    fn write_stats(&mut self, s: &CacheStats) {
        for v in [s.prepared, s.built, s.hits, s.evicted, s.failed, s.entries] {
            self.write_u32(v);
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.nanos());
        self.write_u32(e.size.width);
        self.write_u32(e.size.height);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
        self.write_u32(e.work);
    }

    fn on_cache_stats(&mut self, e: &CacheStatsEvent) {
        self.write_u8(TAG_CACHE_STATS);
        self.write_u64(e.frame_index);
        self.write_stats(&e.stats);
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        self.write_u8(TAG_SUBMIT);
        self.write_u64(e.frame_index);
        self.write_u64(e.submitted_at.nanos());
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u64(s.now.nanos());
        for d in s.phase_durations {
            self.write_u64(d.nanos());
        }
        for w in s.phase_work {
            self.write_u32(w);
        }
        self.write_stats(&s.cache);
    }
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`CacheStatsEvent`].
    CacheStats(CacheStatsEvent),
    /// A [`SubmitEvent`].
    Submit(SubmitEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Decoding stops at the first unknown tag or truncated record.
#[must_use]
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.read_array::<1>()?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_stats(&mut self) -> Option<CacheStats> {
        Some(CacheStats {
            prepared: self.read_u32()?,
            built: self.read_u32()?,
            hits: self.read_u32()?,
            evicted: self.read_u32()?,
            failed: self.read_u32()?,
            entries: self.read_u32()?,
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            size: SurfaceSize::new(self.read_u32()?, self.read_u32()?),
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
            work: self.read_u32()?,
        }))
    }

    fn decode_cache_stats(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CacheStats(CacheStatsEvent {
            frame_index: self.read_u64()?,
            stats: self.read_stats()?,
        }))
    }

    fn decode_submit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Submit(SubmitEvent {
            frame_index: self.read_u64()?,
            submitted_at: HostTime(self.read_u64()?),
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let now = HostTime(self.read_u64()?);
        let mut phase_durations = [Duration::ZERO; 7];
        for d in &mut phase_durations {
            *d = Duration(self.read_u64()?);
        }
        let mut phase_work = [0; 7];
        for w in &mut phase_work {
            *w = self.read_u32()?;
        }
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index,
            now,
            phase_durations,
            phase_work,
            cache: self.read_stats()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let event = match self.read_u8()? {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_CACHE_STATS => self.decode_cache_stats(),
            TAG_SUBMIT => self.decode_submit(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None,
        };
        if event.is_none() {
            self.pos = self.data.len();
        }
        event
    }
}
