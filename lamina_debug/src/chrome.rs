// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes
//! [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use lamina_core::time::HostTime;
use lamina_core::trace::PhaseKind;
use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Phases become begin/end pairs; cache counters become a counter track.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameBegin(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameBegin",
                    "cat": "Frame",
                    "ts": micros(e.now),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "width": e.size.width,
                        "height": e.size.height,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": micros(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": micros(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                        "work": e.work,
                    }
                }));
            }
            RecordedEvent::CacheStats(e) => {
                // Counter events need a timestamp; place them at the last
                // event seen.
                let ts = events.last().map_or(Value::from(0), |v| v["ts"].clone());
                events.push(json!({
                    "ph": "C",
                    "name": "RasterCache",
                    "cat": "Cache",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "built": e.stats.built,
                        "hits": e.stats.hits,
                        "evicted": e.stats.evicted,
                        "entries": e.stats.entries,
                    }
                }));
            }
            RecordedEvent::Submit(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Submit",
                    "cat": "Frame",
                    "ts": micros(e.submitted_at),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                let mut durations = serde_json::Map::new();
                for phase in PhaseKind::ALL {
                    durations.insert(
                        format!("{}_us", phase.name()),
                        json!(s.duration(phase).micros()),
                    );
                }
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": micros(s.now),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": s.frame_index,
                        "total_us": s.total().micros(),
                        "phases": durations,
                        "cache_hits": s.cache.hits,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn micros(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}
