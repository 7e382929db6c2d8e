// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One object that runs whole frames, from dirty queues to pixels.

use alloc::boxed::Box;
use core::fmt;

use kurbo::Size;
use lamina_core::node::BoxConstraints;
use lamina_core::pipeline::RenderPipeline;
use lamina_core::surface::SurfaceSize;
use lamina_core::time::{HostClock, HostTime};
use lamina_core::trace::{
    CacheStatsEvent, FrameBeginEvent, FrameSummary, FrameSummaryBuilder, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, SubmitEvent, TraceSink, Tracer,
};
use tracing::debug;

use crate::rasterizer::{RasterError, Rasterizer};

/// Timestamps one phase into both the tracer and the summary.
struct PhaseTimer<'a, 'b> {
    clock: &'a dyn HostClock,
    tracer: &'a mut Tracer<'b>,
    summary: &'a mut FrameSummaryBuilder,
    frame_index: u64,
}

impl PhaseTimer<'_, '_> {
    fn run<T>(&mut self, phase: PhaseKind, f: impl FnOnce() -> (T, u32)) -> T {
        let frame_index = self.frame_index;
        let start = self.clock.now();
        self.tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase,
            timestamp: start,
        });
        self.summary.phase_begin(phase, start);
        let (value, work) = f();
        let end = self.clock.now();
        self.tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase,
            timestamp: end,
            work,
        });
        self.summary.phase_end(phase, end, work);
        value
    }
}

/// Runs complete frames: the four pipeline flushes, then preroll, raster,
/// and submit.
///
/// The driver does not decide when to draw. Hosts call
/// [`draw_frame`](Self::draw_frame) from their frame callback, typically
/// when [`needs_frame`](Self::needs_frame) is true.
pub struct FrameDriver {
    pipeline: RenderPipeline,
    rasterizer: Rasterizer,
    clock: Box<dyn HostClock>,
    viewport: SurfaceSize,
    frame_index: u64,
}

impl fmt::Debug for FrameDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDriver")
            .field("pipeline", &self.pipeline)
            .field("rasterizer", &self.rasterizer)
            .field("viewport", &self.viewport)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl FrameDriver {
    /// Creates a driver drawing frames of `viewport` pixels.
    ///
    /// The pipeline's root is laid out with tight constraints matching the
    /// viewport in root-layer units.
    #[must_use]
    pub fn new(
        pipeline: RenderPipeline,
        rasterizer: Rasterizer,
        clock: Box<dyn HostClock>,
        viewport: SurfaceSize,
    ) -> Self {
        let mut driver = Self {
            pipeline,
            rasterizer,
            clock,
            viewport,
            frame_index: 0,
        };
        driver.set_viewport(viewport);
        driver
    }

    /// The render pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Mutable access to the render pipeline, for building and editing the
    /// node tree.
    pub fn pipeline_mut(&mut self) -> &mut RenderPipeline {
        &mut self.pipeline
    }

    /// The rasterizer.
    #[must_use]
    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    /// Mutable access to the rasterizer.
    pub fn rasterizer_mut(&mut self) -> &mut Rasterizer {
        &mut self.rasterizer
    }

    /// Current frame size in pixels.
    #[must_use]
    pub fn viewport(&self) -> SurfaceSize {
        self.viewport
    }

    /// Index the next frame will get.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Resizes the frame and relayouts the root to fill it.
    ///
    /// The root transform's scale converts pixels to root-layer units.
    pub fn set_viewport(&mut self, viewport: SurfaceSize) {
        self.viewport = viewport;
        let [sx, _, _, sy, _, _] = self.rasterizer.root_transform().as_coeffs();
        let scale_x = if sx == 0.0 { 1.0 } else { sx.abs() };
        let scale_y = if sy == 0.0 { 1.0 } else { sy.abs() };
        let size = Size::new(
            f64::from(viewport.width) / scale_x,
            f64::from(viewport.height) / scale_y,
        );
        self.pipeline.set_root_constraints(BoxConstraints::tight(size));
    }

    /// Whether the pipeline has work or has asked for a frame.
    #[must_use]
    pub fn needs_frame(&self) -> bool {
        self.pipeline.is_frame_requested() || self.pipeline.has_pending_work()
    }

    /// Runs one frame at host time `now`, reporting phases to `sink`.
    ///
    /// # Errors
    ///
    /// Fails if the output surface cannot provide or present the frame.
    /// The pipeline flushes have already run by then, so the next frame
    /// only redraws.
    pub fn draw_frame(
        &mut self,
        now: HostTime,
        sink: Option<&mut dyn TraceSink>,
    ) -> Result<FrameSummary, RasterError> {
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let size = self.viewport;
        let mut tracer = match sink {
            Some(sink) => Tracer::new(sink),
            None => Tracer::none(),
        };
        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            now,
            size,
        });
        let mut summary = FrameSummaryBuilder::new(frame_index, now);

        let Self {
            pipeline,
            rasterizer,
            clock,
            ..
        } = self;
        let mut timer = PhaseTimer {
            clock: &**clock,
            tracer: &mut tracer,
            summary: &mut summary,
            frame_index,
        };
        timer.run(PhaseKind::EnterFrame, || ((), pipeline.flush_enter_frame(now)));
        timer.run(PhaseKind::Layout, || ((), pipeline.flush_layout()));
        timer.run(PhaseKind::Compositing, || ((), pipeline.flush_compositing_bits()));
        timer.run(PhaseKind::Paint, || ((), pipeline.flush_paint()));
        timer.run(PhaseKind::Preroll, || {
            let begun = rasterizer.begin_frame(size);
            if begun.is_ok() {
                rasterizer.preroll(pipeline.layers_mut());
            }
            (begun, 0)
        })?;
        timer.run(PhaseKind::Raster, || {
            rasterizer.paint(pipeline.layers());
            ((), 0)
        });
        let stats = timer.run(PhaseKind::Submit, || (rasterizer.end_frame(), 0))?;

        tracer.cache_stats(&CacheStatsEvent { frame_index, stats });
        summary.set_cache_stats(stats);
        tracer.submit(&SubmitEvent {
            frame_index,
            submitted_at: clock.now(),
        });
        let summary = summary.finish();
        tracer.frame_summary(&summary);
        debug!(
            frame_index,
            built = stats.built,
            hits = stats.hits,
            "frame submitted"
        );
        Ok(summary)
    }
}
