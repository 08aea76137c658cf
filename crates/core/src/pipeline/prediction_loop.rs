use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::capture::domain::frame_clock::FrameClock;
use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::overlay::domain::layout_context::LayoutContext;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::pipeline::frame_sink::FrameSink;
use crate::pipeline::model_slot::DetectorHandle;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

#[derive(Debug, Error)]
pub enum LoopError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("frame sink failed: {0}")]
    Sink(String),
}

/// Why a run ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    StreamEnded,
    Cancelled,
    FrameBudget,
    ClockStopped,
}

#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Stop after this many cycles.
    pub max_frames: Option<usize>,
    /// Checked once per cycle.
    pub cancelled: Arc<AtomicBool>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopReport {
    pub frames: usize,
    /// Cycles whose inference failed; their previous overlays were kept.
    pub skipped_frames: usize,
    pub overlays_drawn: usize,
    pub stop: StopReason,
}

/// One live stream bound to the detector, a renderer and a fixed layout.
///
/// Each cycle pulls a frame, waits for inference, replaces the overlays,
/// presents the page to every sink and then waits on the clock. A cycle's
/// render always finishes before the next cycle's inference starts.
pub struct PredictionLoop<'a> {
    source: &'a mut dyn FrameSource,
    detector: DetectorHandle,
    renderer: OverlayRenderer,
    /// Owned by the session the loop was enabled from.
    layout: &'a LayoutContext,
    metadata: StreamMetadata,
}

impl<'a> PredictionLoop<'a> {
    pub fn new(
        source: &'a mut dyn FrameSource,
        detector: DetectorHandle,
        renderer: OverlayRenderer,
        layout: &'a LayoutContext,
        metadata: StreamMetadata,
    ) -> Self {
        Self {
            source,
            detector,
            renderer,
            layout,
            metadata,
        }
    }

    pub fn layout(&self) -> &LayoutContext {
        self.layout
    }

    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    /// Runs cycles until the stream ends, the run is cancelled, the frame
    /// budget is spent or the clock stops. Sinks are closed and the stream
    /// released on every exit path.
    pub fn run(
        &mut self,
        surface: &mut dyn OverlaySurface,
        clock: &mut dyn FrameClock,
        sinks: &mut [Box<dyn FrameSink>],
        logger: &mut dyn PipelineLogger,
        config: &LoopConfig,
    ) -> Result<LoopReport, LoopError> {
        let mut report = LoopReport {
            frames: 0,
            skipped_frames: 0,
            overlays_drawn: 0,
            stop: StopReason::StreamEnded,
        };

        let outcome = self.run_cycles(surface, clock, sinks, logger, config, &mut report);
        self.source.close();

        let mut close_error = None;
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.close() {
                log::error!("Failed to close frame sink: {e}");
                close_error.get_or_insert_with(|| LoopError::Sink(e.to_string()));
            }
        }

        logger.metric("skipped_frames", report.skipped_frames as f64);
        report.stop = outcome?;
        match close_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    fn run_cycles(
        &mut self,
        surface: &mut dyn OverlaySurface,
        clock: &mut dyn FrameClock,
        sinks: &mut [Box<dyn FrameSink>],
        logger: &mut dyn PipelineLogger,
        config: &LoopConfig,
        report: &mut LoopReport,
    ) -> Result<StopReason, LoopError> {
        loop {
            if config.cancelled.load(Ordering::Relaxed) {
                logger.info("Prediction loop cancelled");
                return Ok(StopReason::Cancelled);
            }
            if config.max_frames.is_some_and(|max| report.frames >= max) {
                return Ok(StopReason::FrameBudget);
            }

            let frame = match self.source.next_frame() {
                None => {
                    logger.info("Stream ended");
                    return Ok(StopReason::StreamEnded);
                }
                Some(result) => result?,
            };
            let frame = frame.resized(self.layout.display_width, self.layout.display_height);

            self.cycle(&frame, surface, logger, report);

            let t = Instant::now();
            let overlays = surface.elements();
            for sink in sinks.iter_mut() {
                sink.present(&frame, &overlays)
                    .map_err(|e| LoopError::Sink(e.to_string()))?;
            }
            logger.timing("present", elapsed_ms(t));

            report.frames += 1;
            logger.cycle(report.frames);

            if !clock.wait_next_frame() {
                return Ok(StopReason::ClockStopped);
            }
        }
    }

    /// Detects and renders one frame. An inference failure leaves the
    /// previous overlays in place.
    fn cycle(
        &mut self,
        frame: &Frame,
        surface: &mut dyn OverlaySurface,
        logger: &mut dyn PipelineLogger,
        report: &mut LoopReport,
    ) {
        let t = Instant::now();
        let detection = {
            let mut detector = self
                .detector
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            detector.detect(frame)
        };
        logger.timing("detect", elapsed_ms(t));

        match detection {
            Ok(detection) => {
                let t = Instant::now();
                let drawn = self.renderer.render(&detection, self.layout, surface);
                logger.timing("render", elapsed_ms(t));
                logger.metric("overlays", drawn as f64);
                report.overlays_drawn += drawn;
            }
            Err(e) => {
                log::warn!("Skipping frame {}: {e}", frame.index());
                report.skipped_frames += 1;
            }
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
