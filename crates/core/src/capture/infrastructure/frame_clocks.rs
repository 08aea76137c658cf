use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::capture::domain::frame_clock::FrameClock;
use crate::shared::constants::DEFAULT_REFRESH_FPS;

/// Ticks at a fixed refresh rate.
///
/// Ticks missed while a cycle overran are dropped rather than queued, so a
/// slow detector never causes a burst of back-to-back cycles.
pub struct TickerFrameClock {
    ticker: Receiver<std::time::Instant>,
    interval: Duration,
}

impl TickerFrameClock {
    /// Non-positive or non-finite rates fall back to the default refresh rate.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            DEFAULT_REFRESH_FPS
        };
        let interval = Duration::from_secs_f64(1.0 / fps);
        Self {
            ticker: crossbeam_channel::tick(interval),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for TickerFrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_FPS)
    }
}

impl FrameClock for TickerFrameClock {
    fn wait_next_frame(&mut self) -> bool {
        self.ticker.recv().is_ok()
    }
}

/// Never waits. Used for recorded input, where frames should be processed
/// as fast as inference allows.
#[derive(Debug, Default)]
pub struct UnthrottledClock;

impl FrameClock for UnthrottledClock {
    fn wait_next_frame(&mut self) -> bool {
        true
    }
}
