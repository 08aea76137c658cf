use std::collections::HashMap;
use std::time::Instant;

/// Observer for prediction loop events.
///
/// Keeps the loop independent of where timings and metrics end up.
pub trait PipelineLogger: Send {
    /// Called once per completed cycle with the number of cycles so far.
    fn cycle(&mut self, completed: usize);

    /// Record how long a named stage took in one cycle.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. overlays drawn).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn cycle(&mut self, _completed: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and maximum of one timing or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatSummary {
    count: usize,
    total: f64,
    max: f64,
}

impl StatSummary {
    pub fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.total += value;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Collects per-stage timings and metrics through the `log` facade and
/// reports a summary when the loop ends.
///
/// Only aggregates are kept, so memory stays constant however long the loop
/// runs. Cycle progress is logged every `throttle_cycles` cycles.
pub struct LogPipelineLogger {
    throttle_cycles: usize,
    timings: HashMap<String, StatSummary>,
    metrics: HashMap<String, StatSummary>,
    start_time: Instant,
    cycles: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle_cycles: usize) -> Self {
        Self {
            throttle_cycles: throttle_cycles.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            cycles: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let cycles = self.cycles;
        let mut lines = vec![format!(
            "Prediction summary ({cycles} cycles, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let pct = if elapsed_ms > 0.0 {
                durations.total() / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  max {:6.1}ms  ({pct:4.1}%)",
                durations.mean(),
                durations.max(),
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            lines.push(format!(
                "  {name}: avg {:.1}  total {:.0}",
                values.mean(),
                values.total()
            ));
        }

        if cycles > 0 && elapsed_ms > 0.0 {
            let fps = cycles as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Refresh rate: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&StatSummary> {
        self.timings.get(stage)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&StatSummary> {
        self.metrics.get(name)
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn cycle(&mut self, completed: usize) {
        self.cycles = completed;
        if completed % self.throttle_cycles == 0 {
            log::info!("Processed {completed} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        log::trace!("{stage}: {duration_ms:.2}ms");
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
