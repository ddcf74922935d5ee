use std::collections::HashMap;
use std::time::Instant;

/// Observer for per-frame pipeline work.
///
/// Keeps timing and outcome bookkeeping out of the frame pipeline so the
/// CLI can print a summary while tests stay silent.
pub trait PipelineLogger: Send {
    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Count one frame ending with the named outcome.
    fn outcome(&mut self, name: &str);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn outcome(&mut self, _name: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// Collects per-stage timings and outcome counts and reports them through
/// the `log` facade at the end of a session.
pub struct SummaryPipelineLogger {
    timings: HashMap<String, Vec<f64>>,
    outcomes: HashMap<String, usize>,
    start_time: Instant,
}

impl SummaryPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            outcomes: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.outcomes.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames: usize = self.outcomes.values().sum();
        let mut lines = Vec::new();

        lines.push(format!(
            "Session summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            let max_ms = durations.iter().cloned().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:8}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  ({} frames)",
                durations.len()
            ));
        }

        let mut names: Vec<_> = self.outcomes.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: {}", self.outcomes[name]));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn outcome_count(&self, name: &str) -> usize {
        self.outcomes.get(name).copied().unwrap_or(0)
    }
}

impl Default for SummaryPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for SummaryPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn outcome(&mut self, name: &str) {
        *self.outcomes.entry(name.to_string()).or_default() += 1;
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
