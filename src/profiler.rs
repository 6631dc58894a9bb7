//! Per-phase frame timing.
//!
//! The driver times each phase of a frame (spawn, step, visibility, render
//! sync) and records it here. Summaries go to `tracing` rather than stdout so
//! the host decides where they end up.

use bevy_ecs::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Accumulated timings of one named phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseStats {
    pub total: Duration,
    pub calls: u64,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
    /// Duration of the most recent call.
    pub last: Duration,
}

impl PhaseStats {
    pub fn avg(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.calls as f64),
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.calls += 1;
        self.last = elapsed;
        self.min = Some(self.min.map_or(elapsed, |m| m.min(elapsed)));
        self.max = Some(self.max.map_or(elapsed, |m| m.max(elapsed)));
    }
}

/// Frame profiler shared by the driver's systems.
#[derive(Resource, Debug, Default, Clone)]
pub struct FrameProfiler {
    phases: HashMap<&'static str, PhaseStats>,
    frames: u64,
}

impl FrameProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one measurement for `phase`.
    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        self.phases.entry(phase).or_default().record(elapsed);
    }

    /// Run `f` and record how long it took.
    pub fn time<R>(&mut self, phase: &'static str, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.record(phase, start.elapsed());
        result
    }

    pub fn end_frame(&mut self) {
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseStats> {
        self.phases.get(name)
    }

    /// Phases sorted by total time, most expensive first.
    pub fn sorted(&self) -> Vec<(&'static str, PhaseStats)> {
        let mut phases: Vec<_> = self.phases.iter().map(|(k, v)| (*k, *v)).collect();
        phases.sort_by(|a, b| b.1.total.cmp(&a.1.total).then(a.0.cmp(b.0)));
        phases
    }

    /// Emit one `info` line per phase.
    pub fn log_summary(&self) {
        let grand: Duration = self.phases.values().map(|s| s.total).sum();
        for (name, stats) in self.sorted() {
            let share = if grand.as_nanos() > 0 {
                stats.total.as_secs_f64() / grand.as_secs_f64() * 100.0
            } else {
                0.0
            };
            tracing::info!(
                phase = name,
                calls = stats.calls,
                avg_us = stats.avg().as_secs_f64() * 1e6,
                max_us = stats.max.unwrap_or_default().as_secs_f64() * 1e6,
                share_pct = share,
                "frame phase timing"
            );
        }
        tracing::info!(frames = self.frames, total_ms = grand.as_secs_f64() * 1e3, "frame profile");
    }

    pub fn reset(&mut self) {
        self.phases.clear();
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_records_min_max_avg() {
        let mut profiler = FrameProfiler::new();
        profiler.record("step", Duration::from_millis(2));
        profiler.record("step", Duration::from_millis(4));
        let stats = profiler.phase("step").unwrap();
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.min, Some(Duration::from_millis(2)));
        assert_eq!(stats.max, Some(Duration::from_millis(4)));
        assert_eq!(stats.avg(), Duration::from_millis(3));
        assert_eq!(stats.last, Duration::from_millis(4));
    }

    #[test]
    fn test_time_and_sort() {
        let mut profiler = FrameProfiler::new();
        for _ in 0..3 {
            profiler.time("fast", || sleep(Duration::from_millis(1)));
            profiler.time("slow", || sleep(Duration::from_millis(5)));
            profiler.end_frame();
        }
        assert_eq!(profiler.frames(), 3);
        let sorted = profiler.sorted();
        assert_eq!(sorted[0].0, "slow");
        assert_eq!(sorted[1].1.calls, 3);
        profiler.log_summary();
        profiler.reset();
        assert!(profiler.phase("slow").is_none());
    }
}
