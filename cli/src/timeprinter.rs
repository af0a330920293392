//! Console progress for long runs.

use std::time::Instant;

use tracing::info;

/// Reports percent complete and elapsed wall-clock time every 5% of a run; silent for runs
/// of 100 steps or fewer.
pub struct TimePrinter {
    max_iterations: u64,
    every: u64,
    calls: u64,
    start: Instant,
}

impl TimePrinter {
    /// Start the clock for a run of `max_iterations` steps.
    pub fn new(max_iterations: u64) -> Self {
        let every = if max_iterations > 100 { max_iterations / 20 } else { 0 };
        Self { max_iterations, every, calls: 0, start: Instant::now() }
    }

    /// Advance one step; returns the percentage when a line was printed.
    pub fn tick(&mut self) -> Option<u32> {
        let t = self.calls;
        self.calls += 1;
        if self.every == 0 || t % self.every != 0 {
            return None;
        }
        let pct = (0.5 + t as f64 * 100.0 / self.max_iterations as f64) as u32;
        info!(elapsed_s = self.start.elapsed().as_secs_f64(), "{pct}% complete");
        Some(pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_runs_are_silent() {
        let mut p = TimePrinter::new(100);
        assert!((0..100).all(|_| p.tick().is_none()));
    }

    #[test]
    fn long_runs_report_every_five_percent() {
        let mut p = TimePrinter::new(1000);
        let printed: Vec<u32> = (0..1000).filter_map(|_| p.tick()).collect();
        assert_eq!(printed.len(), 20);
        assert_eq!(printed[0], 0);
        assert_eq!(printed[1], 5);
        assert_eq!(printed[19], 95);
    }
}
