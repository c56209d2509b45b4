// Download progress computation — throttled percentages plus throughput sampling.

use std::time::Instant;

/// Turns received byte counts into progress reports for one transfer.
///
/// Reports are non-decreasing, strictly below 100, and at least `min_step`
/// percent apart. With an unknown total nothing is reported.
pub struct ProgressTracker {
    total: Option<u64>,
    received: u64,
    min_step: f64,
    last_reported: Option<f64>,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total: Option<u64>, min_step: f64) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            received: 0,
            min_step: min_step.max(0.0),
            last_reported: None,
            started: Instant::now(),
        }
    }

    /// Account for `bytes` more received. Returns the percentage to report, if any.
    pub fn record(&mut self, bytes: u64) -> Option<f64> {
        self.received += bytes;
        let total = self.total?;

        let percent = self.received as f64 * 100.0 / total as f64;
        // Completion is signalled by the transfer returning, not by a report.
        if percent >= 100.0 {
            return None;
        }
        if let Some(last) = self.last_reported {
            if percent <= last || percent - last < self.min_step {
                return None;
            }
        }
        self.last_reported = Some(percent);
        Some(percent)
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn last_reported(&self) -> Option<f64> {
        self.last_reported
    }

    /// Average throughput since the tracker was created.
    pub fn bytes_per_second(&self) -> u64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.1 {
            (self.received as f64 / elapsed) as u64
        } else {
            0
        }
    }
}
