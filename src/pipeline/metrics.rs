// src/pipeline/metrics.rs
//
// Counters for every outcome of an image tick. Clones share the same
// counters, so a handle can be kept outside the worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct DetectorMetrics {
    pub images_received: Arc<AtomicU64>,
    pub skipped_not_ready: Arc<AtomicU64>,
    pub skipped_gated: Arc<AtomicU64>,
    pub no_candidate: Arc<AtomicU64>,
    pub classifications: Arc<AtomicU64>,
    pub classifier_failures: Arc<AtomicU64>,
    pub decisions_published: Arc<AtomicU64>,
    pub state_commits: Arc<AtomicU64>,
    pub classify_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl DetectorMetrics {
    pub fn new() -> Self {
        Self {
            images_received: Arc::new(AtomicU64::new(0)),
            skipped_not_ready: Arc::new(AtomicU64::new(0)),
            skipped_gated: Arc::new(AtomicU64::new(0)),
            no_candidate: Arc::new(AtomicU64::new(0)),
            classifications: Arc::new(AtomicU64::new(0)),
            classifier_failures: Arc::new(AtomicU64::new(0)),
            decisions_published: Arc::new(AtomicU64::new(0)),
            state_commits: Arc::new(AtomicU64::new(0)),
            classify_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    /// Fraction of received images that made it to the debouncer
    pub fn acceptance_rate(&self) -> f64 {
        let received = self.images_received.load(Ordering::Relaxed);
        if received == 0 {
            return 0.0;
        }
        self.decisions_published.load(Ordering::Relaxed) as f64 / received as f64
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            images_received: self.images_received.load(Ordering::Relaxed),
            skipped_not_ready: self.skipped_not_ready.load(Ordering::Relaxed),
            skipped_gated: self.skipped_gated.load(Ordering::Relaxed),
            no_candidate: self.no_candidate.load(Ordering::Relaxed),
            classifications: self.classifications.load(Ordering::Relaxed),
            classifier_failures: self.classifier_failures.load(Ordering::Relaxed),
            decisions_published: self.decisions_published.load(Ordering::Relaxed),
            state_commits: self.state_commits.load(Ordering::Relaxed),
            last_classify_us: self.classify_time_us.load(Ordering::Relaxed),
            acceptance_rate: self.acceptance_rate(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub images_received: u64,
    pub skipped_not_ready: u64,
    pub skipped_gated: u64,
    pub no_candidate: u64,
    pub classifications: u64,
    pub classifier_failures: u64,
    pub decisions_published: u64,
    pub state_commits: u64,
    pub last_classify_us: u64,
    pub acceptance_rate: f64,
    pub elapsed_secs: f64,
}
