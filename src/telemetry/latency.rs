use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::info;

/// Round-trip latency and failure counts per backend endpoint.
pub struct LatencyTracker {
    samples: DashMap<&'static str, VecDeque<Duration>>,
    failures: DashMap<&'static str, u64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: DashMap::new(),
            failures: DashMap::new(),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record(&self, endpoint: &'static str, elapsed: Duration) {
        let mut window = self
            .samples
            .entry(endpoint)
            .or_insert_with(|| VecDeque::with_capacity(self.max_samples));
        if window.len() >= self.max_samples {
            window.pop_front();
        }
        window.push_back(elapsed);
    }

    pub fn record_failure(&self, endpoint: &'static str) {
        *self.failures.entry(endpoint).or_insert(0) += 1;
    }

    /// Start timing a request. The sample is recorded when the guard drops.
    pub fn start(&self, endpoint: &'static str) -> RequestTimer<'_> {
        RequestTimer {
            endpoint,
            started: Instant::now(),
            tracker: self,
        }
    }

    /// p50, p95, p99 for an endpoint.
    pub fn percentiles(&self, endpoint: &str) -> Option<(Duration, Duration, Duration)> {
        let window = self.samples.get(endpoint)?;
        if window.is_empty() {
            return None;
        }

        let mut sorted: Vec<Duration> = window.iter().copied().collect();
        sorted.sort();

        let last = sorted.len() - 1;
        let at = |q: f64| sorted[((sorted.len() as f64 * q) as usize).min(last)];
        Some((at(0.50), at(0.95), at(0.99)))
    }

    pub fn failures(&self, endpoint: &str) -> u64 {
        self.failures.get(endpoint).map(|f| *f).unwrap_or(0)
    }

    pub fn log_summary(&self) {
        let mut endpoints: Vec<&'static str> = self.samples.iter().map(|e| *e.key()).collect();
        endpoints.sort_unstable();
        for endpoint in endpoints {
            if let Some((p50, p95, p99)) = self.percentiles(endpoint) {
                info!(
                    "Latency [{}]: p50={:.1}ms p95={:.1}ms p99={:.1}ms failures={}",
                    endpoint,
                    p50.as_secs_f64() * 1000.0,
                    p95.as_secs_f64() * 1000.0,
                    p99.as_secs_f64() * 1000.0,
                    self.failures(endpoint),
                );
            }
        }
    }
}

pub struct RequestTimer<'a> {
    endpoint: &'static str,
    started: Instant,
    tracker: &'a LatencyTracker,
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.tracker.record(self.endpoint, self.started.elapsed());
    }
}
