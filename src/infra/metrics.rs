//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that needs synchronization (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries for estimation cycle latency (microseconds)
/// Buckets: ≤1ms, ≤2ms, ≤4ms, ≤8ms, ≤16ms, ≤32ms, ≤64ms, ≤128ms, ≤256ms, ≤512ms, >512ms
const BUCKET_BOUNDS: [u64; 10] =
    [1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 64_000, 128_000, 256_000, 512_000];

pub const METRICS_NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; METRICS_NUM_BUCKETS]) -> [u64; METRICS_NUM_BUCKETS] {
    let mut result = [0u64; METRICS_NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] = [
        1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 64_000, 128_000, 256_000, 512_000, 1_024_000,
    ];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
///
/// All recording operations are lock-free using atomics.
/// The `report()` method atomically swaps counters to get a consistent snapshot.
pub struct Metrics {
    /// Frames pulled from sources (monotonic)
    frames_total: AtomicU64,
    /// Samples published into the snapshot store (monotonic)
    samples_total: AtomicU64,
    /// Estimation cycles that failed and were skipped (monotonic)
    estimation_failures_total: AtomicU64,
    /// Completed cycles since last report (reset on report)
    cycles_since_report: AtomicU64,
    /// Sum of cycle latencies in microseconds (reset on report)
    cycle_latency_sum_us: AtomicU64,
    /// Max cycle latency in microseconds (reset on report)
    cycle_latency_max_us: AtomicU64,
    /// Cycle latency histogram buckets (reset on report)
    cycle_latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
    /// Routing queries answered with a route (monotonic)
    route_ok_total: AtomicU64,
    /// Routing queries answered "no path" (monotonic)
    route_no_path_total: AtomicU64,
    /// Routing queries rejected as invalid input (monotonic)
    route_invalid_total: AtomicU64,
    /// Time of last report for rate calculation
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_total: AtomicU64::new(0),
            samples_total: AtomicU64::new(0),
            estimation_failures_total: AtomicU64::new(0),
            cycles_since_report: AtomicU64::new(0),
            cycle_latency_sum_us: AtomicU64::new(0),
            cycle_latency_max_us: AtomicU64::new(0),
            cycle_latency_buckets: Default::default(),
            route_ok_total: AtomicU64::new(0),
            route_no_path_total: AtomicU64::new(0),
            route_invalid_total: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    pub fn record_frame(&self) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self) {
        self.samples_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_estimation_failure(&self) {
        self.estimation_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed estimation cycle and its latency
    pub fn record_cycle(&self, latency_us: u64) {
        self.cycles_since_report.fetch_add(1, Ordering::Relaxed);
        self.cycle_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.cycle_latency_max_us, latency_us);
        self.cycle_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_route_ok(&self) {
        self.route_ok_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_route_no_path(&self) {
        self.route_no_path_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_route_invalid(&self) {
        self.route_invalid_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Swap the since-report counters and build a summary
    pub fn report(&self) -> MetricsSummary {
        let cycles = self.cycles_since_report.swap(0, Ordering::Relaxed);
        let latency_sum_us = self.cycle_latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max_us = self.cycle_latency_max_us.swap(0, Ordering::Relaxed);
        let buckets = swap_buckets(&self.cycle_latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let cycles_per_sec = if elapsed.as_secs_f64() > 0.0 {
            cycles as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let avg_latency_us = if cycles > 0 { latency_sum_us / cycles } else { 0 };

        MetricsSummary {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            samples_total: self.samples_total.load(Ordering::Relaxed),
            estimation_failures_total: self.estimation_failures_total.load(Ordering::Relaxed),
            cycles,
            cycles_per_sec,
            avg_latency_us,
            max_latency_us: latency_max_us,
            p50_latency_us: percentile_from_buckets(&buckets, 0.50),
            p95_latency_us: percentile_from_buckets(&buckets, 0.95),
            p99_latency_us: percentile_from_buckets(&buckets, 0.99),
            route_ok_total: self.route_ok_total.load(Ordering::Relaxed),
            route_no_path_total: self.route_no_path_total.load(Ordering::Relaxed),
            route_invalid_total: self.route_invalid_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics summary for logging
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub frames_total: u64,
    pub samples_total: u64,
    pub estimation_failures_total: u64,
    pub cycles: u64,
    pub cycles_per_sec: f64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub p50_latency_us: u64,
    pub p95_latency_us: u64,
    pub p99_latency_us: u64,
    pub route_ok_total: u64,
    pub route_no_path_total: u64,
    pub route_invalid_total: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            frames = %self.frames_total,
            samples = %self.samples_total,
            estimation_failures = %self.estimation_failures_total,
            cycles = %self.cycles,
            cycles_per_sec = %format!("{:.1}", self.cycles_per_sec),
            avg_us = %self.avg_latency_us,
            max_us = %self.max_latency_us,
            p50_us = %self.p50_latency_us,
            p95_us = %self.p95_latency_us,
            p99_us = %self.p99_latency_us,
            routes_ok = %self.route_ok_total,
            routes_no_path = %self.route_no_path_total,
            routes_invalid = %self.route_invalid_total,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(1_000), 0);
        assert_eq!(bucket_index(1_001), 1);
        assert_eq!(bucket_index(512_000), 9);
        assert_eq!(bucket_index(512_001), 10);
    }

    #[test]
    fn test_report_resets_cycle_counters() {
        let metrics = Metrics::new();
        metrics.record_cycle(2_500);
        metrics.record_cycle(7_000);

        let summary = metrics.report();
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.avg_latency_us, 4_750);
        assert_eq!(summary.max_latency_us, 7_000);

        let summary = metrics.report();
        assert_eq!(summary.cycles, 0);
        assert_eq!(summary.avg_latency_us, 0);
    }

    #[test]
    fn test_monotonic_counters_survive_report() {
        let metrics = Metrics::new();
        metrics.record_frame();
        metrics.record_sample();
        metrics.record_estimation_failure();
        metrics.record_route_ok();
        metrics.record_route_no_path();
        metrics.record_route_invalid();

        let _ = metrics.report();
        let summary = metrics.report();
        assert_eq!(summary.frames_total, 1);
        assert_eq!(summary.samples_total, 1);
        assert_eq!(summary.estimation_failures_total, 1);
        assert_eq!(summary.route_ok_total, 1);
        assert_eq!(summary.route_no_path_total, 1);
        assert_eq!(summary.route_invalid_total, 1);
    }

    #[test]
    fn test_percentile_from_empty_buckets() {
        let buckets = [0u64; METRICS_NUM_BUCKETS];
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 0);
    }
}
