//! Submission metrics and statistics tracking for the predictor service.
//!
//! Only aggregate counters and timings are kept; no patient values.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Window of latency samples kept for percentile statistics
const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector for form submissions
pub struct SubmissionMetrics {
    /// Submissions received, whatever their outcome
    pub submissions: AtomicU64,
    /// Predictions returned with class 1
    pub positives: AtomicU64,
    /// Predictions returned with class 0
    pub negatives: AtomicU64,
    /// Submissions rejected before inference
    pub rejected: AtomicU64,
    /// Submissions whose prediction failed
    pub failed: AtomicU64,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Positive-probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl SubmissionMetrics {
    pub fn new() -> Self {
        Self {
            submissions: AtomicU64::new(0),
            positives: AtomicU64::new(0),
            negatives: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, probability: f64, class: u8) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        if class == 1 {
            self.positives.fetch_add(1, Ordering::Relaxed);
        } else {
            self.negatives.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.drain(0..LATENCY_WINDOW / 2);
            }
        }

        let bucket = (probability * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a submission rejected for out-of-domain input
    pub fn record_rejected(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submission whose prediction failed
    pub fn record_failure(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get latency statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted = match self.latencies.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return LatencyStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Submissions per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.submissions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or([0; 10])
    }

    /// Point-in-time copy of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submissions: self.submissions.load(Ordering::Relaxed),
            positives: self.positives.load(Ordering::Relaxed),
            negatives: self.negatives.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs(),
            throughput: self.get_throughput(),
            latency: self.get_latency_stats(),
            probability_distribution: self.get_probability_distribution(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let s = self.snapshot();
        let predicted = s.positives + s.negatives;
        let positive_rate = if predicted > 0 {
            (s.positives as f64 / predicted as f64) * 100.0
        } else {
            0.0
        };

        info!(
            submissions = s.submissions,
            positives = s.positives,
            negatives = s.negatives,
            rejected = s.rejected,
            failed = s.failed,
            positive_rate = format!("{:.1}%", positive_rate),
            throughput = format!("{:.2} req/s", s.throughput),
            "Submission summary"
        );
        info!(
            mean_us = s.latency.mean_us,
            p50_us = s.latency.p50_us,
            p95_us = s.latency.p95_us,
            p99_us = s.latency.p99_us,
            max_us = s.latency.max_us,
            "Prediction latency"
        );

        let total: u64 = s.probability_distribution.iter().sum();
        if total == 0 {
            return;
        }
        for (i, &count) in s.probability_distribution.iter().enumerate() {
            let pct = (count as f64 / total as f64) * 100.0;
            let bar: String = "█".repeat(((pct / 5.0) as usize).min(20));
            info!(
                "  p {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
    }
}

impl Default for SubmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prediction latency statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub submissions: u64,
    pub positives: u64,
    pub negatives: u64,
    pub rejected: u64,
    pub failed: u64,
    pub uptime_secs: u64,
    pub throughput: f64,
    pub latency: LatencyStats,
    pub probability_distribution: [u64; 10],
}

/// Periodic metrics summary logger
pub struct MetricsReporter {
    metrics: Arc<SubmissionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<SubmissionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = SubmissionMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 0.12, 0);
        metrics.record_prediction(Duration::from_micros(300), 0.91, 1);
        metrics.record_rejected();
        metrics.record_failure();

        let s = metrics.snapshot();
        assert_eq!(s.submissions, 4);
        assert_eq!(s.positives, 1);
        assert_eq!(s.negatives, 1);
        assert_eq!(s.rejected, 1);
        assert_eq!(s.failed, 1);
        assert_eq!(s.latency.count, 2);
        assert_eq!(s.latency.mean_us, 200);
        assert_eq!(s.latency.max_us, 300);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = SubmissionMetrics::new();
        metrics.record_prediction(Duration::from_micros(10), 0.0, 0);
        metrics.record_prediction(Duration::from_micros(10), 0.55, 1);
        metrics.record_prediction(Duration::from_micros(10), 1.0, 1);

        let buckets = metrics.get_probability_distribution();
        assert_eq!(buckets[0], 1);
        assert_eq!(buckets[5], 1);
        assert_eq!(buckets[9], 1);
    }

    #[test]
    fn test_empty_latency_stats() {
        let stats = SubmissionMetrics::new().get_latency_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.p99_us, 0);
    }
}
