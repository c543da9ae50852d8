//! Request metrics and statistics tracking for the prediction service.

use crate::types::Outcome;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for prediction traffic
pub struct ServiceMetrics {
    /// Total successful predictions
    pub predictions_served: AtomicU64,
    /// Predictions with outcome 1
    pub selected: AtomicU64,
    /// Predictions with outcome 0
    pub rejected: AtomicU64,
    /// Failed requests by kind (validation, unavailable, inference)
    failures: RwLock<HashMap<&'static str, u64>>,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Confidence score distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Predictions served without a confidence score
    pub missing_confidence: AtomicU64,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            selected: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failures: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
            missing_confidence: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, outcome: Outcome, confidence: Option<f64>) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);

        match outcome {
            Outcome::Selected => self.selected.fetch_add(1, Ordering::Relaxed),
            Outcome::Rejected => self.rejected.fetch_add(1, Ordering::Relaxed),
        };

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        match confidence {
            Some(score) => {
                let bucket = (score * 10.0).clamp(0.0, 9.0) as usize;
                if let Ok(mut buckets) = self.confidence_buckets.write() {
                    buckets[bucket] += 1;
                }
            }
            None => {
                self.missing_confidence.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, kind: &'static str) {
        if let Ok(mut failures) = self.failures.write() {
            *failures.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn get_failures(&self) -> HashMap<&'static str, u64> {
        self.failures
            .read()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    pub fn total_failures(&self) -> u64 {
        self.get_failures().values().sum()
    }

    /// Get latency statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted: Vec<u64> = match self.latencies.read() {
            Ok(times) => times.clone(),
            Err(_) => return LatencyStats::default(),
        };
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets
            .read()
            .map(|b| *b)
            .unwrap_or([0; 10])
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let served = self.predictions_served.load(Ordering::Relaxed);
        let selected = self.selected.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);
        let selection_rate = if served > 0 {
            (selected as f64 / served as f64) * 100.0
        } else {
            0.0
        };

        let latency = self.get_latency_stats();
        let failures = self.get_failures();

        info!(
            served,
            selected,
            rejected,
            selection_rate = format!("{:.1}%", selection_rate),
            throughput = format!("{:.2} req/s", self.get_throughput()),
            "Prediction summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Prediction latency"
        );
        if !failures.is_empty() {
            info!(failures = ?failures, "Failed requests");
        }

        let dist = self.get_confidence_distribution();
        let total: u64 = dist.iter().sum();
        if total > 0 {
            for (i, &count) in dist.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let pct = (count as f64 / total as f64) * 100.0;
                info!(
                    "  confidence {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                    i as f64 / 10.0,
                    (i + 1) as f64 / 10.0,
                    count,
                    pct,
                    "█".repeat(((pct / 5.0) as usize).min(20))
                );
            }
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Logs periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if self.metrics.predictions_served.load(Ordering::Relaxed) > 0
                || self.metrics.total_failures() > 0
            {
                self.metrics.print_summary();
            }
        }
    }
}
