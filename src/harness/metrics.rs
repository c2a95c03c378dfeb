//! Metrics collector - thread-safe counters plus a request latency histogram

use hdrhistogram::{CreationError, Histogram};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    pub iterations: u64,
    pub iterations_skipped: u64,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    pub data_sent: u64,
    pub data_received: u64,
    pub vus: u32,
    pub vus_max: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

#[derive(Clone)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<RunMetrics>>,
    // microseconds
    request_latencies: Arc<RwLock<Histogram<u64>>>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, CreationError> {
        Ok(Self {
            metrics: Arc::new(RwLock::new(RunMetrics::default())),
            request_latencies: Arc::new(RwLock::new(Histogram::new(3)?)),
            start_time: Instant::now(),
        })
    }

    pub fn iteration_completed(&self) {
        self.metrics.write().iterations += 1;
    }

    pub fn iteration_skipped(&self) {
        self.metrics.write().iterations_skipped += 1;
    }

    /// Record one finished HTTP request. `failed` covers transport errors and
    /// non-2xx statuses.
    pub fn request_finished(&self, duration: Duration, failed: bool, sent: u64, received: u64) {
        {
            let mut metrics = self.metrics.write();
            metrics.http_reqs += 1;
            if failed {
                metrics.http_req_failed += 1;
            }
            metrics.data_sent += sent;
            metrics.data_received += received;
        }

        let micros = duration.as_micros().min(u128::from(u64::MAX)) as u64;
        let _ = self.request_latencies.write().record(micros.max(1));
    }

    pub fn set_vus(&self, vus: u32) {
        let mut metrics = self.metrics.write();
        metrics.vus = vus;
        metrics.vus_max = metrics.vus_max.max(vus);
    }

    pub fn vus(&self) -> u32 {
        self.metrics.read().vus
    }

    pub fn snapshot(&self) -> RunMetrics {
        self.metrics.read().clone()
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let hist = self.request_latencies.read();
        if hist.is_empty() {
            return LatencyStats::default();
        }
        let ms = |micros: u64| micros as f64 / 1000.0;
        LatencyStats {
            count: hist.len(),
            min_ms: ms(hist.min()),
            avg_ms: hist.mean() / 1000.0,
            p50_ms: ms(hist.value_at_quantile(0.50)),
            p90_ms: ms(hist.value_at_quantile(0.90)),
            p95_ms: ms(hist.value_at_quantile(0.95)),
            max_ms: ms(hist.max()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_requests_and_failures() {
        let collector = MetricsCollector::new().unwrap();
        collector.request_finished(Duration::from_millis(10), false, 100, 2000);
        collector.request_finished(Duration::from_millis(30), true, 100, 0);

        let snap = collector.snapshot();
        assert_eq!(snap.http_reqs, 2);
        assert_eq!(snap.http_req_failed, 1);
        assert_eq!(snap.data_sent, 200);
        assert_eq!(snap.data_received, 2000);

        let stats = collector.latency_stats();
        assert_eq!(stats.count, 2);
        assert!(stats.min_ms >= 9.9 && stats.min_ms <= 10.1);
        assert!(stats.max_ms >= 29.9 && stats.max_ms <= 30.1);
    }

    #[test]
    fn vus_max_is_high_water_mark() {
        let collector = MetricsCollector::new().unwrap();
        collector.set_vus(3);
        collector.set_vus(10);
        collector.set_vus(4);
        let snap = collector.snapshot();
        assert_eq!(snap.vus, 4);
        assert_eq!(snap.vus_max, 10);
    }

    #[test]
    fn empty_histogram_reports_zeroes() {
        let collector = MetricsCollector::new().unwrap();
        assert_eq!(collector.latency_stats(), LatencyStats::default());
    }

    #[test]
    fn iteration_counters() {
        let collector = MetricsCollector::new().unwrap();
        collector.iteration_completed();
        collector.iteration_skipped();
        collector.iteration_skipped();
        let snap = collector.snapshot();
        assert_eq!(snap.iterations, 1);
        assert_eq!(snap.iterations_skipped, 2);
    }
}
