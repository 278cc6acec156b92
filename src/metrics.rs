//! Scoring metrics and statistics for the risk engine.
//!
//! Observational only: nothing recorded here feeds back into scoring.

use crate::types::score::ScoreResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::info;

const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for the scoring path
pub struct EngineMetrics {
    /// Total transactions scored
    pub transactions_scored: AtomicU64,
    /// Total fraud alerts raised
    pub alerts_raised: AtomicU64,
    /// Batches recorded into stream state
    pub batches_recorded: AtomicU64,
    /// Alerts by attack type
    alerts_by_attack: RwLock<HashMap<String, u64>>,
    /// Per-batch scoring latency (microseconds)
    batch_times: RwLock<Vec<u64>>,
    /// Ensemble score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// 1 - |unsupervised - supervised| per scored transaction
    model_agreements: RwLock<Vec<f64>>,
    start_time: Instant,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            batches_recorded: AtomicU64::new(0),
            alerts_by_attack: RwLock::new(HashMap::new()),
            batch_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            model_agreements: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a scored batch
    pub fn record_batch(&self, results: &[ScoreResult], elapsed: Duration) {
        self.batches_recorded.fetch_add(1, Ordering::Relaxed);
        self.transactions_scored
            .fetch_add(results.len() as u64, Ordering::Relaxed);

        if let Ok(mut times) = self.batch_times.write() {
            times.push(elapsed.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }

        if let Ok(mut buckets) = self.score_buckets.write() {
            for r in results {
                let bucket = (r.fraud_probability * 10.0).clamp(0.0, 9.0) as usize;
                buckets[bucket] += 1;
            }
        }

        if let Ok(mut agreements) = self.model_agreements.write() {
            for r in results {
                if let Some(sup) = r.model_breakdown.supervised {
                    agreements.push(1.0 - (r.model_breakdown.unsupervised - sup).abs());
                }
            }
            if agreements.len() > MAX_SAMPLES {
                let excess = agreements.len() - MAX_SAMPLES / 2;
                agreements.drain(0..excess);
            }
        }

        let mut alerts = 0;
        if let Ok(mut by_attack) = self.alerts_by_attack.write() {
            for attack in results.iter().filter_map(|r| r.attack_type) {
                *by_attack.entry(attack.to_string()).or_insert(0) += 1;
                alerts += 1;
            }
        }
        self.alerts_raised.fetch_add(alerts, Ordering::Relaxed);
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.batch_times.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Mean agreement between the two models, 0.0 when nothing recorded
    pub fn avg_agreement(&self) -> f64 {
        match self.model_agreements.read() {
            Ok(a) if !a.is_empty() => a.iter().sum::<f64>() / a.len() as f64,
            _ => 0.0,
        }
    }

    /// Transactions scored per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    pub fn alerts_by_attack(&self) -> HashMap<String, u64> {
        self.alerts_by_attack
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let scored = self.transactions_scored.load(Ordering::Relaxed);
        let alerts = self.alerts_raised.load(Ordering::Relaxed);
        let alert_rate = if scored > 0 {
            alerts as f64 / scored as f64 * 100.0
        } else {
            0.0
        };
        let latency = self.latency_stats();

        info!(
            scored,
            alerts,
            alert_rate = format!("{:.1}%", alert_rate),
            throughput = format!("{:.1} tx/s", self.throughput()),
            batches = self.batches_recorded.load(Ordering::Relaxed),
            "Risk engine summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            model_agreement = format!("{:.1}%", self.avg_agreement() * 100.0),
            "Batch scoring latency"
        );

        for (attack, count) in &self.alerts_by_attack() {
            info!(attack = %attack, count, "Alerts by attack type");
        }

        let dist = self.score_distribution();
        let total: u64 = dist.iter().sum();
        for (i, &count) in dist.iter().enumerate().filter(|(_, c)| **c > 0) {
            let pct = count as f64 / total as f64 * 100.0;
            info!(
                "  score {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 2.0) as usize).min(20))
            );
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch latency statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Logs a metrics summary on a fixed interval until shutdown
pub struct MetricsReporter {
    metrics: Arc<EngineMetrics>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<EngineMetrics>, interval: Duration) -> Self {
        Self { metrics, interval }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => self.metrics.print_summary(),
                _ = shutdown.changed() => break,
            }
        }
        self.metrics.print_summary();
    }
}
