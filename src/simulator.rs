//! Synthetic traffic: background live traffic and on-demand attack bursts

use crate::config::StreamConfig;
use crate::corpus::{account_id, recipient_id, round2};
use crate::engine::FraudEngine;
use crate::error::Result;
use crate::types::alert::FlaggedTransaction;
use crate::types::transaction::{TransactionRecord, TransactionType};
use chrono::{Local, Timelike};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

const LIVE_CITIES: [&str; 5] = ["Karachi", "Lahore", "Islamabad", "Faisalabad", "Multan"];
const LIVE_BANKS: [&str; 5] = ["HBL", "MCB", "UBL", "Meezan Bank", "JS Bank"];

/// Chance that a live transaction looks borderline
pub const BORDERLINE_PROBABILITY: f64 = 0.12;

/// Generates mostly-benign live traffic
pub struct TrafficGenerator;

impl TrafficGenerator {
    /// A batch of 3-8 transactions stamped with the current hour.
    pub fn batch<R: Rng>(rng: &mut R) -> Vec<TransactionRecord> {
        let now = Local::now();
        let count = rng.gen_range(3..=8);
        (0..count)
            .map(|_| Self::transaction(rng, now.hour() as u8, now.to_rfc3339()))
            .collect()
    }

    /// One live transaction; borderline ones show elevated velocity, a short
    /// gap and few recipients.
    pub fn transaction<R: Rng>(rng: &mut R, hour: u8, timestamp: String) -> TransactionRecord {
        let borderline = rng.gen_bool(BORDERLINE_PROBABILITY);
        let kind = *TransactionType::RETAIL
            .choose(rng)
            .unwrap_or(&TransactionType::RaastTransfer);

        TransactionRecord {
            account_id: account_id(rng.gen_range(1..50)),
            amount: round2(rng.gen_range(500.0..45_000.0)),
            transaction_type: kind.label().to_string(),
            recipient_bank: LIVE_BANKS.choose(rng).map(|s| s.to_string()),
            sender_city: LIVE_CITIES.choose(rng).map(|s| s.to_string()),
            recipient_city: LIVE_CITIES.choose(rng).map(|s| s.to_string()),
            timestamp,
            tx_count_last_5s: if borderline {
                rng.gen_range(3..=7)
            } else {
                rng.gen_range(1..=2)
            },
            time_delta_ms: if borderline {
                rng.gen_range(800.0..3000.0)
            } else {
                rng.gen_range(20_000.0..120_000.0)
            },
            hour_of_day: hour.min(23),
            unique_recipients_last_10tx: if borderline {
                rng.gen_range(2..=4)
            } else {
                rng.gen_range(4..=9)
            },
            recipient_id: Some(recipient_id(rng.gen_range(100..=999))),
            is_new_device: false,
            location_change: false,
            label: None,
        }
    }
}

/// Builds bot-driven drain bursts for demonstration
pub struct AttackInjector;

impl AttackInjector {
    /// `size` rapid-fire transfers from one random account to a single
    /// recipient, from a new device in a new city, late at night.
    pub fn burst<R: Rng>(rng: &mut R, size: usize) -> Vec<TransactionRecord> {
        let account = account_id(rng.gen_range(100..=999));
        let hour = rng.gen_range(0..5);
        let timestamp = Local::now().to_rfc3339();

        (0..size)
            .map(|_| TransactionRecord {
                account_id: account.clone(),
                amount: round2(rng.gen_range(4900.0..5100.0)),
                transaction_type: TransactionType::RaastTransfer.label().to_string(),
                recipient_bank: Some("Easypaisa".to_string()),
                sender_city: Some("Karachi".to_string()),
                recipient_city: Some("Lahore".to_string()),
                timestamp: timestamp.clone(),
                tx_count_last_5s: 20,
                time_delta_ms: rng.gen_range(50.0..150.0),
                hour_of_day: hour,
                unique_recipients_last_10tx: 1,
                recipient_id: Some(recipient_id(666)),
                is_new_device: true,
                location_change: true,
                label: None,
            })
            .collect()
    }
}

type TickFn = dyn Fn() -> Result<Vec<FlaggedTransaction>> + Send + Sync;
type AlertSink = mpsc::UnboundedSender<FlaggedTransaction>;

/// Periodic live-traffic task.
///
/// Each tick runs on the blocking pool under a timeout; a failed or slow tick
/// is logged and skipped. A timed-out tick still completes in the background
/// and its alerts still reach the sink. Stops at the next await point once
/// `shutdown` flips, leaving stream state as the last completed batch left it.
pub struct LiveTrafficTask {
    tick: Arc<TickFn>,
    interval: Duration,
    startup_delay: Duration,
    tick_timeout: Duration,
    alerts: Option<AlertSink>,
}

impl LiveTrafficTask {
    pub fn new(engine: Arc<FraudEngine>) -> Self {
        let stream = engine.config().stream.clone();
        Self::from_fn(&stream, move || engine.tick_live_traffic())
    }

    /// Drive an arbitrary tick function on the configured schedule
    pub fn from_fn<F>(stream: &StreamConfig, tick: F) -> Self
    where
        F: Fn() -> Result<Vec<FlaggedTransaction>> + Send + Sync + 'static,
    {
        Self {
            tick: Arc::new(tick),
            interval: stream.tick_interval(),
            startup_delay: stream.startup_delay(),
            tick_timeout: stream.tick_timeout(),
            alerts: None,
        }
    }

    /// Forward every flagged transaction to `sink`
    pub fn with_alert_sink(mut self, sink: AlertSink) -> Self {
        self.alerts = Some(sink);
        self
    }

    pub fn with_interval(mut self, interval: Duration, startup_delay: Duration) -> Self {
        self.interval = interval;
        self.startup_delay = startup_delay;
        self
    }

    pub fn with_tick_timeout(mut self, tick_timeout: Duration) -> Self {
        self.tick_timeout = tick_timeout;
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            "Live traffic simulator started"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.startup_delay) => {}
            _ = shutdown.changed() => {
                info!("Live traffic simulator cancelled before first tick");
                return;
            }
        }

        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = shutdown.changed() => break,
            }
        }

        info!("Live traffic simulator stopped");
    }

    async fn tick(&self) {
        let tick = self.tick.clone();
        let mut work = tokio::task::spawn_blocking(move || tick());

        match tokio::time::timeout(self.tick_timeout, &mut work).await {
            Ok(joined) => forward(joined, self.alerts.as_ref()),
            Err(_) => {
                warn!(
                    timeout_ms = self.tick_timeout.as_millis() as u64,
                    "Live traffic tick timed out"
                );
                let sink = self.alerts.clone();
                tokio::spawn(async move { forward(work.await, sink.as_ref()) });
            }
        }
    }
}

fn forward(
    joined: std::result::Result<Result<Vec<FlaggedTransaction>>, JoinError>,
    sink: Option<&AlertSink>,
) {
    match joined {
        Ok(Ok(flagged)) => {
            debug!(flagged = flagged.len(), "Live traffic tick complete");
            if let Some(sink) = sink {
                for alert in flagged {
                    if sink.send(alert).is_err() {
                        warn!("Alert sink closed");
                        break;
                    }
                }
            }
        }
        Ok(Err(e)) => error!(error = %e, "Live traffic tick failed"),
        Err(e) => error!(error = %e, "Live traffic tick panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::types::alert::AlertStatus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_live_batch_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let batch = TrafficGenerator::batch(&mut rng);
            assert!((3..=8).contains(&batch.len()));
            for tx in &batch {
                assert!(!tx.is_new_device && !tx.location_change);
                assert!(tx.amount >= 500.0 && tx.amount <= 45_000.0);
                assert!(tx.kind().is_some());
            }
        }
    }

    #[test]
    fn test_borderline_rate() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 5000;
        let borderline = (0..n)
            .map(|_| TrafficGenerator::transaction(&mut rng, 12, String::new()))
            .filter(|tx| tx.tx_count_last_5s >= 3)
            .count();
        let rate = borderline as f64 / n as f64;
        assert!((0.09..=0.15).contains(&rate), "rate {rate}");
    }

    #[test]
    fn test_attack_burst_shape() {
        let mut rng = StdRng::seed_from_u64(13);
        let burst = AttackInjector::burst(&mut rng, 20);

        assert_eq!(burst.len(), 20);
        let account = &burst[0].account_id;
        for tx in &burst {
            assert_eq!(&tx.account_id, account);
            assert_eq!(tx.tx_count_last_5s, 20);
            assert_eq!(tx.unique_recipients_last_10tx, 1);
            assert!(tx.hour_of_day < 5);
            assert!((50.0..150.0).contains(&tx.time_delta_ms));
            assert!((4900.0..=5100.0).contains(&tx.amount));
            assert!(tx.is_new_device && tx.location_change);
        }
    }

    fn alert(n: usize) -> FlaggedTransaction {
        FlaggedTransaction {
            alert_id: format!("alert-{n}"),
            account_id: account_id(n as u32),
            amount: 5000.0,
            timestamp: String::new(),
            risk_score: 0.9,
            reason: "test".to_string(),
            status: AlertStatus::Blocked,
            attack_type: None,
        }
    }

    #[tokio::test]
    async fn test_failed_and_slow_ticks_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        // call 0 fails, call 1 overruns the timeout, later calls succeed
        let tick = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            match n {
                0 => Err(EngineError::StatePoisoned),
                1 => {
                    std::thread::sleep(Duration::from_millis(150));
                    Ok(vec![alert(n)])
                }
                _ => Ok(vec![alert(n)]),
            }
        };

        let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(
            LiveTrafficTask::from_fn(&StreamConfig::default(), tick)
                .with_interval(Duration::from_millis(20), Duration::ZERO)
                .with_tick_timeout(Duration::from_millis(30))
                .with_alert_sink(alert_tx)
                .run(shutdown_rx),
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        let made = calls.load(Ordering::SeqCst);
        assert!(made >= 4, "ticks {made}");

        // every successful tick, the late one included, reaches the sink
        let mut received = Vec::new();
        while received.len() < made - 1 {
            let next = tokio::time::timeout(Duration::from_secs(2), alert_rx.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(next.alert_id);
        }
        assert!(received.contains(&"alert-1".to_string()));
        assert!(!received.contains(&"alert-0".to_string()));
    }
}
