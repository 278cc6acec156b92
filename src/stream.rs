//! Dashboard stream state: recent alerts, threat timeline and counters.
//!
//! `StreamState` itself is not synchronized. The engine keeps it behind a
//! single mutex and holds the guard for the whole of [`StreamState::record_batch`],
//! so each batch's prepend, truncation and counter updates land as one unit.

use crate::config::StreamConfig;
use crate::types::alert::{AlertStatus, FlaggedTransaction, RiskLevel, ThreatTimelineEntry};
use crate::types::score::ScoreResult;
use crate::types::transaction::TransactionRecord;
use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

/// Point-in-time dashboard snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamStatus {
    /// BLOCKED alerts among the most recent few
    pub active_threats: usize,
    pub blocked_today: u64,
    pub transactions_per_second: f64,
    pub risk_level: RiskLevel,
    /// Most recent alerts, newest first
    pub recent_alerts: Vec<FlaggedTransaction>,
    /// Oldest first
    pub threat_timeline: Vec<ThreatTimelineEntry>,
    pub total_processed: u64,
}

/// Mutable dashboard state
#[derive(Debug, Clone)]
pub struct StreamState {
    blocked_today: u64,
    recent_alerts: VecDeque<FlaggedTransaction>,
    threat_timeline: VecDeque<ThreatTimelineEntry>,
    total_processed: u64,
    config: StreamConfig,
}

impl StreamState {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            blocked_today: config.blocked_today_baseline,
            recent_alerts: VecDeque::with_capacity(config.max_recent_alerts + 1),
            threat_timeline: VecDeque::with_capacity(config.max_timeline_entries + 1),
            total_processed: 0,
            config,
        }
    }

    /// Record one scored batch.
    ///
    /// `records` and `results` are paired by position. Every fraud result
    /// becomes a FlaggedTransaction at the front of the recent-alert window;
    /// the batch as a whole adds one timeline entry.
    pub fn record_batch(
        &mut self,
        records: &[TransactionRecord],
        results: &[ScoreResult],
        block_threshold: f64,
    ) -> Vec<FlaggedTransaction> {
        let flagged: Vec<FlaggedTransaction> = records
            .iter()
            .zip(results)
            .filter(|(_, result)| result.is_fraud)
            .map(|(tx, result)| flag(tx, result, block_threshold))
            .collect();

        for alert in &flagged {
            self.recent_alerts.push_front(alert.clone());
            self.blocked_today += 1;
        }
        self.recent_alerts.truncate(self.config.max_recent_alerts);

        self.threat_timeline.push_back(ThreatTimelineEntry {
            time: Local::now().format("%H:%M:%S").to_string(),
            threats: flagged.len(),
            total: results.len(),
        });
        while self.threat_timeline.len() > self.config.max_timeline_entries {
            self.threat_timeline.pop_front();
        }

        self.total_processed += results.len() as u64;

        if !flagged.is_empty() {
            info!(
                flagged = flagged.len(),
                total = results.len(),
                blocked_today = self.blocked_today,
                "Batch recorded with alerts"
            );
        }

        flagged
    }

    /// Compose a dashboard snapshot. Read-only.
    ///
    /// Without an explicit `tps` a display value is synthesized that rises
    /// with recent alert volume; it is not a measurement.
    pub fn status<R: Rng>(&self, tps: Option<f64>, rng: &mut R) -> StreamStatus {
        let recent: Vec<FlaggedTransaction> = self
            .recent_alerts
            .iter()
            .take(self.config.status_alert_window)
            .cloned()
            .collect();
        let active_threats = recent
            .iter()
            .filter(|a| a.status == AlertStatus::Blocked)
            .count();

        let tps = tps.unwrap_or_else(|| {
            let base = 18.0 + 2.0 * self.recent_alerts.len() as f64;
            let lo = (base - 5.0).max(8.0);
            let hi = (base + 15.0).min(80.0);
            (rng.gen_range(lo..=hi) * 10.0).round() / 10.0
        });

        StreamStatus {
            active_threats,
            blocked_today: self.blocked_today,
            transactions_per_second: tps,
            risk_level: RiskLevel::from_active_threats(active_threats),
            recent_alerts: recent,
            threat_timeline: self.threat_timeline.iter().cloned().collect(),
            total_processed: self.total_processed,
        }
    }

    pub fn blocked_today(&self) -> u64 {
        self.blocked_today
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    pub fn recent_alerts(&self) -> impl Iterator<Item = &FlaggedTransaction> {
        self.recent_alerts.iter()
    }

    pub fn recent_alert_count(&self) -> usize {
        self.recent_alerts.len()
    }

    pub fn timeline_len(&self) -> usize {
        self.threat_timeline.len()
    }
}

fn flag(tx: &TransactionRecord, result: &ScoreResult, block_threshold: f64) -> FlaggedTransaction {
    FlaggedTransaction {
        alert_id: uuid::Uuid::new_v4().to_string(),
        account_id: result.account_id.clone(),
        amount: result.amount,
        timestamp: tx.timestamp.clone(),
        risk_score: result.fraud_probability,
        reason: result.reason.clone(),
        status: if result.fraud_probability > block_threshold {
            AlertStatus::Blocked
        } else {
            AlertStatus::Flagged
        },
        attack_type: result.attack_type,
    }
}
