//! Alert and dashboard data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from score and thresholds.
    ///
    /// Total over every input: anything below `medium` (including NaN) is Low.
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Dashboard threat level from the number of active (blocked) alerts
    pub fn from_active_threats(active: usize) -> Self {
        match active {
            0 => RiskLevel::Low,
            1..=2 => RiskLevel::Medium,
            3..=4 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configurable risk level thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 0.35,
            high: 0.6,
            critical: 0.8,
        }
    }
}

/// Operator action suggested for a scored transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Approve,
    Monitor,
    Flag,
    Block,
}

impl Recommendation {
    /// Uses the same cut points as [`RiskLevel::from_score`].
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        match RiskLevel::from_score(score, thresholds) {
            RiskLevel::Critical => Recommendation::Block,
            RiskLevel::High => Recommendation::Flag,
            RiskLevel::Medium => Recommendation::Monitor,
            RiskLevel::Low => Recommendation::Approve,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::Block => "BLOCK: Refer to fraud team immediately",
            Recommendation::Flag => "FLAG: Require additional OTP verification",
            Recommendation::Monitor => "MONITOR: Track next 5 transactions",
            Recommendation::Approve => "APPROVE: Transaction appears legitimate",
        }
    }
}

/// Attack pattern attributed to a flagged transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    #[serde(rename = "Agentic Bot Drain")]
    AgenticBotDrain,
    #[serde(rename = "Account Takeover")]
    AccountTakeover,
    #[serde(rename = "Card Testing")]
    CardTesting,
    #[serde(rename = "Late-Night High-Value Fraud")]
    LateNightHighValue,
    #[serde(rename = "Behavioral Anomaly")]
    BehavioralAnomaly,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::AgenticBotDrain => "Agentic Bot Drain",
            AttackType::AccountTakeover => "Account Takeover",
            AttackType::CardTesting => "Card Testing",
            AttackType::LateNightHighValue => "Late-Night High-Value Fraud",
            AttackType::BehavioralAnomaly => "Behavioral Anomaly",
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Blocked,
    Flagged,
}

/// A transaction the ensemble judged fraudulent.
///
/// Immutable once recorded; only evicted from the recent-alert window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedTransaction {
    /// Unique alert identifier
    pub alert_id: String,

    pub account_id: String,

    pub amount: f64,

    /// Timestamp carried over from the transaction
    pub timestamp: String,

    /// Ensemble score (0.0 - 1.0)
    pub risk_score: f64,

    pub reason: String,

    pub status: AlertStatus,

    pub attack_type: Option<AttackType>,
}

/// One point on the dashboard threat chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatTimelineEntry {
    /// Wall-clock time of the batch (HH:MM:SS)
    pub time: String,
    /// Flagged transactions in the batch
    pub threats: usize,
    /// Transactions in the batch
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_score() {
        let thresholds = RiskLevelThresholds::default();

        assert_eq!(RiskLevel::from_score(0.1, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.35, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.59, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.6, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.8, &thresholds), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(1.0, &thresholds), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(f64::NAN, &thresholds), RiskLevel::Low);
    }

    #[test]
    fn test_risk_levels_partition_unit_interval() {
        let thresholds = RiskLevelThresholds::default();
        let mut previous = RiskLevel::Low;
        for i in 0..=1000 {
            let level = RiskLevel::from_score(i as f64 / 1000.0, &thresholds);
            assert!(level >= previous, "levels must be monotone in score");
            previous = level;
        }
        assert_eq!(previous, RiskLevel::Critical);
    }

    #[test]
    fn test_recommendation_tracks_risk_level() {
        let thresholds = RiskLevelThresholds::default();
        assert!(Recommendation::from_score(0.9, &thresholds)
            .message()
            .starts_with("BLOCK"));
        assert!(Recommendation::from_score(0.65, &thresholds)
            .message()
            .starts_with("FLAG"));
        assert!(Recommendation::from_score(0.4, &thresholds)
            .message()
            .starts_with("MONITOR"));
        assert!(Recommendation::from_score(0.2, &thresholds)
            .message()
            .starts_with("APPROVE"));
    }

    #[test]
    fn test_active_threat_levels() {
        assert_eq!(RiskLevel::from_active_threats(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_active_threats(1), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_active_threats(3), RiskLevel::High);
        assert_eq!(RiskLevel::from_active_threats(5), RiskLevel::Critical);
    }

    #[test]
    fn test_flagged_transaction_wire_format() {
        let flagged = FlaggedTransaction {
            alert_id: "a-1".to_string(),
            account_id: "PK-ACC0101".to_string(),
            amount: 5000.0,
            timestamp: "2026-01-01T03:00:00Z".to_string(),
            risk_score: 0.93,
            reason: "Single-target drain pattern".to_string(),
            status: AlertStatus::Blocked,
            attack_type: Some(AttackType::AgenticBotDrain),
        };

        let json = serde_json::to_value(&flagged).unwrap();
        assert_eq!(json["status"], "BLOCKED");
        assert_eq!(json["attack_type"], "Agentic Bot Drain");
    }
}
