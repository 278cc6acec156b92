//! Configuration management for the risk engine

use crate::types::alert::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Request subject for batch analysis
    pub analyze_subject: String,
    /// Request subject for single-transaction scoring
    pub score_subject: String,
    /// Request subject for the dashboard status snapshot
    pub status_subject: String,
    /// Request subject for the attack demo
    pub simulate_subject: String,
    /// Subject for outgoing flagged transactions
    pub alert_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            analyze_subject: "fraud.analyze".to_string(),
            score_subject: "fraud.score".to_string(),
            status_subject: "fraud.status".to_string(),
            simulate_subject: "fraud.simulate_attack".to_string(),
            alert_subject: "fraud.alerts".to_string(),
        }
    }
}

/// Model training configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// JSON training corpus; generated when missing
    pub corpus_path: PathBuf,
    /// Seed for corpus generation and model fitting
    pub seed: u64,
    /// Trees in the isolation forest
    pub isolation_trees: usize,
    /// Expected outlier fraction; derived from the corpus when unset
    pub contamination: Option<f64>,
    /// Train the supervised classifier (false = unsupervised-only scoring)
    pub supervised: bool,
    /// Boosting rounds
    pub boosting_rounds: usize,
    /// Maximum boosted-tree depth
    pub max_depth: usize,
    /// Boosting learning rate
    pub learning_rate: f64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("data/transactions.json"),
            seed: 42,
            isolation_trees: 100,
            contamination: None,
            supervised: true,
            boosting_rounds: 100,
            max_depth: 4,
            learning_rate: 0.1,
        }
    }
}

/// Ensemble weighting and decision thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Ensemble score above which a transaction is fraud
    pub fraud_threshold: f64,
    /// Ensemble score above which a fraud alert is BLOCKED rather than FLAGGED
    pub block_threshold: f64,
    /// Weight of the outlier model in the blend
    pub unsupervised_weight: f64,
    /// Weight of the classifier in the blend
    pub supervised_weight: f64,
    /// Offset applied before rescaling the outlier decision score.
    /// Calibrated for the default forest; recalibrate if the forest changes.
    pub unsupervised_offset: f64,
    /// Risk level classification thresholds
    pub risk_levels: RiskLevelThresholds,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fraud_threshold: 0.5,
            block_threshold: 0.75,
            unsupervised_weight: 0.4,
            supervised_weight: 0.6,
            unsupervised_offset: 0.5,
            risk_levels: RiskLevelThresholds::default(),
        }
    }
}

/// Dashboard stream state and background traffic configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Starting value of the blocked-today counter
    pub blocked_today_baseline: u64,
    /// Recent alerts retained
    pub max_recent_alerts: usize,
    /// Recent alerts returned in a status snapshot
    pub status_alert_window: usize,
    /// Threat timeline entries retained
    pub max_timeline_entries: usize,
    /// Seconds between live-traffic ticks
    pub tick_interval_secs: u64,
    /// Seconds before the first tick
    pub startup_delay_secs: u64,
    /// Upper bound on a single tick
    pub tick_timeout_ms: u64,
    /// Transactions per injected attack burst
    pub attack_burst_size: usize,
    /// Seconds between metrics summaries
    pub metrics_interval_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            blocked_today_baseline: 127,
            max_recent_alerts: 10,
            status_alert_window: 5,
            max_timeline_entries: 20,
            tick_interval_secs: 8,
            startup_delay_secs: 5,
            tick_timeout_ms: 2000,
            attack_burst_size: 20,
            metrics_interval_secs: 60,
        }
    }
}

impl StreamConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn tick_timeout(&self) -> Duration {
        Duration::from_millis(self.tick_timeout_ms.max(1))
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.detection.fraud_threshold, 0.5);
        assert_eq!(config.detection.block_threshold, 0.75);
        assert_eq!(config.stream.blocked_today_baseline, 127);
        assert_eq!(config.stream.max_recent_alerts, 10);
        assert_eq!(config.stream.max_timeline_entries, 20);
        assert!(config.models.supervised);
        assert!(config.models.contamination.is_none());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[models]\nsupervised = false\n\n[stream]\ntick_interval_secs = 3\n",
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();

        assert!(!config.models.supervised);
        assert_eq!(config.models.boosting_rounds, 100);
        assert_eq!(config.stream.tick_interval_secs, 3);
        assert_eq!(config.stream.max_recent_alerts, 10);
        assert_eq!(config.nats.alert_subject, "fraud.alerts");
    }
}
