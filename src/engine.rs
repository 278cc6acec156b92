//! The risk engine: trained models, scorer and dashboard state in one
//! explicitly passed context.

use crate::config::AppConfig;
use crate::error::{EngineError, Result};
use crate::metrics::EngineMetrics;
use crate::models::ensemble::EnsembleScorer;
use crate::models::trainer::{TrainedModels, Trainer};
use crate::simulator::{AttackInjector, TrafficGenerator};
use crate::stream::{StreamState, StreamStatus};
use crate::types::alert::FlaggedTransaction;
use crate::types::score::ScoreResult;
use crate::types::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::info;

/// Outcome of a batch analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysis {
    pub flagged: Vec<FlaggedTransaction>,
    pub total_analyzed: usize,
    pub total_flagged: usize,
}

/// Fraud engine shared by request handlers and the live-traffic task.
///
/// Models are fixed at construction. The four mutable dashboard fields live
/// in one `StreamState` behind one mutex; scoring happens outside the lock
/// and only the state update is serialized.
pub struct FraudEngine {
    config: AppConfig,
    scorer: EnsembleScorer,
    state: Mutex<StreamState>,
    metrics: Arc<EngineMetrics>,
}

impl FraudEngine {
    /// Train on the configured corpus (generating it if absent) and build
    /// the engine. Training failures are returned, not papered over.
    pub fn new(config: AppConfig) -> Result<Self> {
        let models = Trainer::new(config.models.clone()).train_from_corpus()?;
        Ok(Self::from_models(config, models))
    }

    /// Build from an in-memory labelled corpus
    pub fn from_records(config: AppConfig, records: &[TransactionRecord]) -> Result<Self> {
        let models = Trainer::new(config.models.clone()).train(records)?;
        Ok(Self::from_models(config, models))
    }

    /// Build from already fitted models
    pub fn from_models(config: AppConfig, models: TrainedModels) -> Self {
        let scorer = EnsembleScorer::new(models, config.detection.clone());
        let state = Mutex::new(StreamState::new(config.stream.clone()));

        info!(
            supervised = scorer.is_supervised(),
            blocked_today_baseline = config.stream.blocked_today_baseline,
            "Fraud engine ready"
        );

        Self {
            config,
            scorer,
            state,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scorer(&self) -> &EnsembleScorer {
        &self.scorer
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }

    fn state(&self) -> Result<MutexGuard<'_, StreamState>> {
        self.state.lock().map_err(|_| EngineError::StatePoisoned)
    }

    /// Full verdict for one transaction. Does not touch dashboard state.
    pub fn score_transaction(&self, tx: &TransactionRecord) -> ScoreResult {
        self.scorer.score(tx)
    }

    /// Score a batch and record it into dashboard state; returns the
    /// flagged subset.
    pub fn analyze_transactions(&self, txs: &[TransactionRecord]) -> Result<BatchAnalysis> {
        let started = Instant::now();
        let results = self.scorer.score_batch(txs);

        let flagged = {
            let mut state = self.state()?;
            state.record_batch(txs, &results, self.config.detection.block_threshold)
        };

        self.metrics.record_batch(&results, started.elapsed());

        Ok(BatchAnalysis {
            total_analyzed: txs.len(),
            total_flagged: flagged.len(),
            flagged,
        })
    }

    /// Dashboard snapshot; `tps` overrides the synthesized throughput.
    pub fn status(&self, tps: Option<f64>) -> Result<StreamStatus> {
        let state = self.state()?;
        Ok(state.status(tps, &mut rand::thread_rng()))
    }

    /// Inject one bot-drain burst and return what got flagged.
    pub fn simulate_attack(&self) -> Result<Vec<FlaggedTransaction>> {
        let burst = AttackInjector::burst(&mut rand::thread_rng(), self.config.stream.attack_burst_size);
        let analysis = self.analyze_transactions(&burst)?;
        info!(
            injected = analysis.total_analyzed,
            flagged = analysis.total_flagged,
            "Attack burst injected"
        );
        Ok(analysis.flagged)
    }

    /// One round of synthetic live traffic.
    pub fn tick_live_traffic(&self) -> Result<Vec<FlaggedTransaction>> {
        let batch = TrafficGenerator::batch(&mut rand::thread_rng());
        Ok(self.analyze_transactions(&batch)?.flagged)
    }
}
