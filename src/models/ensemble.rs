//! Ensemble scoring: outlier model + boosted classifier + rule overrides

use crate::config::DetectionConfig;
use crate::explain::{self, round3};
use crate::feature_extractor::{FeatureExtractor, FeatureVector};
use crate::models::rules::RuleSet;
use crate::models::trainer::TrainedModels;
use crate::types::alert::{Recommendation, RiskLevel};
use crate::types::score::{ModelBreakdown, ScoreResult};
use crate::types::transaction::TransactionRecord;
use tracing::debug;

/// Scores transactions against the fitted models.
///
/// Holds the models read-only, so one scorer can be shared across any
/// number of concurrent callers.
pub struct EnsembleScorer {
    models: TrainedModels,
    rules: RuleSet,
    extractor: FeatureExtractor,
    config: DetectionConfig,
}

impl EnsembleScorer {
    pub fn new(models: TrainedModels, config: DetectionConfig) -> Self {
        Self {
            models,
            rules: RuleSet::default(),
            extractor: FeatureExtractor::new(),
            config,
        }
    }

    /// Replace the override table
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Whether the classifier takes part in the blend
    pub fn is_supervised(&self) -> bool {
        self.models.classifier.is_some()
    }

    pub fn models(&self) -> &TrainedModels {
        &self.models
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Outlier decision score rescaled to [0, 1] (before rule overrides).
    pub fn unsupervised_risk(&self, features: &FeatureVector) -> f64 {
        let raw = self
            .models
            .isolation_forest
            .decision_function(features.as_slice());
        (1.0 - (raw + self.config.unsupervised_offset)).clamp(0.0, 1.0)
    }

    /// Classifier fraud probability, `None` when running unsupervised-only.
    pub fn supervised_probability(&self, features: &FeatureVector) -> Option<f64> {
        self.models
            .classifier
            .as_ref()
            .map(|c| c.predict_proba(features.as_slice()).clamp(0.0, 1.0))
    }

    fn blend(&self, unsupervised: f64, supervised: Option<f64>) -> f64 {
        let blended = match supervised {
            Some(p) => {
                let wu = self.config.unsupervised_weight.max(0.0);
                let ws = self.config.supervised_weight.max(0.0);
                let total = wu + ws;
                if total > 0.0 {
                    (wu * unsupervised + ws * p) / total
                } else {
                    unsupervised
                }
            }
            None => unsupervised,
        };
        round3(blended.clamp(0.0, 1.0))
    }

    /// Score a single transaction. Pure: no shared state is touched.
    pub fn score(&self, tx: &TransactionRecord) -> ScoreResult {
        let features = self.extractor.extract(tx);

        let unsupervised = self.rules.apply(self.unsupervised_risk(&features), tx);
        let supervised = self.supervised_probability(&features);
        let ensemble = self.blend(unsupervised, supervised);

        let is_fraud = ensemble > self.config.fraud_threshold;
        let thresholds = &self.config.risk_levels;

        debug!(
            account_id = %tx.account_id,
            unsupervised,
            supervised = ?supervised,
            ensemble,
            rules = ?self.rules.triggered(tx),
            "Transaction scored"
        );

        ScoreResult {
            account_id: tx.account_id.clone(),
            amount: tx.amount,
            transaction_type: tx.transaction_type.clone(),
            is_fraud,
            fraud_probability: ensemble,
            risk_label: RiskLevel::from_score(ensemble, thresholds),
            attack_type: is_fraud.then(|| explain::attack_type(tx)),
            reason: if is_fraud {
                explain::reason(tx)
            } else {
                explain::NORMAL_REASON.to_string()
            },
            recommendation: Recommendation::from_score(ensemble, thresholds)
                .message()
                .to_string(),
            model_breakdown: ModelBreakdown {
                unsupervised: round3(unsupervised),
                supervised: supervised.map(round3),
                ensemble,
            },
            feature_importance: explain::feature_importance(tx),
        }
    }

    /// Score each transaction independently
    pub fn score_batch(&self, txs: &[TransactionRecord]) -> Vec<ScoreResult> {
        txs.iter().map(|tx| self.score(tx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelsConfig;
    use crate::corpus::{CorpusGenerator, CorpusSpec};
    use crate::models::rules::OverrideRule;
    use crate::models::trainer::Trainer;
    use crate::types::alert::AttackType;

    fn scorer(supervised: bool) -> EnsembleScorer {
        let records = CorpusGenerator::new(CorpusSpec::default()).generate();
        let models = Trainer::new(ModelsConfig {
            supervised,
            ..Default::default()
        })
        .train(&records)
        .unwrap();
        EnsembleScorer::new(models, DetectionConfig::default())
    }

    fn bot_drain() -> TransactionRecord {
        TransactionRecord {
            tx_count_last_5s: 20,
            time_delta_ms: 80.0,
            unique_recipients_last_10tx: 1,
            is_new_device: true,
            location_change: true,
            hour_of_day: 3,
            ..TransactionRecord::new("PK-ACC0777", 5000.0)
        }
    }

    fn everyday() -> TransactionRecord {
        TransactionRecord {
            tx_count_last_5s: 1,
            time_delta_ms: 90_000.0,
            unique_recipients_last_10tx: 6,
            hour_of_day: 14,
            ..TransactionRecord::new("PK-ACC0012", 3000.0)
        }
    }

    #[test]
    fn test_bot_drain_is_critical() {
        let result = scorer(true).score(&bot_drain());

        assert!(result.is_fraud);
        assert_eq!(result.risk_label, RiskLevel::Critical);
        assert_eq!(result.attack_type, Some(AttackType::AgenticBotDrain));
        assert!(result.recommendation.starts_with("BLOCK"));
        assert!(result.model_breakdown.supervised.unwrap() > 0.9);
    }

    #[test]
    fn test_everyday_transfer_is_approved() {
        let result = scorer(true).score(&everyday());

        assert!(!result.is_fraud);
        assert_eq!(result.risk_label, RiskLevel::Low);
        assert!(result.attack_type.is_none());
        assert_eq!(result.reason, explain::NORMAL_REASON);
        assert!(result.recommendation.starts_with("APPROVE"));
    }

    #[test]
    fn test_rules_floor_unsupervised_component() {
        let scorer = scorer(true);
        let tx = TransactionRecord {
            tx_count_last_5s: 12,
            ..everyday()
        };

        let result = scorer.score(&tx);
        assert!(result.model_breakdown.unsupervised >= 0.85);

        let raw = scorer.unsupervised_risk(&FeatureExtractor::new().extract(&tx));
        assert!(result.model_breakdown.unsupervised >= round3(raw));
    }

    #[test]
    fn test_unsupervised_only_mode() {
        let scorer = scorer(false);
        assert!(!scorer.is_supervised());

        let result = scorer.score(&bot_drain());
        assert!(result.model_breakdown.supervised.is_none());
        assert_eq!(result.fraud_probability, result.model_breakdown.unsupervised);
        assert!(result.fraud_probability >= 0.85);
        assert!(result.is_fraud);
    }

    #[test]
    fn test_scores_bounded_and_consistent() {
        let scorer = scorer(true);
        let records = CorpusGenerator::new(CorpusSpec {
            seed: 7,
            ..CorpusSpec::default()
        })
        .generate();

        for result in scorer.score_batch(&records) {
            let b = &result.model_breakdown;
            assert!((0.0..=1.0).contains(&b.unsupervised));
            assert!((0.0..=1.0).contains(&b.supervised.unwrap()));
            assert!((0.0..=1.0).contains(&result.fraud_probability));
            assert_eq!(result.is_fraud, result.fraud_probability > 0.5);
            assert_eq!(result.attack_type.is_some(), result.is_fraud);
        }
    }

    #[test]
    fn test_unknown_transaction_type_scores() {
        let tx = TransactionRecord {
            transaction_type: "Carrier Pigeon".to_string(),
            ..everyday()
        };
        let result = scorer(true).score(&tx);
        assert_eq!(result.transaction_type, "Carrier Pigeon");
        assert!(!result.is_fraud);
    }

    #[test]
    fn test_custom_rule_table() {
        let tx = TransactionRecord {
            tx_count_last_5s: 12,
            ..everyday()
        };
        let features = FeatureExtractor::new().extract(&tx);

        let bare = scorer(true).with_rules(RuleSet::new(Vec::new()));
        let raw = bare.unsupervised_risk(&features);
        assert_eq!(bare.score(&tx).model_breakdown.unsupervised, round3(raw));

        let strict = scorer(true).with_rules(RuleSet::new(vec![OverrideRule {
            name: "any_amount",
            score: 0.99,
            predicate: |tx| tx.amount > 0.0,
        }]));
        assert_eq!(strict.score(&everyday()).model_breakdown.unsupervised, 0.99);
    }
}
