//! Startup training of the outlier model and the boosted classifier

use crate::config::ModelsConfig;
use crate::corpus::{self, CorpusSpec};
use crate::error::{EngineError, Result};
use crate::feature_extractor::FeatureExtractor;
use crate::models::gradient_boosting::{BoostingParams, GradientBoostedClassifier};
use crate::models::isolation_forest::{IsolationForest, IsolationForestParams};
use crate::types::transaction::TransactionRecord;
use tracing::{info, warn};

/// Both fitted models. Read-only after construction.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub isolation_forest: IsolationForest,
    /// Absent when the classifier is disabled
    pub classifier: Option<GradientBoostedClassifier>,
    pub summary: TrainingSummary,
}

/// What the models were fitted on
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub records: usize,
    pub normal: usize,
    pub attack: usize,
    pub contamination: f64,
    pub scale_pos_weight: f64,
}

/// Fits models from a labelled corpus
pub struct Trainer {
    config: ModelsConfig,
    extractor: FeatureExtractor,
}

impl Trainer {
    pub fn new(config: ModelsConfig) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::new(),
        }
    }

    /// Load (or generate) the configured corpus and fit on it.
    pub fn train_from_corpus(&self) -> Result<TrainedModels> {
        let spec = CorpusSpec {
            seed: self.config.seed,
            ..CorpusSpec::default()
        };
        let records = corpus::load_or_generate(&self.config.corpus_path, spec)?;
        self.train(&records)
    }

    /// Fit both models.
    ///
    /// Fails on an empty corpus or one containing a single class, since the
    /// contamination and class-weight settings are derived from the class mix.
    pub fn train(&self, records: &[TransactionRecord]) -> Result<TrainedModels> {
        if records.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let labels: Vec<bool> = records.iter().map(|r| r.is_attack()).collect();
        let attack = labels.iter().filter(|&&y| y).count();
        let normal = records.len() - attack;
        if attack == 0 || normal == 0 {
            return Err(EngineError::DegenerateCorpus { normal, attack });
        }

        let contamination = self
            .config
            .contamination
            .unwrap_or(attack as f64 / records.len() as f64)
            .clamp(0.001, 0.5);
        let scale_pos_weight = normal as f64 / attack as f64;

        let matrix = self.extractor.extract_matrix(records);

        let forest_params = IsolationForestParams {
            n_estimators: self.config.isolation_trees,
            contamination,
            seed: self.config.seed,
            ..Default::default()
        };
        let isolation_forest =
            IsolationForest::fit(&matrix, &forest_params).ok_or(EngineError::EmptyCorpus)?;

        let classifier = if self.config.supervised {
            let params = BoostingParams {
                n_estimators: self.config.boosting_rounds,
                max_depth: self.config.max_depth,
                learning_rate: self.config.learning_rate,
                scale_pos_weight,
                ..Default::default()
            };
            Some(GradientBoostedClassifier::fit(&matrix, &labels, &params)?)
        } else {
            warn!("Supervised classifier disabled, scoring with outlier model only");
            None
        };

        info!(
            records = records.len(),
            normal,
            attack,
            contamination,
            scale_pos_weight,
            supervised = classifier.is_some(),
            "Ensemble trained"
        );

        Ok(TrainedModels {
            isolation_forest,
            classifier,
            summary: TrainingSummary {
                records: records.len(),
                normal,
                attack,
                contamination,
                scale_pos_weight,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusGenerator;
    use crate::types::transaction::Label;

    #[test]
    fn test_train_on_generated_corpus() {
        let records = CorpusGenerator::new(CorpusSpec::default()).generate();
        let models = Trainer::new(ModelsConfig::default()).train(&records).unwrap();

        assert!(models.classifier.is_some());
        assert_eq!(models.summary.normal, 420);
        assert_eq!(models.summary.attack, 80);
        assert!((models.summary.scale_pos_weight - 5.25).abs() < 1e-9);
        assert!((models.summary.contamination - 0.16).abs() < 1e-9);
    }

    #[test]
    fn test_unsupervised_only() {
        let records = CorpusGenerator::new(CorpusSpec::default()).generate();
        let config = ModelsConfig {
            supervised: false,
            ..Default::default()
        };
        let models = Trainer::new(config).train(&records).unwrap();
        assert!(models.classifier.is_none());
    }

    #[test]
    fn test_single_class_corpus_is_fatal() {
        let records: Vec<TransactionRecord> = CorpusGenerator::new(CorpusSpec::default())
            .generate()
            .into_iter()
            .filter(|r| r.label == Some(Label::Normal))
            .collect();

        let err = Trainer::new(ModelsConfig::default()).train(&records).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateCorpus { attack: 0, .. }));
    }

    #[test]
    fn test_empty_corpus_is_fatal() {
        let err = Trainer::new(ModelsConfig::default()).train(&[]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyCorpus));
    }
}
