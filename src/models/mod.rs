//! Risk models: isolation forest, boosted classifier, rule overrides and
//! the ensemble that blends them

pub mod ensemble;
pub mod gradient_boosting;
pub mod isolation_forest;
pub mod rules;
pub mod trainer;

pub use ensemble::EnsembleScorer;
pub use gradient_boosting::{BoostingParams, GradientBoostedClassifier};
pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use rules::{OverrideRule, RuleSet};
pub use trainer::{TrainedModels, Trainer, TrainingSummary};
