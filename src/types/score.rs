//! Scoring output structures

use crate::types::alert::{AttackType, RiskLevel};
use serde::{Deserialize, Serialize};

/// Per-model contributions to the ensemble score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBreakdown {
    /// Rescaled outlier score after rule overrides (0.0 - 1.0)
    pub unsupervised: f64,
    /// Classifier fraud probability; `None` when running unsupervised-only
    pub supervised: Option<f64>,
    /// Blended score
    pub ensemble: f64,
}

/// One explanatory signal for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub label: String,
    /// Normalized suspicion (0.0 - 1.0)
    pub score: f64,
    /// Human-readable raw value
    pub value: String,
}

/// Full scoring verdict for a single transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub account_id: String,
    pub amount: f64,
    pub transaction_type: String,
    pub is_fraud: bool,
    /// Ensemble score (0.0 - 1.0)
    pub fraud_probability: f64,
    pub risk_label: RiskLevel,
    /// Only set when `is_fraud`
    pub attack_type: Option<AttackType>,
    pub reason: String,
    pub recommendation: String,
    pub model_breakdown: ModelBreakdown,
    /// Sorted by descending score
    pub feature_importance: Vec<FeatureImportance>,
}
