//! Type definitions for the risk engine

pub mod alert;
pub mod score;
pub mod transaction;

pub use alert::{
    AlertStatus, AttackType, FlaggedTransaction, Recommendation, RiskLevel, RiskLevelThresholds,
    ThreatTimelineEntry,
};
pub use score::{FeatureImportance, ModelBreakdown, ScoreResult};
pub use transaction::{Label, TransactionRecord, TransactionType};
