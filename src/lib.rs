//! Transaction Risk Engine Library
//!
//! Real-time risk scoring for bot-driven account-drain attacks: an
//! isolation forest and a boosted classifier trained at startup, rule
//! overrides, explanations and a streaming dashboard state, served over NATS.

pub mod config;
pub mod consumer;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod explain;
pub mod feature_extractor;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod simulator;
pub mod stream;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use engine::{BatchAnalysis, FraudEngine};
pub use error::EngineError;
pub use feature_extractor::FeatureExtractor;
pub use models::ensemble::EnsembleScorer;
pub use producer::AlertProducer;
pub use stream::StreamStatus;
pub use types::{alert::FlaggedTransaction, score::ScoreResult, transaction::TransactionRecord};
