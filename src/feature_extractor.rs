//! Feature extraction for risk-model training and inference.
//!
//! Training and scoring both go through [`FeatureExtractor::extract`], so the
//! column order and the payment-rail encoding cannot drift apart.

use crate::types::transaction::{TransactionRecord, TransactionType};

/// Number of model input columns.
pub const FEATURE_COUNT: usize = 7;

/// Fixed-width numeric projection of a transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    /// Model inputs, in [`FeatureExtractor::feature_names`] order
    pub values: [f64; FEATURE_COUNT],
    /// Payment-rail ordinal; 0 for unknown rails. Not a model input.
    pub transaction_type: usize,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Feature extractor that transforms transactions into model input features.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a transaction.
    ///
    /// Infallible: field defaults are applied when the record is built, and
    /// unknown payment rails map to ordinal 0.
    pub fn extract(&self, tx: &TransactionRecord) -> FeatureVector {
        FeatureVector {
            values: [
                tx.tx_count_last_5s as f64,
                tx.time_delta_ms,
                tx.hour_of_day as f64,
                tx.unique_recipients_last_10tx as f64,
                tx.amount,
                if tx.is_new_device { 1.0 } else { 0.0 },
                if tx.location_change { 1.0 } else { 0.0 },
            ],
            transaction_type: TransactionType::ordinal_of(&tx.transaction_type),
        }
    }

    /// Extract a feature matrix, one row per transaction.
    pub fn extract_matrix(&self, txs: &[TransactionRecord]) -> Vec<[f64; FEATURE_COUNT]> {
        txs.iter().map(|tx| self.extract(tx).values).collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in column order.
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        [
            "tx_count_last_5s",
            "time_delta_ms",
            "hour_of_day",
            "unique_recipients_last_10tx",
            "amount",
            "is_new_device",
            "location_change",
        ]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::new();
        let tx = TransactionRecord {
            tx_count_last_5s: 20,
            time_delta_ms: 80.0,
            hour_of_day: 3,
            unique_recipients_last_10tx: 1,
            is_new_device: true,
            location_change: false,
            ..TransactionRecord::new("PK-ACC0001", 5000.0)
        };

        let features = extractor.extract(&tx);

        assert_eq!(
            features.values,
            [20.0, 80.0, 3.0, 1.0, 5000.0, 1.0, 0.0]
        );
        assert_eq!(features.transaction_type, 5); // Raast Transfer
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let extractor = FeatureExtractor::new();
        let tx = TransactionRecord::from_value(&json!({}));

        let features = extractor.extract(&tx);

        assert_eq!(
            features.values,
            [0.0, 100_000.0, 12.0, 5.0, 1000.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_unknown_transaction_type_falls_back() {
        let extractor = FeatureExtractor::new();
        let tx = TransactionRecord {
            transaction_type: "Pigeon Post".to_string(),
            ..TransactionRecord::default()
        };

        assert_eq!(extractor.extract(&tx).transaction_type, 0);
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), FEATURE_COUNT);
        assert_eq!(extractor.feature_names().len(), FEATURE_COUNT);
    }
}
