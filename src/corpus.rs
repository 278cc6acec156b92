//! Training corpus loading and synthetic corpus generation

use crate::error::{EngineError, Result};
use crate::types::transaction::{Label, TransactionRecord, TransactionType};
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const CITIES: [&str; 8] = [
    "Karachi",
    "Lahore",
    "Islamabad",
    "Rawalpindi",
    "Faisalabad",
    "Multan",
    "Peshawar",
    "Quetta",
];

pub const RECIPIENT_BANKS: [&str; 8] = [
    "HBL",
    "MCB",
    "UBL",
    "Meezan Bank",
    "Allied Bank",
    "Bank Alfalah",
    "Easypaisa",
    "JazzCash",
];

pub fn account_id(n: u32) -> String {
    format!("PK-ACC{:04}", n)
}

pub fn recipient_id(n: u32) -> String {
    format!("PK-REC{:04}", n)
}

/// Shape of the generated corpus
#[derive(Debug, Clone)]
pub struct CorpusSpec {
    pub normal_count: usize,
    pub attack_bursts: usize,
    pub burst_len: usize,
    pub seed: u64,
}

impl Default for CorpusSpec {
    fn default() -> Self {
        Self {
            normal_count: 420,
            attack_bursts: 4,
            burst_len: 20,
            seed: 42,
        }
    }
}

/// Deterministic generator for a labelled demo corpus.
pub struct CorpusGenerator {
    rng: StdRng,
    spec: CorpusSpec,
}

impl CorpusGenerator {
    pub fn new(spec: CorpusSpec) -> Self {
        Self {
            rng: StdRng::seed_from_u64(spec.seed),
            spec,
        }
    }

    /// Generate the shuffled corpus
    pub fn generate(mut self) -> Vec<TransactionRecord> {
        let base_time = Utc::now() - Duration::hours(24);
        let mut records =
            Vec::with_capacity(self.spec.normal_count + self.spec.attack_bursts * self.spec.burst_len);

        for i in 0..self.spec.normal_count {
            let account = account_id(self.rng.gen_range(1..=50));
            let at = base_time
                + Duration::minutes(i as i64 * 3)
                + Duration::seconds(self.rng.gen_range(60..=600));
            records.push(self.normal(account, at.to_rfc3339()));
        }

        for _ in 0..self.spec.attack_bursts {
            let account = account_id(self.rng.gen_range(51..=55));
            let burst_start = base_time + Duration::hours(self.rng.gen_range(1..=20));
            for i in 0..self.spec.burst_len {
                let at = burst_start + Duration::milliseconds(i as i64 * 80);
                records.push(self.attack(account.clone(), at.to_rfc3339()));
            }
        }

        records.shuffle(&mut self.rng);
        records
    }

    fn normal(&mut self, account: String, timestamp: String) -> TransactionRecord {
        let kind = *TransactionType::ALL
            .choose(&mut self.rng)
            .unwrap_or(&TransactionType::RaastTransfer);
        TransactionRecord {
            account_id: account,
            amount: round2(self.rng.gen_range(500.0..150_000.0)),
            transaction_type: kind.label().to_string(),
            recipient_bank: Some(self.pick(&RECIPIENT_BANKS)),
            sender_city: Some(self.pick(&CITIES)),
            recipient_city: Some(self.pick(&CITIES)),
            timestamp,
            tx_count_last_5s: self.rng.gen_range(0..=2),
            time_delta_ms: self.rng.gen_range(60_000.0..900_000.0),
            hour_of_day: self.rng.gen_range(8..=22),
            unique_recipients_last_10tx: self.rng.gen_range(3..=10),
            recipient_id: Some(recipient_id(self.rng.gen_range(100..=999))),
            is_new_device: false,
            location_change: false,
            label: Some(Label::Normal),
        }
    }

    fn attack(&mut self, account: String, timestamp: String) -> TransactionRecord {
        TransactionRecord {
            account_id: account,
            amount: round2(self.rng.gen_range(4900.0..5100.0)),
            transaction_type: TransactionType::RaastTransfer.label().to_string(),
            recipient_bank: Some("Easypaisa".to_string()),
            sender_city: Some("Karachi".to_string()),
            recipient_city: Some("Lahore".to_string()),
            timestamp,
            tx_count_last_5s: self.rng.gen_range(15..=25),
            time_delta_ms: self.rng.gen_range(50.0..200.0),
            hour_of_day: self.rng.gen_range(0..=5),
            unique_recipients_last_10tx: 1,
            recipient_id: Some(recipient_id(666)),
            is_new_device: true,
            location_change: true,
            label: Some(Label::Attack),
        }
    }

    fn pick(&mut self, choices: &[&str]) -> String {
        choices[self.rng.gen_range(0..choices.len())].to_string()
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Read a corpus from a JSON array file.
///
/// Only the array itself is strict. Each element goes through the lenient
/// record parser, and any label other than `"normal"` counts as an attack.
pub fn load(path: &Path) -> Result<Vec<TransactionRecord>> {
    let raw = fs::read(path).map_err(|source| EngineError::CorpusIo {
        path: path.to_path_buf(),
        source,
    })?;
    let items: Vec<Value> =
        serde_json::from_slice(&raw).map_err(|source| EngineError::CorpusFormat {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(items.iter().map(training_record).collect())
}

fn training_record(value: &Value) -> TransactionRecord {
    let mut record = TransactionRecord::from_value(value);
    record.label = match value.get("label").and_then(Value::as_str) {
        Some("normal") => Some(Label::Normal),
        _ => Some(Label::Attack),
    };
    record
}

/// Write a corpus as a pretty JSON array, creating parent directories.
pub fn save(path: &Path, records: &[TransactionRecord]) -> Result<()> {
    let io_err = |source| EngineError::CorpusIo {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_vec_pretty(records).map_err(|source| EngineError::CorpusFormat {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}

/// Load the corpus, generating and persisting one first if the file is absent.
pub fn load_or_generate(path: &Path, spec: CorpusSpec) -> Result<Vec<TransactionRecord>> {
    if !path.exists() {
        warn!(path = %path.display(), "Training corpus not found, generating synthetic corpus");
        let records = CorpusGenerator::new(spec).generate();
        save(path, &records)?;
        info!(
            path = %path.display(),
            count = records.len(),
            attack = records.iter().filter(|r| r.is_attack()).count(),
            "Synthetic corpus written"
        );
    }

    let records = load(path)?;
    info!(path = %path.display(), count = records.len(), "Training corpus loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_corpus_shape() {
        let records = CorpusGenerator::new(CorpusSpec::default()).generate();

        assert_eq!(records.len(), 500);
        assert_eq!(records.iter().filter(|r| r.is_attack()).count(), 80);
        assert!(records
            .iter()
            .filter(|r| r.is_attack())
            .all(|r| r.unique_recipients_last_10tx == 1 && r.is_new_device));
        assert!(records
            .iter()
            .filter(|r| !r.is_attack())
            .all(|r| r.tx_count_last_5s <= 2 && r.time_delta_ms >= 60_000.0));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = CorpusGenerator::new(CorpusSpec::default()).generate();
        let b = CorpusGenerator::new(CorpusSpec::default()).generate();

        let amounts_a: Vec<f64> = a.iter().map(|r| r.amount).collect();
        let amounts_b: Vec<f64> = b.iter().map(|r| r.amount).collect();
        assert_eq!(amounts_a, amounts_b);
    }

    #[test]
    fn test_load_or_generate_writes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("transactions.json");

        let records = load_or_generate(&path, CorpusSpec::default()).unwrap();

        assert!(path.exists());
        assert_eq!(records.len(), 500);
        assert_eq!(load(&path).unwrap().len(), 500);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{not json").unwrap();

        assert!(matches!(load(&path), Err(EngineError::CorpusFormat { .. })));

        fs::write(&path, br#"{"transactions": []}"#).unwrap();
        assert!(matches!(load(&path), Err(EngineError::CorpusFormat { .. })));
    }

    #[test]
    fn test_load_tolerates_loose_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loose.json");
        fs::write(
            &path,
            br#"[
                {"account_id": "PK-ACC0001", "amount": "2500", "hour_of_day": 12.0,
                 "tx_count_last_5s": null, "is_new_device": 0, "label": "normal"},
                {"account_id": "PK-ACC0002", "tx_count_last_5s": 18.0, "label": "attack"},
                {"account_id": "PK-ACC0003", "label": "suspicious"},
                {"account_id": "PK-ACC0004"}
            ]"#,
        )
        .unwrap();

        let records = load(&path).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].amount, 2500.0);
        assert_eq!(records[0].hour_of_day, 12);
        assert_eq!(records[0].tx_count_last_5s, 0);
        assert!(!records[0].is_new_device);
        assert_eq!(records[1].tx_count_last_5s, 18);
        assert_eq!(
            records.iter().map(|r| r.is_attack()).collect::<Vec<_>>(),
            vec![false, true, true, true]
        );
    }
}
