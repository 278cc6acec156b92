//! Transaction data structures for mobile-banking risk scoring

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payment rails seen on the platform.
///
/// Ordinals follow the sorted order of the display labels so that training
/// and inference share one stable encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "Card Payment")]
    CardPayment,
    #[serde(rename = "Easypaisa")]
    Easypaisa,
    #[serde(rename = "IBFT")]
    Ibft,
    #[serde(rename = "JazzCash")]
    JazzCash,
    #[serde(rename = "Mobile Top-up")]
    MobileTopUp,
    #[serde(rename = "Raast Transfer")]
    RaastTransfer,
    #[serde(rename = "Utility Bill")]
    UtilityBill,
}

impl TransactionType {
    /// All types in ordinal order.
    pub const ALL: [TransactionType; 7] = [
        TransactionType::CardPayment,
        TransactionType::Easypaisa,
        TransactionType::Ibft,
        TransactionType::JazzCash,
        TransactionType::MobileTopUp,
        TransactionType::RaastTransfer,
        TransactionType::UtilityBill,
    ];

    /// Types used for everyday retail traffic.
    pub const RETAIL: [TransactionType; 5] = [
        TransactionType::RaastTransfer,
        TransactionType::Easypaisa,
        TransactionType::JazzCash,
        TransactionType::Ibft,
        TransactionType::CardPayment,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::CardPayment => "Card Payment",
            TransactionType::Easypaisa => "Easypaisa",
            TransactionType::Ibft => "IBFT",
            TransactionType::JazzCash => "JazzCash",
            TransactionType::MobileTopUp => "Mobile Top-up",
            TransactionType::RaastTransfer => "Raast Transfer",
            TransactionType::UtilityBill => "Utility Bill",
        }
    }

    /// Parse a display label; `None` for anything not in the fixed set.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.label() == label)
    }

    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    /// Ordinal for an arbitrary label, 0 when the label is unknown.
    pub fn ordinal_of(label: &str) -> usize {
        Self::from_label(label).map(|t| t.ordinal()).unwrap_or(0)
    }
}

/// Ground-truth label carried by training records only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Normal,
    Attack,
}

/// A single banking transaction submitted for scoring.
///
/// Every behavioural field has a default so partial records still score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Sending account
    #[serde(default = "default_account_id")]
    pub account_id: String,

    /// Amount in account currency
    #[serde(default = "default_amount")]
    pub amount: f64,

    /// Payment rail label (see [`TransactionType`])
    #[serde(default = "default_transaction_type")]
    pub transaction_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_bank: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_city: Option<String>,

    /// ISO-8601 timestamp
    #[serde(default = "default_timestamp")]
    pub timestamp: String,

    /// Transactions from this account in the trailing 5 seconds
    #[serde(default)]
    pub tx_count_last_5s: u32,

    /// Milliseconds since the account's previous transaction
    #[serde(default = "default_time_delta_ms")]
    pub time_delta_ms: f64,

    /// Local hour (0-23)
    #[serde(default = "default_hour_of_day")]
    pub hour_of_day: u8,

    /// Distinct recipients among the last 10 transactions
    #[serde(default = "default_unique_recipients")]
    pub unique_recipients_last_10tx: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,

    #[serde(default)]
    pub is_new_device: bool,

    #[serde(default)]
    pub location_change: bool,

    /// Present in the training corpus only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
}

pub const DEFAULT_AMOUNT: f64 = 1000.0;
pub const DEFAULT_TIME_DELTA_MS: f64 = 100_000.0;
pub const DEFAULT_HOUR_OF_DAY: u8 = 12;
pub const DEFAULT_UNIQUE_RECIPIENTS: u32 = 5;

fn default_account_id() -> String {
    "UNKNOWN".to_string()
}

fn default_amount() -> f64 {
    DEFAULT_AMOUNT
}

fn default_transaction_type() -> String {
    TransactionType::RaastTransfer.label().to_string()
}

fn default_timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn default_time_delta_ms() -> f64 {
    DEFAULT_TIME_DELTA_MS
}

fn default_hour_of_day() -> u8 {
    DEFAULT_HOUR_OF_DAY
}

fn default_unique_recipients() -> u32 {
    DEFAULT_UNIQUE_RECIPIENTS
}

impl TransactionRecord {
    /// Create a record with behavioural defaults
    pub fn new(account_id: impl Into<String>, amount: f64) -> Self {
        Self {
            account_id: account_id.into(),
            amount,
            transaction_type: default_transaction_type(),
            recipient_bank: None,
            sender_city: None,
            recipient_city: None,
            timestamp: default_timestamp(),
            tx_count_last_5s: 0,
            time_delta_ms: DEFAULT_TIME_DELTA_MS,
            hour_of_day: DEFAULT_HOUR_OF_DAY,
            unique_recipients_last_10tx: DEFAULT_UNIQUE_RECIPIENTS,
            recipient_id: None,
            is_new_device: false,
            location_change: false,
            label: None,
        }
    }

    /// Build a record from an arbitrary JSON mapping.
    ///
    /// Never fails: absent, mistyped or out-of-range fields fall back to
    /// their defaults. Numeric strings and 0/1 flags are accepted.
    pub fn from_value(value: &Value) -> Self {
        let mut tx = Self::new(default_account_id(), DEFAULT_AMOUNT);
        let Some(map) = value.as_object() else {
            return tx;
        };

        if let Some(s) = map.get("account_id").and_then(lenient_string) {
            tx.account_id = s;
        }
        if let Some(v) = map.get("amount").and_then(lenient_f64) {
            tx.amount = v.max(0.0);
        }
        if let Some(s) = map.get("transaction_type").and_then(lenient_string) {
            tx.transaction_type = s;
        }
        tx.recipient_bank = map.get("recipient_bank").and_then(lenient_string);
        tx.sender_city = map.get("sender_city").and_then(lenient_string);
        tx.recipient_city = map.get("recipient_city").and_then(lenient_string);
        if let Some(s) = map.get("timestamp").and_then(lenient_string) {
            tx.timestamp = s;
        }
        if let Some(v) = map.get("tx_count_last_5s").and_then(lenient_count) {
            tx.tx_count_last_5s = v;
        }
        if let Some(v) = map.get("time_delta_ms").and_then(lenient_f64) {
            if v >= 0.0 {
                tx.time_delta_ms = v;
            }
        }
        if let Some(v) = map.get("hour_of_day").and_then(lenient_count) {
            if v < 24 {
                tx.hour_of_day = v as u8;
            }
        }
        if let Some(v) = map.get("unique_recipients_last_10tx").and_then(lenient_count) {
            tx.unique_recipients_last_10tx = v;
        }
        tx.recipient_id = map.get("recipient_id").and_then(lenient_string);
        if let Some(b) = map.get("is_new_device").and_then(lenient_bool) {
            tx.is_new_device = b;
        }
        if let Some(b) = map.get("location_change").and_then(lenient_bool) {
            tx.location_change = b;
        }
        tx.label = map
            .get("label")
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        tx
    }

    /// Parsed payment rail, if recognised
    pub fn kind(&self) -> Option<TransactionType> {
        TransactionType::from_label(&self.transaction_type)
    }

    pub fn is_attack(&self) -> bool {
        self.label == Some(Label::Attack)
    }
}

impl Default for TransactionRecord {
    fn default() -> Self {
        Self::new(default_account_id(), DEFAULT_AMOUNT)
    }
}

fn lenient_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_f64(v: &Value) -> Option<f64> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|x| x.is_finite())
}

fn lenient_count(v: &Value) -> Option<u32> {
    lenient_f64(v)
        .filter(|x| *x >= 0.0 && *x <= u32::MAX as f64)
        .map(|x| x as u32)
}

fn lenient_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|x| x != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_type_ordinals_are_sorted() {
        assert_eq!(TransactionType::ordinal_of("Card Payment"), 0);
        assert_eq!(TransactionType::ordinal_of("Raast Transfer"), 5);
        assert_eq!(TransactionType::ordinal_of("Utility Bill"), 6);
        assert_eq!(TransactionType::ordinal_of("Crypto Swap"), 0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tx: TransactionRecord = serde_json::from_value(json!({
            "account_id": "PK-ACC0001",
            "amount": 2500.0
        }))
        .unwrap();

        assert_eq!(tx.tx_count_last_5s, 0);
        assert_eq!(tx.time_delta_ms, DEFAULT_TIME_DELTA_MS);
        assert_eq!(tx.hour_of_day, 12);
        assert_eq!(tx.unique_recipients_last_10tx, 5);
        assert!(!tx.is_new_device);
        assert!(tx.label.is_none());
    }

    #[test]
    fn test_from_value_tolerates_malformed_fields() {
        let tx = TransactionRecord::from_value(&json!({
            "account_id": 42,
            "amount": "7500.5",
            "tx_count_last_5s": "lots",
            "time_delta_ms": -5,
            "hour_of_day": 31,
            "is_new_device": 1,
            "location_change": "true",
            "label": "bogus"
        }));

        assert_eq!(tx.account_id, "42");
        assert_eq!(tx.amount, 7500.5);
        assert_eq!(tx.tx_count_last_5s, 0);
        assert_eq!(tx.time_delta_ms, DEFAULT_TIME_DELTA_MS);
        assert_eq!(tx.hour_of_day, DEFAULT_HOUR_OF_DAY);
        assert!(tx.is_new_device);
        assert!(tx.location_change);
        assert!(tx.label.is_none());
    }

    #[test]
    fn test_from_value_non_object() {
        let tx = TransactionRecord::from_value(&json!([1, 2, 3]));
        assert_eq!(tx.account_id, "UNKNOWN");
        assert_eq!(tx.amount, DEFAULT_AMOUNT);
    }

    #[test]
    fn test_label_parsing() {
        let tx: TransactionRecord =
            serde_json::from_value(json!({"amount": 5000.0, "label": "attack"})).unwrap();
        assert!(tx.is_attack());
    }
}
