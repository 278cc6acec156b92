//! Transport-independent request handling.
//!
//! Maps a request kind and raw JSON payload to a JSON reply. Malformed
//! payloads produce an error reply; they never reach the engine.

use crate::config::NatsConfig;
use crate::engine::FraudEngine;
use crate::types::alert::FlaggedTransaction;
use crate::types::transaction::TransactionRecord;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// Operations exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Analyze,
    Score,
    Status,
    SimulateAttack,
}

/// Subject-to-operation routing table
#[derive(Debug, Clone)]
pub struct Routes {
    routes: Vec<(String, RequestKind)>,
}

impl Routes {
    pub fn from_config(nats: &NatsConfig) -> Self {
        Self {
            routes: vec![
                (nats.analyze_subject.clone(), RequestKind::Analyze),
                (nats.score_subject.clone(), RequestKind::Score),
                (nats.status_subject.clone(), RequestKind::Status),
                (nats.simulate_subject.clone(), RequestKind::SimulateAttack),
            ],
        }
    }

    pub fn resolve(&self, subject: &str) -> Option<RequestKind> {
        self.routes
            .iter()
            .find(|(s, _)| s == subject)
            .map(|(_, kind)| *kind)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(s, _)| s.as_str())
    }
}

/// Reply to an attack simulation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulateAttackResponse {
    pub message: String,
    pub injected_count: usize,
    pub flagged: Vec<FlaggedTransaction>,
}

/// Reply body plus any alerts the request produced
#[derive(Debug, Clone)]
pub struct Reply {
    pub body: Vec<u8>,
    pub flagged: Vec<FlaggedTransaction>,
}

impl Reply {
    fn json<T: Serialize>(value: &T, flagged: Vec<FlaggedTransaction>) -> Result<Self> {
        Ok(Self {
            body: serde_json::to_vec(value).context("Failed to serialize reply")?,
            flagged,
        })
    }

    fn error(message: String) -> Self {
        Self {
            body: json!({ "error": message }).to_string().into_bytes(),
            flagged: Vec::new(),
        }
    }

    /// Parsed reply body
    pub fn value(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

/// Handle one request. Always yields a reply.
pub fn handle(engine: &FraudEngine, kind: RequestKind, payload: &[u8]) -> Reply {
    match dispatch(engine, kind, payload) {
        Ok(reply) => reply,
        Err(e) => {
            warn!(request = ?kind, error = %e, "Request rejected");
            Reply::error(format!("{:#}", e))
        }
    }
}

fn dispatch(engine: &FraudEngine, kind: RequestKind, payload: &[u8]) -> Result<Reply> {
    match kind {
        RequestKind::Analyze => {
            let records = parse_batch(payload)?;
            let analysis = engine.analyze_transactions(&records)?;
            let flagged = analysis.flagged.clone();
            Reply::json(&analysis, flagged)
        }
        RequestKind::Score => {
            let value = parse_json(payload)?;
            let result = engine.score_transaction(&TransactionRecord::from_value(&value));
            Reply::json(&result, Vec::new())
        }
        RequestKind::Status => {
            let tps = if payload.iter().all(u8::is_ascii_whitespace) {
                None
            } else {
                parse_json(payload)?.get("tps").and_then(Value::as_f64)
            };
            let status = engine.status(tps)?;
            Reply::json(&status, Vec::new())
        }
        RequestKind::SimulateAttack => {
            let flagged = engine.simulate_attack()?;
            let response = SimulateAttackResponse {
                message: format!(
                    "Bot attack simulation complete. {} transactions injected.",
                    engine.config().stream.attack_burst_size
                ),
                injected_count: engine.config().stream.attack_burst_size,
                flagged: flagged.clone(),
            };
            Reply::json(&response, flagged)
        }
    }
}

fn parse_json(payload: &[u8]) -> Result<Value> {
    serde_json::from_slice(payload).context("Request body is not valid JSON")
}

/// Accepts `{"transactions": [...]}` or a bare array.
fn parse_batch(payload: &[u8]) -> Result<Vec<TransactionRecord>> {
    let value = parse_json(payload)?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("transactions")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Missing \"transactions\" array"))?,
        _ => return Err(anyhow!("Expected a JSON object or array")),
    };
    Ok(items.iter().map(TransactionRecord::from_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_resolve_configured_subjects() {
        let routes = Routes::from_config(&NatsConfig::default());

        assert_eq!(routes.resolve("fraud.analyze"), Some(RequestKind::Analyze));
        assert_eq!(routes.resolve("fraud.score"), Some(RequestKind::Score));
        assert_eq!(routes.resolve("fraud.status"), Some(RequestKind::Status));
        assert_eq!(
            routes.resolve("fraud.simulate_attack"),
            Some(RequestKind::SimulateAttack)
        );
        assert_eq!(routes.resolve("fraud.alerts"), None);
        assert_eq!(routes.subjects().count(), 4);
    }

    #[test]
    fn test_parse_batch_forms() {
        let wrapped = parse_batch(br#"{"transactions": [{"amount": 10}, {}]}"#).unwrap();
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[0].amount, 10.0);

        let bare = parse_batch(br#"[{"account_id": "PK-ACC0009"}]"#).unwrap();
        assert_eq!(bare[0].account_id, "PK-ACC0009");

        assert!(parse_batch(br#"{"records": []}"#).is_err());
        assert!(parse_batch(b"not json").is_err());
        assert!(parse_batch(b"42").is_err());
    }
}
