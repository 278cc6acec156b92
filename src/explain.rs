//! Attack-type attribution and human-readable explanations.
//!
//! Nothing here feeds back into the fraud decision; it only describes it.

use crate::types::alert::AttackType;
use crate::types::score::FeatureImportance;
use crate::types::transaction::TransactionRecord;

/// Reason used when no specific clause applies.
pub const FALLBACK_REASON: &str = "Statistical anomaly detected by ensemble model";

/// Reason attached to transactions that are not flagged.
pub const NORMAL_REASON: &str = "Transaction profile within normal parameters";

const MAX_REASON_CLAUSES: usize = 2;

/// Attack-type rules, first match wins.
const ATTACK_RULES: [(AttackType, fn(&TransactionRecord) -> bool); 4] = [
    (AttackType::AgenticBotDrain, |tx| {
        tx.tx_count_last_5s >= 15 && tx.unique_recipients_last_10tx <= 1
    }),
    (AttackType::AccountTakeover, |tx| {
        tx.is_new_device && tx.location_change
    }),
    (AttackType::CardTesting, |tx| {
        tx.amount < 1000.0 && tx.tx_count_last_5s >= 5
    }),
    (AttackType::LateNightHighValue, |tx| {
        tx.hour_of_day < 5 && tx.amount > 50_000.0
    }),
];

/// Classify the attack pattern of a flagged transaction
pub fn attack_type(tx: &TransactionRecord) -> AttackType {
    ATTACK_RULES
        .iter()
        .find(|(_, matches)| matches(tx))
        .map(|(kind, _)| *kind)
        .unwrap_or(AttackType::BehavioralAnomaly)
}

/// Up to two triggered clauses, in priority order, joined with "; ".
pub fn reason(tx: &TransactionRecord) -> String {
    let mut clauses = Vec::new();

    if tx.tx_count_last_5s >= 10 {
        clauses.push(format!(
            "High-velocity burst ({} transfers in 5s)",
            tx.tx_count_last_5s
        ));
    }
    if tx.time_delta_ms < 300.0 {
        clauses.push(format!(
            "Non-human rhythm ({:.0}ms between transfers)",
            tx.time_delta_ms
        ));
    }
    if tx.unique_recipients_last_10tx <= 1 {
        clauses.push("Single-target drain pattern".to_string());
    }
    if tx.is_new_device {
        clauses.push("Unrecognized device".to_string());
    }
    if tx.location_change {
        clauses.push(format!(
            "Sudden city change ({} → {})",
            tx.sender_city.as_deref().unwrap_or("?"),
            tx.recipient_city.as_deref().unwrap_or("?")
        ));
    }
    if tx.hour_of_day < 5 {
        clauses.push(format!("Unusual hour ({}:00 AM)", tx.hour_of_day));
    }

    if clauses.is_empty() {
        return FALLBACK_REASON.to_string();
    }
    clauses.truncate(MAX_REASON_CLAUSES);
    clauses.join("; ")
}

/// Six display signals, each normalized to [0, 1], sorted by descending score.
pub fn feature_importance(tx: &TransactionRecord) -> Vec<FeatureImportance> {
    let velocity = (tx.tx_count_last_5s as f64 / 20.0).min(1.0);
    let speed = (1.0 - tx.time_delta_ms.min(60_000.0) / 60_000.0).max(0.0);
    let diversity = (1.0 - (tx.unique_recipients_last_10tx.min(5) as f64) / 5.0).max(0.0);
    let hour = match tx.hour_of_day {
        0..=4 => 0.8,
        5..=7 | 23.. => 0.3,
        _ => 0.0,
    };
    let amount = (tx.amount / 200_000.0).clamp(0.0, 1.0);
    let device = (if tx.is_new_device { 0.5 } else { 0.0 })
        + (if tx.location_change { 0.5 } else { 0.0 });

    let device_value = match (tx.is_new_device, tx.location_change) {
        (true, true) => "New device + City change",
        (true, false) => "New device",
        (false, true) => "City change",
        (false, false) => "Normal",
    };

    let mut signals = vec![
        signal("TX Velocity", velocity, format!("{} tx/5s", tx.tx_count_last_5s)),
        signal("Inter-TX Speed", speed, format!("{:.0}ms", tx.time_delta_ms)),
        signal(
            "Recipient Diversity",
            diversity,
            format!("{} unique", tx.unique_recipients_last_10tx),
        ),
        signal("Hour of Day", hour, format!("{:02}:00", tx.hour_of_day)),
        signal("Amount", amount, format!("PKR {}", group_thousands(tx.amount))),
        signal("Device / Location", device, device_value.to_string()),
    ];

    // Stable sort keeps declaration order among ties.
    signals.sort_by(|a, b| b.score.total_cmp(&a.score));
    signals
}

fn signal(label: &str, score: f64, value: String) -> FeatureImportance {
    FeatureImportance {
        label: label.to_string(),
        score: round3(score),
        value,
    }
}

pub(crate) fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn group_thousands(amount: f64) -> String {
    let digits = format!("{:.0}", amount.max(0.0));
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
