//! Deterministic override rules.
//!
//! Each rule is a (predicate, floor) pair. The rule score of a transaction is
//! the maximum floor among the rules it triggers, and it can only raise the
//! outlier risk, never lower it.

use crate::types::transaction::TransactionRecord;

/// A hard fraud signal
#[derive(Clone, Copy)]
pub struct OverrideRule {
    pub name: &'static str,
    pub score: f64,
    pub predicate: fn(&TransactionRecord) -> bool,
}

impl std::fmt::Debug for OverrideRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideRule")
            .field("name", &self.name)
            .field("score", &self.score)
            .finish()
    }
}

/// Built-in rules, in evaluation order.
pub const DEFAULT_RULES: [OverrideRule; 4] = [
    OverrideRule {
        name: "velocity_burst",
        score: 0.85,
        predicate: |tx| tx.tx_count_last_5s >= 10,
    },
    OverrideRule {
        name: "non_human_gap",
        score: 0.80,
        predicate: |tx| tx.time_delta_ms < 200.0,
    },
    OverrideRule {
        name: "account_takeover",
        score: 0.75,
        predicate: |tx| tx.is_new_device && tx.location_change && tx.amount > 30_000.0,
    },
    OverrideRule {
        name: "single_target_drain",
        score: 0.78,
        predicate: |tx| tx.tx_count_last_5s >= 5 && tx.unique_recipients_last_10tx <= 1,
    },
];

/// Ordered override table
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<OverrideRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    /// Highest floor among triggered rules, 0.0 when none fire.
    pub fn score(&self, tx: &TransactionRecord) -> f64 {
        self.rules
            .iter()
            .filter(|r| (r.predicate)(tx))
            .map(|r| r.score)
            .fold(0.0, f64::max)
    }

    /// Names of the rules a transaction triggers
    pub fn triggered(&self, tx: &TransactionRecord) -> Vec<&'static str> {
        self.rules
            .iter()
            .filter(|r| (r.predicate)(tx))
            .map(|r| r.name)
            .collect()
    }

    /// Raise `risk` to the rule floor if any rule fires.
    pub fn apply(&self, risk: f64, tx: &TransactionRecord) -> f64 {
        let floor = self.score(tx);
        if floor > 0.0 {
            risk.max(floor)
        } else {
            risk
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}
