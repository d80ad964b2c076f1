//! Candidate and aggregated suspicious-transaction records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Transaction identity shared by every rule source.
///
/// Ids made only of ASCII digits compare numerically and sort before any
/// other id; everything else compares lexicographically. Two ids are equal
/// only when their strings are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }

    fn numeric_key(&self) -> (usize, &str) {
        let trimmed = self.0.trim_start_matches('0');
        (trimmed.len(), trimmed)
    }
}

impl Ord for TransactionId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_numeric(), other.is_numeric()) {
            (true, true) => self
                .numeric_key()
                .cmp(&other.numeric_key())
                .then_with(|| self.0.cmp(&other.0)),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TransactionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for TransactionId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            _ => None,
        }
    }
}

/// One rule's verdict that a transaction is suspicious
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: TransactionId,
    pub user_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub transaction_type: TransactionType,
    pub reason: String,
}

/// Ordered set of distinct reason labels (first occurrence wins the slot).
///
/// Only built through `with_first`, so it is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReasonSet(Vec<String>);

impl ReasonSet {
    pub fn with_first(reason: impl Into<String>) -> Self {
        Self(vec![reason.into()])
    }

    /// Returns false when the label was already present
    pub fn insert(&mut self, reason: &str) -> bool {
        if self.contains(reason) {
            return false;
        }
        self.0.push(reason.to_string());
        true
    }

    pub fn contains(&self, reason: &str) -> bool {
        self.0.iter().any(|r| r == reason)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Merged view of one transaction across every rule that flagged it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRecord {
    pub id: TransactionId,
    pub user_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub transaction_type: TransactionType,
    pub reasons: ReasonSet,
}

impl AggregatedRecord {
    /// Seed a record from the first candidate seen for its id
    pub fn from_first(candidate: &CandidateRecord) -> Self {
        Self {
            id: candidate.id.clone(),
            user_id: candidate.user_id.clone(),
            amount: candidate.amount,
            timestamp: candidate.timestamp,
            transaction_type: candidate.transaction_type,
            reasons: ReasonSet::with_first(candidate.reason.clone()),
        }
    }
}
