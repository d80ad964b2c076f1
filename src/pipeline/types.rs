//! Raw transaction types for the recording side of the scanner

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use crate::scanner_core::TransactionType;

/// Transaction ready for storage (timestamp already assigned server side)
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub transaction_type: TransactionType,
}

/// Transaction as persisted in the `transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTransaction {
    pub id: i64,
    pub user_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub transaction_type: TransactionType,
}
