//! Transaction recording with server-side timestamps
//!
//! Callers supply user, amount and type only. The timestamp is taken from the
//! recorder's clock so clients cannot backdate or cluster their own entries.

use super::db::{StoreError, TransactionStore};
use super::types::{NewTransaction, StoredTransaction, TransactionType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub user_id: String,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
}

impl TransactionRequest {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.user_id.trim().is_empty() {
            return Err(IngestError::InvalidRequest("user id must not be empty".to_string()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(IngestError::InvalidRequest(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// Validates requests, stamps them and hands them to the store
pub struct TransactionRecorder {
    store: Arc<dyn TransactionStore>,
    now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl TransactionRecorder {
    /// Recorder using the system UTC clock
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self::new_with_clock(store, Box::new(Utc::now))
    }

    /// Recorder with a custom clock, for deterministic tests
    pub fn new_with_clock(
        store: Arc<dyn TransactionStore>,
        now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    ) -> Self {
        Self { store, now_fn }
    }

    pub async fn record(
        &self,
        request: TransactionRequest,
    ) -> Result<StoredTransaction, IngestError> {
        if let Err(e) = request.validate() {
            log::warn!("🚫 Rejected transaction for '{}': {}", request.user_id, e);
            return Err(e);
        }

        let transaction = NewTransaction {
            user_id: request.user_id,
            amount: request.amount,
            timestamp: (self.now_fn)(),
            transaction_type: request.transaction_type,
        };

        Ok(self.store.insert(transaction).await?)
    }
}
