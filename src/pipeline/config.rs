//! Scanner configuration from environment variables

use crate::scanner_core::{AggregateOptions, RecordOrdering, UserMismatchPolicy};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Configuration for the scanner runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// Directory holding the `.sql` schema files
    pub schema_dir: String,

    /// Per-source fetch timeout in milliseconds
    pub source_timeout_ms: u64,

    /// Retries per source after the first failed fetch
    pub source_max_retries: u32,

    pub source_retry_initial_ms: u64,
    pub source_retry_max_ms: u64,

    /// Return results from healthy sources when others fail
    pub allow_partial_results: bool,

    /// Fail aggregation when sources disagree on a transaction's user
    pub reject_user_mismatch: bool,

    pub ordering: RecordOrdering,
}

impl ScannerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `TXSCAN_DB_PATH` (default: data/txscan.db)
    /// - `TXSCAN_SCHEMA_DIR` (default: sql)
    /// - `SOURCE_TIMEOUT_MS` (default: 2000)
    /// - `SOURCE_MAX_RETRIES` (default: 2)
    /// - `SOURCE_RETRY_INITIAL_MS` (default: 100)
    /// - `SOURCE_RETRY_MAX_MS` (default: 1000)
    /// - `ALLOW_PARTIAL_RESULTS` (default: true)
    /// - `REJECT_USER_MISMATCH` (default: false)
    /// - `RECORD_ORDERING` (most_recent | first_seen, default: most_recent)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reads values through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse().ok());
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|s| s.trim().to_lowercase().parse().ok())
                .unwrap_or(default)
        };

        let ordering = match lookup("RECORD_ORDERING")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            None | Some("") | Some("most_recent") => RecordOrdering::MostRecentFirst,
            Some("first_seen") => RecordOrdering::FirstSeen,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "RECORD_ORDERING must be most_recent or first_seen, got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            db_path: lookup("TXSCAN_DB_PATH").unwrap_or_else(|| "data/txscan.db".to_string()),
            schema_dir: lookup("TXSCAN_SCHEMA_DIR").unwrap_or_else(|| "sql".to_string()),
            source_timeout_ms: parsed("SOURCE_TIMEOUT_MS").unwrap_or(2_000),
            source_max_retries: lookup("SOURCE_MAX_RETRIES")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(2),
            source_retry_initial_ms: parsed("SOURCE_RETRY_INITIAL_MS").unwrap_or(100),
            source_retry_max_ms: parsed("SOURCE_RETRY_MAX_MS").unwrap_or(1_000),
            allow_partial_results: flag("ALLOW_PARTIAL_RESULTS", true),
            reject_user_mismatch: flag("REJECT_USER_MISMATCH", false),
            ordering,
        })
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            ordering: self.ordering,
            user_mismatch: if self.reject_user_mismatch {
                UserMismatchPolicy::Reject
            } else {
                UserMismatchPolicy::KeepFirstSeen
            },
        }
    }
}
