//! # Scanner Pipeline
//!
//! The I/O side of the scanner, built around the pure aggregator in
//! `scanner_core`:
//!
//! - `config` - environment-driven runtime configuration
//! - `types` - raw transaction types (what gets recorded)
//! - `db` - schema migrations and the SQLite transaction store
//! - `ingestion` - request validation and server-side timestamping
//! - `reporting` - concurrent source fetch, partial-result policy, aggregation

pub mod config;
pub mod db;
pub mod ingestion;
pub mod reporting;
pub mod types;

pub use config::{ConfigError, ScannerConfig};
pub use db::{run_schema_migrations, SqliteTransactionStore, StoreError, TransactionStore};
pub use ingestion::{IngestError, TransactionRecorder, TransactionRequest};
pub use reporting::{PartialResultPolicy, ReportError, ReportingService, SuspiciousReport};
pub use types::{NewTransaction, StoredTransaction, TransactionType};
