//! txscan - Suspicious Transaction Scanner CLI
//!
//! Records transactions and reports the suspicious ones per user.
//!
//! ## Usage
//!
//! ```bash
//! txscan migrate
//! txscan record --user alice --amount 15000 --type deposit
//! txscan report --user alice
//! ```
//!
//! JSON goes to stdout, logs to stderr.
//!
//! ## Environment Variables
//!
//! - TXSCAN_DB_PATH - SQLite database path (default: data/txscan.db)
//! - TXSCAN_SCHEMA_DIR - Directory with schema .sql files (default: sql)
//! - SOURCE_TIMEOUT_MS - Per-source fetch timeout (default: 2000)
//! - SOURCE_MAX_RETRIES - Retries per failing source (default: 2)
//! - SOURCE_RETRY_INITIAL_MS / SOURCE_RETRY_MAX_MS - Backoff bounds (default: 100 / 1000)
//! - ALLOW_PARTIAL_RESULTS - Degrade failing sources to empty (default: true)
//! - REJECT_USER_MISMATCH - Fail when sources disagree on a transaction's user (default: false)
//! - RECORD_ORDERING - most_recent | first_seen (default: most_recent)
//! - RUST_LOG - Logging level (optional, default: info)

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::sync::Arc;
use txscan::pipeline::{
    PartialResultPolicy, ReportingService, ScannerConfig, SqliteTransactionStore,
    TransactionRecorder, TransactionRequest, TransactionType,
};
use txscan::scanner_core::{
    CandidateSource, ExponentialBackoff, RetryingSource, SqliteCandidateSource,
    SuspiciousAggregator,
};

#[derive(Parser, Debug)]
#[command(name = "txscan", version, about = "Suspicious transaction scanner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update the database schema
    Migrate,

    /// Record a transaction (timestamp is assigned server side)
    Record {
        #[arg(long)]
        user: String,

        #[arg(long)]
        amount: Decimal,

        /// deposit or withdrawal
        #[arg(long = "type", default_value = "deposit", value_parser = parse_transaction_type)]
        transaction_type: TransactionType,
    },

    /// Print a user's suspicious transactions as JSON
    Report {
        #[arg(long)]
        user: String,
    },
}

fn parse_transaction_type(s: &str) -> Result<TransactionType, String> {
    TransactionType::parse(s).ok_or_else(|| format!("unknown transaction type '{}'", s))
}

fn build_reporting_service(config: &ScannerConfig) -> ReportingService {
    let sources: Vec<Arc<dyn CandidateSource>> = SqliteCandidateSource::all(&config.db_path)
        .into_iter()
        .map(|source| {
            let backoff = ExponentialBackoff::new(
                config.source_retry_initial_ms,
                config.source_retry_max_ms,
                config.source_max_retries,
            );
            Arc::new(RetryingSource::new(source, backoff)) as Arc<dyn CandidateSource>
        })
        .collect();

    let policy = if config.allow_partial_results {
        PartialResultPolicy::Degrade
    } else {
        PartialResultPolicy::FailFast
    };

    ReportingService::new(
        sources,
        SuspiciousAggregator::new(config.aggregate_options()),
        config.source_timeout(),
        policy,
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = ScannerConfig::from_env()?;

    log::info!("🚀 txscan");
    log::info!("   Database: {}", config.db_path);
    log::debug!("   Schema dir: {}", config.schema_dir);
    log::debug!("   Source timeout: {}ms", config.source_timeout_ms);
    log::debug!("   Ordering: {}", config.ordering.as_str());

    match cli.command {
        Command::Migrate => {
            SqliteTransactionStore::open_with_schema(&config.db_path, &config.schema_dir)?;
        }
        Command::Record {
            user,
            amount,
            transaction_type,
        } => {
            let store =
                SqliteTransactionStore::open_with_schema(&config.db_path, &config.schema_dir)?;
            let recorder = TransactionRecorder::new(Arc::new(store));
            let stored = recorder
                .record(TransactionRequest {
                    user_id: user,
                    amount,
                    transaction_type,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Command::Report { user } => {
            let service = build_reporting_service(&config);
            let report = service.suspicious_transactions(&user).await?;

            if report.is_degraded() {
                log::warn!(
                    "⚠️  Partial result, degraded sources: {}",
                    report.degraded_sources.join(", ")
                );
            }
            println!("{}", serde_json::to_string_pretty(&report.records)?);
        }
    }

    Ok(())
}
