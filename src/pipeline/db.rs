//! SQLite schema migrations and transaction storage

use super::types::{NewTransaction, StoredTransaction, TransactionType};
use crate::scanner_core::sqlite_source::{decode_amount, decode_timestamp};
use crate::scanner_core::SourceError;
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema directory not found: {0}")]
    SchemaDirMissing(String),

    #[error("Stored row is malformed: {0}")]
    Decode(#[from] SourceError),

    #[error("Unknown transaction type '{0}'")]
    UnknownTransactionType(String),

    #[error("Connection lock poisoned")]
    LockPoisoned,
}

/// Run schema migrations from SQL files
///
/// Reads all .sql files from `schema_dir` and executes them in file-name
/// order. Every file must use "IF NOT EXISTS" clauses so reruns are no-ops.
pub fn run_schema_migrations(conn: &mut Connection, schema_dir: &str) -> Result<(), StoreError> {
    let schema_path = Path::new(schema_dir);

    if !schema_path.exists() {
        return Err(StoreError::SchemaDirMissing(schema_dir.to_string()));
    }

    apply_optimized_pragmas(conn)?;

    // Sorted so 00_, 01_, ... run in order
    let mut sql_files: Vec<_> = fs::read_dir(schema_path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();
    sql_files.sort();

    log::info!("🔧 Running schema migrations from: {}", schema_dir);

    for path in sql_files {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::info!("   ├─ Executing: {}", filename);
        let sql_content = fs::read_to_string(&path)?;
        conn.execute_batch(&sql_content)?;
        log::info!("   └─ ✅ Success: {}", filename);
    }

    log::info!("✅ All schema migrations completed successfully");
    Ok(())
}

/// Storage for raw transactions
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, transaction: NewTransaction) -> Result<StoredTransaction, StoreError>;

    /// All of a user's transactions, oldest first
    async fn transactions_for_user(&self, user_id: &str)
        -> Result<Vec<StoredTransaction>, StoreError>;
}

/// SQLite implementation of TransactionStore
///
/// The database must already carry the schema from `sql/*.sql`.
pub struct SqliteTransactionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTransactionStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        apply_optimized_pragmas(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a store and bring its schema up to date
    pub fn open_with_schema(db_path: impl AsRef<Path>, schema_dir: &str) -> Result<Self, StoreError> {
        let store = Self::new(db_path)?;
        {
            let mut conn = store.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            run_schema_migrations(&mut conn, schema_dir)?;
        }
        Ok(store)
    }
}

#[async_trait]
impl TransactionStore for SqliteTransactionStore {
    async fn insert(&self, transaction: NewTransaction) -> Result<StoredTransaction, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        conn.execute(
            "INSERT INTO transactions (user_id, amount, timestamp, transaction_type)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                transaction.user_id,
                transaction.amount.to_string(),
                transaction.timestamp.timestamp_millis(),
                transaction.transaction_type.as_str(),
            ],
        )?;

        let stored = StoredTransaction {
            id: conn.last_insert_rowid(),
            user_id: transaction.user_id,
            amount: transaction.amount,
            timestamp: transaction.timestamp,
            transaction_type: transaction.transaction_type,
        };

        log::info!("💾 Saved transaction {} for user {}", stored.id, stored.user_id);
        Ok(stored)
    }

    async fn transactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<StoredTransaction>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, amount, timestamp, transaction_type
             FROM transactions
             WHERE user_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut transactions = Vec::new();
        for row in rows {
            let (id, row_user, amount, millis, kind) = row?;
            let transaction_type = TransactionType::parse(&kind)
                .ok_or_else(|| StoreError::UnknownTransactionType(kind.clone()))?;
            transactions.push(StoredTransaction {
                id,
                user_id: row_user,
                amount: decode_amount(id, &amount)?,
                timestamp: decode_timestamp(id, millis)?,
                transaction_type,
            });
        }

        Ok(transactions)
    }
}
