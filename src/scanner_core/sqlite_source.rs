//! SQLite candidate source backed by one rule view per category
//!
//! Each view exposes `id, user_id, amount, timestamp, transaction_type` for
//! the rows its rule flagged. Amounts are stored as decimal TEXT and timestamps
//! as Unix milliseconds (UTC).
//!
//! Sources never create the database: a missing file is a fetch failure.

use super::candidate::{CandidateRecord, TransactionId, TransactionType};
use super::source::{CandidateSource, RuleCategory, SourceError};
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

pub(crate) fn decode_amount(row_id: i64, raw: &str) -> Result<Decimal, SourceError> {
    Decimal::from_str(raw.trim()).map_err(|e| SourceError::Decode {
        row_id,
        column: "amount",
        message: format!("'{}': {}", raw, e),
    })
}

pub(crate) fn decode_timestamp(row_id: i64, millis: i64) -> Result<DateTime<Utc>, SourceError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| SourceError::Decode {
        row_id,
        column: "timestamp",
        message: format!("{} ms is out of range", millis),
    })
}

pub(crate) fn decode_transaction_type(row_id: i64, raw: &str) -> Result<TransactionType, SourceError> {
    TransactionType::parse(raw).ok_or_else(|| SourceError::Decode {
        row_id,
        column: "transaction_type",
        message: format!("unknown transaction type '{}'", raw),
    })
}

/// Reads one rule view for a single user
pub struct SqliteCandidateSource {
    db_path: PathBuf,
    category: RuleCategory,
}

impl SqliteCandidateSource {
    pub fn new(db_path: impl Into<PathBuf>, category: RuleCategory) -> Self {
        Self {
            db_path: db_path.into(),
            category,
        }
    }

    /// One source per shipped category, in default source order
    pub fn all(db_path: impl Into<PathBuf>) -> Vec<Self> {
        let db_path = db_path.into();
        RuleCategory::ALL
            .iter()
            .map(|category| Self::new(db_path.clone(), *category))
            .collect()
    }

    pub fn category(&self) -> RuleCategory {
        self.category
    }

    fn open_read_only(&self) -> Result<Connection, SourceError> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        apply_optimized_pragmas(&conn)?;
        conn.execute_batch("PRAGMA query_only = ON")?;
        Ok(conn)
    }

    fn query_user(&self, user_id: &str) -> Result<Vec<CandidateRecord>, SourceError> {
        let conn = self.open_read_only()?;
        let sql = format!(
            "SELECT id, user_id, amount, timestamp, transaction_type FROM {} WHERE user_id = ?1",
            self.category.view_name()
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let reason = self.category.reason();
        let mut candidates = Vec::new();
        for row in rows {
            let (id, row_user, amount, millis, kind) = row?;
            candidates.push(CandidateRecord {
                id: TransactionId::from(id),
                user_id: row_user,
                amount: decode_amount(id, &amount)?,
                timestamp: decode_timestamp(id, millis)?,
                transaction_type: decode_transaction_type(id, &kind)?,
                reason: reason.to_string(),
            });
        }

        Ok(candidates)
    }
}

#[async_trait]
impl CandidateSource for SqliteCandidateSource {
    fn name(&self) -> &str {
        self.category.as_str()
    }

    fn reason(&self) -> &str {
        self.category.reason()
    }

    async fn fetch_candidates(&self, user_id: &str) -> Result<Vec<CandidateRecord>, SourceError> {
        let source = Self::new(self.db_path.clone(), self.category);
        let user_id = user_id.to_string();

        let candidates = tokio::task::spawn_blocking(move || source.query_user(&user_id))
            .await
            .map_err(|e| SourceError::TaskJoin(e.to_string()))??;

        log::debug!(
            "📥 {} source returned {} candidates",
            self.category,
            candidates.len()
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Views are stood in by plain tables so each test controls the flagged rows
    fn setup_test_db() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let conn = Connection::open(&db_path).unwrap();

        for category in RuleCategory::ALL {
            conn.execute(
                &format!(
                    "CREATE TABLE {} (
                        id INTEGER PRIMARY KEY,
                        user_id TEXT NOT NULL,
                        amount TEXT NOT NULL,
                        timestamp INTEGER NOT NULL,
                        transaction_type TEXT NOT NULL
                    )",
                    category.view_name()
                ),
                [],
            )
            .unwrap();
        }

        (dir, db_path)
    }

    fn insert_flagged(db_path: &std::path::Path, category: RuleCategory, id: i64, user: &str, amount: &str) {
        insert_flagged_kind(db_path, category, id, user, amount, "DEPOSIT");
    }

    fn insert_flagged_kind(
        db_path: &std::path::Path,
        category: RuleCategory,
        id: i64,
        user: &str,
        amount: &str,
        kind: &str,
    ) {
        let conn = Connection::open(db_path).unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, user_id, amount, timestamp, transaction_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                category.view_name()
            ),
            params![id, user, amount, 1_745_575_200_000_i64 + id, kind],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_scoped_to_user() {
        let (_dir, db_path) = setup_test_db();
        insert_flagged_kind(&db_path, RuleCategory::Frequent, 1, "user123", "10.00", "WITHDRAWAL");
        insert_flagged(&db_path, RuleCategory::Frequent, 2, "someone_else", "11.00");

        let source = SqliteCandidateSource::new(&db_path, RuleCategory::Frequent);
        let candidates = source.fetch_candidates("user123").await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id.as_str(), "1");
        assert_eq!(candidates[0].reason, "Frequent transaction");
        assert_eq!(candidates[0].amount.to_string(), "10.00");
        assert_eq!(candidates[0].timestamp.timestamp_millis(), 1_745_575_200_001);
        assert_eq!(candidates[0].transaction_type, TransactionType::Withdrawal);
    }

    #[tokio::test]
    async fn test_unknown_transaction_type_is_decode_error() {
        let (_dir, db_path) = setup_test_db();
        insert_flagged_kind(&db_path, RuleCategory::Frequent, 5, "user123", "1.00", "TRANSFER");

        let source = SqliteCandidateSource::new(&db_path, RuleCategory::Frequent);
        let err = source.fetch_candidates("user123").await.unwrap_err();

        assert!(matches!(
            err,
            SourceError::Decode {
                row_id: 5,
                column: "transaction_type",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_amount_round_trips_exactly() {
        let (_dir, db_path) = setup_test_db();
        insert_flagged(&db_path, RuleCategory::HighVolume, 7, "user123", "12345678901234.567890");

        let source = SqliteCandidateSource::new(&db_path, RuleCategory::HighVolume);
        let candidates = source.fetch_candidates("user123").await.unwrap();

        assert_eq!(candidates[0].amount.to_string(), "12345678901234.567890");
        assert_eq!(candidates[0].reason, "High volume transaction");
    }

    #[tokio::test]
    async fn test_malformed_amount_is_decode_error() {
        let (_dir, db_path) = setup_test_db();
        insert_flagged(&db_path, RuleCategory::Rapid, 3, "user123", "not-a-number");

        let source = SqliteCandidateSource::new(&db_path, RuleCategory::Rapid);
        let err = source.fetch_candidates("user123").await.unwrap_err();

        assert!(matches!(err, SourceError::Decode { row_id: 3, column: "amount", .. }));
    }

    #[tokio::test]
    async fn test_missing_view_is_database_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("empty.db");
        Connection::open(&db_path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER)")
            .unwrap();

        let source = SqliteCandidateSource::new(&db_path, RuleCategory::Rapid);
        let err = source.fetch_candidates("user123").await.unwrap_err();

        assert!(matches!(err, SourceError::Database(_)));
    }

    #[tokio::test]
    async fn test_missing_database_file_is_not_created() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("typo.db");

        let source = SqliteCandidateSource::new(&db_path, RuleCategory::Frequent);
        let err = source.fetch_candidates("user123").await.unwrap_err();

        assert!(matches!(err, SourceError::Database(_)));
        assert!(!db_path.exists());
    }

    #[test]
    fn test_read_only_mode() {
        let (_dir, db_path) = setup_test_db();
        let source = SqliteCandidateSource::new(&db_path, RuleCategory::Frequent);
        let conn = source.open_read_only().unwrap();

        let result = conn.execute(
            "INSERT INTO suspicious_frequent_transactions (id, user_id, amount, timestamp, transaction_type)
             VALUES (1, 'u', '1', 0, 'DEPOSIT')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_all_sources_in_default_order() {
        let sources = SqliteCandidateSource::all("unused.db");
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["frequent", "high_volume", "rapid"]);
    }
}
