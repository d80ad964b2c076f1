//! Shared SQLite PRAGMA setup for writers and readers
//!
//! WAL lets candidate sources read while transactions are being recorded.

use rusqlite::Connection;
use std::time::Duration;

/// Apply the connection PRAGMAs used across the scanner
///
/// - journal_mode = WAL
/// - synchronous = NORMAL
/// - temp_store = MEMORY
/// - cache_size = -16000 (16 MB)
/// - wal_autocheckpoint = 1000 pages
/// - busy timeout = 5s
pub fn apply_optimized_pragmas(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "cache_size", -16000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 1000)?;
    conn.busy_timeout(Duration::from_secs(5))?;

    log::debug!("📊 SQLite PRAGMAs applied (WAL, NORMAL, MEMORY)");
    Ok(())
}
