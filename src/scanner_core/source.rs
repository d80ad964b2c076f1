//! Candidate source trait and rule categories

use super::candidate::CandidateRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Rule categories shipped with the scanner, in default source order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Frequent,
    HighVolume,
    Rapid,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 3] = [
        RuleCategory::Frequent,
        RuleCategory::HighVolume,
        RuleCategory::Rapid,
    ];

    /// Reason label attached to every candidate of this category
    pub fn reason(&self) -> &'static str {
        match self {
            RuleCategory::Frequent => "Frequent transaction",
            RuleCategory::HighVolume => "High volume transaction",
            RuleCategory::Rapid => "Rapid transaction",
        }
    }

    /// SQL view holding this category's flagged rows
    pub fn view_name(&self) -> &'static str {
        match self {
            RuleCategory::Frequent => "suspicious_frequent_transactions",
            RuleCategory::HighVolume => "suspicious_high_volume_transactions",
            RuleCategory::Rapid => "suspicious_rapid_transactions",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Frequent => "frequent",
            RuleCategory::HighVolume => "high_volume",
            RuleCategory::Rapid => "rapid",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to fetch one source's candidates
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Malformed {column} in row {row_id}: {message}")]
    Decode {
        row_id: i64,
        column: &'static str,
        message: String,
    },

    #[error("Fetch task failed: {0}")]
    TaskJoin(String),

    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Producer of candidate records for one rule, scoped to one user
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Source name for logging and degraded-source reporting
    fn name(&self) -> &str;

    /// Reason label this source attaches to its candidates
    fn reason(&self) -> &str;

    async fn fetch_candidates(&self, user_id: &str) -> Result<Vec<CandidateRecord>, SourceError>;
}
