//! Scanner Core - Multi-Rule Suspicious Transaction Aggregation
//!
//! Each detection rule (frequent, high volume, rapid) is exposed as an
//! independent candidate source. The aggregator joins their outputs into one
//! record per transaction, carrying every reason that flagged it.
//!
//! # Architecture
//!
//! ```text
//! SQLite rule views → SqliteCandidateSource (one per RuleCategory)
//!     ↓                       (optionally wrapped in RetryingSource)
//! Vec<Vec<CandidateRecord>>   (explicit source order)
//!     ↓
//! aggregate() (id → index arena, reason union, first-seen fields)
//!     ↓
//! Vec<AggregatedRecord> (most recent first, ties by id)
//! ```

pub mod aggregator;
pub mod candidate;
pub mod retry;
pub mod source;
pub mod sqlite_source;

pub use aggregator::{
    aggregate, AggregateError, AggregateOptions, RecordOrdering, SuspiciousAggregator,
    UserMismatchPolicy,
};
pub use candidate::{
    AggregatedRecord, CandidateRecord, ReasonSet, TransactionId, TransactionType,
};
pub use retry::{ExponentialBackoff, RetryingSource};
pub use source::{CandidateSource, RuleCategory, SourceError};
pub use sqlite_source::SqliteCandidateSource;
