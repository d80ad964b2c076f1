//! Multi-source merge of suspicious-transaction candidates
//!
//! Candidate lists arrive in an explicit source order. Each list is walked in
//! turn and every candidate either creates a record (first sighting of its id)
//! or contributes its reason label to the existing one. Fields other than the
//! reasons always come from the first sighting.

use super::candidate::{AggregatedRecord, CandidateRecord, TransactionId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("invalid candidate at source {source_index}, position {position}: {reason}")]
    InvalidRecord {
        source_index: usize,
        position: usize,
        reason: String,
    },

    #[error("transaction {id} reported for user '{first_user_id}' and user '{conflicting_user_id}'")]
    SourceMismatch {
        id: TransactionId,
        first_user_id: String,
        conflicting_user_id: String,
    },
}

/// Order of the returned records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrdering {
    /// Descending by timestamp, ties broken by ascending id
    #[default]
    MostRecentFirst,
    /// Order in which each id was first seen across the sources
    FirstSeen,
}

impl RecordOrdering {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordOrdering::MostRecentFirst => "most_recent",
            RecordOrdering::FirstSeen => "first_seen",
        }
    }
}

/// What to do when two sources report the same id for different users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserMismatchPolicy {
    /// Keep the first-seen user id and carry on
    #[default]
    KeepFirstSeen,
    /// Fail the call with `AggregateError::SourceMismatch`
    Reject,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    pub ordering: RecordOrdering,
    pub user_mismatch: UserMismatchPolicy,
}

/// Merge candidate lists into one record per transaction id.
///
/// `candidate_lists` is in source order: the first list's labels come first in
/// `reasons`, and its amount/timestamp/type win if a later source disagrees.
/// Any candidate with an empty id, user id or reason fails the whole call.
pub fn aggregate(
    candidate_lists: &[Vec<CandidateRecord>],
    options: &AggregateOptions,
) -> Result<Vec<AggregatedRecord>, AggregateError> {
    let mut index: HashMap<TransactionId, usize> = HashMap::new();
    let mut records: Vec<AggregatedRecord> = Vec::new();

    for (source_index, candidates) in candidate_lists.iter().enumerate() {
        for (position, candidate) in candidates.iter().enumerate() {
            validate(candidate, source_index, position)?;

            match index.get(&candidate.id) {
                None => {
                    index.insert(candidate.id.clone(), records.len());
                    records.push(AggregatedRecord::from_first(candidate));
                }
                Some(&slot) => merge_into(&mut records[slot], candidate, options)?,
            }
        }
    }

    if options.ordering == RecordOrdering::MostRecentFirst {
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    log::debug!(
        "🔗 Aggregated {} candidate lists into {} records",
        candidate_lists.len(),
        records.len()
    );

    Ok(records)
}

fn validate(
    candidate: &CandidateRecord,
    source_index: usize,
    position: usize,
) -> Result<(), AggregateError> {
    let problem = if candidate.id.is_empty() {
        Some("empty transaction id")
    } else if candidate.user_id.trim().is_empty() {
        Some("empty user id")
    } else if candidate.reason.trim().is_empty() {
        Some("empty reason label")
    } else {
        None
    };

    match problem {
        Some(reason) => Err(AggregateError::InvalidRecord {
            source_index,
            position,
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn merge_into(
    existing: &mut AggregatedRecord,
    candidate: &CandidateRecord,
    options: &AggregateOptions,
) -> Result<(), AggregateError> {
    if existing.user_id != candidate.user_id {
        match options.user_mismatch {
            UserMismatchPolicy::Reject => {
                return Err(AggregateError::SourceMismatch {
                    id: existing.id.clone(),
                    first_user_id: existing.user_id.clone(),
                    conflicting_user_id: candidate.user_id.clone(),
                });
            }
            UserMismatchPolicy::KeepFirstSeen => {
                log::debug!(
                    "Transaction {} seen for user {} and {}, keeping first",
                    existing.id,
                    existing.user_id,
                    candidate.user_id
                );
            }
        }
    }

    if existing.amount != candidate.amount
        || existing.timestamp != candidate.timestamp
        || existing.transaction_type != candidate.transaction_type
    {
        log::debug!(
            "Transaction {} has conflicting fields across sources, keeping first",
            existing.id
        );
    }

    existing.reasons.insert(&candidate.reason);
    Ok(())
}

/// Aggregator bound to one set of options
#[derive(Debug, Clone, Default)]
pub struct SuspiciousAggregator {
    options: AggregateOptions,
}

impl SuspiciousAggregator {
    pub fn new(options: AggregateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    pub fn aggregate(
        &self,
        candidate_lists: &[Vec<CandidateRecord>],
    ) -> Result<Vec<AggregatedRecord>, AggregateError> {
        aggregate(candidate_lists, &self.options)
    }
}
