//! Reporting service: concurrent source fetch, then one aggregation pass
//!
//! Every source is fetched on its own task under a timeout. Handles are
//! awaited in source order so the aggregator sees the configured order even
//! though fetches overlap.

use crate::scanner_core::{
    AggregateError, AggregatedRecord, CandidateRecord, CandidateSource, SourceError,
    SuspiciousAggregator,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("All {} candidate sources failed: {}", .failures.len(), .failures.join("; "))]
    AllSourcesFailed { failures: Vec<String> },

    #[error("Candidate source {source_name} failed: {error}")]
    SourceFailed {
        source_name: String,
        error: SourceError,
    },

    #[error("Candidate source {source_name} timed out after {timeout_ms}ms")]
    SourceTimedOut { source_name: String, timeout_ms: u64 },

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregateError),
}

/// How to treat a source that failed or timed out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialResultPolicy {
    /// Substitute an empty list and report the source as degraded
    #[default]
    Degrade,
    /// Fail the whole request
    FailFast,
}

/// Aggregated result for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousReport {
    pub user_id: String,
    pub records: Vec<AggregatedRecord>,
    /// Sources replaced by an empty list because they failed or timed out
    pub degraded_sources: Vec<String>,
}

impl SuspiciousReport {
    /// True when no source flagged anything
    pub fn is_clear(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_sources.is_empty()
    }
}

enum FetchOutcome {
    Fetched(Vec<CandidateRecord>),
    Failed(SourceError),
    TimedOut,
}

pub struct ReportingService {
    sources: Vec<Arc<dyn CandidateSource>>,
    aggregator: SuspiciousAggregator,
    source_timeout: Duration,
    policy: PartialResultPolicy,
}

impl ReportingService {
    /// `sources` order is the aggregation source order
    pub fn new(
        sources: Vec<Arc<dyn CandidateSource>>,
        aggregator: SuspiciousAggregator,
        source_timeout: Duration,
        policy: PartialResultPolicy,
    ) -> Self {
        Self {
            sources,
            aggregator,
            source_timeout,
            policy,
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn suspicious_transactions(
        &self,
        user_id: &str,
    ) -> Result<SuspiciousReport, ReportError> {
        log::info!(
            "🔍 Scanning user {} across {} sources",
            user_id,
            self.sources.len()
        );

        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let user_id = user_id.to_string();
                let limit = self.source_timeout;
                tokio::spawn(async move {
                    match timeout(limit, source.fetch_candidates(&user_id)).await {
                        Ok(Ok(candidates)) => FetchOutcome::Fetched(candidates),
                        Ok(Err(e)) => FetchOutcome::Failed(e),
                        Err(_) => FetchOutcome::TimedOut,
                    }
                })
            })
            .collect();

        let mut candidate_lists = Vec::with_capacity(handles.len());
        let mut degraded_sources = Vec::new();
        let mut failures = Vec::new();

        let mut pending = handles.into_iter();
        for source in &self.sources {
            let Some(handle) = pending.next() else { break };
            let name = source.name().to_string();
            let outcome = handle
                .await
                .unwrap_or_else(|e| FetchOutcome::Failed(SourceError::TaskJoin(e.to_string())));

            match outcome {
                FetchOutcome::Fetched(candidates) => {
                    log::debug!("   ├─ {}: {} candidates", name, candidates.len());
                    candidate_lists.push(candidates);
                }
                FetchOutcome::Failed(error) => {
                    log::warn!("⚠️  Source {} failed: {}", name, error);
                    failures.push(format!("{}: {}", name, error));
                    if self.policy == PartialResultPolicy::FailFast {
                        abort_remaining(pending);
                        return Err(ReportError::SourceFailed {
                            source_name: name,
                            error,
                        });
                    }
                    degraded_sources.push(name);
                    candidate_lists.push(Vec::new());
                }
                FetchOutcome::TimedOut => {
                    let timeout_ms = self.source_timeout.as_millis() as u64;
                    log::warn!("⏱️  Source {} timed out after {}ms", name, timeout_ms);
                    failures.push(format!("{}: timed out after {}ms", name, timeout_ms));
                    if self.policy == PartialResultPolicy::FailFast {
                        abort_remaining(pending);
                        return Err(ReportError::SourceTimedOut {
                            source_name: name,
                            timeout_ms,
                        });
                    }
                    degraded_sources.push(name);
                    candidate_lists.push(Vec::new());
                }
            }
        }

        if !self.sources.is_empty() && failures.len() == self.sources.len() {
            log::error!("❌ Every source failed for user {}", user_id);
            return Err(ReportError::AllSourcesFailed { failures });
        }

        let records = self.aggregator.aggregate(&candidate_lists)?;

        if records.is_empty() {
            log::info!("✅ No suspicious activity for user {}", user_id);
        } else {
            log::info!(
                "🎯 {} suspicious transactions for user {}",
                records.len(),
                user_id
            );
        }

        Ok(SuspiciousReport {
            user_id: user_id.to_string(),
            records,
            degraded_sources,
        })
    }
}

/// Cancel fetches whose results will never be read
fn abort_remaining(handles: impl Iterator<Item = JoinHandle<FetchOutcome>>) {
    for handle in handles {
        handle.abort();
    }
}
