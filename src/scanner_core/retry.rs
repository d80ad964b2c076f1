//! Exponential backoff and a retrying candidate-source wrapper

use super::candidate::CandidateRecord;
use super::source::{CandidateSource, SourceError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    max_retries: u32,
    current_attempt: u32,
}

#[derive(Debug)]
pub struct MaxRetriesExceeded;

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum retry attempts exceeded")
    }
}

impl std::error::Error for MaxRetriesExceeded {}

impl ExponentialBackoff {
    pub fn new(initial_ms: u64, max_ms: u64, retries: u32) -> Self {
        Self {
            initial_delay_ms: initial_ms,
            max_delay_ms: max_ms,
            max_retries: retries,
            current_attempt: 0,
        }
    }

    /// Delay before the next attempt, or None once retries are used up
    pub fn next_delay(&self) -> Option<Duration> {
        if self.current_attempt >= self.max_retries {
            return None;
        }
        let factor = 2_u64.saturating_pow(self.current_attempt);
        let delay = self.initial_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    pub async fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        let delay = self.next_delay().ok_or(MaxRetriesExceeded)?;

        log::warn!(
            "⏳ Retry attempt {} of {} in {}ms",
            self.current_attempt + 1,
            self.max_retries,
            delay.as_millis()
        );

        sleep(delay).await;
        self.current_attempt += 1;
        Ok(())
    }

    pub fn attempts(&self) -> u32 {
        self.current_attempt
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

/// Retries a failing source with exponential backoff
pub struct RetryingSource<S> {
    inner: S,
    backoff: ExponentialBackoff,
}

impl<S: CandidateSource> RetryingSource<S> {
    pub fn new(inner: S, backoff: ExponentialBackoff) -> Self {
        Self { inner, backoff }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: CandidateSource> CandidateSource for RetryingSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn reason(&self) -> &str {
        self.inner.reason()
    }

    async fn fetch_candidates(&self, user_id: &str) -> Result<Vec<CandidateRecord>, SourceError> {
        let mut backoff = self.backoff.clone();
        backoff.reset();

        loop {
            match self.inner.fetch_candidates(user_id).await {
                Ok(candidates) => return Ok(candidates),
                Err(e) => {
                    log::warn!("⚠️  {} source fetch failed: {}", self.inner.name(), e);
                    if backoff.sleep().await.is_err() {
                        return Err(SourceError::RetriesExhausted {
                            attempts: backoff.attempts() + 1,
                            last_error: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner_core::candidate::{TransactionId, TransactionType};
    use chrono::DateTime;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakySource {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CandidateSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        fn reason(&self) -> &str {
            "Flaky transaction"
        }

        async fn fetch_candidates(&self, user_id: &str) -> Result<Vec<CandidateRecord>, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(SourceError::Unavailable("storage offline".to_string()));
            }
            Ok(vec![CandidateRecord {
                id: TransactionId::from("1"),
                user_id: user_id.to_string(),
                amount: Decimal::new(1000, 2),
                timestamp: DateTime::from_timestamp(1_000, 0).unwrap(),
                transaction_type: TransactionType::Deposit,
                reason: self.reason().to_string(),
            }])
        }
    }

    #[test]
    fn test_backoff_delays_capped() {
        let backoff = ExponentialBackoff::new(100, 250, 5);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));

        let mut later = backoff.clone();
        later.current_attempt = 2;
        assert_eq!(later.next_delay(), Some(Duration::from_millis(250)));

        later.current_attempt = 5;
        assert_eq!(later.next_delay(), None);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let source = RetryingSource::new(
            FlakySource {
                failures_before_success: 2,
                calls: AtomicU32::new(0),
            },
            ExponentialBackoff::new(1, 5, 3),
        );

        let candidates = source.fetch_candidates("user123").await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let source = RetryingSource::new(
            FlakySource {
                failures_before_success: u32::MAX,
                calls: AtomicU32::new(0),
            },
            ExponentialBackoff::new(1, 5, 2),
        );

        let err = source.fetch_candidates("user123").await.unwrap_err();
        match err {
            SourceError::RetriesExhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("storage offline"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 3);
    }
}
