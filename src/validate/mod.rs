//! Target validator adapter merge
//!
//! Folds live dry-run validation outcomes into the assessment set for
//! proxy and shared-flow records. Calls run concurrently under a bounded
//! limit, each with its own timeout and retry budget; one record's
//! failure never aborts its siblings. A shutdown signal stops new calls
//! from being issued while in-flight calls drain naturally.

use crate::export::{TargetClient, TransportError, ValidationOutcome};
use crate::models::{Assessment, Reason, ReasonOrigin, ResourceIdentity, ResourceRecord, Verdict};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc, watch};

/// Retry and pacing limits for validation calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per record, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per retry
    pub initial_backoff: Duration,
    /// Multiplier applied to the backoff after each attempt
    pub backoff_factor: u32,
    /// Timeout applied to every individual call
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_factor: 2,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given retry (1-based attempt already failed)
    fn backoff_after(&self, attempt: u32) -> Duration {
        self.initial_backoff * self.backoff_factor.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Tally of what the merge did, for the run's final warning summary
#[derive(Debug, Default)]
pub struct ValidationSummary {
    /// Records submitted for dry-run validation
    pub submitted: usize,
    /// Records the target rejected
    pub rejected: usize,
    /// Records whose validation call never completed
    pub failed_calls: usize,
    /// Human-readable warnings, one per failed call
    pub warnings: Vec<String>,
}

/// Dry-run every proxy/shared-flow record and merge the outcomes
///
/// A rejection adds a `ValidationFailed` reason; an acceptance never
/// upgrades a verdict (static incompatibilities still dominate). A call
/// that cannot be completed leaves the record's verdict untouched and is
/// reported as a warning.
pub async fn merge_target_validation(
    assessments: &mut [Assessment],
    records: Vec<ResourceRecord>,
    client: Arc<dyn TargetClient>,
    policy: RetryPolicy,
    concurrency: usize,
    shutdown: watch::Receiver<bool>,
) -> ValidationSummary {
    let candidates: Vec<ResourceRecord> = records
        .into_iter()
        .filter(|r| r.resource_type.supports_target_validation())
        .collect();

    let mut summary = ValidationSummary {
        submitted: candidates.len(),
        ..Default::default()
    };
    if candidates.is_empty() {
        return summary;
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let (tx, mut rx) = mpsc::unbounded_channel();

    for record in candidates {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        let policy = policy.clone();
        let shutdown = shutdown.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let identity = record.identity();
            let outcome = validate_with_retry(&*client, &record, &policy, &semaphore, &shutdown).await;
            // The receiver only drops if the merge itself is gone.
            let _ = tx.send((identity, outcome));
        });
    }
    drop(tx);

    let mut outcomes: HashMap<ResourceIdentity, Result<ValidationOutcome, TransportError>> =
        HashMap::new();
    while let Some((identity, outcome)) = rx.recv().await {
        outcomes.insert(identity, outcome);
    }

    for assessment in assessments.iter_mut() {
        let Some(outcome) = outcomes.remove(&assessment.identity) else {
            continue;
        };
        match outcome {
            Ok(ValidationOutcome::Accepted) => {
                tracing::debug!("Target accepted {}", assessment.identity);
            }
            Ok(ValidationOutcome::Rejected(detail)) => {
                summary.rejected += 1;
                assessment.push_reason(Reason::new(
                    Verdict::ValidationFailed,
                    ReasonOrigin::LiveValidation,
                    detail,
                ));
            }
            Err(err) => {
                summary.failed_calls += 1;
                let warning = format!(
                    "Validation call for {} did not complete: {}",
                    assessment.identity, err
                );
                tracing::warn!("{}", warning);
                summary.warnings.push(warning);
                // Keep the transport failure visible on the record without
                // letting it change the verdict.
                assessment.push_reason(Reason::new(
                    Verdict::Unknown,
                    ReasonOrigin::Transport,
                    err.to_string(),
                ));
            }
        }
    }

    if summary.failed_calls > 0 {
        tracing::warn!(
            "{} of {} validation call(s) did not complete",
            summary.failed_calls,
            summary.submitted
        );
    }
    summary
}

/// Run one record's dry-run call with bounded retry
///
/// Transient failures (timeout, rate limit, 5xx) back off exponentially
/// up to the attempt budget; a non-transient failure is captured once.
/// The shutdown signal is honored before every new attempt, never by
/// killing a call mid-flight.
async fn validate_with_retry(
    client: &dyn TargetClient,
    record: &ResourceRecord,
    policy: &RetryPolicy,
    semaphore: &Semaphore,
    shutdown: &watch::Receiver<bool>,
) -> Result<ValidationOutcome, TransportError> {
    // Bounded concurrency covers the whole per-record exchange, retries
    // included, so the target never sees more than `concurrency` records
    // in flight.
    let _permit = semaphore.acquire().await.map_err(|_| TransportError::Cancelled)?;

    let mut last_err = TransportError::Cancelled;
    for attempt in 1..=policy.max_attempts.max(1) {
        if *shutdown.borrow() {
            return Err(TransportError::Cancelled);
        }
        let result = tokio::time::timeout(policy.call_timeout, client.validate_import(record)).await;
        let err = match result {
            Ok(Ok(outcome)) => return Ok(outcome),
            Ok(Err(e)) => e,
            Err(_) => TransportError::Timeout,
        };

        if !err.is_transient() || attempt == policy.max_attempts {
            return Err(err);
        }
        let backoff = policy.backoff_after(attempt);
        tracing::debug!(
            "Attempt {}/{} for {} failed ({}); retrying in {:?}",
            attempt,
            policy.max_attempts,
            record.identity(),
            err,
            backoff
        );
        last_err = err;
        tokio::time::sleep(backoff).await;
    }
    Err(last_err)
}
