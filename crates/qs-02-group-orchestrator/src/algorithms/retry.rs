//! # Retry
//!
//! Bounded fixed-delay retry of ledger requests.
//!
//! Only `LedgerError::is_transient()` failures are retried. A duplicate
//! submission means an earlier attempt reached the ledger, so it is reported
//! as accepted and never sent again.

use crate::domain::{LedgerError, OrchestratorError, RetryPolicy, SignedGroup};
use crate::ports::LedgerClient;
use shared_types::GroupId;
use std::future::Future;
use tracing::{debug, warn};

/// Run `request` until it succeeds, fails permanently or exhausts `policy`.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &'static str,
    mut request: F,
) -> Result<T, OrchestratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                warn!(
                    attempt,
                    max_attempts,
                    "[qs-02] {} failed: {}, retrying in {:?}",
                    what,
                    err,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) if err.is_transient() => {
                warn!("[qs-02] {} gave up after {} attempts", what, attempt);
                return Err(OrchestratorError::TransientExhausted {
                    attempts: attempt,
                    last: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Submit `group`, treating a duplicate answer as acceptance.
pub async fn submit_with_retry<L>(
    ledger: &L,
    group: &SignedGroup,
    policy: &RetryPolicy,
) -> Result<GroupId, OrchestratorError>
where
    L: LedgerClient + ?Sized,
{
    with_retry(policy, "submit", move || async move {
        match ledger.submit(group.clone()).await {
            Err(LedgerError::Duplicate(id)) => {
                debug!(group_id = %id, "[qs-02] Group already known to the ledger");
                Ok(id)
            }
            other => other,
        }
    })
    .await
}
