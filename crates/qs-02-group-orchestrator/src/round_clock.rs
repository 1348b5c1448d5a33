//! # Round Clock & Confirmation Waiter
//!
//! Pull-based waiting on ledger progress. Nothing here has a built-in
//! deadline; the `*_within` variants bound the wait, and dropping any of the
//! futures stops local waiting without affecting what the ledger does.

use crate::algorithms::with_retry;
use crate::domain::{OrchestratorError, RetryPolicy};
use crate::ports::{ConfirmationStatus, LedgerClient, Receipt};
use shared_types::{GroupId, Round};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Polls the ledger for rounds and confirmations.
pub struct RoundClock<L: ?Sized> {
    ledger: Arc<L>,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl<L: ?Sized> Clone for RoundClock<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            poll_interval: self.poll_interval,
            retry: self.retry.clone(),
        }
    }
}

impl<L> RoundClock<L>
where
    L: LedgerClient + ?Sized,
{
    /// Clock polling `ledger` every `poll_interval`.
    pub fn new(ledger: Arc<L>, poll_interval: Duration, retry: RetryPolicy) -> Self {
        Self {
            ledger,
            poll_interval,
            retry,
        }
    }

    /// Latest round, retrying transient failures.
    pub async fn current_round(&self) -> Result<Round, OrchestratorError> {
        let ledger = &self.ledger;
        with_retry(&self.retry, "current_round", move || ledger.current_round()).await
    }

    /// Wait until the ledger reaches `target`; returns the observed round.
    pub async fn await_round(&self, target: Round) -> Result<Round, OrchestratorError> {
        loop {
            let round = self.current_round().await?;
            if round >= target {
                return Ok(round);
            }
            debug!(round, target, "[qs-02] Waiting for round");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// [`Self::await_round`] bounded by `timeout`.
    pub async fn await_round_within(
        &self,
        target: Round,
        timeout: Duration,
    ) -> Result<Round, OrchestratorError> {
        tokio::time::timeout(timeout, self.await_round(target))
            .await
            .map_err(|_| OrchestratorError::WaitTimedOut("round"))?
    }

    /// Wait until `id` commits or is rejected.
    pub async fn await_confirmation(&self, id: GroupId) -> Result<Receipt, OrchestratorError> {
        let ledger = &self.ledger;
        loop {
            let status = with_retry(&self.retry, "confirmation_status", move || {
                ledger.confirmation_status(id)
            })
            .await?;
            match status {
                ConfirmationStatus::Committed(receipt) => return Ok(receipt),
                ConfirmationStatus::Rejected(rejection) => {
                    return Err(OrchestratorError::Rejected(rejection))
                }
                ConfirmationStatus::Pending => {
                    debug!(group_id = %id, "[qs-02] Group pending");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// [`Self::await_confirmation`] bounded by `timeout`.
    pub async fn await_confirmation_within(
        &self,
        id: GroupId,
        timeout: Duration,
    ) -> Result<Receipt, OrchestratorError> {
        tokio::time::timeout(timeout, self.await_confirmation(id))
            .await
            .map_err(|_| OrchestratorError::WaitTimedOut("confirmation"))?
    }
}
