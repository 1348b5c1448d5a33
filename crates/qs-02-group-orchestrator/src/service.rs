//! Staking Service - orchestration of pool operations
//!
//! Builds each user intent as an atomic group, authorizes every leg, submits
//! the group and waits for its confirmation. One service instance acts for one
//! identity.

use crate::algorithms::{authorize_group, submit_with_retry, with_retry};
use crate::domain::{
    ConstructionError, GroupBuilder, Identity, LedgerRejection, LegSigner, OrchestratorConfig,
    OrchestratorError,
};
use crate::ports::inbound::{
    BookingReceipt, PoolSummary, StakingApi, StatusReport, WithdrawalReceipt,
};
use crate::ports::outbound::{AccountSigner, LedgerClient, LedgerIndex, Receipt};
use crate::round_clock::RoundClock;
use async_trait::async_trait;
use qs_01_staking_protocol::{
    derive_status, payout_for, AppCall, AssetParams, AssetTransfer, Authorizer, Booking,
    CallAction, EscrowRule, OnCompletion, Operation, OperationKind, Pool, PoolTerms,
};
use shared_types::{Address, AssetId, PoolId, Round};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Staking service bound to one identity.
pub struct StakingService<L, I, S>
where
    L: LedgerClient,
    I: LedgerIndex,
    S: AccountSigner,
{
    config: OrchestratorConfig,
    identity: Identity,
    ledger: Arc<L>,
    index: Arc<I>,
    signer: Arc<S>,
    clock: RoundClock<L>,
}

impl<L, I, S> StakingService<L, I, S>
where
    L: LedgerClient,
    I: LedgerIndex,
    S: AccountSigner,
{
    /// Create a service acting as `identity`.
    pub fn new(
        config: OrchestratorConfig,
        identity: Identity,
        ledger: Arc<L>,
        index: Arc<I>,
        signer: Arc<S>,
    ) -> Self {
        let clock = RoundClock::new(
            Arc::clone(&ledger),
            config.poll_interval,
            config.retry.clone(),
        );
        Self {
            config,
            identity,
            ledger,
            index,
            signer,
            clock,
        }
    }

    /// Acting identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Address of the acting identity.
    pub fn address(&self) -> Result<Address, OrchestratorError> {
        self.signer
            .address_of(&self.identity)
            .map_err(|e| ConstructionError::from(e).into())
    }

    /// Round clock over the same ledger.
    pub fn clock(&self) -> &RoundClock<L> {
        &self.clock
    }

    // =========================================================================
    // Asset helpers
    // =========================================================================

    /// Mint a new asset credited to the acting account.
    pub async fn mint_asset(
        &self,
        total: u64,
        unit_name: &str,
    ) -> Result<AssetId, OrchestratorError> {
        let me = self.address()?;
        let round = self.clock.current_round().await?;
        let params = AssetParams {
            total,
            unit_name: unit_name.to_string(),
        };
        let receipt = self
            .execute(self.builder().push(
                self.operation(me, OperationKind::AssetCreate(params), round),
                self.me(),
            ))
            .await?;
        receipt
            .created_asset
            .ok_or(OrchestratorError::UnexpectedReceipt("mint without asset id"))
    }

    /// Open a holding of `asset_id` on the acting account.
    pub async fn opt_in_asset(&self, asset_id: AssetId) -> Result<Receipt, OrchestratorError> {
        let me = self.address()?;
        let round = self.clock.current_round().await?;
        let op = self.operation(me, transfer(asset_id, me, 0), round);
        self.execute(self.builder().push(op, self.me())).await
    }

    /// Send `amount` of `asset_id` to `receiver`.
    pub async fn send_asset(
        &self,
        asset_id: AssetId,
        receiver: Address,
        amount: u64,
    ) -> Result<Receipt, OrchestratorError> {
        let me = self.address()?;
        let round = self.clock.current_round().await?;
        let op = self.operation(me, transfer(asset_id, receiver, amount), round);
        self.execute(self.builder().push(op, self.me())).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn me(&self) -> LegSigner {
        LegSigner::Account(self.identity.clone())
    }

    fn builder(&self) -> GroupBuilder {
        GroupBuilder::new(self.config.max_group_size)
    }

    /// Operation valid from `round` for the configured window.
    fn operation(&self, sender: Address, kind: OperationKind, round: Round) -> Operation {
        Operation::new(sender, kind)
            .with_fee(self.config.fee)
            .with_validity(round, round.saturating_add(self.config.validity_window))
    }

    fn escrow_operation(&self, rule: &EscrowRule, kind: OperationKind, round: Round) -> Operation {
        let op = self.operation(rule.address(), kind, round);
        let fee = op.fee.min(rule.fee_ceiling);
        op.with_fee(fee)
    }

    fn escrow_rule(&self, pool_id: PoolId, asset_id: AssetId) -> EscrowRule {
        EscrowRule::new(pool_id, asset_id).with_fee_ceiling(self.config.escrow_fee_ceiling)
    }

    /// Seal, authorize, submit and wait for the group.
    async fn execute(&self, builder: GroupBuilder) -> Result<Receipt, OrchestratorError> {
        let group = authorize_group(builder.seal()?, self.signer.as_ref())?;
        let legs = group.legs.len();
        let id = submit_with_retry(self.ledger.as_ref(), &group, &self.config.retry).await?;
        debug!(group_id = %id, legs, "[qs-02] Group submitted");
        let receipt = self.clock.await_confirmation(id).await?;
        info!(group_id = %id, round = receipt.round, "[qs-02] Group confirmed");
        Ok(receipt)
    }

    async fn fetch_pool(&self, pool_id: PoolId) -> Result<Pool, OrchestratorError> {
        let ledger = &self.ledger;
        with_retry(&self.config.retry, "pool", move || ledger.pool(pool_id)).await
    }

    async fn configured_terms(&self, pool_id: PoolId) -> Result<PoolTerms, OrchestratorError> {
        let pool = self.fetch_pool(pool_id).await?;
        pool.terms
            .ok_or_else(|| ConstructionError::PoolNotConfigured(pool_id).into())
    }

    async fn fetch_booking(
        &self,
        participant: Address,
        pool_id: PoolId,
    ) -> Result<Booking, OrchestratorError> {
        let ledger = &self.ledger;
        with_retry(&self.config.retry, "booking", move || {
            ledger.booking(participant, pool_id)
        })
        .await?
        .ok_or(OrchestratorError::NotRegistered {
            participant,
            pool_id,
        })
    }

    /// Recover the escrow rule from history, falling back to re-derivation.
    async fn resolve_escrow(
        &self,
        pool_id: PoolId,
        terms: &PoolTerms,
    ) -> Result<EscrowRule, OrchestratorError> {
        let index = &self.index;
        let (escrow, asset_id) = (terms.escrow, terms.asset_id);
        let found = with_retry(&self.config.retry, "find_escrow_rule", move || {
            index.find_escrow_rule(escrow, asset_id)
        })
        .await?;

        match found {
            Some(rule) if rule.address() == escrow => return Ok(rule),
            Some(_) => warn!(%pool_id, "[qs-02] Indexed rule does not match escrow, re-deriving"),
            None => debug!(%pool_id, "[qs-02] No indexed escrow rule, re-deriving"),
        }

        let derived = self.escrow_rule(pool_id, asset_id);
        if derived.address() == escrow {
            Ok(derived)
        } else {
            Err(OrchestratorError::EscrowUnresolved { escrow })
        }
    }

    async fn lifecycle(
        &self,
        pool_id: PoolId,
        on_completion: OnCompletion,
    ) -> Result<Receipt, OrchestratorError> {
        self.fetch_pool(pool_id).await?;
        let me = self.address()?;
        let round = self.clock.current_round().await?;
        let call = self.operation(
            me,
            OperationKind::AppCall(AppCall::lifecycle(pool_id, on_completion)),
            round,
        );
        self.execute(self.builder().push(call, self.me())).await
    }
}

fn transfer(asset_id: AssetId, receiver: Address, amount: u64) -> OperationKind {
    OperationKind::AssetTransfer(AssetTransfer {
        asset_id,
        receiver,
        amount,
        close_to: None,
    })
}

#[async_trait]
impl<L, I, S> StakingApi for StakingService<L, I, S>
where
    L: LedgerClient,
    I: LedgerIndex,
    S: AccountSigner,
{
    async fn create(
        &self,
        asset_id: AssetId,
        locking_rounds: u64,
        funding_amount: u64,
    ) -> Result<PoolSummary, OrchestratorError> {
        if funding_amount == 0 {
            return Err(ConstructionError::ZeroAmount { index: 1 }.into());
        }
        let creator = self.address()?;

        // Step 1: deploy
        let round = self.clock.current_round().await?;
        let deploy = self.operation(creator, OperationKind::CreatePool, round);
        let receipt = self.execute(self.builder().push(deploy, self.me())).await?;
        let pool_id = receipt
            .created_pool
            .ok_or(OrchestratorError::UnexpectedReceipt("deploy without pool id"))?;
        info!(%pool_id, "[qs-02] Step 1/4: pool deployed");

        // Step 2: derive escrow
        let rule = self.escrow_rule(pool_id, asset_id);
        let escrow = rule.address();
        info!(%pool_id, escrow = %escrow, "[qs-02] Step 2/4: escrow derived");

        // Step 3: escrow opt-in
        let round = self.clock.current_round().await?;
        let opt_in = self.escrow_operation(&rule, transfer(asset_id, escrow, 0), round);
        self.execute(self.builder().push(opt_in, LegSigner::Escrow(rule)))
            .await?;
        info!(%pool_id, "[qs-02] Step 3/4: escrow opted in to asset {}", asset_id);

        // Step 4: setup
        let round = self.clock.current_round().await?;
        let setup = self.operation(
            creator,
            OperationKind::AppCall(AppCall::action(
                pool_id,
                CallAction::Setup {
                    escrow,
                    locking_rounds,
                },
            )),
            round,
        );
        let funding = self.operation(creator, transfer(asset_id, escrow, funding_amount), round);
        self.execute(
            self.builder()
                .push(setup, self.me())
                .push(funding, self.me()),
        )
        .await?;
        info!(%pool_id, funding_amount, locking_rounds, "[qs-02] Step 4/4: pool configured");

        self.info(pool_id).await
    }

    async fn info(&self, pool_id: PoolId) -> Result<PoolSummary, OrchestratorError> {
        let pool = self.fetch_pool(pool_id).await?;
        let current_round = self.clock.current_round().await?;
        let escrow_balance = match &pool.terms {
            Some(terms) => {
                let ledger = &self.ledger;
                let (escrow, asset_id) = (terms.escrow, terms.asset_id);
                with_retry(&self.config.retry, "asset_balance", move || {
                    ledger.asset_balance(escrow, asset_id)
                })
                .await?
            }
            None => None,
        };
        Ok(PoolSummary {
            pool_id,
            creator: pool.creator,
            escrow: pool.terms.map(|t| t.escrow),
            asset_id: pool.terms.map(|t| t.asset_id),
            locking_rounds: pool.terms.map(|t| t.locking_rounds),
            bookable_amount: pool.bookable_amount,
            escrow_balance,
            current_round,
        })
    }

    async fn join(&self, pool_id: PoolId) -> Result<Receipt, OrchestratorError> {
        let receipt = self.lifecycle(pool_id, OnCompletion::OptIn).await?;
        info!(%pool_id, identity = %self.identity, "[qs-02] Joined pool");
        Ok(receipt)
    }

    async fn leave(&self, pool_id: PoolId) -> Result<Receipt, OrchestratorError> {
        let receipt = self.lifecycle(pool_id, OnCompletion::CloseOut).await?;
        info!(%pool_id, identity = %self.identity, "[qs-02] Left pool");
        Ok(receipt)
    }

    async fn book(&self, pool_id: PoolId, amount: u64) -> Result<BookingReceipt, OrchestratorError> {
        if amount == 0 {
            return Err(ConstructionError::ZeroAmount { index: 1 }.into());
        }
        let terms = self.configured_terms(pool_id).await?;
        let me = self.address()?;
        let round = self.clock.current_round().await?;

        let call = self.operation(
            me,
            OperationKind::AppCall(AppCall::action(pool_id, CallAction::Booking)),
            round,
        );
        let deposit = self.operation(me, transfer(terms.asset_id, terms.escrow, amount), round);
        let receipt = self
            .execute(self.builder().push(call, self.me()).push(deposit, self.me()))
            .await?;

        let unlock_round = receipt.round.saturating_add(terms.locking_rounds);
        info!(%pool_id, amount, round = receipt.round, unlock_round, "[qs-02] Booked");
        Ok(BookingReceipt {
            pool_id,
            amount,
            round: receipt.round,
            unlock_round,
        })
    }

    async fn status(
        &self,
        participant: Address,
        pool_id: PoolId,
    ) -> Result<StatusReport, OrchestratorError> {
        let pool = self.fetch_pool(pool_id).await?;
        let booking = self.fetch_booking(participant, pool_id).await?;
        let current_round = self.clock.current_round().await?;
        let index = &self.index;
        let history = with_retry(&self.config.retry, "withdrawal_history", move || {
            index.withdrawal_history(participant, pool_id)
        })
        .await?;

        let unlock_round = match (&pool.terms, booking.is_active()) {
            (Some(terms), true) => Some(booking.unlock_round(terms.locking_rounds)),
            _ => None,
        };
        Ok(StatusReport {
            participant,
            pool_id,
            booking,
            current_round,
            unlock_round,
            status: derive_status(&pool, &booking, current_round, &history),
        })
    }

    async fn withdraw(&self, pool_id: PoolId) -> Result<WithdrawalReceipt, OrchestratorError> {
        let terms = self.configured_terms(pool_id).await?;
        let me = self.address()?;
        let booking = self.fetch_booking(me, pool_id).await?;
        if !booking.is_active() {
            return Err(OrchestratorError::NoActiveBooking {
                participant: me,
                pool_id,
            });
        }
        let payout = payout_for(booking.booked_amount)
            .map_err(|r| OrchestratorError::Rejected(LedgerRejection::Protocol(r)))?;
        let rule = self.resolve_escrow(pool_id, &terms).await?;

        if self.config.wait_for_unlock {
            let unlock_round = booking.unlock_round(terms.locking_rounds);
            info!(%pool_id, unlock_round, "[qs-02] Waiting for unlock");
            self.clock.await_round(unlock_round).await?;
        }

        let round = self.clock.current_round().await?;
        let call = self.operation(
            me,
            OperationKind::AppCall(AppCall::action(pool_id, CallAction::Withdrawal)),
            round,
        );
        let release = self.escrow_operation(&rule, transfer(terms.asset_id, me, payout), round);
        let receipt = self
            .execute(
                self.builder()
                    .push(call, self.me())
                    .push(release, LegSigner::Escrow(rule)),
            )
            .await?;

        info!(%pool_id, payout, round = receipt.round, "[qs-02] Withdrawn");
        Ok(WithdrawalReceipt {
            pool_id,
            payout,
            round: receipt.round,
        })
    }
}
