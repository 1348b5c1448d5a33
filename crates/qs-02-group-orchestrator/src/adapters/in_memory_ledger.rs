//! In-Memory Ledger Adapter
//!
//! Implements `LedgerClient` and `LedgerIndex` over a simulated round-based
//! ledger. Used by the tests and by the devnet CLI.
//!
//! ## Pipeline
//!
//! ```text
//! submit ──→ stateless checks ──→ dry run at next round ──→ pending set
//!                                                              │
//! produce_block: round += 1, evaluate each pending group in order
//!                ├── every leg applies  → Committed(receipt)
//!                └── any leg refused    → Rejected(reason), no leg applied
//! ```
//!
//! The dry run only sees committed state. Two groups that each pass alone but
//! conflict with each other are both accepted into the pending set and the
//! second one is rejected when the block is produced.

use super::keystore::verify_account_signature;
use crate::domain::{
    group_id_of, LedgerConfig, LedgerError, LedgerRejection, LegAuthorization, SignedGroup,
};
use crate::ports::{ConfirmationStatus, LedgerClient, LedgerIndex, Receipt};
use async_trait::async_trait;
use parking_lot::RwLock;
use qs_01_staking_protocol::{
    apply_operation, AssetParams, AssetTransfer, Authorizer, Booking, Effect, EscrowRejection,
    EscrowRule, ExecutionContext, Operation, OperationKind, Pool, PoolInstance, WithdrawalHistory,
};
use serde::{Deserialize, Serialize};
use shared_types::{Address, AssetId, GroupId, PoolId, Round};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// =============================================================================
// Persistent State
// =============================================================================

/// Minted asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Account credited with the supply.
    pub creator: Address,
    /// Mint parameters.
    pub params: AssetParams,
}

/// Committed withdrawal, kept for historical queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    /// Participant paid.
    pub participant: Address,
    /// Pool paid from.
    pub pool_id: PoolId,
    /// Commit round.
    pub round: Round,
    /// Released amount.
    pub payout: u64,
}

/// Committed ledger state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Round of the latest block.
    pub round: Round,
    /// Id handed to the next deployed pool.
    pub next_pool_id: u64,
    /// Id handed to the next minted asset.
    pub next_asset_id: AssetId,
    /// Minted assets.
    pub assets: BTreeMap<AssetId, AssetRecord>,
    /// Balances per account and asset; presence means opted in.
    pub holdings: BTreeMap<Address, BTreeMap<AssetId, u64>>,
    /// Deployed pools.
    pub pools: BTreeMap<PoolId, PoolInstance>,
    /// Rules of escrows seen authorizing a committed leg.
    pub escrow_rules: BTreeMap<Address, EscrowRule>,
    /// Committed withdrawals.
    pub withdrawals: Vec<WithdrawalRecord>,
}

impl LedgerSnapshot {
    /// Empty ledger at `round`.
    pub fn genesis(round: Round) -> Self {
        Self {
            round,
            next_pool_id: 1,
            next_asset_id: 1,
            assets: BTreeMap::new(),
            holdings: BTreeMap::new(),
            pools: BTreeMap::new(),
            escrow_rules: BTreeMap::new(),
            withdrawals: Vec::new(),
        }
    }

    /// Balance, `None` when not opted in.
    pub fn balance(&self, account: &Address, asset_id: AssetId) -> Option<u64> {
        self.holdings
            .get(account)
            .and_then(|assets| assets.get(&asset_id))
            .copied()
    }

    fn holding_mut(&mut self, account: &Address, asset_id: AssetId) -> Option<&mut u64> {
        self.holdings
            .get_mut(account)
            .and_then(|assets| assets.get_mut(&asset_id))
    }
}

/// Outcome of one produced block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockSummary {
    /// New round.
    pub round: Round,
    /// Groups committed.
    pub committed: usize,
    /// Groups dropped.
    pub rejected: usize,
}

struct LedgerState {
    chain: LedgerSnapshot,
    mempool: VecDeque<SignedGroup>,
    outcomes: HashMap<GroupId, ConfirmationStatus>,
    /// Settled groups keyed by the last round any of their legs is valid.
    expiries: BTreeMap<Round, Vec<GroupId>>,
    failures_pending: u32,
}

impl LedgerState {
    fn settle(&mut self, group: &SignedGroup, status: ConfirmationStatus) {
        self.outcomes.insert(group.id, status);
        let expiry = group
            .legs
            .iter()
            .map(|leg| leg.operation.last_valid)
            .min()
            .unwrap_or(Round::MAX);
        // Open windows never expire.
        if expiry < Round::MAX {
            self.expiries.entry(expiry).or_default().push(group.id);
        }
    }

    /// Forget outcomes of groups that can no longer be included in any block.
    fn prune_expired(&mut self) {
        let live = self.expiries.split_off(&self.chain.round.saturating_add(1));
        let expired = std::mem::replace(&mut self.expiries, live);
        for id in expired.into_values().flatten() {
            self.outcomes.remove(&id);
        }
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Simulated ledger.
pub struct InMemoryLedger {
    config: LedgerConfig,
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Fresh ledger at the configured genesis round.
    pub fn new(config: LedgerConfig) -> Self {
        let genesis = LedgerSnapshot::genesis(config.genesis_round);
        Self::from_snapshot(config, genesis)
    }

    /// Ledger resuming from committed state. Pending groups are not restored.
    pub fn from_snapshot(config: LedgerConfig, snapshot: LedgerSnapshot) -> Self {
        Self {
            config,
            state: RwLock::new(LedgerState {
                chain: snapshot,
                mempool: VecDeque::new(),
                outcomes: HashMap::new(),
                expiries: BTreeMap::new(),
                failures_pending: 0,
            }),
        }
    }

    /// Copy of the committed state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().chain.clone()
    }

    /// Make the next `count` requests fail with `Unavailable`.
    pub fn fail_next_requests(&self, count: u32) {
        self.state.write().failures_pending = count;
    }

    /// Groups waiting for a block.
    pub fn pending_groups(&self) -> usize {
        self.state.read().mempool.len()
    }

    /// Outcomes still answerable by `confirmation_status`.
    pub fn tracked_outcomes(&self) -> usize {
        self.state.read().outcomes.len()
    }

    /// Close a block: advance the round and evaluate pending groups in order.
    pub fn produce_block(&self) -> BlockSummary {
        let mut state = self.state.write();
        let round = state.chain.round + 1;
        state.chain.round = round;
        state.prune_expired();

        let pending: Vec<SignedGroup> = state.mempool.drain(..).collect();
        let mut summary = BlockSummary {
            round,
            ..BlockSummary::default()
        };
        for group in pending {
            match evaluate(&state.chain, &group, round) {
                Ok((next, receipt)) => {
                    state.chain = next;
                    info!(group_id = %group.id, round, "[qs-02] Group committed");
                    state.settle(&group, ConfirmationStatus::Committed(receipt));
                    summary.committed += 1;
                }
                Err(rejection) => {
                    warn!(group_id = %group.id, round, "[qs-02] Group rejected: {}", rejection);
                    state.settle(&group, ConfirmationStatus::Rejected(rejection));
                    summary.rejected += 1;
                }
            }
        }
        summary
    }

    /// Produce `count` blocks and return the new round.
    ///
    /// Blocks are only evaluated while groups are pending; the remaining empty
    /// blocks are skipped in one step.
    pub fn advance_rounds(&self, count: u64) -> Round {
        let mut remaining = count;
        while remaining > 0 {
            {
                let mut state = self.state.write();
                if state.mempool.is_empty() {
                    state.chain.round = state.chain.round.saturating_add(remaining);
                    state.prune_expired();
                    return state.chain.round;
                }
            }
            self.produce_block();
            remaining -= 1;
        }
        self.state.read().chain.round
    }

    /// Produce a block every `interval` until the task is aborted.
    pub fn spawn_block_producer(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let ledger = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let summary = ledger.produce_block();
                debug!(
                    round = summary.round,
                    committed = summary.committed,
                    rejected = summary.rejected,
                    "[qs-02] Block produced"
                );
            }
        })
    }

    fn take_failure(&self) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        if state.failures_pending > 0 {
            state.failures_pending -= 1;
            return Err(LedgerError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    /// Checks that need no ledger state: shape, binding and authorization.
    fn validate(&self, group: &SignedGroup) -> Result<(), LedgerRejection> {
        if group.legs.is_empty() {
            return Err(LedgerRejection::MalformedGroup("empty group"));
        }
        if group.legs.len() > self.config.max_group_size {
            return Err(LedgerRejection::MalformedGroup("group too large"));
        }

        let operations = group.operations();
        let expected = group_id_of(&operations)
            .map_err(|_| LedgerRejection::MalformedGroup("group cannot be encoded"))?;
        if expected != group.id {
            return Err(LedgerRejection::GroupMismatch {
                index: 0,
                group: group.id,
            });
        }

        for (index, leg) in group.legs.iter().enumerate() {
            if leg.operation.group != Some(group.id) {
                return Err(LedgerRejection::GroupMismatch {
                    index,
                    group: group.id,
                });
            }
            match &leg.authorization {
                LegAuthorization::Signature(signature) => {
                    if !verify_account_signature(&leg.operation, signature) {
                        return Err(LedgerRejection::BadSignature { index });
                    }
                }
                LegAuthorization::Escrow(rule) => {
                    if rule.address() != leg.operation.sender {
                        return Err(LedgerRejection::Escrow {
                            index,
                            reason: EscrowRejection::NotEscrowLeg { index },
                        });
                    }
                    rule.authorize(&operations, index)
                        .map_err(|reason| LedgerRejection::Escrow { index, reason })?;
                }
            }
        }
        Ok(())
    }

    fn read_chain<T>(&self, read: impl FnOnce(&LedgerSnapshot) -> T) -> Result<T, LedgerError> {
        self.take_failure()?;
        Ok(read(&self.state.read().chain))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate `group` at `round` against `chain`, returning the next state.
fn evaluate(
    chain: &LedgerSnapshot,
    group: &SignedGroup,
    round: Round,
) -> Result<(LedgerSnapshot, Receipt), LedgerRejection> {
    let operations = group.operations();
    for (index, op) in operations.iter().enumerate() {
        if !op.is_valid_at(round) {
            return Err(LedgerRejection::OutsideValidity { index, round });
        }
        if index > 0 && op.as_app_call().is_some() {
            return Err(LedgerRejection::MalformedGroup(
                "pool call must be sub-operation 0",
            ));
        }
        let creates = matches!(
            op.kind,
            OperationKind::CreatePool | OperationKind::AssetCreate(_)
        );
        if creates && operations.len() != 1 {
            return Err(LedgerRejection::MalformedGroup(
                "creations must be sent alone",
            ));
        }
    }

    let mut next = chain.clone();
    let mut receipt = Receipt {
        round,
        created_pool: None,
        created_asset: None,
    };

    let lead = operations
        .first()
        .ok_or(LedgerRejection::MalformedGroup("empty group"))?;
    if let Some(call) = lead.as_app_call() {
        let pool_id = call.pool_id;
        let instance = next
            .pools
            .get(&pool_id)
            .ok_or(LedgerRejection::UnknownPool(pool_id))?;
        let transition = apply_operation(
            instance,
            &lead.sender,
            &ExecutionContext::at(round),
            &operations,
        )
        .map_err(LedgerRejection::Protocol)?;

        for effect in &transition.effects {
            if let Effect::Withdrawn {
                participant,
                payout,
            } = effect
            {
                next.withdrawals.push(WithdrawalRecord {
                    participant: *participant,
                    pool_id,
                    round,
                    payout: *payout,
                });
            }
        }
        if transition.deletes_pool() {
            next.pools.remove(&pool_id);
        } else if let Some(instance) = next.pools.get_mut(&pool_id) {
            instance.commit(transition);
        }
    }

    for op in &operations {
        match &op.kind {
            OperationKind::CreatePool => {
                let pool_id = PoolId(next.next_pool_id);
                next.next_pool_id += 1;
                next.pools
                    .insert(pool_id, PoolInstance::new(Pool::new(pool_id, op.sender)));
                receipt.created_pool = Some(pool_id);
            }
            OperationKind::AssetCreate(params) => {
                let asset_id = next.next_asset_id;
                next.next_asset_id += 1;
                next.assets.insert(
                    asset_id,
                    AssetRecord {
                        creator: op.sender,
                        params: params.clone(),
                    },
                );
                next.holdings
                    .entry(op.sender)
                    .or_default()
                    .insert(asset_id, params.total);
                receipt.created_asset = Some(asset_id);
            }
            OperationKind::AssetTransfer(transfer) => {
                apply_transfer(&mut next, op, transfer)?;
            }
            OperationKind::AppCall(_) => {}
        }
    }

    for leg in &group.legs {
        if let LegAuthorization::Escrow(rule) = &leg.authorization {
            next.escrow_rules.insert(leg.operation.sender, *rule);
        }
    }
    Ok((next, receipt))
}

fn apply_transfer(
    chain: &mut LedgerSnapshot,
    op: &Operation,
    transfer: &AssetTransfer,
) -> Result<(), LedgerRejection> {
    let asset_id = transfer.asset_id;
    let sender = op.sender;
    if !chain.assets.contains_key(&asset_id) {
        return Err(LedgerRejection::UnknownAsset(asset_id));
    }
    if op.is_asset_opt_in() {
        chain
            .holdings
            .entry(sender)
            .or_default()
            .entry(asset_id)
            .or_insert(0);
        return Ok(());
    }

    let available = chain
        .balance(&sender, asset_id)
        .ok_or(LedgerRejection::NotOptedIn {
            account: sender,
            asset_id,
        })?;
    if chain.balance(&transfer.receiver, asset_id).is_none() {
        return Err(LedgerRejection::NotOptedIn {
            account: transfer.receiver,
            asset_id,
        });
    }
    if available < transfer.amount {
        return Err(LedgerRejection::InsufficientBalance {
            asset_id,
            needed: transfer.amount,
            available,
        });
    }
    if let Some(close_to) = transfer.close_to {
        // Closing removes the sender's holding, so it cannot also receive the sweep.
        if close_to == sender {
            return Err(LedgerRejection::MalformedGroup(
                "close-to must name another account",
            ));
        }
        if chain.balance(&close_to, asset_id).is_none() {
            return Err(LedgerRejection::NotOptedIn {
                account: close_to,
                asset_id,
            });
        }
    }
    if let Some(balance) = chain.holding_mut(&sender, asset_id) {
        *balance -= transfer.amount;
    }
    if let Some(balance) = chain.holding_mut(&transfer.receiver, asset_id) {
        *balance = balance.saturating_add(transfer.amount);
    }

    if let Some(close_to) = transfer.close_to {
        let remainder = chain
            .holdings
            .get_mut(&sender)
            .and_then(|assets| assets.remove(&asset_id))
            .unwrap_or(0);
        if let Some(balance) = chain.holding_mut(&close_to, asset_id) {
            *balance = balance.saturating_add(remainder);
        }
    }
    Ok(())
}

// =============================================================================
// Ports
// =============================================================================

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn submit(&self, group: SignedGroup) -> Result<GroupId, LedgerError> {
        self.take_failure()?;
        let mut state = self.state.write();
        if state.outcomes.contains_key(&group.id) {
            return Err(LedgerError::Duplicate(group.id));
        }
        self.validate(&group).map_err(LedgerError::Refused)?;
        let next_round = state.chain.round + 1;
        evaluate(&state.chain, &group, next_round).map_err(LedgerError::Refused)?;

        let id = group.id;
        debug!(group_id = %id, legs = group.legs.len(), "[qs-02] Group accepted");
        state.outcomes.insert(id, ConfirmationStatus::Pending);
        state.mempool.push_back(group);
        Ok(id)
    }

    async fn confirmation_status(&self, id: GroupId) -> Result<ConfirmationStatus, LedgerError> {
        self.take_failure()?;
        self.state
            .read()
            .outcomes
            .get(&id)
            .cloned()
            .ok_or(LedgerError::UnknownGroup(id))
    }

    async fn current_round(&self) -> Result<Round, LedgerError> {
        self.read_chain(|chain| chain.round)
    }

    async fn pool(&self, pool_id: PoolId) -> Result<Pool, LedgerError> {
        self.read_chain(|chain| chain.pools.get(&pool_id).map(|i| i.pool.clone()))?
            .ok_or(LedgerError::PoolNotFound(pool_id))
    }

    async fn booking(
        &self,
        participant: Address,
        pool_id: PoolId,
    ) -> Result<Option<Booking>, LedgerError> {
        self.read_chain(|chain| {
            chain
                .pools
                .get(&pool_id)
                .map(|instance| instance.booking(&participant).copied())
        })?
        .ok_or(LedgerError::PoolNotFound(pool_id))
    }

    async fn asset_balance(
        &self,
        account: Address,
        asset_id: AssetId,
    ) -> Result<Option<u64>, LedgerError> {
        self.read_chain(|chain| chain.balance(&account, asset_id))
    }
}

#[async_trait]
impl LedgerIndex for InMemoryLedger {
    async fn find_escrow_rule(
        &self,
        escrow: Address,
        asset_id: AssetId,
    ) -> Result<Option<EscrowRule>, LedgerError> {
        self.read_chain(|chain| {
            chain
                .escrow_rules
                .get(&escrow)
                .filter(|rule| rule.asset_id == asset_id)
                .copied()
        })
    }

    async fn withdrawal_history(
        &self,
        participant: Address,
        pool_id: PoolId,
    ) -> Result<WithdrawalHistory, LedgerError> {
        self.read_chain(|chain| {
            chain
                .withdrawals
                .iter()
                .filter(|w| w.participant == participant && w.pool_id == pool_id)
                .fold(WithdrawalHistory::default(), |mut history, w| {
                    history.withdrawals += 1;
                    history.last_withdrawal_round = history.last_withdrawal_round.max(Some(w.round));
                    history
                })
        })
    }
}
