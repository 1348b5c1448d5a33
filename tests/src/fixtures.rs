//! # Devnet Harness
//!
//! Drives the simulated ledger block by block so round numbers in tests are
//! exact. Groups go through the same builder and signer the orchestrator
//! uses; `forge` skips the client-side escrow pre-check to model an attacker.

use qs_01_staking_protocol::{
    AppCall, AssetParams, AssetTransfer, Authorizer, CallAction, EscrowRule, OnCompletion,
    Operation, OperationKind, PoolInstance,
};
use qs_02_group_orchestrator::{
    authorize_group, group_id_of, AccountSigner, ConfirmationStatus, GroupBuilder, Identity,
    InMemoryLedger, LedgerClient, LedgerError, LedgerRejection, LegAuthorization, LegSigner,
    LocalKeystore, OrchestratorConfig, Receipt, RetryPolicy, SignedGroup, SignedOperation,
    StakingService,
};
use shared_types::{Address, AssetId, GroupId, PoolId, Round};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Service type used across the suites.
pub type Service = StakingService<InMemoryLedger, InMemoryLedger, LocalKeystore>;

/// One leg with the party that authorizes it.
pub type Leg = (Operation, LegSigner);

/// Configured pool ready for bookings.
#[derive(Clone, Copy, Debug)]
pub struct StakingPool {
    /// Pool id.
    pub pool_id: PoolId,
    /// Staked asset.
    pub asset_id: AssetId,
    /// Escrow rule holding the funds.
    pub rule: EscrowRule,
    /// Creator address.
    pub creator: Address,
}

impl StakingPool {
    /// Escrow address.
    pub fn escrow(&self) -> Address {
        self.rule.address()
    }
}

/// Ledger, keys and helpers.
pub struct Devnet {
    /// Simulated ledger.
    pub ledger: Arc<InMemoryLedger>,
    /// Local keys.
    pub keys: Arc<LocalKeystore>,
    nonce: AtomicU64,
}

impl Default for Devnet {
    fn default() -> Self {
        Self::new()
    }
}

impl Devnet {
    /// Fresh ledger at genesis.
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(InMemoryLedger::default()),
            keys: Arc::new(LocalKeystore::new()),
            nonce: AtomicU64::new(1),
        }
    }

    /// Address of `name`, generating its key on first use.
    pub fn account(&self, name: &str) -> Address {
        let identity = Identity::new(name);
        match self.keys.address_of(&identity) {
            Ok(address) => address,
            Err(_) => self.keys.generate(identity),
        }
    }

    /// Latest committed round.
    pub fn round(&self) -> Round {
        self.ledger.snapshot().round
    }

    /// Produce blocks until `round` is committed.
    pub fn advance_to(&self, round: Round) {
        let current = self.round();
        assert!(current <= round, "ledger already at round {}", current);
        self.ledger.advance_rounds(round - current);
    }

    /// Committed instance of `pool_id`.
    pub fn instance(&self, pool_id: PoolId) -> PoolInstance {
        self.ledger.snapshot().pools[&pool_id].clone()
    }

    /// Committed balance.
    pub fn balance(&self, account: Address, asset_id: AssetId) -> Option<u64> {
        self.ledger.snapshot().balance(&account, asset_id)
    }

    // =========================================================================
    // Legs
    // =========================================================================

    /// Distinct fee per leg keeps otherwise identical groups apart.
    fn stamp(&self, op: Operation) -> Operation {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        op.with_fee(nonce % 1_000)
    }

    /// Leg sent by account `name`.
    pub fn leg(&self, name: &str, kind: OperationKind) -> Leg {
        let op = self.stamp(Operation::new(self.account(name), kind));
        (op, LegSigner::Account(Identity::new(name)))
    }

    /// NoOp call into `pool_id`.
    pub fn call(&self, name: &str, pool_id: PoolId, action: CallAction) -> Leg {
        self.leg(name, OperationKind::AppCall(AppCall::action(pool_id, action)))
    }

    /// Lifecycle call into `pool_id`.
    pub fn lifecycle(&self, name: &str, pool_id: PoolId, on_completion: OnCompletion) -> Leg {
        self.leg(
            name,
            OperationKind::AppCall(AppCall::lifecycle(pool_id, on_completion)),
        )
    }

    /// Asset transfer from account `name`.
    pub fn transfer(&self, name: &str, asset_id: AssetId, receiver: Address, amount: u64) -> Leg {
        self.leg(name, transfer_kind(asset_id, receiver, amount))
    }

    /// Asset transfer from the escrow of `rule`.
    pub fn escrow_transfer(&self, rule: EscrowRule, receiver: Address, amount: u64) -> Leg {
        let op = self.stamp(Operation::new(
            rule.address(),
            transfer_kind(rule.asset_id, receiver, amount),
        ));
        (op, LegSigner::Escrow(rule))
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Group built the way the orchestrator builds it.
    pub fn group(&self, legs: Vec<Leg>) -> SignedGroup {
        let unsigned = legs
            .into_iter()
            .fold(GroupBuilder::new(16), |builder, (op, signer)| {
                builder.push(op, signer)
            })
            .seal()
            .expect("group shape");
        authorize_group(unsigned, self.keys.as_ref()).expect("group authorization")
    }

    /// Group bound and signed without asking the escrow rule first.
    pub fn forge(&self, legs: Vec<Leg>) -> SignedGroup {
        let operations: Vec<Operation> = legs.iter().map(|(op, _)| op.clone()).collect();
        let id = group_id_of(&operations).expect("encodable group");
        let legs = legs
            .into_iter()
            .map(|(mut operation, signer)| {
                operation.group = Some(id);
                let authorization = match signer {
                    LegSigner::Account(identity) => LegAuthorization::Signature(
                        self.keys.sign(&identity, &operation).expect("known key"),
                    ),
                    LegSigner::Escrow(rule) => LegAuthorization::Escrow(rule),
                };
                SignedOperation {
                    operation,
                    authorization,
                }
            })
            .collect();
        SignedGroup { id, legs }
    }

    /// Submit without producing a block.
    pub async fn submit(&self, group: SignedGroup) -> Result<GroupId, LedgerError> {
        self.ledger.submit(group).await
    }

    /// Outcome of a submitted group.
    pub async fn outcome(&self, id: GroupId) -> ConfirmationStatus {
        self.ledger
            .confirmation_status(id)
            .await
            .expect("known group")
    }

    /// Submit, produce one block and report the outcome.
    pub async fn commit(&self, group: SignedGroup) -> Result<Receipt, LedgerRejection> {
        let id = match self.ledger.submit(group).await {
            Ok(id) => id,
            Err(LedgerError::Refused(rejection)) => return Err(rejection),
            Err(other) => panic!("unexpected ledger error: {}", other),
        };
        self.ledger.produce_block();
        match self.outcome(id).await {
            ConfirmationStatus::Committed(receipt) => Ok(receipt),
            ConfirmationStatus::Rejected(rejection) => Err(rejection),
            ConfirmationStatus::Pending => panic!("group still pending after a block"),
        }
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// Mint `total` units credited to `name`.
    pub async fn mint(&self, name: &str, total: u64) -> AssetId {
        let group = self.group(vec![self.leg(
            name,
            OperationKind::AssetCreate(AssetParams {
                total,
                unit_name: "STK".into(),
            }),
        )]);
        self.commit(group)
            .await
            .expect("mint")
            .created_asset
            .expect("asset id")
    }

    /// Opt `to` in to `asset_id` and send it `amount` from `from`.
    pub async fn send(&self, from: &str, to: &str, asset_id: AssetId, amount: u64) {
        let receiver = self.account(to);
        if self.balance(receiver, asset_id).is_none() {
            let opt_in = self.group(vec![self.transfer(to, asset_id, receiver, 0)]);
            self.commit(opt_in).await.expect("opt-in");
        }
        let send = self.group(vec![self.transfer(from, asset_id, receiver, amount)]);
        self.commit(send).await.expect("transfer");
    }

    /// Deploy, fund and configure a pool owned by `creator`.
    ///
    /// Takes four blocks after the mint.
    pub async fn staking_pool(&self, creator: &str, funding: u64, locking_rounds: u64) -> StakingPool {
        let asset_id = self.mint(creator, 1_000_000).await;

        let deploy = self.group(vec![self.leg(creator, OperationKind::CreatePool)]);
        let pool_id = self
            .commit(deploy)
            .await
            .expect("deploy")
            .created_pool
            .expect("pool id");

        let rule = EscrowRule::new(pool_id, asset_id);
        let escrow = rule.address();
        let opt_in = self.group(vec![self.escrow_transfer(rule, escrow, 0)]);
        self.commit(opt_in).await.expect("escrow opt-in");

        let setup = self.group(vec![
            self.call(
                creator,
                pool_id,
                CallAction::Setup {
                    escrow,
                    locking_rounds,
                },
            ),
            self.transfer(creator, asset_id, escrow, funding),
        ]);
        self.commit(setup).await.expect("setup");

        StakingPool {
            pool_id,
            asset_id,
            rule,
            creator: self.account(creator),
        }
    }

    /// Fund `name` from the creator and register it in the pool.
    pub async fn participant(
        &self,
        creator: &str,
        name: &str,
        pool: &StakingPool,
        balance: u64,
    ) -> Address {
        self.send(creator, name, pool.asset_id, balance).await;
        self.join(name, pool).await.expect("join");
        self.account(name)
    }

    /// Register `name`.
    pub async fn join(&self, name: &str, pool: &StakingPool) -> Result<Receipt, LedgerRejection> {
        let group = self.group(vec![self.lifecycle(name, pool.pool_id, OnCompletion::OptIn)]);
        self.commit(group).await
    }

    /// Booking group of `amount` by `name`.
    pub fn booking_group(&self, name: &str, pool: &StakingPool, amount: u64) -> SignedGroup {
        self.group(vec![
            self.call(name, pool.pool_id, CallAction::Booking),
            self.transfer(name, pool.asset_id, pool.escrow(), amount),
        ])
    }

    /// Withdrawal group releasing `amount` to `name`.
    pub fn withdrawal_group(&self, name: &str, pool: &StakingPool, amount: u64) -> SignedGroup {
        let receiver = self.account(name);
        self.group(vec![
            self.call(name, pool.pool_id, CallAction::Withdrawal),
            self.escrow_transfer(pool.rule, receiver, amount),
        ])
    }

    /// Book `amount` as `name`.
    pub async fn book(
        &self,
        name: &str,
        pool: &StakingPool,
        amount: u64,
    ) -> Result<Receipt, LedgerRejection> {
        self.commit(self.booking_group(name, pool, amount)).await
    }

    /// Withdraw `amount` as `name`.
    pub async fn withdraw(
        &self,
        name: &str,
        pool: &StakingPool,
        amount: u64,
    ) -> Result<Receipt, LedgerRejection> {
        self.commit(self.withdrawal_group(name, pool, amount)).await
    }

    /// Leave the pool as `name`.
    pub async fn leave(&self, name: &str, pool: &StakingPool) -> Result<Receipt, LedgerRejection> {
        let group = self.group(vec![self.lifecycle(name, pool.pool_id, OnCompletion::CloseOut)]);
        self.commit(group).await
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Orchestrator acting as `name`; needs a running block producer.
    pub fn service(&self, name: &str) -> Service {
        self.service_with(name, fast_config())
    }

    /// Orchestrator with an explicit configuration.
    pub fn service_with(&self, name: &str, config: OrchestratorConfig) -> Service {
        self.account(name);
        StakingService::new(
            config,
            Identity::new(name),
            Arc::clone(&self.ledger),
            Arc::clone(&self.ledger),
            Arc::clone(&self.keys),
        )
    }

    /// Produce a block every `interval` in the background.
    pub fn start_producer(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.ledger.spawn_block_producer(interval)
    }
}

/// Short polls and retries for tests.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        poll_interval: Duration::from_millis(1),
        retry: RetryPolicy::fixed(5, Duration::from_millis(1)),
        ..OrchestratorConfig::default()
    }
}

fn transfer_kind(asset_id: AssetId, receiver: Address, amount: u64) -> OperationKind {
    OperationKind::AssetTransfer(AssetTransfer {
        asset_id,
        receiver,
        amount,
        close_to: None,
    })
}
