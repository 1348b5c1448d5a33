//! # Outbound Ports
//!
//! Interfaces to the ledger, its historical index and the account key store.

use crate::domain::{Identity, LedgerError, LedgerRejection, OperationSignature, SignedGroup, SignerError};
use async_trait::async_trait;
use qs_01_staking_protocol::{Booking, EscrowRule, Operation, Pool, WithdrawalHistory};
use serde::{Deserialize, Serialize};
use shared_types::{Address, AssetId, GroupId, PoolId, Round};

/// Result of a committed group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Round the group committed in.
    pub round: Round,
    /// Pool deployed by the group.
    pub created_pool: Option<PoolId>,
    /// Asset minted by the group.
    pub created_asset: Option<AssetId>,
}

/// Where a submitted group stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Waiting for a block.
    Pending,
    /// Every leg applied.
    Committed(Receipt),
    /// Dropped at evaluation; no leg applied.
    Rejected(LedgerRejection),
}

/// Ledger access - outbound port.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a group as one unit.
    async fn submit(&self, group: SignedGroup) -> Result<GroupId, LedgerError>;

    /// Status of a submitted group.
    async fn confirmation_status(&self, id: GroupId) -> Result<ConfirmationStatus, LedgerError>;

    /// Round of the latest block.
    async fn current_round(&self) -> Result<Round, LedgerError>;

    /// Global state of a pool.
    async fn pool(&self, pool_id: PoolId) -> Result<Pool, LedgerError>;

    /// Booking record of a participant; `None` if not registered.
    async fn booking(
        &self,
        participant: Address,
        pool_id: PoolId,
    ) -> Result<Option<Booking>, LedgerError>;

    /// Balance of an asset; `None` if the account is not opted in.
    async fn asset_balance(
        &self,
        account: Address,
        asset_id: AssetId,
    ) -> Result<Option<u64>, LedgerError>;
}

/// Historical queries - outbound port.
#[async_trait]
pub trait LedgerIndex: Send + Sync {
    /// Rule of an escrow that has sent `asset_id` before.
    async fn find_escrow_rule(
        &self,
        escrow: Address,
        asset_id: AssetId,
    ) -> Result<Option<EscrowRule>, LedgerError>;

    /// Committed withdrawals of a participant from a pool.
    async fn withdrawal_history(
        &self,
        participant: Address,
        pool_id: PoolId,
    ) -> Result<WithdrawalHistory, LedgerError>;
}

/// Account key store - outbound port.
pub trait AccountSigner: Send + Sync {
    /// Address controlled by `identity`.
    fn address_of(&self, identity: &Identity) -> Result<Address, SignerError>;

    /// Sign a stamped operation.
    fn sign(
        &self,
        identity: &Identity,
        operation: &Operation,
    ) -> Result<OperationSignature, SignerError>;
}
