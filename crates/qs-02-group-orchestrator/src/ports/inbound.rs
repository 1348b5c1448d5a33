//! # Inbound Ports
//!
//! API trait defining what a participant or creator can do with pools.

use crate::domain::OrchestratorError;
use crate::ports::outbound::Receipt;
use async_trait::async_trait;
use qs_01_staking_protocol::{Booking, StakingStatus};
use serde::{Deserialize, Serialize};
use shared_types::{Address, AssetId, PoolId, Round};

/// Pool overview.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    /// Pool.
    pub pool_id: PoolId,
    /// Creator.
    pub creator: Address,
    /// Escrow, once configured.
    pub escrow: Option<Address>,
    /// Staked asset, once configured.
    pub asset_id: Option<AssetId>,
    /// Locking period, once configured.
    pub locking_rounds: Option<u64>,
    /// Capacity left.
    pub bookable_amount: u64,
    /// Asset held by the escrow.
    pub escrow_balance: Option<u64>,
    /// Round the summary was read at.
    pub current_round: Round,
}

/// Participant status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Participant.
    pub participant: Address,
    /// Pool.
    pub pool_id: PoolId,
    /// Raw record.
    pub booking: Booking,
    /// Round the report was read at.
    pub current_round: Round,
    /// First withdrawable round of the active booking.
    pub unlock_round: Option<Round>,
    /// Derived status.
    pub status: StakingStatus,
}

/// Committed booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingReceipt {
    /// Pool.
    pub pool_id: PoolId,
    /// Deposit.
    pub amount: u64,
    /// Booking round.
    pub round: Round,
    /// First withdrawable round.
    pub unlock_round: Round,
}

/// Committed withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    /// Pool.
    pub pool_id: PoolId,
    /// Released amount.
    pub payout: u64,
    /// Round of the release.
    pub round: Round,
}

/// Staking API - inbound port.
///
/// Calls act on behalf of the identity the implementation is bound to.
#[async_trait]
pub trait StakingApi: Send + Sync {
    /// Deploy, fund and configure a pool.
    async fn create(
        &self,
        asset_id: AssetId,
        locking_rounds: u64,
        funding_amount: u64,
    ) -> Result<PoolSummary, OrchestratorError>;

    /// Read a pool overview.
    async fn info(&self, pool_id: PoolId) -> Result<PoolSummary, OrchestratorError>;

    /// Register in a pool.
    async fn join(&self, pool_id: PoolId) -> Result<Receipt, OrchestratorError>;

    /// Leave a pool, forfeiting any active booking.
    async fn leave(&self, pool_id: PoolId) -> Result<Receipt, OrchestratorError>;

    /// Book `amount` of capacity.
    async fn book(&self, pool_id: PoolId, amount: u64) -> Result<BookingReceipt, OrchestratorError>;

    /// Status of any participant.
    async fn status(
        &self,
        participant: Address,
        pool_id: PoolId,
    ) -> Result<StatusReport, OrchestratorError>;

    /// Withdraw the doubled deposit.
    async fn withdraw(&self, pool_id: PoolId) -> Result<WithdrawalReceipt, OrchestratorError>;
}
