//! # Domain Value Objects
//!
//! Operations as they appear inside an atomic group.
//!
//! A group is an ordered `[Operation]`. Positions are significant: a protocol
//! call is always sub-operation 0 and the asset movement it governs is always
//! sub-operation 1.

use serde::{Deserialize, Serialize};
use shared_types::{Address, AssetId, GroupId, PoolId, Round};

/// What the pool program is asked to do with its caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnCompletion {
    /// Plain call; the action decides the transition.
    #[default]
    NoOp,
    /// Register the caller (creates an empty booking record).
    OptIn,
    /// Leave the pool; the program may inspect the request.
    CloseOut,
    /// Leave the pool; the program cannot refuse.
    ClearState,
    /// Replace the program. Always refused.
    UpdateApplication,
    /// Remove the pool instance.
    DeleteApplication,
}

/// Arguments of a NoOp call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallAction {
    /// One-time configuration by the creator.
    Setup {
        /// Account that will hold and release the staked asset.
        escrow: Address,
        /// Rounds a booking stays locked.
        locking_rounds: u64,
    },
    /// Reserve capacity and deposit.
    Booking,
    /// Release the doubled deposit.
    Withdrawal,
}

/// A call into a deployed pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCall {
    /// Target pool.
    pub pool_id: PoolId,
    /// Lifecycle intent.
    pub on_completion: OnCompletion,
    /// NoOp arguments.
    pub action: Option<CallAction>,
}

impl AppCall {
    /// NoOp call carrying an action.
    pub fn action(pool_id: PoolId, action: CallAction) -> Self {
        Self {
            pool_id,
            on_completion: OnCompletion::NoOp,
            action: Some(action),
        }
    }

    /// Lifecycle call without arguments.
    pub fn lifecycle(pool_id: PoolId, on_completion: OnCompletion) -> Self {
        Self {
            pool_id,
            on_completion,
            action: None,
        }
    }
}

/// Movement of a fungible asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransfer {
    /// Asset being moved.
    pub asset_id: AssetId,
    /// Receiving account.
    pub receiver: Address,
    /// Units moved.
    pub amount: u64,
    /// When set, the sender's remaining balance is swept here and its holding closed.
    pub close_to: Option<Address>,
}

/// Parameters of a newly minted asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
    /// Total supply credited to the creator.
    pub total: u64,
    /// Ticker-style name.
    pub unit_name: String,
}

/// Operation payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Deploy a new pool instance owned by the sender.
    CreatePool,
    /// Call an existing pool.
    AppCall(AppCall),
    /// Move an asset.
    AssetTransfer(AssetTransfer),
    /// Mint a new asset.
    AssetCreate(AssetParams),
}

/// One leg of an atomic group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Account authorizing this leg.
    pub sender: Address,
    /// Fee offered for this leg.
    pub fee: u64,
    /// First round at which the leg may commit.
    pub first_valid: Round,
    /// Last round at which the leg may commit.
    pub last_valid: Round,
    /// Hand signing authority of `sender` to another account.
    pub rekey_to: Option<Address>,
    /// Group binding; stamped by the orchestrator.
    pub group: Option<GroupId>,
    /// Payload.
    pub kind: OperationKind,
}

impl Operation {
    /// New operation with an open validity window and no fee.
    pub fn new(sender: Address, kind: OperationKind) -> Self {
        Self {
            sender,
            fee: 0,
            first_valid: 0,
            last_valid: Round::MAX,
            rekey_to: None,
            group: None,
            kind,
        }
    }

    /// Set the fee.
    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Restrict the validity window.
    pub fn with_validity(mut self, first_valid: Round, last_valid: Round) -> Self {
        self.first_valid = first_valid;
        self.last_valid = last_valid;
        self
    }

    /// Request a rekey.
    pub fn with_rekey(mut self, rekey_to: Address) -> Self {
        self.rekey_to = Some(rekey_to);
        self
    }

    /// Call payload, if any.
    pub fn as_app_call(&self) -> Option<&AppCall> {
        match &self.kind {
            OperationKind::AppCall(call) => Some(call),
            _ => None,
        }
    }

    /// Transfer payload, if any.
    pub fn as_asset_transfer(&self) -> Option<&AssetTransfer> {
        match &self.kind {
            OperationKind::AssetTransfer(transfer) => Some(transfer),
            _ => None,
        }
    }

    /// Zero-amount transfer to self: registers a holding of the asset.
    pub fn is_asset_opt_in(&self) -> bool {
        self.as_asset_transfer()
            .map(|t| t.amount == 0 && t.receiver == self.sender && t.close_to.is_none())
            .unwrap_or(false)
    }

    /// Whether `round` falls inside the validity window.
    pub fn is_valid_at(&self, round: Round) -> bool {
        self.first_valid <= round && round <= self.last_valid
    }
}

/// Ledger facts the state machine reads while evaluating a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Round of the block the group is evaluated in.
    pub current_round: Round,
}

impl ExecutionContext {
    /// Context at `current_round`.
    pub fn at(current_round: Round) -> Self {
        Self { current_round }
    }
}
