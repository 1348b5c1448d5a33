//! # Domain Errors
//!
//! Rejections raised by the pool program and by the escrow rule.
//!
//! Every rejection refuses the whole atomic group; none of them leaves a
//! partial effect behind.

use shared_types::{Address, AssetId, PoolId, Round};
use thiserror::Error;

/// Coarse classification of a rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad setup shape or values, malformed group.
    Configuration,
    /// Wrong signer, wrong accounts on a leg, escrow rule violated.
    Authorization,
    /// Booking state does not allow the transition.
    State,
    /// Update or delete misuse.
    ProtocolImmutability,
    /// Withdrawal amount is not double the booked amount.
    AmountMismatch,
}

/// Pool program rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Group shape does not match any transition.
    #[error("Malformed group: {reason}")]
    MalformedGroup {
        /// What was wrong
        reason: &'static str,
    },

    /// Call addressed to another pool.
    #[error("Call targets pool {actual}, expected {expected}")]
    WrongPool {
        /// Pool evaluating the group
        expected: PoolId,
        /// Pool named by the call
        actual: PoolId,
    },

    /// Setup group rejected.
    #[error("Invalid setup: {reason}")]
    InvalidSetup {
        /// What was wrong
        reason: &'static str,
    },

    /// Booking or withdrawal before setup.
    #[error("Pool not configured")]
    NotConfigured,

    /// Caller is not allowed to configure the pool.
    #[error("Unauthorized caller: {caller}")]
    Unauthorized {
        /// Offending caller
        caller: Address,
    },

    /// Caller never joined the pool.
    #[error("Participant not registered")]
    NotRegistered,

    /// Caller joined already.
    #[error("Participant already registered")]
    AlreadyRegistered,

    /// An active booking exists.
    #[error("Already booked at round {booking_round}")]
    AlreadyBooked {
        /// Round of the active booking
        booking_round: Round,
    },

    /// Requested more than the pool can still promise.
    #[error("Capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded {
        /// Requested deposit
        requested: u64,
        /// Remaining bookable amount
        available: u64,
    },

    /// Deposit leg does not match the pool.
    #[error("Invalid booking: {reason}")]
    InvalidBooking {
        /// What was wrong
        reason: &'static str,
    },

    /// Withdrawal without an active booking.
    #[error("No active booking")]
    NoActiveBooking,

    /// Locking period has not elapsed.
    #[error("Still locked: unlocks at round {unlock_round}, current round {current_round}")]
    StillLocked {
        /// First round a withdrawal may commit
        unlock_round: Round,
        /// Round the group was evaluated in
        current_round: Round,
    },

    /// Release leg does not match the pool.
    #[error("Invalid withdrawal: {reason}")]
    InvalidWithdrawal {
        /// What was wrong
        reason: &'static str,
    },

    /// Release amount is not exactly double.
    #[error("Amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch {
        /// Double the booked amount
        expected: u64,
        /// Amount on the release leg
        actual: u64,
    },

    /// Doubling the booked amount overflows.
    #[error("Payout overflow for booked amount {booked}")]
    PayoutOverflow {
        /// Booked amount
        booked: u64,
    },

    /// Program updates are disabled.
    #[error("Update rejected: pool program is immutable")]
    UpdateRejected,

    /// Only the creator may delete.
    #[error("Delete rejected: {caller} is not the creator")]
    DeleteUnauthorized {
        /// Offending caller
        caller: Address,
    },
}

impl Rejection {
    /// Classification used by callers to pick a reaction.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedGroup { .. }
            | Self::WrongPool { .. }
            | Self::InvalidSetup { .. }
            | Self::NotConfigured => ErrorCategory::Configuration,
            Self::Unauthorized { .. }
            | Self::InvalidBooking { .. }
            | Self::InvalidWithdrawal { .. } => ErrorCategory::Authorization,
            Self::NotRegistered
            | Self::AlreadyRegistered
            | Self::AlreadyBooked { .. }
            | Self::CapacityExceeded { .. }
            | Self::NoActiveBooking
            | Self::StillLocked { .. } => ErrorCategory::State,
            Self::UpdateRejected | Self::DeleteUnauthorized { .. } => {
                ErrorCategory::ProtocolImmutability
            }
            Self::AmountMismatch { .. } | Self::PayoutOverflow { .. } => {
                ErrorCategory::AmountMismatch
            }
        }
    }
}

/// Escrow rule refusal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowRejection {
    /// Only one- and two-leg groups are ever authorized.
    #[error("Unsupported group size: {0}")]
    UnsupportedGroupSize(usize),

    /// No leg at the requested index.
    #[error("No leg at index {index}")]
    LegOutOfRange {
        /// Requested index
        index: usize,
    },

    /// Leg is not sent by this escrow.
    #[error("Leg {index} is not sent by the escrow")]
    NotEscrowLeg {
        /// Leg index
        index: usize,
    },

    /// Escrow may only sign the asset leg of a two-leg group.
    #[error("Escrow leg must be sub-operation 1, found at {index}")]
    LegOutOfPosition {
        /// Leg index
        index: usize,
    },

    /// Escrow may only move assets.
    #[error("Escrow leg is not an asset transfer")]
    NotAssetTransfer,

    /// Wrong asset.
    #[error("Asset mismatch: expected {expected}, got {actual}")]
    AssetMismatch {
        /// Asset the escrow holds
        expected: AssetId,
        /// Asset on the leg
        actual: AssetId,
    },

    /// A single-leg escrow group must be a zero-amount opt-in to self.
    #[error("Single-leg escrow group is not an asset opt-in")]
    NotOptIn,

    /// Fee above the ceiling.
    #[error("Fee {fee} exceeds ceiling {ceiling}")]
    FeeTooHigh {
        /// Offered fee
        fee: u64,
        /// Allowed maximum
        ceiling: u64,
    },

    /// Rekeying the escrow is never allowed.
    #[error("Rekey forbidden")]
    RekeyForbidden,

    /// Closing the escrow holding is never allowed.
    #[error("Close-to forbidden")]
    CloseToForbidden,

    /// Sub-operation 0 is not a call.
    #[error("Sub-operation 0 is not a pool call")]
    FirstLegNotCall,

    /// Sub-operation 0 calls another pool.
    #[error("Call targets pool {actual}, escrow serves {expected}")]
    CallTargetMismatch {
        /// Pool the escrow serves
        expected: PoolId,
        /// Pool named by the call
        actual: PoolId,
    },

    /// Sub-operation 0 has a lifecycle side effect.
    #[error("Pool call must be NoOp")]
    CallNotNoOp,
}
