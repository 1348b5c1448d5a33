//! # QS-01 Staking Protocol
//!
//! Pool state machine for time-locked double-payout staking.
//!
//! **Subsystem ID:** 01  
//! **Architecture:** Hexagonal (DDD), pure core without I/O
//!
//! ## Purpose
//!
//! A creator funds a pool with an asset held by a rule-based escrow. Registered
//! participants book part of that capacity by depositing into the escrow, and
//! after `locking_rounds` withdraw exactly twice the deposit.
//!
//! ## Guarantees
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | Single active booking | `AlreadyBooked` until withdrawal |
//! | Capacity conservation | bookings decrement `bookable_amount`, nothing increments it |
//! | Locking | withdrawal refused before `booking_round + locking_rounds` |
//! | Double payout | release leg must equal `2 x booked_amount` |
//! | Atomicity | transitions are returned, never applied in place |
//! | Escrow non-divertibility | no rekey, no close-to, pool asset only |
//!
//! ## Module Structure
//!
//! ```text
//! qs-01-staking-protocol/
//! ├── domain/          # Pool, Booking, Operation, Rejection, invariants
//! └── algorithms/      # state machine, escrow rule, status reporter
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod domain;

// Re-exports
pub use algorithms::{
    apply_operation, derive_status, Authorizer, Effect, EscrowRule, LocalChange, StakingStatus,
    Transition, WithdrawalHistory, DEFAULT_FEE_CEILING,
};
pub use domain::{
    invariant_booking_consistent, invariant_capacity_conserved, invariant_double_payout,
    invariant_unlocked, payout_for, AppCall, AssetParams, AssetTransfer, Booking, CallAction,
    ErrorCategory, EscrowRejection, ExecutionContext, OnCompletion, Operation, OperationKind,
    Pool, PoolInstance, PoolTerms, Rejection, PAYOUT_MULTIPLIER,
};
pub use shared_types::{Address, AssetId, GroupId, PoolId, Round};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
