//! # Algorithms Module
//!
//! Pool transitions, escrow authorization and status derivation.

pub mod escrow;
pub mod state_machine;
pub mod status;

pub use escrow::{Authorizer, EscrowRule, DEFAULT_FEE_CEILING};
pub use state_machine::{apply_operation, Effect, LocalChange, Transition};
pub use status::{derive_status, StakingStatus, WithdrawalHistory};
