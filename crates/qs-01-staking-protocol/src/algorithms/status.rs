//! # Status Reporter
//!
//! Derives a participant's staking status from pool terms, the booking record,
//! the current round and the participant's withdrawal history.

use crate::domain::{Booking, Pool};
use serde::{Deserialize, Serialize};
use shared_types::Round;
use std::fmt;

/// Participant-facing staking status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingStatus {
    /// Nothing booked and nothing withdrawn.
    NoActiveBooking,
    /// Booking exists but the locking period is running.
    Locked {
        /// Rounds until a withdrawal may commit.
        remaining_rounds: u64,
    },
    /// Booking can be withdrawn now.
    ReadyToWithdraw,
    /// Record is empty because a withdrawal already happened.
    AlreadyWithdrawn,
}

impl fmt::Display for StakingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveBooking => write!(f, "No active booking"),
            Self::Locked { remaining_rounds } => {
                write!(f, "Locked: {} rounds remaining", remaining_rounds)
            }
            Self::ReadyToWithdraw => write!(f, "Withdrawal ready"),
            Self::AlreadyWithdrawn => write!(f, "Withdrawal already executed"),
        }
    }
}

/// Withdrawals found by the historical index for one participant and pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalHistory {
    /// Committed withdrawal count.
    pub withdrawals: u64,
    /// Round of the latest one.
    pub last_withdrawal_round: Option<Round>,
}

impl WithdrawalHistory {
    /// Whether any withdrawal committed.
    pub fn has_withdrawn(&self) -> bool {
        self.withdrawals > 0
    }
}

/// Derive the status shown to a participant.
///
/// An unconfigured pool cannot hold bookings, so it reports `NoActiveBooking`.
pub fn derive_status(
    pool: &Pool,
    booking: &Booking,
    current_round: Round,
    history: &WithdrawalHistory,
) -> StakingStatus {
    if !booking.is_active() || booking.booked_amount == 0 {
        return if history.has_withdrawn() {
            StakingStatus::AlreadyWithdrawn
        } else {
            StakingStatus::NoActiveBooking
        };
    }
    let Some(terms) = pool.terms.as_ref() else {
        return StakingStatus::NoActiveBooking;
    };

    let elapsed = i128::from(current_round) - i128::from(booking.booking_round);
    let remaining = i128::from(terms.locking_rounds) - elapsed;
    if remaining > 0 {
        StakingStatus::Locked {
            remaining_rounds: u64::try_from(remaining).unwrap_or(u64::MAX),
        }
    } else {
        StakingStatus::ReadyToWithdraw
    }
}
