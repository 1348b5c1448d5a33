//! # Domain Invariants
//!
//! Business rules of the staking pool.

use super::entities::Booking;
use super::errors::Rejection;
use shared_types::Round;

/// Payout multiplier applied to the booked amount.
pub const PAYOUT_MULTIPLIER: u64 = 2;

/// Invariant: booking consistency.
///
/// `booked_amount > 0` if and only if `booking_round > 0`.
pub fn invariant_booking_consistent(booking: &Booking) -> bool {
    (booking.booked_amount > 0) == (booking.booking_round > 0)
}

/// Invariant: locking period elapsed.
///
/// A withdrawal may commit only at `booking_round + locking_rounds` or later.
pub fn invariant_unlocked(
    booking: &Booking,
    locking_rounds: u64,
    current_round: Round,
) -> Result<(), Rejection> {
    let unlock_round = booking.unlock_round(locking_rounds);
    if current_round < unlock_round {
        return Err(Rejection::StillLocked {
            unlock_round,
            current_round,
        });
    }
    Ok(())
}

/// Payout owed for `booked_amount`.
pub fn payout_for(booked_amount: u64) -> Result<u64, Rejection> {
    booked_amount
        .checked_mul(PAYOUT_MULTIPLIER)
        .ok_or(Rejection::PayoutOverflow {
            booked: booked_amount,
        })
}

/// Invariant: release amount is exactly double the booked amount.
pub fn invariant_double_payout(booked_amount: u64, released: u64) -> Result<(), Rejection> {
    let expected = payout_for(booked_amount)?;
    if released != expected {
        return Err(Rejection::AmountMismatch {
            expected,
            actual: released,
        });
    }
    Ok(())
}

/// Invariant: capacity conservation.
///
/// Remaining capacity plus everything ever booked equals the initial funding.
pub fn invariant_capacity_conserved(
    initial_funding: u64,
    total_booked: u128,
    bookable_amount: u64,
) -> bool {
    u128::from(bookable_amount) + total_booked == u128::from(initial_funding)
}
