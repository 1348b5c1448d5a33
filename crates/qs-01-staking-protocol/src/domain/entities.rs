//! # Domain Entities
//!
//! Global pool state and per-participant booking records.

use super::errors::Rejection;
use serde::{Deserialize, Serialize};
use shared_types::{Address, AssetId, PoolId, Round};
use std::collections::BTreeMap;

/// Terms fixed by the one-time setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTerms {
    /// Account holding and releasing the staked asset.
    pub escrow: Address,
    /// Asset being staked.
    pub asset_id: AssetId,
    /// Rounds a booking stays locked.
    pub locking_rounds: u64,
}

/// Global state of one pool instance.
///
/// `terms == None` is the Uninitialized state. Once set the terms never change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Instance identifier.
    pub id: PoolId,
    /// Account allowed to configure and delete the instance.
    pub creator: Address,
    /// Terms, present once configured.
    pub terms: Option<PoolTerms>,
    /// Capacity left for new bookings. Decremented by each booking, never incremented.
    pub bookable_amount: u64,
}

impl Pool {
    /// Freshly deployed, unconfigured pool.
    pub fn new(id: PoolId, creator: Address) -> Self {
        Self {
            id,
            creator,
            terms: None,
            bookable_amount: 0,
        }
    }

    /// Whether setup has happened.
    pub fn is_configured(&self) -> bool {
        self.terms.is_some()
    }

    /// Terms, or `NotConfigured`.
    pub fn terms(&self) -> Result<&PoolTerms, Rejection> {
        self.terms.as_ref().ok_or(Rejection::NotConfigured)
    }
}

/// A participant's booking record.
///
/// `(0, 0)` means no active booking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Deposited amount.
    pub booked_amount: u64,
    /// Round the deposit was recorded at.
    pub booking_round: Round,
}

impl Booking {
    /// Record of a registered participant without a booking.
    pub const EMPTY: Booking = Booking {
        booked_amount: 0,
        booking_round: 0,
    };

    /// Active booking of `amount` recorded at `round`.
    pub fn new(amount: u64, round: Round) -> Self {
        Self {
            booked_amount: amount,
            booking_round: round,
        }
    }

    /// Whether a booking is in progress.
    pub fn is_active(&self) -> bool {
        self.booking_round > 0
    }

    /// First round at which the booking may be withdrawn.
    pub fn unlock_round(&self, locking_rounds: u64) -> Round {
        self.booking_round.saturating_add(locking_rounds)
    }
}

/// A pool together with the booking records of its registered participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInstance {
    /// Global state.
    pub pool: Pool,
    /// Local state keyed by participant.
    pub bookings: BTreeMap<Address, Booking>,
}

impl PoolInstance {
    /// Instance with no registered participants.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            bookings: BTreeMap::new(),
        }
    }

    /// Booking record of `participant`, present once registered.
    pub fn booking(&self, participant: &Address) -> Option<&Booking> {
        self.bookings.get(participant)
    }

    /// Whether `participant` joined.
    pub fn is_registered(&self, participant: &Address) -> bool {
        self.bookings.contains_key(participant)
    }

    /// Sum of all active bookings.
    pub fn active_liability(&self) -> u128 {
        self.bookings
            .values()
            .map(|b| u128::from(b.booked_amount))
            .sum()
    }

    /// Number of participants with an active booking.
    pub fn active_bookings(&self) -> usize {
        self.bookings.values().filter(|b| b.is_active()).count()
    }
}
