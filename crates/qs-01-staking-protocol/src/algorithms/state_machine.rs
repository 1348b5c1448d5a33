//! # Pool State Machine
//!
//! Validates an atomic group against a pool instance and computes the
//! resulting transition.
//!
//! ```text
//! [UNINITIALIZED] ──setup (creator, call + funding)──→ [CONFIGURED]
//!                                                          │  ↑
//!                         booking (call + deposit) ────────┘  │
//!                         withdrawal (call + 2x release) ─────┘
//! ```
//!
//! `apply_operation` never mutates its input. The host commits the returned
//! `Transition` only if every other leg of the group is also valid, so a
//! rejection anywhere leaves pool and booking state untouched.

use crate::domain::{
    invariant_booking_consistent, invariant_double_payout, invariant_unlocked, AssetTransfer,
    Booking, CallAction, ExecutionContext, OnCompletion, Operation, Pool, PoolInstance,
    PoolTerms, Rejection,
};
use shared_types::{Address, AssetId, Round};
use tracing::debug;

/// Change to the caller's booking record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalChange {
    /// Record untouched.
    Unchanged,
    /// Record created or replaced.
    Set {
        /// Owner of the record
        participant: Address,
        /// New value
        booking: Booking,
    },
    /// Record removed (participant left).
    Removed {
        /// Former owner
        participant: Address,
    },
}

/// Observable outcome of a committed transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Participant joined.
    Registered {
        /// New participant
        participant: Address,
    },
    /// Participant left; an active booking is forfeited to the escrow.
    Deregistered {
        /// Former participant
        participant: Address,
        /// Booked amount left behind
        forfeited: u64,
    },
    /// Setup completed.
    Configured {
        /// Escrow account
        escrow: Address,
        /// Staked asset
        asset_id: AssetId,
        /// Locking period
        locking_rounds: u64,
        /// Initial bookable amount
        funding: u64,
    },
    /// Capacity reserved.
    Booked {
        /// Participant
        participant: Address,
        /// Deposit
        amount: u64,
        /// Booking round
        round: Round,
    },
    /// Doubled deposit released.
    Withdrawn {
        /// Participant
        participant: Address,
        /// Released amount
        payout: u64,
    },
    /// Instance removed.
    PoolDeleted,
}

/// Result of a successful evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Pool value after the transition.
    pub pool: Pool,
    /// Change to the caller's record.
    pub local: LocalChange,
    /// What happened.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn new(pool: Pool, local: LocalChange, effect: Effect) -> Self {
        Self {
            pool,
            local,
            effects: vec![effect],
        }
    }

    /// Whether the host must remove the instance.
    pub fn deletes_pool(&self) -> bool {
        self.effects.contains(&Effect::PoolDeleted)
    }
}

impl PoolInstance {
    /// Apply a transition produced by [`apply_operation`] on this instance.
    pub fn commit(&mut self, transition: Transition) {
        self.pool = transition.pool;
        match transition.local {
            LocalChange::Unchanged => {}
            LocalChange::Set {
                participant,
                booking,
            } => {
                self.bookings.insert(participant, booking);
            }
            LocalChange::Removed { participant } => {
                self.bookings.remove(&participant);
            }
        }
    }
}

/// Evaluate `group` sent by `caller` against `instance`.
///
/// Sub-operation 0 must be a call from `caller` into this pool; the asset leg,
/// when the transition needs one, is sub-operation 1. Roles are never inferred
/// from content.
pub fn apply_operation(
    instance: &PoolInstance,
    caller: &Address,
    ctx: &ExecutionContext,
    group: &[Operation],
) -> Result<Transition, Rejection> {
    let result = dispatch(instance, caller, ctx, group);
    if let Err(rejection) = &result {
        debug!(
            "[qs-01] Pool {} rejected group from {}: {}",
            instance.pool.id,
            caller.short(),
            rejection
        );
    }
    result
}

fn dispatch(
    instance: &PoolInstance,
    caller: &Address,
    ctx: &ExecutionContext,
    group: &[Operation],
) -> Result<Transition, Rejection> {
    let first = group.first().ok_or(Rejection::MalformedGroup {
        reason: "empty group",
    })?;
    if first.sender != *caller {
        return Err(Rejection::MalformedGroup {
            reason: "caller must send sub-operation 0",
        });
    }
    let call = first.as_app_call().ok_or(Rejection::MalformedGroup {
        reason: "sub-operation 0 must be a pool call",
    })?;
    if call.pool_id != instance.pool.id {
        return Err(Rejection::WrongPool {
            expected: instance.pool.id,
            actual: call.pool_id,
        });
    }

    match call.on_completion {
        OnCompletion::NoOp => match call.action {
            Some(CallAction::Setup {
                escrow,
                locking_rounds,
            }) => setup(instance, caller, group, escrow, locking_rounds),
            Some(CallAction::Booking) => booking(instance, caller, ctx, group),
            Some(CallAction::Withdrawal) => withdrawal(instance, caller, ctx, group),
            None => Err(Rejection::MalformedGroup {
                reason: "no-op call without action",
            }),
        },
        OnCompletion::OptIn => {
            require_single(group)?;
            if instance.is_registered(caller) {
                return Err(Rejection::AlreadyRegistered);
            }
            Ok(Transition::new(
                instance.pool.clone(),
                LocalChange::Set {
                    participant: *caller,
                    booking: Booking::EMPTY,
                },
                Effect::Registered {
                    participant: *caller,
                },
            ))
        }
        // Close-out is approved unconditionally; clear-state cannot be refused.
        OnCompletion::CloseOut | OnCompletion::ClearState => {
            require_single(group)?;
            let record = instance.booking(caller).ok_or(Rejection::NotRegistered)?;
            Ok(Transition::new(
                instance.pool.clone(),
                LocalChange::Removed {
                    participant: *caller,
                },
                Effect::Deregistered {
                    participant: *caller,
                    forfeited: record.booked_amount,
                },
            ))
        }
        OnCompletion::UpdateApplication => Err(Rejection::UpdateRejected),
        OnCompletion::DeleteApplication => {
            require_single(group)?;
            if *caller != instance.pool.creator {
                return Err(Rejection::DeleteUnauthorized { caller: *caller });
            }
            Ok(Transition::new(
                instance.pool.clone(),
                LocalChange::Unchanged,
                Effect::PoolDeleted,
            ))
        }
    }
}

fn require_single(group: &[Operation]) -> Result<(), Rejection> {
    if group.len() != 1 {
        return Err(Rejection::MalformedGroup {
            reason: "lifecycle calls must be sent alone",
        });
    }
    Ok(())
}

/// Sub-operation 1 as an asset transfer, when the group has exactly two legs.
fn asset_leg(group: &[Operation]) -> Option<(&Operation, &AssetTransfer)> {
    if group.len() != 2 {
        return None;
    }
    let leg = &group[1];
    leg.as_asset_transfer().map(|transfer| (leg, transfer))
}

fn setup(
    instance: &PoolInstance,
    caller: &Address,
    group: &[Operation],
    escrow: Address,
    locking_rounds: u64,
) -> Result<Transition, Rejection> {
    let pool = &instance.pool;
    if *caller != pool.creator {
        return Err(Rejection::Unauthorized { caller: *caller });
    }
    if group.len() != 2 {
        return Err(Rejection::InvalidSetup {
            reason: "setup group must hold exactly two sub-operations",
        });
    }
    if pool.is_configured() {
        return Err(Rejection::InvalidSetup {
            reason: "pool already configured",
        });
    }
    if escrow == Address::ZERO {
        return Err(Rejection::InvalidSetup {
            reason: "escrow address must be set",
        });
    }
    let (leg, funding) = asset_leg(group).ok_or(Rejection::InvalidSetup {
        reason: "sub-operation 1 must be an asset transfer",
    })?;
    if funding.amount == 0 {
        return Err(Rejection::InvalidSetup {
            reason: "funding amount must be positive",
        });
    }
    if funding.receiver != escrow {
        return Err(Rejection::InvalidSetup {
            reason: "funding receiver does not match escrow",
        });
    }
    if leg.sender != *caller {
        return Err(Rejection::InvalidSetup {
            reason: "funding must come from the creator",
        });
    }

    let terms = PoolTerms {
        escrow,
        asset_id: funding.asset_id,
        locking_rounds,
    };
    let next = Pool {
        terms: Some(terms),
        bookable_amount: funding.amount,
        ..pool.clone()
    };
    Ok(Transition::new(
        next,
        LocalChange::Unchanged,
        Effect::Configured {
            escrow,
            asset_id: funding.asset_id,
            locking_rounds,
            funding: funding.amount,
        },
    ))
}

fn booking(
    instance: &PoolInstance,
    caller: &Address,
    ctx: &ExecutionContext,
    group: &[Operation],
) -> Result<Transition, Rejection> {
    let pool = &instance.pool;
    let terms = pool.terms()?;
    let current = instance.booking(caller).ok_or(Rejection::NotRegistered)?;
    if current.is_active() {
        return Err(Rejection::AlreadyBooked {
            booking_round: current.booking_round,
        });
    }

    let (leg, deposit) = asset_leg(group).ok_or(Rejection::InvalidBooking {
        reason: "booking needs a call and an asset transfer",
    })?;
    if deposit.asset_id != terms.asset_id {
        return Err(Rejection::InvalidBooking {
            reason: "deposit asset does not match pool asset",
        });
    }
    if leg.sender != *caller {
        return Err(Rejection::InvalidBooking {
            reason: "deposit must come from the caller",
        });
    }
    if deposit.receiver != terms.escrow {
        return Err(Rejection::InvalidBooking {
            reason: "deposit receiver is not the escrow",
        });
    }
    if deposit.amount == 0 {
        return Err(Rejection::InvalidBooking {
            reason: "deposit amount must be positive",
        });
    }
    if deposit.amount > pool.bookable_amount {
        return Err(Rejection::CapacityExceeded {
            requested: deposit.amount,
            available: pool.bookable_amount,
        });
    }

    let record = Booking::new(deposit.amount, ctx.current_round);
    if !invariant_booking_consistent(&record) {
        return Err(Rejection::InvalidBooking {
            reason: "booking cannot be recorded at round zero",
        });
    }
    let next = Pool {
        bookable_amount: pool.bookable_amount - deposit.amount,
        ..pool.clone()
    };
    Ok(Transition::new(
        next,
        LocalChange::Set {
            participant: *caller,
            booking: record,
        },
        Effect::Booked {
            participant: *caller,
            amount: deposit.amount,
            round: ctx.current_round,
        },
    ))
}

fn withdrawal(
    instance: &PoolInstance,
    caller: &Address,
    ctx: &ExecutionContext,
    group: &[Operation],
) -> Result<Transition, Rejection> {
    let pool = &instance.pool;
    let terms = pool.terms()?;
    let current = instance.booking(caller).ok_or(Rejection::NotRegistered)?;
    if !current.is_active() || current.booked_amount == 0 {
        return Err(Rejection::NoActiveBooking);
    }
    invariant_unlocked(current, terms.locking_rounds, ctx.current_round)?;

    let (leg, release) = asset_leg(group).ok_or(Rejection::InvalidWithdrawal {
        reason: "withdrawal needs a call and an asset transfer",
    })?;
    if release.asset_id != terms.asset_id {
        return Err(Rejection::InvalidWithdrawal {
            reason: "release asset does not match pool asset",
        });
    }
    if leg.sender != terms.escrow {
        return Err(Rejection::InvalidWithdrawal {
            reason: "release must come from the escrow",
        });
    }
    if release.receiver != *caller {
        return Err(Rejection::InvalidWithdrawal {
            reason: "release must pay the caller",
        });
    }
    invariant_double_payout(current.booked_amount, release.amount)?;

    // Bookable capacity is not restored.
    Ok(Transition::new(
        pool.clone(),
        LocalChange::Set {
            participant: *caller,
            booking: Booking::EMPTY,
        },
        Effect::Withdrawn {
            participant: *caller,
            payout: release.amount,
        },
    ))
}
