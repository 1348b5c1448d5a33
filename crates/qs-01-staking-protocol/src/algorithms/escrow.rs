//! # Escrow Authorization
//!
//! The escrow account has no private key. Its address is the hash of the rule
//! below, and a leg sent by the escrow is valid only if the rule approves the
//! whole group it travels in.
//!
//! ## Approved shapes
//!
//! | Group size | Escrow leg | Requirement |
//! |------------|------------|-------------|
//! | 1 | 0 | zero-amount opt-in to self of the pool asset |
//! | 2 | 1 | leg 0 is a NoOp call into the served pool; leg 1 moves the pool asset |
//!
//! Every approved leg carries a fee within the ceiling, no rekey and no close-to.

use crate::domain::{EscrowRejection, OnCompletion, Operation};
use serde::{Deserialize, Serialize};
use shared_types::{Address, AssetId, PoolId};

/// Highest fee the escrow will pay for one leg.
pub const DEFAULT_FEE_CEILING: u64 = 1_000;

const RULE_TAG: &[u8] = b"qs-escrow-rule-v1";

/// Predicate deciding whether a rule-held account authorizes a leg.
pub trait Authorizer {
    /// Account this authorizer speaks for.
    fn address(&self) -> Address;

    /// Approve or refuse leg `index` of `group`.
    fn authorize(&self, group: &[Operation], index: usize) -> Result<(), EscrowRejection>;
}

/// Escrow rule parameterized by the pool it serves.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscrowRule {
    /// Pool whose calls may accompany a release.
    pub pool_id: PoolId,
    /// Only asset the escrow moves.
    pub asset_id: AssetId,
    /// Per-leg fee ceiling.
    pub fee_ceiling: u64,
}

impl EscrowRule {
    /// Rule for `pool_id` and `asset_id` with the default ceiling.
    pub fn new(pool_id: PoolId, asset_id: AssetId) -> Self {
        Self {
            pool_id,
            asset_id,
            fee_ceiling: DEFAULT_FEE_CEILING,
        }
    }

    /// Override the fee ceiling.
    pub fn with_fee_ceiling(mut self, fee_ceiling: u64) -> Self {
        self.fee_ceiling = fee_ceiling;
        self
    }

    fn canonical_bytes(&self) -> [u8; 24] {
        let mut bytes = [0u8; 24];
        bytes[..8].copy_from_slice(&self.pool_id.0.to_be_bytes());
        bytes[8..16].copy_from_slice(&self.asset_id.to_be_bytes());
        bytes[16..].copy_from_slice(&self.fee_ceiling.to_be_bytes());
        bytes
    }

    fn check_leg_hygiene(&self, leg: &Operation) -> Result<(), EscrowRejection> {
        if leg.fee > self.fee_ceiling {
            return Err(EscrowRejection::FeeTooHigh {
                fee: leg.fee,
                ceiling: self.fee_ceiling,
            });
        }
        if leg.rekey_to.is_some() {
            return Err(EscrowRejection::RekeyForbidden);
        }
        Ok(())
    }

    fn authorize_opt_in(&self, leg: &Operation) -> Result<(), EscrowRejection> {
        let transfer = leg
            .as_asset_transfer()
            .ok_or(EscrowRejection::NotAssetTransfer)?;
        if transfer.close_to.is_some() {
            return Err(EscrowRejection::CloseToForbidden);
        }
        if transfer.asset_id != self.asset_id {
            return Err(EscrowRejection::AssetMismatch {
                expected: self.asset_id,
                actual: transfer.asset_id,
            });
        }
        if !leg.is_asset_opt_in() {
            return Err(EscrowRejection::NotOptIn);
        }
        self.check_leg_hygiene(leg)
    }

    fn authorize_release(&self, group: &[Operation], index: usize) -> Result<(), EscrowRejection> {
        if index != 1 {
            return Err(EscrowRejection::LegOutOfPosition { index });
        }
        let call = group[0]
            .as_app_call()
            .ok_or(EscrowRejection::FirstLegNotCall)?;
        if call.pool_id != self.pool_id {
            return Err(EscrowRejection::CallTargetMismatch {
                expected: self.pool_id,
                actual: call.pool_id,
            });
        }
        if call.on_completion != OnCompletion::NoOp {
            return Err(EscrowRejection::CallNotNoOp);
        }

        let leg = &group[1];
        let transfer = leg
            .as_asset_transfer()
            .ok_or(EscrowRejection::NotAssetTransfer)?;
        if transfer.asset_id != self.asset_id {
            return Err(EscrowRejection::AssetMismatch {
                expected: self.asset_id,
                actual: transfer.asset_id,
            });
        }
        if transfer.close_to.is_some() {
            return Err(EscrowRejection::CloseToForbidden);
        }
        self.check_leg_hygiene(leg)
    }
}

impl Authorizer for EscrowRule {
    fn address(&self) -> Address {
        Address::derive(RULE_TAG, &self.canonical_bytes())
    }

    fn authorize(&self, group: &[Operation], index: usize) -> Result<(), EscrowRejection> {
        let leg = group
            .get(index)
            .ok_or(EscrowRejection::LegOutOfRange { index })?;
        if leg.sender != self.address() {
            return Err(EscrowRejection::NotEscrowLeg { index });
        }
        match group.len() {
            1 => self.authorize_opt_in(leg),
            2 => self.authorize_release(group, index),
            n => Err(EscrowRejection::UnsupportedGroupSize(n)),
        }
    }
}
