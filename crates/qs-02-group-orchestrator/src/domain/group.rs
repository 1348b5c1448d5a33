//! # Atomic Groups
//!
//! Assembly of ordered operations into one all-or-nothing unit.
//!
//! ```text
//! GroupBuilder ──seal()──→ UnsignedGroup ──authorize──→ SignedGroup ──submit──→ ledger
//!                (id stamped)              (per-leg proof)
//! ```
//!
//! The group id is the SHA-256 of the canonical bincode encoding of every leg
//! with its group field cleared. Each leg then carries that id, so no leg can be
//! lifted into another group.

use super::errors::ConstructionError;
use qs_01_staking_protocol::{EscrowRule, Operation, OperationKind};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::GroupId;
use std::fmt;

/// Name of a key held by an account signer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Identity named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ed25519 signature over [`signing_bytes`].
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSignature {
    /// Raw signature.
    #[serde_as(as = "Bytes")]
    pub bytes: [u8; 64],
}

/// Who authorizes a leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LegSigner {
    /// Key-held account.
    Account(Identity),
    /// Rule-held escrow.
    Escrow(EscrowRule),
}

/// Proof attached to a leg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegAuthorization {
    /// Account signature.
    Signature(OperationSignature),
    /// Escrow rule whose hash is the sender address.
    Escrow(EscrowRule),
}

/// Leg with its proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOperation {
    /// Stamped operation.
    pub operation: Operation,
    /// Proof.
    pub authorization: LegAuthorization,
}

/// Group ready for submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedGroup {
    /// Group id every leg is bound to.
    pub id: GroupId,
    /// Legs in order.
    pub legs: Vec<SignedOperation>,
}

impl SignedGroup {
    /// Operations in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.legs.iter().map(|leg| leg.operation.clone()).collect()
    }
}

/// Canonical bytes an account signs.
pub fn signing_bytes(operation: &Operation) -> Result<Vec<u8>, ConstructionError> {
    let mut bytes = b"qs-op".to_vec();
    let encoded =
        bincode::serialize(operation).map_err(|e| ConstructionError::Encoding(e.to_string()))?;
    bytes.extend_from_slice(&encoded);
    Ok(bytes)
}

/// Group id over `operations`, ignoring any group binding they already carry.
pub fn group_id_of(operations: &[Operation]) -> Result<GroupId, ConstructionError> {
    let unbound: Vec<Operation> = operations
        .iter()
        .cloned()
        .map(|mut op| {
            op.group = None;
            op
        })
        .collect();
    let encoded =
        bincode::serialize(&unbound).map_err(|e| ConstructionError::Encoding(e.to_string()))?;
    Ok(GroupId::from_canonical_bytes(&encoded))
}

/// Collects legs and checks their shape.
#[derive(Debug)]
pub struct GroupBuilder {
    legs: Vec<(Operation, LegSigner)>,
    max_legs: usize,
}

impl GroupBuilder {
    /// Empty builder accepting up to `max_legs` legs.
    pub fn new(max_legs: usize) -> Self {
        Self {
            legs: Vec::new(),
            max_legs,
        }
    }

    /// Append a leg.
    pub fn push(mut self, operation: Operation, signer: LegSigner) -> Self {
        self.legs.push((operation, signer));
        self
    }

    /// Number of legs so far.
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    /// Whether no leg was added.
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Validate shape, compute the id and stamp it into every leg.
    pub fn seal(self) -> Result<UnsignedGroup, ConstructionError> {
        if self.legs.is_empty() {
            return Err(ConstructionError::EmptyGroup);
        }
        if self.legs.len() > self.max_legs {
            return Err(ConstructionError::TooManyLegs {
                count: self.legs.len(),
                max: self.max_legs,
            });
        }
        for (index, (op, _)) in self.legs.iter().enumerate() {
            if let OperationKind::AssetTransfer(transfer) = &op.kind {
                if transfer.amount == 0 && !op.is_asset_opt_in() {
                    return Err(ConstructionError::ZeroAmount { index });
                }
            }
            if let OperationKind::AssetCreate(params) = &op.kind {
                if params.total == 0 {
                    return Err(ConstructionError::ZeroAmount { index });
                }
            }
        }

        let operations: Vec<Operation> = self.legs.iter().map(|(op, _)| op.clone()).collect();
        let id = group_id_of(&operations)?;
        let legs = self
            .legs
            .into_iter()
            .map(|(mut op, signer)| {
                op.group = Some(id);
                (op, signer)
            })
            .collect();
        Ok(UnsignedGroup { id, legs })
    }
}

/// Sealed group awaiting per-leg authorization.
#[derive(Debug)]
pub struct UnsignedGroup {
    /// Group id.
    pub id: GroupId,
    /// Stamped legs with their signers.
    pub legs: Vec<(Operation, LegSigner)>,
}

impl UnsignedGroup {
    /// Stamped operations in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.legs.iter().map(|(op, _)| op.clone()).collect()
    }
}
