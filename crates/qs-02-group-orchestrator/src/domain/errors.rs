//! # Domain Errors
//!
//! Error types for group assembly, ledger interaction and the staking flows.
//!
//! | Error | Raised | Network touched |
//! |-------|--------|-----------------|
//! | `ConstructionError` | while assembling and authorizing a group | no |
//! | `LedgerRejection` | ledger refused or dropped a group | yes, no effect |
//! | `LedgerError` | ledger request failed | maybe |
//! | `OrchestratorError` | public surface of the service | - |

use qs_01_staking_protocol::{ErrorCategory, EscrowRejection, Rejection};
use shared_types::{Address, AssetId, GroupId, PoolId, Round};
use thiserror::Error;

/// Group could not be built; nothing was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// No legs.
    #[error("Group has no operations")]
    EmptyGroup,

    /// More legs than the ledger accepts.
    #[error("Group has {count} operations, maximum is {max}")]
    TooManyLegs {
        /// Legs supplied
        count: usize,
        /// Allowed maximum
        max: usize,
    },

    /// Asset leg moving nothing (opt-ins excepted).
    #[error("Operation {index} moves a zero amount")]
    ZeroAmount {
        /// Leg index
        index: usize,
    },

    /// Signer has no key for the identity.
    #[error("No key for identity '{identity}'")]
    MissingKey {
        /// Requested identity
        identity: String,
    },

    /// Identity does not control the leg's sender.
    #[error("Operation {index} is sent by {sender}, signer controls {signer}")]
    SignerMismatch {
        /// Leg index
        index: usize,
        /// Sender on the leg
        sender: Address,
        /// Address of the signing identity
        signer: Address,
    },

    /// Escrow rule refuses the leg.
    #[error("Escrow refuses operation {index}: {reason}")]
    EscrowRefused {
        /// Leg index
        index: usize,
        /// Rule verdict
        reason: EscrowRejection,
    },

    /// Pool exists but setup has not happened.
    #[error("Pool {0} is not configured")]
    PoolNotConfigured(PoolId),

    /// Canonical encoding failed.
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Why the ledger refused a group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerRejection {
    /// Pool program refused the transition.
    #[error("Protocol rejection: {0}")]
    Protocol(Rejection),

    /// Escrow rule refused a leg.
    #[error("Escrow rule refused operation {index}: {reason}")]
    Escrow {
        /// Leg index
        index: usize,
        /// Rule verdict
        reason: EscrowRejection,
    },

    /// Account signature does not verify.
    #[error("Bad signature on operation {index}")]
    BadSignature {
        /// Leg index
        index: usize,
    },

    /// Leg is not bound to the submitted group id.
    #[error("Operation {index} is not bound to group {group}")]
    GroupMismatch {
        /// Leg index
        index: usize,
        /// Submitted id
        group: GroupId,
    },

    /// Group shape not accepted by the ledger.
    #[error("Malformed group: {0}")]
    MalformedGroup(&'static str),

    /// Leg outside its validity window.
    #[error("Operation {index} not valid at round {round}")]
    OutsideValidity {
        /// Leg index
        index: usize,
        /// Evaluation round
        round: Round,
    },

    /// Call into a pool that does not exist.
    #[error("Unknown pool {0}")]
    UnknownPool(PoolId),

    /// Transfer of an asset that does not exist.
    #[error("Unknown asset {0}")]
    UnknownAsset(AssetId),

    /// Account holds no slot for the asset.
    #[error("Account {account} is not opted in to asset {asset_id}")]
    NotOptedIn {
        /// Account lacking the holding
        account: Address,
        /// Asset
        asset_id: AssetId,
    },

    /// Sender balance too low.
    #[error("Insufficient balance of asset {asset_id}: need {needed}, have {available}")]
    InsufficientBalance {
        /// Asset
        asset_id: AssetId,
        /// Amount requested
        needed: u64,
        /// Amount held
        available: u64,
    },
}

impl LedgerRejection {
    /// Classification shared with protocol rejections.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Protocol(rejection) => rejection.category(),
            Self::Escrow { .. } | Self::BadSignature { .. } | Self::GroupMismatch { .. } => {
                ErrorCategory::Authorization
            }
            Self::MalformedGroup(_)
            | Self::OutsideValidity { .. }
            | Self::UnknownPool(_)
            | Self::UnknownAsset(_) => ErrorCategory::Configuration,
            Self::NotOptedIn { .. } | Self::InsufficientBalance { .. } => ErrorCategory::State,
        }
    }
}

/// Ledger request failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Ledger unreachable or overloaded; the request may be retried.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Group refused before entering the pending set.
    #[error("Group refused: {0}")]
    Refused(LedgerRejection),

    /// Group already known to the ledger.
    #[error("Duplicate submission of group {0}")]
    Duplicate(GroupId),

    /// Group id never submitted.
    #[error("Unknown group {0}")]
    UnknownGroup(GroupId),

    /// Pool id never created or deleted.
    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),
}

impl LedgerError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Account signer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// No key stored for the identity.
    #[error("Unknown identity '{0}'")]
    UnknownIdentity(String),

    /// Operation could not be encoded for signing.
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Orchestrator error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Group could not be built.
    #[error("Construction failed: {0}")]
    Construction(#[from] ConstructionError),

    /// Ledger refused or dropped the group.
    #[error("Rejected: {0}")]
    Rejected(LedgerRejection),

    /// Transient failures persisted through every attempt.
    #[error("Ledger still unavailable after {attempts} attempts: {last}")]
    TransientExhausted {
        /// Attempts made
        attempts: u32,
        /// Last failure
        last: String,
    },

    /// Non-transient ledger failure.
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    /// Pool does not exist.
    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    /// Acting account never joined the pool.
    #[error("{participant} is not registered in pool {pool_id}")]
    NotRegistered {
        /// Account
        participant: Address,
        /// Pool
        pool_id: PoolId,
    },

    /// Acting account has nothing to withdraw.
    #[error("{participant} has no active booking in pool {pool_id}")]
    NoActiveBooking {
        /// Account
        participant: Address,
        /// Pool
        pool_id: PoolId,
    },

    /// Escrow rule could not be recovered for the pool's escrow address.
    #[error("Cannot recover escrow rule for {escrow}")]
    EscrowUnresolved {
        /// Escrow address stored in the pool
        escrow: Address,
    },

    /// Ledger committed a group without the expected result.
    #[error("Unexpected receipt: {0}")]
    UnexpectedReceipt(&'static str),

    /// Caller-imposed deadline passed.
    #[error("Timed out waiting for {0}")]
    WaitTimedOut(&'static str),
}

impl OrchestratorError {
    /// Protocol classification, when the error came from a rejection.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Rejected(rejection) => Some(rejection.category()),
            Self::Construction(ConstructionError::EscrowRefused { .. }) => {
                Some(ErrorCategory::Authorization)
            }
            Self::Construction(_) => Some(ErrorCategory::Configuration),
            Self::NotRegistered { .. } | Self::NoActiveBooking { .. } => Some(ErrorCategory::State),
            _ => None,
        }
    }

    /// Protocol rejection carried by this error, if any.
    pub fn protocol_rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(LedgerRejection::Protocol(rejection)) => Some(rejection),
            _ => None,
        }
    }
}

impl From<LedgerError> for OrchestratorError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Refused(rejection) => Self::Rejected(rejection),
            LedgerError::PoolNotFound(pool_id) => Self::PoolNotFound(pool_id),
            other => Self::Ledger(other),
        }
    }
}

impl From<SignerError> for ConstructionError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::UnknownIdentity(identity) => Self::MissingKey { identity },
            SignerError::Encoding(reason) => Self::Encoding(reason),
        }
    }
}
