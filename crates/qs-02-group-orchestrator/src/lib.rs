//! # QS-02 Group Orchestrator
//!
//! Client-side orchestration of staking pool operations.
//!
//! **Subsystem ID:** 02  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Turn user intents into atomic groups the ledger either applies completely
//! or not at all:
//! - Assemble ordered legs and bind them with one group id
//! - Sign account legs, pre-check escrow legs with the escrow rule
//! - Submit with bounded retries, then wait for confirmation
//! - Wait for rounds and derive participant status
//!
//! ## Failure Handling
//!
//! | Failure | Reaction |
//! |---------|----------|
//! | Construction error | reported before any ledger request |
//! | Transient ledger error | fixed-delay retry, then `TransientExhausted` |
//! | Duplicate submission | treated as accepted, never resent |
//! | Rejection | surfaced with its protocol category; no partial effect |
//!
//! ## Module Structure
//!
//! ```text
//! qs-02-group-orchestrator/
//! ├── domain/          # GroupBuilder, SignedGroup, config, errors
//! ├── algorithms/      # authorization, retry
//! ├── ports/           # StakingApi, LedgerClient, LedgerIndex, AccountSigner
//! ├── adapters/        # InMemoryLedger, LocalKeystore
//! ├── round_clock.rs   # round and confirmation waiting
//! └── service.rs       # StakingService
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod round_clock;
pub mod service;

// Re-exports
pub use adapters::{
    verify_account_signature, AssetRecord, BlockSummary, InMemoryLedger, LedgerSnapshot,
    LocalKeystore, WithdrawalRecord,
};
pub use algorithms::{authorize_group, submit_with_retry, with_retry};
pub use domain::{
    group_id_of, signing_bytes, ConstructionError, GroupBuilder, Identity, LedgerConfig,
    LedgerError, LedgerRejection, LegAuthorization, LegSigner, OperationSignature,
    OrchestratorConfig, OrchestratorError, RetryPolicy, SignedGroup, SignedOperation, SignerError,
    UnsignedGroup,
};
pub use ports::{
    AccountSigner, BookingReceipt, ConfirmationStatus, LedgerClient, LedgerIndex, PoolSummary,
    Receipt, StakingApi, StatusReport, WithdrawalReceipt,
};
pub use round_clock::RoundClock;
pub use service::StakingService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
