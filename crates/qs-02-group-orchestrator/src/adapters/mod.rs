//! # Adapters
//!
//! Port implementations: simulated ledger and local key store.

pub mod in_memory_ledger;
pub mod keystore;

pub use in_memory_ledger::{
    AssetRecord, BlockSummary, InMemoryLedger, LedgerSnapshot, WithdrawalRecord,
};
pub use keystore::{verify_account_signature, LocalKeystore};
