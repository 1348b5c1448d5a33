//! # Shared Types Crate
//!
//! Identifiers shared across the Quantum-Stake workspace: account addresses,
//! asset and pool identifiers, ledger rounds and atomic group ids.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every crate refers to these definitions.
//! - **Text-stable encoding**: addresses and group ids serialize as lowercase hex,
//!   so snapshots and logs stay readable.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
