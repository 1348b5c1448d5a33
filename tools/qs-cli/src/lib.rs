//! QS-CLI: Quantum-Stake devnet CLI
//!
//! Drives the staking protocol against a simulated ledger persisted to a local
//! JSON file.

pub mod cli;
pub mod commands;
pub mod devnet;
pub mod error;
pub mod render;

pub use cli::Cli;
pub use commands::run;
pub use devnet::{Devnet, DevnetFile};
pub use error::CliError;
