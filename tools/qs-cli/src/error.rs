//! CLI errors.

use qs_02_group_orchestrator::OrchestratorError;
use qs_telemetry::TelemetryError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// State file could not be read or written.
    #[error("State file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// State file exists but is not a devnet state.
    #[error("State file {path} is malformed: {source}")]
    StateFormat {
        /// File involved.
        path: PathBuf,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// No devnet initialized at this path.
    #[error("No devnet at {0}; run `qs-cli init` first")]
    StateMissing(PathBuf),

    /// Refusing to overwrite an existing devnet.
    #[error("Devnet already exists at {0}; pass --force to reset it")]
    StateExists(PathBuf),

    /// Account name not in the keystore.
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Account name already taken.
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// Stored seed is not 32 hex-encoded bytes.
    #[error("Invalid seed for account {0}")]
    InvalidSeed(String),

    /// Output encoding failed.
    #[error("Output encoding failed: {0}")]
    Output(#[from] serde_json::Error),

    /// Staking operation failed.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// Logging could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

impl CliError {
    /// Process exit code: 2 for ledger rejections, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Orchestrator(OrchestratorError::Rejected(_)) => 2,
            _ => 1,
        }
    }
}
