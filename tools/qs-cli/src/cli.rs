//! Command-line arguments.

use crate::devnet::DEFAULT_BLOCK_TIME_MS;
use clap::{Parser, Subcommand};
use shared_types::{AssetId, PoolId};
use std::path::PathBuf;

/// QS-CLI: Quantum-Stake devnet CLI
#[derive(Parser, Debug)]
#[command(
    name = "qs-cli",
    about = "Create staking pools, book capacity and withdraw on a local devnet",
    version
)]
pub struct Cli {
    /// Devnet state file
    #[arg(long, global = true, env = "QS_STATE", default_value = "qs-devnet.json")]
    pub state: PathBuf,

    /// Print results as JSON instead of summaries
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level filter [default: QS_LOG_LEVEL, then RUST_LOG, then warn]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Level filter when neither the flag nor the environment names one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

impl Cli {
    /// The `--log-level` flag, then `from_env`, then [`DEFAULT_LOG_LEVEL`].
    pub fn resolve_log_level(&self, from_env: Option<String>) -> String {
        self.log_level
            .clone()
            .or(from_env)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a fresh devnet
    Init {
        /// Milliseconds per round
        #[arg(long, env = "QS_BLOCK_TIME_MS", default_value_t = DEFAULT_BLOCK_TIME_MS)]
        block_time_ms: u64,

        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Manage local accounts
    #[command(subcommand)]
    Account(AccountCommand),

    /// Mint, opt in to and move assets
    #[command(subcommand)]
    Asset(AssetCommand),

    /// Produce blocks immediately
    Advance {
        /// Number of rounds
        #[arg(long, default_value_t = 1)]
        rounds: u64,
    },

    /// Deploy, fund and configure a staking pool
    Create {
        #[command(flatten)]
        account: AccountArg,

        /// Staked asset
        #[arg(long)]
        asset: AssetId,

        /// Rounds a booking stays locked
        #[arg(long)]
        locking_rounds: u64,

        /// Amount moved into the escrow
        #[arg(long)]
        funding: u64,
    },

    /// Show a pool summary
    Info {
        /// Pool id
        #[arg(long)]
        pool: u64,
    },

    /// Register in a pool
    Join(PoolArgs),

    /// Leave a pool, forfeiting any active booking
    Leave(PoolArgs),

    /// Book capacity by depositing into the escrow
    Book {
        #[command(flatten)]
        target: PoolArgs,

        /// Deposit
        #[arg(long)]
        amount: u64,
    },

    /// Show a participant's booking status
    Status {
        /// Pool id
        #[arg(long)]
        pool: u64,

        /// Account name or hex address
        #[arg(long)]
        of: String,
    },

    /// Withdraw double the booked amount
    Withdraw {
        #[command(flatten)]
        target: PoolArgs,

        /// Wait for the locking period instead of failing early
        #[arg(long)]
        wait: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommand {
    /// Generate a new account key
    New {
        /// Account name
        name: String,
    },

    /// List accounts with their addresses
    List,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AssetCommand {
    /// Create a new asset held by the minting account
    Mint {
        #[command(flatten)]
        account: AccountArg,

        /// Total supply
        #[arg(long)]
        total: u64,

        /// Unit name
        #[arg(long, default_value = "UNIT")]
        unit: String,
    },

    /// Open a holding for an asset
    OptIn {
        #[command(flatten)]
        account: AccountArg,

        /// Asset id
        #[arg(long)]
        asset: AssetId,
    },

    /// Transfer an asset
    Send {
        #[command(flatten)]
        account: AccountArg,

        /// Asset id
        #[arg(long)]
        asset: AssetId,

        /// Receiving account name or hex address
        #[arg(long)]
        to: String,

        /// Amount
        #[arg(long)]
        amount: u64,
    },

    /// Show a holding
    Balance {
        /// Account name or hex address
        #[arg(long)]
        of: String,

        /// Asset id
        #[arg(long)]
        asset: AssetId,
    },
}

/// Acting account.
#[derive(clap::Args, Debug, Clone)]
pub struct AccountArg {
    /// Account name
    #[arg(long = "from", env = "QS_ACCOUNT")]
    pub name: String,
}

/// Acting account and pool.
#[derive(clap::Args, Debug, Clone)]
pub struct PoolArgs {
    #[command(flatten)]
    pub account: AccountArg,

    /// Pool id
    #[arg(long)]
    pub pool: u64,
}

impl PoolArgs {
    /// Pool id.
    pub fn pool_id(&self) -> PoolId {
        PoolId(self.pool)
    }
}
