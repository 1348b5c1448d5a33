//! # Configuration
//!
//! Orchestrator and simulated-ledger settings.

use serde::{Deserialize, Serialize};
use shared_types::Round;
use std::time::Duration;

/// Bounded fixed-delay retry for transient ledger failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Policy with `max_attempts` and `delay`.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(2),
        }
    }
}

/// Orchestrator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Fee offered on every operation.
    pub fee: u64,
    /// Fee ceiling baked into escrow rules created by this orchestrator.
    pub escrow_fee_ceiling: u64,
    /// Pause between round and confirmation polls.
    pub poll_interval: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// Rounds an operation stays valid after the round it was built in.
    pub validity_window: Round,
    /// Largest group the orchestrator will assemble.
    pub max_group_size: usize,
    /// Block `withdraw` until the locking period has elapsed.
    pub wait_for_unlock: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fee: 1_000,
            escrow_fee_ceiling: qs_01_staking_protocol::DEFAULT_FEE_CEILING,
            poll_interval: Duration::from_millis(250),
            retry: RetryPolicy::default(),
            validity_window: 1_000,
            max_group_size: 16,
            wait_for_unlock: false,
        }
    }
}

/// Simulated ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Round of the genesis block.
    pub genesis_round: Round,
    /// Largest group accepted.
    pub max_group_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            genesis_round: 1,
            max_group_size: 16,
        }
    }
}
