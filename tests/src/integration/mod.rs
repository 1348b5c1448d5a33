//! End-to-end staking flows.

pub mod concurrency;
pub mod staking_flows;
