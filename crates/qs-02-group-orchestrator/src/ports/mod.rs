//! # Ports
//!
//! Inbound staking API and outbound ledger, index and signer interfaces.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
