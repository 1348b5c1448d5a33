//! Attack simulations.
//!
//! Every attack is submitted straight to the ledger, skipping the client-side
//! escrow pre-check, so the ledger's own enforcement is what gets tested.

pub mod escrow_drain;
