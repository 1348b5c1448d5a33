//! # Algorithms Module
//!
//! Group authorization and transient-failure handling.

pub mod assembly;
pub mod retry;

pub use assembly::authorize_group;
pub use retry::{submit_with_retry, with_retry};
