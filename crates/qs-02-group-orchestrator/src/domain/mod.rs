//! # Domain Module
//!
//! Group assembly types, configuration and errors.

pub mod config;
pub mod errors;
pub mod group;

pub use config::*;
pub use errors::*;
pub use group::*;
