//! # Quantum-Stake Telemetry
//!
//! Structured logging for the staking subsystems and tools.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qs_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // Application code; `tracing` events are now written out
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `quantum-stake` | Service name in the startup event |
//! | `QS_LOG_LEVEL` / `RUST_LOG` | `info` | Level filter |
//! | `QS_JSON_LOGS` | `false` | JSON lines instead of pretty output |
//! | `QS_CONSOLE_ANSI` | `true` | Colored pretty output |
//! | `QS_SUBSYSTEM_ID` | `00` | Subsystem identifier |

#![warn(missing_docs)]

mod config;
mod tracing_setup;

pub use config::{env_log_level, TelemetryConfig};
pub use tracing_setup::build_filter;

#[doc(hidden)]
pub use tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed or could not be set.
    #[error("Failed to install subscriber: {0}")]
    SubscriberInit(String),

    /// Level filter could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install the global subscriber.
///
/// Returns a guard to hold for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;
    tracing::debug!(
        service = %config.service_name,
        subsystem = %config.subsystem_id,
        json = config.json_logs,
        "Telemetry initialized"
    );
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    /// Service name the subscriber was installed for.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Log a domain event with a subsystem prefix.
///
/// # Example
///
/// ```rust,ignore
/// use qs_telemetry::log_event;
///
/// log_event!("02", "pool configured", pool_id = 3, funding = 1000);
/// ```
#[macro_export]
macro_rules! log_event {
    ($subsystem:literal, $message:literal $(, $($field:tt)*)?) => {
        $crate::tracing::info!($($($field)*,)? concat!("[qs-", $subsystem, "] ", $message))
    };
}
