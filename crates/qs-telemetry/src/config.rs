//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Subsystem identifier (01, 02, or 00 for tools)
    pub subsystem_id: String,

    /// Log level filter (trace, debug, info, warn, error, or a full directive)
    pub log_level: String,

    /// Whether to write log lines at all
    pub console_output: bool,

    /// Whether to emit JSON lines instead of the pretty format
    pub json_logs: bool,

    /// Whether the pretty format uses ANSI colors
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "quantum-stake".to_string(),
            subsystem_id: "00".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: quantum-stake)
    /// - `QS_SUBSYSTEM_ID`: Subsystem ID (default: 00)
    /// - `QS_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `QS_CONSOLE_OUTPUT`: Enable log output (default: true)
    /// - `QS_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `QS_CONSOLE_ANSI`: Colored output (default: true)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "quantum-stake".to_string()),

            subsystem_id: env::var("QS_SUBSYSTEM_ID").unwrap_or_else(|_| "00".to_string()),

            log_level: env_log_level().unwrap_or_else(|| "info".to_string()),

            console_output: env::var("QS_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("QS_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            ansi: env::var("QS_CONSOLE_ANSI")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }

    /// Create configuration for a specific subsystem.
    pub fn for_subsystem(subsystem_id: &str, subsystem_name: &str) -> Self {
        let mut config = Self::from_env();
        config.subsystem_id = subsystem_id.to_string();
        config.service_name = format!("qs-{}-{}", subsystem_id, subsystem_name);
        config
    }

    /// Override the level filter.
    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }
}

/// Level filter from `QS_LOG_LEVEL`, falling back to `RUST_LOG`.
pub fn env_log_level() -> Option<String> {
    env::var("QS_LOG_LEVEL")
        .or_else(|_| env::var("RUST_LOG"))
        .ok()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
