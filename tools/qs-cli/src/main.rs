//! QS-CLI: Quantum-Stake devnet CLI

use std::process::ExitCode;

use clap::Parser;
use qs_cli::{run, Cli, CliError};
use qs_telemetry::{env_log_level, init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = TelemetryConfig::for_subsystem("00", "cli")
        .with_log_level(cli.resolve_log_level(env_log_level()));
    let _guard = match init_telemetry(config) {
        Ok(guard) => guard,
        Err(e) => return report(CliError::from(e)),
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(err: CliError) -> ExitCode {
    eprintln!("\nError: {}\n", err);
    ExitCode::from(err.exit_code())
}
