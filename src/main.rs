//! uptime-probe binary
//!
//! Loads configuration, starts the prober and the metrics endpoint, and runs
//! until SIGINT or SIGTERM.

use clap::Parser;
use std::process::ExitCode;
use uptime_probe::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    server, telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        return match output {
            Some(path) => match std::fs::write(&path, template) {
                Ok(()) => {
                    println!("Wrote configuration template to {}", path);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Failed to write {}: {}", path, e);
                    ExitCode::FAILURE
                }
            },
            None => {
                print!("{}", template);
                ExitCode::SUCCESS
            }
        };
    }

    // Logging is configured from the file, so load errors go to stderr
    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        target_url = %config.probe.target_url(),
        address = %config.server.address,
        "Starting uptime-probe"
    );

    match server::run(config).await {
        Ok(()) => {
            tracing::info!("Shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "uptime-probe terminated with error");
            ExitCode::FAILURE
        }
    }
}
