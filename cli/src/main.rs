//! NutriForecast command-line tool
//!
//! Reads a progress CSV and prints nutrition targets, adherence statistics,
//! adaptive TDEE estimates and weight forecasts as JSON.

use anyhow::Result;
use clap::Parser;
use nutriforecast_cli::commands::{execute, Cli, RunContext};
use nutriforecast_cli::config::AppConfig;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    init_tracing(&config);

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        env = if AppConfig::is_production() { "production" } else { "development" },
        "Starting NutriForecast"
    );

    let ctx = RunContext::new(config.engine, cli.today);
    match execute(&cli.command, &ctx) {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            error!(code = e.code(), "{e}");
            eprintln!("{}", serde_json::to_string_pretty(&e.to_response())?);
            std::process::exit(e.exit_code());
        }
    }
}

/// Initialize tracing/logging
///
/// Logs go to stderr so stdout carries only command output.
fn init_tracing(config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter.as_str().into());

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty logging for development
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}
