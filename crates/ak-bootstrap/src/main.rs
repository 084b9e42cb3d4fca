//! # ak-bootstrap
//!
//! Entry point of the forward-auth bootstrap job.

#![forbid(unsafe_code)]
#![allow(clippy::uninlined_format_args)]

use ak_bootstrap::{output::error, output::success, run, BootstrapConfig, Cli};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            error(&format!("Failed to load configuration: {}", e.to_string().trim_end()));
            std::process::exit(1);
        }
    };

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match BootstrapConfig::from_cli(&cli) {
        Ok(c) => c,
        Err(e) => {
            error(&format!("Failed to load configuration: {}", e));
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config).await {
        error(&e.to_string());
        std::process::exit(1);
    }

    success("Initialization completed successfully");
}
