//! chorez command-line entry point.
//!
//! Logging goes to stderr and is off unless `RUST_LOG` names a filter.

use chorez::cli::Cli;
use clap::Parser;
use std::io::Write;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn log_filter() -> EnvFilter {
    // Ignore empty, oversized, or unparsable filters rather than failing startup.
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(trimmed).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter())
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    if let Err(err) = cli.run(&mut stdout).await {
        tracing::debug!(error = ?err, "command failed");
        drop(writeln!(std::io::stderr(), "chorez: {err}"));
        std::process::exit(err.exit_code());
    }
}
