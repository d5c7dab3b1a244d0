//! Vandon - cached proxy for the shipment (vận đơn) sheet
//!
//! An HTTP service that fetches shipment rows from a spreadsheet-backed API,
//! caches them in memory and serves filtered, paginated pages to the dashboard.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vandon::cli::{Cli, ServerConfig};
use vandon::server;

/// Log filter used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "vandon=info,tower_http=info";

/// Installs the global tracing subscriber, honouring `RUST_LOG`
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ServerConfig::from_cli(&cli)?;

    init_tracing();

    server::serve(config).await?;

    Ok(())
}
