//! Command-line interface parsing for the shipment proxy
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated `ServerConfig`. Every flag defaults to the built-in constants,
//! so running with no arguments serves the default sheet on localhost.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::data::sheet::{DEFAULT_SHEET_API_URL, DEFAULT_SHEET_NAME, DEFAULT_TIMEOUT_SECS};

/// Default cache time-to-live in seconds
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The host is not an IP address
    #[error("Invalid host: '{0}'. Expected an IP address such as 127.0.0.1 or 0.0.0.0")]
    InvalidHost(String),

    /// A zero timeout would fail every upstream request
    #[error("Invalid timeout: must be at least 1 second")]
    ZeroTimeout,
}

/// Vandon - cached proxy for the shipment (vận đơn) sheet
#[derive(Parser, Debug)]
#[command(name = "vandon")]
#[command(about = "Serve filtered, paginated shipment rows from a cached sheet API")]
#[command(version)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3001)]
    pub port: u16,

    /// Sheet API endpoint
    #[arg(long, value_name = "URL", default_value = DEFAULT_SHEET_API_URL)]
    pub sheet_api_url: String,

    /// Sheet to read rows from
    #[arg(long, default_value = DEFAULT_SHEET_NAME)]
    pub sheet: String,

    /// How long fetched rows stay fresh, in seconds (0 disables caching)
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TTL_SECS)]
    pub ttl_secs: u64,

    /// Upstream request timeout, in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Answer with HTTP 500 instead of sample rows when no data is available
    #[arg(long)]
    pub no_mock: bool,
}

/// Configuration derived from CLI arguments for server startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to bind
    pub addr: SocketAddr,
    /// Sheet API endpoint
    pub sheet_api_url: String,
    /// Sheet name sent upstream
    pub sheet: String,
    /// Cache time-to-live
    pub ttl: Duration,
    /// Upstream request timeout
    pub timeout: Duration,
    /// Whether mock rows may be served as the last fallback
    pub mock_fallback: bool,
}

impl ServerConfig {
    /// Creates a ServerConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` with the resolved settings
    /// * `Err(CliError)` if the host is not an IP address or the timeout is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let ip: IpAddr = cli
            .host
            .parse()
            .map_err(|_| CliError::InvalidHost(cli.host.clone()))?;

        if cli.timeout_secs == 0 {
            return Err(CliError::ZeroTimeout);
        }

        Ok(ServerConfig {
            addr: SocketAddr::new(ip, cli.port),
            sheet_api_url: cli.sheet_api_url.clone(),
            sheet: cli.sheet.clone(),
            ttl: Duration::from_secs(cli.ttl_secs),
            timeout: Duration::from_secs(cli.timeout_secs),
            mock_fallback: !cli.no_mock,
        })
    }
}
