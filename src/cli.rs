//! Command line interface for the `tether` binary.
//!
//! Connects with an access token and logs everything the server pushes.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `tether` binary.
#[derive(Debug, Parser)]
#[command(
    name = "tether",
    version,
    about = "Keep a real-time message socket open and log its events"
)]
pub struct Cli {
    /// Access token presented to the bootstrap API.
    #[arg(short, long, env = "TETHER_TOKEN", hide_env_values = true)]
    pub token: String,
    /// Base URL of the bootstrap API.
    #[arg(long, default_value = "https://rtm.bearychat.com")]
    pub api_base: String,
    /// Seconds between heartbeats.
    #[arg(long, default_value_t = 5)]
    pub heartbeat_secs: u64,
    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
