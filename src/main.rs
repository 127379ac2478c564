//! `tether` binary: keep a session open and log what the server pushes.

mod cli;

use std::time::Duration;

use clap::Parser;
use tether::{Client, ClientEvent, ClientState, HttpBootstrap};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = cli::Cli::parse();
    install_metrics(&cli)?;

    let client = Client::builder()
        .bootstrap(HttpBootstrap::with_api_base(&cli.api_base, cli.token))
        .heartbeat_interval(Duration::from_secs(cli.heartbeat_secs.max(1)))
        .build();
    let mut events = client.subscribe();
    client.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
            event = events.recv() => match event {
                Ok(ClientEvent::Online) => info!(endpoint = ?client.endpoint(), "online"),
                Ok(ClientEvent::Offline) => warn!("offline"),
                Ok(ClientEvent::Closed) => break,
                Ok(ClientEvent::Error(err)) => error!(error = %err, "client error"),
                Ok(ClientEvent::Message(frame)) => info!(kind = frame.kind(), frame = ?frame, "message"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    if client.state().can_close() {
        client.close();
        client.wait_for_state(ClientState::Closed).await;
    }
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "serving metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.metrics_addr.is_some() {
        warn!("built without the metrics feature; --metrics-addr ignored");
    }
    Ok(())
}
