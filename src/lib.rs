#![doc(html_root_url = "https://docs.rs/tether/latest")]
//! Persistent, auto-reconnecting client for real-time message sockets.
//!
//! A [`Client`] resolves a socket endpoint through a [`Bootstrap`], keeps a
//! single [`Connection`] alive with heartbeats, correlates calls with their
//! replies, and transparently reconnects after the socket drops.

pub mod bootstrap;
pub mod client;
pub mod connection;
pub mod correlation;
pub mod frame;
pub mod metrics;
pub mod transport;

pub use bootstrap::{Bootstrap, BootstrapError, HttpBootstrap, bootstrap_fn};
pub use client::{
    BackoffConfig,
    Client,
    ClientBuilder,
    ClientConfig,
    ClientError,
    ClientEvent,
    ClientState,
    ReconnectPolicy,
};
pub use connection::{
    Connection,
    ConnectionError,
    ConnectionEvent,
    ConnectionEvents,
    ConnectionOptions,
    ConnectionState,
};
pub use correlation::CorrelatableFrame;
pub use frame::{Frame, Inbound};
pub use metrics::{
    CALL_TIMEOUTS_TOTAL,
    CONNECTIONS_ACTIVE,
    Direction,
    FRAMES_TOTAL,
    PROTOCOL_WARNINGS_TOTAL,
    RECONNECTS_TOTAL,
};
pub use transport::{Socket, Transport, TransportError, WebSocketTransport};
