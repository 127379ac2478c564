//! Error types for client operations.

use std::time::Duration;

use crate::{bootstrap::BootstrapError, connection::ConnectionError, frame::Frame};

/// Errors emitted by [`crate::Client`], either returned from
/// [`send`](crate::Client::send) or published as
/// [`ClientEvent::Error`](super::ClientEvent::Error).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Endpoint discovery failed; the client retries per its policy.
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),
    /// The underlying connection failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// `send` was called while no connection exists.
    #[error("client is not connected")]
    NotConnected,
    /// No reply arrived in time. Carries the frame that was sent.
    #[error("no reply within {after:?}")]
    Timeout {
        /// The frame as passed to `send`.
        frame: Box<Frame>,
        /// The timeout that elapsed.
        after: Duration,
    },
    /// The reconnect policy gave up.
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted {
        /// Attempts made in the final failure streak.
        attempts: u32,
    },
}
