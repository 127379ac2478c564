//! Errors raised by [`Connection`](super::Connection) operations.

use thiserror::Error;

use super::ConnectionState;
use crate::transport::TransportError;

/// Errors produced by a connection or reported through its events.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// `send` was called while the connection was not open.
    #[error("connection is not open (state: {0})")]
    NotOpen(ConnectionState),
    /// The connection closed before the reply arrived.
    #[error("connection closed before a reply arrived")]
    Closed,
    /// The outbound frame could not be serialized.
    #[error("failed to encode frame")]
    Encode(#[source] serde_json::Error),
    /// An inbound message was not a valid frame.
    #[error("failed to decode frame: {text}")]
    Decode {
        /// Parser error.
        #[source]
        source: serde_json::Error,
        /// The offending text.
        text: String,
    },
    /// The socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
