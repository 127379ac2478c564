//! Caller-visible state and notifications.

use std::{fmt, sync::Arc};

use super::ClientError;
use crate::frame::Frame;

/// Lifecycle of a [`Client`](crate::Client) as observed by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientState {
    /// Built, `connect()` not called yet.
    Initial,
    /// Bootstrap or socket handshake in flight.
    Connecting,
    /// A connection is open.
    Connected,
    /// A caller-initiated close is in progress.
    Closing,
    /// Closed by the caller or after the reconnect policy gave up.
    Closed,
    /// Waiting to retry after a failure.
    Reconnect,
}

impl ClientState {
    /// Whether [`Client::connect`](crate::Client::connect) may be called.
    #[must_use]
    pub const fn can_connect(self) -> bool {
        matches!(self, Self::Initial | Self::Closed | Self::Reconnect)
    }

    /// Whether [`Client::close`](crate::Client::close) may be called.
    #[must_use]
    pub const fn can_close(self) -> bool {
        matches!(self, Self::Connected | Self::Connecting | Self::Reconnect)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Reconnect => "reconnect",
        };
        f.write_str(name)
    }
}

/// Notification published to every subscriber of a client.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    /// A connection opened.
    Online,
    /// The current connection closed.
    Offline,
    /// The client settled in [`ClientState::Closed`].
    Closed,
    /// A recoverable failure.
    Error(Arc<ClientError>),
    /// An unsolicited frame pushed by the server.
    Message(Frame),
}
