//! Lifecycle state of a single connection.

use std::fmt;

/// Lifecycle of one socket.
///
/// Transitions only move forward: `Initial → Connected → Closing → Closed`,
/// or straight from `Initial` to `Closed` when the socket cannot be opened.
/// Reconnecting always requires a new [`Connection`](super::Connection).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Constructed; the socket handshake is in flight.
    Initial,
    /// Socket open; the heartbeat loop is running.
    Connected,
    /// Close requested and in progress.
    Closing,
    /// Socket fully closed. Terminal.
    Closed,
}

impl ConnectionState {
    /// Whether [`Connection::close`](super::Connection::close) may be called.
    #[must_use]
    pub const fn can_close(self) -> bool { matches!(self, Self::Initial | Self::Connected) }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
