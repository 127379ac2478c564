//! Messages flowing into and out of the socket task.

use super::ConnectionError;
use crate::frame::Frame;

/// Notification emitted by a [`Connection`](super::Connection) to its owner.
///
/// Events arrive in the order the socket task produced them. `Close` is
/// always the last event of a connection and is emitted exactly once.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// The socket opened and the connection is usable.
    Open,
    /// The socket closed, for whatever reason.
    Close,
    /// A transport or protocol error. Does not change state by itself.
    Error(ConnectionError),
    /// An unsolicited frame pushed by the server.
    Message(Frame),
}

/// Requests from the handle (and the heartbeat) to the socket task.
#[derive(Debug)]
pub(super) enum Command {
    /// Write serialized frame text to the socket.
    Write(String),
    /// Shut the socket down.
    Close,
}
