//! A single socket: lifecycle, heartbeat and call correlation.
//!
//! [`Connection::open`] spawns a socket task that owns the transport socket
//! and returns a handle plus the receiver of [`ConnectionEvent`]s. The handle
//! assigns correlation ids and registers pending calls; the socket task
//! writes queued frames, classifies inbound frames and resolves replies.
//! A connection is never reused: once it reaches
//! [`ConnectionState::Closed`] the owner must open a new one.

mod actor;
mod dispatch;
mod error;
mod event;
mod heartbeat;
mod state;
#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use actor::SocketActor;
pub use error::ConnectionError;
pub use event::ConnectionEvent;
use event::Command;
pub use state::ConnectionState;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::{
    correlation::{CorrelatableFrame, PendingCalls},
    frame::Frame,
    transport::Transport,
};

/// Default interval between heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Receiver of the events produced by one connection.
pub type ConnectionEvents = mpsc::UnboundedReceiver<ConnectionEvent>;

/// Per-connection settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Interval between heartbeat frames while connected.
    pub heartbeat_interval: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Handle to one socket and its pending calls.
pub struct Connection {
    endpoint: String,
    state: Arc<watch::Sender<ConnectionState>>,
    commands: mpsc::UnboundedSender<Command>,
    pending: Arc<PendingCalls>,
    next_call_id: AtomicU64,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Start opening a socket to `endpoint`.
    ///
    /// The connection starts in [`ConnectionState::Initial`]; an
    /// [`ConnectionEvent::Open`] follows once the transport succeeds, or
    /// [`ConnectionEvent::Error`] and [`ConnectionEvent::Close`] if it fails.
    ///
    /// Dropping the returned handle closes the socket.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn open(
        endpoint: impl Into<String>,
        transport: Arc<dyn Transport>,
        options: ConnectionOptions,
    ) -> (Self, ConnectionEvents) {
        let endpoint = endpoint.into();
        let (state, _) = watch::channel(ConnectionState::Initial);
        let state = Arc::new(state);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(PendingCalls::default());

        let actor = SocketActor {
            endpoint: endpoint.clone(),
            transport,
            state: Arc::clone(&state),
            commands: commands_rx,
            heartbeat_commands: commands_tx.downgrade(),
            events: events_tx,
            pending: Arc::clone(&pending),
            heartbeat_interval: options.heartbeat_interval,
        };
        tokio::spawn(actor.run());
        debug!(%endpoint, "connection created");

        let connection = Self {
            endpoint,
            state,
            commands: commands_tx,
            pending,
            next_call_id: AtomicU64::new(0),
        };
        (connection, events_rx)
    }

    /// Send a call and wait for its reply.
    ///
    /// A frame without a `call_id` is stamped with the next id of this
    /// connection (starting at 0). The returned future resolves with the
    /// reply frame whose `call_id` matches, regardless of the order replies
    /// arrive in.
    ///
    /// Dropping the future abandons the call; a reply that still arrives is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotOpen`] unless the connection is
    /// connected, [`ConnectionError::Encode`] if the frame cannot be
    /// serialized, and [`ConnectionError::Closed`] if the connection closes
    /// before the reply arrives.
    pub async fn send(&self, mut frame: Frame) -> Result<Frame, ConnectionError> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(ConnectionError::NotOpen(state));
        }

        let call_id = self.assign_call_id(&mut frame);
        let text = frame.to_json().map_err(ConnectionError::Encode)?;

        let reply = self.pending.register(call_id);
        if self.commands.send(Command::Write(text)).is_err() {
            self.pending.forget(call_id);
            return Err(ConnectionError::Closed);
        }
        reply.await.map_err(|_| ConnectionError::Closed)
    }

    /// Stamp `frame` with the next call id unless it already carries one,
    /// and return the id the call will be matched by.
    pub fn assign_call_id(&self, frame: &mut Frame) -> u64 {
        match frame.correlation_id() {
            Some(call_id) => call_id,
            None => {
                let call_id = self.next_call_id();
                frame.set_correlation_id(Some(call_id));
                call_id
            }
        }
    }

    /// Request the socket to shut down.
    ///
    /// Valid while [`ConnectionState::Initial`] or
    /// [`ConnectionState::Connected`]; any other call is a caller error and
    /// is logged and ignored. A [`ConnectionEvent::Close`] follows.
    pub fn close(&self) {
        let requested = self.state.send_if_modified(|state| {
            if state.can_close() {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });
        if !requested {
            warn!(
                endpoint = %self.endpoint,
                state = %self.state(),
                "close() ignored; connection already closing"
            );
            return;
        }
        // The socket task may already be gone; it then reports Closed itself.
        let _ = self.commands.send(Command::Close);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { *self.state.borrow() }

    /// Subscribe to lifecycle state changes.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> { self.state.subscribe() }

    /// Endpoint this connection was opened for.
    #[must_use]
    pub fn endpoint(&self) -> &str { &self.endpoint }

    /// Number of calls still waiting for a reply.
    #[must_use]
    pub fn pending_calls(&self) -> usize { self.pending.len() }

    /// Whether a call with `call_id` is still waiting for a reply.
    #[must_use]
    pub fn is_pending(&self, call_id: u64) -> bool { self.pending.contains(call_id) }

    fn next_call_id(&self) -> u64 { self.next_call_id.fetch_add(1, Ordering::Relaxed) }
}
