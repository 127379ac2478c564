//! Caller-facing client handle.

use std::{fmt, sync::Arc, time::Duration};

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::{
    ClientBuilder,
    ClientError,
    ClientEvent,
    ClientState,
    supervisor::Shared,
};
use crate::frame::Frame;

/// Persistent, self-healing session with a real-time messaging service.
///
/// The client resolves an endpoint through its bootstrap, opens a
/// connection, and keeps it alive: when the socket drops without a
/// caller-initiated [`close`](Self::close), it retries according to its
/// [`ReconnectPolicy`](super::ReconnectPolicy). Lifecycle changes and
/// server pushes are published to every [`subscribe`](Self::subscribe)r.
///
/// Dropping the client stops its supervisor and closes the current socket.
///
/// # Examples
///
/// ```no_run
/// use tether::{Client, ClientState, bootstrap::HttpBootstrap};
///
/// # #[tokio::main]
/// # async fn main() {
/// let client = Client::builder().bootstrap(HttpBootstrap::new("token")).build();
/// client.connect();
/// client.wait_for_state(ClientState::Connected).await;
/// client.close();
/// # }
/// ```
pub struct Client {
    pub(super) shared: Arc<Shared>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Start configuring a client.
    #[must_use]
    pub fn builder() -> ClientBuilder { ClientBuilder::new() }

    /// Begin connecting.
    ///
    /// Returns immediately with the client in [`ClientState::Connecting`];
    /// bootstrap and handshake continue in the background. Calling this
    /// while [`ClientState::Reconnect`] skips the remaining retry delay.
    ///
    /// # Panics
    ///
    /// Panics unless the client is [`ClientState::Initial`],
    /// [`ClientState::Closed`] or [`ClientState::Reconnect`].
    pub fn connect(&self) {
        let mut inner = self.shared.lock();
        let state = self.shared.state();
        if !state.can_connect() {
            drop(inner);
            panic!("connect() called while the client is {state}");
        }
        info!("client connecting");
        inner.force_close = false;
        self.shared.begin_connect(&mut inner);
    }

    /// Close the client without reconnecting.
    ///
    /// The client passes through [`ClientState::Closing`] and publishes
    /// [`ClientEvent::Closed`] once the socket has shut down. If no socket
    /// exists yet, the client closes at once.
    ///
    /// # Panics
    ///
    /// Panics unless the client is [`ClientState::Connected`],
    /// [`ClientState::Connecting`] or [`ClientState::Reconnect`].
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        let state = self.shared.state();
        if !state.can_close() {
            drop(inner);
            panic!("close() called while the client is {state}");
        }
        info!("client closing");
        inner.force_close = true;
        self.shared.set_state(ClientState::Closing);
        match inner.connection.as_ref() {
            Some(connection) => connection.close(),
            None => self.shared.finalize_closed(&mut inner),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ClientState { self.shared.state() }

    /// Subscribe to state changes.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ClientState> { self.shared.state.subscribe() }

    /// Wait until the client is in `target`.
    ///
    /// Only the latest state is observed; a state entered and left again
    /// before this future is polled may be missed.
    pub async fn wait_for_state(&self, target: ClientState) {
        let mut changes = self.state_changes();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = changes.wait_for(|state| *state == target).await;
    }

    /// Subscribe to client events.
    ///
    /// Each subscriber sees every event published after it subscribed. A
    /// subscriber that falls more than the configured event capacity behind
    /// observes [`broadcast::error::RecvError::Lagged`].
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> { self.shared.events.subscribe() }

    /// Send a call over the current connection and wait for its reply.
    ///
    /// With `Some(timeout)` the reply must arrive within `timeout`; a zero
    /// duration means no timeout. A reply arriving after the timeout is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without a connection,
    /// [`ClientError::Timeout`] when the timeout elapses, and
    /// [`ClientError::Connection`] when the connection rejects the call or
    /// closes first.
    pub async fn send(&self, frame: Frame, timeout: Option<Duration>) -> Result<Frame, ClientError> {
        let connection = self
            .shared
            .lock()
            .connection
            .clone()
            .ok_or(ClientError::NotConnected)?;

        let Some(after) = timeout.filter(|t| !t.is_zero()) else {
            return Ok(connection.send(frame).await?);
        };

        let original = frame.clone();
        let mut frame = frame;
        let call_id = connection.assign_call_id(&mut frame);
        match tokio::time::timeout(after, connection.send(frame)).await {
            Ok(reply) => Ok(reply?),
            Err(_) => {
                warn!(call_id, ?after, "call timed out");
                crate::metrics::inc_call_timeouts();
                Err(ClientError::Timeout {
                    frame: Box::new(original),
                    after,
                })
            }
        }
    }

    /// Endpoint of the current connection, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<String> {
        self.shared
            .lock()
            .connection
            .as_ref()
            .map(|connection| connection.endpoint().to_owned())
    }
}

impl Drop for Client {
    fn drop(&mut self) { self.shared.shutdown.cancel(); }
}
