//! Builder for configuring and starting a client.

use std::{
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::{
    Client,
    ClientConfig,
    ClientState,
    ReconnectPolicy,
    supervisor::{Inner, Shared, supervise},
};
use crate::{
    bootstrap::Bootstrap,
    transport::{Transport, WebSocketTransport},
};

/// Builder for [`Client`].
///
/// The type parameter tracks whether a [`Bootstrap`] has been supplied;
/// [`build`](Self::build) is only available once it has.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tether::{
///     bootstrap::bootstrap_fn,
///     client::{ClientBuilder, ReconnectPolicy},
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = ClientBuilder::new()
///     .bootstrap(bootstrap_fn(|| async { Ok("ws://127.0.0.1:9000".to_owned()) }))
///     .heartbeat_interval(Duration::from_secs(10))
///     .reconnect_policy(ReconnectPolicy::default().with_max_attempts(3))
///     .build();
/// let _ = client;
/// # }
/// ```
pub struct ClientBuilder<B = ()> {
    bootstrap: B,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl<B> fmt::Debug for ClientBuilder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder<()> {
    /// Create a builder with default settings and the WebSocket transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bootstrap: (),
            transport: Arc::new(WebSocketTransport),
            config: ClientConfig::default(),
        }
    }
}

impl Default for ClientBuilder<()> {
    fn default() -> Self { Self::new() }
}

impl<B> ClientBuilder<B> {
    /// Set the endpoint resolver used before every connection attempt.
    #[must_use]
    pub fn bootstrap<B2: Bootstrap>(self, bootstrap: B2) -> ClientBuilder<B2> {
        ClientBuilder {
            bootstrap,
            transport: self.transport,
            config: self.config,
        }
    }

    /// Replace the transport used to open sockets.
    #[must_use]
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Set the interval between heartbeats.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set the retry behaviour after failures.
    #[must_use]
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.config.reconnect = policy;
        self
    }

    /// Set how many events each subscriber may fall behind. Clamped to at
    /// least 1.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B: Bootstrap> ClientBuilder<B> {
    /// Build the client and start its supervisor task.
    ///
    /// The client starts in [`ClientState::Initial`]; call
    /// [`Client::connect`] to go online.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn build(self) -> Client {
        let (state, _) = watch::channel(ClientState::Initial);
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            config: self.config,
            bootstrap: Arc::new(self.bootstrap),
            transport: self.transport,
            inner: Mutex::new(Inner::default()),
            state,
            events,
            signals: signals_tx,
            shutdown: CancellationToken::new(),
        });
        tokio::spawn(supervise(Arc::clone(&shared), signals_rx));
        Client { shared }
    }
}
