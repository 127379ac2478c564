//! State shared between the client handle and its supervisor task.
//!
//! Every transition happens while holding [`Shared::inner`]. Asynchronous
//! completions (bootstrap results, scheduled retries) carry the epoch that
//! was current when they were started and are ignored once the epoch moved
//! on.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ClientConfig, ClientError, ClientEvent, ClientState};
use crate::{
    bootstrap::{Bootstrap, BootstrapError},
    connection::{Connection, ConnectionEvent, ConnectionEvents},
    transport::Transport,
};

/// Completions delivered to the supervisor task.
pub(super) enum Signal {
    Bootstrapped {
        epoch: u64,
        result: Result<String, BootstrapError>,
    },
    Retry {
        epoch: u64,
    },
}

#[derive(Default)]
pub(super) struct Inner {
    pub(super) connection: Option<Arc<Connection>>,
    pub(super) force_close: bool,
    epoch: u64,
    failures: u32,
}

pub(super) struct Shared {
    pub(super) config: ClientConfig,
    pub(super) bootstrap: Arc<dyn Bootstrap>,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) inner: Mutex<Inner>,
    pub(super) state: watch::Sender<ClientState>,
    pub(super) events: broadcast::Sender<ClientEvent>,
    pub(super) signals: mpsc::UnboundedSender<Signal>,
    pub(super) shutdown: CancellationToken,
}

impl Shared {
    pub(super) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn state(&self) -> ClientState { *self.state.borrow() }

    pub(super) fn set_state(&self, state: ClientState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "client state changed");
        }
    }

    pub(super) fn emit(&self, event: ClientEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn emit_error(&self, err: ClientError) { self.emit(ClientEvent::Error(Arc::new(err))); }

    /// Enter `Closed` and notify subscribers.
    pub(super) fn finalize_closed(&self, inner: &mut Inner) {
        inner.force_close = false;
        inner.failures = 0;
        inner.epoch += 1;
        self.set_state(ClientState::Closed);
        info!("client closed");
        self.emit(ClientEvent::Closed);
    }

    /// Start a new attempt: bump the epoch, enter `Connecting` and resolve an
    /// endpoint in the background.
    pub(super) fn begin_connect(&self, inner: &mut Inner) {
        inner.epoch += 1;
        let epoch = inner.epoch;
        self.set_state(ClientState::Connecting);
        debug!(epoch, "bootstrapping");

        let bootstrap = Arc::clone(&self.bootstrap);
        let signals = self.signals.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = shutdown.cancelled() => {}
                result = bootstrap.resolve() => {
                    let _ = signals.send(Signal::Bootstrapped { epoch, result });
                }
            }
        });
    }

    /// Count a failure and either retry per the policy or give up.
    fn schedule_reconnect(&self, inner: &mut Inner) {
        let policy = self.config.reconnect;
        inner.failures = inner.failures.saturating_add(1);
        let attempt = inner.failures;

        if policy.is_exhausted(attempt) {
            let attempts = attempt - 1;
            warn!(attempts, "reconnect attempts exhausted");
            self.emit_error(ClientError::ReconnectExhausted { attempts });
            self.finalize_closed(inner);
            return;
        }

        crate::metrics::inc_reconnects();
        let delay = policy.delay_for(attempt);
        if delay.is_zero() {
            debug!(attempt, "reconnecting immediately");
            self.begin_connect(inner);
            return;
        }

        debug!(attempt, ?delay, "reconnect scheduled");
        let epoch = inner.epoch;
        let signals = self.signals.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = signals.send(Signal::Retry { epoch });
                }
            }
        });
    }

    fn on_bootstrapped(
        &self,
        epoch: u64,
        result: Result<String, BootstrapError>,
    ) -> Option<ConnectionEvents> {
        let mut inner = self.lock();
        if epoch != inner.epoch || self.state() != ClientState::Connecting {
            debug!(epoch, "stale bootstrap result ignored");
            return None;
        }

        match result {
            Ok(endpoint) => {
                info!(%endpoint, "endpoint resolved");
                let (connection, events) = Connection::open(
                    endpoint,
                    Arc::clone(&self.transport),
                    self.config.connection_options(),
                );
                inner.connection = Some(Arc::new(connection));
                Some(events)
            }
            Err(err) => {
                warn!(error = %err, "bootstrap failed");
                self.set_state(ClientState::Reconnect);
                self.emit_error(ClientError::Bootstrap(err));
                self.schedule_reconnect(&mut inner);
                None
            }
        }
    }

    fn on_retry(&self, epoch: u64) {
        let mut inner = self.lock();
        if epoch != inner.epoch || self.state() != ClientState::Reconnect {
            debug!(epoch, "stale retry ignored");
            return;
        }
        self.begin_connect(&mut inner);
    }

    /// Apply one event of the connection started in `epoch`.
    ///
    /// Returns `false` once the connection is finished with.
    fn on_connection_event(&self, epoch: u64, event: ConnectionEvent) -> bool {
        let mut inner = self.lock();
        if epoch != inner.epoch {
            debug!(epoch, "event from discarded connection ignored");
            return !matches!(event, ConnectionEvent::Close);
        }

        match event {
            ConnectionEvent::Open => {
                if self.state() == ClientState::Connecting {
                    inner.failures = 0;
                    self.set_state(ClientState::Connected);
                    info!("client online");
                    self.emit(ClientEvent::Online);
                }
                true
            }
            ConnectionEvent::Close => {
                inner.connection = None;
                self.emit(ClientEvent::Offline);
                if inner.force_close {
                    self.finalize_closed(&mut inner);
                } else {
                    info!("connection lost; reconnecting");
                    self.set_state(ClientState::Reconnect);
                    self.schedule_reconnect(&mut inner);
                }
                false
            }
            ConnectionEvent::Error(err) => {
                self.emit_error(ClientError::Connection(err));
                true
            }
            ConnectionEvent::Message(frame) => {
                self.emit(ClientEvent::Message(frame));
                true
            }
        }
    }
}

async fn next_event(current: &mut Option<(u64, ConnectionEvents)>) -> (u64, Option<ConnectionEvent>) {
    match current {
        Some((epoch, events)) => (*epoch, events.recv().await),
        None => futures::future::pending().await,
    }
}

/// Apply completions and connection events until the client is dropped.
pub(super) async fn supervise(shared: Arc<Shared>, mut signals: mpsc::UnboundedReceiver<Signal>) {
    let mut current: Option<(u64, ConnectionEvents)> = None;

    loop {
        tokio::select! {
            () = shared.shutdown.cancelled() => break,
            signal = signals.recv() => match signal {
                Some(Signal::Bootstrapped { epoch, result }) => {
                    if let Some(events) = shared.on_bootstrapped(epoch, result) {
                        current = Some((epoch, events));
                    }
                }
                Some(Signal::Retry { epoch }) => shared.on_retry(epoch),
                None => break,
            },
            (epoch, event) = next_event(&mut current) => {
                let attached = match event {
                    Some(event) => shared.on_connection_event(epoch, event),
                    None => false,
                };
                if !attached {
                    current = None;
                }
            }
        }
    }

    debug!("client supervisor stopped");
}
