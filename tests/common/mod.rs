//! Shared utilities for integration tests.
//!
//! Provides a [`Harness`] wiring a [`Client`] to a mock transport and a
//! counting bootstrap, plus helpers for awaiting events under paused time.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::time::Duration;

use tether::{BackoffConfig, Client, ClientEvent, ReconnectPolicy};
use tether_testing::{MockServer, MockTransport, ScriptedBootstrap};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Endpoint every harness bootstrap resolves to.
pub const ENDPOINT: &str = "ws://mock/a";

/// First reconnect delay of [`test_policy`].
pub const INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Deterministic policy: 100 ms doubling to 1 s, no jitter, unbounded.
pub fn test_policy() -> ReconnectPolicy {
    ReconnectPolicy::default()
        .with_backoff(BackoffConfig {
            initial_delay: INITIAL_DELAY,
            max_delay: Duration::from_secs(1),
        })
        .with_jitter(false)
}

/// A client together with the doubles it talks to.
pub struct Harness {
    pub client: Client,
    pub events: broadcast::Receiver<ClientEvent>,
    pub server: MockServer,
    pub transport: MockTransport,
    pub bootstrap: ScriptedBootstrap,
}

impl Harness {
    pub fn new() -> Self { Self::with(ScriptedBootstrap::new(ENDPOINT), test_policy()) }

    pub fn with(bootstrap: ScriptedBootstrap, policy: ReconnectPolicy) -> Self {
        Self::with_heartbeat(bootstrap, policy, Duration::from_secs(3600))
    }

    pub fn with_heartbeat(
        bootstrap: ScriptedBootstrap,
        policy: ReconnectPolicy,
        heartbeat: Duration,
    ) -> Self {
        let (transport, server) = MockTransport::new();
        let client = Client::builder()
            .bootstrap(bootstrap.clone())
            .transport(transport.clone())
            .reconnect_policy(policy)
            .heartbeat_interval(heartbeat)
            .build();
        let events = client.subscribe();
        Self {
            client,
            events,
            server,
            transport,
            bootstrap,
        }
    }

    /// Next event, failing the test if none arrives within five minutes of
    /// (possibly paused) time.
    pub async fn next_event(&mut self) -> ClientEvent { next_event(&mut self.events).await }

    /// Assert that no event is queued right now.
    pub fn assert_no_event(&mut self) {
        match self.events.try_recv() {
            Err(TryRecvError::Empty) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

pub async fn next_event(events: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(300), events.recv())
        .await
        .expect("timed out waiting for a client event")
        .expect("event channel closed or lagged")
}
