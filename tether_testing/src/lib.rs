//! In-memory doubles for driving a [`tether::Client`] in tests.
//!
//! [`MockTransport`] hands out in-memory sockets whose server ends surface
//! through a [`MockServer`]; [`ScriptedBootstrap`] resolves a fixed endpoint
//! and counts how often it was asked.
//!
//! ```rust
//! use tether::{Client, ClientState};
//! use tether_testing::{MockTransport, ScriptedBootstrap};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (transport, mut server) = MockTransport::new();
//! let bootstrap = ScriptedBootstrap::new("ws://mock/a");
//! let client = Client::builder()
//!     .bootstrap(bootstrap.clone())
//!     .transport(transport)
//!     .build();
//!
//! client.connect();
//! let _peer = server.accept().await;
//! client.wait_for_state(ClientState::Connected).await;
//! assert_eq!(bootstrap.calls(), 1);
//! # }
//! ```

mod bootstrap;
mod metrics;
mod transport;

pub use bootstrap::ScriptedBootstrap;
pub use metrics::{RecorderHandle, counter_value, gauge_value, recorder};
pub use transport::{MockPeer, MockServer, MockTransport, reply_to};
