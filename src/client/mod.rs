//! Caller-facing supervisor for a persistent connection.
//!
//! A [`Client`] owns at most one [`Connection`](crate::Connection) at a
//! time. It resolves a fresh endpoint before every attempt, replaces the
//! connection after an unexpected close, and publishes a stable
//! [`ClientState`] plus [`ClientEvent`]s so callers never observe the
//! churn underneath.

mod backoff;
mod builder;
mod config;
mod error;
mod event;
mod runtime;
mod supervisor;

pub use backoff::{BackoffConfig, ReconnectPolicy};
pub use builder::ClientBuilder;
pub use config::{ClientConfig, DEFAULT_EVENT_CAPACITY};
pub use error::ClientError;
pub use event::{ClientEvent, ClientState};
pub use runtime::Client;
