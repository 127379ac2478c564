//! Client configuration.

use std::time::Duration;

use super::ReconnectPolicy;
use crate::connection::{ConnectionOptions, DEFAULT_HEARTBEAT_INTERVAL};

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Settings shared by every connection a client opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Interval between heartbeat frames.
    pub heartbeat_interval: Duration,
    /// Retry behaviour after failures.
    pub reconnect: ReconnectPolicy,
    /// Events buffered per subscriber before the slowest one lags.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect: ReconnectPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub(crate) fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            heartbeat_interval: self.heartbeat_interval,
        }
    }
}
