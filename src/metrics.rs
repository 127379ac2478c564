//! Metric helpers for `tether`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open sockets.
pub const CONNECTIONS_ACTIVE: &str = "tether_connections_active";
/// Name of the counter tracking frames written and read.
pub const FRAMES_TOTAL: &str = "tether_frames_total";
/// Name of the counter tracking scheduled reconnect attempts.
pub const RECONNECTS_TOTAL: &str = "tether_reconnects_total";
/// Name of the counter tracking calls that timed out waiting for a reply.
pub const CALL_TIMEOUTS_TOTAL: &str = "tether_call_timeouts_total";
/// Name of the counter tracking peer protocol anomalies (duplicate or
/// unknown call ids).
pub const PROTOCOL_WARNINGS_TOTAL: &str = "tether_protocol_warnings_total";

/// Direction of frame travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames read from the socket.
    Inbound,
    /// Frames written to the socket.
    Outbound,
}

impl Direction {
    /// Label value used for the `direction` label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the open sockets gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the open sockets gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a scheduled reconnect attempt.
pub fn inc_reconnects() {
    #[cfg(feature = "metrics")]
    counter!(RECONNECTS_TOTAL).increment(1);
}

/// Record a call that timed out.
pub fn inc_call_timeouts() {
    #[cfg(feature = "metrics")]
    counter!(CALL_TIMEOUTS_TOTAL).increment(1);
}

/// Record a protocol anomaly reported by the peer.
pub fn inc_protocol_warnings() {
    #[cfg(feature = "metrics")]
    counter!(PROTOCOL_WARNINGS_TOTAL).increment(1);
}
