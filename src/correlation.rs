//! Correlation identifiers and the pending-call registry.
//!
//! `CorrelatableFrame` abstracts over frame types that carry an optional
//! correlation identifier. [`PendingCalls`] maps outstanding identifiers to
//! the single-use completion that resolves the caller's future.

use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::frame::Frame;

/// Access and mutate correlation identifiers on frames.
pub trait CorrelatableFrame {
    /// Return the correlation identifier associated with this frame, if any.
    fn correlation_id(&self) -> Option<u64>;

    /// Set or clear the correlation identifier.
    fn set_correlation_id(&mut self, correlation_id: Option<u64>);
}

impl CorrelatableFrame for Frame {
    fn correlation_id(&self) -> Option<u64> { self.call_id() }

    fn set_correlation_id(&mut self, correlation_id: Option<u64>) {
        self.set_call_id(correlation_id);
    }
}

/// Outcome of routing a reply through the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// The waiting caller received the reply.
    Delivered,
    /// An entry existed but its caller stopped waiting (for example after a
    /// send timeout).
    Abandoned,
    /// No entry was registered for the reply's id.
    Unknown,
}

/// Outstanding calls of one connection, keyed by correlation id.
///
/// Entries displaced by a duplicate registration are parked rather than
/// dropped, so the earlier caller keeps waiting until the connection closes
/// instead of observing a reply meant for someone else.
#[derive(Default)]
pub(crate) struct PendingCalls {
    entries: DashMap<u64, oneshot::Sender<Frame>>,
    superseded: Mutex<Vec<oneshot::Sender<Frame>>>,
}

impl PendingCalls {
    /// Register a completion for `call_id` and return the receiving half.
    ///
    /// Re-registering an id that is still pending logs a warning; the newer
    /// registration wins.
    pub(crate) fn register(&self, call_id: u64) -> oneshot::Receiver<Frame> {
        let (tx, rx) = oneshot::channel();
        if let Some(previous) = self.entries.insert(call_id, tx) {
            warn!(call_id, "duplicate call id; replacing pending call");
            crate::metrics::inc_protocol_warnings();
            self.superseded
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(previous);
        }
        rx
    }

    /// Remove the entry for the reply's id and hand it the frame.
    pub(crate) fn resolve(&self, reply: Frame) -> Resolution {
        let Some(call_id) = reply.call_id() else {
            return Resolution::Unknown;
        };
        let Some((_, tx)) = self.entries.remove(&call_id) else {
            return Resolution::Unknown;
        };
        if tx.send(reply).is_err() {
            debug!(call_id, "reply arrived after caller stopped waiting");
            return Resolution::Abandoned;
        }
        Resolution::Delivered
    }

    /// Drop the entry for `call_id` without resolving it.
    pub(crate) fn forget(&self, call_id: u64) { self.entries.remove(&call_id); }

    pub(crate) fn contains(&self, call_id: u64) -> bool { self.entries.contains_key(&call_id) }

    pub(crate) fn len(&self) -> usize { self.entries.len() }

    /// Drop every entry, failing all callers still waiting.
    pub(crate) fn drain(&self) {
        self.entries.clear();
        self.superseded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
