//! Periodic keep-alive for an open socket.

use std::time::Duration;

use tokio::sync::{mpsc::WeakUnboundedSender, watch};
use tracing::{trace, warn};

use super::{ConnectionState, event::Command};
use crate::frame::Frame;

/// Send a heartbeat immediately and then every `interval` while the
/// connection stays `Connected`.
///
/// Heartbeats bypass the pending-call registry. The loop ends the first time
/// it observes another state, or once the socket task has gone away.
pub(super) async fn run(
    state: watch::Receiver<ConnectionState>,
    commands: WeakUnboundedSender<Command>,
    interval: Duration,
) {
    let ping = match Frame::heartbeat().to_json() {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "failed to encode heartbeat; heartbeat disabled");
            return;
        }
    };

    while current(&state) == ConnectionState::Connected {
        let Some(tx) = commands.upgrade() else { break };
        if tx.send(Command::Write(ping.clone())).is_err() {
            break;
        }
        drop(tx);
        trace!("heartbeat sent");
        tokio::time::sleep(interval).await;
    }
}

fn current(state: &watch::Receiver<ConnectionState>) -> ConnectionState { *state.borrow() }
