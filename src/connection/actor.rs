//! Socket task owning the transport socket of one connection.

use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{
        mpsc::{self, WeakUnboundedSender},
        watch,
    },
    time::Instant,
};
use tracing::{debug, info, warn};

use super::{
    ConnectionEvent,
    ConnectionState,
    event::Command,
    heartbeat,
};
use crate::{
    correlation::PendingCalls,
    metrics::Direction,
    transport::{Socket, Transport},
};

/// Held while a socket is pumping; drives the active-connections gauge and
/// logs how long the socket stayed up.
struct OpenSocket<'a> {
    endpoint: &'a str,
    opened_at: Instant,
}

impl<'a> OpenSocket<'a> {
    fn new(endpoint: &'a str) -> Self {
        crate::metrics::inc_connections();
        Self {
            endpoint,
            opened_at: Instant::now(),
        }
    }
}

impl Drop for OpenSocket<'_> {
    fn drop(&mut self) {
        crate::metrics::dec_connections();
        debug!(
            endpoint = %self.endpoint,
            uptime = ?self.opened_at.elapsed(),
            "socket released"
        );
    }
}

pub(super) struct SocketActor {
    pub(super) endpoint: String,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) state: Arc<watch::Sender<ConnectionState>>,
    pub(super) commands: mpsc::UnboundedReceiver<Command>,
    pub(super) heartbeat_commands: WeakUnboundedSender<Command>,
    pub(super) events: mpsc::UnboundedSender<ConnectionEvent>,
    pub(super) pending: Arc<PendingCalls>,
    pub(super) heartbeat_interval: Duration,
}

impl SocketActor {
    /// Drive the connection from `Initial` to `Closed`.
    pub(super) async fn run(mut self) {
        // Only a close request (or a dropped handle) can arrive before the
        // socket is open.
        let opened = tokio::select! {
            result = self.transport.open(&self.endpoint) => Some(result),
            _ = self.commands.recv() => None,
        };

        let socket = match opened {
            Some(Ok(socket)) => socket,
            Some(Err(err)) => {
                warn!(endpoint = %self.endpoint, error = %err, "failed to open socket");
                self.emit(ConnectionEvent::Error(err.into()));
                self.finish();
                return;
            }
            None => {
                debug!(endpoint = %self.endpoint, "close requested before socket opened");
                self.finish();
                return;
            }
        };

        let promoted = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Initial {
                *state = ConnectionState::Connected;
                true
            } else {
                false
            }
        });
        if !promoted {
            let Socket { mut sink, .. } = socket;
            if let Err(err) = sink.close().await {
                debug!(error = %err, "socket close failed");
            }
            self.finish();
            return;
        }

        info!(endpoint = %self.endpoint, "connection open");
        self.emit(ConnectionEvent::Open);
        tokio::spawn(heartbeat::run(
            self.state.subscribe(),
            self.heartbeat_commands.clone(),
            self.heartbeat_interval,
        ));

        self.pump(socket).await;
        self.finish();
    }

    /// Shuttle frames between the command queue and the socket until either
    /// side closes.
    async fn pump(&mut self, socket: Socket) {
        let Socket {
            mut sink,
            mut source,
        } = socket;
        let _open = OpenSocket::new(&self.endpoint);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Write(text)) => {
                        if let Err(err) = sink.send(text).await {
                            warn!(endpoint = %self.endpoint, error = %err, "socket write failed");
                            self.emit(ConnectionEvent::Error(err.into()));
                            break;
                        }
                        crate::metrics::inc_frames(Direction::Outbound);
                    }
                    Some(Command::Close) | None => {
                        if let Err(err) = sink.close().await {
                            debug!(error = %err, "socket close failed");
                        }
                        break;
                    }
                },
                incoming = source.next() => match incoming {
                    Some(Ok(text)) => self.dispatch(&text),
                    Some(Err(err)) => {
                        warn!(endpoint = %self.endpoint, error = %err, "socket read failed");
                        self.emit(ConnectionEvent::Error(err.into()));
                        break;
                    }
                    None => {
                        debug!(endpoint = %self.endpoint, "socket closed by peer");
                        break;
                    }
                },
            }
        }
    }

    /// Enter the terminal state and notify the owner exactly once.
    fn finish(&mut self) {
        self.commands.close();
        self.state.send_replace(ConnectionState::Closed);
        self.pending.drain();
        info!(endpoint = %self.endpoint, "connection closed");
        self.emit(ConnectionEvent::Close);
    }

    pub(super) fn emit(&self, event: ConnectionEvent) {
        // The owner may have detached already; nothing is listening then.
        let _ = self.events.send(event);
    }
}
