//! In-memory sockets for exercising the socket task without a network.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, channel::mpsc};

use crate::{
    frame::{Frame, kind},
    transport::{Socket, Transport, TransportError},
};

/// Server side of an in-memory socket.
pub(crate) struct Peer {
    written: mpsc::UnboundedReceiver<String>,
    inbound: Option<mpsc::UnboundedSender<Result<String, TransportError>>>,
}

impl Peer {
    /// Next frame written by the client, or `None` once the client closed.
    pub(crate) async fn next_frame(&mut self) -> Option<Frame> {
        let text = self.written.next().await?;
        Some(Frame::from_json(&text).expect("client wrote a valid frame"))
    }

    /// Next non-heartbeat frame written by the client.
    pub(crate) async fn next_call(&mut self) -> Option<Frame> {
        loop {
            let frame = self.next_frame().await?;
            if frame.kind() != kind::PING {
                return Some(frame);
            }
        }
    }

    pub(crate) fn push(&self, frame: &Frame) {
        self.push_text(&frame.to_json().expect("encode frame"));
    }

    pub(crate) fn push_text(&self, text: &str) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.unbounded_send(Ok(text.to_owned()));
        }
    }

    pub(crate) fn fail(&self, err: TransportError) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.unbounded_send(Err(err));
        }
    }

    /// Close the socket from the server side.
    pub(crate) fn hang_up(&mut self) { self.inbound = None; }
}

/// Create a connected socket pair.
pub(crate) fn socket_pair() -> (Socket, Peer) {
    let (out_tx, out_rx) = mpsc::unbounded::<String>();
    let (in_tx, in_rx) = mpsc::unbounded::<Result<String, TransportError>>();
    let socket = Socket::new(out_tx.sink_map_err(|_| TransportError::Closed), in_rx);
    let peer = Peer {
        written: out_rx,
        inbound: Some(in_tx),
    };
    (socket, peer)
}

/// Transport handing out pre-built sockets in order. Fails once exhausted.
#[derive(Default)]
pub(crate) struct QueuedTransport {
    sockets: Mutex<VecDeque<Socket>>,
}

impl QueuedTransport {
    pub(crate) fn with_peer() -> (Arc<Self>, Peer) {
        let (transport, peer) = Self::single();
        (Arc::new(transport), peer)
    }

    /// Transport holding exactly one socket.
    pub(crate) fn single() -> (Self, Peer) {
        let (socket, peer) = socket_pair();
        let transport = Self::default();
        transport
            .sockets
            .lock()
            .expect("transport lock")
            .push_back(socket);
        (transport, peer)
    }
}

#[async_trait]
impl Transport for QueuedTransport {
    async fn open(&self, _endpoint: &str) -> Result<Socket, TransportError> {
        self.sockets
            .lock()
            .expect("transport lock")
            .pop_front()
            .ok_or(TransportError::Closed)
    }
}

/// Transport whose handshake never completes.
pub(crate) struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn open(&self, _endpoint: &str) -> Result<Socket, TransportError> {
        futures::future::pending().await
    }
}
