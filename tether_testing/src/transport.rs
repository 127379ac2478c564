//! Mock transport whose sockets are driven by the test.

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, channel::mpsc as fmpsc};
use tether::{
    Frame,
    frame::kind,
    transport::{Socket, Transport, TransportError},
};
use tokio::sync::mpsc;

#[derive(Default)]
struct Script {
    failures: usize,
}

/// [`Transport`] producing in-memory sockets.
///
/// Each successful `open` publishes the server end of the new socket to the
/// paired [`MockServer`].
#[derive(Clone)]
pub struct MockTransport {
    accepted: mpsc::UnboundedSender<MockPeer>,
    script: Arc<Mutex<Script>>,
    opened: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Create a transport and the server that receives its sockets.
    #[must_use]
    pub fn new() -> (Self, MockServer) {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let transport = Self {
            accepted: accepted_tx,
            script: Arc::default(),
            opened: Arc::default(),
        };
        (transport, MockServer { accepted: accepted_rx })
    }

    /// Make the next `count` handshakes fail.
    pub fn fail_next(&self, count: usize) {
        self.script.lock().expect("script lock").failures += count;
    }

    /// Number of `open` calls so far, failed or not.
    #[must_use]
    pub fn opened(&self) -> usize { self.opened.load(Ordering::SeqCst) }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, endpoint: &str) -> Result<Socket, TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        {
            let mut script = self.script.lock().expect("script lock");
            if script.failures > 0 {
                script.failures -= 1;
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    format!("refused {endpoint}"),
                )));
            }
        }

        let (out_tx, out_rx) = fmpsc::unbounded::<String>();
        let (in_tx, in_rx) = fmpsc::unbounded::<Result<String, TransportError>>();
        let peer = MockPeer {
            endpoint: endpoint.to_owned(),
            written: out_rx,
            inbound: Some(in_tx),
        };
        self.accepted
            .send(peer)
            .map_err(|_| TransportError::Closed)?;
        Ok(Socket::new(
            out_tx.sink_map_err(|_| TransportError::Closed),
            in_rx,
        ))
    }
}

/// Receives the server ends of sockets opened through a [`MockTransport`].
pub struct MockServer {
    accepted: mpsc::UnboundedReceiver<MockPeer>,
}

impl MockServer {
    /// Wait for the next socket.
    ///
    /// # Panics
    ///
    /// Panics if every [`MockTransport`] clone has been dropped.
    pub async fn accept(&mut self) -> MockPeer {
        self.accepted.recv().await.expect("mock transport dropped")
    }

    /// Take an already opened socket without waiting.
    pub fn try_accept(&mut self) -> Option<MockPeer> { self.accepted.try_recv().ok() }
}

/// Server end of one in-memory socket.
pub struct MockPeer {
    endpoint: String,
    written: fmpsc::UnboundedReceiver<String>,
    inbound: Option<fmpsc::UnboundedSender<Result<String, TransportError>>>,
}

impl MockPeer {
    /// Endpoint the client opened this socket for.
    #[must_use]
    pub fn endpoint(&self) -> &str { &self.endpoint }

    /// Next frame written by the client, or `None` once the client closed
    /// its end.
    ///
    /// # Panics
    ///
    /// Panics if the client wrote invalid JSON.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        let text = self.written.next().await?;
        Some(Frame::from_json(&text).expect("client wrote a valid frame"))
    }

    /// Next frame other than a heartbeat.
    pub async fn recv_call(&mut self) -> Option<Frame> {
        loop {
            let frame = self.recv_frame().await?;
            if frame.kind() != kind::PING {
                return Some(frame);
            }
        }
    }

    /// Wait until the client closes its end, discarding anything it writes.
    pub async fn closed(&mut self) { while self.written.next().await.is_some() {} }

    /// Push a frame to the client.
    ///
    /// # Panics
    ///
    /// Panics if the frame cannot be encoded.
    pub fn push(&self, frame: &Frame) { self.push_text(&frame.to_json().expect("encode frame")); }

    /// Push raw text to the client.
    pub fn push_text(&self, text: &str) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.unbounded_send(Ok(text.to_owned()));
        }
    }

    /// Report a read failure to the client.
    pub fn fail(&self, err: TransportError) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.unbounded_send(Err(err));
        }
    }

    /// Close the socket from the server side.
    pub fn close(&mut self) { self.inbound = None; }
}

/// Build the reply to `call`, echoing its `call_id`.
#[must_use]
pub fn reply_to(call: &Frame) -> Frame {
    let reply = Frame::new(kind::REPLY);
    match call.call_id() {
        Some(call_id) => reply.with_call_id(call_id),
        None => reply,
    }
}
