//! Duplex socket abstraction used by [`Connection`](crate::Connection).
//!
//! A [`Transport`] opens a [`Socket`]: a sink of outbound JSON text and a
//! stream of inbound JSON text. [`WebSocketTransport`] is the production
//! implementation; tests substitute in-memory sockets.

use std::{io, pin::Pin};

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

/// Errors raised by a transport or its sockets.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket handshake or protocol failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// Underlying I/O failure.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// The socket was closed while an operation was in flight.
    #[error("socket closed")]
    Closed,
}

/// Outbound half of a [`Socket`].
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a [`Socket`].
pub type FrameSource = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An open socket carrying JSON text frames.
///
/// The source ending (yielding `None`) signals that the peer closed the
/// socket.
pub struct Socket {
    pub(crate) sink: FrameSink,
    pub(crate) source: FrameSource,
}

impl Socket {
    /// Assemble a socket from its two halves.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::{SinkExt, channel::mpsc};
    /// use tether::transport::{Socket, TransportError};
    ///
    /// let (out_tx, _out_rx) = mpsc::unbounded::<String>();
    /// let (_in_tx, in_rx) = mpsc::unbounded::<Result<String, TransportError>>();
    /// let _socket = Socket::new(out_tx.sink_map_err(|_| TransportError::Closed), in_rx);
    /// ```
    pub fn new<Si, St>(sink: Si, source: St) -> Self
    where
        Si: Sink<String, Error = TransportError> + Send + 'static,
        St: Stream<Item = Result<String, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            source: Box::pin(source),
        }
    }
}

/// Opens sockets to resolved endpoints.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a socket to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the socket cannot be established.
    async fn open(&self, endpoint: &str) -> Result<Socket, TransportError>;
}

/// [`Transport`] backed by `tokio-tungstenite`.
///
/// Text messages are passed through; binary messages are accepted when they
/// hold valid UTF-8. Control messages are answered by tungstenite itself and
/// never surface as frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, endpoint: &str) -> Result<Socket, TransportError> {
        let (stream, _response) = connect_async(endpoint).await?;
        debug!(endpoint, "websocket handshake complete");
        let (sink, source) = stream.split();

        let sink = sink.with(|text: String| future::ready(Ok::<_, TransportError>(Message::Text(text))));
        let source = source.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes).ok().map(Ok),
                Ok(_) => None,
                Err(err) => Some(Err(TransportError::from(err))),
            })
        });
        Ok(Socket::new(sink, source))
    }
}
