//! JSON frames exchanged over the socket.
//!
//! Every frame is a JSON object tagged with a `type` discriminator. Calls
//! additionally carry a `call_id` that the peer echoes back in its reply.
//! All other fields are preserved verbatim so events reach the caller
//! untouched. A `call_id` that is not an unsigned integer is not a
//! correlation id; it stays among the other fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Well-known values of the `type` discriminator.
pub mod kind {
    /// Heartbeat sent by the client.
    pub const PING: &str = "ping";
    /// Heartbeat response sent by the server.
    pub const PONG: &str = "pong";
    /// Legacy acknowledgement kept for backward compatibility.
    pub const OK: &str = "ok";
    /// Reply to a correlated call.
    pub const REPLY: &str = "reply";
    /// Peer-to-peer message push.
    pub const MESSAGE: &str = "message";
    /// Group broadcast message push.
    pub const CHANNEL_MESSAGE: &str = "channel_message";
}

/// One structured message unit exchanged over the transport.
///
/// # Examples
///
/// ```
/// use tether::Frame;
///
/// let frame = Frame::new("message").with_field("text", "hello");
/// let json = frame.to_json().expect("encode frame");
/// let decoded = Frame::from_json(&json).expect("decode frame");
/// assert_eq!(decoded.field("text").and_then(|v| v.as_str()), Some("hello"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    call_id: Option<u64>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

const TYPE_KEY: &str = "type";
const CALL_ID_KEY: &str = "call_id";

impl TryFrom<Map<String, Value>> for Frame {
    type Error = &'static str;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let kind = match fields.remove(TYPE_KEY) {
            Some(Value::String(kind)) => kind,
            _ => return Err("frame has no string `type` field"),
        };
        let call_id = fields.get(CALL_ID_KEY).and_then(Value::as_u64);
        if call_id.is_some() {
            fields.remove(CALL_ID_KEY);
        }
        Ok(Self {
            kind,
            call_id,
            fields,
        })
    }
}

/// Routing decision for an inbound frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Heartbeat responses and legacy acknowledgements; dropped.
    Noise,
    /// Reply to an outstanding call, keyed by its echoed `call_id`.
    Reply(Option<u64>),
    /// Anything else; forwarded to the caller as an unsolicited event.
    Event,
}

impl Frame {
    /// Create a frame with the given `type` and no other fields.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            call_id: None,
            fields: Map::new(),
        }
    }

    /// Zero-payload heartbeat frame. Never carries a correlation id.
    #[must_use]
    pub fn heartbeat() -> Self { Self::new(kind::PING) }

    /// Set an explicit correlation id.
    #[must_use]
    pub fn with_call_id(mut self, call_id: u64) -> Self {
        self.set_call_id(Some(call_id));
        self
    }

    /// Attach an additional field.
    ///
    /// `type` and `call_id` are owned by [`Frame::new`] and
    /// [`Frame::with_call_id`]; values for those keys are ignored.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key == TYPE_KEY || key == CALL_ID_KEY {
            warn!(%key, "reserved frame key ignored");
            return self;
        }
        self.fields.insert(key, value.into());
        self
    }

    /// The `type` discriminator.
    #[must_use]
    pub fn kind(&self) -> &str { &self.kind }

    /// The `call_id`, if present.
    #[must_use]
    pub fn call_id(&self) -> Option<u64> { self.call_id }

    pub(crate) fn set_call_id(&mut self, call_id: Option<u64>) {
        if call_id.is_some() {
            self.fields.remove(CALL_ID_KEY);
        }
        self.call_id = call_id;
    }

    /// Look up a field other than `type` and a numeric `call_id`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> { self.fields.get(key) }

    /// All fields other than `type` and a numeric `call_id`.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> { &self.fields }

    /// Decide how an inbound frame is routed.
    #[must_use]
    pub fn classify(&self) -> Inbound {
        match self.kind.as_str() {
            kind::PONG | kind::OK => Inbound::Noise,
            kind::REPLY => Inbound::Reply(self.call_id),
            _ => Inbound::Event,
        }
    }

    /// Serialize to JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if a field value cannot be encoded.
    pub fn to_json(&self) -> Result<String, serde_json::Error> { serde_json::to_string(self) }

    /// Parse a frame from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if `text` is not a JSON object with a
    /// string `type` field.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(text) }
}
