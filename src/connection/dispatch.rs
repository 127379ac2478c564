//! Inbound frame classification for the socket task.

use tracing::{trace, warn};

use super::{ConnectionError, ConnectionEvent, actor::SocketActor};
use crate::{
    correlation::Resolution,
    frame::{Frame, Inbound},
    metrics::Direction,
};

impl SocketActor {
    /// Route one inbound text message.
    ///
    /// Control noise is dropped, replies resolve their pending call and
    /// everything else is forwarded as [`ConnectionEvent::Message`].
    pub(super) fn dispatch(&self, text: &str) {
        crate::metrics::inc_frames(Direction::Inbound);
        let frame = match Frame::from_json(text) {
            Ok(frame) => frame,
            Err(source) => {
                warn!(error = %source, "undecodable frame dropped");
                self.emit(ConnectionEvent::Error(ConnectionError::Decode {
                    source,
                    text: text.to_owned(),
                }));
                return;
            }
        };

        match frame.classify() {
            Inbound::Noise => trace!(kind = frame.kind(), "control frame dropped"),
            Inbound::Reply(call_id) => {
                if self.pending.resolve(frame) == Resolution::Unknown {
                    warn!(?call_id, "reply for unknown call id dropped");
                    crate::metrics::inc_protocol_warnings();
                }
            }
            Inbound::Event => self.emit(ConnectionEvent::Message(frame)),
        }
    }
}
