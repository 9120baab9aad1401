//! Framed messages exchanged on a transport session.
//!
//! Every frame carries an [`Envelope`]: a per-session id used to match a
//! reply to the frame that caused it, and the [`Message`] itself.

use serde::{Deserialize, Serialize};

use super::{HeartbeatToken, Request, Response};

/// Per-session frame identifier.
pub type FrameId = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub id: FrameId,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Request(Request),
    Response(Response),
    Heartbeat { token: HeartbeatToken },
    HeartbeatAck { token: HeartbeatToken },
    /// The remote endpoint failed to process the frame.
    Error { message: String },
}

impl Envelope {
    pub fn new(id: FrameId, message: Message) -> Self {
        Envelope { id, message }
    }

    /// Builds the reply to this envelope, reusing its id.
    pub fn reply(&self, message: Message) -> Self {
        Envelope {
            id: self.id,
            message,
        }
    }
}
