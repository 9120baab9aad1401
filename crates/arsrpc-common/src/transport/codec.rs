use crate::protocol::error::{ArsrpcError, Result};
use crate::protocol::Envelope;

/// JSON codec for transport frames
///
/// # Example
///
/// ```
/// use arsrpc_common::transport::JsonCodec;
/// use arsrpc_common::{Envelope, Message};
///
/// let envelope = Envelope::new(1, Message::Heartbeat { token: 42 });
/// let encoded = JsonCodec::encode(&envelope).unwrap();
/// let decoded = JsonCodec::decode(&encoded).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
pub struct JsonCodec;

impl JsonCodec {
    /// Encode an envelope to JSON bytes
    pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
        serde_json::to_vec(envelope).map_err(ArsrpcError::from)
    }

    /// Decode an envelope from JSON bytes
    pub fn decode(data: &[u8]) -> Result<Envelope> {
        serde_json::from_slice(data).map_err(ArsrpcError::from)
    }
}
