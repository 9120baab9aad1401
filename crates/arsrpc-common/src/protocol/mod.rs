pub mod envelope;
pub mod error;
pub mod heartbeat;
pub mod requests;
pub mod responses;


pub use envelope::{Envelope, FrameId, Message};
pub use error::{ArsrpcError, Result};
pub use heartbeat::{heartbeat_token, HeartbeatToken};
pub use requests::Request;
pub use responses::{Response, Status};
