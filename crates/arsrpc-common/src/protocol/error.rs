use thiserror::Error;

use super::HeartbeatToken;

#[derive(Error, Debug)]
pub enum ArsrpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Heartbeat mismatch: sent {sent}, received {received}")]
    HeartbeatMismatch {
        sent: HeartbeatToken,
        received: HeartbeatToken,
    },

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Watcher is closed")]
    WatcherClosed,

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArsrpcError {
    /// Whether the error came from the link to the remote endpoint rather
    /// than from the remote service or local state.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ArsrpcError::Transport(_)
                | ArsrpcError::Connection(_)
                | ArsrpcError::Timeout(_)
                | ArsrpcError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ArsrpcError>;
