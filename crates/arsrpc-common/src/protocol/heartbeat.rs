use std::time::SystemTime;

/// Token carried by a heartbeat; the remote endpoint must echo it back.
pub type HeartbeatToken = i64;

/// Generates a heartbeat token from the current time.
///
/// Only echo equality is checked, so overlapping ticks may share a token.
pub fn heartbeat_token() -> HeartbeatToken {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as HeartbeatToken)
        .unwrap_or(1)
}
