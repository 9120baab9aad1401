//! arsrpc Response Types

use serde::{Deserialize, Serialize};

/// Status code reported by the remote service.
pub type Status = i32;

/// A response returned by the remote service for one [`Request`](super::Request).
///
/// The status code is service-defined; the client never interprets it.
/// A failed call is reported as an error by the transport instead, in which
/// case no `Response` exists and callers observe the zero values.
///
/// # Example
///
/// ```
/// use arsrpc_common::protocol::responses::Response;
///
/// let response = Response::new(200, "ok");
/// assert_eq!(response.status, 200);
/// assert_eq!(Response::default().result, "");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    /// Service-defined status code
    pub status: Status,
    /// Result payload
    pub result: String,
}

impl Response {
    pub fn new(status: Status, result: impl Into<String>) -> Self {
        Response {
            status,
            result: result.into(),
        }
    }
}
