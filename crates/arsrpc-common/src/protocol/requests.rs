use serde::{Deserialize, Serialize};

/// A logical request addressed to one service of the remote endpoint.
///
/// The session identifier and input are opaque to the client; the remote
/// service interprets them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    pub session: String,
    pub service: String,
    pub input: String,
}

impl Request {
    pub fn new(
        session: impl Into<String>,
        service: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Request {
            session: session.into(),
            service: service.into(),
            input: input.into(),
        }
    }
}
