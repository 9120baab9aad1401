//! arsrpc Transport Layer
//!
//! This module defines the seam between the client and the wire, and the
//! default TCP implementation of it.
//!
//! # Architecture
//!
//! - **[`Connector`]**: establishes a [`Session`] to an address within a timeout
//! - **[`Session`]**: one live link; carries requests and heartbeats
//! - **[`TcpConnector`]** / **[`TcpSession`]**: length-prefixed JSON frames over TCP
//! - **[`JsonCodec`]**: encodes and decodes [`Envelope`](crate::Envelope)s
//!
//! The client crates only ever see the two traits, so tests and alternative
//! transports plug in without touching the pool.

pub mod codec;
pub mod tcp;

pub use codec::JsonCodec;
pub use tcp::{receive_frame, send_frame, TcpConnector, TcpSession, MAX_FRAME_SIZE};

use async_trait::async_trait;
use std::time::Duration;

use crate::protocol::{HeartbeatToken, Request, Response, Result};

/// Establishes transport sessions to a remote endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connects to `addr`, giving up after `timeout`.
    async fn connect(&self, addr: &str, timeout: Duration) -> Result<Box<dyn Session>>;
}

/// One transport-layer link to a remote endpoint.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Sends a request and waits for its response.
    async fn request(&self, request: &Request) -> Result<Response>;

    /// Sends a heartbeat and returns the token echoed by the remote endpoint.
    ///
    /// `timeout` bounds the heartbeat's own round-trip, not the wait for
    /// exchanges already in progress on the link.
    async fn heartbeat(&self, token: HeartbeatToken, timeout: Duration) -> Result<HeartbeatToken>;

    /// Whether the link can still carry exchanges.
    fn is_open(&self) -> bool;

    /// Closes the link. Later calls fail.
    async fn close(&self);
}
