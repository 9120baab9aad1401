//! arsrpc Common Types and Transport
//!
//! This crate provides the protocol definitions, error taxonomy and the
//! transport seam shared by the arsrpc client components.
//!
//! # Overview
//!
//! The client talks to a remote request-processing service. Every call
//! carries a session identifier, a logical service name and an opaque input
//! string, and is answered with an integer status and a result string.
//! Connections are probed with heartbeats that echo an integer token.
//!
//! - **Protocol Layer**: [`Request`], [`Response`], heartbeat tokens and the
//!   framed [`Envelope`] used on the wire
//! - **Transport Layer**: the [`Connector`](transport::Connector) /
//!   [`Session`](transport::Session) traits and the default TCP transport
//!
//! # Wire Format
//!
//! - **Transport**: TCP, one session per connection, exchanges serialised
//! - **Serialization**: JSON
//! - **Frame Format**: `[4-byte length prefix as u32 big-endian] + [JSON envelope]`
//! - **Max Frame Size**: 100 MB
//!
//! # Example
//!
//! ```no_run
//! use arsrpc_common::transport::{Connector, Session, TcpConnector};
//! use arsrpc_common::Request;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> arsrpc_common::Result<()> {
//! let connector = TcpConnector::new();
//! let session = connector.connect("127.0.0.1:9000", Duration::from_secs(3)).await?;
//!
//! let response = session.request(&Request::new("s-1", "order.query", "{}")).await?;
//! println!("{} {}", response.status, response.result);
//! # Ok(())
//! # }
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
