//! arsrpc Client
//!
//! Client-side access layer for a remote request-processing service.
//!
//! - [`Connection`]: one transport session to one address, with a liveness
//!   flag kept current by requests and heartbeats
//! - [`HeartbeatSupervisor`]: background loop that probes a connection and
//!   re-establishes its session after a failed probe
//! - [`ClientPool`]: bounded set of warm connections to one address, shared
//!   by any number of callers under a per-connection concurrency cap, growing
//!   with overflow connections under load
//!
//! # Example
//!
//! ```no_run
//! use arsrpc_client::{ClientPool, PoolConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> arsrpc_common::Result<()> {
//! let config = PoolConfig::new("127.0.0.1:9000")
//!     .with_min_connections(2)
//!     .with_max_concurrent(100)
//!     .with_heartbeat(true);
//! let pool = ClientPool::new(config).await;
//!
//! let response = pool.request("s-1", "order.query", "{\"id\":7}").await?;
//! println!("{} {}", response.status, response.result);
//!
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod heartbeat;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConnectionConfig, PoolConfig};
pub use connection::{Connection, ConnectionId};
pub use heartbeat::HeartbeatSupervisor;
pub use pool::{ClientPool, ConnectionRecord, Lease, PoolStats};
