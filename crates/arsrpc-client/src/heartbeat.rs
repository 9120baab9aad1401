use std::sync::Weak;
use std::time::Duration;

use arsrpc_common::{heartbeat_token, ArsrpcError};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::Connection;

/// Keeps one connection's liveness flag current.
///
/// Every `interval` the supervisor sends a heartbeat. A failed or mismatched
/// heartbeat is logged and followed by one attempt to re-establish the
/// session; nothing is escalated to callers. The loop ends when the
/// connection is closed or dropped.
pub struct HeartbeatSupervisor {
    connection: Weak<Connection>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl HeartbeatSupervisor {
    /// Creates a supervisor for `connection`.
    ///
    /// # Arguments
    /// * `connection` - The supervised connection; the loop holds no strong reference
    /// * `interval` - Time between heartbeats
    /// * `shutdown` - Cancelled when the connection closes
    pub fn new(connection: Weak<Connection>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            connection,
            interval,
            shutdown,
        }
    }

    /// Starts the supervisor task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Main heartbeat loop
    async fn run(self) {
        // The connection was just confirmed, so the first probe waits a full interval
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(connection) = self.connection.upgrade() else {
                break;
            };
            if connection.is_closed() {
                break;
            }
            Self::probe(&connection).await;
        }

        debug!("Heartbeat supervisor stopped");
    }

    /// Runs one heartbeat against `connection`, reconnecting on failure.
    ///
    /// Returns whether the connection is live afterwards.
    pub async fn probe(connection: &Connection) -> bool {
        let token = heartbeat_token();
        let failure = match connection.heartbeat(token).await {
            Ok(echoed) if echoed == token => return true,
            Ok(echoed) => ArsrpcError::HeartbeatMismatch {
                sent: token,
                received: echoed,
            },
            Err(_) if connection.is_closed() => return false,
            Err(e) => e,
        };

        warn!(
            id = connection.id(),
            addr = %connection.addr(),
            error = %failure,
            "Heartbeat failed, re-establishing session"
        );

        match connection.reconnect().await {
            Ok(()) => {
                info!(id = connection.id(), addr = %connection.addr(), "Session re-established");
                true
            }
            Err(e) => {
                warn!(id = connection.id(), addr = %connection.addr(), error = %e, "Reconnect failed");
                false
            }
        }
    }
}
