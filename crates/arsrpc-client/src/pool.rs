use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arsrpc_common::transport::{Connector, TcpConnector};
use arsrpc_common::{ArsrpcError, Request, Response, Result};
use crossbeam_queue::ArrayQueue;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::PoolConfig;
use crate::connection::{Connection, ConnectionId};

/// Pool-side bookkeeping for one connection.
///
/// The in-flight counter is exactly the number of leases currently holding
/// the connection, each carrying at most one request. A retired record
/// belongs to a connection that has left circulation and is closed by
/// whoever sees the counter reach zero.
#[derive(Debug)]
pub struct ConnectionRecord {
    id: ConnectionId,
    in_flight: AtomicUsize,
    retired: AtomicBool,
}

impl ConnectionRecord {
    fn new(id: ConnectionId) -> Self {
        Self {
            id,
            in_flight: AtomicUsize::new(0),
            retired: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Leases currently counted against the connection.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    fn track(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight {
            record: Arc::clone(self),
            finished: false,
        }
    }

    /// Counts one more lease if the connection is below `cap`. The check and
    /// the increment are a single atomic step.
    fn try_track(self: &Arc<Self>, cap: usize) -> Option<InFlight> {
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < cap).then_some(n + 1)
            })
            .ok()?;
        Some(InFlight {
            record: Arc::clone(self),
            finished: false,
        })
    }
}

/// Counts one lease against a record until finished or dropped, so an
/// abandoned lease cannot leave the counter raised.
#[derive(Debug)]
struct InFlight {
    record: Arc<ConnectionRecord>,
    finished: bool,
}

impl InFlight {
    /// Ends the request and returns the requests still in flight.
    fn finish(mut self) -> usize {
        self.finished = true;
        self.record.in_flight.fetch_sub(1, Ordering::SeqCst) - 1
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            self.record.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Temporary custody of a pooled connection.
///
/// A lease counts against the connection's concurrency cap from the moment
/// it is granted until it is passed to [`ClientPool::finish`] or dropped,
/// and a retired connection stays open while any lease on it is held.
///
/// With `must_return` unset the connection also stayed parked and may be
/// shared with other callers; otherwise the caller holds it exclusively and
/// [`ClientPool::finish`] hands it back.
#[derive(Debug)]
pub struct Lease {
    connection: Arc<Connection>,
    record: Arc<ConnectionRecord>,
    must_return: bool,
    in_flight: InFlight,
}

impl Lease {
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn record(&self) -> &Arc<ConnectionRecord> {
        &self.record
    }

    pub fn must_return(&self) -> bool {
        self.must_return
    }
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolStats {
    pub address: String,
    /// Connections parked for immediate reuse
    pub parked: usize,
    /// Open connections tracked by the pool, parked or checked out
    pub connections: usize,
    /// Requests in flight across all connections
    pub in_flight: usize,
    /// Highest in-flight count on a single connection
    pub busiest: usize,
}

/// Connection lease pool for one address.
///
/// The pool keeps up to `min_connections` connections parked in a bounded
/// queue and lets any number of callers share them, each connection taking
/// at most `max_concurrent` requests at a time. Leasing never blocks:
///
/// 1. Pop a parked connection and count the lease against it, then try to
///    park it again. If that succeeds the lease is shared; if the queue
///    filled up meanwhile the caller holds it exclusively. An empty queue
///    means a new connection.
/// 2. If the connection is at its cap, hand it back and try again. A
///    saturated connection seen twice in one attempt, or running out of
///    attempts, forces a new overflow connection.
///
/// Without a heartbeat supervisor nothing else repairs a broken link, so a
/// connection that is no longer usable is retired instead of being parked
/// or leased again.
///
/// Overflow connections are parked on return only if there is room and are
/// closed otherwise, so the pool shrinks back to its warm size once load
/// drops.
///
/// # Example
///
/// ```rust,no_run
/// use arsrpc_client::{ClientPool, PoolConfig};
///
/// # #[tokio::main]
/// # async fn main() -> arsrpc_common::Result<()> {
/// let pool = ClientPool::new(PoolConfig::new("127.0.0.1:9000")).await;
///
/// let lease = pool.lease().await?;
/// // Use lease.connection()...
/// pool.finish(lease).await;
/// # Ok(())
/// # }
/// ```
pub struct ClientPool {
    config: PoolConfig,
    connector: Arc<dyn Connector>,
    parked: ArrayQueue<Arc<Connection>>,
    records: DashMap<ConnectionId, Arc<ConnectionRecord>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl ClientPool {
    /// Creates a pool over the TCP transport and warms it up.
    pub async fn new(config: PoolConfig) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector::new())).await
    }

    /// Creates a pool over `connector` and warms it up.
    ///
    /// Warm connections that fail to connect are logged and skipped; the
    /// pool then creates connections on demand.
    pub async fn with_connector(config: PoolConfig, connector: Arc<dyn Connector>) -> Self {
        let config = config.normalized();
        info!(
            addr = %config.address,
            min_connections = config.min_connections,
            max_concurrent = config.max_concurrent,
            "Creating connection pool"
        );

        let pool = Self {
            parked: ArrayQueue::new(config.min_connections),
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            connector,
            config,
        };

        for _ in 0..pool.config.min_connections {
            match pool.create().await {
                Ok((connection, _)) => {
                    if let Err(connection) = pool.parked.push(connection) {
                        pool.discard(&connection).await;
                    }
                }
                Err(e) => {
                    warn!(addr = %pool.config.address, error = %e, "Failed to warm up connection");
                }
            }
        }

        pool
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Leases a connection under the per-connection concurrency cap.
    ///
    /// The lease already counts against the cap when it is returned; pass it
    /// to [`finish`](Self::finish) when done.
    ///
    /// # Errors
    ///
    /// - [`ArsrpcError::PoolClosed`] after [`shutdown`](Self::shutdown)
    /// - the connect error when a new connection cannot be established
    pub async fn lease(&self) -> Result<Lease> {
        let mut seen: HashSet<ConnectionId> = HashSet::new();

        for _ in 0..self.config.max_lease_attempts {
            if self.is_closed() {
                return Err(ArsrpcError::PoolClosed);
            }

            let Some(connection) = self.parked.pop() else {
                return self.lease_new().await;
            };
            if connection.is_closed() {
                self.records.remove(&connection.id());
                continue;
            }
            if self.is_broken(&connection).await {
                debug!(id = connection.id(), addr = %self.config.address, "Evicting broken connection");
                self.retire(connection).await;
                continue;
            }

            // Counted while out of the queue, so nobody can retire it unseen
            let record = self.record_for(&connection);
            if let Some(in_flight) = record.try_track(self.config.max_concurrent) {
                let must_return = self.parked.push(Arc::clone(&connection)).is_err();
                return Ok(Lease {
                    connection,
                    record,
                    must_return,
                    in_flight,
                });
            }

            let first_sighting = seen.insert(connection.id());
            self.release(connection).await;
            if !first_sighting {
                trace!(addr = %self.config.address, "Parked connections saturated, adding overflow connection");
                return self.lease_new().await;
            }
        }

        debug!(addr = %self.config.address, "Lease attempts exhausted, adding overflow connection");
        self.lease_new().await
    }

    /// Hands a connection back to the pool.
    ///
    /// The connection is parked if there is room and retired otherwise; a
    /// retired connection is closed as soon as no lease holds it.
    pub async fn release(&self, connection: Arc<Connection>) {
        if connection.is_closed() {
            self.records.remove(&connection.id());
            return;
        }
        if self.is_closed() || self.is_broken(&connection).await {
            self.retire(connection).await;
            return;
        }

        match self.parked.push(connection) {
            Ok(()) => {
                // shutdown() may have drained the queue before the push landed
                if self.is_closed() {
                    self.drain().await;
                }
            }
            Err(connection) => {
                trace!(id = connection.id(), "Parked queue full, retiring connection");
                self.retire(connection).await;
            }
        }
    }

    /// Ends a lease.
    ///
    /// An exclusive connection is handed back through
    /// [`release`](Self::release). A shared one that was retired while
    /// leased is closed if this was its last lease.
    pub async fn finish(&self, lease: Lease) {
        let Lease {
            connection,
            record,
            must_return,
            in_flight,
        } = lease;
        let remaining = in_flight.finish();

        if must_return {
            self.release(connection).await;
        } else if remaining == 0 && record.is_retired() {
            self.discard(&connection).await;
        }
    }

    /// Sends one request through a leased connection.
    ///
    /// Failures are returned as-is and never retried here.
    pub async fn request(&self, session: &str, service: &str, input: &str) -> Result<Response> {
        let lease = self.lease().await?;
        let result = lease
            .connection
            .request(&Request::new(session, service, input))
            .await;
        self.finish(lease).await;
        result
    }

    /// Stops leasing and closes every parked connection.
    ///
    /// Requests already running are not cancelled; connections they use are
    /// closed once they finish.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(addr = %self.config.address, "Shutting down connection pool");
        self.drain().await;
    }

    pub fn stats(&self) -> PoolStats {
        let (in_flight, busiest) = self
            .records
            .iter()
            .map(|record| record.in_flight())
            .fold((0, 0), |(sum, max), n| (sum + n, max.max(n)));

        PoolStats {
            address: self.config.address.clone(),
            parked: self.parked.len(),
            connections: self.records.len(),
            in_flight,
            busiest,
        }
    }

    async fn lease_new(&self) -> Result<Lease> {
        let (connection, record) = self.create().await?;
        let in_flight = record.track();
        Ok(Lease {
            connection,
            record,
            must_return: true,
            in_flight,
        })
    }

    /// A connection whose link failed, when no supervisor will repair it.
    async fn is_broken(&self, connection: &Connection) -> bool {
        !self.config.heartbeat && !connection.is_usable().await
    }

    async fn create(&self) -> Result<(Arc<Connection>, Arc<ConnectionRecord>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = Arc::new(Connection::new(
            id,
            self.config.address.clone(),
            self.config.connection_config(),
            Arc::clone(&self.connector),
        ));

        if let Err(e) = connection.connect().await {
            connection.close().await;
            return Err(e);
        }
        if self.is_closed() {
            connection.close().await;
            return Err(ArsrpcError::PoolClosed);
        }

        let record = Arc::new(ConnectionRecord::new(id));
        self.records.insert(id, Arc::clone(&record));
        debug!(id, addr = %self.config.address, "Created connection");
        Ok((connection, record))
    }

    fn record_for(&self, connection: &Connection) -> Arc<ConnectionRecord> {
        let id = connection.id();
        Arc::clone(
            self.records
                .entry(id)
                .or_insert_with(|| Arc::new(ConnectionRecord::new(id)))
                .value(),
        )
    }

    async fn retire(&self, connection: Arc<Connection>) {
        let record = self
            .records
            .get(&connection.id())
            .map(|record| Arc::clone(record.value()));

        match record {
            Some(record) => {
                record.retired.store(true, Ordering::SeqCst);
                if record.in_flight() == 0 {
                    self.discard(&connection).await;
                }
            }
            None => self.discard(&connection).await,
        }
    }

    async fn discard(&self, connection: &Connection) {
        self.records.remove(&connection.id());
        connection.close().await;
    }

    async fn drain(&self) {
        while let Some(connection) = self.parked.pop() {
            self.retire(connection).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnector, MockState};
    use std::time::Duration;

    async fn pool_with(config: PoolConfig) -> (Arc<ClientPool>, Arc<MockState>) {
        let connector = MockConnector::new();
        let state = connector.state();
        let pool = ClientPool::with_connector(config, connector.shared()).await;
        (Arc::new(pool), state)
    }

    #[tokio::test]
    async fn test_pool_warms_up_min_connections() {
        let (pool, state) = pool_with(PoolConfig::new("a:1").with_min_connections(3)).await;

        let stats = pool.stats();
        assert_eq!(stats.parked, 3);
        assert_eq!(stats.connections, 3);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(state.opened.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_pool_survives_failed_warm_up() {
        let connector = MockConnector::new();
        let state = connector.state();
        state.fail_connect.store(true, Ordering::SeqCst);
        let pool = ClientPool::with_connector(PoolConfig::new("a:1"), connector.shared()).await;
        assert_eq!(pool.stats().parked, 0);

        // Lease surfaces the connect failure, then recovers once the endpoint is back
        assert!(matches!(pool.lease().await, Err(ArsrpcError::Connection(_))));
        state.fail_connect.store(false, Ordering::SeqCst);
        let response = pool.request("s", "svc", "x").await.unwrap();
        assert_eq!(response.result, "svc:x");
    }

    #[tokio::test]
    async fn test_lease_shares_parked_connection() {
        let (pool, _) = pool_with(PoolConfig::new("a:1")).await;

        let first = pool.lease().await.unwrap();
        let second = pool.lease().await.unwrap();

        assert!(!first.must_return());
        assert!(!second.must_return());
        assert_eq!(first.connection().id(), second.connection().id());
        assert_eq!(pool.stats().parked, 1);
    }

    #[tokio::test]
    async fn test_lease_on_empty_queue_creates_exclusive_connection() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        // Take the only parked connection out of circulation
        let parked = pool.parked.pop().unwrap();

        let lease = pool.lease().await.unwrap();

        assert!(lease.must_return());
        assert_ne!(lease.connection().id(), parked.id());
        assert_eq!(state.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lease_saturated_connection_forces_overflow() {
        let (pool, _) = pool_with(PoolConfig::new("a:1").with_max_concurrent(1)).await;

        let first = pool.lease().await.unwrap();
        assert_eq!(first.record().in_flight(), 1);

        let second = pool.lease().await.unwrap();
        assert!(second.must_return());
        assert_ne!(second.connection().id(), first.connection().id());
        assert_eq!(second.record().in_flight(), 1);
        assert_eq!(first.record().in_flight(), 1);
    }

    #[tokio::test]
    async fn test_lease_attempts_are_bounded() {
        let (pool, _) = pool_with(
            PoolConfig::new("a:1")
                .with_max_concurrent(1)
                .with_max_lease_attempts(1),
        )
        .await;

        let first = pool.lease().await.unwrap();

        // A single attempt sees the saturated connection once and gives up on it
        let second = pool.lease().await.unwrap();
        assert!(second.must_return());
        assert_ne!(second.connection().id(), first.connection().id());
    }

    #[tokio::test]
    async fn test_release_into_full_queue_closes_connection() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        let parked = pool.parked.pop().unwrap();
        let overflow = pool.lease().await.unwrap();
        pool.release(parked).await;

        // The queue is full again, so the overflow connection must be closed
        let connection = Arc::clone(overflow.connection());
        pool.finish(overflow).await;

        assert!(connection.is_closed());
        assert_eq!(state.closed.load(Ordering::SeqCst), 1);
        assert_eq!(state.open_sessions(), 1);
        assert_eq!(pool.stats().connections, 1);
    }

    #[tokio::test]
    async fn test_release_parks_when_room() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        let parked = pool.parked.pop().unwrap();

        pool.release(parked).await;

        assert_eq!(pool.stats().parked, 1);
        assert_eq!(state.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lease_counts_until_finished_or_dropped() {
        let (pool, _) = pool_with(PoolConfig::new("a:1")).await;

        let first = pool.lease().await.unwrap();
        let second = pool.lease().await.unwrap();
        assert_eq!(first.record().in_flight(), 2);

        pool.finish(first).await;
        assert_eq!(second.record().in_flight(), 1);
        drop(second);
        assert_eq!(pool.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_retired_connection_closes_after_last_lease() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        let shared = pool.lease().await.unwrap();
        assert!(!shared.must_return());
        let connection = Arc::clone(shared.connection());

        // Retire the shared connection before its holder sends anything
        let parked = pool.parked.pop().unwrap();
        let other = pool.lease().await.unwrap();
        pool.finish(other).await;
        pool.release(parked).await;
        assert!(shared.record().is_retired());
        assert!(!connection.is_closed());

        let response = connection
            .request(&Request::new("s", "svc", "late"))
            .await
            .unwrap();
        assert_eq!(response.result, "svc:late");

        pool.finish(shared).await;
        assert!(connection.is_closed());
        assert_eq!(state.closed.load(Ordering::SeqCst), 1);
        assert_eq!(state.open_sessions(), 1);
        assert_eq!(pool.stats().connections, 1);
    }

    #[tokio::test]
    async fn test_broken_connection_is_evicted() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        pool.request("s", "svc", "1").await.unwrap();

        state.break_open_sessions();
        assert!(pool.request("s", "svc", "2").await.is_err());

        let response = pool.request("s", "svc", "3").await.unwrap();
        assert_eq!(response.result, "svc:3");
        assert_eq!(state.opened.load(Ordering::SeqCst), 2);
        assert_eq!(state.closed.load(Ordering::SeqCst), 1);
        let stats = pool.stats();
        assert_eq!(stats.connections, 1);
        assert_eq!(stats.parked, 1);
    }

    #[tokio::test]
    async fn test_supervised_connection_is_kept_when_broken() {
        let (pool, state) = pool_with(
            PoolConfig::new("a:1")
                .with_heartbeat(true)
                .with_heartbeat_interval(Duration::from_secs(60)),
        )
        .await;

        state.break_open_sessions();
        assert!(pool.request("s", "svc", "x").await.is_err());
        assert!(pool.request("s", "svc", "y").await.is_err());

        // Repair is left to the supervisor
        assert_eq!(state.opened.load(Ordering::SeqCst), 1);
        assert_eq!(state.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;

        let response = pool.request("s-1", "order.query", "7").await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.result, "order.query:7");
        assert_eq!(state.requests.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_request_failure_releases_counter() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        state.fail_requests.store(true, Ordering::SeqCst);

        let result = pool.request("s", "svc", "x").await;

        assert!(result.is_err());
        assert_eq!(pool.stats().in_flight, 0);
        // The failing connection stays pooled, only suspect
        assert_eq!(pool.stats().parked, 1);
    }

    #[tokio::test]
    async fn test_abandoned_request_releases_counter() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        state.latency_ms.store(1_000, Ordering::SeqCst);

        let result =
            tokio::time::timeout(Duration::from_millis(20), pool.request("s", "svc", "x")).await;

        assert!(result.is_err());
        assert_eq!(pool.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_parked_connections_once() {
        let (pool, state) = pool_with(PoolConfig::new("a:1").with_min_connections(4)).await;

        pool.shutdown().await;
        pool.shutdown().await;

        assert!(pool.is_closed());
        assert_eq!(state.closed.load(Ordering::SeqCst), 4);
        assert_eq!(state.open_sessions(), 0);
        assert_eq!(pool.stats().parked, 0);
        assert_eq!(pool.stats().connections, 0);
        assert!(matches!(pool.lease().await, Err(ArsrpcError::PoolClosed)));
        assert!(matches!(
            pool.request("s", "svc", "x").await,
            Err(ArsrpcError::PoolClosed)
        ));
    }

    #[tokio::test]
    async fn test_release_after_shutdown_closes() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        let parked = pool.parked.pop().unwrap();
        let exclusive = pool.lease().await.unwrap();
        pool.release(parked).await;

        pool.shutdown().await;
        pool.finish(exclusive).await;

        assert_eq!(state.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_requests() {
        let (pool, state) = pool_with(PoolConfig::new("a:1")).await;
        state.latency_ms.store(50, Ordering::SeqCst);

        let worker = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.request("s", "svc", "slow").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        pool.shutdown().await;
        assert_eq!(state.closed.load(Ordering::SeqCst), 0);

        let response = worker.await.unwrap().unwrap();
        assert_eq!(response.result, "svc:slow");
        assert_eq!(state.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_requests_respect_cap() {
        let (pool, state) = pool_with(
            PoolConfig::new("a:1")
                .with_min_connections(1)
                .with_max_concurrent(100),
        )
        .await;
        state.latency_ms.store(1, Ordering::SeqCst);

        let tasks: Vec<_> = (0..10_000)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    let input = i.to_string();
                    pool.request("s", "svc", &input).await
                })
            })
            .collect();

        for (i, result) in futures::future::join_all(tasks).await.into_iter().enumerate() {
            let response = result.unwrap().unwrap();
            assert_eq!(response.result, format!("svc:{}", i));
        }

        let stats = pool.stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.busiest, 0);
        assert_eq!(state.requests.load(Ordering::SeqCst), 10_000);
        let peak = state.peak_per_session.load(Ordering::SeqCst);
        assert!(peak > 1, "requests never shared a connection");
        assert!(peak <= 100, "a session carried {} requests at once", peak);
        // Overflow connections were closed on return; only tracked ones stay open
        assert_eq!(state.open_sessions(), stats.connections);
        assert_eq!(stats.connections, stats.parked);
    }

    #[test]
    fn test_pool_stats_serialize() {
        let stats = PoolStats {
            address: "a:1".to_string(),
            parked: 1,
            connections: 2,
            in_flight: 3,
            busiest: 3,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["address"], "a:1");
        assert_eq!(json["in_flight"], 3);
    }
}
