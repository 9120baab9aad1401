use std::time::Duration;

/// Default number of warm connections kept parked
pub const DEFAULT_MIN_CONNECTIONS: usize = 1;
/// Default cap on concurrent requests per connection
pub const DEFAULT_MAX_CONCURRENT: usize = 10_000;
/// Default interval between heartbeats
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
/// Default connection-establishment timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Default timeout for a single heartbeat
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(3);
/// Default bound on lease retries before forcing an overflow connection
pub const DEFAULT_MAX_LEASE_ATTEMPTS: usize = 16;

/// Per-connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Bound on transport session establishment
    pub connect_timeout: Duration,
    /// Whether a heartbeat supervisor runs for the connection
    pub heartbeat: bool,
    /// Interval between heartbeats
    pub heartbeat_interval: Duration,
    /// Bound on a single heartbeat round-trip
    pub heartbeat_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            heartbeat: false,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        }
    }
}

/// Connection pool configuration.
///
/// # Default Configuration
///
/// - `min_connections`: 1
/// - `max_concurrent`: 10000
/// - `heartbeat`: disabled, every 15 seconds when enabled, 3 second timeout
/// - `connect_timeout`: 3 seconds
/// - `max_lease_attempts`: 16
///
/// # Example
///
/// ```rust
/// use arsrpc_client::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new("10.0.0.1:9000")
///     .with_min_connections(4)
///     .with_max_concurrent(100)
///     .with_heartbeat(true)
///     .with_heartbeat_interval(Duration::from_secs(5));
/// assert_eq!(config.min_connections, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Target address of every connection in the pool
    pub address: String,
    /// Warm connections created up front; also the parked queue capacity
    pub min_connections: usize,
    /// Requests allowed in flight on one connection
    pub max_concurrent: usize,
    /// Whether each connection runs a heartbeat supervisor
    pub heartbeat: bool,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub connect_timeout: Duration,
    /// Retries of the lease loop before an overflow connection is forced
    pub max_lease_attempts: usize,
}

impl PoolConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            heartbeat: false,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_lease_attempts: DEFAULT_MAX_LEASE_ATTEMPTS,
        }
    }

    /// Zero is clamped to one: the parked queue needs at least one slot.
    pub fn with_min_connections(mut self, min_connections: usize) -> Self {
        self.min_connections = min_connections.max(1);
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_heartbeat(mut self, enabled: bool) -> Self {
        self.heartbeat = enabled;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_lease_attempts(mut self, attempts: usize) -> Self {
        self.max_lease_attempts = attempts.max(1);
        self
    }

    /// Settings applied to every connection the pool creates.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: self.connect_timeout,
            heartbeat: self.heartbeat,
            heartbeat_interval: self.heartbeat_interval,
            heartbeat_timeout: self.heartbeat_timeout,
        }
    }

    /// Applies the clamps of the builder methods to directly assigned fields.
    pub(crate) fn normalized(mut self) -> Self {
        self.min_connections = self.min_connections.max(1);
        self.max_concurrent = self.max_concurrent.max(1);
        self.max_lease_attempts = self.max_lease_attempts.max(1);
        self
    }
}
