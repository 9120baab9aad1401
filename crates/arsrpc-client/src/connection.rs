use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arsrpc_common::transport::{Connector, Session};
use arsrpc_common::{heartbeat_token, ArsrpcError, HeartbeatToken, Request, Response, Result};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::heartbeat::HeartbeatSupervisor;

/// Stable identity of a connection, assigned when it is allocated.
///
/// Two connections to the same address always have different ids.
pub type ConnectionId = u64;

/// One logical session to a remote address.
///
/// A connection owns at most one transport [`Session`] at a time. Its
/// liveness flag reflects the outcome of the most recent request or
/// heartbeat; a failure marks the connection suspect but leaves it open and
/// usable, and the next heartbeat or request probes it again.
///
/// # Lifecycle
///
/// ```text
/// Disconnected --connect + confirming heartbeat--> Live
/// Live --request/heartbeat failure--> Suspect --success--> Live
/// any state --close--> Closed (terminal)
/// ```
///
/// When heartbeating is enabled, the first successful [`connect`](Self::connect)
/// spawns a [`HeartbeatSupervisor`]; it is the only place a session is
/// re-established after a failure.
pub struct Connection {
    id: ConnectionId,
    addr: String,
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    session: RwLock<Option<Arc<dyn Session>>>,
    /// Serialises session establishment
    connect_lock: Mutex<()>,
    alive: AtomicBool,
    closed: AtomicBool,
    epoch: Instant,
    /// Milliseconds since `epoch` of the last request or heartbeat
    last_active_ms: AtomicU64,
    supervisor_started: AtomicBool,
    shutdown: CancellationToken,
}

impl Connection {
    /// Creates a disconnected connection. Nothing touches the network until
    /// [`connect`](Self::connect) is called.
    pub fn new(
        id: ConnectionId,
        addr: impl Into<String>,
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            id,
            addr: addr.into(),
            config,
            connector,
            session: RwLock::new(None),
            connect_lock: Mutex::new(()),
            alive: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            epoch: Instant::now(),
            last_active_ms: AtomicU64::new(0),
            supervisor_started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Last-known health: the outcome of the latest request or heartbeat.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether a transport session is currently installed.
    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Whether a request sent now could succeed: the connection is open and
    /// live, and its session still has a working link.
    ///
    /// Unlike [`is_alive`](Self::is_alive) this also catches a session whose
    /// link broke underneath it, such as one whose exchange was abandoned
    /// mid-frame.
    pub async fn is_usable(&self) -> bool {
        if self.is_closed() || !self.is_alive() {
            return false;
        }
        matches!(self.session.read().await.as_ref(), Some(session) if session.is_open())
    }

    /// Time of the last request or heartbeat attempt.
    pub fn last_active(&self) -> Instant {
        self.epoch + Duration::from_millis(self.last_active_ms.load(Ordering::Relaxed))
    }

    /// Establishes the transport session and confirms, with one heartbeat,
    /// that the remote endpoint is serving.
    ///
    /// Returns immediately when the connection is already live.
    ///
    /// # Errors
    ///
    /// - [`ArsrpcError::ConnectionClosed`] after [`close`](Self::close)
    /// - the transport error if the session cannot be established
    /// - [`ArsrpcError::Timeout`] or [`ArsrpcError::HeartbeatMismatch`] if the
    ///   confirming heartbeat fails
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        if self.is_closed() {
            return Err(ArsrpcError::ConnectionClosed);
        }

        {
            let _guard = self.connect_lock.lock().await;
            if !(self.is_alive() && self.is_connected().await) {
                self.establish().await?;
            }
        }

        self.start_supervisor();
        Ok(())
    }

    /// Replaces the current session with a freshly established one.
    pub(crate) async fn reconnect(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ArsrpcError::ConnectionClosed);
        }
        let _guard = self.connect_lock.lock().await;
        self.establish().await
    }

    async fn establish(&self) -> Result<()> {
        let session: Arc<dyn Session> = match self
            .connector
            .connect(&self.addr, self.config.connect_timeout)
            .await
        {
            Ok(session) => Arc::from(session),
            Err(e) => {
                self.alive.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let token = heartbeat_token();
        let confirmed = match self.timed_heartbeat(session.as_ref(), token).await {
            Ok(echoed) if echoed == token => Ok(()),
            Ok(echoed) => Err(ArsrpcError::HeartbeatMismatch {
                sent: token,
                received: echoed,
            }),
            Err(e) => Err(e),
        };
        if let Err(e) = confirmed {
            session.close().await;
            self.alive.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let previous = self.session.write().await.replace(session);
        if let Some(previous) = previous {
            previous.close().await;
        }

        // close() may have run while the session was being established
        if self.is_closed() {
            if let Some(session) = self.session.write().await.take() {
                session.close().await;
            }
            return Err(ArsrpcError::ConnectionClosed);
        }

        self.alive.store(true, Ordering::SeqCst);
        debug!(id = self.id, addr = %self.addr, "Connection established");
        Ok(())
    }

    /// Sends a heartbeat carrying `token` and returns the echoed token.
    ///
    /// The liveness flag becomes true only if the call succeeds and the echo
    /// matches. The attempt counts as activity whatever its outcome.
    pub async fn heartbeat(&self, token: HeartbeatToken) -> Result<HeartbeatToken> {
        let session = self.live_session().await?;
        match self.timed_heartbeat(session.as_ref(), token).await {
            Ok(echoed) => {
                self.alive.store(echoed == token, Ordering::SeqCst);
                Ok(echoed)
            }
            Err(e) => {
                self.alive.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Sends one request over the current session.
    ///
    /// A transport failure marks the connection suspect and is returned to
    /// the caller; nothing is retried here.
    pub async fn request(&self, request: &Request) -> Result<Response> {
        self.touch();
        let session = self.live_session().await?;
        match session.request(request).await {
            Ok(response) => {
                self.alive.store(true, Ordering::SeqCst);
                Ok(response)
            }
            // The endpoint answered, so the link itself is healthy
            Err(ArsrpcError::Remote(message)) => {
                self.alive.store(true, Ordering::SeqCst);
                Err(ArsrpcError::Remote(message))
            }
            Err(e) => {
                self.alive.store(false, Ordering::SeqCst);
                debug!(id = self.id, addr = %self.addr, error = %e, "Request failed");
                Err(e)
            }
        }
    }

    /// Closes the connection and its session. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        self.alive.store(false, Ordering::SeqCst);

        let session = self.session.write().await.take();
        if let Some(session) = session {
            session.close().await;
        }
        debug!(id = self.id, addr = %self.addr, "Connection closed");
    }

    async fn live_session(&self) -> Result<Arc<dyn Session>> {
        if self.is_closed() {
            return Err(ArsrpcError::ConnectionClosed);
        }
        match self.session.read().await.as_ref() {
            Some(session) => Ok(Arc::clone(session)),
            None => {
                self.alive.store(false, Ordering::SeqCst);
                Err(ArsrpcError::Connection(format!(
                    "{} is not connected",
                    self.addr
                )))
            }
        }
    }

    async fn timed_heartbeat(
        &self,
        session: &dyn Session,
        token: HeartbeatToken,
    ) -> Result<HeartbeatToken> {
        self.touch();
        // The timeout starts once the heartbeat owns the link, so requests
        // already in progress do not count against it
        session.heartbeat(token, self.config.heartbeat_timeout).await
    }

    fn touch(&self) {
        let elapsed = self.epoch.elapsed().as_millis() as u64;
        self.last_active_ms.store(elapsed, Ordering::Relaxed);
    }

    fn start_supervisor(self: &Arc<Self>) {
        if !self.config.heartbeat || self.supervisor_started.swap(true, Ordering::SeqCst) {
            return;
        }
        HeartbeatSupervisor::new(
            Arc::downgrade(self),
            self.config.heartbeat_interval,
            self.shutdown.clone(),
        )
        .spawn();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("alive", &self.is_alive())
            .field("closed", &self.is_closed())
            .finish()
    }
}
