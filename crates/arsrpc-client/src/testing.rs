//! In-memory transport for unit tests.
//!
//! Counts sessions opened and closed, records the highest number of requests
//! one session ever carried at once, and lets a test inject connect, request
//! and heartbeat failures, break the sessions already open, or slow down
//! requests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arsrpc_common::transport::{Connector, Session};
use arsrpc_common::{ArsrpcError, HeartbeatToken, Request, Response, Result};
use async_trait::async_trait;

#[derive(Default)]
pub(crate) struct MockState {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub requests: AtomicUsize,
    pub heartbeats: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_requests: AtomicBool,
    pub fail_heartbeats: AtomicBool,
    pub wrong_echo: AtomicBool,
    pub latency_ms: AtomicU64,
    /// Sessions numbered up to this one have lost their link
    pub broken_upto: AtomicUsize,
    /// Most requests ever outstanding on a single session
    pub peak_per_session: AtomicUsize,
}

impl MockState {
    pub fn open_sessions(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }

    /// Cuts every session opened so far, the way a remote hang-up would.
    /// Sessions opened afterwards work normally.
    pub fn break_open_sessions(&self) {
        self.broken_upto
            .store(self.opened.load(Ordering::SeqCst), Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }

    pub fn shared(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, addr: &str, _timeout: Duration) -> Result<Box<dyn Session>> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(ArsrpcError::Connection(format!("{} refused", addr)));
        }
        let seq = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            seq,
            closed: AtomicBool::new(false),
            active: AtomicUsize::new(0),
        }))
    }
}

struct MockSession {
    state: Arc<MockState>,
    seq: usize,
    closed: AtomicBool,
    active: AtomicUsize,
}

impl MockSession {
    fn broken(&self) -> bool {
        self.seq <= self.state.broken_upto.load(Ordering::SeqCst)
    }
}

/// Counts one outstanding request until dropped.
struct Active<'a>(&'a AtomicUsize);

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for MockSession {
    async fn request(&self, request: &Request) -> Result<Response> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ArsrpcError::ConnectionClosed);
        }
        if self.broken() {
            return Err(ArsrpcError::Connection("connection reset".to_string()));
        }
        if self.state.fail_requests.load(Ordering::SeqCst) {
            return Err(ArsrpcError::Connection("injected failure".to_string()));
        }
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = Active(&self.active);
        self.state.peak_per_session.fetch_max(now, Ordering::SeqCst);
        match self.state.latency_ms.load(Ordering::SeqCst) {
            0 => tokio::task::yield_now().await,
            ms => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
        self.state.requests.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(
            200,
            format!("{}:{}", request.service, request.input),
        ))
    }

    async fn heartbeat(&self, token: HeartbeatToken, _timeout: Duration) -> Result<HeartbeatToken> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ArsrpcError::ConnectionClosed);
        }
        if self.broken() {
            return Err(ArsrpcError::Connection("connection reset".to_string()));
        }
        self.state.heartbeats.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_heartbeats.load(Ordering::SeqCst) {
            return Err(ArsrpcError::Connection("injected heartbeat failure".to_string()));
        }
        if self.state.wrong_echo.load(Ordering::SeqCst) {
            return Ok(token.wrapping_add(1));
        }
        Ok(token)
    }

    // A hang-up is only discovered by the next exchange
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
