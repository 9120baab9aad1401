use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use crate::protocol::error::{ArsrpcError, Result};
use crate::protocol::{Envelope, FrameId, HeartbeatToken, Message, Request, Response};
use crate::transport::codec::JsonCodec;
use crate::transport::{Connector, Session};

/// Largest frame accepted from the wire (100 MB)
pub const MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Connects [`TcpSession`]s.
///
/// # Example
///
/// ```no_run
/// use arsrpc_common::transport::{Connector, Session, TcpConnector};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> arsrpc_common::Result<()> {
/// let session = TcpConnector::new()
///     .connect("127.0.0.1:9000", Duration::from_secs(3))
///     .await?;
/// let echoed = session.heartbeat(42, Duration::from_secs(3)).await?;
/// assert_eq!(echoed, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }

    async fn dial(addr: &str) -> Result<TcpStream> {
        let socket_addrs = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| ArsrpcError::Connection(format!("Invalid address '{}': {}", addr, e)))?;

        // Try each resolved address until one succeeds
        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(socket_addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        Err(ArsrpcError::Connection(format!(
            "Failed to connect to {}: {}",
            addr,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_string())
        )))
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: &str, timeout: Duration) -> Result<Box<dyn Session>> {
        let stream = tokio::time::timeout(timeout, Self::dial(addr))
            .await
            .map_err(|_| ArsrpcError::Timeout(timeout.as_millis() as u64))??;
        stream
            .set_nodelay(true)
            .map_err(|e| ArsrpcError::Connection(format!("Failed to set TCP_NODELAY: {}", e)))?;

        debug!(addr, "TCP session established");
        Ok(Box::new(TcpSession::new(stream)))
    }
}

/// A TCP transport session.
///
/// Exchanges are serialised on the stream: each frame is written and its
/// reply read before the next caller gets the stream. Replies left behind by
/// an earlier exchange are skipped by id.
///
/// An exchange that fails or is dropped after taking the stream leaves it at
/// an unknown frame boundary, so the session is poisoned: every later
/// exchange fails with [`ArsrpcError::ConnectionClosed`] and
/// [`Session::is_open`] reports false.
pub struct TcpSession {
    stream: Mutex<TcpStream>,
    next_id: AtomicU64,
    closed: AtomicBool,
    poisoned: AtomicBool,
}

/// Poisons the session on drop unless the exchange completed.
struct PoisonGuard<'a> {
    poisoned: &'a AtomicBool,
    armed: bool,
}

impl PoisonGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PoisonGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.poisoned.store(true, Ordering::Release);
            debug!("Exchange interrupted, session poisoned");
        }
    }
}

impl TcpSession {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: Mutex::new(stream),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            poisoned: AtomicBool::new(false),
        }
    }

    /// Sends `message` and waits for its reply.
    ///
    /// `limit` bounds the round-trip once the stream is held; time spent
    /// queued behind other exchanges does not count.
    async fn exchange(&self, message: Message, limit: Option<Duration>) -> Result<Message> {
        if !self.is_open() {
            return Err(ArsrpcError::ConnectionClosed);
        }

        let id: FrameId = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut stream = self.stream.lock().await;
        if !self.is_open() {
            return Err(ArsrpcError::ConnectionClosed);
        }

        let guard = PoisonGuard {
            poisoned: &self.poisoned,
            armed: true,
        };
        let round_trip = Self::round_trip(&mut stream, id, message);
        let reply = match limit {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .map_err(|_| ArsrpcError::Timeout(limit.as_millis() as u64))??,
            None => round_trip.await?,
        };
        guard.disarm();
        Ok(reply)
    }

    async fn round_trip(stream: &mut TcpStream, id: FrameId, message: Message) -> Result<Message> {
        send_frame(stream, &Envelope::new(id, message)).await?;

        loop {
            let reply = receive_frame(stream).await?;
            if reply.id == id {
                return Ok(reply.message);
            }
            if reply.id > id {
                return Err(ArsrpcError::InvalidResponse(format!(
                    "Unexpected frame id {} (expected {})",
                    reply.id, id
                )));
            }
            debug!(stale = reply.id, expected = id, "Skipping stale frame");
        }
    }
}

#[async_trait]
impl Session for TcpSession {
    async fn request(&self, request: &Request) -> Result<Response> {
        match self.exchange(Message::Request(request.clone()), None).await? {
            Message::Response(response) => Ok(response),
            Message::Error { message } => Err(ArsrpcError::Remote(message)),
            other => Err(ArsrpcError::InvalidResponse(format!(
                "Expected response, got {:?}",
                other
            ))),
        }
    }

    async fn heartbeat(&self, token: HeartbeatToken, timeout: Duration) -> Result<HeartbeatToken> {
        match self.exchange(Message::Heartbeat { token }, Some(timeout)).await? {
            Message::HeartbeatAck { token } => Ok(token),
            Message::Error { message } => Err(ArsrpcError::Remote(message)),
            other => Err(ArsrpcError::InvalidResponse(format!(
                "Expected heartbeat ack, got {:?}",
                other
            ))),
        }
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.poisoned.load(Ordering::Acquire)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut stream = self.stream.lock().await;
        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "TCP shutdown failed");
        }
    }
}

/// Writes one frame.
///
/// Wire format: `[4-byte length as u32 big-endian] + [JSON envelope]`
pub async fn send_frame<W>(writer: &mut W, envelope: &Envelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = JsonCodec::encode(envelope)?;
    let len = encoded.len() as u32;

    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| map_io_error(e, "writing length prefix"))?;
    writer
        .write_all(&encoded)
        .await
        .map_err(|e| map_io_error(e, "writing frame"))?;
    writer
        .flush()
        .await
        .map_err(|e| map_io_error(e, "flushing stream"))?;

    Ok(())
}

/// Reads one frame.
///
/// # Errors
///
/// Returns an error if:
/// - Reading the length prefix or the frame fails
/// - The frame exceeds [`MAX_FRAME_SIZE`]
/// - The frame is not a valid envelope
pub async fn receive_frame<R>(reader: &mut R) -> Result<Envelope>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| map_io_error(e, "reading length prefix"))?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ArsrpcError::InvalidResponse(format!(
            "Frame too large: {} bytes (max {} bytes)",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| map_io_error(e, "reading frame"))?;

    JsonCodec::decode(&buf)
}

/// Map IO errors to transport error variants
///
/// - Connection errors (reset, aborted, EOF) -> `Connection`
/// - Other IO errors -> `Io`
fn map_io_error(err: std::io::Error, context: &str) -> ArsrpcError {
    match err.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::UnexpectedEof => {
            ArsrpcError::Connection(format!("{}: Connection lost", context))
        }
        _ => ArsrpcError::Io(err),
    }
}
