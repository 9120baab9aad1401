//! In-process TCP endpoint for integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arsrpc_common::protocol::{Message, Response};
use arsrpc_common::transport::{receive_frame, send_frame, JsonCodec};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Counters observed by the endpoint
#[derive(Debug, Default)]
pub struct Endpoint {
    pub accepted: AtomicUsize,
    pub requests: AtomicUsize,
    pub heartbeats: AtomicUsize,
}

/// Starts an endpoint on an ephemeral port and returns its address.
///
/// Every accepted connection is served on its own task until the client
/// hangs up. Requests are answered with `"<service>:<input>"`, and a few
/// services misbehave on purpose:
///
/// - `slow` answers after 250 ms
/// - `split` sends the reply's length prefix, then the body 100 ms later
/// - `bye` answers, then closes the connection
pub async fn spawn_endpoint() -> (String, Arc<Endpoint>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let endpoint = Arc::new(Endpoint::default());

    let counters = Arc::clone(&endpoint);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counters.accepted.fetch_add(1, Ordering::SeqCst);
            let counters = Arc::clone(&counters);
            tokio::spawn(async move {
                while let Ok(envelope) = receive_frame(&mut stream).await {
                    let mut hang_up = false;
                    let reply = match &envelope.message {
                        Message::Request(request) => {
                            counters.requests.fetch_add(1, Ordering::SeqCst);
                            let reply = envelope.reply(Message::Response(Response::new(
                                200,
                                format!("{}:{}", request.service, request.input),
                            )));
                            match request.service.as_str() {
                                "slow" => tokio::time::sleep(Duration::from_millis(250)).await,
                                "split" => {
                                    let body = JsonCodec::encode(&reply).unwrap();
                                    let _ = stream.write_all(&(body.len() as u32).to_be_bytes()).await;
                                    tokio::time::sleep(Duration::from_millis(100)).await;
                                    if stream.write_all(&body).await.is_err() {
                                        break;
                                    }
                                    continue;
                                }
                                "bye" => hang_up = true,
                                _ => {}
                            }
                            reply.message
                        }
                        Message::Heartbeat { token } => {
                            counters.heartbeats.fetch_add(1, Ordering::SeqCst);
                            Message::HeartbeatAck { token: *token }
                        }
                        _ => Message::Error {
                            message: "unexpected frame".to_string(),
                        },
                    };
                    if send_frame(&mut stream, &envelope.reply(reply)).await.is_err() || hang_up {
                        break;
                    }
                }
            });
        }
    });

    (addr, endpoint)
}
