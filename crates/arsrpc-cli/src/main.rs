//! # arsrpc CLI
//!
//! Talks to an arsrpc endpoint over the TCP transport.
//!
//! ## Usage
//!
//! ```bash
//! # Send one request (prints the response as JSON)
//! arsrpc call --addr 127.0.0.1:9000 order.query '{"id": 7}'
//!
//! # Check that the endpoint answers heartbeats
//! arsrpc ping --addr 127.0.0.1:9000 --count 3
//!
//! # Drive concurrent requests through a connection pool
//! ARSRPC_ADDR=127.0.0.1:9000 arsrpc bench --requests 10000 --max-concurrent 100
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use argh::FromArgs;
use arsrpc_client::{ClientPool, Connection, ConnectionConfig, PoolConfig};
use arsrpc_common::transport::TcpConnector;
use arsrpc_common::{heartbeat_token, Request};

/// Environment variable consulted when `--addr` is not given
const ADDR_ENV: &str = "ARSRPC_ADDR";

#[derive(FromArgs)]
/// arsrpc - pooled RPC client
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Call(CallArgs),
    Ping(PingArgs),
    Bench(BenchArgs),
}

/// Arguments for sending a single request.
///
/// The response is written to stdout as one line of JSON so it can be piped
/// into other tools. Errors go to stderr with a non-zero exit code.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// send one request and print the response as JSON
struct CallArgs {
    /// endpoint address (host:port), defaults to $ARSRPC_ADDR
    #[argh(option, short = 'a')]
    addr: Option<String>,

    /// session identifier sent with the request
    #[argh(option, short = 's', default = "String::from(\"cli\")")]
    session: String,

    /// connection timeout in milliseconds
    #[argh(option, default = "3000")]
    timeout_ms: u64,

    /// logical service name
    #[argh(positional)]
    service: String,

    /// request payload
    #[argh(positional, default = "String::new()")]
    input: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "ping")]
/// check that an endpoint answers heartbeats
struct PingArgs {
    /// endpoint address (host:port), defaults to $ARSRPC_ADDR
    #[argh(option, short = 'a')]
    addr: Option<String>,

    /// number of heartbeats to send
    #[argh(option, short = 'c', default = "1")]
    count: u32,

    /// delay between heartbeats in milliseconds
    #[argh(option, short = 'i', default = "1000")]
    interval_ms: u64,

    /// connection and heartbeat timeout in milliseconds
    #[argh(option, default = "3000")]
    timeout_ms: u64,
}

/// Arguments for the pool benchmark.
///
/// All requests are issued at once; the pool decides how many connections
/// that takes given the warm size and the per-connection cap.
#[derive(FromArgs)]
#[argh(subcommand, name = "bench")]
/// drive concurrent requests through a connection pool
struct BenchArgs {
    /// endpoint address (host:port), defaults to $ARSRPC_ADDR
    #[argh(option, short = 'a')]
    addr: Option<String>,

    /// total number of requests
    #[argh(option, short = 'n', default = "1000")]
    requests: usize,

    /// warm connections kept parked
    #[argh(option, default = "1")]
    min_connections: usize,

    /// concurrent requests allowed per connection
    #[argh(option, default = "100")]
    max_concurrent: usize,

    /// service name for every request
    #[argh(option, default = "String::from(\"echo\")")]
    service: String,

    /// payload for every request
    #[argh(option, default = "String::from(\"ping\")")]
    input: String,

    /// run heartbeat supervisors on pooled connections
    #[argh(switch)]
    heartbeat: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // call stays silent so its output can be piped; the others log to
    // stderr, leaving stdout to results
    if !matches!(cli.command, Commands::Call(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Call(args) => run_call(args).await,
        Commands::Ping(args) => run_ping(args).await,
        Commands::Bench(args) => run_bench(args).await,
    }
}

/// Picks the flag value, then the environment.
fn resolve_addr(flag: Option<String>, env: Option<String>) -> Result<String> {
    flag.or(env)
        .filter(|addr| !addr.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("No endpoint address: pass --addr or set {}", ADDR_ENV))
}

fn addr_from(flag: Option<String>) -> Result<String> {
    resolve_addr(flag, std::env::var(ADDR_ENV).ok())
}

/// Opens a single connection with its confirming heartbeat.
async fn open_connection(addr: String, timeout: Duration) -> Result<Arc<Connection>> {
    let config = ConnectionConfig {
        connect_timeout: timeout,
        heartbeat_timeout: timeout,
        ..ConnectionConfig::default()
    };
    let connection = Arc::new(Connection::new(0, addr, config, Arc::new(TcpConnector::new())));
    connection.connect().await?;
    Ok(connection)
}

async fn run_call(args: CallArgs) -> Result<()> {
    let addr = addr_from(args.addr)?;
    let connection = open_connection(addr, Duration::from_millis(args.timeout_ms)).await?;

    let request = Request::new(args.session, args.service, args.input);
    let result = connection.request(&request).await;
    connection.close().await;

    println!("{}", serde_json::to_string(&result?)?);
    Ok(())
}

async fn run_ping(args: PingArgs) -> Result<()> {
    let addr = addr_from(args.addr)?;
    let connection = open_connection(addr.clone(), Duration::from_millis(args.timeout_ms)).await?;

    let mut failures = 0;
    for seq in 0..args.count.max(1) {
        if seq > 0 {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }

        let token = heartbeat_token();
        let started = Instant::now();
        match connection.heartbeat(token).await {
            Ok(echoed) if echoed == token => {
                println!("{}: seq={} time={:.2}ms", addr, seq, started.elapsed().as_secs_f64() * 1000.0);
            }
            Ok(echoed) => {
                failures += 1;
                println!("{}: seq={} token mismatch (sent {}, got {})", addr, seq, token, echoed);
            }
            Err(e) => {
                failures += 1;
                println!("{}: seq={} failed: {}", addr, seq, e);
            }
        }
    }
    connection.close().await;

    if failures > 0 {
        anyhow::bail!("{} of {} heartbeats failed", failures, args.count.max(1));
    }
    Ok(())
}

async fn run_bench(args: BenchArgs) -> Result<()> {
    let addr = addr_from(args.addr)?;
    let config = PoolConfig::new(addr)
        .with_min_connections(args.min_connections)
        .with_max_concurrent(args.max_concurrent)
        .with_heartbeat(args.heartbeat);
    let pool = Arc::new(ClientPool::new(config).await);

    tracing::info!(
        requests = args.requests,
        min_connections = args.min_connections,
        max_concurrent = args.max_concurrent,
        "Starting benchmark against {}",
        pool.address()
    );

    let started = Instant::now();
    let tasks: Vec<_> = (0..args.requests)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let service = args.service.clone();
            let input = args.input.clone();
            tokio::spawn(async move { pool.request("bench", &service, &input).await })
        })
        .collect();

    let mut failures = 0usize;
    for task in futures::future::join_all(tasks).await {
        match task {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                failures += 1;
                tracing::debug!(error = %e, "Request failed");
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(error = %e, "Request task panicked");
            }
        }
    }
    let elapsed = started.elapsed();

    tracing::info!(
        failures,
        elapsed_ms = elapsed.as_millis() as u64,
        throughput = %format!("{:.0} req/s", args.requests as f64 / elapsed.as_secs_f64().max(1e-9)),
        "Benchmark finished"
    );
    println!("{}", serde_json::to_string_pretty(&pool.stats())?);
    pool.shutdown().await;

    if failures > 0 {
        anyhow::bail!("{} of {} requests failed", failures, args.requests);
    }
    Ok(())
}
