//! WebSocket server: accept loop and the per-session streaming state machine.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming viewer connections and upgrading them to WebSocket.
//! 3. Running the streaming session for each viewer:
//!    - one `serverInfo` handshake message, flushed before anything else;
//!    - a **polling loop** that reads the configured registers on a timer
//!      and pushes one `modbusData` message per tick;
//!    - a **disconnect detector** task that blocks on the inbound half of
//!      the channel purely to notice the viewer going away.
//! 4. Tearing the session down on the first termination trigger from either
//!    side and gracefully shutting down when the `running` flag is cleared.
//!
//! # Failure isolation
//!
//! Device read failures are expected and recoverable (timeouts, transient
//! device busy): they are pushed to the viewer as `"Error: …"` content and
//! the session stays up.  Channel send failures mean the viewer is gone, so
//! they end the session.  The two must never be conflated — a flaky device
//! must not kill a healthy viewer connection, and a dead viewer must not
//! keep a polling loop alive.
//!
//! # Scalability
//!
//! Each viewer session runs in its own Tokio task with its own device
//! client, so sessions never contend with each other.  The accept loop never
//! blocks: it spawns the session task and immediately accepts the next
//! connection.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    WebSocketStream,
};
use tracing::{debug, error, info, warn};

use modweb_core::RegisterClient;

use crate::application::format_registers;
use crate::domain::{BridgeConfig, ViewerMessage};
use crate::infrastructure::modbus_conn::TcpRegisterClient;

/// Outbound (write) half of an upgraded viewer connection.
type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
/// Inbound (read) half of an upgraded viewer connection.
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Ways a session can fail before streaming starts.
///
/// Everything after a successful handshake — peer disconnect, send failure,
/// device trouble — is a normal termination, not an error: the session ends
/// through its ordinary teardown and `run_session` returns `Ok`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection could not be promoted to a WebSocket channel.
    /// Nothing was sent; the session never started.
    #[error("WebSocket handshake failed: {0}")]
    Upgrade(WsError),

    /// The initial `serverInfo` message could not be serialized.
    #[error("failed to encode handshake message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The initial `serverInfo` message could not be sent.
    #[error("failed to send handshake message: {0}")]
    HandshakeSend(WsError),
}

/// Why one outbound send did not complete.  Either way the viewer is
/// presumed gone and the session terminates.
#[derive(Debug, Error)]
enum SendError {
    #[error("send deadline elapsed")]
    Timeout,
    #[error(transparent)]
    Ws(#[from] WsError),
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the main WebSocket accept loop until `running` is set to `false`.
///
/// Binds a TCP listener on `config.ws_bind_addr` and hands each accepted
/// connection to a dedicated session task, each with its own freshly opened
/// device client.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use).
pub async fn run_server(config: BridgeConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;

    info!("WebSocket server listening on {}", config.ws_bind_addr);

    let config = Arc::new(config);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short timeout on accept() lets the loop re-check the shutdown
        // flag even when no viewers are connecting.
        let accept_result = timeout(Duration::from_millis(200), listener.accept()).await;

        match accept_result {
            Ok(Ok((stream, peer_addr))) => {
                info!("new viewer connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                tokio::spawn(async move {
                    handle_viewer_session(stream, peer_addr, cfg).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., out of file descriptors).
                // Log and keep serving other viewers.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout; loop back to check the running flag.
            }
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Top-level handler for a single viewer connection.
///
/// Creates and binds this session's own device client (one client instance
/// per session — never shared), then wraps [`run_session`] and logs the
/// outcome.  The outer/inner split keeps `?` usable inside `run_session`
/// while errors are logged exactly once here.
async fn handle_viewer_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<BridgeConfig>,
) {
    let mut client = TcpRegisterClient::new(&config.device_host, config.device_port);

    // An unreachable device is not fatal to the session: the viewer still
    // gets the handshake, and every tick reports the read failure as error
    // content until the operator fixes the device side.
    if let Err(e) = client.open().await {
        warn!("session {peer_addr}: {e}; reads will report errors");
    }
    client.set_unit(config.unit_id);

    match run_session(raw_stream, peer_addr, client, config).await {
        Ok(()) => info!("session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} failed: {e}"),
    }
}

/// Runs the complete lifecycle of one streaming session.
///
/// 1. Completes the WebSocket upgrade handshake.
/// 2. Sends (and flushes) the `serverInfo` message announcing the device
///    endpoint.
/// 3. Spawns the disconnect detector on the read half and runs the polling
///    loop on the write half, sharing one single-fire termination signal.
/// 4. On the first termination from either side: stops the timer, aborts
///    the detector, closes the channel, and closes the device client.
///
/// Takes any [`RegisterClient`] so tests can substitute scripted clients;
/// production sessions receive a [`TcpRegisterClient`].
///
/// # Errors
///
/// Returns a [`SessionError`] only for pre-streaming failures (upgrade or
/// handshake send).  A session that streamed and then ended returns `Ok`.
pub async fn run_session<C: RegisterClient>(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    mut client: C,
    config: Arc<BridgeConfig>,
) -> Result<(), SessionError> {
    let ws_stream = accept_async(raw_stream)
        .await
        .map_err(SessionError::Upgrade)?;

    debug!("WebSocket session established: {peer_addr}");

    let (mut ws_tx, ws_rx) = ws_stream.split();

    // Handshake first: SinkExt::send flushes, so the serverInfo message is
    // fully on the wire before the first tick-driven send.
    let hello = ViewerMessage::server_info(&config.device_endpoint());
    let json = serde_json::to_string(&hello)?;
    if let Err(e) = ws_tx.send(WsMessage::Text(json)).await {
        let _ = ws_tx.close().await;
        return Err(SessionError::HandshakeSend(e));
    }

    // Single-fire termination signal shared by both tasks.  The detector
    // fires it on peer closure; the polling loop observes it between ticks.
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let detector = spawn_disconnect_detector(ws_rx, peer_addr, done_tx);

    poll_registers(&mut client, &mut ws_tx, done_rx, peer_addr, &config).await;

    // Idempotent teardown, reached from every termination path.
    detector.abort();
    let _ = ws_tx.close().await;
    if let Err(e) = client.close().await {
        debug!("session {peer_addr}: device close failed: {e}");
    }

    Ok(())
}

// ── Disconnect detector ───────────────────────────────────────────────────────

/// Spawns the task that watches the inbound half of the channel for closure.
///
/// The session protocol defines no meaningful inbound messages, so frames
/// are read in a tight loop purely to observe liveness.  The moment the read
/// fails for any reason — Close frame, protocol error, or the stream ending
/// — the termination signal fires exactly once and the task exits.  This is
/// the only path that notices a viewer-initiated close independently of the
/// poll interval.
fn spawn_disconnect_detector(
    mut ws_rx: WsSource,
    peer_addr: SocketAddr,
    done_tx: oneshot::Sender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match ws_rx.next().await {
                Some(Ok(WsMessage::Close(_))) => {
                    debug!("session {peer_addr}: viewer sent Close frame");
                    break;
                }
                Some(Ok(_)) => {
                    // Inbound traffic is ignored; only liveness matters.
                }
                Some(Err(e)) => {
                    debug!("session {peer_addr}: viewer read failed: {e}");
                    break;
                }
                None => {
                    debug!("session {peer_addr}: viewer stream ended");
                    break;
                }
            }
        }

        // The receiver may already be gone if the polling loop terminated
        // first; a refused signal is fine.
        let _ = done_tx.send(());
    })
}

// ── Polling loop ──────────────────────────────────────────────────────────────

/// Timer-driven read-and-push loop; the single writer of the session.
///
/// Two states: Active (looping) and Terminated (returned).  Per tick while
/// Active: read the configured registers, format the values — or describe
/// the read failure — and push one `modbusData` message with a bounded send
/// deadline.  A failed read keeps the session Active; a failed or timed-out
/// send, or the shared termination signal, ends it.
async fn poll_registers<C: RegisterClient>(
    client: &mut C,
    ws_tx: &mut WsSink,
    mut done_rx: oneshot::Receiver<()>,
    peer_addr: SocketAddr,
    config: &BridgeConfig,
) {
    let mut ticker = interval(config.poll_interval);
    // The first interval tick fires immediately; skip it so the first data
    // message lands one full interval after the handshake.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut done_rx => {
                debug!("session {peer_addr}: termination signalled; stopping poll timer");
                break;
            }
            _ = ticker.tick() => {
                let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

                let msg = match client
                    .read_registers(config.start_address, config.quantity)
                    .await
                {
                    Ok(values) => ViewerMessage::data(
                        format_registers(config.start_address, &values),
                        timestamp,
                    ),
                    Err(e) => {
                        // Recoverable: the viewer sees the failure in-line
                        // and the next tick tries again.
                        warn!("session {peer_addr}: register read failed: {e}");
                        ViewerMessage::read_error(&e, timestamp)
                    }
                };

                if let Err(e) = send_message(ws_tx, &msg, config.send_timeout).await {
                    debug!("session {peer_addr}: outbound send failed: {e}");
                    break;
                }
            }
        }
    }
}

/// Sends one message as a JSON text frame with a bounded deadline.
async fn send_message(
    ws_tx: &mut WsSink,
    msg: &ViewerMessage,
    deadline: Duration,
) -> Result<(), SendError> {
    let json = serde_json::to_string(msg)?;
    match timeout(deadline, ws_tx.send(WsMessage::Text(json))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(SendError::Timeout),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
