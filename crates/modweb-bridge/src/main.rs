//! ModWeb bridge — entry point.
//!
//! This binary polls a Modbus TCP device for a configured run of holding
//! registers and streams the readings to WebSocket viewers as JSON text
//! frames, one message per polling tick.
//!
//! # Usage
//!
//! ```text
//! modweb-bridge [OPTIONS]
//!
//! Options:
//!   --config  <PATH>  Config file path [default: config.toml]
//!   --ws-bind <IP>    WebSocket bind address [default: 0.0.0.0]
//!   --ws-port <PORT>  Override the config file's web_ui_port
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable         | Default       | Description               |
//! |------------------|---------------|---------------------------|
//! | `MODWEB_CONFIG`  | `config.toml` | Config file path          |
//! | `MODWEB_WS_BIND` | `0.0.0.0`     | WebSocket bind address    |
//! | `MODWEB_WS_PORT` | (config file) | WebSocket listener port   |
//!
//! Device parameters (host, port, register range, poll cadence, unit id)
//! live in the config file; it is created with defaults on first run.
//!
//! # Architecture overview
//!
//! ```text
//! Browser  (JSON over WebSocket)
//!       ↕
//! modweb-bridge  ← this process
//!   domain/         ViewerMessage, BridgeConfig
//!   application/    register value formatting
//!   infrastructure/
//!     ws_server/    accept loop + streaming sessions
//!     modbus_conn/  Modbus TCP register client
//!     config_file/  TOML config loading
//!       ↕
//! Modbus TCP device  (holding registers, read-only)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use modweb_bridge::domain::config::{BridgeConfig, DEFAULT_SEND_TIMEOUT};
use modweb_bridge::infrastructure::{load_or_create, run_server, FileConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// ModWeb bridge.
///
/// Streams live Modbus holding-register readings to WebSocket viewers.
#[derive(Debug, Parser)]
#[command(
    name = "modweb-bridge",
    about = "Modbus-TCP-to-WebSocket streaming bridge",
    version
)]
struct Cli {
    /// Path to the TOML config file.  Created with default values if it
    /// does not exist.
    #[arg(long, default_value = "config.toml", env = "MODWEB_CONFIG")]
    config: PathBuf,

    /// IP address to bind the WebSocket server to.
    ///
    /// Use `0.0.0.0` to accept connections from any interface, or
    /// `127.0.0.1` to accept only local viewers.
    #[arg(long, default_value = "0.0.0.0", env = "MODWEB_WS_BIND")]
    ws_bind: String,

    /// Override the config file's `web_ui_port`.
    #[arg(long, env = "MODWEB_WS_PORT")]
    ws_port: Option<u16>,
}

/// Combines the config file contents with CLI overrides into the runtime
/// [`BridgeConfig`].
///
/// # Errors
///
/// Returns an error if `delay_seconds` is zero (the poll interval must be
/// positive) or the bind address does not parse.
fn build_config(
    file: FileConfig,
    ws_bind: &str,
    ws_port: Option<u16>,
) -> anyhow::Result<BridgeConfig> {
    if file.delay_seconds == 0 {
        bail!("delay_seconds must be at least 1");
    }
    if file.quantity == 0 {
        warn!("quantity is 0; data messages will have empty content");
    }

    let port = ws_port.unwrap_or(file.web_ui_port);
    let ws_bind_addr: SocketAddr = format!("{ws_bind}:{port}")
        .parse()
        .with_context(|| format!("invalid WebSocket bind address: '{ws_bind}:{port}'"))?;

    Ok(BridgeConfig {
        ws_bind_addr,
        device_host: file.server_ip,
        device_port: file.server_port,
        start_address: file.start_address,
        quantity: file.quantity,
        poll_interval: Duration::from_secs(file.delay_seconds),
        unit_id: file.slave_id,
        send_timeout: DEFAULT_SEND_TIMEOUT,
    })
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level comes from RUST_LOG, defaulting to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let file = load_or_create(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let config = build_config(file, &cli.ws_bind, cli.ws_port)?;

    info!(
        "ModWeb bridge starting — ws={}, device={}, registers {}+{} every {:?}",
        config.ws_bind_addr,
        config.device_endpoint(),
        config.start_address,
        config.quantity,
        config.poll_interval
    );

    // Graceful shutdown: Ctrl+C clears the flag, the accept loop notices
    // within 200 ms and stops taking new viewers.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("ModWeb bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
