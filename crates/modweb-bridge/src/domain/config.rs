//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is populated by the infrastructure layer (config file + CLI overrides)
//! and then wrapped in an `Arc` so every session task shares one immutable
//! copy — sessions never read process-wide mutable state.

use std::net::SocketAddr;
use std::time::Duration;

/// How long one outbound WebSocket send may take before the session treats
/// the viewer as gone.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// All runtime configuration for the bridge.
///
/// Build this struct once at startup and share it via `Arc` across session
/// tasks.  Each session also reads its polling parameters (start address,
/// quantity, interval, unit id) from here; they are fixed for the lifetime of
/// the process.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The address and port the WebSocket server binds to.
    pub ws_bind_addr: SocketAddr,

    /// Hostname or IP of the Modbus TCP device (server).
    pub device_host: String,

    /// TCP port of the Modbus TCP device.  502 is the registered Modbus
    /// port; simulators commonly use 5020 to avoid needing privileges.
    pub device_port: u16,

    /// First holding register address to read on each tick.
    pub start_address: u16,

    /// Number of consecutive registers to read per tick.  Expected to be
    /// greater than zero; zero is tolerated and produces empty data
    /// messages.
    pub quantity: u16,

    /// Time between polling ticks.  Always positive.
    pub poll_interval: Duration,

    /// Modbus unit (slave) identifier, applied to the device client once
    /// before streaming begins.
    pub unit_id: u8,

    /// Bounded deadline for each outbound WebSocket send.
    pub send_timeout: Duration,
}

impl BridgeConfig {
    /// The device endpoint as `host:port`, as announced to viewers in the
    /// session handshake message.
    pub fn device_endpoint(&self) -> String {
        format!("{}:{}", self.device_host, self.device_port)
    }
}

impl Default for BridgeConfig {
    /// Defaults matching a local Modbus simulator setup: device at
    /// `localhost:5020`, two registers from address 0, one-second cadence,
    /// WebSocket server on port 8080.
    fn default() -> Self {
        Self {
            // Compile-time-known valid socket address string.
            ws_bind_addr: "0.0.0.0:8080".parse().unwrap(),
            device_host: "localhost".to_string(),
            device_port: 5020,
            start_address: 0,
            quantity: 2,
            poll_interval: Duration::from_secs(1),
            unit_id: 1,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
