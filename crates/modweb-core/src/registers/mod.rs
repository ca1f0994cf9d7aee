//! The register access capability the streaming session polls against.
//!
//! A Modbus device exposes addressable 16-bit registers.  The session core
//! only ever needs four operations: open the device connection, close it,
//! select the unit (slave) identifier, and read a contiguous run of holding
//! registers.  Everything protocol-specific — MBAP framing, byte order,
//! exception responses — stays behind this trait so the session treats any
//! failure as an opaque, displayable error.
//!
//! # Contract
//!
//! `read_registers(start, quantity)` returns **exactly** `quantity` values in
//! ascending address order, or an error.  Partial results are never returned;
//! the formatter downstream relies on this.

use async_trait::async_trait;
use thiserror::Error;

pub mod codec;

pub use codec::CodecError;

// ── Error taxonomy ────────────────────────────────────────────────────────────

/// Errors opening or closing the device connection.
#[derive(Debug, Error)]
pub enum ConnError {
    /// The TCP connection to the device could not be established.
    #[error("failed to connect to device at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection attempt did not complete within the configured timeout.
    #[error("connection to device at {addr} timed out")]
    ConnectTimeout { addr: String },

    /// An I/O error occurred while shutting the connection down.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors producing one register reading.
///
/// Every variant is recoverable from the session's point of view: the reading
/// is reported to the viewer as error text and polling continues.
#[derive(Debug, Error)]
pub enum ReadError {
    /// No device connection is open (the initial `open` failed or the
    /// connection was closed).  There is no automatic reconnection.
    #[error("not connected to device")]
    NotConnected,

    /// The device did not answer within the per-request timeout.
    #[error("device read timed out")]
    Timeout,

    /// The underlying socket failed mid-request.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The response frame was malformed, mismatched, or carried a Modbus
    /// exception code.
    #[error("modbus frame error: {0}")]
    Frame(#[from] CodecError),

    /// The device answered with a different number of registers than
    /// requested.  Surfaced as an error rather than a partial result.
    #[error("device returned {got} registers, expected {expected}")]
    CountMismatch { expected: u16, got: usize },
}

// ── Capability trait ──────────────────────────────────────────────────────────

/// Minimal register-access surface the streaming session depends on.
///
/// One implementation exists per underlying protocol transport; the bridge
/// ships a Modbus TCP implementation (`TcpRegisterClient` in the bridge's
/// infrastructure layer) and tests substitute scripted mocks.
///
/// A client instance is owned by exactly one session and is only ever called
/// from that session's polling loop, so implementations need `Send` but not
/// `Sync`.
#[async_trait]
pub trait RegisterClient: Send {
    /// Opens the connection to the device.
    async fn open(&mut self) -> Result<(), ConnError>;

    /// Closes the connection.  Safe to call when already closed.
    async fn close(&mut self) -> Result<(), ConnError>;

    /// Selects the unit (slave) identifier used for subsequent reads.
    /// Applied once before streaming begins.
    fn set_unit(&mut self, unit_id: u8);

    /// Reads `quantity` holding registers starting at `start_address`.
    ///
    /// Returns exactly `quantity` values in ascending address order, or an
    /// error — never a partial result.
    async fn read_registers(
        &mut self,
        start_address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, ReadError>;
}
