//! Modbus TCP transport: the concrete [`RegisterClient`] implementation.
//!
//! Each streaming session owns its own `TcpRegisterClient` instance, so no
//! synchronization is needed around the device connection — requests are
//! strictly sequential within one session.
//!
//! # Framing
//!
//! TCP is a stream protocol: a single `read()` may return less than one
//! complete Modbus frame.  Responses are therefore read in two steps — first
//! the fixed 6-byte MBAP prefix, then exactly the remainder announced by its
//! length field.  All frame building and parsing is delegated to the
//! `modweb-core` codec; this module only moves bytes.
//!
//! # Failure policy
//!
//! There is no automatic reconnection.  If the initial `open` fails or the
//! connection drops mid-stream, every subsequent read returns a recoverable
//! error that the session reports to the viewer; a higher-level collaborator
//! (or the user reconnecting) starts a fresh session with a fresh client.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use modweb_core::registers::codec::{
    build_read_holdings, parse_read_holdings, response_frame_len, MBAP_PREFIX_LEN,
};
use modweb_core::{ConnError, ReadError, RegisterClient};

/// Per-request deadline for connect and read exchanges with the device.
const DEVICE_TIMEOUT: Duration = Duration::from_secs(1);

/// Modbus TCP implementation of the register access capability.
pub struct TcpRegisterClient {
    addr: String,
    unit_id: u8,
    stream: Option<TcpStream>,
}

impl TcpRegisterClient {
    /// Creates an unconnected client for the device at `host:port`.
    ///
    /// The unit identifier defaults to 1 until [`RegisterClient::set_unit`]
    /// is called.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            unit_id: 1,
            stream: None,
        }
    }

    /// Writes one request frame and reads one complete response frame.
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, ReadError> {
        let stream = self.stream.as_mut().ok_or(ReadError::NotConnected)?;
        stream.write_all(request).await?;

        // The MBAP length field tells us how many more bytes to expect.
        let mut prefix = [0u8; MBAP_PREFIX_LEN];
        stream.read_exact(&mut prefix).await?;
        let total = response_frame_len(&prefix)?;

        let mut frame = prefix.to_vec();
        frame.resize(total.max(MBAP_PREFIX_LEN), 0);
        stream.read_exact(&mut frame[MBAP_PREFIX_LEN..]).await?;
        Ok(frame)
    }
}

#[async_trait]
impl RegisterClient for TcpRegisterClient {
    async fn open(&mut self) -> Result<(), ConnError> {
        match timeout(DEVICE_TIMEOUT, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => {
                // Request/response frames are tiny; don't let Nagle delay them.
                let _ = stream.set_nodelay(true);
                debug!("connected to Modbus device at {}", self.addr);
                self.stream = Some(stream);
                Ok(())
            }
            Ok(Err(source)) => Err(ConnError::Connect {
                addr: self.addr.clone(),
                source,
            }),
            Err(_) => Err(ConnError::ConnectTimeout {
                addr: self.addr.clone(),
            }),
        }
    }

    async fn close(&mut self) -> Result<(), ConnError> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }

    fn set_unit(&mut self, unit_id: u8) {
        self.unit_id = unit_id;
    }

    async fn read_registers(
        &mut self,
        start_address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, ReadError> {
        // A zero-register request never touches the wire; downstream it
        // renders as an empty data message.
        if quantity == 0 {
            return Ok(Vec::new());
        }

        let (mut request, frame) = build_read_holdings(self.unit_id, start_address, quantity)?;

        // A reply that arrives after the deadline stays in the socket
        // buffer.  If the timeout fired between frames, the next exchange
        // consumes the stale frame whole and fails the transaction-id check
        // once; a timeout mid-read leaves the stream at a non-frame
        // boundary, and reads keep failing until the session is torn down.
        let response = match timeout(DEVICE_TIMEOUT, self.exchange(&frame)).await {
            Ok(result) => result?,
            Err(_) => return Err(ReadError::Timeout),
        };

        let values = parse_read_holdings(&mut request, &response)?;
        if values.len() != quantity as usize {
            return Err(ReadError::CountMismatch {
                expected: quantity,
                got: values.len(),
            });
        }
        Ok(values)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
