//! modweb-bridge library crate.
//!
//! This crate bridges a polled Modbus TCP device to push-based WebSocket
//! viewers: each connected viewer gets its own streaming session that reads
//! a configured run of holding registers on a timer and pushes the formatted
//! values as JSON text frames.
//!
//! # Architecture
//!
//! ```text
//! Browser (JSON over WebSocket)
//!         ↕
//! [modweb-bridge]
//!   ├── domain/           Pure types: ViewerMessage envelope, BridgeConfig
//!   ├── application/      Pure logic: register value formatting
//!   └── infrastructure/
//!         ├── ws_server/     Accept loop + per-session state machine
//!         ├── modbus_conn/   Modbus TCP RegisterClient implementation
//!         └── config_file/   TOML config loading (create-on-missing)
//!         ↕
//! Modbus TCP device (holding registers, read-only)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no external dependencies beyond serde (no I/O, no async).
//! - `application` depends on `domain` only.
//! - `infrastructure` depends on all other layers plus `tokio`,
//!   `tungstenite`, and `modweb-core`.

/// Domain layer: pure business-logic types (no I/O).
pub mod domain;

/// Application layer: register formatting logic.
pub mod application;

/// Infrastructure layer: WebSocket server, Modbus transport, config file.
pub mod infrastructure;
