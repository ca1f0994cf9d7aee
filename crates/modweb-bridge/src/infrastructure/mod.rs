//! Infrastructure layer for modweb-bridge.
//!
//! Everything that touches the outside world lives here:
//!
//! - Binding the TCP listener and upgrading viewer connections to WebSocket
//! - Running the per-session streaming state machine
//! - Speaking Modbus TCP to the device
//! - Reading (and creating) the TOML config file
//!
//! Message shapes and formatting rules stay in the domain and application
//! layers; this layer only moves them.

pub mod config_file;
pub mod modbus_conn;
pub mod ws_server;

pub use config_file::{load_or_create, FileConfig};
pub use modbus_conn::TcpRegisterClient;
pub use ws_server::run_server;
