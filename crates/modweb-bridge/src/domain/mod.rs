//! Domain layer for modweb-bridge.
//!
//! Pure types with no dependencies on I/O, networking, or the async runtime:
//! the viewer-facing JSON message envelope and the per-process configuration
//! struct.  Everything here is constructible and assertable in a plain unit
//! test.

pub mod config;
pub mod messages;

pub use config::BridgeConfig;
pub use messages::ViewerMessage;
