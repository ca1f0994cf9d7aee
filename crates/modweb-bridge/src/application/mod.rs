//! Application layer for modweb-bridge.
//!
//! Pure logic with no I/O side effects and no async dependencies: turning a
//! run of register values into the display string pushed to viewers.  Socket
//! handling and task spawning belong to the infrastructure layer.

pub mod render;

pub use render::format_registers;
