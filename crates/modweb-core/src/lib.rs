//! modweb-core library crate.
//!
//! This crate defines the register-access capability that the ModWeb bridge
//! polls against, together with the pure Modbus TCP frame codec backing the
//! one concrete implementation.
//!
//! # Layer rules
//!
//! - `registers` contains the `RegisterClient` trait and its error taxonomy.
//!   The trait is the *only* surface the streaming session depends on; it
//!   never sees wire framing, byte order, or transport details.
//! - `registers::codec` is sans-io: it builds request frames and parses
//!   response frames as plain byte slices.  All socket handling lives in the
//!   bridge crate's infrastructure layer.
//!
//! Keeping the codec free of I/O makes it trivially unit-testable and lets
//! an alternative transport (RTU over serial, a second protocol library)
//! provide its own `RegisterClient` implementation without touching the
//! session code.

/// Register access capability: trait, errors, and the Modbus frame codec.
pub mod registers;

pub use registers::{ConnError, ReadError, RegisterClient};
