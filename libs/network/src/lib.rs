//! Network Infrastructure
//!
//! Datagram transport and transport errors for the Ricochet hub. Wire
//! formats live in `ricochet-codec`; this crate only moves bytes.

pub mod error;
pub mod transports;

pub use error::{Result, TransportError};
pub use transports::{UdpConfig, UdpTransport};

// Constants for configuration
pub const DEFAULT_UDP_BUFFER_SIZE: usize = 64 * 1024; // 64KB
