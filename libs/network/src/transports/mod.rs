//! Transport Layer
//!
//! Socket-level transports used by the hub. Only datagrams are needed: the
//! WebSocket/HTTP side is served by the hub service itself.

pub mod udp;

pub use udp::{UdpConfig, UdpTransport, MAX_UDP_PAYLOAD};
