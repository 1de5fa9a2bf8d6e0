//! UDP Network Transport Implementation
//!
//! Datagram transport for the OSC bridge. Each datagram is one OSC packet, so
//! no extra framing is added on the wire. Receives wait indefinitely (the
//! listener loop has nothing else to do); sends are bounded by the
//! configured timeout and never retried.

use crate::{Result, TransportError};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

/// Largest payload an IPv4 UDP datagram can carry
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// UDP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    /// Local address to bind to
    pub bind_address: SocketAddr,
    /// Remote address for connected mode (optional)
    pub remote_address: Option<SocketAddr>,
    /// Buffer size for reading
    pub buffer_size: usize,
    /// Maximum message size
    pub max_message_size: usize,
    /// Send timeout
    pub send_timeout: Duration,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 0)),
            remote_address: None,
            buffer_size: crate::DEFAULT_UDP_BUFFER_SIZE,
            max_message_size: MAX_UDP_PAYLOAD,
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl UdpConfig {
    /// Listener bound to `bind_address`, unconnected.
    pub fn listener(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Self::default()
        }
    }

    /// Sender on an ephemeral port, connected to `remote`.
    pub fn sender(remote: SocketAddr) -> Self {
        let bind_address = if remote.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        Self {
            bind_address,
            remote_address: Some(remote),
            ..Self::default()
        }
    }
}

/// UDP transport for datagram communication
pub struct UdpTransport {
    config: UdpConfig,
    socket: Arc<UdpSocket>,
    recv_buffer: Arc<Mutex<BytesMut>>,
}

impl UdpTransport {
    /// Create new UDP transport
    /// Note: This must be called from within a tokio runtime context
    pub async fn new(config: UdpConfig) -> Result<Self> {
        if config.max_message_size > MAX_UDP_PAYLOAD {
            return Err(TransportError::configuration(
                format!("UDP max message size cannot exceed {} bytes", MAX_UDP_PAYLOAD),
                Some("max_message_size"),
            ));
        }

        let socket = UdpSocket::bind(config.bind_address).await.map_err(|e| {
            TransportError::network_with_source(
                format!("Failed to bind UDP socket on {}", config.bind_address),
                e,
            )
        })?;

        if let Some(remote) = config.remote_address {
            socket.connect(remote).await.map_err(|e| {
                TransportError::network_with_source(
                    format!("Failed to connect UDP socket to {}", remote),
                    e,
                )
            })?;
            info!("UDP socket connected to: {}", remote);
        }

        info!("UDP transport bound on: {}", socket.local_addr()?);

        Ok(Self {
            recv_buffer: Arc::new(Mutex::new(BytesMut::with_capacity(config.buffer_size))),
            config,
            socket: Arc::new(socket),
        })
    }

    fn check_size(&self, data: &[u8]) -> Result<()> {
        if data.len() > self.config.max_message_size {
            return Err(TransportError::protocol(format!(
                "Message size {} exceeds maximum {}",
                data.len(),
                self.config.max_message_size
            )));
        }
        Ok(())
    }

    /// Send one datagram to the connected remote
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        self.check_size(data)?;
        let remote = self.config.remote_address;
        if remote.is_none() {
            return Err(TransportError::configuration(
                "send() needs a connected socket",
                Some("remote_address"),
            ));
        }

        let timeout_ms = self.config.send_timeout.as_millis() as u64;
        let bytes_sent = timeout(self.config.send_timeout, self.socket.send(data))
            .await
            .map_err(|_| TransportError::timeout("UDP send", timeout_ms))?
            .map_err(|e| TransportError::network_with_source("Failed to send UDP packet", e))?;

        debug!("Sent UDP packet to {:?}: {} bytes", remote, bytes_sent);
        Ok(())
    }

    /// Receive one datagram from any peer (returns data and sender address)
    pub async fn receive_from(&self) -> Result<(Bytes, SocketAddr)> {
        let mut buffer = self.recv_buffer.lock().await;
        buffer.resize(self.config.buffer_size, 0);

        let (bytes_received, sender) = self
            .socket
            .recv_from(&mut buffer)
            .await
            .map_err(|e| TransportError::network_with_source("Failed to receive UDP packet", e))?;

        let payload = Bytes::copy_from_slice(&buffer[..bytes_received]);

        debug!("Received UDP packet from {}: {} bytes", sender, bytes_received);
        Ok((payload, sender))
    }

    /// Get local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| TransportError::network_with_source("Failed to get local address", e))
    }
}
