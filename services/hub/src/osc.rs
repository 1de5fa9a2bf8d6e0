//! OSC bridge to the sensing layer
//!
//! Inbound datagrams are decoded, checked against the address catalog and
//! forwarded to the controller loop. Outbound messages are queued on an
//! [`OscPublisher`] and written by a sender task to the fixed peer; sends
//! are fire-and-forget.

use crate::error::Result;
use crate::hub::Inbound;
use ricochet_codec::osc::{decode_datagram, encode_message, payload_to_content};
use ricochet_config::OscConfig;
use ricochet_network::{UdpConfig, UdpTransport};
use ricochet_types::{Address, CubeEvent, Payload};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A message waiting for the sender task.
#[derive(Debug, Clone, PartialEq)]
pub struct OscOutbound {
    pub address: Address,
    pub content: Option<String>,
}

/// Handle for publishing to the OSC peer. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OscPublisher {
    tx: mpsc::UnboundedSender<OscOutbound>,
}

impl OscPublisher {
    pub fn new(tx: mpsc::UnboundedSender<OscOutbound>) -> Self {
        Self { tx }
    }

    /// A publisher whose messages land in the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OscOutbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Queue `data` for `address`. Strings travel verbatim, other JSON is
    /// serialized, `null` sends the bare address.
    pub fn send(&self, address: Address, data: &Value) {
        let outbound = OscOutbound {
            address,
            content: payload_to_content(data),
        };
        if self.tx.send(outbound).is_err() {
            warn!("OSC sender stopped, dropping {}", address);
        }
    }

    /// `/serverConnected` or `/serverDisconnected`
    pub fn send_server_status(&self, connected: bool) {
        let address = if connected {
            Address::ServerConnected
        } else {
            Address::ServerDisconnected
        };
        self.send(address, &Value::Null);
    }

    /// `/webRenderConnected` or `/webRenderDisconnected`
    pub fn send_web_render_status(&self, connected: bool) {
        let address = if connected {
            Address::WebRenderConnected
        } else {
            Address::WebRenderDisconnected
        };
        self.send(address, &Value::Null);
    }

    pub fn send_cube_event(&self, address: Address, cube: &CubeEvent) {
        self.send(address, &cube.to_value());
    }
}

/// Running OSC bridge tasks.
pub struct OscTransport {
    pub local_addr: SocketAddr,
    pub receiver: JoinHandle<()>,
    pub sender: JoinHandle<()>,
}

impl OscTransport {
    /// Bind the listener and the sender socket, then spawn both tasks.
    pub async fn start(
        config: &OscConfig,
        inbound: mpsc::UnboundedSender<Inbound>,
        outbound: mpsc::UnboundedReceiver<OscOutbound>,
    ) -> Result<Self> {
        let listener = Arc::new(UdpTransport::new(UdpConfig::listener(config.listen_address)).await?);
        let local_addr = listener.local_addr()?;
        let peer = UdpTransport::new(UdpConfig::sender(config.peer_address)).await?;

        info!(
            "OSC bridge listening on {}, publishing to {}",
            local_addr, config.peer_address
        );

        let receiver = tokio::spawn(receive_loop(listener, inbound));
        let sender = tokio::spawn(send_loop(peer, outbound));

        Ok(Self {
            local_addr,
            receiver,
            sender,
        })
    }
}

/// Pause after a failed receive
const RECEIVE_BACKOFF: Duration = Duration::from_millis(100);
/// Failed receives in a row before the listener gives up
const MAX_CONSECUTIVE_FAILURES: usize = 50;

/// Tracks failed receives in a row.
#[derive(Debug, Default)]
struct ReceiveFailures {
    consecutive_failures: usize,
}

impl ReceiveFailures {
    fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// How long to wait before the next receive, `None` once the cap is hit.
    fn record_failure(&mut self) -> Option<Duration> {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            None
        } else {
            Some(RECEIVE_BACKOFF)
        }
    }
}

async fn receive_loop(listener: Arc<UdpTransport>, inbound: mpsc::UnboundedSender<Inbound>) {
    let mut failures = ReceiveFailures::default();
    loop {
        let (datagram, peer) = match listener.receive_from().await {
            Ok(received) => {
                failures.record_success();
                received
            }
            Err(e) if e.is_retryable() => {
                warn!("OSC receive failed: {}", e);
                match failures.record_failure() {
                    Some(pause) => {
                        tokio::time::sleep(pause).await;
                        continue;
                    }
                    None => {
                        error!(
                            "OSC listener failed {} times in a row, stopping",
                            failures.consecutive_failures
                        );
                        break;
                    }
                }
            }
            Err(e) => {
                error!("OSC listener failed: {}", e);
                break;
            }
        };

        let Some((address, payload)) = parse_datagram(&datagram, peer) else {
            continue;
        };

        if inbound
            .send(Inbound::Osc {
                address,
                payload,
                peer,
            })
            .is_err()
        {
            info!("Controller gone, OSC receiver stopping");
            break;
        }
    }
}

/// Decode and validate one datagram; failures are logged and dropped.
pub fn parse_datagram(datagram: &[u8], peer: SocketAddr) -> Option<(Address, Payload)> {
    let frame = match decode_datagram(datagram) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Dropping OSC datagram from {}: {}", peer, e);
            return None;
        }
    };
    match Address::parse(&frame.address) {
        Some(address) => {
            debug!("OSC {} from {}: {}", address, peer, frame.payload);
            Some((address, frame.payload))
        }
        None => {
            warn!("OSC address {} from {} is not valid", frame.address, peer);
            None
        }
    }
}

async fn send_loop(peer: UdpTransport, mut outbound: mpsc::UnboundedReceiver<OscOutbound>) {
    while let Some(message) = outbound.recv().await {
        let datagram = match encode_message(message.address.as_str(), message.content) {
            Ok(datagram) => datagram,
            Err(e) => {
                error!("Failed to encode OSC {}: {}", message.address, e);
                continue;
            }
        };
        if let Err(e) = peer.send(&datagram).await {
            warn!("OSC send {} failed: {}", message.address, e);
        }
    }
    debug!("OSC sender stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ricochet_codec::osc::encode_bundle;
    use rosc::OscTime;
    use serde_json::json;

    fn peer() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn test_receive_failures_back_off_then_give_up() {
        let mut failures = ReceiveFailures::default();
        for _ in 1..MAX_CONSECUTIVE_FAILURES {
            assert_eq!(failures.record_failure(), Some(RECEIVE_BACKOFF));
        }
        assert_eq!(failures.record_failure(), None);

        failures.record_success();
        assert_eq!(failures.record_failure(), Some(RECEIVE_BACKOFF));
    }

    #[test]
    fn test_publisher_helpers() {
        let (osc, mut rx) = OscPublisher::channel();
        osc.send_server_status(false);
        osc.send_cube_event(Address::CubeConnected, &CubeEvent::with_sound(5, 2));
        osc.send(Address::PlayCube, &json!("raw"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.address, Address::ServerDisconnected);
        assert_eq!(first.content, None);

        let second = rx.try_recv().unwrap();
        assert_eq!(second.content.as_deref(), Some(r#"{"idCube":5,"idSound":2}"#));

        assert_eq!(rx.try_recv().unwrap().content.as_deref(), Some("raw"));
    }

    #[test]
    fn test_parse_datagram_drops_unknown_address() {
        let datagram = encode_message("/notInCatalog", Some("1".into())).unwrap();
        assert!(parse_datagram(&datagram, peer()).is_none());
        assert!(parse_datagram(b"garbage", peer()).is_none());
    }

    #[test]
    fn test_parse_bundle_like_message() {
        let timetag = OscTime {
            seconds: 1,
            fractional: 0,
        };
        let bundled = encode_bundle("/cubeTouched", Some(r#"{"idCube":1}"#.into()), timetag).unwrap();
        let (address, payload) = parse_datagram(&bundled, peer()).unwrap();
        assert_eq!(address, Address::CubeTouched);
        assert_eq!(payload, json!({"idCube": 1}));
    }

    #[test]
    fn test_send_after_sender_stopped_does_not_panic() {
        let (osc, rx) = OscPublisher::channel();
        drop(rx);
        osc.send_server_status(true);
    }
}
