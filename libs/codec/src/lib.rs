//! # Ricochet Codec
//!
//! Wire formats spoken by the hub's transports:
//!
//! - [`osc`]: OSC datagrams from and to the sensing layer, with bundle
//!   unwrapping and JSON probing of string content
//! - [`envelope`]: `{address, data}` JSON text frames on WebSockets
//! - [`webhook`]: HTTP webhook bodies and the `{success, message}` reply
//!
//! Nothing here touches a socket; transports live in `ricochet-network` and
//! the hub service.

pub mod envelope;
pub mod error;
pub mod osc;
pub mod webhook;

pub use envelope::Envelope;
pub use error::{CodecError, Result};
pub use osc::{decode_datagram, encode_message, payload_to_content, probe_json, OscFrame};
pub use webhook::{normalize_body, WebhookReply};
