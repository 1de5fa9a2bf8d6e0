//! OSC Packet Codec
//!
//! The sensing layer speaks plain OSC: a message carries an address and at
//! most one meaningful argument, the content. openFrameworks sometimes wraps
//! that message in a bundle; bundles are unwrapped to their first inner
//! message so both framings produce the same `(address, payload)` pair.
//!
//! String content is probed as JSON. When it does not parse it travels on as
//! a raw string; that is never an error.

use crate::error::{CodecError, Result};
use ricochet_types::Payload;
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};
use serde_json::Value;

/// An OSC message reduced to what the hub routes on.
#[derive(Debug, Clone, PartialEq)]
pub struct OscFrame {
    /// Raw address string, not yet checked against the catalog
    pub address: String,
    pub payload: Payload,
}

/// Parse `text` as JSON, falling back to a JSON string holding the text.
pub fn probe_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Decode one UDP datagram.
pub fn decode_datagram(datagram: &[u8]) -> Result<OscFrame> {
    let (_, packet) = rosc::decoder::decode_udp(datagram).map_err(|e| CodecError::OscDecode {
        message: format!("{:?}", e),
    })?;
    frame_from_packet(packet)
}

/// Reduce a packet to a frame, unwrapping bundle framing.
pub fn frame_from_packet(packet: OscPacket) -> Result<OscFrame> {
    let message = unwrap_bundle(packet)?;
    let payload = content_to_payload(message.args.first());
    Ok(OscFrame {
        address: message.addr,
        payload,
    })
}

fn unwrap_bundle(packet: OscPacket) -> Result<OscMessage> {
    match packet {
        OscPacket::Message(message) => Ok(message),
        OscPacket::Bundle(bundle) => match bundle.content.into_iter().next() {
            Some(inner) => unwrap_bundle(inner),
            None => Err(CodecError::EmptyBundle),
        },
    }
}

fn content_to_payload(content: Option<&OscType>) -> Payload {
    match content {
        None | Some(OscType::Nil) => Value::Null,
        Some(OscType::String(text)) => probe_json(text),
        Some(OscType::Int(n)) => Value::from(*n),
        Some(OscType::Long(n)) => Value::from(*n),
        Some(OscType::Float(f)) => Value::from(*f as f64),
        Some(OscType::Double(f)) => Value::from(*f),
        Some(OscType::Bool(flag)) => Value::Bool(*flag),
        Some(OscType::Char(c)) => Value::String(c.to_string()),
        Some(other) => Value::String(format!("{:?}", other)),
    }
}

/// Wire content for outbound data: strings go out verbatim, other JSON is
/// serialized, `null` means no argument.
pub fn payload_to_content(data: &Value) -> Option<String> {
    match data {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

pub fn build_message(address: &str, content: Option<String>) -> OscMessage {
    OscMessage {
        addr: address.to_string(),
        args: content.map(OscType::String).into_iter().collect(),
    }
}

/// Encode a single message datagram.
pub fn encode_message(address: &str, content: Option<String>) -> Result<Vec<u8>> {
    encode_packet(&OscPacket::Message(build_message(address, content)))
}

/// Encode a message wrapped in a one-element bundle.
pub fn encode_bundle(address: &str, content: Option<String>, timetag: OscTime) -> Result<Vec<u8>> {
    let bundle = OscBundle {
        timetag,
        content: vec![OscPacket::Message(build_message(address, content))],
    };
    encode_packet(&OscPacket::Bundle(bundle))
}

fn encode_packet(packet: &OscPacket) -> Result<Vec<u8>> {
    rosc::encoder::encode(packet).map_err(|e| CodecError::OscEncode {
        message: format!("{:?}", e),
    })
}
