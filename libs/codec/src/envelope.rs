//! WebSocket JSON envelope: `{"address": "/…", "data": …}`

use crate::error::{CodecError, Result};
use crate::osc::probe_json;
use ricochet_types::{Address, Payload, UnknownAddress};
use serde::Serialize;
use serde_json::Value;

/// A routed message as it travels over a WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub address: Address,
    pub data: Payload,
}

impl Envelope {
    pub fn new(address: Address, data: Payload) -> Self {
        Self { address, data }
    }

    /// Serialize for a text frame.
    pub fn to_text(&self) -> String {
        // Address serializes as a plain string and data is already a Value,
        // so this cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse an inbound text frame.
    ///
    /// Text that is not JSON at all yields [`CodecError::RawText`] so the
    /// caller can treat it as the legacy raw-text protocol. String `data` is
    /// probed as JSON, mirroring what the OSC side does with its content.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|_| CodecError::RawText(text.to_string()))?;

        let Value::Object(mut map) = value else {
            return Err(CodecError::malformed("expected a JSON object"));
        };

        let address = match map.remove("address") {
            Some(Value::String(wire)) => {
                Address::parse(&wire).ok_or(CodecError::UnknownAddress(UnknownAddress(wire)))?
            }
            Some(_) => return Err(CodecError::malformed("`address` must be a string")),
            None => return Err(CodecError::malformed("missing `address`")),
        };

        let data = match map.remove("data") {
            Some(Value::String(text)) => probe_json(&text),
            Some(other) => other,
            None => Value::Null,
        };

        Ok(Self { address, data })
    }
}
