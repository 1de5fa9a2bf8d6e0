//! HTTP webhook bodies and responses
//!
//! Webhook bodies use the field names of the physical devices' firmware
//! (`cubeId`, `faceId`, `braceletIp`, `braceletPort`). They are normalized
//! here into the canonical payload each address carries on the router.

use crate::error::{CodecError, Result};
use ricochet_types::{decode, Address, BraceletId, CubeEvent, NoteEvent, Payload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of every webhook response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookReply {
    pub success: bool,
    pub message: String,
}

impl WebhookReply {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: "200".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Turn a raw webhook body into the payload for `address`.
pub fn normalize_body(address: Address, body: &[u8]) -> Result<Payload> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .map_err(|e| CodecError::invalid_body(format!("body is not JSON: {}", e)))?
    };

    match address {
        Address::CubeConnected => {
            let cube: CubeEvent = decode(&value).map_err(field_error)?;
            if cube.sound_id.is_none() {
                return Err(CodecError::invalid_body("missing field `faceId`"));
            }
            Ok(cube.to_value())
        }
        Address::CubeDisconnected
        | Address::CubeTouched
        | Address::CubeDragged
        | Address::CubeDragOut => {
            let cube: CubeEvent = decode(&value).map_err(field_error)?;
            Ok(cube.to_value())
        }
        Address::BraceletConnected | Address::BraceletDisconnected => {
            let bracelet: BraceletId = decode(&value).map_err(field_error)?;
            serde_json::to_value(bracelet).map_err(field_error)
        }
        Address::NotePlayed => {
            let note = NoteEvent::from_payload(&value).map_err(field_error)?;
            serde_json::to_value(note).map_err(field_error)
        }
        _ => Ok(value),
    }
}

fn field_error(e: serde_json::Error) -> CodecError {
    CodecError::invalid_body(e.to_string())
}
