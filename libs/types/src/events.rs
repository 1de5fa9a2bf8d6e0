//! Typed payloads carried by catalog addresses
//!
//! Transports move payloads around as JSON values; handlers decode them into
//! these structs at the point of use. Numeric fields accept either JSON
//! numbers or numeric strings because browser forms and the sensing layer
//! both send ids as text.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::net::IpAddr;

/// Decode a payload into a typed event.
pub fn decode<T: DeserializeOwned>(payload: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(payload)
}

/// Cube (prop) event: connect, disconnect, touch, drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeEvent {
    #[serde(rename = "idCube", alias = "cubeId", deserialize_with = "lenient::de_u32")]
    pub id: u32,

    #[serde(
        rename = "idSound",
        alias = "faceId",
        alias = "idFace",
        default,
        deserialize_with = "lenient::de_opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub sound_id: Option<u32>,
}

impl CubeEvent {
    pub fn new(id: u32) -> Self {
        Self { id, sound_id: None }
    }

    pub fn with_sound(id: u32, sound_id: u32) -> Self {
        Self {
            id,
            sound_id: Some(sound_id),
        }
    }

    /// Accepts either an object or a bare id (the sensing layer sends the
    /// id alone for touch/drag events).
    pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
        match payload {
            Value::Object(_) => decode(payload),
            other => Ok(Self::new(lenient::de_u32(other)?)),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Identity of a bracelet: the address its firmware announced itself from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BraceletId {
    #[serde(alias = "braceletIp")]
    pub ip: IpAddr,

    #[serde(alias = "braceletPort", deserialize_with = "lenient::de_u16")]
    pub port: u16,
}

impl BraceletId {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for BraceletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// A note played by the renderer; drives the bracelet motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    #[serde(deserialize_with = "lenient::de_u8")]
    pub note: u8,

    /// Target bracelet; every bracelet when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracelet: Option<BraceletId>,
}

impl NoteEvent {
    /// Accepts `{note, bracelet?}`, `{note, braceletIp, braceletPort}` or
    /// a bare note number.
    pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
        match payload {
            Value::Object(map) => {
                let mut event: NoteEvent = decode(payload)?;
                if event.bracelet.is_none()
                    && (map.contains_key("braceletIp") || map.contains_key("ip"))
                {
                    event.bracelet = Some(decode(payload)?);
                }
                Ok(event)
            }
            other => Ok(Self {
                note: lenient::de_u8(other)?,
                bracelet: None,
            }),
        }
    }
}

/// Status flag payload (`true`/`false`, or the strings/numbers the sensing
/// layer sometimes sends instead).
pub fn decode_flag(payload: &Value) -> Option<bool> {
    match payload {
        Value::Bool(flag) => Some(*flag),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) mod lenient {
    use serde::de::{self, Deserializer};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u64),
        Text(String),
    }

    fn to_u64<E: de::Error>(value: NumOrString) -> Result<u64, E> {
        match value {
            NumOrString::Num(n) => Ok(n),
            NumOrString::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected an integer, got {:?}", s))),
        }
    }

    fn narrow<T: TryFrom<u64>, E: de::Error>(n: u64) -> Result<T, E> {
        T::try_from(n).map_err(|_| E::custom(format!("integer {} out of range", n)))
    }

    pub fn de_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        narrow(to_u64(NumOrString::deserialize(d)?)?)
    }

    pub fn de_u16<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
        narrow(to_u64(NumOrString::deserialize(d)?)?)
    }

    pub fn de_u8<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        narrow(to_u64(NumOrString::deserialize(d)?)?)
    }

    pub fn de_opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        match Option::<NumOrString>::deserialize(d)? {
            Some(value) => narrow(to_u64(value)?).map(Some),
            None => Ok(None),
        }
    }
}
