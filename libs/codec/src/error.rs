//! Codec errors
//!
//! Every variant is recoverable: callers log and drop the offending frame.

use ricochet_types::UnknownAddress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Datagram is not a valid OSC packet
    #[error("OSC decode error: {message}")]
    OscDecode { message: String },

    /// Message could not be encoded as OSC
    #[error("OSC encode error: {message}")]
    OscEncode { message: String },

    /// Bundle without any inner message
    #[error("OSC bundle contains no message")]
    EmptyBundle,

    /// Text frame that is not JSON at all (legacy raw-text protocol)
    #[error("raw text frame: {0:?}")]
    RawText(String),

    /// JSON that does not have the `{address, data}` shape
    #[error("malformed envelope: {message}")]
    MalformedEnvelope { message: String },

    #[error(transparent)]
    UnknownAddress(#[from] UnknownAddress),

    /// Webhook body missing a field or carrying an unusable value
    #[error("invalid body: {message}")]
    InvalidBody { message: String },
}

impl CodecError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            message: message.into(),
        }
    }

    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::InvalidBody {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
