//! Error types for the hub service

use ricochet_network::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] warp::Error),

    #[error("Composition store error: {message}")]
    Store { message: String },
}

impl HubError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
