//! WebSocket client roles

use crate::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical category of a WebSocket client. Each role holds at most one live
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    WebRenderer,
    Gallery,
}

impl Role {
    /// Address raised on the router when this role connects or disconnects.
    pub fn status_address(self) -> Address {
        match self {
            Role::WebRenderer => Address::WebRenderStatusChange,
            Role::Gallery => Address::GalleryStatusChange,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::WebRenderer => "web_renderer",
            Role::Gallery => "gallery",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
