//! WebSocket and HTTP side of the hub.
//!
//! Browser clients connect over `/ws` and are admitted into a [`Role`] by
//! their `Origin`; each role holds at most one live connection. Devices
//! post webhooks instead.
//!
//! [`Role`]: ricochet_types::Role

pub mod connections;
pub mod server;
pub mod webhooks;

pub use connections::{RoleConnection, RoleConnections};
pub use server::{routes, serve, ServerState};
