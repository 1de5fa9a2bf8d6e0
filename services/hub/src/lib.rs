//! # Ricochet Hub
//!
//! Central hub of the installation. It bridges the sensing layer
//! (openFrameworks over OSC/UDP) with the browser clients (web renderer and
//! gallery over WebSocket) and the devices that report through HTTP
//! webhooks (cubes, bracelets).
//!
//! ## Layout
//!
//! - [`router`]: single-subscriber address → handler table
//! - [`hub`]: the controller loop owning all domain state
//! - [`handlers`]: what the installation does for each address
//! - [`osc`], [`socket`]: transports feeding the controller
//! - [`registry`], [`actuator`], [`compositions`]: domain state
//!
//! Transports never share state with the controller; they exchange
//! [`hub::Inbound`] events and outbound channel messages.

pub mod actuator;
pub mod compositions;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod osc;
pub mod registry;
pub mod router;
pub mod shutdown;
pub mod socket;

pub use error::{HubError, Result};
pub use hub::{Controller, Hub, Inbound, Source};
pub use router::{EventRouter, Handler};
