//! # Ricochet Types
//!
//! Shared vocabulary for the installation hub: the closed address catalog,
//! WebSocket client roles, and the typed payloads carried by catalog
//! addresses.
//!
//! ```rust
//! use ricochet_types::{Address, CubeEvent};
//!
//! assert!(Address::is_valid("/cubeConnected"));
//! assert_eq!(Address::parse("/playCube"), Some(Address::PlayCube));
//!
//! let cube = CubeEvent::with_sound(5, 2);
//! assert_eq!(cube.to_value()["idCube"], 5);
//! ```

pub mod address;
pub mod events;
pub mod role;

pub use address::{Address, UnknownAddress};
pub use events::{decode, decode_flag, BraceletId, CubeEvent, NoteEvent};
pub use role::Role;

/// Payload carried alongside an address on every transport.
pub type Payload = serde_json::Value;
