//! # Ricochet Configuration
//!
//! Configuration loading and default values for the hub.
//!
//! ```rust,no_run
//! use ricochet_config::HubConfig;
//!
//! let config = HubConfig::load(None)?;
//! println!("OSC peer: {}", config.osc.peer_address);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod hub_config;

pub use hub_config::{ActuatorConfig, HttpConfig, HubConfig, OriginConfig, OscConfig};
