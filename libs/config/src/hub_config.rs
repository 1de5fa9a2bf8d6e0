//! Hub Configuration Module
//!
//! Layered configuration for the hub: built-in defaults, then an optional
//! TOML file, then `RICOCHET_*` environment variables (nested keys joined
//! with `__`, e.g. `RICOCHET_OSC__PEER_ADDRESS=10.0.0.2:5555`).

use crate::defaults;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use ricochet_types::Role;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main hub configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    pub http: HttpConfig,
    pub osc: OscConfig,
    pub origins: OriginConfig,
    pub actuator: ActuatorConfig,

    /// JSON document holding saved compositions
    pub compositions_path: PathBuf,

    /// Time given to the shutdown notification before the process exits
    pub shutdown_grace_ms: u64,
}

/// HTTP/WebSocket server settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_address: String,
    pub port: u16,
    /// Renderer assets served at `/`
    pub static_dir: PathBuf,
    pub max_body_bytes: u64,
}

/// OSC endpoints
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OscConfig {
    pub listen_address: SocketAddr,
    pub peer_address: SocketAddr,
}

/// WebSocket origin allow-list, one list per role
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OriginConfig {
    pub web_renderer: Vec<String>,
    pub gallery: Vec<String>,
}

/// Bracelet motor decay settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ActuatorConfig {
    pub tick_interval_ms: u64,
    pub decay_velocity: f32,
    pub speed_floor: f32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            osc: OscConfig::default(),
            origins: OriginConfig::default(),
            actuator: ActuatorConfig::default(),
            compositions_path: PathBuf::from(defaults::COMPOSITIONS_PATH),
            shutdown_grace_ms: defaults::SHUTDOWN_GRACE_MS,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: defaults::http::BIND_ADDRESS.to_string(),
            port: defaults::http::PORT,
            static_dir: PathBuf::from(defaults::http::STATIC_DIR),
            max_body_bytes: defaults::http::MAX_BODY_BYTES,
        }
    }
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 4444)),
            peer_address: SocketAddr::from(([127, 0, 0, 1], 5555)),
        }
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            web_renderer: owned(defaults::origins::WEB_RENDERER),
            gallery: owned(defaults::origins::GALLERY),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: defaults::actuator::TICK_INTERVAL_MS,
            decay_velocity: defaults::actuator::DECAY_VELOCITY,
            speed_floor: defaults::actuator::SPEED_FLOOR,
        }
    }
}

impl OriginConfig {
    /// Role admitted for a WebSocket `Origin` header, if any.
    pub fn role_for(&self, origin: &str) -> Option<Role> {
        if self.web_renderer.iter().any(|o| o == origin) {
            Some(Role::WebRenderer)
        } else if self.gallery.iter().any(|o| o == origin) {
            Some(Role::Gallery)
        } else {
            None
        }
    }
}

impl ActuatorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl HubConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&HubConfig::default()).context("Failed to seed default configuration")?,
        );

        if let Some(path) = path {
            info!("Loading hub config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("RICOCHET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: HubConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!("Hub configuration: {:?}", config);
        Ok(config)
    }

    /// Reject settings the hub cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.actuator.tick_interval_ms == 0 {
            bail!("actuator.tick_interval_ms must be greater than zero");
        }
        if !(self.actuator.decay_velocity > 0.0) {
            bail!("actuator.decay_velocity must be positive");
        }
        let floor = self.actuator.speed_floor;
        if !(floor > 0.0 && floor < 255.0) {
            bail!("actuator.speed_floor must be within (0, 255)");
        }
        if let Some(shared) = self
            .origins
            .web_renderer
            .iter()
            .find(|o| self.origins.gallery.contains(o))
        {
            bail!("origin {} is listed for more than one role", shared);
        }
        Ok(())
    }

    /// `bind_address:port` of the HTTP server
    pub fn http_socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.http.bind_address, self.http.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}", self.http.bind_address))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
