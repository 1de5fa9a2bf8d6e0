//! Default configuration values
//!
//! Values the installation shipped with; every one can be overridden from
//! the config file or `RICOCHET_*` environment variables.

/// HTTP/WebSocket server defaults
pub mod http {
    pub const BIND_ADDRESS: &str = "0.0.0.0";
    pub const PORT: u16 = 8080;
    pub const STATIC_DIR: &str = "public";

    /// Webhook bodies are small JSON documents
    pub const MAX_BODY_BYTES: u64 = 64 * 1024;
}

/// OSC bridge defaults
pub mod osc {
    /// Where openFrameworks sends to us
    pub const LISTEN_ADDRESS: &str = "0.0.0.0:4444";
    /// Where we send to openFrameworks
    pub const PEER_ADDRESS: &str = "127.0.0.1:5555";
}

/// Allowed WebSocket origins per role
pub mod origins {
    pub const WEB_RENDERER: &[&str] = &["http://localhost:8080", "http://localhost:9966"];
    pub const GALLERY: &[&str] = &["http://localhost:3000"];
}

/// Bracelet motor decay
pub mod actuator {
    pub const TICK_INTERVAL_MS: u64 = 50;
    /// Speed removed per tick
    pub const DECAY_VELOCITY: f32 = 15.0;
    /// Below this a channel goes idle
    pub const SPEED_FLOOR: f32 = 1.0;
}

pub const COMPOSITIONS_PATH: &str = "data/compositions.json";

/// Time given to the "server going down" OSC message before exit
pub const SHUTDOWN_GRACE_MS: u64 = 200;
