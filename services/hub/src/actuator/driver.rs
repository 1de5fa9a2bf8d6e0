//! Motor drivers
//!
//! The controller decides speeds; a driver puts them on the wire.

use super::motor::Channel;
use crate::osc::OscPublisher;
use parking_lot::Mutex;
use ricochet_types::{Address, BraceletId};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::trace;

/// Sink for motor speed changes.
pub trait MotorDriver: Send {
    fn set_speed(&mut self, bracelet: &BraceletId, channel: Channel, speed: u8);
}

/// Publishes `/braceletMotor` to the OSC peer, which relays it to the
/// bracelet firmware.
#[derive(Debug, Clone)]
pub struct OscMotorDriver {
    osc: OscPublisher,
}

impl OscMotorDriver {
    pub fn new(osc: OscPublisher) -> Self {
        Self { osc }
    }
}

impl MotorDriver for OscMotorDriver {
    fn set_speed(&mut self, bracelet: &BraceletId, channel: Channel, speed: u8) {
        trace!("Motor {} {} -> {}", bracelet, channel, speed);
        self.osc.send(
            Address::BraceletMotor,
            &json!({
                "ip": bracelet.ip,
                "port": bracelet.port,
                "channel": channel,
                "speed": speed,
            }),
        );
    }
}

/// One speed change as seen by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorCommand {
    pub bracelet: BraceletId,
    pub channel: Channel,
    pub speed: u8,
}

/// Driver that only remembers what it was told. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    log: Arc<Mutex<Vec<MotorCommand>>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<MotorCommand> {
        self.log.lock().clone()
    }

    pub fn last(&self) -> Option<MotorCommand> {
        self.log.lock().last().copied()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl MotorDriver for RecordingDriver {
    fn set_speed(&mut self, bracelet: &BraceletId, channel: Channel, speed: u8) {
        self.log.lock().push(MotorCommand {
            bracelet: *bracelet,
            channel,
            speed,
        });
    }
}
