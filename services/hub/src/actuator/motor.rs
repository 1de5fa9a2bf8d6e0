//! Motor channel state machine
//!
//! Each bracelet channel is Idle (speed 0, inactive) or Ramping (speed > 0,
//! active, decaying). Notes ratchet the speed up: a note only takes effect
//! when its level is above the current speed. Every decay tick removes a
//! fixed amount; once the speed drops below the floor the channel snaps to
//! 0 and goes Idle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

pub const MAX_SPEED: f32 = 255.0;

/// Motor channel of a bracelet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Left => "left",
            Channel::Right => "right",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a note does to a motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteMapping {
    pub channel: Channel,
    pub level: f32,
    pub duration: Duration,
}

const LOW: f32 = 85.0;
const MEDIUM: f32 = 170.0;
const HIGH: f32 = MAX_SPEED;

/// Note table: notes 0-2 drive the left motor, 3-5 the right one, each at
/// low/medium/high intensity.
pub fn note_mapping(note: u8) -> Option<NoteMapping> {
    let (channel, level, millis) = match note {
        0 => (Channel::Left, LOW, 150),
        1 => (Channel::Left, MEDIUM, 300),
        2 => (Channel::Left, HIGH, 500),
        3 => (Channel::Right, LOW, 150),
        4 => (Channel::Right, MEDIUM, 300),
        5 => (Channel::Right, HIGH, 500),
        _ => return None,
    };
    Some(NoteMapping {
        channel,
        level,
        duration: Duration::from_millis(millis),
    })
}

/// Decay tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayParams {
    /// Speed removed per tick
    pub velocity: f32,
    /// Below this the channel goes idle
    pub floor: f32,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            velocity: 15.0,
            floor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOutcome {
    /// Quieter than the current speed
    Ignored,
    /// Speed raised; `started` is true when the channel was idle
    Raised { started: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayOutcome {
    Decaying(f32),
    Idle,
}

/// State of one motor channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorState {
    speed: f32,
    active: bool,
    target_duration: Duration,
    last_note_played_at: Option<Instant>,
}

impl Default for MotorState {
    fn default() -> Self {
        Self::idle()
    }
}

impl MotorState {
    pub fn idle() -> Self {
        Self {
            speed: 0.0,
            active: false,
            target_duration: Duration::ZERO,
            last_note_played_at: None,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Speed as sent to the driver
    pub fn speed_byte(&self) -> u8 {
        self.speed.round().clamp(0.0, MAX_SPEED) as u8
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn target_duration(&self) -> Duration {
        self.target_duration
    }

    pub fn last_note_played_at(&self) -> Option<Instant> {
        self.last_note_played_at
    }

    /// Apply a note; louder note wins.
    pub fn apply_note(&mut self, mapping: &NoteMapping, now: Instant) -> NoteOutcome {
        let level = mapping.level.clamp(0.0, MAX_SPEED);
        if level <= self.speed {
            return NoteOutcome::Ignored;
        }
        let started = !self.active;
        self.speed = level;
        self.active = true;
        self.target_duration = mapping.duration;
        self.last_note_played_at = Some(now);
        NoteOutcome::Raised { started }
    }

    /// One decay step.
    pub fn decay(&mut self, params: &DecayParams) -> DecayOutcome {
        if !self.active {
            return DecayOutcome::Idle;
        }
        self.speed = (self.speed - params.velocity).clamp(0.0, MAX_SPEED);
        // A stopped motor is idle whatever the floor is
        if self.speed <= 0.0 || self.speed < params.floor {
            self.speed = 0.0;
            self.active = false;
            return DecayOutcome::Idle;
        }
        DecayOutcome::Decaying(self.speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loudest() -> NoteMapping {
        note_mapping(2).unwrap()
    }

    #[test]
    fn test_note_table_covers_six_notes() {
        let mapped: Vec<_> = (0..=255u8).filter_map(note_mapping).collect();
        assert_eq!(mapped.len(), 6);
        assert_eq!(mapped.iter().filter(|m| m.channel == Channel::Left).count(), 3);
        assert_eq!(note_mapping(5).unwrap().level, 255.0);
        assert!(note_mapping(6).is_none());
    }

    #[test]
    fn test_decay_terminates_within_bound() {
        let params = DecayParams::default();
        let mut motor = MotorState::idle();
        assert_eq!(
            motor.apply_note(&loudest(), Instant::now()),
            NoteOutcome::Raised { started: true }
        );
        assert_eq!(motor.speed(), 255.0);

        let bound = (MAX_SPEED / params.velocity).ceil() as usize;
        let mut previous = motor.speed();
        let mut ticks = 0;
        loop {
            ticks += 1;
            match motor.decay(&params) {
                DecayOutcome::Decaying(speed) => {
                    assert!(speed < previous, "speed must strictly decrease");
                    previous = speed;
                }
                DecayOutcome::Idle => break,
            }
            assert!(ticks <= bound);
        }
        assert!(ticks <= bound);
        assert_eq!(motor.speed(), 0.0);
        assert!(!motor.is_active());
    }

    #[test]
    fn test_zero_floor_still_goes_idle() {
        let params = DecayParams {
            velocity: 15.0,
            floor: 0.0,
        };
        let mut motor = MotorState::idle();
        motor.apply_note(&loudest(), Instant::now());

        let bound = (MAX_SPEED / params.velocity).ceil() as usize;
        let idle_at = (1..=bound).find(|_| motor.decay(&params) == DecayOutcome::Idle);
        assert_eq!(idle_at, Some(bound));
        assert!(!motor.is_active());
        assert_eq!(motor.speed(), 0.0);
    }

    #[test]
    fn test_quieter_note_is_ignored_while_active() {
        let mut motor = MotorState::idle();
        motor.apply_note(&note_mapping(1).unwrap(), Instant::now());
        assert_eq!(
            motor.apply_note(&note_mapping(0).unwrap(), Instant::now()),
            NoteOutcome::Ignored
        );
        assert_eq!(motor.speed(), 170.0);
        assert_eq!(motor.target_duration(), Duration::from_millis(300));
    }

    #[test]
    fn test_louder_note_raises_without_restart() {
        let mut motor = MotorState::idle();
        motor.apply_note(&note_mapping(0).unwrap(), Instant::now());
        assert_eq!(
            motor.apply_note(&loudest(), Instant::now()),
            NoteOutcome::Raised { started: false }
        );
        assert_eq!(motor.speed_byte(), 255);
    }

    #[test]
    fn test_large_velocity_never_goes_negative() {
        let params = DecayParams {
            velocity: 1000.0,
            floor: 1.0,
        };
        let mut motor = MotorState::idle();
        motor.apply_note(&loudest(), Instant::now());
        assert_eq!(motor.decay(&params), DecayOutcome::Idle);
        assert_eq!(motor.speed(), 0.0);
    }

    #[test]
    fn test_out_of_range_level_is_clamped() {
        let mut motor = MotorState::idle();
        let mapping = NoteMapping {
            channel: Channel::Left,
            level: 999.0,
            duration: Duration::from_millis(1),
        };
        motor.apply_note(&mapping, Instant::now());
        assert_eq!(motor.speed(), MAX_SPEED);
    }

    #[test]
    fn test_idle_decay_is_noop() {
        let mut motor = MotorState::idle();
        assert_eq!(motor.decay(&DecayParams::default()), DecayOutcome::Idle);
        assert!(motor.last_note_played_at().is_none());
    }
}
