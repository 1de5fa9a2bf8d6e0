//! # Actuator Controller
//!
//! Owns the connected bracelets and their two vibration motors. Notes
//! played by the renderer raise a motor's speed (see [`motor`] for the
//! ratchet-decay rules); a [`Ticker`] per active channel then walks the
//! speed back down to zero. Every speed change goes out through a
//! [`MotorDriver`].
//!
//! Ticks are not applied by the ticker task itself. The scheduler turns
//! them into events for the controller loop, which calls
//! [`ActuatorController::tick`], so motor state is only ever touched from
//! one task.

pub mod driver;
pub mod motor;
pub mod ticker;

pub use driver::{MotorCommand, MotorDriver, OscMotorDriver, RecordingDriver};
pub use motor::{note_mapping, Channel, DecayOutcome, DecayParams, MotorState, NoteOutcome};
pub use ticker::Ticker;

use parking_lot::Mutex;
use ricochet_types::BraceletId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Starts decay tickers for motor channels.
pub trait TickScheduler: Send {
    fn start(&mut self, bracelet: BraceletId, channel: Channel) -> Ticker;
}

/// Scheduler whose tickers never fire; tests drive `tick` by hand and
/// inspect which tickers are still alive.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    started: Arc<Mutex<Vec<(BraceletId, Channel, Arc<AtomicBool>)>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> usize {
        self.started.lock().len()
    }

    /// Tickers started for `bracelet` that have not been cancelled
    pub fn live(&self, bracelet: &BraceletId) -> Vec<Channel> {
        self.started
            .lock()
            .iter()
            .filter(|(id, _, cancelled)| id == bracelet && !cancelled.load(Ordering::Acquire))
            .map(|(_, channel, _)| *channel)
            .collect()
    }
}

impl TickScheduler for ManualScheduler {
    fn start(&mut self, bracelet: BraceletId, channel: Channel) -> Ticker {
        let ticker = Ticker::manual();
        self.started
            .lock()
            .push((bracelet, channel, ticker.cancel_flag()));
        ticker
    }
}

#[derive(Debug, Default)]
struct MotorChannel {
    state: MotorState,
    ticker: Option<Ticker>,
}

/// A connected bracelet.
#[derive(Debug, Default)]
pub struct Bracelet {
    left: MotorChannel,
    right: MotorChannel,
}

impl Bracelet {
    pub fn motor(&self, channel: Channel) -> &MotorState {
        &self.channel(channel).state
    }

    pub fn is_ticking(&self, channel: Channel) -> bool {
        self.channel(channel).ticker.is_some()
    }

    fn channel(&self, channel: Channel) -> &MotorChannel {
        match channel {
            Channel::Left => &self.left,
            Channel::Right => &self.right,
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut MotorChannel {
        match channel {
            Channel::Left => &mut self.left,
            Channel::Right => &mut self.right,
        }
    }
}

pub struct ActuatorController {
    bracelets: HashMap<BraceletId, Bracelet>,
    params: DecayParams,
    driver: Box<dyn MotorDriver>,
    scheduler: Box<dyn TickScheduler>,
}

impl ActuatorController {
    pub fn new(
        params: DecayParams,
        driver: Box<dyn MotorDriver>,
        scheduler: Box<dyn TickScheduler>,
    ) -> Self {
        Self {
            bracelets: HashMap::new(),
            params,
            driver,
            scheduler,
        }
    }

    /// Register a bracelet. Returns `false` if it was already connected.
    pub fn connect(&mut self, id: BraceletId) -> bool {
        if self.bracelets.contains_key(&id) {
            warn!("Bracelet {} already connected", id);
            return false;
        }
        self.bracelets.insert(id, Bracelet::default());
        info!("Bracelet {} connected ({} total)", id, self.bracelets.len());
        true
    }

    /// Forget a bracelet; its tickers are dropped with it.
    pub fn disconnect(&mut self, id: &BraceletId) -> bool {
        match self.bracelets.remove(id) {
            Some(_) => {
                info!("Bracelet {} disconnected ({} total)", id, self.bracelets.len());
                true
            }
            None => {
                warn!("Bracelet {} was not connected", id);
                false
            }
        }
    }

    /// Play `note` on `target`, or on every bracelet when `target` is
    /// `None`. Returns the number of motors whose speed was raised.
    pub fn play_note(&mut self, note: u8, target: Option<BraceletId>) -> usize {
        let Some(mapping) = note_mapping(note) else {
            warn!("Note {} has no motor mapping", note);
            return 0;
        };

        let targets: Vec<BraceletId> = match target {
            Some(id) if self.bracelets.contains_key(&id) => vec![id],
            Some(id) => {
                warn!("Note {} for unknown bracelet {}", note, id);
                return 0;
            }
            None => self.bracelets.keys().copied().collect(),
        };

        let now = Instant::now();
        let mut raised = 0;
        for id in targets {
            let Some(bracelet) = self.bracelets.get_mut(&id) else {
                continue;
            };
            let motor = bracelet.channel_mut(mapping.channel);
            match motor.state.apply_note(&mapping, now) {
                NoteOutcome::Ignored => {
                    debug!(
                        "Note {} ignored on {} {}, motor already at {}",
                        note,
                        id,
                        mapping.channel,
                        motor.state.speed()
                    );
                }
                NoteOutcome::Raised { .. } => {
                    raised += 1;
                    self.driver
                        .set_speed(&id, mapping.channel, motor.state.speed_byte());
                    if motor.ticker.is_none() {
                        motor.ticker = Some(self.scheduler.start(id, mapping.channel));
                    }
                }
            }
        }
        raised
    }

    /// One decay step for a channel. Stale ticks (bracelet gone, channel
    /// already idle) are ignored.
    pub fn tick(&mut self, id: &BraceletId, channel: Channel) {
        let Some(bracelet) = self.bracelets.get_mut(id) else {
            debug!("Tick for removed bracelet {}", id);
            return;
        };
        let motor = bracelet.channel_mut(channel);
        if motor.ticker.is_none() {
            return;
        }

        match motor.state.decay(&self.params) {
            DecayOutcome::Decaying(_) => {
                self.driver.set_speed(id, channel, motor.state.speed_byte());
            }
            DecayOutcome::Idle => {
                motor.ticker = None;
                self.driver.set_speed(id, channel, 0);
                debug!("Bracelet {} {} motor idle", id, channel);
            }
        }
    }

    pub fn bracelet(&self, id: &BraceletId) -> Option<&Bracelet> {
        self.bracelets.get(id)
    }

    pub fn contains(&self, id: &BraceletId) -> bool {
        self.bracelets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bracelets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bracelets.is_empty()
    }
}

impl std::fmt::Debug for ActuatorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorController")
            .field("bracelets", &self.bracelets.len())
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bracelet(last: u8) -> BraceletId {
        BraceletId::new(format!("10.0.0.{}", last).parse().unwrap(), 8888)
    }

    fn controller() -> (ActuatorController, RecordingDriver, ManualScheduler) {
        let driver = RecordingDriver::new();
        let scheduler = ManualScheduler::new();
        let actuators = ActuatorController::new(
            DecayParams::default(),
            Box::new(driver.clone()),
            Box::new(scheduler.clone()),
        );
        (actuators, driver, scheduler)
    }

    #[test]
    fn test_duplicate_connect() {
        let (mut actuators, _, _) = controller();
        assert!(actuators.connect(bracelet(1)));
        assert!(!actuators.connect(bracelet(1)));
        assert_eq!(actuators.len(), 1);
    }

    #[test]
    fn test_note_starts_one_ticker_per_channel() {
        let (mut actuators, driver, scheduler) = controller();
        let id = bracelet(1);
        actuators.connect(id);

        assert_eq!(actuators.play_note(0, Some(id)), 1);
        assert_eq!(actuators.play_note(2, Some(id)), 1);
        assert_eq!(scheduler.started(), 1);
        assert_eq!(scheduler.live(&id), vec![Channel::Left]);

        let speeds: Vec<u8> = driver.commands().iter().map(|c| c.speed).collect();
        assert_eq!(speeds, vec![85, 255]);
    }

    #[test]
    fn test_decay_to_idle_cancels_ticker() {
        let (mut actuators, driver, scheduler) = controller();
        let id = bracelet(2);
        actuators.connect(id);
        actuators.play_note(3, Some(id));
        assert!(actuators.bracelet(&id).unwrap().is_ticking(Channel::Right));

        // 85 / 15 rounds up to 6 ticks
        for _ in 0..6 {
            actuators.tick(&id, Channel::Right);
        }

        let motor = actuators.bracelet(&id).unwrap().motor(Channel::Right);
        assert!(!motor.is_active());
        assert_eq!(motor.speed(), 0.0);
        assert!(!actuators.bracelet(&id).unwrap().is_ticking(Channel::Right));
        assert!(scheduler.live(&id).is_empty());
        assert_eq!(driver.last().unwrap().speed, 0);

        let sent = driver.commands().len();
        actuators.tick(&id, Channel::Right);
        assert_eq!(driver.commands().len(), sent);
    }

    #[test]
    fn test_disconnect_cancels_tickers() {
        let (mut actuators, _, scheduler) = controller();
        let id = bracelet(3);
        actuators.connect(id);
        actuators.play_note(1, Some(id));
        actuators.play_note(4, Some(id));
        assert_eq!(scheduler.live(&id).len(), 2);

        assert!(actuators.disconnect(&id));
        assert!(scheduler.live(&id).is_empty());
        assert!(!actuators.disconnect(&id));

        // late tick from an aborted ticker
        actuators.tick(&id, Channel::Left);
    }

    #[test]
    fn test_untargeted_note_reaches_every_bracelet() {
        let (mut actuators, driver, _) = controller();
        actuators.connect(bracelet(1));
        actuators.connect(bracelet(2));
        assert_eq!(actuators.play_note(5, None), 2);
        assert!(driver.commands().iter().all(|c| c.channel == Channel::Right));
    }

    #[test]
    fn test_unknown_note_and_bracelet() {
        let (mut actuators, driver, _) = controller();
        actuators.connect(bracelet(1));
        assert_eq!(actuators.play_note(9, None), 0);
        assert_eq!(actuators.play_note(0, Some(bracelet(7))), 0);
        assert!(driver.commands().is_empty());
    }
}
