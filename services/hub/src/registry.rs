//! Prop registry
//!
//! Tracks the sensing cubes currently connected, in the order they
//! connected. That order matters: a renderer that (re)connects gets every
//! tracked cube replayed to it in insertion order.

use tracing::{debug, info, warn};

/// A tracked sensing cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prop {
    pub id: u32,
    pub sound_id: u32,
}

#[derive(Debug, Default)]
pub struct PropRegistry {
    props: Vec<Prop>,
}

impl PropRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new cube. Returns `false`, leaving the registry untouched,
    /// when `id` is already tracked.
    pub fn push(&mut self, id: u32, sound_id: u32) -> bool {
        if self.contains(id) {
            warn!("Cube {} already tracked, ignoring duplicate connect", id);
            return false;
        }
        self.props.push(Prop { id, sound_id });
        info!("Cube {} tracked with sound {} ({} total)", id, sound_id, self.props.len());
        true
    }

    /// Stop tracking a cube. Returns `false` when it was never tracked.
    pub fn remove(&mut self, id: u32) -> bool {
        match self.props.iter().position(|prop| prop.id == id) {
            Some(index) => {
                self.props.remove(index);
                info!("Cube {} removed ({} total)", id, self.props.len());
                true
            }
            None => {
                warn!("Cube {} cannot be removed, it was never tracked", id);
                false
            }
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.props.iter().any(|prop| prop.id == id)
    }

    pub fn get(&self, id: u32) -> Option<&Prop> {
        self.props.iter().find(|prop| prop.id == id)
    }

    /// Apply `f` to every tracked prop in insertion order.
    pub fn for_each<F: FnMut(&Prop)>(&self, f: F) {
        debug!("{} cubes connected", self.props.len());
        self.props.iter().for_each(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prop> {
        self.props.iter()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}
