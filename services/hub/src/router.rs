//! # Event Router - Single-Subscriber Dispatch
//!
//! ## Purpose
//! Maps each catalog [`Address`] to at most one handler. Transports hand
//! every validated inbound event to [`EventRouter::dispatch`]; the handler
//! bound to the address runs synchronously against the shared context.
//!
//! ## Contract
//!
//! - **Single subscriber**: binding an address that is already bound
//!   replaces the previous handler. There is no multicast and no stacking.
//! - **Unbound is valid**: dispatching to an unbound address is a no-op that
//!   returns `false`; the transport decides whether that deserves a warning.
//! - **No catalog check here**: keys are already `Address` values, so
//!   validation happens where wire strings are parsed.
//!
//! ```rust
//! use ricochet_hub::router::EventRouter;
//! use ricochet_types::{Address, Payload};
//!
//! let mut router: EventRouter<Vec<&'static str>> = EventRouter::new();
//! router.register(Address::PlayCube, |log: &mut Vec<&'static str>, _: Payload| log.push("first"));
//! router.register(Address::PlayCube, |log: &mut Vec<&'static str>, _: Payload| log.push("second"));
//!
//! let mut log = Vec::new();
//! assert!(router.dispatch(Address::PlayCube, Payload::Null, &mut log));
//! assert_eq!(log, vec!["second"]);
//! assert!(!router.dispatch(Address::CubeTouched, Payload::Null, &mut log));
//! ```

use ricochet_types::{Address, Payload};
use std::collections::HashMap;
use std::fmt;

/// Something that reacts to one address.
pub trait Handler<C>: Send {
    fn handle(&mut self, ctx: &mut C, payload: Payload);
}

impl<C, F> Handler<C> for F
where
    F: FnMut(&mut C, Payload) + Send,
{
    fn handle(&mut self, ctx: &mut C, payload: Payload) {
        self(ctx, payload)
    }
}

/// Address → handler table over a context `C`.
pub struct EventRouter<C> {
    handlers: HashMap<Address, Box<dyn Handler<C>>>,
}

impl<C> EventRouter<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Bind `handler` to `address`, returning the handler it replaced.
    pub fn register<H>(&mut self, address: Address, handler: H) -> Option<Box<dyn Handler<C>>>
    where
        H: Handler<C> + 'static,
    {
        self.handlers.insert(address, Box::new(handler))
    }

    /// Remove the binding for `address`.
    pub fn unbind(&mut self, address: Address) -> Option<Box<dyn Handler<C>>> {
        self.handlers.remove(&address)
    }

    pub fn is_bound(&self, address: Address) -> bool {
        self.handlers.contains_key(&address)
    }

    /// Run the handler bound to `address`. Returns `false` when unbound.
    pub fn dispatch(&mut self, address: Address, payload: Payload, ctx: &mut C) -> bool {
        match self.handlers.get_mut(&address) {
            Some(handler) => {
                handler.handle(ctx, payload);
                true
            }
            None => false,
        }
    }

    /// Bound addresses, in catalog order
    pub fn bound_addresses(&self) -> Vec<Address> {
        let mut bound: Vec<Address> = self.handlers.keys().copied().collect();
        bound.sort();
        bound
    }
}

impl<C> Default for EventRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventRouter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("bound", &self.bound_addresses())
            .finish()
    }
}
