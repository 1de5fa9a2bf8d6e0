//! # Controller Loop
//!
//! All domain state lives in one [`Hub`] owned by one [`Controller`] task.
//! Transports never touch it: they send [`Inbound`] events down a channel
//! and the controller processes them one at a time, to completion.
//!
//! Handlers may [`Hub::raise`] follow-up events. Those are queued and
//! dispatched after the current handler returns, so a handler never
//! re-enters the router.

use crate::actuator::{ActuatorController, Channel, TickScheduler, Ticker};
use crate::compositions::CompositionLibrary;
use crate::handlers;
use crate::osc::OscPublisher;
use crate::registry::PropRegistry;
use crate::router::EventRouter;
use crate::socket::{RoleConnection, RoleConnections};
use ricochet_types::{Address, BraceletId, Payload, Role};
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Inbound {
    /// Datagram from the sensing layer
    Osc {
        address: Address,
        payload: Payload,
        peer: SocketAddr,
    },
    /// Envelope from an admitted WebSocket client
    Socket {
        role: Role,
        address: Address,
        payload: Payload,
    },
    /// Webhook; `reply` learns whether a handler was bound
    Webhook {
        address: Address,
        payload: Payload,
        reply: oneshot::Sender<bool>,
    },
    RoleConnected {
        role: Role,
        connection: RoleConnection,
    },
    RoleClosed {
        role: Role,
        connection_id: Uuid,
    },
    MotorTick {
        bracelet: BraceletId,
        channel: Channel,
    },
}

/// Where the event being dispatched came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Osc,
    Socket(Role),
    Webhook,
    /// Raised by the hub itself
    Internal,
}

/// Sensing layer status as last reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallationStatus {
    pub of_connected: bool,
    pub kinect_connected: bool,
}

/// Domain state handed to every handler.
#[derive(Debug)]
pub struct Hub {
    pub props: PropRegistry,
    pub actuators: ActuatorController,
    pub connections: RoleConnections,
    pub osc: OscPublisher,
    pub compositions: CompositionLibrary,
    pub status: InstallationStatus,
    source: Source,
    pending: VecDeque<(Address, Payload)>,
}

impl Hub {
    pub fn new(
        osc: OscPublisher,
        actuators: ActuatorController,
        compositions: CompositionLibrary,
    ) -> Self {
        Self {
            props: PropRegistry::new(),
            actuators,
            connections: RoleConnections::new(),
            osc,
            compositions,
            status: InstallationStatus::default(),
            source: Source::Internal,
            pending: VecDeque::new(),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Queue an event to dispatch once the current handler returns.
    pub fn raise(&mut self, address: Address, payload: Payload) {
        self.pending.push_back((address, payload));
    }

    /// Post to a role's WebSocket; dropped with a warning when absent.
    pub fn post(&self, role: Role, address: Address, data: Payload) -> bool {
        self.connections.post(role, address, data)
    }
}

/// Owns the router and the hub; runs as one task.
#[derive(Debug)]
pub struct Controller {
    router: EventRouter<Hub>,
    hub: Hub,
}

impl Controller {
    /// Controller with the installation's handlers bound.
    pub fn new(hub: Hub) -> Self {
        let mut router = EventRouter::new();
        handlers::install(&mut router);
        Self::with_router(hub, router)
    }

    pub fn with_router(hub: Hub, router: EventRouter<Hub>) -> Self {
        Self { router, hub }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn hub_mut(&mut self) -> &mut Hub {
        &mut self.hub
    }

    pub fn router_mut(&mut self) -> &mut EventRouter<Hub> {
        &mut self.router
    }

    /// Process events until every sender is gone.
    pub async fn run(mut self, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
        info!(
            "Controller running with {} bound addresses",
            self.router.bound_addresses().len()
        );
        while let Some(event) = inbound.recv().await {
            self.handle(event);
        }
        info!("Controller stopped");
    }

    /// Process one event and everything it raises.
    pub fn handle(&mut self, event: Inbound) {
        match event {
            Inbound::Osc {
                address,
                payload,
                peer,
            } => {
                if !self.dispatch(Source::Osc, address, payload) {
                    warn!("OSC address {} from {} not used", address, peer);
                }
            }
            Inbound::Socket {
                role,
                address,
                payload,
            } => {
                if !self.dispatch(Source::Socket(role), address, payload) {
                    warn!("Address {} from {} not used", address, role);
                }
            }
            Inbound::Webhook {
                address,
                payload,
                reply,
            } => {
                let routed = self.dispatch(Source::Webhook, address, payload);
                if !routed {
                    warn!("Webhook address {} not used", address);
                }
                let _ = reply.send(routed);
            }
            Inbound::RoleConnected { role, connection } => self.connect_role(role, connection),
            Inbound::RoleClosed {
                role,
                connection_id,
            } => {
                if self.hub.connections.release(role, connection_id) {
                    self.dispatch(Source::Internal, role.status_address(), Value::Bool(false));
                }
            }
            Inbound::MotorTick { bracelet, channel } => self.hub.actuators.tick(&bracelet, channel),
        }
    }

    /// Preempt whatever holds `role`, then install `connection`.
    fn connect_role(&mut self, role: Role, connection: RoleConnection) {
        if let Some(mut previous) = self.hub.connections.take(role) {
            info!("{} reconnected, closing {}", role, previous.id);
            previous.close();
            self.dispatch(Source::Internal, role.status_address(), Value::Bool(false));
        }
        self.hub.connections.install(role, connection);
        self.dispatch(Source::Internal, role.status_address(), Value::Bool(true));
    }

    fn dispatch(&mut self, source: Source, address: Address, payload: Payload) -> bool {
        self.hub.source = source;
        let routed = self.router.dispatch(address, payload, &mut self.hub);
        self.drain_pending();
        routed
    }

    fn drain_pending(&mut self) {
        while let Some((address, payload)) = self.hub.pending.pop_front() {
            self.hub.source = Source::Internal;
            if !self.router.dispatch(address, payload, &mut self.hub) {
                debug!("Raised address {} not used", address);
            }
        }
    }
}

/// Decay tickers that feed `MotorTick` events back into the controller.
#[derive(Debug, Clone)]
pub struct ChannelTickScheduler {
    period: Duration,
    inbound: mpsc::UnboundedSender<Inbound>,
}

impl ChannelTickScheduler {
    pub fn new(period: Duration, inbound: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { period, inbound }
    }
}

impl TickScheduler for ChannelTickScheduler {
    fn start(&mut self, bracelet: BraceletId, channel: Channel) -> Ticker {
        let inbound = self.inbound.clone();
        Ticker::spawn(self.period, move || {
            inbound
                .send(Inbound::MotorTick { bracelet, channel })
                .is_ok()
        })
    }
}
