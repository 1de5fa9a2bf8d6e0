//! Role connection table
//!
//! One slot per [`Role`], each Absent or holding the live connection's
//! handle. Only the controller loop touches the table; connection tasks
//! reach their socket through the channels stored in the handle.

use ricochet_codec::Envelope;
use ricochet_types::{Address, Payload, Role};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handle on an accepted WebSocket connection.
#[derive(Debug)]
pub struct RoleConnection {
    pub id: Uuid,
    outbound: mpsc::UnboundedSender<String>,
    close: Option<oneshot::Sender<()>>,
}

impl RoleConnection {
    pub fn new(outbound: mpsc::UnboundedSender<String>, close: oneshot::Sender<()>) -> Self {
        Self {
            id: Uuid::new_v4(),
            outbound,
            close: Some(close),
        }
    }

    /// Queue a text frame. Returns `false` if the socket task is gone.
    pub fn send_text(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }

    /// Ask the socket task to close the connection.
    pub fn close(&mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
    }
}

#[derive(Debug, Default)]
pub struct RoleConnections {
    slots: HashMap<Role, RoleConnection>,
}

impl RoleConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_present(&self, role: Role) -> bool {
        self.slots.contains_key(&role)
    }

    pub fn connection_id(&self, role: Role) -> Option<Uuid> {
        self.slots.get(&role).map(|conn| conn.id)
    }

    /// Empty the slot for `role`, handing back whatever was installed.
    pub fn take(&mut self, role: Role) -> Option<RoleConnection> {
        self.slots.remove(&role)
    }

    /// Install `connection` for `role`, returning the one it displaced. The
    /// caller closes the displaced connection.
    pub fn install(&mut self, role: Role, connection: RoleConnection) -> Option<RoleConnection> {
        info!("{} connected ({})", role, connection.id);
        self.slots.insert(role, connection)
    }

    /// Clear `role` if `id` is still the installed connection. A stale id
    /// (connection already preempted) leaves the slot alone.
    pub fn release(&mut self, role: Role, id: Uuid) -> bool {
        match self.slots.get(&role) {
            Some(current) if current.id == id => {
                self.slots.remove(&role);
                info!("{} disconnected ({})", role, id);
                true
            }
            Some(current) => {
                debug!(
                    "Ignoring close of {} connection {}, {} is installed",
                    role, id, current.id
                );
                false
            }
            None => false,
        }
    }

    /// Send `{address, data}` to the role's connection. Posting to an absent
    /// role is logged and dropped; nothing is queued for later.
    pub fn post(&self, role: Role, address: Address, data: Payload) -> bool {
        let Some(connection) = self.slots.get(&role) else {
            warn!("Cannot post {} to {}, it is not connected", address, role);
            return false;
        };
        let text = Envelope::new(address, data).to_text();
        if !connection.send_text(text) {
            warn!("Connection {} for {} is closing, dropped {}", connection.id, role, address);
            return false;
        }
        true
    }
}
