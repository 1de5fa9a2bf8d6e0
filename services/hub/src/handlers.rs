//! Address handlers for the installation
//!
//! Binds every address the hub reacts to. Handlers decode their payload at
//! the point of use; a payload that does not decode is logged and the event
//! dropped.

use crate::hub::{Hub, Source};
use crate::router::EventRouter;
use ricochet_types::{decode, decode_flag, Address, BraceletId, CubeEvent, NoteEvent, Payload, Role};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Bind the installation's handlers on `router`.
pub fn install(router: &mut EventRouter<Hub>) {
    router.register(Address::OfConnected, of_connected);
    router.register(Address::OfDisconnected, of_disconnected);
    router.register(Address::OfStatusChange, of_status_change);
    router.register(Address::KinectConnected, kinect_connected);
    router.register(Address::KinectDisconnected, kinect_disconnected);
    router.register(Address::KinectStatusChange, kinect_status_change);
    router.register(Address::PlayCube, play_cube);

    router.register(Address::WebRenderStatusChange, web_render_status_change);
    router.register(Address::GalleryStatusChange, gallery_status_change);

    router.register(Address::CubeConnected, cube_connected);
    router.register(Address::CubeDisconnected, cube_disconnected);
    for address in [Address::CubeTouched, Address::CubeDragged, Address::CubeDragOut] {
        router.register(address, move |hub: &mut Hub, payload: Payload| {
            cube_interaction(hub, address, payload)
        });
    }

    router.register(Address::BraceletConnected, bracelet_connected);
    router.register(Address::BraceletDisconnected, bracelet_disconnected);
    router.register(Address::NotePlayed, note_played);

    router.register(Address::NewComposition, new_composition);
    router.register(Address::UpdateComposition, update_composition);
    router.register(Address::Compositions, list_compositions);
}

fn flag(address: Address, payload: &Payload) -> Option<bool> {
    let flag = decode_flag(payload);
    if flag.is_none() {
        warn!("{} expects a boolean, got {}", address, payload);
    }
    flag
}

// openFrameworks and Kinect

fn of_connected(hub: &mut Hub, _: Payload) {
    if hub.status.of_connected {
        debug!("openFrameworks already connected");
        return;
    }
    hub.status.of_connected = true;
    info!("OPEN FRAMEWORKS : ON");

    hub.osc.send_server_status(true);
    hub.osc
        .send_web_render_status(hub.connections.is_present(Role::WebRenderer));
    hub.post(Role::WebRenderer, Address::OfStatusChange, Value::Bool(true));
}

fn of_disconnected(hub: &mut Hub, _: Payload) {
    if !hub.status.of_connected {
        debug!("openFrameworks already disconnected");
        return;
    }
    hub.status.of_connected = false;
    info!("OPEN FRAMEWORKS : OFF");

    // The Kinect is read through openFrameworks
    hub.raise(Address::KinectDisconnected, Value::Null);
    hub.post(Role::WebRenderer, Address::OfStatusChange, Value::Bool(false));
}

fn of_status_change(hub: &mut Hub, payload: Payload) {
    match flag(Address::OfStatusChange, &payload) {
        Some(true) => hub.raise(Address::OfConnected, Value::Null),
        Some(false) => hub.raise(Address::OfDisconnected, Value::Null),
        None => {}
    }
}

fn kinect_connected(hub: &mut Hub, _: Payload) {
    set_kinect(hub, true);
}

fn kinect_disconnected(hub: &mut Hub, _: Payload) {
    set_kinect(hub, false);
}

fn kinect_status_change(hub: &mut Hub, payload: Payload) {
    if let Some(connected) = flag(Address::KinectStatusChange, &payload) {
        set_kinect(hub, connected);
    }
}

fn set_kinect(hub: &mut Hub, connected: bool) {
    if hub.status.kinect_connected == connected {
        return;
    }
    hub.status.kinect_connected = connected;
    info!("KINECT : {}", if connected { "ON" } else { "OFF" });
    hub.post(
        Role::WebRenderer,
        Address::KinectStatusChange,
        Value::Bool(connected),
    );
}

fn play_cube(hub: &mut Hub, payload: Payload) {
    hub.post(Role::WebRenderer, Address::PlayCube, payload);
}

// WebSocket roles

/// Role status is raised by the hub when a socket is admitted or closed.
/// The same address arriving from a transport would fake a connection.
fn raised_by_hub(hub: &Hub, address: Address) -> bool {
    let source = hub.source();
    if source != Source::Internal {
        warn!("Ignoring {} from {:?}, only the hub raises it", address, source);
        return false;
    }
    true
}

fn web_render_status_change(hub: &mut Hub, payload: Payload) {
    if !raised_by_hub(hub, Address::WebRenderStatusChange) {
        return;
    }
    let Some(connected) = flag(Address::WebRenderStatusChange, &payload) else {
        return;
    };
    info!("WEB RENDER : {}", if connected { "ON" } else { "OFF" });
    hub.osc.send_web_render_status(connected);
    if !connected {
        return;
    }

    hub.post(
        Role::WebRenderer,
        Address::KinectStatusChange,
        Value::Bool(hub.status.kinect_connected),
    );
    hub.post(
        Role::WebRenderer,
        Address::OfStatusChange,
        Value::Bool(hub.status.of_connected),
    );
    let connections = &hub.connections;
    hub.props.for_each(|prop| {
        let cube = CubeEvent::with_sound(prop.id, prop.sound_id);
        connections.post(Role::WebRenderer, Address::CubeConnected, cube.to_value());
    });
}

fn gallery_status_change(hub: &mut Hub, payload: Payload) {
    if !raised_by_hub(hub, Address::GalleryStatusChange) {
        return;
    }
    let Some(connected) = flag(Address::GalleryStatusChange, &payload) else {
        return;
    };
    info!("GALLERY : {}", if connected { "ON" } else { "OFF" });
    if connected {
        hub.post(Role::Gallery, Address::Compositions, hub.compositions.to_value());
    }
}

// Cubes

fn cube_event(address: Address, payload: &Payload) -> Option<CubeEvent> {
    match CubeEvent::from_payload(payload) {
        Ok(cube) => Some(cube),
        Err(e) => {
            warn!("Invalid {} payload {}: {}", address, payload, e);
            None
        }
    }
}

/// Publish a cube event to the sensing layer (unless that is where it came
/// from) and to the renderer.
fn publish_cube(hub: &mut Hub, address: Address, cube: &CubeEvent) {
    if hub.source() != Source::Osc {
        hub.osc.send_cube_event(address, cube);
    }
    hub.post(Role::WebRenderer, address, cube.to_value());
}

fn cube_connected(hub: &mut Hub, payload: Payload) {
    let Some(cube) = cube_event(Address::CubeConnected, &payload) else {
        return;
    };
    let Some(sound_id) = cube.sound_id else {
        warn!("Cube {} connected without a sound", cube.id);
        return;
    };
    if hub.props.push(cube.id, sound_id) {
        publish_cube(hub, Address::CubeConnected, &cube);
    }
}

fn cube_disconnected(hub: &mut Hub, payload: Payload) {
    let Some(cube) = cube_event(Address::CubeDisconnected, &payload) else {
        return;
    };
    if hub.props.remove(cube.id) {
        publish_cube(hub, Address::CubeDisconnected, &CubeEvent::new(cube.id));
    }
}

fn cube_interaction(hub: &mut Hub, address: Address, payload: Payload) {
    let Some(cube) = cube_event(address, &payload) else {
        return;
    };
    if !hub.props.contains(cube.id) {
        debug!("{} for untracked cube {}", address, cube.id);
    }
    publish_cube(hub, address, &cube);
}

// Bracelets

fn bracelet_id(address: Address, payload: &Payload) -> Option<BraceletId> {
    match decode::<BraceletId>(payload) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Invalid {} payload {}: {}", address, payload, e);
            None
        }
    }
}

fn bracelet_connected(hub: &mut Hub, payload: Payload) {
    if let Some(id) = bracelet_id(Address::BraceletConnected, &payload) {
        hub.actuators.connect(id);
    }
}

fn bracelet_disconnected(hub: &mut Hub, payload: Payload) {
    if let Some(id) = bracelet_id(Address::BraceletDisconnected, &payload) {
        hub.actuators.disconnect(&id);
    }
}

fn note_played(hub: &mut Hub, payload: Payload) {
    match NoteEvent::from_payload(&payload) {
        Ok(note) => {
            let raised = hub.actuators.play_note(note.note, note.bracelet);
            debug!("Note {} raised {} motors", note.note, raised);
        }
        Err(e) => warn!("Invalid note payload {}: {}", payload, e),
    }
}

// Compositions

fn new_composition(hub: &mut Hub, payload: Payload) {
    if hub.compositions.add(payload).is_some() {
        hub.post(Role::Gallery, Address::Compositions, hub.compositions.to_value());
    }
}

fn update_composition(hub: &mut Hub, payload: Payload) {
    if hub.compositions.update(payload).is_some() {
        hub.post(Role::Gallery, Address::Compositions, hub.compositions.to_value());
    }
}

fn list_compositions(hub: &mut Hub, _: Payload) {
    let role = match hub.source() {
        Source::Socket(role) => role,
        _ => Role::Gallery,
    };
    hub.post(role, Address::Compositions, hub.compositions.to_value());
}
