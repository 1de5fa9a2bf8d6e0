//! Controller integration tests
//!
//! Drives the controller with the installation's handlers bound, the way
//! the transports do, and observes what reaches the OSC peer, the role
//! connections and the actuators.

use ricochet_codec::normalize_body;
use ricochet_hub::actuator::{ActuatorController, Channel, DecayParams, ManualScheduler, RecordingDriver};
use ricochet_hub::compositions::CompositionLibrary;
use ricochet_hub::osc::{OscOutbound, OscPublisher};
use ricochet_hub::socket::RoleConnection;
use ricochet_hub::{Controller, Hub, Inbound};
use ricochet_types::{Address, BraceletId, Payload, Role};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

struct Harness {
    controller: Controller,
    osc: mpsc::UnboundedReceiver<OscOutbound>,
    driver: RecordingDriver,
    scheduler: ManualScheduler,
}

impl Harness {
    fn new() -> Self {
        let (publisher, osc) = OscPublisher::channel();
        let driver = RecordingDriver::new();
        let scheduler = ManualScheduler::new();
        let actuators = ActuatorController::new(
            DecayParams::default(),
            Box::new(driver.clone()),
            Box::new(scheduler.clone()),
        );
        let hub = Hub::new(publisher, actuators, CompositionLibrary::in_memory(Vec::new()));
        Self {
            controller: Controller::new(hub),
            osc,
            driver,
            scheduler,
        }
    }

    fn osc_event(&mut self, address: Address, payload: Payload) {
        self.controller.handle(Inbound::Osc {
            address,
            payload,
            peer: "127.0.0.1:4444".parse().unwrap(),
        });
    }

    fn webhook(&mut self, address: Address, body: &str) -> bool {
        let payload = normalize_body(address, body.as_bytes()).unwrap();
        let (reply, mut routed) = oneshot::channel();
        self.controller.handle(Inbound::Webhook {
            address,
            payload,
            reply,
        });
        routed.try_recv().unwrap()
    }

    fn connect(&mut self, role: Role) -> Client {
        let (tx, frames) = mpsc::unbounded_channel();
        let (close_tx, closed) = oneshot::channel();
        let connection = RoleConnection::new(tx, close_tx);
        let id = connection.id;
        self.controller
            .handle(Inbound::RoleConnected { role, connection });
        Client { id, frames, closed }
    }

    fn sent_osc(&mut self) -> Vec<OscOutbound> {
        let mut sent = Vec::new();
        while let Ok(message) = self.osc.try_recv() {
            sent.push(message);
        }
        sent
    }
}

struct Client {
    id: Uuid,
    frames: mpsc::UnboundedReceiver<String>,
    closed: oneshot::Receiver<()>,
}

impl Client {
    fn received(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.frames.try_recv() {
            frames.push(serde_json::from_str(&text).unwrap());
        }
        frames
    }
}

fn addresses(sent: &[OscOutbound]) -> Vec<Address> {
    sent.iter().map(|m| m.address).collect()
}

#[test]
fn test_role_preemption_closes_old_and_flips_status() {
    let mut harness = Harness::new();

    let mut first = harness.connect(Role::WebRenderer);
    assert_eq!(addresses(&harness.sent_osc()), vec![Address::WebRenderConnected]);

    let mut second = harness.connect(Role::WebRenderer);
    assert!(first.closed.try_recv().is_ok());
    assert_eq!(
        addresses(&harness.sent_osc()),
        vec![Address::WebRenderDisconnected, Address::WebRenderConnected]
    );

    // The preempted socket task reports its close late; nothing changes.
    harness.controller.handle(Inbound::RoleClosed {
        role: Role::WebRenderer,
        connection_id: first.id,
    });
    assert!(harness.sent_osc().is_empty());
    assert!(harness.controller.hub().connections.is_present(Role::WebRenderer));

    first.received();
    second.received();
    harness.osc_event(Address::PlayCube, json!({"idCube": 1}));
    assert!(first.received().is_empty());
    assert_eq!(
        second.received(),
        vec![json!({"address": "/playCube", "data": {"idCube": 1}})]
    );

    harness.controller.handle(Inbound::RoleClosed {
        role: Role::WebRenderer,
        connection_id: second.id,
    });
    assert_eq!(addresses(&harness.sent_osc()), vec![Address::WebRenderDisconnected]);
    assert!(!harness.controller.hub().connections.is_present(Role::WebRenderer));
}

#[test]
fn test_post_to_absent_role_is_dropped() {
    let mut harness = Harness::new();
    harness.osc_event(Address::PlayCube, json!("anything"));
    harness.osc_event(Address::KinectConnected, Value::Null);
    assert!(harness.controller.hub().status.kinect_connected);
}

#[test]
fn test_cube_connect_webhook() {
    let mut harness = Harness::new();
    let mut renderer = harness.connect(Role::WebRenderer);
    renderer.received();
    harness.sent_osc();

    assert!(harness.webhook(Address::CubeConnected, r#"{"cubeId":"5","faceId":"2"}"#));

    let hub = harness.controller.hub();
    assert!(hub.props.contains(5));
    assert_eq!(hub.props.get(5).unwrap().sound_id, 2);

    let sent = harness.sent_osc();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].address, Address::CubeConnected);
    let content: Value = serde_json::from_str(sent[0].content.as_deref().unwrap()).unwrap();
    assert_eq!(content, json!({"idCube": 5, "idSound": 2}));

    assert_eq!(
        renderer.received(),
        vec![json!({"address": "/cubeConnected", "data": {"idCube": 5, "idSound": 2}})]
    );

    // Duplicate connect is routed but changes nothing
    assert!(harness.webhook(Address::CubeConnected, r#"{"cubeId":5,"faceId":3}"#));
    assert_eq!(harness.controller.hub().props.len(), 1);
    assert!(harness.sent_osc().is_empty());
}

#[test]
fn test_cube_events_from_osc_are_not_echoed() {
    let mut harness = Harness::new();
    harness.osc_event(Address::CubeConnected, json!({"idCube": 1, "idSound": 4}));
    harness.osc_event(Address::CubeTouched, json!({"idCube": 1}));
    assert_eq!(harness.controller.hub().props.len(), 1);
    assert!(harness.sent_osc().is_empty());

    harness.osc_event(Address::CubeDisconnected, json!(1));
    assert!(harness.controller.hub().props.is_empty());
}

#[test]
fn test_renderer_connect_replays_state() {
    let mut harness = Harness::new();
    harness.osc_event(Address::CubeConnected, json!({"idCube": 3, "idSound": 1}));
    harness.osc_event(Address::CubeConnected, json!({"idCube": 1, "idSound": 2}));
    harness.osc_event(Address::KinectConnected, Value::Null);

    let mut renderer = harness.connect(Role::WebRenderer);
    assert_eq!(
        renderer.received(),
        vec![
            json!({"address": "/KStatusChange", "data": true}),
            json!({"address": "/OFStatusChange", "data": false}),
            json!({"address": "/cubeConnected", "data": {"idCube": 3, "idSound": 1}}),
            json!({"address": "/cubeConnected", "data": {"idCube": 1, "idSound": 2}}),
        ]
    );
}

#[test]
fn test_of_connect_is_deduplicated() {
    let mut harness = Harness::new();
    harness.osc_event(Address::OfConnected, Value::Null);
    harness.osc_event(Address::OfConnected, Value::Null);

    let sent = addresses(&harness.sent_osc());
    assert_eq!(
        sent,
        vec![Address::ServerConnected, Address::WebRenderDisconnected]
    );
    assert!(harness.controller.hub().status.of_connected);
}

#[test]
fn test_of_disconnect_takes_kinect_down() {
    let mut harness = Harness::new();
    harness.osc_event(Address::OfConnected, Value::Null);
    harness.osc_event(Address::KinectConnected, Value::Null);
    let mut renderer = harness.connect(Role::WebRenderer);
    renderer.received();

    harness.osc_event(Address::OfStatusChange, json!(false));

    let status = harness.controller.hub().status;
    assert!(!status.of_connected);
    assert!(!status.kinect_connected);
    assert_eq!(
        renderer.received(),
        vec![
            json!({"address": "/OFStatusChange", "data": false}),
            json!({"address": "/KStatusChange", "data": false}),
        ]
    );
}

#[test]
fn test_role_status_cannot_be_faked_from_outside() {
    let mut harness = Harness::new();
    let mut gallery = harness.connect(Role::Gallery);
    gallery.received();
    harness.sent_osc();

    // Routed, so the webhook is acknowledged, but nothing follows from it
    assert!(harness.webhook(Address::WebRenderStatusChange, "true"));
    harness.osc_event(Address::WebRenderStatusChange, json!(true));
    harness.controller.handle(Inbound::Socket {
        role: Role::Gallery,
        address: Address::GalleryStatusChange,
        payload: json!(true),
    });

    assert!(harness.sent_osc().is_empty());
    assert!(gallery.received().is_empty());
    assert!(!harness.controller.hub().connections.is_present(Role::WebRenderer));
}

#[test]
fn test_unrouted_webhook_reports_false() {
    let mut harness = Harness::new();
    assert!(!harness.webhook(Address::ServerConnected, ""));
}

#[test]
fn test_bracelet_removal_cancels_tickers() {
    let mut harness = Harness::new();
    let body = r#"{"braceletIp":"192.168.1.20","braceletPort":"8888"}"#;
    let id = BraceletId::new("192.168.1.20".parse().unwrap(), 8888);

    assert!(harness.webhook(Address::BraceletConnected, body));
    assert!(harness.webhook(Address::NotePlayed, r#"{"note":2}"#));
    assert!(harness.webhook(Address::NotePlayed, r#"{"note":4}"#));
    assert_eq!(harness.scheduler.live(&id).len(), 2);
    assert_eq!(harness.driver.commands().len(), 2);

    harness.controller.handle(Inbound::MotorTick {
        bracelet: id,
        channel: Channel::Left,
    });
    assert_eq!(harness.driver.last().unwrap().speed, 240);

    assert!(harness.webhook(Address::BraceletDisconnected, body));
    assert!(harness.scheduler.live(&id).is_empty());
    assert!(harness.controller.hub().actuators.is_empty());

    let sent = harness.driver.commands().len();
    harness.controller.handle(Inbound::MotorTick {
        bracelet: id,
        channel: Channel::Right,
    });
    assert_eq!(harness.driver.commands().len(), sent);
}

#[test]
fn test_gallery_gets_compositions() {
    let mut harness = Harness::new();
    let mut gallery = harness.connect(Role::Gallery);
    assert_eq!(
        gallery.received(),
        vec![json!({"address": "/compositions", "data": []})]
    );

    harness.controller.handle(Inbound::Socket {
        role: Role::WebRenderer,
        address: Address::NewComposition,
        payload: json!({"id": "c1", "cubes": [1, 2]}),
    });
    assert_eq!(
        gallery.received(),
        vec![json!({"address": "/compositions", "data": [{"id": "c1", "cubes": [1, 2]}]})]
    );

    harness.controller.handle(Inbound::Socket {
        role: Role::Gallery,
        address: Address::Compositions,
        payload: Value::Null,
    });
    assert_eq!(gallery.received().len(), 1);
}
