//! Ricochet hub entry point

use anyhow::Context;
use clap::Parser;
use ricochet_config::HubConfig;
use ricochet_hub::actuator::{ActuatorController, DecayParams, OscMotorDriver};
use ricochet_hub::compositions::{CompositionLibrary, JsonFileStore};
use ricochet_hub::hub::ChannelTickScheduler;
use ricochet_hub::osc::{OscPublisher, OscTransport};
use ricochet_hub::shutdown::{self, ShutdownReason};
use ricochet_hub::socket::{self, ServerState};
use ricochet_hub::{Controller, Hub};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP/WebSocket port
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to receive OSC on
    #[arg(long)]
    osc_listen: Option<SocketAddr>,

    /// openFrameworks OSC address
    #[arg(long)]
    osc_peer: Option<SocketAddr>,

    /// Directory of renderer assets
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Compositions file
    #[arg(long)]
    compositions: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut HubConfig) {
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if let Some(addr) = self.osc_listen {
            config.osc.listen_address = addr;
        }
        if let Some(addr) = self.osc_peer {
            config.osc.peer_address = addr;
        }
        if let Some(dir) = &self.static_dir {
            config.http.static_dir = dir.clone();
        }
        if let Some(path) = &self.compositions {
            config.compositions_path = path.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ricochet_hub=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Ricochet hub");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = HubConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;
    info!("Configuration loaded: {:?}", config);

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (osc, osc_rx) = OscPublisher::channel();

    let mut osc_transport = OscTransport::start(&config.osc, inbound_tx.clone(), osc_rx)
        .await
        .context("Failed to start OSC bridge")?;

    let (compositions, _writer) =
        CompositionLibrary::open(JsonFileStore::new(&config.compositions_path))
            .await
            .context("Failed to load compositions")?;

    let actuators = ActuatorController::new(
        DecayParams {
            velocity: config.actuator.decay_velocity,
            floor: config.actuator.speed_floor,
        },
        Box::new(OscMotorDriver::new(osc.clone())),
        Box::new(ChannelTickScheduler::new(
            config.actuator.tick_interval(),
            inbound_tx.clone(),
        )),
    );
    let controller = Controller::new(Hub::new(osc.clone(), actuators, compositions));
    let mut controller_task = tokio::spawn(controller.run(inbound_rx));

    let state = ServerState::new(&config.http, config.origins.clone(), inbound_tx);
    let (_, mut server_task) = socket::serve(state, config.http_socket_addr()?)
        .context("Failed to start HTTP server")?;

    osc.send_server_status(true);
    info!("Ricochet hub started");

    let reason = tokio::select! {
        reason = shutdown::wait_for_signal() => reason,
        result = &mut controller_task => {
            ShutdownReason::Fault(format!("controller task ended: {:?}", result))
        }
        result = &mut server_task => {
            ShutdownReason::Fault(format!("HTTP server ended: {:?}", result))
        }
        result = &mut osc_transport.receiver => {
            ShutdownReason::Fault(format!("OSC listener ended: {:?}", result))
        }
    };

    if let ShutdownReason::Fault(message) = &reason {
        error!("{}", message);
    }
    shutdown::announce(&osc, &reason, config.shutdown_grace()).await;

    server_task.abort();
    controller_task.abort();
    osc_transport.receiver.abort();
    osc_transport.sender.abort();
    info!("Ricochet hub stopped");
    Ok(())
}
