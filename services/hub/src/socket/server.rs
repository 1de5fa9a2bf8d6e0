//! HTTP and WebSocket server
//!
//! Routes:
//! - `GET /ws`: WebSocket upgrade, admitted by `Origin`
//! - `GET /health`, `GET /status`
//! - `POST /<address>`: webhooks, for catalog addresses only
//! - `GET`/`HEAD` of anything else: static renderer assets

use super::connections::RoleConnection;
use super::webhooks::{self, reply};
use crate::error::Result;
use crate::hub::Inbound;
use futures_util::{SinkExt, StreamExt};
use ricochet_codec::{CodecError, Envelope, WebhookReply};
use ricochet_config::{HttpConfig, OriginConfig};
use ricochet_types::Role;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warp::http::{Method, StatusCode};
use warp::reply::{Reply, Response};
use warp::ws::{Message, WebSocket, Ws};
use warp::{Filter, Rejection};

/// What the routes need to reach the rest of the hub.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub origins: Arc<OriginConfig>,
    pub inbound: mpsc::UnboundedSender<Inbound>,
    pub static_dir: PathBuf,
    pub max_body_bytes: u64,
}

impl ServerState {
    pub fn new(
        http: &HttpConfig,
        origins: OriginConfig,
        inbound: mpsc::UnboundedSender<Inbound>,
    ) -> Self {
        Self {
            origins: Arc::new(origins),
            inbound,
            static_dir: http.static_dir.clone(),
            max_body_bytes: http.max_body_bytes,
        }
    }
}

/// Bind `addr` and serve until the task is aborted.
pub fn serve(state: ServerState, addr: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>)> {
    let (bound, server) = warp::serve(routes(state)).try_bind_ephemeral(addr)?;
    info!("HTTP/WebSocket server listening on {}", bound);
    Ok((bound, tokio::spawn(server)))
}

/// Every route the hub serves.
pub fn routes(
    state: ServerState,
) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    let ws_state = state.clone();
    let ws_route = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(warp::header::optional::<String>("origin"))
        .map(move |ws: Ws, origin: Option<String>| admit(ws, origin, &ws_state));

    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK).into_response());

    let status_route = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "running",
                "service": "ricochet-hub",
                "version": env!("CARGO_PKG_VERSION")
            }))
            .into_response()
        });

    let inbound = state.inbound.clone();
    let webhook_route = webhooks::address()
        .and(warp::post())
        .and(warp::body::content_length_limit(state.max_body_bytes))
        .and(warp::body::bytes())
        .and(warp::any().map(move || inbound.clone()))
        .and_then(webhooks::handle);

    let static_route = read_only()
        .and(warp::fs::dir(state.static_dir.clone()))
        .map(|file: warp::fs::File| file.into_response());

    ws_route
        .or(health_route)
        .unify()
        .or(status_route)
        .unify()
        .or(webhook_route)
        .unify()
        .or(static_route)
        .unify()
        .recover(handle_rejection)
        .unify()
}

/// Passes `GET` and `HEAD`. Other methods are a plain miss rather than a
/// 405, so an unknown `POST` path still answers 404.
fn read_only() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::method()
        .and_then(|method: Method| async move {
            if method == Method::GET || method == Method::HEAD {
                Ok(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
}

fn admit(ws: Ws, origin: Option<String>, state: &ServerState) -> Response {
    let role = origin
        .as_deref()
        .and_then(|origin| state.origins.role_for(origin));
    match role {
        Some(role) => {
            debug!("Accepting {} WebSocket from {:?}", role, origin);
            let inbound = state.inbound.clone();
            ws.on_upgrade(move |socket| run_connection(socket, role, inbound))
                .into_response()
        }
        None => {
            warn!("Refusing WebSocket from origin {:?}", origin);
            reply(
                StatusCode::FORBIDDEN,
                WebhookReply::failure("origin not allowed"),
            )
        }
    }
}

/// Pump one admitted socket until either side closes it.
async fn run_connection(socket: WebSocket, role: Role, inbound: mpsc::UnboundedSender<Inbound>) {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (close_tx, mut close_rx) = oneshot::channel();
    let connection = RoleConnection::new(out_tx, close_tx);
    let connection_id = connection.id;

    if inbound
        .send(Inbound::RoleConnected { role, connection })
        .is_err()
    {
        return;
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();

    loop {
        tokio::select! {
            outgoing = out_rx.recv() => {
                match outgoing {
                    Some(text) => {
                        if let Err(e) = ws_sender.send(Message::text(text)).await {
                            warn!("Failed to send to {} ({}): {}", role, connection_id, e);
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = &mut close_rx => {
                info!("Closing {} connection {}, replaced by a newer one", role, connection_id);
                let _ = ws_sender.send(Message::close()).await;
                break;
            }

            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(msg)) => {
                        if msg.is_close() {
                            break;
                        }
                        if let Ok(text) = msg.to_str() {
                            forward_text(role, text, &inbound);
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {} ({}): {}", role, connection_id, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    let _ = inbound.send(Inbound::RoleClosed {
        role,
        connection_id,
    });
}

fn forward_text(role: Role, text: &str, inbound: &mpsc::UnboundedSender<Inbound>) {
    match Envelope::parse(text) {
        Ok(envelope) => {
            let _ = inbound.send(Inbound::Socket {
                role,
                address: envelope.address,
                payload: envelope.data,
            });
        }
        Err(CodecError::RawText(raw)) => {
            info!("Ignoring raw text from {}: {}", role, raw);
        }
        Err(e) => {
            warn!("Dropping message from {}: {}", role, e);
        }
    }
}

async fn handle_rejection(err: Rejection) -> std::result::Result<Response, Infallible> {
    let (status, message) = if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "missing Content-Length".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "body too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else {
        (StatusCode::BAD_REQUEST, format!("{:?}", err))
    };
    Ok(reply(status, WebhookReply::failure(message)))
}
