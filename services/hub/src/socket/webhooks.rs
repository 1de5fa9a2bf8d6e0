//! HTTP webhooks: `POST /<address>`
//!
//! Devices without a WebSocket (cube and bracelet firmware) report events
//! by posting to the address they raise. The response is written only after
//! the controller has dispatched the event.

use crate::hub::Inbound;
use bytes::Bytes;
use ricochet_codec::{normalize_body, WebhookReply};
use ricochet_types::Address;
use std::convert::Infallible;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

pub(crate) fn reply(status: StatusCode, body: WebhookReply) -> Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// Match request paths that name a catalog address; anything else is left
/// to the other routes.
pub(crate) fn address() -> impl Filter<Extract = (Address,), Error = Rejection> + Clone {
    warp::path::full().and_then(|path: FullPath| async move {
        match Address::parse(path.as_str()) {
            Some(address) => Ok(address),
            None => Err(warp::reject::not_found()),
        }
    })
}

/// Handle one webhook request.
pub async fn handle(
    address: Address,
    body: Bytes,
    inbound: mpsc::UnboundedSender<Inbound>,
) -> Result<Response, Infallible> {
    let payload = match normalize_body(address, &body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Webhook {} rejected: {}", address, e);
            return Ok(reply(StatusCode::BAD_REQUEST, WebhookReply::failure(e.to_string())));
        }
    };
    debug!("Webhook {}: {}", address, payload);

    let (ack, dispatched) = oneshot::channel();
    let event = Inbound::Webhook {
        address,
        payload,
        reply: ack,
    };
    if inbound.send(event).is_err() {
        return Ok(unavailable());
    }

    Ok(match dispatched.await {
        Ok(true) => reply(StatusCode::OK, WebhookReply::ok()),
        Ok(false) => reply(
            StatusCode::NOT_FOUND,
            WebhookReply::failure("address not used"),
        ),
        Err(_) => unavailable(),
    })
}

fn unavailable() -> Response {
    reply(
        StatusCode::SERVICE_UNAVAILABLE,
        WebhookReply::failure("hub is shutting down"),
    )
}
