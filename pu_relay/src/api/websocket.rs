//! WebSocket handler for the relay frame protocol.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. Its first frame is `register{room}` (host) or `connect{room}` (joiner)
//! 3. Afterwards only `send` frames are accepted; the relay wraps their data
//!    in `data{from}` frames for the other side
//! 4. On disconnect the room is closed (host) or the host is told the peer
//!    left (joiner)
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:7878/ws');
//! ws.send(JSON.stringify({ op: "connect", room: "pocket-uno-AB12" }));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use pocket_uno::net::{
    PeerId,
    relay::{RelayErrorCode, RelayFrame},
};
use tokio::sync::mpsc;

use super::{RelayState, rate_limiter::RateLimiter, rooms::Outbox};

/// What a socket became after its handshake frame.
#[derive(Clone, Debug)]
enum Membership {
    Host { room: String },
    Joiner { room: String, peer: PeerId },
}

/// Upgrade HTTP connection to a relay WebSocket.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<RelayFrame>();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbox_rx.recv().await {
            let json = match frame.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize relay frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut limiter = RateLimiter::per_second(state.config.frames_per_second);
    let mut membership: Option<Membership> = None;

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        };

        // Over the limit we stop reading; the socket's buffers push back on
        // the sender and no frame is lost.
        if let Err(wait) = limiter.try_admit() {
            debug!("Rate limit reached ({:?}), pausing reads for {:?}", membership, wait);
            limiter.admit().await;
        }

        let frame = match serde_json::from_str::<RelayFrame>(text.as_str()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to parse relay frame: {}", e);
                let _ = outbox.send(RelayFrame::error(
                    RelayErrorCode::BadFrame,
                    "Invalid frame format",
                ));
                continue;
            }
        };

        if let Some(joined) = handle_frame(&state, membership.as_ref(), frame, &outbox) {
            membership = Some(joined);
        }
    }

    match &membership {
        Some(Membership::Host { room }) => state.rooms().close(room, &outbox),
        Some(Membership::Joiner { room, peer }) => state.rooms().leave(room, *peer, &outbox),
        None => {}
    }
    info!("WebSocket disconnected ({:?})", membership);

    // Ending the outbox lets the send task flush and close the socket.
    drop(outbox);
    let _ = send_task.await;
}

/// Processes one frame. Returns the new membership when the frame was a
/// successful handshake.
fn handle_frame(
    state: &RelayState,
    membership: Option<&Membership>,
    frame: RelayFrame,
    outbox: &Outbox,
) -> Option<Membership> {
    match (membership, frame) {
        (None, RelayFrame::Register { room }) => match state.rooms().open(&room, outbox.clone()) {
            Ok(()) => {
                let _ = outbox.send(RelayFrame::Registered { room: room.clone() });
                Some(Membership::Host { room })
            }
            Err(e) => {
                warn!("Refused register: {}", e);
                let _ = outbox.send(e.frame());
                None
            }
        },
        (None, RelayFrame::Connect { room }) => match state.rooms().join(&room, outbox.clone()) {
            Ok(peer) => Some(Membership::Joiner { room, peer }),
            Err(e) => {
                warn!("Refused connect: {}", e);
                let _ = outbox.send(e.frame());
                None
            }
        },
        (Some(Membership::Host { room }), RelayFrame::Send { to, except, data }) => {
            state.rooms().from_host(room, to, except, &data);
            None
        }
        (Some(Membership::Joiner { room, peer }), RelayFrame::Send { data, .. }) => {
            state.rooms().to_host(room, *peer, &data);
            None
        }
        (_, other) => {
            warn!("Unexpected relay frame {:?} ({:?})", other, membership);
            let _ = outbox.send(RelayFrame::error(
                RelayErrorCode::BadFrame,
                "Unexpected frame",
            ));
            None
        }
    }
}
