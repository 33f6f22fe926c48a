//! Relay-negotiated binding: both sides dial a WebSocket relay and meet in
//! a room named after a short code. The relay forwards opaque message text
//! between the room's host and its joiners.

use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    net::TcpStream,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};

use super::{
    errors::{ConnectionError, TransportError},
    ids::{IdGenerator, rendezvous_id},
    transport::{HOST_PEER, PeerId, Recipient, Role, Transport, TransportEvent, lock},
};

/// How long `host`/`join` wait for the relay to answer.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayErrorCode {
    RoomNotFound,
    RoomTaken,
    /// The relay hosts as many rooms as it is configured for.
    RelayFull,
    BadFrame,
}

impl fmt::Display for RelayErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::RoomNotFound => "room not found",
            Self::RoomTaken => "room taken",
            Self::RelayFull => "relay full",
            Self::BadFrame => "bad frame",
        };
        write!(f, "{repr}")
    }
}

/// Control frames spoken between peers and the relay. Rooms are named by
/// rendezvous id (`pocket-uno-<CODE>`).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelayFrame {
    /// Host asks to open a room.
    Register { room: String },
    Registered { room: String },
    /// Joiner asks to enter a room.
    Connect { room: String },
    /// Joiner is in; `peer` is its id in the host's peer table.
    Connected { peer: PeerId },
    PeerJoined { peer: PeerId },
    PeerLeft { peer: PeerId },
    /// Outgoing message. Joiner sends always go to the host; host sends go
    /// to `to` if set, else to everybody but `except`.
    Send {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        except: Option<PeerId>,
        data: String,
    },
    Data { from: PeerId, data: String },
    Error { code: RelayErrorCode, message: String },
}

impl RelayFrame {
    #[must_use]
    pub fn error(code: RelayErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub struct RelayTransport {
    role: Role,
    room: String,
    peers: Arc<Mutex<BTreeSet<PeerId>>>,
    outgoing: UnboundedSender<RelayFrame>,
    events: UnboundedReceiver<TransportEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayTransport {
    /// Opens a room on the relay under a fresh code from `ids`. Fails with
    /// [`ConnectionError::RoomTaken`] if the code is already hosted.
    pub async fn host(
        relay_url: &str,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, ConnectionError> {
        let code = ids.room_code();
        let room = rendezvous_id(&code);
        let (ws, _) = connect_async(relay_url).await?;
        let (mut sink, mut stream) = ws.split();

        send_frame(&mut sink, &RelayFrame::Register { room: room.clone() }).await?;
        match handshake_reply(&mut stream).await? {
            RelayFrame::Registered { .. } => {}
            RelayFrame::Error {
                code: RelayErrorCode::RoomTaken,
                ..
            } => return Err(ConnectionError::RoomTaken(code)),
            other => return Err(unexpected(&other)),
        }
        info!("hosting room {code} on {relay_url}");
        Ok(Self::spawn(Role::Host, code, sink, stream, BTreeSet::new()))
    }

    /// Enters the room behind a short code.
    pub async fn join(relay_url: &str, code: &str) -> Result<Self, ConnectionError> {
        let room = rendezvous_id(code);
        let (ws, _) = connect_async(relay_url).await?;
        let (mut sink, mut stream) = ws.split();

        send_frame(&mut sink, &RelayFrame::Connect { room }).await?;
        match handshake_reply(&mut stream).await? {
            RelayFrame::Connected { peer } => {
                info!("joined room {code} as peer {peer}");
            }
            RelayFrame::Error {
                code: RelayErrorCode::RoomNotFound,
                ..
            } => return Err(ConnectionError::RoomNotFound(code.to_string())),
            other => return Err(unexpected(&other)),
        }
        let peers = BTreeSet::from([HOST_PEER]);
        Ok(Self::spawn(Role::Joiner, code.to_string(), sink, stream, peers))
    }

    /// The short room code (what players type to join).
    #[must_use]
    pub fn room_code(&self) -> &str {
        &self.room
    }

    fn spawn(
        role: Role,
        room: String,
        mut sink: WsSink,
        mut stream: SplitStream<WsStream>,
        peers: BTreeSet<PeerId>,
    ) -> Self {
        let peers = Arc::new(Mutex::new(peers));
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<RelayFrame>();
        let (events_tx, events) = mpsc::unbounded_channel();

        let writer = tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                let json = match frame.to_json() {
                    Ok(json) => json,
                    Err(error) => {
                        warn!("failed to encode relay frame: {error}");
                        continue;
                    }
                };
                if let Err(error) = sink.send(WsMessage::Text(json.into())).await {
                    warn!("failed to write to relay: {error}");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_peers = Arc::clone(&peers);
        let reader = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let text = match message {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(error) => {
                        warn!("relay connection failed: {error}");
                        break;
                    }
                };
                let frame = match serde_json::from_str::<RelayFrame>(text.as_str()) {
                    Ok(frame) => frame,
                    Err(error) => {
                        warn!("dropping unreadable relay frame: {error}");
                        continue;
                    }
                };
                let event = match frame {
                    RelayFrame::PeerJoined { peer } => {
                        lock(&reader_peers).insert(peer);
                        TransportEvent::Connected(peer)
                    }
                    RelayFrame::PeerLeft { peer } => {
                        lock(&reader_peers).remove(&peer);
                        TransportEvent::Disconnected(peer)
                    }
                    RelayFrame::Data { from, data } => {
                        TransportEvent::Message { from, text: data }
                    }
                    RelayFrame::Error { code, message } => {
                        warn!("relay error ({code}): {message}");
                        continue;
                    }
                    other => {
                        debug!("ignoring relay frame {other:?}");
                        continue;
                    }
                };
                if events_tx.send(event).is_err() {
                    return;
                }
            }

            let lost = std::mem::take(&mut *lock(&reader_peers));
            info!("relay connection closed");
            for peer in lost {
                let _ = events_tx.send(TransportEvent::Disconnected(peer));
            }
        });

        Self {
            role,
            room,
            peers,
            outgoing,
            events,
            tasks: vec![writer, reader],
        }
    }
}

async fn send_frame(sink: &mut WsSink, frame: &RelayFrame) -> Result<(), ConnectionError> {
    let json = frame
        .to_json()
        .map_err(|error| ConnectionError::Handshake(error.to_string()))?;
    sink.send(WsMessage::Text(json.into())).await?;
    Ok(())
}

/// First relay frame after a register/connect request.
async fn handshake_reply(
    stream: &mut SplitStream<WsStream>,
) -> Result<RelayFrame, ConnectionError> {
    tokio::time::timeout(HANDSHAKE_TIMEOUT, next_frame(stream))
        .await
        .map_err(|_| ConnectionError::Handshake("relay did not answer".to_string()))?
}

async fn next_frame(stream: &mut SplitStream<WsStream>) -> Result<RelayFrame, ConnectionError> {
    while let Some(message) = stream.next().await {
        match message? {
            WsMessage::Text(text) => {
                return serde_json::from_str(text.as_str())
                    .map_err(|error| ConnectionError::Handshake(error.to_string()));
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }
    Err(ConnectionError::Handshake(
        "relay closed the connection".to_string(),
    ))
}

fn unexpected(frame: &RelayFrame) -> ConnectionError {
    match frame {
        RelayFrame::Error { code, message } => {
            ConnectionError::Handshake(format!("{code}: {message}"))
        }
        other => ConnectionError::Handshake(format!("unexpected relay frame {other:?}")),
    }
}

#[async_trait]
impl Transport for RelayTransport {
    fn role(&self) -> Role {
        self.role
    }

    fn peers(&self) -> Vec<PeerId> {
        lock(&self.peers).iter().copied().collect()
    }

    async fn send(&mut self, to: Recipient, text: &str) -> Result<(), TransportError> {
        let (to, except) = match (self.role, to) {
            (Role::Joiner, _) => (None, None),
            (Role::Host, Recipient::All) => (None, None),
            (Role::Host, Recipient::Peer(peer)) => {
                if !lock(&self.peers).contains(&peer) {
                    return Err(TransportError::UnknownPeer(peer));
                }
                (Some(peer), None)
            }
            (Role::Host, Recipient::AllExcept(peer)) => (None, Some(peer)),
        };
        let frame = RelayFrame::Send {
            to,
            except,
            data: text.to_string(),
        };
        self.outgoing.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

impl Drop for RelayTransport {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
