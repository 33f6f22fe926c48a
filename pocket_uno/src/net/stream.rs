//! Raw stream-socket binding: TCP with base64 + newline framed records.
//!
//! The host listens and accepts any number of joiners, each a separate
//! connection with its own reader and writer task. A joiner holds a single
//! connection to the host.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream, ToSocketAddrs},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use super::{
    errors::{ConnectionError, TransportError},
    ids::IdGenerator,
    transport::{HOST_PEER, PeerId, Recipient, Role, Transport, TransportEvent, lock},
    utils::{LineCodec, write_record},
};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Pause after a failed accept so a persistent error doesn't spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Outgoing queues of every live connection, keyed by peer.
type Links = Arc<Mutex<BTreeMap<PeerId, UnboundedSender<String>>>>;

pub struct StreamTransport {
    role: Role,
    links: Links,
    events: UnboundedReceiver<TransportEvent>,
    local_addr: SocketAddr,
    accept_task: Option<JoinHandle<()>>,
}

impl StreamTransport {
    /// Listens on `addr` and accepts joiners in the background. Each
    /// accepted connection is announced as [`TransportEvent::Connected`]
    /// with an id from `ids`.
    pub async fn host<A: ToSocketAddrs>(
        addr: A,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, ConnectionError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let links = Links::default();
        let (events_tx, events) = mpsc::unbounded_channel();
        info!("hosting on {local_addr}");

        let accept_links = Arc::clone(&links);
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        let peer = ids.connection_id();
                        info!("peer {peer} connected from {remote}");
                        attach(stream, peer, &accept_links, &events_tx, true);
                    }
                    Err(error) => {
                        warn!("failed to accept connection: {error}");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
        });

        Ok(Self {
            role: Role::Host,
            links,
            events,
            local_addr,
            accept_task: Some(accept_task),
        })
    }

    pub async fn join<A: ToSocketAddrs>(addr: A) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(addr).await?;
        let local_addr = stream.local_addr()?;
        info!("connected to host at {}", stream.peer_addr()?);

        let links = Links::default();
        let (events_tx, events) = mpsc::unbounded_channel();
        attach(stream, HOST_PEER, &links, &events_tx, false);
        Ok(Self {
            role: Role::Joiner,
            links,
            events,
            local_addr,
            accept_task: None,
        })
    }

    /// Bound (host) or local (joiner) socket address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Wires one connection into the link table and spawns its reader and
/// writer. The link is in place before `Connected` is emitted, so the
/// session can answer the new peer immediately.
fn attach(
    stream: TcpStream,
    peer: PeerId,
    links: &Links,
    events: &UnboundedSender<TransportEvent>,
    announce: bool,
) {
    if let Err(error) = stream.set_nodelay(true) {
        debug!("couldn't disable nagle for peer {peer}: {error}");
    }
    let (mut reader, mut writer) = stream.into_split();
    let (outgoing_tx, mut outgoing) = mpsc::unbounded_channel::<String>();
    lock(links).insert(peer, outgoing_tx);
    if announce {
        let _ = events.send(TransportEvent::Connected(peer));
    }

    tokio::spawn(async move {
        while let Some(text) = outgoing.recv().await {
            if let Err(error) = write_record(&mut writer, &text).await {
                warn!("failed to write to peer {peer}: {error}");
                break;
            }
        }
    });

    let links = Arc::clone(links);
    let events = events.clone();
    tokio::spawn(async move {
        let mut codec = LineCodec::new();
        let mut buf = vec![0; READ_BUFFER_SIZE];
        'read: loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    codec.push(&buf[..n]);
                    while let Some(record) = codec.next_record() {
                        match record {
                            Ok(text) => {
                                let event = TransportEvent::Message { from: peer, text };
                                if events.send(event).is_err() {
                                    break 'read;
                                }
                            }
                            Err(error) => warn!("dropping record from peer {peer}: {error}"),
                        }
                    }
                }
                Err(error) => {
                    warn!("failed to read from peer {peer}: {error}");
                    break;
                }
            }
        }
        lock(&links).remove(&peer);
        info!("peer {peer} disconnected");
        let _ = events.send(TransportEvent::Disconnected(peer));
    });
}

#[async_trait]
impl Transport for StreamTransport {
    fn role(&self) -> Role {
        self.role
    }

    fn peers(&self) -> Vec<PeerId> {
        lock(&self.links).keys().copied().collect()
    }

    async fn send(&mut self, to: Recipient, text: &str) -> Result<(), TransportError> {
        let links = lock(&self.links);
        match (self.role, to) {
            (Role::Joiner, _) => {
                let host = links.get(&HOST_PEER).ok_or(TransportError::Closed)?;
                host.send(text.to_string())
                    .map_err(|_| TransportError::Closed)?;
            }
            (Role::Host, Recipient::Peer(peer)) => {
                let link = links.get(&peer).ok_or(TransportError::UnknownPeer(peer))?;
                link.send(text.to_string())
                    .map_err(|_| TransportError::UnknownPeer(peer))?;
            }
            (Role::Host, to) => {
                for (&peer, link) in links.iter().filter(|(peer, _)| to.includes(**peer)) {
                    if link.send(text.to_string()).is_err() {
                        debug!("peer {peer} is closing, dropping message");
                    }
                }
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
        // Dropping the queues ends every writer, which closes the sockets.
        lock(&self.links).clear();
    }
}
