//! In-process binding: peers exchange messages over channels without any
//! socket. Used by tests, benchmarks and local hot-seat play.

use async_trait::async_trait;
use log::debug;
use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{
    errors::TransportError,
    transport::{HOST_PEER, PeerId, Recipient, Role, Transport, TransportEvent, lock},
};

#[derive(Clone)]
struct Remote {
    events: UnboundedSender<TransportEvent>,
    /// The remote's own peer table.
    table: Remotes,
    /// Our own id in the remote's peer table.
    as_seen: PeerId,
}

type Remotes = Arc<Mutex<BTreeMap<PeerId, Remote>>>;

// The two peer tables point at each other, so `table` stays out of the output.
impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote")
            .field("as_seen", &self.as_seen)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct MemoryTransport {
    role: Role,
    remotes: Remotes,
    events_tx: UnboundedSender<TransportEvent>,
    events: UnboundedReceiver<TransportEvent>,
}

/// Hands out joiner transports linked to one host.
#[derive(Clone, Debug)]
pub struct MemoryConnector {
    host_remotes: Remotes,
    host_events: UnboundedSender<TransportEvent>,
    next_peer: Arc<AtomicU32>,
}

impl MemoryTransport {
    fn new(role: Role) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        Self {
            role,
            remotes: Arc::default(),
            events_tx,
            events,
        }
    }

    #[must_use]
    pub fn host() -> (Self, MemoryConnector) {
        let host = Self::new(Role::Host);
        let connector = MemoryConnector {
            host_remotes: Arc::clone(&host.remotes),
            host_events: host.events_tx.clone(),
            next_peer: Arc::new(AtomicU32::new(HOST_PEER + 1)),
        };
        (host, connector)
    }

    /// A host with one joiner already connected.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (host, connector) = Self::host();
        let joiner = connector.connect();
        (host, joiner)
    }
}

impl MemoryConnector {
    pub fn connect(&self) -> MemoryTransport {
        let peer = self.next_peer.fetch_add(1, Ordering::Relaxed);
        let joiner = MemoryTransport::new(Role::Joiner);
        lock(&joiner.remotes).insert(
            HOST_PEER,
            Remote {
                events: self.host_events.clone(),
                table: Arc::clone(&self.host_remotes),
                as_seen: peer,
            },
        );
        lock(&self.host_remotes).insert(
            peer,
            Remote {
                events: joiner.events_tx.clone(),
                table: Arc::clone(&joiner.remotes),
                as_seen: HOST_PEER,
            },
        );
        // The host may already be gone; the joiner then sees nothing.
        let _ = self.host_events.send(TransportEvent::Connected(peer));
        joiner
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn role(&self) -> Role {
        self.role
    }

    fn peers(&self) -> Vec<PeerId> {
        lock(&self.remotes).keys().copied().collect()
    }

    async fn send(&mut self, to: Recipient, text: &str) -> Result<(), TransportError> {
        let remotes = lock(&self.remotes);
        if self.role == Role::Joiner && remotes.is_empty() {
            return Err(TransportError::Closed);
        }
        if let Recipient::Peer(peer) = to
            && !remotes.contains_key(&peer)
        {
            return Err(TransportError::UnknownPeer(peer));
        }
        for (&peer, remote) in remotes.iter() {
            if self.role == Role::Host && !to.includes(peer) {
                continue;
            }
            let event = TransportEvent::Message {
                from: remote.as_seen,
                text: text.to_string(),
            };
            if remote.events.send(event).is_err() {
                debug!("peer {peer} is gone, dropping message");
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        // Release our table before touching the remotes' tables.
        let remotes = std::mem::take(&mut *lock(&self.remotes));
        for remote in remotes.into_values() {
            lock(&remote.table).remove(&remote.as_seen);
            let _ = remote.events.send(TransportEvent::Disconnected(remote.as_seen));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn host_fans_out_and_joiners_reach_the_host() {
        let (mut host, connector) = MemoryTransport::host();
        let mut a = connector.connect();
        let mut b = connector.connect();
        assert_eq!(host.recv().await, Some(TransportEvent::Connected(1)));
        assert_eq!(host.recv().await, Some(TransportEvent::Connected(2)));
        assert_eq!(host.peers(), vec![1, 2]);
        assert_eq!(a.peers(), vec![HOST_PEER]);

        host.send(Recipient::AllExcept(1), "to b").await.unwrap();
        host.send(Recipient::All, "to all").await.unwrap();
        let to_b = TransportEvent::Message {
            from: HOST_PEER,
            text: "to b".into(),
        };
        assert_eq!(b.recv().await, Some(to_b));
        assert_eq!(
            a.recv().await,
            Some(TransportEvent::Message {
                from: HOST_PEER,
                text: "to all".into()
            })
        );

        a.send(Recipient::All, "hi").await.unwrap();
        assert_eq!(
            host.recv().await,
            Some(TransportEvent::Message {
                from: 1,
                text: "hi".into()
            })
        );
        assert!(matches!(
            host.send(Recipient::Peer(7), "x").await,
            Err(TransportError::UnknownPeer(7))
        ));
    }

    #[tokio::test]
    async fn dropping_a_side_disconnects_it() {
        let (mut host, joiner) = MemoryTransport::pair();
        assert_eq!(host.recv().await, Some(TransportEvent::Connected(1)));
        drop(joiner);
        assert_eq!(host.recv().await, Some(TransportEvent::Disconnected(1)));
        assert!(host.peers().is_empty());
        assert!(matches!(
            host.send(Recipient::Peer(1), "x").await,
            Err(TransportError::UnknownPeer(1))
        ));

        let (host, mut joiner) = MemoryTransport::pair();
        drop(host);
        assert_eq!(
            joiner.recv().await,
            Some(TransportEvent::Disconnected(HOST_PEER))
        );
        assert!(joiner.peers().is_empty());
        assert!(matches!(
            joiner.send(Recipient::All, "x").await,
            Err(TransportError::Closed)
        ));
    }
}
