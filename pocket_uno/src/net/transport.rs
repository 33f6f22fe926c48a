//! The duplex channel abstraction every binding implements.

use async_trait::async_trait;
use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::errors::TransportError;

/// Connection-scoped peer handle. The host is always [`HOST_PEER`] from a
/// joiner's point of view; joiners get ids from the host's
/// [`super::ids::IdGenerator`].
pub type PeerId = u32;

pub const HOST_PEER: PeerId = 0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Host,
    Joiner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Joiner => write!(f, "joiner"),
        }
    }
}

/// Who a send goes to. Joiners are only linked to the host, so every
/// recipient resolves to the host on their side.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Recipient {
    All,
    Peer(PeerId),
    /// Fan-out that skips the peer a relayed message came from.
    AllExcept(PeerId),
}

impl Recipient {
    #[must_use]
    pub fn includes(self, peer: PeerId) -> bool {
        match self {
            Self::All => true,
            Self::Peer(target) => target == peer,
            Self::AllExcept(skipped) => skipped != peer,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransportEvent {
    /// A joiner connected (host side only).
    Connected(PeerId),
    /// One complete message text, in per-sender order.
    Message { from: PeerId, text: String },
    Disconnected(PeerId),
}

/// A connected duplex message channel. Sends are fire-and-forget; the
/// binding delivers each sender's messages in order.
#[async_trait]
pub trait Transport: Send {
    fn role(&self) -> Role;

    /// Currently linked peers.
    fn peers(&self) -> Vec<PeerId>;

    async fn send(&mut self, to: Recipient, text: &str) -> Result<(), TransportError>;

    /// Next event, or `None` once the channel is gone for good.
    async fn recv(&mut self) -> Option<TransportEvent>;
}

/// Locks a mutex shared with a binding's background tasks. A panicked task
/// can't leave a peer map half-updated, so poisoning is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
