//! Networking layer: the message protocol, the transport abstraction and its
//! bindings.
//!
//! Every binding carries opaque message text. The host side accepts any
//! number of joiners and fans messages out; a joiner only ever talks to its
//! host.

pub mod errors;

/// Injectable room code, player id, connection id and seed sources.
pub mod ids;

/// In-process binding for tests and local play.
pub mod memory;

/// Tagged JSON messages exchanged between peers.
pub mod messages;

/// WebSocket relay binding and its control frames.
pub mod relay;

/// TCP binding with base64 + newline framing.
pub mod stream;

pub mod transport;

/// Record framing for the stream binding.
pub mod utils;

pub use errors::{ConnectionError, ProtocolError, TransportError};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use messages::{Command, Message};
pub use transport::{HOST_PEER, PeerId, Recipient, Role, Transport, TransportEvent};
