//! Network error types for framing, transports and channel setup.

use std::io;
use thiserror::Error;

/// A record that could not be turned into a [`super::messages::Message`].
/// Never fatal: the receive path logs it and moves on.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not JSON, or JSON that doesn't fit the envelope/payload shape
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Stream record that isn't valid base64
    #[error("Invalid record encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// Decoded record that isn't UTF-8 text
    #[error("Record is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Record size exceeded maximum allowed
    #[error("Record size {actual} exceeds maximum {max}")]
    TooLarge { actual: usize, max: usize },
}

/// Failures of an established channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Channel closed")]
    Closed,

    #[error("No connection with peer {0}")]
    UnknownPeer(u32),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Failures while establishing a channel with `host`/`join`. The caller may
/// retry.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Room {0} is already hosted")]
    RoomTaken(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result type for framing operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
