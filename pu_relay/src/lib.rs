//! Rendezvous relay for pocket_uno rooms.
//!
//! Peers that can't reach each other directly both dial the relay over a
//! WebSocket and meet in a room named after the host's short code.

pub mod api;
pub mod config;
