//! Internal modules for the pocket_uno terminal client.
//!
//! This library provides command parsing and the stdin-driven game loop
//! used by the pu_client binary.

pub mod commands;
pub mod game_client;
