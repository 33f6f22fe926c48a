//! Rule engine errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rejected command. Every variant means the command was a no-op: the
/// engine checks everything before it mutates anything.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum MoveError {
    #[error("match has already started")]
    AlreadyStarted,
    #[error("need between {min} and {max} players, got {actual}")]
    InvalidRoster {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("no match in progress")]
    GameNotInProgress,
    #[error("match is over")]
    GameOver,
    #[error("not your turn")]
    OutOfTurn,
    #[error("unknown player")]
    InvalidPlayer,
    #[error("no card at index {0}")]
    InvalidCard(usize),
    #[error("card doesn't match the discard pile")]
    IllegalCard,
    #[error("{amount} card penalty pending: stack the same card or draw")]
    PenaltyPending { amount: u32 },
    #[error("wild cards need a color")]
    ColorRequired,
    #[error("can't choose the wild color")]
    InvalidColor,
    #[error("you have a playable card")]
    MustPlay,
}
