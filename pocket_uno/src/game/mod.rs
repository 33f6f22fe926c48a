//! Card game model and rule engine.
//!
//! - [`card`] and [`deck`]: faces, cards and per-variant deck generation
//! - [`state`]: the match record and its read-only queries
//! - [`engine`]: the entry points that mutate a match
//! - [`events`]: card-moved events and the presentation queue
//! - [`view`]: per-seat views for the display layer

pub mod card;
pub mod config;
pub mod constants;
pub mod deck;
pub mod engine;
pub mod errors;
pub mod events;
pub mod state;
pub mod view;

pub use card::{Card, CardId, CardKind, Color, Face};
pub use config::MatchConfig;
pub use deck::{Variant, build_deck, new_deck, shuffle};
pub use engine::next_seat;
pub use errors::MoveError;
pub use events::{CardMoved, MoveKind, PresentationQueue};
pub use state::{Direction, GameState, Phase, Player, PlayerId, Profile, RosterEntry, Rules};
pub use view::{MatchView, PlayerView};
