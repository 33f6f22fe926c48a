//! # Pocket UNO
//!
//! An UNO-family card game (Classic, No Mercy and Flip) with a deterministic
//! rule engine and peer-to-peer match synchronization.
//!
//! Every participant runs the same engine. The host picks a seed and ships
//! it in `GAME_START`, so every peer builds the identical deck; afterwards
//! only player commands travel over the wire and each peer replays them in
//! the order the host relays them.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, decks, the match record and the rule engine
//! - [`net`]: the message protocol, the transport trait and its bindings
//!   (in-process, TCP stream and WebSocket relay)
//! - [`session`]: lobby handshake and command replay on top of a transport
//!
//! ## Example
//!
//! ```
//! use pocket_uno::{GameState, Phase};
//!
//! // A fresh record waits in the lobby until a match is started.
//! let game = GameState::new();
//! assert_eq!(game.phase(), Phase::Lobby);
//! ```

/// Card game model and rule engine.
pub mod game;
pub use game::{
    Card, Color, GameState, MatchConfig, MatchView, MoveError, Phase, PlayerId, Profile,
    RosterEntry, Rules, Variant,
    constants::{self, HAND_SIZE, MAX_PLAYERS, MIN_PLAYERS},
};

/// Networking components for peer-to-peer play.
pub mod net;
pub use net::{messages, utils};

/// Keeps peers' match state in step.
pub mod session;
pub use session::{Session, SessionError, SessionEvent};
