use super::card::Color;

/// Cards dealt to every player when a match starts.
pub const HAND_SIZE: usize = 7;

pub const MIN_PLAYERS: usize = 2;

/// Lobby capacity offered by the table view.
pub const MAX_PLAYERS: usize = 8;

/// Cards drawn by a player caught holding one card without calling UNO.
pub const UNO_PENALTY: usize = 2;

/// Active color used when the first revealed card is a wildcard.
pub const DEFAULT_COLOR: Color = Color::Red;

pub const MAX_NAME_LENGTH: usize = 24;

pub const MAX_ID_LENGTH: usize = 32;
