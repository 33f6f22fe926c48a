//! The authoritative record of one match.
//!
//! A [`GameState`] is an explicit value owned by whoever runs the match
//! (the host, or a replica on a joining peer). Its fields are only mutated
//! by the rule engine entry points in [`super::engine`]; everything here is
//! a read-only query surface for the display layer.

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::VecDeque, fmt};

use super::{
    card::{Card, Color, Face},
    constants::{DEFAULT_COLOR, MAX_ID_LENGTH, MAX_NAME_LENGTH},
    deck::{DeckRng, Variant, seeded_rng},
    events::CardMoved,
};

/// Stable player identity, assigned by the host when a peer connects.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        let mut id: String = s
            .trim()
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        id.truncate(MAX_ID_LENGTH);
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Display name and avatar a participant announces in the lobby.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub avatar: u8,
}

impl Profile {
    pub fn new(name: &str, avatar: u8) -> Self {
        let mut name = name.trim().to_string();
        if name.is_empty() {
            name = "Player".to_string();
        }
        let name = name.chars().take(MAX_NAME_LENGTH).collect();
        Self { name, avatar }
    }
}

/// One seat of the lobby roster, as shipped in `UPDATE_PLAYER_LIST` and
/// `GAME_START`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    pub avatar: u8,
    #[serde(default)]
    pub is_host: bool,
}

impl RosterEntry {
    pub fn new(id: PlayerId, profile: &Profile, is_host: bool) -> Self {
        Self {
            id,
            name: profile.name.clone(),
            avatar: profile.avatar,
            is_host,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: u8,
    /// Order only matters for display.
    pub hand: Vec<Card>,
    /// Set once the player has called UNO; protects them from being caught.
    pub declared_safe: bool,
    pub is_host: bool,
}

impl From<RosterEntry> for Player {
    fn from(entry: RosterEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            avatar: entry.avatar,
            hand: Vec::new(),
            declared_safe: false,
            is_host: entry.is_host,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} cards)", self.name, self.hand.len())
    }
}

/// House rule toggles.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rules {
    /// A pending penalty may be passed on by playing the same kind of card.
    pub stacking: bool,
    /// Playing a 0 rotates every hand, playing a 7 swaps with the next seat.
    pub seven_zero: bool,
    /// An identical card may be played out of turn.
    pub jump_in: bool,
    /// Drawing is refused while the player holds a playable card.
    pub forced_play: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            stacking: true,
            seven_zero: false,
            jump_in: false,
            forced_play: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Lobby,
    Playing,
    GameOver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "lobby",
            Self::Playing => "playing",
            Self::GameOver => "game over",
        };
        write!(f, "{repr}")
    }
}

/// Direction of play around the table.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// +1 or -1 seats per step.
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// Single authoritative match record.
#[derive(Clone, Debug)]
pub struct GameState {
    pub(super) phase: Phase,
    pub(super) variant: Variant,
    pub(super) rules: Rules,
    /// Draws come off the front.
    pub(super) draw_pile: VecDeque<Card>,
    /// Top of the pile is the last element.
    pub(super) discard_pile: Vec<Card>,
    pub(super) players: Vec<Player>,
    pub(super) current_player_index: usize,
    pub(super) direction: Direction,
    pub(super) active_color: Color,
    pub(super) accumulated_penalty: u32,
    pub(super) is_alternate_face: bool,
    pub(super) winner: Option<usize>,
    /// Size of the generated deck; the card total never changes.
    pub(super) deck_size: usize,
    pub(super) seed: u64,
    pub(super) rng: DeckRng,
    /// Presentation events waiting to be drained by the display layer.
    pub(super) events: VecDeque<CardMoved>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            phase: Phase::Lobby,
            variant: Variant::default(),
            rules: Rules::default(),
            draw_pile: VecDeque::new(),
            discard_pile: Vec::new(),
            players: Vec::new(),
            current_player_index: 0,
            direction: Direction::Clockwise,
            active_color: DEFAULT_COLOR,
            accumulated_penalty: 0,
            is_alternate_face: false,
            winner: None,
            deck_size: 0,
            seed: 0,
            rng: seeded_rng(0),
            events: VecDeque::new(),
        }
    }
}

impl GameState {
    /// A match waiting in the lobby.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub fn rules(&self) -> Rules {
        self.rules
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, seat: usize) -> Option<&Player> {
        self.players.get(seat)
    }

    #[must_use]
    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|player| &player.id == id)
    }

    #[must_use]
    pub fn current_player_index(&self) -> usize {
        self.current_player_index
    }

    #[must_use]
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn active_color(&self) -> Color {
        self.active_color
    }

    #[must_use]
    pub fn accumulated_penalty(&self) -> u32 {
        self.accumulated_penalty
    }

    #[must_use]
    pub fn is_alternate_face(&self) -> bool {
        self.is_alternate_face
    }

    #[must_use]
    pub fn winner_index(&self) -> Option<usize> {
        self.winner
    }

    #[must_use]
    pub fn winner(&self) -> Option<&Player> {
        self.winner.and_then(|seat| self.players.get(seat))
    }

    #[must_use]
    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    #[must_use]
    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    #[must_use]
    pub fn top_card(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    /// The discard top as it currently plays (alternate face when flipped).
    #[must_use]
    pub fn top_face(&self) -> Option<&Face> {
        self.top_card().map(|card| card.face(self.is_alternate_face))
    }

    #[must_use]
    pub fn deck_size(&self) -> usize {
        self.deck_size
    }

    /// Cards across the draw pile, the discard pile and every hand. Always
    /// equal to [`Self::deck_size`] once a match has started.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.draw_pile.len()
            + self.discard_pile.len()
            + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
    }

    /// Presentation events recorded since the last drain, oldest first.
    pub fn drain_events(&mut self) -> VecDeque<CardMoved> {
        let events = std::mem::take(&mut self.events);
        if !events.is_empty() {
            debug!("draining {} presentation events", events.len());
        }
        events
    }
}
