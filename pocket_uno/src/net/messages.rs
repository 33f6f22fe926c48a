use log::debug;
use serde::{Deserialize, Serialize, de::Error as _};
use serde_json::Value;
use std::fmt;

use super::{
    super::game::{Color, GameState, MoveError, PlayerId, Profile, RosterEntry, Rules, Variant},
    errors::ProtocolError,
};

/// Host assigns a freshly connected joiner its player id.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConnected {
    pub player_id: PlayerId,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerList {
    pub players: Vec<RosterEntry>,
}

/// Everything a peer needs to build the identical starting state.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStart {
    pub variant: Variant,
    #[serde(default)]
    pub rules: Rules,
    pub players: Vec<RosterEntry>,
    pub seed: u64,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayCard {
    pub player_index: usize,
    pub card_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_color: Option<Color>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCard {
    pub player_id: PlayerId,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PressUno {
    pub caller_id: PlayerId,
}

/// Everything peers say to each other, as `{"type": TAG, "payload": {..}}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum Message {
    #[serde(rename = "PLAYER_CONNECTED")]
    PlayerConnected(PlayerConnected),
    /// A joiner introducing itself to the host.
    #[serde(rename = "HELLO_I_AM")]
    HelloIAm(Profile),
    #[serde(rename = "UPDATE_PLAYER_LIST")]
    UpdatePlayerList(PlayerList),
    #[serde(rename = "GAME_START")]
    GameStart(GameStart),
    #[serde(rename = "PLAY_CARD")]
    PlayCard(PlayCard),
    #[serde(rename = "DRAW_CARD")]
    DrawCard(DrawCard),
    #[serde(rename = "PRESS_UNO")]
    PressUno(PressUno),
}

impl Message {
    pub const TAGS: [&'static str; 7] = [
        "PLAYER_CONNECTED",
        "HELLO_I_AM",
        "UPDATE_PLAYER_LIST",
        "GAME_START",
        "PLAY_CARD",
        "DRAW_CARD",
        "PRESS_UNO",
    ];

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses one envelope. Well-formed envelopes with a tag this build
    /// doesn't know are ignored (`Ok(None)`); anything else that doesn't
    /// parse is a [`ProtocolError`].
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Err(serde_json::Error::custom("envelope has no type tag").into());
        };
        if !Self::TAGS.contains(&tag) {
            debug!("ignoring message with unknown type {tag}");
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Splits gameplay commands from lobby/control messages.
    pub fn into_command(self) -> Result<Command, Self> {
        match self {
            Self::PlayCard(play) => Ok(Command::Play(play)),
            Self::DrawCard(draw) => Ok(Command::Draw(draw)),
            Self::PressUno(press) => Ok(Command::PressUno(press)),
            other => Err(other),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerConnected(msg) => write!(f, "assigned id {}", msg.player_id),
            Self::HelloIAm(profile) => write!(f, "hello from {}", profile.name),
            Self::UpdatePlayerList(list) => {
                write!(f, "{} players in the lobby", list.players.len())
            }
            Self::GameStart(start) => write!(
                f,
                "{} match with {} players (seed {})",
                start.variant,
                start.players.len(),
                start.seed
            ),
            Self::PlayCard(play) => write!(f, "{}", Command::Play(*play)),
            Self::DrawCard(draw) => write!(f, "{} draws", draw.player_id),
            Self::PressUno(press) => write!(f, "{} pressed UNO", press.caller_id),
        }
    }
}

/// A gameplay command: the part of the protocol replayed against the rule
/// engine on every peer.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Command {
    Play(PlayCard),
    Draw(DrawCard),
    PressUno(PressUno),
}

impl Command {
    /// Runs the command through the rule engine.
    pub fn apply(&self, state: &mut GameState) -> Result<(), MoveError> {
        match self {
            Self::Play(play) => {
                state.play_card(play.player_index, play.card_index, play.chosen_color)
            }
            Self::Draw(draw) => state.draw_card(&draw.player_id).map(|_| ()),
            Self::PressUno(press) => state.press_uno(&press.caller_id).map(|_| ()),
        }
    }

    /// Seat the command acts for.
    #[must_use]
    pub fn seat(&self, state: &GameState) -> Option<usize> {
        match self {
            Self::Play(play) => Some(play.player_index),
            Self::Draw(draw) => state.player_index(&draw.player_id),
            Self::PressUno(press) => state.player_index(&press.caller_id),
        }
    }
}

impl From<Command> for Message {
    fn from(value: Command) -> Self {
        match value {
            Command::Play(play) => Self::PlayCard(play),
            Command::Draw(draw) => Self::DrawCard(draw),
            Command::PressUno(press) => Self::PressUno(press),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play(play) => {
                write!(f, "seat {} plays card {}", play.player_index, play.card_index)?;
                if let Some(color) = play.chosen_color {
                    write!(f, " as {color}")?;
                }
                Ok(())
            }
            Self::Draw(draw) => write!(f, "{} draws", draw.player_id),
            Self::PressUno(press) => write!(f, "{} pressed UNO", press.caller_id),
        }
    }
}
