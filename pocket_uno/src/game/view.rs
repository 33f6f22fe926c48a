use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    card::{Card, Color, Face},
    deck::Variant,
    state::{Direction, GameState, Phase, PlayerId},
};

/// What one seat is allowed to see of another.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub avatar: u8,
    pub hand_size: usize,
    pub declared_safe: bool,
    pub is_host: bool,
}

/// A match as seen from one seat: the viewer's own hand in full and only
/// hand sizes for everybody else.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchView {
    pub phase: Phase,
    pub variant: Variant,
    pub seat: usize,
    pub players: Vec<PlayerView>,
    pub hand: Vec<Card>,
    /// Indices into `hand` the viewer may play right now.
    pub playable: Vec<usize>,
    pub top: Option<Face>,
    pub active_color: Color,
    pub current_player_index: usize,
    pub direction: Direction,
    pub accumulated_penalty: u32,
    pub draw_pile: usize,
    pub is_alternate_face: bool,
    pub winner: Option<usize>,
}

impl GameState {
    #[must_use]
    pub fn view_for(&self, seat: usize) -> MatchView {
        let players = self
            .players
            .iter()
            .map(|player| PlayerView {
                id: player.id.clone(),
                name: player.name.clone(),
                avatar: player.avatar,
                hand_size: player.hand.len(),
                declared_safe: player.declared_safe,
                is_host: player.is_host,
            })
            .collect();
        let hand = self
            .players
            .get(seat)
            .map(|player| player.hand.clone())
            .unwrap_or_default();

        MatchView {
            phase: self.phase,
            variant: self.variant,
            seat,
            players,
            hand,
            playable: self.playable_cards(seat),
            top: self.top_face().copied(),
            active_color: self.active_color,
            current_player_index: self.current_player_index,
            direction: self.direction,
            accumulated_penalty: self.accumulated_penalty,
            draw_pile: self.draw_pile.len(),
            is_alternate_face: self.is_alternate_face,
            winner: self.winner,
        }
    }
}

impl fmt::Display for MatchView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(winner) = self.winner.and_then(|seat| self.players.get(seat)) {
            return writeln!(f, "{} won the match!", winner.name);
        }
        if self.phase == Phase::Lobby {
            writeln!(f, "lobby ({} players)", self.players.len())?;
            for player in &self.players {
                let host = if player.is_host { " (host)" } else { "" };
                writeln!(f, "  {}{host}", player.name)?;
            }
            return Ok(());
        }

        match self.top {
            Some(top) => write!(f, "top: {top}, color {}", self.active_color)?,
            None => write!(f, "top: -")?,
        }
        write!(f, ", {} to draw", self.draw_pile)?;
        if self.accumulated_penalty > 0 {
            write!(f, ", +{} pending", self.accumulated_penalty)?;
        }
        if self.is_alternate_face {
            write!(f, " [dark side]")?;
        }
        writeln!(f)?;

        for (seat, player) in self.players.iter().enumerate() {
            let marker = if seat == self.current_player_index { ">" } else { " " };
            let you = if seat == self.seat { " (you)" } else { "" };
            let uno = if player.declared_safe { " UNO!" } else { "" };
            writeln!(f, "{marker} {}{you}: {} cards{uno}", player.name, player.hand_size)?;
        }

        write!(f, "hand:")?;
        for (index, card) in self.hand.iter().enumerate() {
            let face = card.face(self.is_alternate_face);
            let playable = if self.playable.contains(&index) { "*" } else { "" };
            write!(f, " [{index}] {face}{playable}")?;
        }
        writeln!(f)
    }
}
