//! Rule engine: the only code allowed to mutate a [`GameState`].
//!
//! Every entry point validates the whole command before touching the
//! state, so a rejected command is always a no-op. Entry points run to
//! completion synchronously; replaying the same commands against a state
//! started with the same seed yields the same state on every peer.

use log::{debug, info, warn};
use std::{cmp::max, collections::VecDeque};

use super::{
    card::{CardKind, Color, Face},
    constants::{DEFAULT_COLOR, HAND_SIZE, MAX_PLAYERS, MIN_PLAYERS, UNO_PENALTY},
    deck::{Variant, new_deck, seeded_rng, shuffle},
    errors::MoveError,
    events::{CardMoved, MoveKind},
    state::{Direction, GameState, Phase, Player, PlayerId, RosterEntry, Rules},
};

/// Seat reached by moving `1 + skip` steps from `current` in `direction`
/// around a table of `seats`. Total for any input; an empty table maps to
/// seat 0.
#[must_use]
pub fn next_seat(current: usize, skip: usize, direction: Direction, seats: usize) -> usize {
    if seats == 0 {
        return 0;
    }
    let steps = (1 + skip as i64) * direction.sign();
    (current as i64 + steps).rem_euclid(seats as i64) as usize
}

/// Outcome of validating a play, carried into the mutation step.
#[derive(Clone, Copy, Debug)]
struct CheckedPlay {
    face: Face,
    jump_in: bool,
}

impl GameState {
    /// Leaves the lobby: builds and shuffles the variant's deck from
    /// `seed`, deals [`HAND_SIZE`] cards to every seat in roster order and
    /// reveals the first discard.
    pub fn start_match(
        &mut self,
        variant: Variant,
        roster: Vec<RosterEntry>,
        rules: Rules,
        seed: u64,
    ) -> Result<(), MoveError> {
        if self.phase != Phase::Lobby {
            return Err(MoveError::AlreadyStarted);
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&roster.len()) {
            return Err(MoveError::InvalidRoster {
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
                actual: roster.len(),
            });
        }

        let mut rng = seeded_rng(seed);
        let mut draw_pile: VecDeque<_> = new_deck(variant, &mut rng).into();
        let deck_size = draw_pile.len();
        let mut players: Vec<Player> = roster.into_iter().map(Player::from).collect();
        for player in &mut players {
            let take = HAND_SIZE.min(draw_pile.len());
            player.hand = draw_pile.drain(..take).collect();
        }
        let Some(first) = draw_pile.pop_front() else {
            return Err(MoveError::InvalidRoster {
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
                actual: players.len(),
            });
        };

        self.active_color = if first.front.is_wild() {
            DEFAULT_COLOR
        } else {
            first.front.color
        };
        self.variant = variant;
        self.rules = rules;
        self.draw_pile = draw_pile;
        self.discard_pile = vec![first];
        self.players = players;
        self.current_player_index = 0;
        self.direction = Direction::Clockwise;
        self.accumulated_penalty = 0;
        self.is_alternate_face = false;
        self.winner = None;
        self.deck_size = deck_size;
        self.seed = seed;
        self.rng = rng;
        self.events.clear();
        self.phase = Phase::Playing;

        info!(
            "{variant} match started with {} players, first card {first}",
            self.players.len()
        );
        Ok(())
    }

    /// Plays the card at `card_index` from seat `player_index`'s hand.
    ///
    /// Out-of-turn plays are only accepted as jump-ins. `chosen_color` is
    /// required for wildcards and, when supplied, becomes the active color.
    pub fn play_card(
        &mut self,
        player_index: usize,
        card_index: usize,
        chosen_color: Option<Color>,
    ) -> Result<(), MoveError> {
        let CheckedPlay { face, jump_in } = self.check_play(player_index, card_index)?;
        match chosen_color {
            Some(Color::Wild) => return Err(MoveError::InvalidColor),
            None if face.is_wild() => return Err(MoveError::ColorRequired),
            _ => {}
        }

        let player = &mut self.players[player_index];
        let card = player.hand.remove(card_index);
        if player.hand.len() > 1 {
            player.declared_safe = false;
        }
        let emptied = player.hand.is_empty();

        debug!("seat {player_index} plays {face} (jump-in: {jump_in})");
        self.discard_pile.push(card);
        self.active_color = chosen_color.unwrap_or(face.color);
        self.events.push_back(CardMoved::play(card, player_index));

        if emptied {
            self.finish(player_index);
            return Ok(());
        }
        if jump_in {
            self.current_player_index = player_index;
        }
        self.apply_card_effect(face, player_index);
        Ok(())
    }

    /// Draws `max(1, penalty)` cards for the current player, clears the
    /// pending penalty and passes the turn. Returns the number of cards
    /// actually drawn.
    pub fn draw_card(&mut self, player_id: &PlayerId) -> Result<usize, MoveError> {
        self.ensure_playing()?;
        let seat = self.player_index(player_id).ok_or(MoveError::InvalidPlayer)?;
        if seat != self.current_player_index {
            return Err(MoveError::OutOfTurn);
        }
        if self.rules.forced_play
            && self.accumulated_penalty == 0
            && !self.playable_cards(seat).is_empty()
        {
            return Err(MoveError::MustPlay);
        }

        let wanted = max(1, self.accumulated_penalty) as usize;
        let drawn = self.deal_to(seat, wanted, MoveKind::Draw);
        debug!("seat {seat} draws {drawn} cards");

        self.players[seat].declared_safe = false;
        self.accumulated_penalty = 0;
        self.advance_turn(0);
        Ok(drawn)
    }

    /// UNO button. Catches every other player sitting on one card without
    /// having called UNO; if nobody is caught and the caller holds two
    /// cards or fewer, the caller is marked safe. Returns the caught seats.
    pub fn press_uno(&mut self, caller_id: &PlayerId) -> Result<Vec<usize>, MoveError> {
        self.ensure_playing()?;
        let caller = self.player_index(caller_id).ok_or(MoveError::InvalidPlayer)?;

        let exposed: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(seat, player)| {
                *seat != caller && player.hand.len() == 1 && !player.declared_safe
            })
            .map(|(seat, _)| seat)
            .collect();

        for &seat in &exposed {
            let drawn = self.deal_to(seat, UNO_PENALTY, MoveKind::Penalty);
            self.players[seat].declared_safe = false;
            info!("seat {seat} caught without calling UNO, draws {drawn}");
        }

        if exposed.is_empty() {
            let player = &mut self.players[caller];
            if player.hand.len() <= 2 {
                player.declared_safe = true;
                debug!("seat {caller} called UNO");
            }
        }
        Ok(exposed)
    }

    /// Whether seat `seat` could legally play the card at `card_index`
    /// right now (on turn, or as a jump-in). Color choice is not checked.
    #[must_use]
    pub fn can_play(&self, seat: usize, card_index: usize) -> bool {
        self.check_play(seat, card_index).is_ok()
    }

    /// Hand indices that [`Self::can_play`] accepts for `seat`.
    #[must_use]
    pub fn playable_cards(&self, seat: usize) -> Vec<usize> {
        let Some(player) = self.players.get(seat) else {
            return Vec::new();
        };
        (0..player.hand.len())
            .filter(|&index| self.can_play(seat, index))
            .collect()
    }

    fn ensure_playing(&self) -> Result<(), MoveError> {
        match self.phase {
            Phase::Lobby => Err(MoveError::GameNotInProgress),
            Phase::Playing => Ok(()),
            Phase::GameOver => Err(MoveError::GameOver),
        }
    }

    /// Turn ownership, penalty gate and matching, on the active faces.
    fn check_play(&self, seat: usize, card_index: usize) -> Result<CheckedPlay, MoveError> {
        self.ensure_playing()?;
        let player = self.players.get(seat).ok_or(MoveError::InvalidPlayer)?;
        let card = player
            .hand
            .get(card_index)
            .ok_or(MoveError::InvalidCard(card_index))?;
        let face = *card.face(self.is_alternate_face);
        let top = *self.top_face().ok_or(MoveError::GameNotInProgress)?;

        let same_number = face.value.is_some() && face.value == top.value;
        let same_action = face.kind != CardKind::Number && face.kind == top.kind;

        let jump_in = seat != self.current_player_index;
        if jump_in {
            let identical =
                !face.is_wild() && face.color == top.color && (same_number || same_action);
            if !(self.rules.jump_in && identical) {
                return Err(MoveError::OutOfTurn);
            }
        }

        if self.accumulated_penalty > 0 {
            if !(self.rules.stacking && face.kind == top.kind) {
                return Err(MoveError::PenaltyPending {
                    amount: self.accumulated_penalty,
                });
            }
        } else {
            let matches =
                face.is_wild() || face.color == self.active_color || same_number || same_action;
            if !matches {
                return Err(MoveError::IllegalCard);
            }
        }

        Ok(CheckedPlay { face, jump_in })
    }

    /// Side effects of a played face, then the turn advance.
    fn apply_card_effect(&mut self, face: Face, seat: usize) {
        if self.rules.seven_zero && face.kind == CardKind::Number {
            match face.value {
                Some(0) => self.rotate_hands(),
                Some(7) => self.swap_hands(seat),
                _ => {}
            }
        }

        let opponents = self.players.len().saturating_sub(1);
        let skip = match face.kind {
            CardKind::Skip => 1,
            CardKind::SkipEveryone => opponents,
            CardKind::Reverse => {
                self.direction = self.direction.reversed();
                usize::from(self.players.len() == 2)
            }
            CardKind::DrawTwo
            | CardKind::WildDrawFour
            | CardKind::WildDrawSix
            | CardKind::WildDrawTen => {
                self.accumulated_penalty += face.kind.penalty();
                0
            }
            CardKind::DiscardAll => {
                self.discard_rest(seat);
                return;
            }
            CardKind::Flip => {
                self.is_alternate_face = !self.is_alternate_face;
                let side = if self.is_alternate_face { "dark" } else { "light" };
                debug!("flipped to the {side} side");
                0
            }
            CardKind::Number | CardKind::Wild => 0,
        };
        self.advance_turn(skip);
    }

    fn advance_turn(&mut self, skip: usize) {
        self.current_player_index = next_seat(
            self.current_player_index,
            skip,
            self.direction,
            self.players.len(),
        );
    }

    /// 0 played under seven-zero: every hand (and its UNO flag) moves one
    /// seat along the direction of play.
    fn rotate_hands(&mut self) {
        let mut hands: Vec<_> = self
            .players
            .iter_mut()
            .map(|player| (std::mem::take(&mut player.hand), player.declared_safe))
            .collect();
        match self.direction {
            Direction::Clockwise => hands.rotate_right(1),
            Direction::CounterClockwise => hands.rotate_left(1),
        }
        for (player, (hand, safe)) in self.players.iter_mut().zip(hands) {
            player.hand = hand;
            player.declared_safe = safe;
        }
        debug!("hands rotated {:?}", self.direction);
    }

    /// 7 played under seven-zero: swap hand and UNO flag with the next seat.
    fn swap_hands(&mut self, seat: usize) {
        let other = next_seat(seat, 0, self.direction, self.players.len());
        if other == seat {
            return;
        }
        let hand = std::mem::take(&mut self.players[seat].hand);
        let safe = self.players[seat].declared_safe;
        self.players[seat].hand = std::mem::replace(&mut self.players[other].hand, hand);
        self.players[seat].declared_safe =
            std::mem::replace(&mut self.players[other].declared_safe, safe);
        debug!("seat {seat} swapped hands with seat {other}");
    }

    /// Discard-all: the rest of the hand goes under the played card and the
    /// player is out.
    fn discard_rest(&mut self, seat: usize) {
        let rest = std::mem::take(&mut self.players[seat].hand);
        if let Some(top) = self.discard_pile.pop() {
            for card in &rest {
                self.events.push_back(CardMoved::play(*card, seat));
            }
            self.discard_pile.extend(rest);
            self.discard_pile.push(top);
        }
        self.finish(seat);
    }

    fn finish(&mut self, seat: usize) {
        self.winner = Some(seat);
        self.phase = Phase::GameOver;
        if let Some(player) = self.players.get(seat) {
            info!("{} wins the match", player.name);
        }
    }

    /// Moves up to `count` cards from the draw pile into a hand, recycling
    /// the discard pile when the draw pile runs dry. Returns how many cards
    /// were dealt.
    fn deal_to(&mut self, seat: usize, count: usize, kind: MoveKind) -> usize {
        let mut dealt = 0;
        while dealt < count {
            let card = match self.draw_pile.pop_front() {
                Some(card) => card,
                None if self.recycle_discard() => continue,
                None => {
                    warn!("deck exhausted: seat {seat} drew {dealt} of {count} cards");
                    break;
                }
            };
            self.players[seat].hand.push(card);
            self.events.push_back(match kind {
                MoveKind::Penalty => CardMoved::penalty(card, seat),
                _ => CardMoved::draw(card, seat),
            });
            dealt += 1;
        }
        dealt
    }

    /// Reshuffles everything under the discard top into the draw pile.
    fn recycle_discard(&mut self) -> bool {
        if self.discard_pile.len() < 2 {
            return false;
        }
        let Some(top) = self.discard_pile.pop() else {
            return false;
        };
        let rest = std::mem::replace(&mut self.discard_pile, vec![top]);
        info!("reshuffling {} discarded cards into the draw pile", rest.len());
        self.draw_pile.extend(shuffle(rest, &mut self.rng));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{card::Card, state::Profile};

    fn roster(n: usize) -> Vec<RosterEntry> {
        (0..n)
            .map(|i| {
                RosterEntry::new(
                    PlayerId::new(&format!("p{i}")),
                    &Profile::new(&format!("Player {i}"), 0),
                    i == 0,
                )
            })
            .collect()
    }

    fn red(value: u8) -> Face {
        Face::number(Color::Red, value)
    }

    fn blue(value: u8) -> Face {
        Face::number(Color::Blue, value)
    }

    fn action(color: Color, kind: CardKind) -> Face {
        Face::action(color, kind)
    }

    /// A match in progress with fixed hands, a fixed discard top and a fixed
    /// draw pile. Card ids are unique across the whole table.
    fn rigged(hands: Vec<Vec<Face>>, top: Face, draw: Vec<Face>) -> GameState {
        let mut next_id = 0;
        let mut card = |front: Face| {
            next_id += 1;
            Card {
                id: next_id,
                front,
                back: None,
            }
        };
        let mut state = GameState::new();
        state.players = roster(hands.len()).into_iter().map(Player::from).collect();
        for (player, hand) in state.players.iter_mut().zip(hands) {
            player.hand = hand.into_iter().map(&mut card).collect();
        }
        state.discard_pile = vec![card(top)];
        state.draw_pile = draw.into_iter().map(&mut card).collect();
        state.active_color = if top.is_wild() { DEFAULT_COLOR } else { top.color };
        state.phase = Phase::Playing;
        state.deck_size = state.card_count();
        state
    }

    fn filler(n: usize) -> Vec<Face> {
        (0..n).map(|i| Face::number(Color::Yellow, (i % 9) as u8 + 1)).collect()
    }

    fn hand_len(state: &GameState, seat: usize) -> usize {
        state.players[seat].hand.len()
    }

    #[test]
    fn start_match_deals_and_reveals() {
        let mut state = GameState::new();
        state
            .start_match(Variant::Classic, roster(3), Rules::default(), 11)
            .unwrap();
        assert_eq!(state.phase(), Phase::Playing);
        assert!(state.players().iter().all(|p| p.hand.len() == HAND_SIZE));
        assert_eq!(state.discard_pile().len(), 1);
        assert_eq!(state.draw_pile_len(), 108 - 3 * HAND_SIZE - 1);
        assert_eq!(state.card_count(), state.deck_size());
        assert_ne!(state.active_color(), Color::Wild);
        assert_eq!(state.current_player_index(), 0);
        assert_eq!(state.direction(), Direction::Clockwise);
    }

    #[test]
    fn start_match_rejects_bad_rosters_and_restarts() {
        let mut state = GameState::new();
        assert_eq!(
            state.start_match(Variant::Classic, roster(1), Rules::default(), 0),
            Err(MoveError::InvalidRoster {
                min: 2,
                max: 8,
                actual: 1
            })
        );
        assert!(
            state
                .start_match(Variant::Classic, roster(9), Rules::default(), 0)
                .is_err()
        );
        assert_eq!(state.phase(), Phase::Lobby);
        state
            .start_match(Variant::Flip, roster(8), Rules::default(), 0)
            .unwrap();
        assert_eq!(
            state.start_match(Variant::Flip, roster(2), Rules::default(), 0),
            Err(MoveError::AlreadyStarted)
        );
    }

    #[test]
    fn same_seed_same_deal() {
        let mut a = GameState::new();
        let mut b = GameState::new();
        a.start_match(Variant::NoMercy, roster(4), Rules::default(), 99)
            .unwrap();
        b.start_match(Variant::NoMercy, roster(4), Rules::default(), 99)
            .unwrap();
        assert_eq!(a.players(), b.players());
        assert_eq!(a.top_card(), b.top_card());
    }

    #[test]
    fn next_seat_wraps_both_ways() {
        assert_eq!(next_seat(3, 0, Direction::Clockwise, 4), 0);
        assert_eq!(next_seat(0, 0, Direction::CounterClockwise, 4), 3);
        assert_eq!(next_seat(1, 1, Direction::CounterClockwise, 4), 3);
        assert_eq!(next_seat(2, 3, Direction::Clockwise, 4), 2);
        assert_eq!(next_seat(5, 2, Direction::Clockwise, 0), 0);
    }

    #[test]
    fn matching_color_is_accepted() {
        let mut state = rigged(vec![vec![red(3), blue(9)], filler(3)], red(5), filler(5));
        state.play_card(0, 0, None).unwrap();
        assert_eq!(hand_len(&state, 0), 1);
        assert_eq!(state.top_face(), Some(&red(3)));
        assert_eq!(state.active_color(), Color::Red);
        assert_eq!(state.current_player_index(), 1);
        assert_eq!(state.card_count(), state.deck_size());
    }

    #[test]
    fn same_number_is_accepted_and_mismatch_rejected() {
        let mut state = rigged(vec![vec![blue(5), blue(8), red(1)], filler(3)], red(5), vec![]);
        assert_eq!(state.play_card(0, 1, None), Err(MoveError::IllegalCard));
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.active_color(), Color::Blue);
    }

    #[test]
    fn rejected_moves_leave_state_untouched() {
        let mut state = rigged(vec![vec![blue(9), red(1)], filler(3)], red(5), vec![]);
        let before = state.clone();
        assert_eq!(state.play_card(0, 0, None), Err(MoveError::IllegalCard));
        assert_eq!(state.play_card(0, 7, None), Err(MoveError::InvalidCard(7)));
        assert_eq!(state.play_card(5, 0, None), Err(MoveError::InvalidPlayer));
        assert_eq!(state.play_card(1, 0, None), Err(MoveError::OutOfTurn));
        assert_eq!(state.players(), before.players());
        assert_eq!(state.discard_pile(), before.discard_pile());
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn wild_requires_a_real_color() {
        let wild = action(Color::Wild, CardKind::Wild);
        let mut state = rigged(vec![vec![wild, red(1)], filler(3)], blue(5), vec![]);
        assert_eq!(state.play_card(0, 0, None), Err(MoveError::ColorRequired));
        assert_eq!(
            state.play_card(0, 0, Some(Color::Wild)),
            Err(MoveError::InvalidColor)
        );
        state.play_card(0, 0, Some(Color::Green)).unwrap();
        assert_eq!(state.active_color(), Color::Green);
    }

    #[test]
    fn chosen_color_is_honoured_on_plain_cards() {
        let mut state = rigged(vec![vec![red(2), red(1)], filler(3)], red(5), vec![]);
        state.play_card(0, 0, Some(Color::Yellow)).unwrap();
        assert_eq!(state.active_color(), Color::Yellow);
    }

    #[test]
    fn reverse_acts_as_skip_with_two_players() {
        let reverse = action(Color::Red, CardKind::Reverse);
        let mut state = rigged(vec![vec![reverse, red(1)], filler(3)], red(5), vec![]);
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.direction(), Direction::CounterClockwise);
        assert_eq!(state.current_player_index(), 0);
    }

    #[test]
    fn reverse_turns_the_table_with_three_players() {
        let reverse = action(Color::Red, CardKind::Reverse);
        let mut state = rigged(vec![vec![reverse, red(1)], filler(3), filler(3)], red(5), vec![]);
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.current_player_index(), 2);
    }

    #[test]
    fn skip_and_skip_everyone() {
        let skip = action(Color::Red, CardKind::Skip);
        let mut state = rigged(vec![vec![skip, red(1)], filler(3), filler(3)], red(5), vec![]);
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.current_player_index(), 2);

        let everyone = action(Color::Red, CardKind::SkipEveryone);
        let mut state = rigged(
            vec![vec![everyone, red(1)], filler(3), filler(3), filler(3)],
            red(5),
            vec![],
        );
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.current_player_index(), 0);
    }

    #[test]
    fn stacking_gate() {
        let draw_two = action(Color::Red, CardKind::DrawTwo);
        let blue_draw_two = action(Color::Blue, CardKind::DrawTwo);
        let mut state = rigged(
            vec![vec![draw_two, red(1)], vec![red(9), blue_draw_two, red(2)]],
            red(5),
            filler(10),
        );
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.accumulated_penalty(), 2);
        assert_eq!(
            state.play_card(1, 0, None),
            Err(MoveError::PenaltyPending { amount: 2 })
        );
        state.play_card(1, 1, None).unwrap();
        assert_eq!(state.accumulated_penalty(), 4);

        let drawn = state.draw_card(&PlayerId::new("p0")).unwrap();
        assert_eq!(drawn, 4);
        assert_eq!(hand_len(&state, 0), 5);
        assert_eq!(state.accumulated_penalty(), 0);
        assert_eq!(state.current_player_index(), 1);
    }

    #[test]
    fn stacking_disabled_forces_the_draw() {
        let draw_two = action(Color::Red, CardKind::DrawTwo);
        let mut state = rigged(
            vec![vec![draw_two, red(1)], vec![draw_two, red(2)]],
            red(5),
            filler(4),
        );
        state.rules.stacking = false;
        state.play_card(0, 0, None).unwrap();
        assert_eq!(
            state.play_card(1, 0, None),
            Err(MoveError::PenaltyPending { amount: 2 })
        );

        assert_eq!(state.draw_card(&PlayerId::new("p1")), Ok(2));
        assert_eq!(hand_len(&state, 1), 4);
        assert_eq!(state.accumulated_penalty, 0);
        assert_eq!(state.current_player_index, 0);
        assert_eq!(state.card_count(), state.deck_size);
    }

    #[test]
    fn wild_draws_add_their_penalty() {
        for (kind, amount) in [
            (CardKind::WildDrawFour, 4),
            (CardKind::WildDrawSix, 6),
            (CardKind::WildDrawTen, 10),
        ] {
            let mut state = rigged(
                vec![vec![action(Color::Wild, kind), red(1)], filler(2)],
                blue(3),
                vec![],
            );
            state.play_card(0, 0, Some(Color::Red)).unwrap();
            assert_eq!(state.accumulated_penalty(), amount);
        }
    }

    #[test]
    fn emptying_the_hand_wins_and_is_terminal() {
        let mut state = rigged(vec![vec![red(3)], filler(3)], red(5), filler(3));
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.phase(), Phase::GameOver);
        assert_eq!(state.winner_index(), Some(0));
        assert_eq!(state.play_card(1, 0, None), Err(MoveError::GameOver));
        assert_eq!(
            state.draw_card(&PlayerId::new("p1")),
            Err(MoveError::GameOver)
        );
        assert_eq!(
            state.press_uno(&PlayerId::new("p1")),
            Err(MoveError::GameOver)
        );
    }

    #[test]
    fn discard_all_wins() {
        let discard_all = action(Color::Red, CardKind::DiscardAll);
        let mut state = rigged(vec![vec![blue(1), discard_all, blue(2)], filler(3)], red(5), vec![]);
        state.play_card(0, 1, None).unwrap();
        assert_eq!(state.phase(), Phase::GameOver);
        assert_eq!(state.winner_index(), Some(0));
        assert_eq!(hand_len(&state, 0), 0);
        assert_eq!(state.top_face(), Some(&discard_all));
        assert_eq!(state.discard_pile().len(), 4);
        assert_eq!(state.card_count(), state.deck_size());
    }

    #[test]
    fn uno_catch_and_safe_call() {
        let mut state = rigged(vec![vec![red(1), red(2)], vec![blue(7)], filler(3)], red(5), filler(6));
        let caught = state.press_uno(&PlayerId::new("p0")).unwrap();
        assert_eq!(caught, vec![1]);
        assert_eq!(hand_len(&state, 1), 3);
        assert!(!state.players[1].declared_safe);
        assert!(!state.players[0].declared_safe);

        let caught = state.press_uno(&PlayerId::new("p0")).unwrap();
        assert!(caught.is_empty());
        assert!(state.players[0].declared_safe);

        // a safe player can no longer be caught
        state.play_card(0, 0, None).unwrap();
        assert_eq!(hand_len(&state, 0), 1);
        assert!(state.press_uno(&PlayerId::new("p2")).unwrap().is_empty());
        assert_eq!(hand_len(&state, 0), 1);
        assert_eq!(
            state.press_uno(&PlayerId::new("ghost")),
            Err(MoveError::InvalidPlayer)
        );
    }

    #[test]
    fn calling_uno_with_a_big_hand_does_nothing() {
        let mut state = rigged(vec![filler(5), filler(5)], red(5), vec![]);
        assert!(state.press_uno(&PlayerId::new("p0")).unwrap().is_empty());
        assert!(!state.players[0].declared_safe);
    }

    #[test]
    fn draw_is_turn_gated() {
        let mut state = rigged(vec![filler(2), filler(2)], red(5), filler(2));
        assert_eq!(
            state.draw_card(&PlayerId::new("p1")),
            Err(MoveError::OutOfTurn)
        );
        assert_eq!(
            state.draw_card(&PlayerId::new("nobody")),
            Err(MoveError::InvalidPlayer)
        );
        assert_eq!(state.draw_card(&PlayerId::new("p0")), Ok(1));
        assert_eq!(state.current_player_index(), 1);
    }

    #[test]
    fn forced_play_refuses_the_draw() {
        let mut state = rigged(vec![vec![red(1), blue(2)], filler(2)], red(5), filler(2));
        state.rules.forced_play = true;
        assert_eq!(
            state.draw_card(&PlayerId::new("p0")),
            Err(MoveError::MustPlay)
        );
        state.rules.forced_play = false;
        assert_eq!(state.draw_card(&PlayerId::new("p0")), Ok(1));
    }

    #[test]
    fn exhausted_deck_reshuffles_the_discard_pile() {
        let mut state = rigged(vec![vec![red(1), red(2)], vec![blue(1), blue(3)]], red(5), vec![]);
        state.discard_pile.insert(0, Card {
            id: 100,
            front: red(8),
            back: None,
        });
        state.discard_pile.insert(0, Card {
            id: 101,
            front: red(9),
            back: None,
        });
        state.deck_size = state.card_count();

        assert_eq!(state.draw_card(&PlayerId::new("p0")), Ok(1));
        assert_eq!(state.discard_pile().len(), 1);
        assert_eq!(state.draw_pile_len(), 1);
        assert_eq!(state.card_count(), state.deck_size());

        // one card left to draw and nothing left to recycle
        state.accumulated_penalty = 4;
        assert_eq!(state.draw_card(&PlayerId::new("p1")), Ok(1));
        assert_eq!(state.card_count(), state.deck_size());
    }

    #[test]
    fn jump_in_steals_the_turn() {
        let mut state = rigged(
            vec![filler(3), filler(3), vec![red(5), red(2)], filler(3)],
            red(5),
            vec![],
        );
        assert_eq!(state.play_card(2, 1, None), Err(MoveError::OutOfTurn));
        assert_eq!(state.play_card(2, 0, None), Err(MoveError::OutOfTurn));
        state.rules.jump_in = true;
        assert_eq!(state.play_card(2, 1, None), Err(MoveError::OutOfTurn));
        state.play_card(2, 0, None).unwrap();
        assert_eq!(state.current_player_index(), 3);
    }

    #[test]
    fn seven_swaps_with_the_next_seat() {
        let mut state = rigged(
            vec![vec![red(7), red(1), red(2)], vec![blue(1)], filler(4)],
            red(5),
            vec![],
        );
        state.rules.seven_zero = true;
        state.players[1].declared_safe = true;
        let seat1_hand = state.players[1].hand.clone();
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.players[0].hand, seat1_hand);
        assert!(state.players[0].declared_safe);
        assert_eq!(hand_len(&state, 1), 2);
        assert!(!state.players[1].declared_safe);
        assert_eq!(hand_len(&state, 2), 4);
        assert_eq!(state.current_player_index(), 1);
    }

    #[test]
    fn zero_rotates_hands_along_the_direction() {
        let mut state = rigged(
            vec![vec![red(0), red(1)], filler(2), filler(3)],
            red(5),
            vec![],
        );
        state.rules.seven_zero = true;
        let hands: Vec<_> = state.players.iter().map(|p| p.hand.clone()).collect();
        state.play_card(0, 0, None).unwrap();
        assert_eq!(hand_len(&state, 1), 1);
        assert_eq!(state.players[2].hand, hands[1]);
        assert_eq!(state.players[0].hand, hands[2]);

        let mut state = rigged(
            vec![vec![red(0), red(1)], filler(2), filler(3)],
            red(5),
            vec![],
        );
        state.rules.seven_zero = true;
        state.direction = Direction::CounterClockwise;
        let hands: Vec<_> = state.players.iter().map(|p| p.hand.clone()).collect();
        state.play_card(0, 0, None).unwrap();
        assert_eq!(state.players[0].hand, hands[1]);
        assert_eq!(state.players[1].hand, hands[2]);
        assert_eq!(hand_len(&state, 2), 1);
    }

    #[test]
    fn flip_toggles_the_active_faces() {
        let mut state = GameState::new();
        state
            .start_match(Variant::Flip, roster(2), Rules::default(), 5)
            .unwrap();
        let flip = Card {
            id: 500,
            front: action(Color::Red, CardKind::Flip),
            back: Some(action(Color::Orange, CardKind::Flip)),
        };
        state.players[0].hand.push(flip);
        state.active_color = Color::Red;
        state.deck_size += 1;
        let index = state.players[0].hand.len() - 1;
        state.play_card(0, index, None).unwrap();
        assert!(state.is_alternate_face());
        assert_eq!(state.top_face().map(|f| f.color), Some(Color::Orange));
        assert_eq!(state.active_color(), Color::Red);

        // The active color stays light, so only another Flip follows.
        state.players[1].hand = vec![
            Card {
                id: 501,
                front: Face::number(Color::Red, 3),
                back: Some(Face::number(Color::Orange, 3)),
            },
            Card {
                id: 502,
                front: action(Color::Blue, CardKind::Flip),
                back: Some(action(Color::Teal, CardKind::Flip)),
            },
        ];
        assert_eq!(state.current_player_index(), 1);
        assert_eq!(state.playable_cards(1), vec![1]);
    }

    #[test]
    fn commands_record_presentation_events() {
        let mut state = rigged(vec![vec![red(3), red(4)], filler(3)], red(5), filler(3));
        state.play_card(0, 0, None).unwrap();
        state.draw_card(&PlayerId::new("p1")).unwrap();
        let events: Vec<_> = state.drain_events().into_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, MoveKind::Play);
        assert_eq!(events[0].seat, 0);
        assert_eq!(events[1].kind, MoveKind::Draw);
        assert_eq!(events[1].seat, 1);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn playable_cards_follow_turn_and_matching() {
        let state = rigged(vec![vec![red(1), blue(2), blue(5)], vec![red(5)]], red(5), vec![]);
        assert_eq!(state.playable_cards(0), vec![0, 2]);
        assert!(state.playable_cards(1).is_empty());
        assert!(state.playable_cards(9).is_empty());
    }

    #[test]
    fn lobby_rejects_commands() {
        let mut state = GameState::new();
        assert_eq!(
            state.play_card(0, 0, None),
            Err(MoveError::GameNotInProgress)
        );
        assert_eq!(
            state.draw_card(&PlayerId::new("p0")),
            Err(MoveError::GameNotInProgress)
        );
    }
}
