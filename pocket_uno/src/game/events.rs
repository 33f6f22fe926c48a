//! "Card moved" presentation events and the timed queue the display layer
//! consumes them from.
//!
//! The engine only appends [`CardMoved`] records to the match state. Timing
//! lives entirely in [`PresentationQueue`], which owns copies of the cards
//! and has no way back into the state, so animation clocks can never
//! reorder or interleave with command replay.

use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt, time::Duration};

use super::card::Card;

/// Delay between consecutive cards flying to the same seat.
pub const DRAW_STAGGER: Duration = Duration::from_millis(100);

/// Delay between consecutive penalty cards dealt by a UNO catch.
pub const CATCH_STAGGER: Duration = Duration::from_millis(150);

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    Play,
    Draw,
    /// Forced draw after being caught without calling UNO.
    Penalty,
}

impl MoveKind {
    const fn stagger(self) -> Option<Duration> {
        match self {
            Self::Play => None,
            Self::Draw => Some(DRAW_STAGGER),
            Self::Penalty => Some(CATCH_STAGGER),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardMoved {
    pub kind: MoveKind,
    pub card: Card,
    pub seat: usize,
}

impl CardMoved {
    #[must_use]
    pub const fn play(card: Card, seat: usize) -> Self {
        Self {
            kind: MoveKind::Play,
            card,
            seat,
        }
    }

    #[must_use]
    pub const fn draw(card: Card, seat: usize) -> Self {
        Self {
            kind: MoveKind::Draw,
            card,
            seat,
        }
    }

    #[must_use]
    pub const fn penalty(card: Card, seat: usize) -> Self {
        Self {
            kind: MoveKind::Penalty,
            card,
            seat,
        }
    }
}

impl fmt::Display for CardMoved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MoveKind::Play => write!(f, "seat {} played {}", self.seat, self.card),
            MoveKind::Draw => write!(f, "seat {} drew a card", self.seat),
            MoveKind::Penalty => write!(f, "seat {} drew a penalty card", self.seat),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimedEvent {
    /// Display-clock instant at which the animation starts.
    pub at: Duration,
    pub event: CardMoved,
}

/// FIFO of timed visual events, driven by the display layer's own clock.
#[derive(Debug, Default)]
pub struct PresentationQueue {
    queue: VecDeque<TimedEvent>,
}

impl PresentationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a batch of events drained from the match. Plays start
    /// immediately; consecutive draws of the same kind to the same seat are
    /// staggered by [`DRAW_STAGGER`] (or [`CATCH_STAGGER`] for penalties).
    pub fn schedule<I>(&mut self, now: Duration, events: I)
    where
        I: IntoIterator<Item = CardMoved>,
    {
        let mut last: Option<(MoveKind, usize, Duration)> = None;
        for event in events {
            let offset = match (event.kind.stagger(), last) {
                (Some(step), Some((kind, seat, previous)))
                    if kind == event.kind && seat == event.seat =>
                {
                    previous + step
                }
                _ => Duration::ZERO,
            };
            last = Some((event.kind, event.seat, offset));
            self.queue.push_back(TimedEvent {
                at: now + offset,
                event,
            });
        }
    }

    /// Removes and returns every event whose start time has been reached,
    /// in scheduling order.
    pub fn pop_due(&mut self, now: Duration) -> Vec<CardMoved> {
        let mut due = Vec::new();
        let mut pending = VecDeque::with_capacity(self.queue.len());
        while let Some(timed) = self.queue.pop_front() {
            if timed.at <= now {
                due.push(timed.event);
            } else {
                pending.push_back(timed);
            }
        }
        self.queue = pending;
        due
    }

    /// Start time of the next pending event.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.iter().map(|timed| timed.at).min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{Color, Face};

    fn card(id: u32) -> Card {
        Card {
            id,
            front: Face::number(Color::Red, 1),
            back: None,
        }
    }

    #[test]
    fn draws_are_staggered_per_seat() {
        let mut queue = PresentationQueue::new();
        queue.schedule(
            Duration::ZERO,
            [
                CardMoved::play(card(0), 0),
                CardMoved::draw(card(1), 1),
                CardMoved::draw(card(2), 1),
                CardMoved::draw(card(3), 1),
                CardMoved::draw(card(4), 2),
            ],
        );
        assert_eq!(queue.len(), 5);

        let first = queue.pop_due(Duration::ZERO);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].kind, MoveKind::Play);
        assert_eq!(first[1].card.id, 1);
        assert_eq!(first[2].card.id, 4);

        assert_eq!(queue.next_due(), Some(DRAW_STAGGER));
        assert!(queue.pop_due(Duration::from_millis(99)).is_empty());
        assert_eq!(queue.pop_due(DRAW_STAGGER)[0].card.id, 2);
        assert_eq!(queue.pop_due(Duration::from_secs(1))[0].card.id, 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn catch_penalties_use_their_own_stagger() {
        let mut queue = PresentationQueue::new();
        queue.schedule(
            Duration::ZERO,
            [CardMoved::penalty(card(1), 2), CardMoved::penalty(card(2), 2)],
        );
        assert_eq!(queue.pop_due(DRAW_STAGGER).len(), 1);
        assert_eq!(queue.next_due(), Some(CATCH_STAGGER));
    }

    #[test]
    fn batches_are_relative_to_now() {
        let mut queue = PresentationQueue::new();
        let now = Duration::from_secs(5);
        queue.schedule(now, [CardMoved::draw(card(9), 0)]);
        assert!(queue.pop_due(Duration::from_secs(4)).is_empty());
        assert_eq!(queue.pop_due(now).len(), 1);
    }
}
