//! Deck composition per variant and the shuffle every peer replays.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::card::{Card, CardId, CardKind, Color, Face};

/// Deck RNG. ChaCha8 is portable across platforms, so a seed shipped with
/// `GAME_START` produces the same deck on every peer.
pub type DeckRng = ChaCha8Rng;

#[must_use]
pub fn seeded_rng(seed: u64) -> DeckRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Named rule/deck configurations.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Variant {
    #[default]
    Classic,
    NoMercy,
    Flip,
}

impl Variant {
    /// Number of cards [`build_deck`] generates for this variant.
    #[must_use]
    pub const fn deck_size(self) -> usize {
        match self {
            Self::Classic => 108,
            Self::NoMercy => 132,
            Self::Flip => 88,
        }
    }

    #[must_use]
    pub const fn is_double_sided(self) -> bool {
        matches!(self, Self::Flip)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::NoMercy => write!(f, "no-mercy"),
            Self::Flip => write!(f, "flip"),
        }
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
#[error("unknown variant: {0} (expected classic, no-mercy or flip)")]
pub struct UnknownVariant(pub String);

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "classic" => Ok(Self::Classic),
            "no-mercy" | "nomercy" => Ok(Self::NoMercy),
            "flip" => Ok(Self::Flip),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Hands out sequential card ids so that every peer numbers a deck the
/// same way.
#[derive(Default)]
struct DeckBuilder {
    cards: Vec<Card>,
    next_id: CardId,
}

impl DeckBuilder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            cards: Vec::with_capacity(capacity),
            next_id: 0,
        }
    }

    fn push(&mut self, front: Face, back: Option<Face>) {
        self.cards.push(Card {
            id: self.next_id,
            front,
            back,
        });
        self.next_id += 1;
    }

    fn classic(&mut self) {
        for color in Color::LIGHT {
            self.push(Face::number(color, 0), None);
            for _ in 0..2 {
                for value in 1..=9 {
                    self.push(Face::number(color, value), None);
                }
                self.push(Face::action(color, CardKind::Skip), None);
                self.push(Face::action(color, CardKind::Reverse), None);
                self.push(Face::action(color, CardKind::DrawTwo), None);
            }
        }
        for _ in 0..4 {
            self.push(Face::action(Color::Wild, CardKind::Wild), None);
            self.push(Face::action(Color::Wild, CardKind::WildDrawFour), None);
        }
    }

    fn no_mercy(&mut self) {
        self.classic();
        for color in Color::LIGHT {
            for _ in 0..2 {
                self.push(Face::action(color, CardKind::SkipEveryone), None);
                self.push(Face::action(color, CardKind::DiscardAll), None);
            }
        }
        for _ in 0..4 {
            self.push(Face::action(Color::Wild, CardKind::WildDrawSix), None);
            self.push(Face::action(Color::Wild, CardKind::WildDrawTen), None);
        }
    }

    fn flip(&mut self) {
        for (light, dark) in Color::LIGHT.into_iter().zip(Color::DARK) {
            for value in 1..=9 {
                for _ in 0..2 {
                    self.push(
                        Face::number(light, value),
                        Some(Face::number(dark, value)),
                    );
                }
            }
            for _ in 0..2 {
                self.push(
                    Face::action(light, CardKind::Flip),
                    Some(Face::action(dark, CardKind::Flip)),
                );
            }
            for _ in 0..2 {
                self.push(
                    Face::action(light, CardKind::Skip),
                    Some(Face::action(dark, CardKind::SkipEveryone)),
                );
            }
        }
    }
}

/// Builds the unshuffled card multiset for a variant. Pure: the same
/// variant always yields the same cards with the same ids.
#[must_use]
pub fn build_deck(variant: Variant) -> Vec<Card> {
    let mut builder = DeckBuilder::with_capacity(variant.deck_size());
    match variant {
        Variant::Classic => builder.classic(),
        Variant::NoMercy => builder.no_mercy(),
        Variant::Flip => builder.flip(),
    }
    builder.cards
}

/// Fisher-Yates shuffle over an owned deck: for every index from the last
/// down to 1, swap it with a uniformly chosen index in `[0, i]`.
#[must_use]
pub fn shuffle<R: Rng + ?Sized>(mut cards: Vec<Card>, rng: &mut R) -> Vec<Card> {
    for i in (1..cards.len()).rev() {
        let j = rng.random_range(0..=i);
        cards.swap(i, j);
    }
    cards
}

/// A freshly built and shuffled deck.
#[must_use]
pub fn new_deck<R: Rng + ?Sized>(variant: Variant, rng: &mut R) -> Vec<Card> {
    shuffle(build_deck(variant), rng)
}
