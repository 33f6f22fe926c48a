use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Card colors. The light colors are used by every variant, the dark
/// colors only appear on the back face of double-sided cards.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Orange,
    Teal,
    Purple,
    Pink,
    // Sentinel for wildcards. A wild card declares the next active color,
    // so this is never an active color itself.
    Wild,
}

impl Color {
    pub const LIGHT: [Self; 4] = [Self::Red, Self::Blue, Self::Green, Self::Yellow];
    /// Dark colors, index-aligned with their light partners.
    pub const DARK: [Self; 4] = [Self::Orange, Self::Teal, Self::Purple, Self::Pink];

    #[must_use]
    pub const fn is_wild(self) -> bool {
        matches!(self, Self::Wild)
    }

    #[must_use]
    pub const fn is_dark(self) -> bool {
        matches!(self, Self::Orange | Self::Teal | Self::Purple | Self::Pink)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Teal => "teal",
            Self::Purple => "purple",
            Self::Pink => "pink",
            Self::Wild => "wild",
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
#[error("unknown color: {0}")]
pub struct UnknownColor(pub String);

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let color = match s.trim().to_ascii_lowercase().as_str() {
            "r" | "red" => Self::Red,
            "b" | "blue" => Self::Blue,
            "g" | "green" => Self::Green,
            "y" | "yellow" => Self::Yellow,
            "orange" => Self::Orange,
            "teal" => Self::Teal,
            "purple" => Self::Purple,
            "pink" => Self::Pink,
            "wild" => Self::Wild,
            _ => return Err(UnknownColor(s.to_string())),
        };
        Ok(color)
    }
}

/// What a card does when played. Serialized with the protocol's
/// screaming tags (`DRAW_2`, `WILD_DRAW_4`, ...).
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum CardKind {
    #[serde(rename = "NUMBER")]
    Number,
    #[serde(rename = "SKIP")]
    Skip,
    #[serde(rename = "REVERSE")]
    Reverse,
    #[serde(rename = "DRAW_2")]
    DrawTwo,
    #[serde(rename = "WILD")]
    Wild,
    #[serde(rename = "WILD_DRAW_4")]
    WildDrawFour,
    #[serde(rename = "SKIP_EVERYONE")]
    SkipEveryone,
    #[serde(rename = "DISCARD_ALL")]
    DiscardAll,
    #[serde(rename = "WILD_DRAW_6")]
    WildDrawSix,
    #[serde(rename = "WILD_DRAW_10")]
    WildDrawTen,
    #[serde(rename = "FLIP")]
    Flip,
}

impl CardKind {
    /// Number of forced draws this kind adds to the accumulated penalty.
    #[must_use]
    pub const fn penalty(self) -> u32 {
        match self {
            Self::DrawTwo => 2,
            Self::WildDrawFour => 4,
            Self::WildDrawSix => 6,
            Self::WildDrawTen => 10,
            _ => 0,
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Number => "number",
            Self::Skip => "skip",
            Self::Reverse => "reverse",
            Self::DrawTwo => "+2",
            Self::Wild => "wild",
            Self::WildDrawFour => "+4",
            Self::SkipEveryone => "skip everyone",
            Self::DiscardAll => "discard all",
            Self::WildDrawSix => "+6",
            Self::WildDrawTen => "+10",
            Self::Flip => "flip",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for number card values (0-9).
pub type Value = u8;

/// One printed side of a card.
///
/// `value` is present iff `kind` is [`CardKind::Number`]. The engine only
/// builds faces through the constructors.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Face {
    pub color: Color,
    pub kind: CardKind,
    pub value: Option<Value>,
}

impl Face {
    #[must_use]
    pub const fn number(color: Color, value: Value) -> Self {
        Self {
            color,
            kind: CardKind::Number,
            value: Some(value),
        }
    }

    #[must_use]
    pub const fn action(color: Color, kind: CardKind) -> Self {
        Self {
            color,
            kind,
            value: None,
        }
    }

    #[must_use]
    pub const fn is_wild(&self) -> bool {
        self.color.is_wild()
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.kind, self.value) {
            (CardKind::Number, Some(value)) => write!(f, "{} {value}", self.color),
            (CardKind::Wild, _) => write!(f, "wild"),
            (kind, _) => write!(f, "{} {kind}", self.color),
        }
    }
}

/// Unique card identity within a generated deck.
pub type CardId = u32;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub id: CardId,
    pub front: Face,
    /// Dark-side face. Only double-sided decks carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<Face>,
}

impl Card {
    /// The face that is currently in play. Single-sided cards always show
    /// their front.
    #[must_use]
    pub fn face(&self, alternate: bool) -> &Face {
        match (&self.back, alternate) {
            (Some(back), true) => back,
            _ => &self.front,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.back {
            Some(back) => write!(f, "{} / {back}", self.front),
            None => write!(f, "{}", self.front),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_display() {
        assert_eq!(Face::number(Color::Red, 7).to_string(), "red 7");
        assert_eq!(Face::action(Color::Blue, CardKind::Skip).to_string(), "blue skip");
        assert_eq!(Face::action(Color::Wild, CardKind::WildDrawFour).to_string(), "wild +4");
        assert_eq!(Face::action(Color::Wild, CardKind::Wild).to_string(), "wild");
    }

    #[test]
    fn face_selection_falls_back_to_front() {
        let single = Card {
            id: 1,
            front: Face::number(Color::Green, 3),
            back: None,
        };
        assert_eq!(single.face(true), &single.front);

        let double = Card {
            id: 2,
            front: Face::number(Color::Green, 3),
            back: Some(Face::number(Color::Purple, 3)),
        };
        assert_eq!(double.face(false).color, Color::Green);
        assert_eq!(double.face(true).color, Color::Purple);
    }

    #[test]
    fn color_parsing() {
        assert_eq!("Red".parse::<Color>(), Ok(Color::Red));
        assert_eq!(" y ".parse::<Color>(), Ok(Color::Yellow));
        assert_eq!(
            "mauve".parse::<Color>(),
            Err(UnknownColor("mauve".to_string()))
        );
        assert!(Color::Teal.is_dark());
        assert!(!Color::Red.is_dark());
    }

    #[test]
    fn kind_wire_names() {
        assert_eq!(serde_json::to_string(&CardKind::DrawTwo).unwrap(), "\"DRAW_2\"");
        assert_eq!(
            serde_json::to_string(&CardKind::WildDrawTen).unwrap(),
            "\"WILD_DRAW_10\""
        );
        assert_eq!(CardKind::WildDrawSix.penalty(), 6);
        assert_eq!(CardKind::Skip.penalty(), 0);
    }
}
