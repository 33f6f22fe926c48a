//! Match configuration chosen by the host before starting.

use serde::{Deserialize, Serialize};

use super::{
    constants::{MAX_PLAYERS, MIN_PLAYERS},
    deck::Variant,
    state::Rules,
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchConfig {
    pub variant: Variant,
    pub rules: Rules,
    /// Lobby capacity, host included.
    pub max_players: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Classic,
            rules: Rules::default(),
            max_players: MAX_PLAYERS,
        }
    }
}

impl MatchConfig {
    #[must_use]
    pub fn new(variant: Variant, rules: Rules) -> Self {
        Self {
            variant,
            rules,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(format!(
                "Max players must be between {MIN_PLAYERS} and {MAX_PLAYERS}"
            ));
        }

        Ok(())
    }

    /// Whether `players` seats can start a match under this config.
    #[must_use]
    pub fn accepts(&self, players: usize) -> bool {
        (MIN_PLAYERS..=self.max_players).contains(&players)
    }
}
