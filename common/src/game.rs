use serde::{Deserialize, Serialize};
use std::fmt;

/// The minigames bundled in the arcade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Triki,
    Snake,
    Duos,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::Triki, GameKind::Snake, GameKind::Duos];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Triki => "triki",
            GameKind::Snake => "snake",
            GameKind::Duos => "duos",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a finished round from the human player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win)
    }
}
