use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::GameKind;
use serde::{Deserialize, Serialize};

/// Top-level user document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub level: u32,
    pub exp: u32,
    /// Cosmetic avatar unlocked through leveling.
    pub avatar_special: Option<String>,
    /// Avatar picked by the user; cleared when a cosmetic unlocks.
    pub custom_avatar: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        UserProfile {
            level: 1,
            exp: 0,
            avatar_special: None,
            custom_avatar: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrikiStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl TrikiStats {
    pub fn rounds(&self) -> u32 {
        self.wins + self.losses + self.draws
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnakeStats {
    pub best_score: u32,
    pub last_score: u32,
    pub runs: u32,
    /// Food eaten across all runs.
    pub total_food: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuosStats {
    pub wins: u32,
    pub losses: u32,
    pub hard_wins: u32,
    pub best_score: u32,
}

/// Per-game stats document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum PlayerStats {
    Triki(TrikiStats),
    Snake(SnakeStats),
    Duos(DuosStats),
}

impl PlayerStats {
    pub fn empty(game: GameKind) -> Self {
        match game {
            GameKind::Triki => PlayerStats::Triki(TrikiStats::default()),
            GameKind::Snake => PlayerStats::Snake(SnakeStats::default()),
            GameKind::Duos => PlayerStats::Duos(DuosStats::default()),
        }
    }

    pub fn game(&self) -> GameKind {
        match self {
            PlayerStats::Triki(_) => GameKind::Triki,
            PlayerStats::Snake(_) => GameKind::Snake,
            PlayerStats::Duos(_) => GameKind::Duos,
        }
    }

    /// Cumulative wins; Snake has no win condition.
    pub fn wins(&self) -> u32 {
        match self {
            PlayerStats::Triki(stats) => stats.wins,
            PlayerStats::Snake(_) => 0,
            PlayerStats::Duos(stats) => stats.wins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionRecord {
    pub completed: bool,
    pub completed_at: DateTime<Utc>,
    pub reward: u32,
}

/// Mission id -> completion record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionProgress {
    pub missions: BTreeMap<String, MissionRecord>,
}

impl MissionProgress {
    pub fn is_completed(&self, mission_id: &str) -> bool {
        self.missions
            .get(mission_id)
            .map(|record| record.completed)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrophyRecord {
    pub id: String,
    pub unlocked: bool,
    pub date: DateTime<Utc>,
    pub title: String,
    pub description: String,
}
