use anyhow::{Context, Result};
use chrono::Utc;
use common::GameKind;
use tracing::{debug, info};

use crate::db::Database;
use crate::db::models::TrophyRecord;

/// Win milestones are granted at every multiple of this many wins.
pub const MILESTONE_STEP: u32 = 50;

/// Snake score that unlocks the high-score trophy.
pub const SNAKE_SCORE_TROPHY_POINTS: u32 = 200;

pub const DUOS_HARD_WIN_TROPHY: &str = "duos_hard_win";
pub const SNAKE_SCORE_TROPHY: &str = "snake_score_200";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrophyGrant {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// The milestone reached by exactly `wins` wins, if any. Only exact,
/// non-zero multiples of `MILESTONE_STEP` count.
pub fn milestone_reached(wins: u32) -> Option<u32> {
    if wins > 0 && wins % MILESTONE_STEP == 0 {
        Some(wins)
    } else {
        None
    }
}

pub fn milestone_trophy(game: GameKind, milestone: u32) -> TrophyGrant {
    TrophyGrant {
        id: format!("{}_wins_{}", game.as_str(), milestone),
        title: format!("{} {} wins", game_title(game), milestone),
        description: format!("Won {} rounds of {}", milestone, game_title(game)),
    }
}

pub fn duos_hard_win_trophy() -> TrophyGrant {
    TrophyGrant {
        id: DUOS_HARD_WIN_TROPHY.to_string(),
        title: "Sharp Memory".to_string(),
        description: "Cleared a Duos board on Dificil".to_string(),
    }
}

pub fn snake_score_trophy() -> TrophyGrant {
    TrophyGrant {
        id: SNAKE_SCORE_TROPHY.to_string(),
        title: "Serpent Supreme".to_string(),
        description: format!("Scored {} points in one Snake run", SNAKE_SCORE_TROPHY_POINTS),
    }
}

fn game_title(game: GameKind) -> &'static str {
    match game {
        GameKind::Triki => "Triki",
        GameKind::Snake => "Snake",
        GameKind::Duos => "Duos",
    }
}

/// Unlock a trophy unless a record for it already exists. Returns whether it
/// was newly granted.
pub async fn grant_trophy(db: &dyn Database, user_id: &str, grant: &TrophyGrant) -> Result<bool> {
    let existing = db
        .get_trophy(user_id, &grant.id)
        .await
        .with_context(|| format!("Failed to look up trophy {}", grant.id))?;
    if existing.is_some() {
        debug!("User {} already holds trophy {}", user_id, grant.id);
        return Ok(false);
    }

    let record = TrophyRecord {
        id: grant.id.clone(),
        unlocked: true,
        date: Utc::now(),
        title: grant.title.clone(),
        description: grant.description.clone(),
    };
    db.unlock_trophy(user_id, &record)
        .await
        .with_context(|| format!("Failed to unlock trophy {}", grant.id))?;
    info!("User {} unlocked trophy {}", user_id, grant.id);
    Ok(true)
}

/// Grant the win milestone trophy when `wins` lands exactly on one.
pub async fn check_win_milestone(
    db: &dyn Database,
    user_id: &str,
    game: GameKind,
    wins: u32,
) -> Result<Option<String>> {
    let Some(milestone) = milestone_reached(wins) else {
        return Ok(None);
    };
    let grant = milestone_trophy(game, milestone);
    if grant_trophy(db, user_id, &grant).await? {
        Ok(Some(grant.id))
    } else {
        Ok(None)
    }
}
