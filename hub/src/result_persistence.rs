use anyhow::{bail, Context, Result};
use common::{Difficulty, GameKind, Outcome};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::db::Database;
use crate::db::models::PlayerStats;
use crate::missions::{persist_mission_rewards, MissionReport};
use crate::progression::{persist_experience, ExperienceResult, SNAKE_EXP_PER_FOOD, TRIKI_WIN_EXP};
use crate::trophies::{
    check_win_milestone, duos_hard_win_trophy, grant_trophy, snake_score_trophy,
    SNAKE_SCORE_TROPHY_POINTS,
};

/// Terminal result of one round, as handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Triki { outcome: Outcome },
    Snake { score: u32, food: u32 },
    Duos { outcome: Outcome, difficulty: Difficulty, score: u32 },
}

pub fn duos_win_exp(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 20,
        Difficulty::Hard => 40,
    }
}

impl GameResult {
    pub fn game(&self) -> GameKind {
        match self {
            GameResult::Triki { .. } => GameKind::Triki,
            GameResult::Snake { .. } => GameKind::Snake,
            GameResult::Duos { .. } => GameKind::Duos,
        }
    }

    pub fn is_win(&self) -> bool {
        match self {
            GameResult::Triki { outcome } | GameResult::Duos { outcome, .. } => outcome.is_win(),
            GameResult::Snake { .. } => false,
        }
    }

    /// Experience paid directly for the round, before mission rewards.
    pub fn experience_award(&self) -> u32 {
        match self {
            GameResult::Triki { outcome: Outcome::Win } => TRIKI_WIN_EXP,
            GameResult::Triki { .. } => 0,
            GameResult::Snake { food, .. } => food.saturating_mul(SNAKE_EXP_PER_FOOD),
            GameResult::Duos { outcome: Outcome::Win, difficulty, .. } => duos_win_exp(*difficulty),
            GameResult::Duos { .. } => 0,
        }
    }
}

/// Fold a finished round into the game's stats document.
pub fn apply_result(stats: &mut PlayerStats, result: &GameResult) -> Result<()> {
    match (stats, result) {
        (PlayerStats::Triki(stats), GameResult::Triki { outcome }) => match outcome {
            Outcome::Win => stats.wins += 1,
            Outcome::Loss => stats.losses += 1,
            Outcome::Draw => stats.draws += 1,
        },
        (PlayerStats::Snake(stats), GameResult::Snake { score, food }) => {
            stats.best_score = stats.best_score.max(*score);
            stats.last_score = *score;
            stats.runs += 1;
            stats.total_food += food;
        }
        (PlayerStats::Duos(stats), GameResult::Duos { outcome, difficulty, score }) => {
            if outcome.is_win() {
                stats.wins += 1;
                stats.best_score = stats.best_score.max(*score);
                if *difficulty == Difficulty::Hard {
                    stats.hard_wins += 1;
                }
            } else {
                stats.losses += 1;
            }
        }
        (stats, result) => bail!("Cannot apply {} result to {} stats", result.game(), stats.game()),
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PersistenceReport {
    pub stats: Option<PlayerStats>,
    pub experience: Option<ExperienceResult>,
    pub missions: Option<MissionReport>,
    pub trophies: Vec<String>,
    /// Steps that failed and were skipped.
    pub errors: usize,
}

async fn update_stats(db: &dyn Database, user_id: &str, result: &GameResult) -> Result<PlayerStats> {
    let mut stats = db
        .get_stats(user_id, result.game())
        .await
        .context("Failed to load stats")?;
    apply_result(&mut stats, result)?;
    db.save_stats(user_id, &stats)
        .await
        .context("Failed to save stats")?;
    Ok(stats)
}

async fn grant_trophies(
    db: &dyn Database,
    user_id: &str,
    result: &GameResult,
    stats: Option<&PlayerStats>,
) -> Result<Vec<String>> {
    let mut granted = Vec::new();

    if result.is_win() {
        if let Some(stats) = stats {
            if let Some(id) = check_win_milestone(db, user_id, result.game(), stats.wins()).await? {
                granted.push(id);
            }
        }
    }

    let event_trophy = match result {
        GameResult::Duos { outcome: Outcome::Win, difficulty: Difficulty::Hard, .. } => {
            Some(duos_hard_win_trophy())
        }
        GameResult::Snake { score, .. } if *score >= SNAKE_SCORE_TROPHY_POINTS => Some(snake_score_trophy()),
        _ => None,
    };
    if let Some(grant) = event_trophy {
        if grant_trophy(db, user_id, &grant).await? {
            granted.push(grant.id);
        }
    }

    Ok(granted)
}

/// Persist every side effect of a finished round: stats, experience,
/// missions and trophies. Each step is attempted independently; failures are
/// logged and counted but never returned, so the round's outcome stands
/// regardless of storage health.
pub async fn persist_game_result(db: &dyn Database, user_id: &str, result: &GameResult) -> PersistenceReport {
    let mut report = PersistenceReport::default();
    let game = result.game();

    match update_stats(db, user_id, result).await {
        Ok(stats) => report.stats = Some(stats),
        Err(e) => {
            error!("Failed to persist {} stats for user {}: {:?}", game, user_id, e);
            report.errors += 1;
        }
    }

    let award = result.experience_award();
    if award > 0 {
        match persist_experience(db, user_id, award).await {
            Ok(experience) => report.experience = Some(experience),
            Err(e) => {
                error!("Failed to persist {} exp for user {}: {:?}", award, user_id, e);
                report.errors += 1;
            }
        }
    }

    // Missions are evaluated against the stats we just wrote
    if let Some(stats) = &report.stats {
        match persist_mission_rewards(db, user_id, stats).await {
            Ok(missions) => report.missions = Some(missions),
            Err(e) => {
                error!("Failed to evaluate {} missions for user {}: {:?}", game, user_id, e);
                report.errors += 1;
            }
        }
    }

    match grant_trophies(db, user_id, result, report.stats.as_ref()).await {
        Ok(trophies) => report.trophies = trophies,
        Err(e) => {
            error!("Failed to grant {} trophies for user {}: {:?}", game, user_id, e);
            report.errors += 1;
        }
    }

    info!(
        "Persisted {} result for user {} ({} exp, {} trophies, {} errors)",
        game,
        user_id,
        award,
        report.trophies.len(),
        report.errors
    );
    report
}
