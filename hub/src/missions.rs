//! Mission catalog and evaluation.
//!
//! Missions are one-time goals over a game's stats. A mission is granted the
//! first time its predicate holds after a game ends; its reward is paid into
//! experience exactly once.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::GameKind;
use tracing::{debug, info};

use crate::db::Database;
use crate::db::models::{MissionProgress, MissionRecord, PlayerStats};
use crate::progression::{persist_experience, ExperienceResult};

pub struct Mission {
    pub id: &'static str,
    pub game: GameKind,
    pub description: &'static str,
    pub reward: u32,
    predicate: fn(&PlayerStats) -> bool,
}

impl Mission {
    pub fn is_satisfied(&self, stats: &PlayerStats) -> bool {
        stats.game() == self.game && (self.predicate)(stats)
    }
}

fn triki_first_win(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Triki(t) if t.wins >= 1)
}

fn triki_ten_wins(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Triki(t) if t.wins >= 10)
}

fn triki_veteran(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Triki(t) if t.rounds() >= 25)
}

fn snake_first_run(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Snake(s) if s.runs >= 1)
}

fn snake_score_100(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Snake(s) if s.best_score >= 100)
}

fn snake_glutton(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Snake(s) if s.total_food >= 100)
}

fn duos_first_win(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Duos(d) if d.wins >= 1)
}

fn duos_hard_win(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Duos(d) if d.hard_wins >= 1)
}

fn duos_five_wins(stats: &PlayerStats) -> bool {
    matches!(stats, PlayerStats::Duos(d) if d.wins >= 5)
}

pub static MISSIONS: &[Mission] = &[
    Mission {
        id: "triki_first_win",
        game: GameKind::Triki,
        description: "Win your first Triki round",
        reward: 10,
        predicate: triki_first_win,
    },
    Mission {
        id: "triki_ten_wins",
        game: GameKind::Triki,
        description: "Win 10 Triki rounds",
        reward: 50,
        predicate: triki_ten_wins,
    },
    Mission {
        id: "triki_veteran",
        game: GameKind::Triki,
        description: "Play 25 Triki rounds",
        reward: 30,
        predicate: triki_veteran,
    },
    Mission {
        id: "snake_first_run",
        game: GameKind::Snake,
        description: "Finish a Snake run",
        reward: 10,
        predicate: snake_first_run,
    },
    Mission {
        id: "snake_score_100",
        game: GameKind::Snake,
        description: "Score 100 points in one Snake run",
        reward: 40,
        predicate: snake_score_100,
    },
    Mission {
        id: "snake_glutton",
        game: GameKind::Snake,
        description: "Eat 100 food across all Snake runs",
        reward: 60,
        predicate: snake_glutton,
    },
    Mission {
        id: "duos_first_win",
        game: GameKind::Duos,
        description: "Clear a Duos board",
        reward: 10,
        predicate: duos_first_win,
    },
    Mission {
        id: "duos_hard_win",
        game: GameKind::Duos,
        description: "Clear a Duos board on Dificil",
        reward: 50,
        predicate: duos_hard_win,
    },
    Mission {
        id: "duos_five_wins",
        game: GameKind::Duos,
        description: "Clear 5 Duos boards",
        reward: 30,
        predicate: duos_five_wins,
    },
];

pub fn missions_for(game: GameKind) -> impl Iterator<Item = &'static Mission> {
    MISSIONS.iter().filter(move |mission| mission.game == game)
}

/// Mark every newly satisfied mission as completed. Missions already marked
/// are skipped, so their reward and timestamp are never touched again.
pub fn evaluate_missions(
    progress: &mut MissionProgress,
    stats: &PlayerStats,
    now: DateTime<Utc>,
) -> Vec<&'static Mission> {
    let mut completed = Vec::new();
    for mission in missions_for(stats.game()) {
        if progress.is_completed(mission.id) || !mission.is_satisfied(stats) {
            continue;
        }
        progress.missions.insert(
            mission.id.to_string(),
            MissionRecord {
                completed: true,
                completed_at: now,
                reward: mission.reward,
            },
        );
        completed.push(mission);
    }
    completed
}

#[derive(Debug, Clone, Default)]
pub struct MissionReport {
    pub completed: Vec<&'static str>,
    pub reward: u32,
    pub experience: Option<ExperienceResult>,
}

/// Evaluate missions for a finished game and pay out their combined reward
/// as a separate experience update.
pub async fn persist_mission_rewards(
    db: &dyn Database,
    user_id: &str,
    stats: &PlayerStats,
) -> Result<MissionReport> {
    let mut progress = db
        .get_mission_progress(user_id)
        .await
        .context("Failed to load mission progress")?;

    let completed = evaluate_missions(&mut progress, stats, Utc::now());
    if completed.is_empty() {
        debug!("No new {} missions for user {}", stats.game(), user_id);
        return Ok(MissionReport::default());
    }

    db.save_mission_progress(user_id, &progress)
        .await
        .context("Failed to save mission progress")?;

    let reward: u32 = completed.iter().map(|mission| mission.reward).sum();
    let ids: Vec<&'static str> = completed.iter().map(|mission| mission.id).collect();
    info!("User {} completed missions {:?} for {} exp", user_id, ids, reward);

    let experience = persist_experience(db, user_id, reward).await?;
    Ok(MissionReport {
        completed: ids,
        reward,
        experience: Some(experience),
    })
}
