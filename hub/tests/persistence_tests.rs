mod common;

use ::common::{Difficulty, DuosGame, GameKind, Outcome};
use anyhow::Result;
use hub::db::models::{DuosStats, PlayerStats, SnakeStats, TrikiStats};
use hub::db::{Database, InMemoryDatabase, JsonFileDatabase};
use hub::progression::TRIKI_WIN_EXP;
use hub::result_persistence::{persist_game_result, GameResult};

use crate::common::TEST_USER;

/// Play a scripted Easy board to a win at the five minute mark.
fn scripted_easy_win() -> Result<DuosGame> {
    let mut game = DuosGame::with_deck(Difficulty::Easy, vec![0, 0, 1, 1, 2, 2, 3, 3])?;
    for (pair, at_ms) in [(0, 10_000), (2, 100_000), (4, 200_000), (6, 299_000)] {
        game.run_until(at_ms);
        game.flip(pair);
        game.flip(pair + 1);
    }
    game.run_until(300_000);
    Ok(game)
}

#[tokio::test]
async fn test_duos_easy_round_end_to_end() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = JsonFileDatabase::open(dir.path()).await?;

    let mut game = scripted_easy_win()?;
    let outcome = game.take_outcome().expect("round should be over");
    assert_eq!(outcome, Outcome::Win);
    assert_eq!(game.score(), 680);

    let result = GameResult::Duos { outcome, difficulty: game.difficulty(), score: game.score() };
    let report = persist_game_result(&db, TEST_USER, &result).await;
    assert_eq!(report.errors, 0);

    // A fresh handle on the same directory sees everything
    let db = JsonFileDatabase::open(dir.path()).await?;
    assert_eq!(
        db.get_stats(TEST_USER, GameKind::Duos).await?,
        PlayerStats::Duos(DuosStats { wins: 1, best_score: 680, ..DuosStats::default() })
    );
    let profile = db.get_profile(TEST_USER).await?;
    assert_eq!((profile.level, profile.exp), (1, 20 + 10));
    assert!(db.get_mission_progress(TEST_USER).await?.is_completed("duos_first_win"));
    assert!(db.list_trophies(TEST_USER).await?.is_empty());

    let user_dir = dir.path().join(TEST_USER);
    assert!(user_dir.join("profile.json").exists());
    assert!(user_dir.join("stats").join("duos.json").exists());
    assert!(user_dir.join("missions.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_hard_win_unlocks_trophy_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = JsonFileDatabase::open(dir.path()).await?;
    let result = GameResult::Duos { outcome: Outcome::Win, difficulty: Difficulty::Hard, score: 1500 };

    let first = persist_game_result(&db, TEST_USER, &result).await;
    assert_eq!(first.trophies, vec!["duos_hard_win".to_string()]);
    let missions = first.missions.expect("missions should be evaluated");
    assert_eq!(missions.completed, vec!["duos_first_win", "duos_hard_win"]);

    let second = persist_game_result(&db, TEST_USER, &result).await;
    assert!(second.trophies.is_empty());
    assert!(second.missions.map(|m| m.completed.is_empty()).unwrap_or(false));

    let trophies = db.list_trophies(TEST_USER).await?;
    assert_eq!(trophies.len(), 1);
    assert!(dir.path().join(TEST_USER).join("trophies").join("duos_hard_win.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_triki_wins_level_and_milestone() -> Result<()> {
    let db = InMemoryDatabase::new();
    db.save_stats(TEST_USER, &PlayerStats::Triki(TrikiStats { wins: 45, losses: 5, draws: 0 }))
        .await?;

    let mut trophies = Vec::new();
    for _ in 0..5 {
        let report = persist_game_result(&db, TEST_USER, &GameResult::Triki { outcome: Outcome::Win }).await;
        assert_eq!(report.errors, 0);
        trophies.extend(report.trophies);
    }
    assert_eq!(trophies, vec!["triki_wins_50".to_string()]);

    // First win, ten wins and veteran missions all complete on the first
    // award; five wins of 15 plus 90 mission exp crosses level 1 once.
    let profile = db.get_profile(TEST_USER).await?;
    assert_eq!(profile.level, 2);
    assert_eq!(profile.exp, 5 * TRIKI_WIN_EXP + 90 - 100);
    Ok(())
}

#[tokio::test]
async fn test_partial_failure_keeps_earlier_steps() -> Result<()> {
    let db = InMemoryDatabase::new();
    let snake = GameResult::Snake { score: 120, food: 12 };

    let report = persist_game_result(&db, TEST_USER, &snake).await;
    assert_eq!(report.errors, 0);
    let exp_after_first = db.get_profile(TEST_USER).await?.exp;
    assert_eq!(exp_after_first, 12 * 2 + 10 + 40);

    // Later writes fail; nothing already stored is rolled back
    db.set_fail_writes(true);
    let report = persist_game_result(&db, TEST_USER, &GameResult::Snake { score: 250, food: 25 }).await;
    assert!(report.errors > 0);
    assert_eq!(db.get_profile(TEST_USER).await?.exp, exp_after_first);
    assert_eq!(
        db.get_stats(TEST_USER, GameKind::Snake).await?,
        PlayerStats::Snake(SnakeStats { best_score: 120, last_score: 120, runs: 1, total_food: 12 })
    );
    Ok(())
}
