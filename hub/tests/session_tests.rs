mod common;

use std::time::Duration;

use ::common::{
    DeathReason, Difficulty, Direction, DuosEvent, GameEvent, GameKind, Outcome, PseudoRandom, Side, TrikiEvent,
    BASE_TICK_MS, OPPONENT_THINK_MS,
};
use anyhow::Result;
use hub::bots;
use hub::db::Database;
use hub::db::models::PlayerStats;
use hub::game_executor::{spawn_session, GameSpec, SessionEvent, SessionInput, SessionSnapshot};
use hub::result_persistence::GameResult;
use tokio::time::Instant;

use crate::common::{drain, wait_for, TestEnvironment, TEST_USER};

fn is_opponent_mark(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Triki(TrikiEvent::MarkPlaced { side: Side::Opponent, .. }))
}

#[tokio::test(start_paused = true)]
async fn test_triki_opponent_waits_before_answering() -> Result<()> {
    let env = TestEnvironment::new(11);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Triki);
    let mut events = handle.subscribe();

    let start = Instant::now();
    handle.send(SessionInput::TrikiMark { row: 1, col: 1 }).await?;
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::Triki(TrikiEvent::TurnChanged { side: Side::Opponent }))
    })
    .await?;

    wait_for(&mut events, is_opponent_mark).await?;
    assert!(start.elapsed() >= Duration::from_millis(OPPONENT_THINK_MS));

    let SessionSnapshot::Triki(game) = handle.snapshot() else {
        panic!("expected a Triki snapshot");
    };
    assert_eq!(game.turn(), Side::Player);
    assert_eq!(game.empty_cells().len(), 7);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_triki_marks_ignored_while_opponent_thinks() -> Result<()> {
    let env = TestEnvironment::new(5);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Triki);
    let mut events = handle.subscribe();

    handle.send(SessionInput::TrikiMark { row: 0, col: 0 }).await?;
    handle.send(SessionInput::TrikiMark { row: 2, col: 2 }).await?;
    wait_for(&mut events, is_opponent_mark).await?;

    let SessionSnapshot::Triki(game) = handle.snapshot() else {
        panic!("expected a Triki snapshot");
    };
    // One player mark and one opponent mark
    assert_eq!(game.empty_cells().len(), 7);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_pending_opponent_move() -> Result<()> {
    let env = TestEnvironment::new(3);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Triki);
    let mut events = handle.subscribe();

    handle.send(SessionInput::TrikiMark { row: 0, col: 0 }).await?;
    wait_for(&mut events, |e| matches!(e, SessionEvent::Triki(TrikiEvent::MarkPlaced { .. }))).await?;
    handle.shutdown().await;

    tokio::time::sleep(Duration::from_millis(OPPONENT_THINK_MS * 2)).await;
    let rest = drain(&mut events).await;
    assert!(!rest.iter().any(is_opponent_mark));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_triki_round_is_persisted() -> Result<()> {
    let env = TestEnvironment::new(21);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Triki);
    let mut rng = PseudoRandom::new(99);

    let summary = bots::play_triki(&handle, &mut rng).await?;
    let report = summary.report.expect("persistence should report back");
    assert_eq!(report.errors, 0);

    let PlayerStats::Triki(stats) = env.db.get_stats(TEST_USER, GameKind::Triki).await? else {
        panic!("expected Triki stats");
    };
    assert_eq!(stats.rounds(), 1);

    // Restart clears the board for another round
    bots::restart(&handle).await?;
    let SessionSnapshot::Triki(game) = handle.snapshot() else {
        panic!("expected a Triki snapshot");
    };
    assert_eq!(game.empty_cells().len(), 9);
    assert!(!game.is_over());

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_snake_ticks_on_schedule_until_wall() -> Result<()> {
    let env = TestEnvironment::new(8);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Snake { grid_size: 10 });
    let mut events = handle.subscribe();

    let start = Instant::now();
    wait_for(&mut events, |e| matches!(e, SessionEvent::Snake(GameEvent::SnakeMoved { .. }))).await?;
    assert!(start.elapsed() >= Duration::from_millis(BASE_TICK_MS));

    // Steer straight up into the top wall
    handle.send(SessionInput::SnakeTurn(Direction::Up)).await?;
    let died = wait_for(&mut events, |e| matches!(e, SessionEvent::Snake(GameEvent::SnakeDied { .. }))).await?;
    assert!(matches!(
        died,
        SessionEvent::Snake(GameEvent::SnakeDied { reason: DeathReason::Wall | DeathReason::SelfCollision })
    ));

    let finished = wait_for(&mut events, |e| matches!(e, SessionEvent::Finished(_))).await?;
    let SessionEvent::Finished(GameResult::Snake { score, food }) = finished else {
        panic!("expected a Snake result");
    };
    assert_eq!(score, food * ::common::FOOD_SCORE);

    wait_for(&mut events, |e| matches!(e, SessionEvent::Persisted(_))).await?;
    let PlayerStats::Snake(stats) = env.db.get_stats(TEST_USER, GameKind::Snake).await? else {
        panic!("expected Snake stats");
    };
    assert_eq!(stats.runs, 1);
    assert_eq!(stats.last_score, score);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_snake_reversal_is_ignored() -> Result<()> {
    let env = TestEnvironment::new(8);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Snake { grid_size: 10 });
    let mut events = handle.subscribe();

    handle.send(SessionInput::SnakeTurn(Direction::Left)).await?;
    wait_for(&mut events, |e| matches!(e, SessionEvent::Snake(GameEvent::SnakeMoved { .. }))).await?;

    let SessionSnapshot::Snake(game) = handle.snapshot() else {
        panic!("expected a Snake snapshot");
    };
    assert_eq!(game.snake.direction, Direction::Right);
    assert!(game.alive);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_snake_stops_ticking() -> Result<()> {
    let env = TestEnvironment::new(8);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Snake { grid_size: 10 });
    let mut events = handle.subscribe();
    let watch = handle.watch();

    handle.shutdown().await;
    tokio::time::sleep(Duration::from_millis(BASE_TICK_MS * 4)).await;

    let rest = drain(&mut events).await;
    assert!(rest.is_empty());
    let snapshot = watch.borrow().clone();
    let SessionSnapshot::Snake(game) = snapshot else {
        panic!("expected a Snake snapshot");
    };
    assert_eq!(game.current_tick(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_duos_bot_clears_easy_board() -> Result<()> {
    let env = TestEnvironment::new(17);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Duos { difficulty: Difficulty::Easy });

    let summary = bots::play_duos(&handle).await?;
    let GameResult::Duos { outcome, difficulty, score } = summary.result else {
        panic!("expected a Duos result");
    };
    assert_eq!(outcome, Outcome::Win);
    assert_eq!(difficulty, Difficulty::Easy);
    // Four pairs and the flat bonus, plus whatever time was left
    assert!(score > 4 * ::common::MATCH_SCORE + 100);

    let report = summary.report.expect("persistence should report back");
    let missions = report.missions.expect("missions should be evaluated");
    assert_eq!(missions.completed, vec!["duos_first_win"]);
    assert_eq!(env.db.get_profile(TEST_USER).await?.exp, 20 + 10);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_duos_times_out_without_play() -> Result<()> {
    let env = TestEnvironment::new(4);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Duos { difficulty: Difficulty::Hard });
    let mut events = handle.subscribe();

    let start = Instant::now();
    wait_for(&mut events, |e| matches!(e, SessionEvent::Duos(DuosEvent::RoundLost { matched_pairs: 0 }))).await?;
    assert!(start.elapsed() >= Duration::from_millis(Difficulty::Hard.time_limit_ms()));

    let finished = wait_for(&mut events, |e| matches!(e, SessionEvent::Finished(_))).await?;
    assert!(matches!(
        finished,
        SessionEvent::Finished(GameResult::Duos { outcome: Outcome::Loss, .. })
    ));

    // Flips after the clock runs out change nothing
    handle.send(SessionInput::DuosFlip(0)).await?;
    let SessionSnapshot::Duos(game) = handle.snapshot() else {
        panic!("expected a Duos snapshot");
    };
    assert!(game.flipped().is_empty());

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_writes_do_not_block_play() -> Result<()> {
    let env = TestEnvironment::new(17);
    env.db.set_fail_writes(true);
    let handle = spawn_session(env.ctx.clone(), GameSpec::Duos { difficulty: Difficulty::Easy });

    let summary = bots::play_duos(&handle).await?;
    assert!(matches!(summary.result, GameResult::Duos { outcome: Outcome::Win, .. }));
    let report = summary.report.expect("persistence should still report back");
    assert!(report.errors > 0);
    assert!(report.stats.is_none());
    assert_eq!(env.db.writes(), 0);

    handle.shutdown().await;
    Ok(())
}
