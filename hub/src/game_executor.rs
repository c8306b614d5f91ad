//! Session actors.
//!
//! Each running game is a tokio task that owns its engine outright. Inputs
//! arrive over an `mpsc` channel, engine events fan out over `broadcast`, and
//! the latest engine state is kept in a `watch` channel for anyone who wants
//! to render it. Time is driven from here, never from inside the engines.

use std::time::Duration;

use common::{
    Difficulty, Direction, DuosEvent, DuosGame, GameCommand, GameEvent, GameKind, PseudoRandom, Side,
    SnakeGame, TrikiEvent, TrikiGame, DUOS_POLL_INTERVAL_MS, OPPONENT_THINK_MS,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::context::AppContext;
use crate::result_persistence::{persist_game_result, GameResult, PersistenceReport};
use crate::session_manager::SessionError;

const INPUT_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    TrikiMark { row: usize, col: usize },
    SnakeTurn(Direction),
    DuosFlip(usize),
    /// Start a fresh round of the same game.
    Restart,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Triki(TrikiEvent),
    Snake(GameEvent),
    Duos(DuosEvent),
    /// A new round began after `Restart`.
    RoundStarted,
    Finished(GameResult),
    /// Background persistence for a finished round completed.
    Persisted(PersistenceReport),
}

#[derive(Debug, Clone)]
pub enum SessionSnapshot {
    Triki(TrikiGame),
    Snake(SnakeGame),
    Duos(DuosGame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSpec {
    Triki,
    Snake { grid_size: u16 },
    Duos { difficulty: Difficulty },
}

impl GameSpec {
    pub fn game(&self) -> GameKind {
        match self {
            GameSpec::Triki => GameKind::Triki,
            GameSpec::Snake { .. } => GameKind::Snake,
            GameSpec::Duos { .. } => GameKind::Duos,
        }
    }
}

pub struct SessionHandle {
    id: Uuid,
    game: GameKind,
    input_tx: mpsc::Sender<SessionInput>,
    event_tx: broadcast::Sender<SessionEvent>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    cancellation_token: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn game(&self) -> GameKind {
        self.game
    }

    pub async fn send(&self, input: SessionInput) -> Result<(), SessionError> {
        self.input_tx.send(input).await.map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Latest engine state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the actor to exit.
    pub async fn shutdown(self) {
        self.cancellation_token.cancel();
        if let Err(e) = self.task.await {
            error!("Session {} task failed: {:?}", self.id, e);
        }
    }
}

/// Outbound side of a session actor.
struct SessionIo {
    id: Uuid,
    event_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    result_tx: mpsc::UnboundedSender<GameResult>,
}

impl SessionIo {
    fn publish(&self, event: SessionEvent) {
        debug!("Session {} event: {:?}", self.id, event);
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn snapshot(&self, snapshot: SessionSnapshot) {
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Announce the result and queue it for persistence.
    fn finish(&self, result: GameResult) {
        info!("Session {} finished: {:?}", self.id, result);
        self.publish(SessionEvent::Finished(result.clone()));
        if self.result_tx.send(result).is_err() {
            error!("Session {} persistence worker is gone, round not saved", self.id);
        }
    }
}

/// Persist finished rounds one at a time, in the order they finished.
///
/// The worker outlives the actor until every queued round is written, and
/// exits once the session's sender is dropped.
pub fn spawn_persistence_worker(
    ctx: AppContext,
    event_tx: broadcast::Sender<SessionEvent>,
) -> (mpsc::UnboundedSender<GameResult>, JoinHandle<()>) {
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<GameResult>();
    let task = tokio::spawn(async move {
        while let Some(result) = result_rx.recv().await {
            let _guard = ctx.persist_lock.lock().await;
            let report = persist_game_result(ctx.db.as_ref(), &ctx.user_id, &result).await;
            // No subscribers is fine
            let _ = event_tx.send(SessionEvent::Persisted(report));
        }
    });
    (result_tx, task)
}

/// Spawn a session actor for `spec`.
pub fn spawn_session(ctx: AppContext, spec: GameSpec) -> SessionHandle {
    let id = Uuid::new_v4();
    let mut seeds = PseudoRandom::new(ctx.seed());

    let initial = match spec {
        GameSpec::Triki => SessionSnapshot::Triki(TrikiGame::new()),
        GameSpec::Snake { grid_size } => SessionSnapshot::Snake(SnakeGame::new(grid_size, seeds.next_u64())),
        GameSpec::Duos { difficulty } => SessionSnapshot::Duos(DuosGame::new(difficulty, seeds.next_u64())),
    };

    let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
    let (snapshot_tx, snapshot_rx) = watch::channel(initial.clone());
    let cancellation_token = CancellationToken::new();

    let (result_tx, _) = spawn_persistence_worker(ctx, event_tx.clone());
    let io = SessionIo {
        id,
        event_tx: event_tx.clone(),
        snapshot_tx,
        result_tx,
    };
    let token = cancellation_token.clone();

    info!("Starting {} session {}", spec.game(), id);
    let task = tokio::spawn(async move {
        match initial {
            SessionSnapshot::Triki(game) => run_triki(io, game, seeds, input_rx, token).await,
            SessionSnapshot::Snake(game) => run_snake(io, game, seeds, input_rx, token).await,
            SessionSnapshot::Duos(game) => run_duos(io, game, seeds, input_rx, token).await,
        }
    });

    SessionHandle {
        id,
        game: spec.game(),
        input_tx,
        event_tx,
        snapshot_rx,
        cancellation_token,
        task,
    }
}

async fn run_triki(
    io: SessionIo,
    mut game: TrikiGame,
    mut rng: PseudoRandom,
    mut input_rx: mpsc::Receiver<SessionInput>,
    cancellation_token: CancellationToken,
) {
    let think = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(think);
    let mut thinking = false;

    loop {
        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => {
                info!("Triki session {} shutting down", io.id);
                break;
            }

            _ = &mut think, if thinking => {
                thinking = false;
                let Some((row, col)) = game.choose_opponent_move(&mut rng) else {
                    continue;
                };
                let events = game.place_mark(Side::Opponent, row, col);
                io.snapshot(SessionSnapshot::Triki(game.clone()));
                for event in events {
                    io.publish(SessionEvent::Triki(event));
                }
                if let Some(outcome) = game.take_outcome() {
                    io.finish(GameResult::Triki { outcome });
                }
            }

            input = input_rx.recv() => {
                let Some(input) = input else {
                    debug!("Triki session {} input closed", io.id);
                    break;
                };
                match input {
                    SessionInput::TrikiMark { row, col } => {
                        let events = game.place_mark(Side::Player, row, col);
                        if events.is_empty() {
                            debug!("Ignored mark at ({}, {})", row, col);
                            continue;
                        }
                        io.snapshot(SessionSnapshot::Triki(game.clone()));
                        for event in events {
                            io.publish(SessionEvent::Triki(event));
                        }
                        if let Some(outcome) = game.take_outcome() {
                            io.finish(GameResult::Triki { outcome });
                        } else if game.turn() == Side::Opponent {
                            think.as_mut().reset(Instant::now() + Duration::from_millis(OPPONENT_THINK_MS));
                            thinking = true;
                        }
                    }
                    SessionInput::Restart => {
                        thinking = false;
                        game.restart();
                        io.snapshot(SessionSnapshot::Triki(game.clone()));
                        io.publish(SessionEvent::RoundStarted);
                    }
                    other => debug!("Triki session {} ignoring {:?}", io.id, other),
                }
            }
        }
    }
}

fn snake_interval(period_ms: u64) -> Interval {
    let period = Duration::from_millis(period_ms);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn run_snake(
    io: SessionIo,
    mut game: SnakeGame,
    mut seeds: PseudoRandom,
    mut input_rx: mpsc::Receiver<SessionInput>,
    cancellation_token: CancellationToken,
) {
    let grid_size = game.grid_size;
    let mut period = game.tick_interval_ms();
    let mut interval = snake_interval(period);

    loop {
        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => {
                info!("Snake session {} shutting down", io.id);
                break;
            }

            input = input_rx.recv() => {
                let Some(input) = input else {
                    debug!("Snake session {} input closed", io.id);
                    break;
                };
                match input {
                    SessionInput::SnakeTurn(direction) => {
                        match game.exec_command(&GameCommand::Turn { direction }) {
                            Ok(events) => {
                                io.snapshot(SessionSnapshot::Snake(game.clone()));
                                for event in events {
                                    io.publish(SessionEvent::Snake(event));
                                }
                            }
                            Err(e) => error!("Snake session {} rejected turn: {:?}", io.id, e),
                        }
                    }
                    SessionInput::Restart => {
                        game = SnakeGame::new(grid_size, seeds.next_u64());
                        period = game.tick_interval_ms();
                        interval = snake_interval(period);
                        io.snapshot(SessionSnapshot::Snake(game.clone()));
                        io.publish(SessionEvent::RoundStarted);
                    }
                    other => debug!("Snake session {} ignoring {:?}", io.id, other),
                }
            }

            _ = interval.tick(), if !game.is_over() => {
                match game.exec_command(&GameCommand::Tick) {
                    Ok(events) => {
                        io.snapshot(SessionSnapshot::Snake(game.clone()));
                        for event in events {
                            io.publish(SessionEvent::Snake(event));
                        }
                    }
                    Err(e) => error!("Snake session {} tick {} failed: {:?}", io.id, game.current_tick(), e),
                }

                if let Some((score, food)) = game.take_result() {
                    io.finish(GameResult::Snake { score, food });
                } else if game.tick_interval_ms() != period {
                    period = game.tick_interval_ms();
                    debug!("Snake session {} speeding up to {}ms", io.id, period);
                    interval = snake_interval(period);
                }
            }
        }
    }
}

fn duos_interval() -> Interval {
    let period = Duration::from_millis(DUOS_POLL_INTERVAL_MS);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

async fn run_duos(
    io: SessionIo,
    mut game: DuosGame,
    mut seeds: PseudoRandom,
    mut input_rx: mpsc::Receiver<SessionInput>,
    cancellation_token: CancellationToken,
) {
    let difficulty = game.difficulty();
    let mut started = Instant::now();
    let mut interval = duos_interval();

    // Shared tail of every state change
    let settle = |io: &SessionIo, game: &mut DuosGame, events: Vec<DuosEvent>| {
        if !events.is_empty() {
            io.snapshot(SessionSnapshot::Duos(game.clone()));
        }
        for event in events {
            io.publish(SessionEvent::Duos(event));
        }
        if let Some(outcome) = game.take_outcome() {
            io.finish(GameResult::Duos {
                outcome,
                difficulty: game.difficulty(),
                score: game.score(),
            });
        }
    };

    loop {
        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => {
                info!("Duos session {} shutting down", io.id);
                break;
            }

            input = input_rx.recv() => {
                let Some(input) = input else {
                    debug!("Duos session {} input closed", io.id);
                    break;
                };
                match input {
                    SessionInput::DuosFlip(index) => {
                        // Catch the clock up so the flip lands at the right time
                        let mut events = game.run_until(elapsed_ms(started));
                        events.extend(game.flip(index));
                        settle(&io, &mut game, events);
                    }
                    SessionInput::Restart => {
                        game = DuosGame::new(difficulty, seeds.next_u64());
                        started = Instant::now();
                        interval = duos_interval();
                        io.snapshot(SessionSnapshot::Duos(game.clone()));
                        io.publish(SessionEvent::RoundStarted);
                    }
                    other => debug!("Duos session {} ignoring {:?}", io.id, other),
                }
            }

            _ = interval.tick(), if !game.is_over() => {
                let events = game.run_until(elapsed_ms(started));
                settle(&io, &mut game, events);
            }
        }
    }
}
