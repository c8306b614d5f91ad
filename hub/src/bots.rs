//! Scripted players that drive sessions through their public inputs, the
//! same way an interactive front end would.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use common::{calculate_snake_move, DuosEvent, GameEvent, PseudoRandom, Side, TrikiEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::game_executor::{SessionEvent, SessionHandle, SessionInput, SessionSnapshot};
use crate::result_persistence::{GameResult, PersistenceReport};

/// How long to wait for background persistence after a round ends.
const PERSIST_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RoundSummary {
    pub result: GameResult,
    /// `None` if persistence did not report back in time.
    pub report: Option<PersistenceReport>,
}

async fn next_event(events: &mut broadcast::Receiver<SessionEvent>) -> Result<SessionEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Ok(event),
            Err(RecvError::Lagged(skipped)) => warn!("Bot fell behind by {} events", skipped),
            Err(RecvError::Closed) => bail!("Session closed mid-round"),
        }
    }
}

async fn await_persisted(events: &mut broadcast::Receiver<SessionEvent>) -> Option<PersistenceReport> {
    let wait = async {
        loop {
            match next_event(events).await {
                Ok(SessionEvent::Persisted(report)) => return Some(report),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    };
    match tokio::time::timeout(PERSIST_WAIT, wait).await {
        Ok(report) => report,
        Err(_) => {
            warn!("Timed out waiting for round persistence");
            None
        }
    }
}

async fn finish_round(events: &mut broadcast::Receiver<SessionEvent>, result: GameResult) -> RoundSummary {
    let report = await_persisted(events).await;
    RoundSummary { result, report }
}

/// Ask for a fresh round and wait until the session has reset.
pub async fn restart(handle: &SessionHandle) -> Result<()> {
    let mut events = handle.subscribe();
    handle.send(SessionInput::Restart).await?;
    loop {
        if let SessionEvent::RoundStarted = next_event(&mut events).await? {
            return Ok(());
        }
    }
}

fn steer(handle: &SessionHandle) -> Option<SessionInput> {
    let SessionSnapshot::Snake(game) = handle.snapshot() else {
        return None;
    };
    let direction = calculate_snake_move(&game)?;
    (direction != game.snake.direction).then_some(SessionInput::SnakeTurn(direction))
}

/// Let the autopilot play the active snake round to the end.
pub async fn play_snake(handle: &SessionHandle) -> Result<RoundSummary> {
    let mut events = handle.subscribe();
    if let Some(input) = steer(handle) {
        handle.send(input).await?;
    }

    loop {
        match next_event(&mut events).await? {
            SessionEvent::Snake(GameEvent::SnakeMoved { .. }) => {
                if let Some(input) = steer(handle) {
                    handle.send(input).await?;
                }
            }
            SessionEvent::Finished(result) => return Ok(finish_round(&mut events, result).await),
            _ => {}
        }
    }
}

fn random_empty_cell(handle: &SessionHandle, rng: &mut PseudoRandom) -> Result<(usize, usize)> {
    let SessionSnapshot::Triki(game) = handle.snapshot() else {
        bail!("Active session is not Triki");
    };
    let cells = game.empty_cells();
    rng.choose(&cells).copied().context("No empty cell left")
}

/// Play one Triki round with random legal marks against the opponent.
pub async fn play_triki(handle: &SessionHandle, rng: &mut PseudoRandom) -> Result<RoundSummary> {
    let mut events = handle.subscribe();
    let (row, col) = random_empty_cell(handle, rng)?;
    handle.send(SessionInput::TrikiMark { row, col }).await?;

    loop {
        match next_event(&mut events).await? {
            SessionEvent::Triki(TrikiEvent::TurnChanged { side: Side::Player }) => {
                let (row, col) = random_empty_cell(handle, rng)?;
                debug!("Triki bot marks ({}, {})", row, col);
                handle.send(SessionInput::TrikiMark { row, col }).await?;
            }
            SessionEvent::Finished(result) => return Ok(finish_round(&mut events, result).await),
            _ => {}
        }
    }
}

/// What the Duos bot has seen so far.
#[derive(Debug, Default)]
pub struct DuosMemory {
    card_count: usize,
    seen: BTreeMap<usize, u8>,
    matched: BTreeSet<usize>,
}

impl DuosMemory {
    pub fn new(card_count: usize) -> Self {
        Self {
            card_count,
            ..Self::default()
        }
    }

    pub fn remember(&mut self, index: usize, pair_id: u8) {
        self.seen.insert(index, pair_id);
    }

    pub fn mark_matched(&mut self, first: usize, second: usize) {
        self.matched.insert(first);
        self.matched.insert(second);
    }

    /// Two seen, unmatched cards showing the same face.
    pub fn known_pair(&self) -> Option<(usize, usize)> {
        let open: Vec<(usize, u8)> = self
            .seen
            .iter()
            .filter(|&(index, _)| !self.matched.contains(index))
            .map(|(&index, &pair_id)| (index, pair_id))
            .collect();
        open.iter().enumerate().find_map(|(i, &(first, pair_id))| {
            open[i + 1..]
                .iter()
                .find(|&&(_, other)| other == pair_id)
                .map(|&(second, _)| (first, second))
        })
    }

    /// The seen partner of `index`, if its face has come up before.
    pub fn partner_of(&self, index: usize) -> Option<usize> {
        let pair_id = *self.seen.get(&index)?;
        self.seen
            .iter()
            .find(|&(&other, &id)| other != index && id == pair_id && !self.matched.contains(&other))
            .map(|(&other, _)| other)
    }

    /// A card never turned up, other than `except`.
    pub fn unseen(&self, except: Option<usize>) -> Option<usize> {
        (0..self.card_count).find(|index| !self.seen.contains_key(index) && Some(*index) != except)
    }

    /// Any unmatched card other than `except`.
    pub fn any_open(&self, except: usize) -> Option<usize> {
        (0..self.card_count).find(|index| !self.matched.contains(index) && *index != except)
    }
}

/// Play a Duos round with perfect memory of every revealed card.
pub async fn play_duos(handle: &SessionHandle) -> Result<RoundSummary> {
    let SessionSnapshot::Duos(game) = handle.snapshot() else {
        bail!("Active session is not Duos");
    };
    let mut memory = DuosMemory::new(game.cards().len());
    let mut events = handle.subscribe();

    // Index of a lone flip still waiting for its second card
    let mut awaiting_second = start_turn(handle, &memory).await?;

    loop {
        match next_event(&mut events).await? {
            SessionEvent::Duos(DuosEvent::CardFlipped { index, pair_id }) => {
                memory.remember(index, pair_id);
                if awaiting_second == Some(index) {
                    awaiting_second = None;
                    let second = memory
                        .partner_of(index)
                        .or_else(|| memory.unseen(Some(index)))
                        .or_else(|| memory.any_open(index))
                        .context("No card left to pair with")?;
                    handle.send(SessionInput::DuosFlip(second)).await?;
                }
            }
            SessionEvent::Duos(DuosEvent::PairMatched { first, second, .. }) => {
                memory.mark_matched(first, second);
                if memory.matched.len() < memory.card_count {
                    awaiting_second = start_turn(handle, &memory).await?;
                }
            }
            SessionEvent::Duos(DuosEvent::CardsHidden { .. }) => {
                awaiting_second = start_turn(handle, &memory).await?;
            }
            SessionEvent::Finished(result) => return Ok(finish_round(&mut events, result).await),
            _ => {}
        }
    }
}

/// Flip a known pair outright, or one unseen card to learn its face.
async fn start_turn(handle: &SessionHandle, memory: &DuosMemory) -> Result<Option<usize>> {
    if let Some((first, second)) = memory.known_pair() {
        handle.send(SessionInput::DuosFlip(first)).await?;
        handle.send(SessionInput::DuosFlip(second)).await?;
        return Ok(None);
    }
    let first = memory.unseen(None).context("Every card is known but no pair is open")?;
    handle.send(SessionInput::DuosFlip(first)).await?;
    Ok(Some(first))
}
