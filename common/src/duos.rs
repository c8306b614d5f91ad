use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::board::Grid;
use crate::constants::{MATCH_SCORE, MATCH_SETTLE_MS, MISMATCH_SETTLE_MS};
use crate::game::Outcome;
use crate::util::PseudoRandom;

const DECK_WIDTH: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// "Facil": 4 pairs, 8 minutes
    Easy,
    /// "Dificil": 8 pairs, 4 minutes
    Hard,
}

impl Difficulty {
    pub fn pair_count(&self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Hard => 8,
        }
    }

    pub fn card_count(&self) -> usize {
        self.pair_count() * 2
    }

    pub fn time_limit_ms(&self) -> u64 {
        match self {
            Difficulty::Easy => 480_000,
            Difficulty::Hard => 240_000,
        }
    }

    /// Flat bonus added on a win.
    pub fn flat_bonus(&self) -> u32 {
        match self {
            Difficulty::Easy => 100,
            Difficulty::Hard => 300,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Facil",
            Difficulty::Hard => "Dificil",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "easy" | "facil" => Ok(Difficulty::Easy),
            "hard" | "dificil" => Ok(Difficulty::Hard),
            other => Err(anyhow!("Unknown difficulty: {}", other)),
        }
    }
}

/// Bonus for the seconds left on the clock when the last pair matches.
pub fn time_bonus(seconds_left: u64) -> u32 {
    seconds_left.min(u32::MAX as u64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardStatus {
    FaceDown,
    FaceUp,
    Matched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub pair_id: u8,
    pub status: CardStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum ResolutionPhase {
    Compare,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PendingResolution {
    first: usize,
    second: usize,
    flipped_at_ms: u64,
    phase: ResolutionPhase,
}

impl PendingResolution {
    fn due_ms(&self) -> u64 {
        match self.phase {
            ResolutionPhase::Compare => self.flipped_at_ms + MATCH_SETTLE_MS,
            ResolutionPhase::Hide => self.flipped_at_ms + MISMATCH_SETTLE_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuosEvent {
    CardFlipped { index: usize, pair_id: u8 },
    PairMatched { first: usize, second: usize, score: u32 },
    PairMismatched { first: usize, second: usize },
    CardsHidden { first: usize, second: usize },
    RoundWon { score: u32, time_bonus: u32, flat_bonus: u32 },
    RoundLost { matched_pairs: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuosGame {
    difficulty: Difficulty,
    cards: Grid<Card>,
    flipped: Vec<usize>,
    pending: Option<PendingResolution>,
    now_ms: u64,
    score: u32,
    outcome: Option<Outcome>,
    outcome_taken: bool,
}

impl DuosGame {
    /// Deal a shuffled deck for `difficulty`.
    pub fn new(difficulty: Difficulty, seed: u64) -> Self {
        let mut pair_ids: Vec<u8> = (0..difficulty.pair_count() as u8)
            .flat_map(|id| [id, id])
            .collect();
        PseudoRandom::new(seed).shuffle(&mut pair_ids);
        Self::build(difficulty, pair_ids)
    }

    /// Deal a fixed deck. Every pair id must appear exactly twice.
    pub fn with_deck(difficulty: Difficulty, pair_ids: Vec<u8>) -> Result<Self> {
        ensure!(
            pair_ids.len() == difficulty.card_count(),
            "{} deck needs {} cards, got {}",
            difficulty,
            difficulty.card_count(),
            pair_ids.len()
        );
        for id in &pair_ids {
            let copies = pair_ids.iter().filter(|other| *other == id).count();
            ensure!(copies == 2, "Pair id {} appears {} times", id, copies);
        }
        Ok(Self::build(difficulty, pair_ids))
    }

    fn build(difficulty: Difficulty, pair_ids: Vec<u8>) -> Self {
        let cards: Vec<Card> = pair_ids
            .into_iter()
            .map(|pair_id| Card { pair_id, status: CardStatus::FaceDown })
            .collect();
        let height = (cards.len() as u16).div_ceil(DECK_WIDTH);
        let cards = Grid::from_cells(DECK_WIDTH, height, cards)
            .unwrap_or_else(|| Grid::new(0, 0, Card { pair_id: 0, status: CardStatus::FaceDown }));
        DuosGame {
            difficulty,
            cards,
            flipped: Vec::with_capacity(2),
            pending: None,
            now_ms: 0,
            score: 0,
            outcome: None,
            outcome_taken: false,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn cards(&self) -> &[Card] {
        self.cards.cells()
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.cells().get(index)
    }

    /// Cards flipped and waiting for resolution.
    pub fn flipped(&self) -> &[usize] {
        &self.flipped
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.difficulty.time_limit_ms().saturating_sub(self.now_ms)
    }

    pub fn seconds_left(&self) -> u64 {
        self.remaining_ms() / 1000
    }

    pub fn matched_pairs(&self) -> usize {
        self.cards().iter().filter(|c| c.status == CardStatus::Matched).count() / 2
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Hand out the round outcome exactly once.
    pub fn take_outcome(&mut self) -> Option<Outcome> {
        if self.outcome_taken {
            return None;
        }
        let outcome = self.outcome?;
        self.outcome_taken = true;
        Some(outcome)
    }

    /// Turn a card face up. Ignored for matched or already flipped cards,
    /// while two cards are pending, and once time is up.
    pub fn flip(&mut self, index: usize) -> Vec<DuosEvent> {
        let mut out = Vec::new();
        if self.is_over() || self.remaining_ms() == 0 || self.flipped.len() >= 2 {
            return out;
        }
        let Some(card) = self.cards.cells_mut().get_mut(index) else {
            return out;
        };
        if card.status != CardStatus::FaceDown {
            return out;
        }

        card.status = CardStatus::FaceUp;
        out.push(DuosEvent::CardFlipped { index, pair_id: card.pair_id });
        self.flipped.push(index);

        if let &[first, second] = self.flipped.as_slice() {
            self.pending = Some(PendingResolution {
                first,
                second,
                flipped_at_ms: self.now_ms,
                phase: ResolutionPhase::Compare,
            });
        }
        out
    }

    /// Advance the round clock to `elapsed_ms` since the deal. Resolutions
    /// due on or before the deadline run before the timeout is checked.
    pub fn run_until(&mut self, elapsed_ms: u64) -> Vec<DuosEvent> {
        let mut out = Vec::new();
        if self.is_over() {
            return out;
        }

        let target = elapsed_ms.max(self.now_ms);
        let limit = self.difficulty.time_limit_ms();

        while let Some(due) = self.pending.map(|p| p.due_ms()) {
            if due > target || due > limit {
                break;
            }
            self.now_ms = due;
            self.resolve(&mut out);
            if self.is_over() {
                return out;
            }
        }

        self.now_ms = target;
        if self.now_ms >= limit {
            self.outcome = Some(Outcome::Loss);
            out.push(DuosEvent::RoundLost { matched_pairs: self.matched_pairs() });
        }
        out
    }

    fn resolve(&mut self, out: &mut Vec<DuosEvent>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let (first, second) = (pending.first, pending.second);

        match pending.phase {
            ResolutionPhase::Compare => {
                let cells = self.cards.cells_mut();
                if cells[first].pair_id == cells[second].pair_id {
                    cells[first].status = CardStatus::Matched;
                    cells[second].status = CardStatus::Matched;
                    self.flipped.clear();
                    self.score += MATCH_SCORE;
                    out.push(DuosEvent::PairMatched { first, second, score: self.score });

                    if self.matched_pairs() == self.difficulty.pair_count() {
                        self.finish_won(out);
                    }
                } else {
                    out.push(DuosEvent::PairMismatched { first, second });
                    self.pending = Some(PendingResolution {
                        phase: ResolutionPhase::Hide,
                        ..pending
                    });
                }
            }
            ResolutionPhase::Hide => {
                let cells = self.cards.cells_mut();
                cells[first].status = CardStatus::FaceDown;
                cells[second].status = CardStatus::FaceDown;
                self.flipped.clear();
                out.push(DuosEvent::CardsHidden { first, second });
            }
        }
    }

    fn finish_won(&mut self, out: &mut Vec<DuosEvent>) {
        let time_bonus = time_bonus(self.seconds_left());
        let flat_bonus = self.difficulty.flat_bonus();
        self.score += time_bonus + flat_bonus;
        self.outcome = Some(Outcome::Win);
        out.push(DuosEvent::RoundWon { score: self.score, time_bonus, flat_bonus });
    }
}
