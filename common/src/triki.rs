use serde::{Deserialize, Serialize};

use crate::board::{Grid, Position};
use crate::constants::TRIKI_SIZE;
use crate::game::Outcome;
use crate::util::PseudoRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }

    fn mark(self) -> Cell {
        match self {
            Side::Player => Cell::Player,
            Side::Opponent => Cell::Opponent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Player,
    Opponent,
}

impl Cell {
    pub fn owner(self) -> Option<Side> {
        match self {
            Cell::Empty => None,
            Cell::Player => Some(Side::Player),
            Cell::Opponent => Some(Side::Opponent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Row,
    Column,
    Diagonal,
    AntiDiagonal,
}

/// A complete line on the board. `index` is the row or column number and is
/// always 0 for the diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub axis: Axis,
    pub index: usize,
}

impl Line {
    /// Cells of the line as (row, col).
    pub fn cells(&self) -> [(usize, usize); TRIKI_SIZE] {
        let i = self.index;
        match self.axis {
            Axis::Row => [(i, 0), (i, 1), (i, 2)],
            Axis::Column => [(0, i), (1, i), (2, i)],
            Axis::Diagonal => [(0, 0), (1, 1), (2, 2)],
            Axis::AntiDiagonal => [(0, 2), (1, 1), (2, 0)],
        }
    }
}

// Scan order: rows, then columns, then the two diagonals.
const LINES: [Line; 8] = [
    Line { axis: Axis::Row, index: 0 },
    Line { axis: Axis::Row, index: 1 },
    Line { axis: Axis::Row, index: 2 },
    Line { axis: Axis::Column, index: 0 },
    Line { axis: Axis::Column, index: 1 },
    Line { axis: Axis::Column, index: 2 },
    Line { axis: Axis::Diagonal, index: 0 },
    Line { axis: Axis::AntiDiagonal, index: 0 },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrikiEvent {
    MarkPlaced { side: Side, row: usize, col: usize },
    TurnChanged { side: Side },
    RoundWon { side: Side, line: Line },
    RoundDrawn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrikiGame {
    board: Grid<Cell>,
    turn: Side,
    game_over: bool,
    winner: Option<Side>,
    winning_line: Option<Line>,
    outcome_taken: bool,
}

impl Default for TrikiGame {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_pos(row: usize, col: usize) -> Position {
    Position::new(col as i16, row as i16)
}

impl TrikiGame {
    pub fn new() -> Self {
        TrikiGame {
            board: Grid::new(TRIKI_SIZE as u16, TRIKI_SIZE as u16, Cell::Empty),
            turn: Side::Player,
            game_over: false,
            winner: None,
            winning_line: None,
            outcome_taken: false,
        }
    }

    /// Build a position directly from rows. Terminal boards are marked over.
    pub fn from_rows(rows: [[Cell; TRIKI_SIZE]; TRIKI_SIZE], turn: Side) -> Self {
        let mut game = TrikiGame::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                game.board.set(cell_pos(r, c), *cell);
            }
        }
        game.turn = turn;
        game.evaluate_end();
        game
    }

    /// Clear the board for a new round. The player always opens.
    pub fn restart(&mut self) {
        *self = TrikiGame::new();
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.board.get(cell_pos(row, col)).copied().unwrap_or_default()
    }

    pub fn turn(&self) -> Side {
        self.turn
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn winning_line(&self) -> Option<Line> {
        self.winning_line
    }

    pub fn is_board_full(&self) -> bool {
        self.board.cells().iter().all(|c| *c != Cell::Empty)
    }

    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        self.board
            .iter()
            .filter(|(_, cell)| **cell == Cell::Empty)
            .map(|(pos, _)| (pos.y as usize, pos.x as usize))
            .collect()
    }

    /// Place a mark for `side`. Returns no events when the move is not legal.
    pub fn place_mark(&mut self, side: Side, row: usize, col: usize) -> Vec<TrikiEvent> {
        let mut out = Vec::new();
        if self.game_over || side != self.turn || row >= TRIKI_SIZE || col >= TRIKI_SIZE {
            return out;
        }
        if self.cell(row, col) != Cell::Empty {
            return out;
        }

        self.board.set(cell_pos(row, col), side.mark());
        out.push(TrikiEvent::MarkPlaced { side, row, col });

        self.evaluate_end();
        match (self.game_over, self.winner, self.winning_line) {
            (true, Some(side), Some(line)) => out.push(TrikiEvent::RoundWon { side, line }),
            (true, _, _) => out.push(TrikiEvent::RoundDrawn),
            (false, _, _) => {
                self.turn = self.turn.other();
                out.push(TrikiEvent::TurnChanged { side: self.turn });
            }
        }
        out
    }

    /// First complete line in scan order, with its owner.
    pub fn check_winner(&self) -> Option<(Side, Line)> {
        LINES.iter().find_map(|line| {
            let [a, b, c] = line.cells().map(|(r, c)| self.cell(r, c));
            match a.owner() {
                Some(side) if a == b && b == c => Some((side, *line)),
                _ => None,
            }
        })
    }

    fn evaluate_end(&mut self) {
        if let Some((side, line)) = self.check_winner() {
            self.game_over = true;
            self.winner = Some(side);
            self.winning_line = Some(line);
        } else if self.is_board_full() {
            self.game_over = true;
        }
    }

    /// Greedy opponent policy: win if possible, else block, else random.
    pub fn choose_opponent_move(&self, rng: &mut PseudoRandom) -> Option<(usize, usize)> {
        if self.game_over {
            return None;
        }
        if let Some(cell) = self.find_two_in_a_row(Side::Opponent) {
            return Some(cell);
        }
        if let Some(cell) = self.find_two_in_a_row(Side::Player) {
            return Some(cell);
        }
        rng.choose(&self.empty_cells()).copied()
    }

    /// Empty third cell of the first line where `side` holds the other two.
    fn find_two_in_a_row(&self, side: Side) -> Option<(usize, usize)> {
        let mark = side.mark();
        LINES.iter().find_map(|line| {
            let cells = line.cells();
            let owned = cells.iter().filter(|(r, c)| self.cell(*r, *c) == mark).count();
            let empty: Vec<_> = cells
                .iter()
                .filter(|(r, c)| self.cell(*r, *c) == Cell::Empty)
                .collect();
            if owned == 2 && empty.len() == 1 {
                Some(*empty[0])
            } else {
                None
            }
        })
    }

    /// Outcome of a finished round from the player's point of view.
    pub fn outcome(&self) -> Option<Outcome> {
        if !self.game_over {
            return None;
        }
        Some(match self.winner {
            Some(Side::Player) => Outcome::Win,
            Some(Side::Opponent) => Outcome::Loss,
            None => Outcome::Draw,
        })
    }

    /// Hand out the round outcome exactly once per terminal board.
    pub fn take_outcome(&mut self) -> Option<Outcome> {
        if self.outcome_taken {
            return None;
        }
        let outcome = self.outcome()?;
        self.outcome_taken = true;
        Some(outcome)
    }
}
