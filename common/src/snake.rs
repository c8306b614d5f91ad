use std::collections::VecDeque;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::board::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_opposite(&self, other: &Direction) -> bool {
        self.opposite() == *other
    }

    /// Position one cell away from `pos` in this direction.
    pub fn step(&self, pos: &Position) -> Position {
        match self {
            Direction::Up => Position::new(pos.x, pos.y - 1),
            Direction::Down => Position::new(pos.x, pos.y + 1),
            Direction::Left => Position::new(pos.x - 1, pos.y),
            Direction::Right => Position::new(pos.x + 1, pos.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    /// Occupied cells, head first.
    pub body: VecDeque<Position>,
    /// Heading for the next move.
    pub direction: Direction,
    /// Heading of the last completed move.
    pub last_moved: Direction,
    pub food: u32,
}

impl Snake {
    /// Lay out a straight snake with its head at `head`, trailing away from
    /// `direction`.
    pub fn new(head: Position, direction: Direction, length: usize) -> Self {
        let back = direction.opposite();
        let mut body = VecDeque::with_capacity(length);
        let mut segment = head;
        for _ in 0..length.max(1) {
            body.push_back(segment);
            segment = back.step(&segment);
        }
        Snake {
            body,
            direction,
            last_moved: direction,
            food: 0,
        }
    }

    pub fn head(&self) -> Result<&Position> {
        self.body.front().context("Snake body should not be empty")
    }

    pub fn tail(&self) -> Result<&Position> {
        self.body.back().context("Snake body should not be empty")
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn contains_point(&self, point: &Position) -> bool {
        self.body.iter().any(|p| p == point)
    }

    pub fn next_head(&self) -> Result<Position> {
        Ok(self.direction.step(self.head()?))
    }
}
