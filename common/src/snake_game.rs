use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::board::{Grid, Position};
use crate::constants::{
    BASE_TICK_MS, FOOD_SCORE, INITIAL_SNAKE_LENGTH, MAX_GRID_SIZE, MIN_GRID_SIZE, MIN_TICK_MS,
    SPEEDUP_PER_FOOD_MS,
};
use crate::snake::{Direction, Snake};
use crate::util::PseudoRandom;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum GameCommand {
    Tick,
    Turn { direction: Direction },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DeathReason {
    Wall,
    SelfCollision,
    /// No empty cell left to place food on.
    BoardFull,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum GameEvent {
    SnakeTurned { direction: Direction },
    SnakeMoved { head: Position, grew: bool },
    FoodEaten { position: Position, score: u32 },
    FoodSpawned { position: Position },
    SnakeDied { reason: DeathReason },
}

/// Tick interval for a run at `score`. Shrinks by a fixed step per food and
/// never drops below `MIN_TICK_MS`.
pub fn tick_interval_for_score(score: u32) -> u64 {
    let foods = (score / FOOD_SCORE) as u64;
    BASE_TICK_MS
        .saturating_sub(foods.saturating_mul(SPEEDUP_PER_FOOD_MS))
        .max(MIN_TICK_MS)
}

// Serializable state for snapshots
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SnakeGame {
    pub tick: u32,
    pub grid_size: u16,
    pub snake: Snake,
    pub food: Option<Position>,
    pub score: u32,
    pub alive: bool,
    result_taken: bool,
    rng: PseudoRandom,
}

impl SnakeGame {
    pub fn new(grid_size: u16, seed: u64) -> Self {
        let grid_size = grid_size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE);
        let center = (grid_size / 2) as i16;
        let mut game = SnakeGame {
            tick: 0,
            grid_size,
            snake: Snake::new(Position::new(center, center), Direction::Right, INITIAL_SNAKE_LENGTH),
            food: None,
            score: 0,
            alive: true,
            result_taken: false,
            rng: PseudoRandom::new(seed),
        };
        if let Some(position) = game.random_empty_cell() {
            game.food = Some(position);
        }
        game
    }

    /// Start from an explicit snake and food cell.
    pub fn with_layout(grid_size: u16, snake: Snake, food: Option<Position>, seed: u64) -> Self {
        SnakeGame {
            tick: 0,
            grid_size: grid_size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE),
            snake,
            food,
            score: 0,
            alive: true,
            result_taken: false,
            rng: PseudoRandom::new(seed),
        }
    }

    pub fn current_tick(&self) -> u32 {
        self.tick
    }

    pub fn is_over(&self) -> bool {
        !self.alive
    }

    pub fn food_eaten(&self) -> u32 {
        self.snake.food
    }

    pub fn tick_interval_ms(&self) -> u64 {
        tick_interval_for_score(self.score)
    }

    pub fn in_bounds(&self, pos: &Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u16) < self.grid_size && (pos.y as u16) < self.grid_size
    }

    /// Final (score, food eaten) of a finished run, handed out once.
    pub fn take_result(&mut self) -> Option<(u32, u32)> {
        if self.alive || self.result_taken {
            return None;
        }
        self.result_taken = true;
        Some((self.score, self.snake.food))
    }

    fn occupancy(&self) -> Grid<bool> {
        let mut grid = Grid::new(self.grid_size, self.grid_size, false);
        for segment in &self.snake.body {
            grid.set(*segment, true);
        }
        grid
    }

    fn random_empty_cell(&mut self) -> Option<Position> {
        let grid = self.occupancy();
        let empty: Vec<Position> = grid
            .iter()
            .filter(|(_, occupied)| !**occupied)
            .map(|(pos, _)| pos)
            .collect();
        self.rng.choose(&empty).copied()
    }

    pub fn exec_command(&mut self, command: &GameCommand) -> Result<Vec<GameEvent>> {
        let mut out: Vec<GameEvent> = Vec::new();
        if !self.alive {
            return Ok(out);
        }

        match command {
            GameCommand::Tick => {
                let head = self.snake.next_head()?;

                if !self.in_bounds(&head) {
                    self.apply_event(GameEvent::SnakeDied { reason: DeathReason::Wall }, &mut out);
                    return Ok(out);
                }

                // Checked against the body as it was before this move
                if self.snake.contains_point(&head) {
                    self.apply_event(
                        GameEvent::SnakeDied { reason: DeathReason::SelfCollision },
                        &mut out,
                    );
                    return Ok(out);
                }

                let grew = self.food == Some(head);
                self.apply_event(GameEvent::SnakeMoved { head, grew }, &mut out);

                if grew {
                    let score = self.score + FOOD_SCORE;
                    self.apply_event(GameEvent::FoodEaten { position: head, score }, &mut out);

                    match self.random_empty_cell() {
                        Some(position) => {
                            self.apply_event(GameEvent::FoodSpawned { position }, &mut out);
                        }
                        None => {
                            log::debug!("snake filled the board at score {}", self.score);
                            self.apply_event(
                                GameEvent::SnakeDied { reason: DeathReason::BoardFull },
                                &mut out,
                            );
                        }
                    }
                }

                self.tick += 1;
            }

            GameCommand::Turn { direction } => {
                let current = self.snake.direction;
                if *direction != current
                    && !direction.is_opposite(&current)
                    && !direction.is_opposite(&self.snake.last_moved)
                {
                    self.apply_event(GameEvent::SnakeTurned { direction: *direction }, &mut out);
                }
            }
        }

        Ok(out)
    }

    pub fn apply_event(&mut self, event: GameEvent, out: &mut Vec<GameEvent>) {
        match &event {
            GameEvent::SnakeTurned { direction } => {
                self.snake.direction = *direction;
            }

            GameEvent::SnakeMoved { head, grew } => {
                self.snake.body.push_front(*head);
                if !grew {
                    self.snake.body.pop_back();
                }
                self.snake.last_moved = self.snake.direction;
            }

            GameEvent::FoodEaten { score, .. } => {
                self.food = None;
                self.snake.food += 1;
                self.score = *score;
            }

            GameEvent::FoodSpawned { position } => {
                self.food = Some(*position);
            }

            GameEvent::SnakeDied { .. } => {
                self.alive = false;
            }
        }

        out.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_snake(head: Position, direction: Direction, len: usize) -> Snake {
        Snake::new(head, direction, len)
    }

    #[test]
    fn test_new_game_spawns_food_off_snake() {
        for seed in 1..20 {
            let game = SnakeGame::new(20, seed);
            let food = game.food.expect("food should spawn");
            assert!(!game.snake.contains_point(&food));
            assert!(game.in_bounds(&food));
            assert_eq!(game.snake.len(), INITIAL_SNAKE_LENGTH);
        }
    }

    #[test]
    fn test_move_without_food_keeps_length() -> Result<()> {
        let snake = straight_snake(Position::new(5, 5), Direction::Right, 3);
        let mut game = SnakeGame::with_layout(10, snake, Some(Position::new(0, 0)), 1);
        game.exec_command(&GameCommand::Tick)?;
        assert_eq!(*game.snake.head()?, Position::new(6, 5));
        assert_eq!(game.snake.len(), 3);
        assert!(!game.snake.contains_point(&Position::new(3, 5)));
        Ok(())
    }

    #[test]
    fn test_wall_ends_run() -> Result<()> {
        let snake = straight_snake(Position::new(9, 5), Direction::Right, 3);
        let mut game = SnakeGame::with_layout(10, snake, None, 1);
        let events = game.exec_command(&GameCommand::Tick)?;
        assert_eq!(events, vec![GameEvent::SnakeDied { reason: DeathReason::Wall }]);
        assert!(game.is_over());
        // Body is left where it was
        assert_eq!(*game.snake.head()?, Position::new(9, 5));
        Ok(())
    }

    #[test]
    fn test_grid_size_is_clamped() {
        assert_eq!(SnakeGame::new(2, 1).grid_size, MIN_GRID_SIZE);
        assert_eq!(SnakeGame::new(u16::MAX, 1).grid_size, MAX_GRID_SIZE);
        let snake = straight_snake(Position::new(5, 5), Direction::Right, 3);
        assert_eq!(SnakeGame::with_layout(40000, snake, None, 1).grid_size, MAX_GRID_SIZE);
    }

    #[test]
    fn test_oversized_grid_hits_wall_at_largest_edge() -> Result<()> {
        let edge = (MAX_GRID_SIZE - 1) as i16;
        let snake = straight_snake(Position::new(edge, 0), Direction::Right, 3);
        let mut game = SnakeGame::with_layout(40000, snake, None, 1);
        let events = game.exec_command(&GameCommand::Tick)?;
        assert_eq!(events, vec![GameEvent::SnakeDied { reason: DeathReason::Wall }]);
        Ok(())
    }

    #[test]
    fn test_wall_at_zero_edge() -> Result<()> {
        let snake = straight_snake(Position::new(5, 0), Direction::Up, 1);
        let mut game = SnakeGame::with_layout(10, snake, None, 1);
        game.exec_command(&GameCommand::Tick)?;
        assert!(game.is_over());
        Ok(())
    }

    #[test]
    fn test_self_collision_ends_run() -> Result<()> {
        // Head at (5,5) heading down into its own body at (5,6)
        let mut snake = straight_snake(Position::new(5, 5), Direction::Right, 1);
        snake.body = vec![
            Position::new(5, 5),
            Position::new(4, 5),
            Position::new(4, 6),
            Position::new(5, 6),
            Position::new(6, 6),
        ]
        .into();
        snake.direction = Direction::Down;
        snake.last_moved = Direction::Right;
        let mut game = SnakeGame::with_layout(10, snake, None, 1);
        let events = game.exec_command(&GameCommand::Tick)?;
        assert_eq!(events, vec![GameEvent::SnakeDied { reason: DeathReason::SelfCollision }]);
        Ok(())
    }

    #[test]
    fn test_moving_onto_old_tail_is_a_collision() -> Result<()> {
        // A 4-cell loop where the next head is the current tail cell
        let mut snake = straight_snake(Position::new(5, 5), Direction::Up, 1);
        snake.body = vec![
            Position::new(5, 5),
            Position::new(6, 5),
            Position::new(6, 4),
            Position::new(5, 4),
        ]
        .into();
        snake.direction = Direction::Up;
        snake.last_moved = Direction::Left;
        let mut game = SnakeGame::with_layout(10, snake, None, 1);
        game.exec_command(&GameCommand::Tick)?;
        assert!(game.is_over());
        Ok(())
    }

    #[test]
    fn test_eating_grows_by_one_and_scores() -> Result<()> {
        let snake = straight_snake(Position::new(5, 5), Direction::Right, 3);
        let mut game = SnakeGame::with_layout(10, snake, Some(Position::new(6, 5)), 3);
        let events = game.exec_command(&GameCommand::Tick)?;
        assert_eq!(game.snake.len(), 4);
        assert_eq!(game.score, FOOD_SCORE);
        assert_eq!(game.food_eaten(), 1);
        let food = game.food.expect("food respawned");
        assert!(!game.snake.contains_point(&food));
        assert!(events.iter().any(|e| matches!(e, GameEvent::FoodSpawned { .. })));
        Ok(())
    }

    #[test]
    fn test_food_never_spawns_on_snake() -> Result<()> {
        // Rows 0..4 of a 5x5 board are occupied once the head reaches (4,1),
        // so the only free cells are on the last row.
        for seed in 1..30 {
            let food = Position::new(4, 1);
            let mut body = vec![Position::new(4, 0)];
            for y in 0..4 {
                for x in 0..5 {
                    let p = Position::new(x, y);
                    if p != Position::new(4, 0) && p != food {
                        body.push(p);
                    }
                }
            }
            let mut snake = straight_snake(Position::new(4, 0), Direction::Down, 1);
            snake.body = body.into();
            let mut game = SnakeGame::with_layout(5, snake, Some(food), seed);
            game.exec_command(&GameCommand::Tick)?;
            let spawned = game.food.expect("food respawned");
            assert!(!game.snake.contains_point(&spawned));
            assert_eq!(spawned.y, 4);
        }
        Ok(())
    }

    #[test]
    fn test_board_full_ends_run() -> Result<()> {
        // 5x5 board with every cell but one occupied; the free cell is the food
        let mut body: Vec<Position> = Vec::new();
        for y in 0..5i16 {
            let row: Vec<i16> = if y % 2 == 0 { (0..5).collect() } else { (0..5).rev().collect() };
            for x in row {
                body.push(Position::new(x, y));
            }
        }
        // Snake head at the end of the serpentine, food on the last cell
        let food = body.pop().unwrap();
        body.reverse();
        let mut snake = straight_snake(body[0], Direction::Right, 1);
        snake.body = body.into();
        snake.direction = Direction::Right;
        snake.last_moved = Direction::Right;
        let mut game = SnakeGame::with_layout(5, snake, Some(food), 1);
        let events = game.exec_command(&GameCommand::Tick)?;
        assert_eq!(
            events.last(),
            Some(&GameEvent::SnakeDied { reason: DeathReason::BoardFull })
        );
        assert_eq!(game.snake.len(), 25);
        Ok(())
    }

    #[test]
    fn test_reversal_is_ignored() -> Result<()> {
        let mut game = SnakeGame::new(20, 5);
        let events = game.exec_command(&GameCommand::Turn { direction: Direction::Left })?;
        assert!(events.is_empty());
        assert_eq!(game.snake.direction, Direction::Right);

        // Up then Down before moving: Down reverses the pending heading
        game.exec_command(&GameCommand::Turn { direction: Direction::Up })?;
        let events = game.exec_command(&GameCommand::Turn { direction: Direction::Down })?;
        assert!(events.is_empty());
        assert_eq!(game.snake.direction, Direction::Up);
        Ok(())
    }

    #[test]
    fn test_quick_double_turn_cannot_fold_into_neck() -> Result<()> {
        let mut game = SnakeGame::new(20, 5);
        game.exec_command(&GameCommand::Turn { direction: Direction::Up })?;
        // Left is not opposite of Up, but it is opposite of the last move
        let events = game.exec_command(&GameCommand::Turn { direction: Direction::Left })?;
        assert!(events.is_empty());
        Ok(())
    }

    #[test]
    fn test_speed_schedule() {
        assert_eq!(tick_interval_for_score(0), BASE_TICK_MS);
        assert_eq!(tick_interval_for_score(FOOD_SCORE), BASE_TICK_MS - SPEEDUP_PER_FOOD_MS);
        assert_eq!(tick_interval_for_score(FOOD_SCORE * 1000), MIN_TICK_MS);
        let mut last = u64::MAX;
        for score in (0..500).step_by(FOOD_SCORE as usize) {
            let interval = tick_interval_for_score(score);
            assert!(interval <= last);
            assert!(interval >= MIN_TICK_MS);
            last = interval;
        }
    }

    #[test]
    fn test_result_taken_once() -> Result<()> {
        let snake = straight_snake(Position::new(9, 5), Direction::Right, 3);
        let mut game = SnakeGame::with_layout(10, snake, None, 1);
        assert_eq!(game.take_result(), None);
        game.exec_command(&GameCommand::Tick)?;
        assert_eq!(game.take_result(), Some((0, 0)));
        assert_eq!(game.take_result(), None);
        assert!(game.exec_command(&GameCommand::Tick)?.is_empty());
        Ok(())
    }
}
