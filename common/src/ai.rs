use crate::{Direction, Position, SnakeGame};

/// Greedy autopilot: head for the food while avoiding walls, the body and
/// cells with no way out. Returns `None` once the run is over.
pub fn calculate_snake_move(game: &SnakeGame) -> Option<Direction> {
    if game.is_over() {
        return None;
    }

    let head = *game.snake.head().ok()?;
    let current_direction = game.snake.direction;
    let center = Position::new(game.grid_size as i16 / 2, game.grid_size as i16 / 2);
    let target = game.food.unwrap_or(center);

    // Never consider reversing into the neck
    let mut possible_directions = Direction::ALL.to_vec();
    possible_directions.retain(|d| !game.snake.last_moved.is_opposite(d));

    let mut best_direction = current_direction;
    let mut best_score = i32::MIN;

    for direction in possible_directions {
        let new_pos = direction.step(&head);

        if !game.in_bounds(&new_pos) || would_collide(game, &new_pos) {
            continue;
        }

        let mut score = 0;

        // Prefer moving toward food
        score -= new_pos.manhattan_distance(&target) as i32 * 10;

        // Prefer staying away from the walls
        score -= new_pos.manhattan_distance(&center) as i32;

        // Simple lookahead: skip moves that would trap us
        let escape_routes = count_escape_routes(game, &new_pos);
        if escape_routes == 0 && new_pos != target {
            continue;
        }
        score += escape_routes as i32 * 5;

        if score > best_score {
            best_score = score;
            best_direction = direction;
        }
    }

    Some(best_direction)
}

fn would_collide(game: &SnakeGame, pos: &Position) -> bool {
    // The engine checks against the pre-move body, tail included
    game.snake.contains_point(pos)
}

fn count_escape_routes(game: &SnakeGame, pos: &Position) -> usize {
    Direction::ALL
        .iter()
        .map(|d| d.step(pos))
        .filter(|next| game.in_bounds(next) && !game.snake.contains_point(next))
        .count()
}
