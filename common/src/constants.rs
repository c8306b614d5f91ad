/// Side length of the Triki board
pub const TRIKI_SIZE: usize = 3;

/// Delay before the Triki opponent answers a player mark, in milliseconds
pub const OPPONENT_THINK_MS: u64 = 500;

/// Default side length of the square Snake arena
pub const DEFAULT_GRID_SIZE: u16 = 20;

/// Smallest arena the Snake engine accepts
pub const MIN_GRID_SIZE: u16 = 5;

/// Largest arena the Snake engine accepts; keeps `i16` coordinates in range
pub const MAX_GRID_SIZE: u16 = 256;

pub const INITIAL_SNAKE_LENGTH: usize = 3;

/// Points awarded per food eaten
pub const FOOD_SCORE: u32 = 10;

/// Tick interval in milliseconds for a fresh snake run
pub const BASE_TICK_MS: u64 = 150;

/// Fastest tick interval the snake loop will reach
pub const MIN_TICK_MS: u64 = 60;

pub const SPEEDUP_PER_FOOD_MS: u64 = 5;

/// Points awarded per matched Duos pair
pub const MATCH_SCORE: u32 = 100;

/// Delay between the second flip and the pair comparison
pub const MATCH_SETTLE_MS: u64 = 400;

/// Delay between the second flip and hiding a mismatched pair
pub const MISMATCH_SETTLE_MS: u64 = 1000;

/// Poll interval for the Duos countdown loop
pub const DUOS_POLL_INTERVAL_MS: u64 = 100;
