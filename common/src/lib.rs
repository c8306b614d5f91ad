//! Game engines for the Tricade arcade: Triki, Snake and Duos.
//!
//! Engines are plain synchronous state machines. Time only moves when the
//! caller ticks them, which keeps them deterministic under a seed and easy to
//! drive from any scheduler.

mod ai;
mod board;
mod constants;
mod duos;
mod game;
mod snake;
mod snake_game;
mod triki;

pub mod util;

pub use ai::*;
pub use board::*;
pub use constants::*;
pub use duos::*;
pub use game::*;
pub use snake::*;
pub use snake_game::*;
pub use triki::*;
pub use util::PseudoRandom;
