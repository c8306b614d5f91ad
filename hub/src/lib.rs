pub mod bots;
pub mod config;
pub mod context;
pub mod db;
pub mod game_executor;
pub mod missions;
pub mod progression;
pub mod result_persistence;
pub mod session_manager;
pub mod trophies;
