pub mod json_file;
pub mod memory;
pub mod models;

use anyhow::Result;
use async_trait::async_trait;
use common::GameKind;

pub use json_file::JsonFileDatabase;
pub use memory::InMemoryDatabase;
use models::*;

/// Per-user document store. Every method is scoped to one user id; missing
/// documents read back as their empty defaults.
#[async_trait]
pub trait Database: Send + Sync {
    // Profile operations
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile>;
    async fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()>;

    // Stats operations
    async fn get_stats(&self, user_id: &str, game: GameKind) -> Result<PlayerStats>;
    async fn save_stats(&self, user_id: &str, stats: &PlayerStats) -> Result<()>;

    // Mission operations
    async fn get_mission_progress(&self, user_id: &str) -> Result<MissionProgress>;
    async fn save_mission_progress(&self, user_id: &str, progress: &MissionProgress) -> Result<()>;

    // Trophy operations
    async fn get_trophy(&self, user_id: &str, trophy_id: &str) -> Result<Option<TrophyRecord>>;
    async fn unlock_trophy(&self, user_id: &str, trophy: &TrophyRecord) -> Result<()>;
    async fn list_trophies(&self, user_id: &str) -> Result<Vec<TrophyRecord>>;
}
