use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use common::GameKind;
use tokio::sync::RwLock;

use super::Database;
use super::models::*;

#[derive(Debug, Default)]
struct UserDocuments {
    profile: Option<UserProfile>,
    stats: HashMap<GameKind, PlayerStats>,
    missions: MissionProgress,
    trophies: BTreeMap<String, TrophyRecord>,
}

/// Process-local store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    users: RwLock<HashMap<String, UserDocuments>>,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
    writes: AtomicUsize,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise degraded persistence.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stall every write by `delay`, as a slow disk would.
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn begin_write(&self) -> Result<()> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("In-memory store is rejecting writes");
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .and_then(|docs| docs.profile.clone())
            .unwrap_or_default())
    }

    async fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        self.begin_write().await?;
        let mut users = self.users.write().await;
        users.entry(user_id.to_string()).or_default().profile = Some(profile.clone());
        Ok(())
    }

    async fn get_stats(&self, user_id: &str, game: GameKind) -> Result<PlayerStats> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .and_then(|docs| docs.stats.get(&game).cloned())
            .unwrap_or_else(|| PlayerStats::empty(game)))
    }

    async fn save_stats(&self, user_id: &str, stats: &PlayerStats) -> Result<()> {
        self.begin_write().await?;
        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_default()
            .stats
            .insert(stats.game(), stats.clone());
        Ok(())
    }

    async fn get_mission_progress(&self, user_id: &str) -> Result<MissionProgress> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .map(|docs| docs.missions.clone())
            .unwrap_or_default())
    }

    async fn save_mission_progress(&self, user_id: &str, progress: &MissionProgress) -> Result<()> {
        self.begin_write().await?;
        let mut users = self.users.write().await;
        users.entry(user_id.to_string()).or_default().missions = progress.clone();
        Ok(())
    }

    async fn get_trophy(&self, user_id: &str, trophy_id: &str) -> Result<Option<TrophyRecord>> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .and_then(|docs| docs.trophies.get(trophy_id).cloned()))
    }

    async fn unlock_trophy(&self, user_id: &str, trophy: &TrophyRecord) -> Result<()> {
        self.begin_write().await?;
        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_default()
            .trophies
            .insert(trophy.id.clone(), trophy.clone());
        Ok(())
    }

    async fn list_trophies(&self, user_id: &str) -> Result<Vec<TrophyRecord>> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .map(|docs| docs.trophies.values().cloned().collect())
            .unwrap_or_default())
    }
}
