use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use common::GameKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::Database;
use super::models::*;

/// Document store laid out on disk as one directory per user:
///
/// ```text
/// <root>/<user>/profile.json
/// <root>/<user>/stats/<game>.json
/// <root>/<user>/missions.json
/// <root>/<user>/trophies/<trophy id>.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileDatabase {
    root: PathBuf,
}

fn validate_key(kind: &str, key: &str) -> Result<()> {
    ensure!(!key.is_empty(), "{} must not be empty", kind);
    ensure!(
        key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
        "{} contains unsupported characters: {:?}",
        kind,
        key
    );
    Ok(())
}

/// Overlay `update` onto `stored`, keeping keys only `stored` has.
fn merge_document(stored: &mut Value, update: Value) {
    match (stored, update) {
        (Value::Object(stored), Value::Object(update)) => {
            for (key, value) in update {
                merge_document(stored.entry(key).or_insert(Value::Null), value);
            }
        }
        (stored, update) => *stored = update,
    }
}

impl JsonFileDatabase {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create data directory {:?}", root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, user_id: &str) -> Result<PathBuf> {
        validate_key("User id", user_id)?;
        Ok(self.root.join(user_id))
    }

    fn stats_path(&self, user_id: &str, game: GameKind) -> Result<PathBuf> {
        Ok(self.user_dir(user_id)?.join("stats").join(format!("{}.json", game.as_str())))
    }

    fn trophy_path(&self, user_id: &str, trophy_id: &str) -> Result<PathBuf> {
        validate_key("Trophy id", trophy_id)?;
        Ok(self.user_dir(user_id)?.join("trophies").join(format!("{}.json", trophy_id)))
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let value = serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let contents = serde_json::to_string_pretty(value).context("Failed to serialize document")?;

        // Write then rename so readers never see a half-written document
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to move {:?} into place", tmp))?;
        debug!("Wrote {:?}", path);
        Ok(())
    }
}

#[async_trait]
impl Database for JsonFileDatabase {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile> {
        let path = self.user_dir(user_id)?.join("profile.json");
        Ok(Self::read_json(&path).await?.unwrap_or_default())
    }

    async fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        let path = self.user_dir(user_id)?.join("profile.json");
        Self::write_json(&path, profile).await
    }

    async fn get_stats(&self, user_id: &str, game: GameKind) -> Result<PlayerStats> {
        let path = self.stats_path(user_id, game)?;
        let stats: Option<PlayerStats> = Self::read_json(&path).await?;
        match stats {
            Some(stats) => {
                ensure!(stats.game() == game, "Stats file {:?} holds {} stats", path, stats.game());
                Ok(stats)
            }
            None => Ok(PlayerStats::empty(game)),
        }
    }

    async fn save_stats(&self, user_id: &str, stats: &PlayerStats) -> Result<()> {
        let path = self.stats_path(user_id, stats.game())?;
        // Merged so fields written by other clients survive
        let mut document = Self::read_json::<Value>(&path).await?.unwrap_or(Value::Null);
        merge_document(&mut document, serde_json::to_value(stats).context("Failed to serialize stats")?);
        Self::write_json(&path, &document).await
    }

    async fn get_mission_progress(&self, user_id: &str) -> Result<MissionProgress> {
        let path = self.user_dir(user_id)?.join("missions.json");
        Ok(Self::read_json(&path).await?.unwrap_or_default())
    }

    async fn save_mission_progress(&self, user_id: &str, progress: &MissionProgress) -> Result<()> {
        let path = self.user_dir(user_id)?.join("missions.json");
        Self::write_json(&path, progress).await
    }

    async fn get_trophy(&self, user_id: &str, trophy_id: &str) -> Result<Option<TrophyRecord>> {
        let path = self.trophy_path(user_id, trophy_id)?;
        Self::read_json(&path).await
    }

    async fn unlock_trophy(&self, user_id: &str, trophy: &TrophyRecord) -> Result<()> {
        let path = self.trophy_path(user_id, &trophy.id)?;
        Self::write_json(&path, trophy).await
    }

    async fn list_trophies(&self, user_id: &str) -> Result<Vec<TrophyRecord>> {
        let dir = self.user_dir(user_id)?.join("trophies");
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to list {:?}", dir)),
        };

        let mut trophies = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(trophy) = Self::read_json::<TrophyRecord>(&path).await? {
                trophies.push(trophy);
            }
        }
        trophies.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(trophies)
    }
}
