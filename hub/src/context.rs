use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::HubConfig;
use crate::db::{Database, InMemoryDatabase, JsonFileDatabase};

/// Everything a session needs from the outside world, passed explicitly.
#[derive(Clone)]
pub struct AppContext {
    pub db: Arc<dyn Database>,
    pub user_id: String,
    pub config: HubConfig,
    /// Held while a finished round is written, so rounds from overlapping
    /// sessions never interleave their read-modify-write cycles.
    pub persist_lock: Arc<Mutex<()>>,
}

impl AppContext {
    pub fn new(db: Arc<dyn Database>, config: HubConfig) -> Self {
        Self {
            db,
            user_id: config.user_id.clone(),
            config,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open the store named by the config: the JSON store when a data
    /// directory is set, otherwise an in-memory one.
    pub async fn from_config(config: HubConfig) -> Result<Self> {
        let db: Arc<dyn Database> = match &config.data_dir {
            Some(dir) => {
                info!("Using JSON store at {:?}", dir);
                Arc::new(JsonFileDatabase::open(dir.clone()).await?)
            }
            None => {
                info!("No data directory configured, progress will not be saved to disk");
                Arc::new(InMemoryDatabase::new())
            }
        };
        Ok(Self::new(db, config))
    }

    /// Engine seed: the configured one, or fresh randomness per session.
    pub fn seed(&self) -> u64 {
        self.config.seed.unwrap_or_else(rand::random)
    }
}
