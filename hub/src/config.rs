use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use common::{DEFAULT_GRID_SIZE, MAX_GRID_SIZE, MIN_GRID_SIZE};

pub const DEFAULT_USER: &str = "player";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Where the JSON store lives. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub user_id: String,
    pub seed: Option<u64>,
    pub grid_size: u16,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            user_id: DEFAULT_USER.to_string(),
            seed: None,
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

impl HubConfig {
    /// Read `TRICADE_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup("TRICADE_DATA_DIR").filter(|dir| !dir.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(user) = lookup("TRICADE_USER").filter(|user| !user.is_empty()) {
            config.user_id = user;
        }
        if let Some(seed) = lookup("TRICADE_SEED") {
            config.seed = Some(
                seed.trim()
                    .parse()
                    .with_context(|| format!("TRICADE_SEED is not a number: {:?}", seed))?,
            );
        }
        if let Some(grid) = lookup("TRICADE_GRID_SIZE") {
            config.grid_size = grid
                .trim()
                .parse()
                .with_context(|| format!("TRICADE_GRID_SIZE is not a number: {:?}", grid))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.user_id.is_empty(), "User id must not be empty");
        ensure!(
            self.grid_size >= MIN_GRID_SIZE,
            "Grid size {} is below the minimum of {}",
            self.grid_size,
            MIN_GRID_SIZE
        );
        ensure!(
            self.grid_size <= MAX_GRID_SIZE,
            "Grid size {} is above the maximum of {}",
            self.grid_size,
            MAX_GRID_SIZE
        );
        Ok(())
    }
}
