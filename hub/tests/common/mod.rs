#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use hub::config::HubConfig;
use hub::context::AppContext;
use hub::db::InMemoryDatabase;
use hub::game_executor::SessionEvent;
use tokio::sync::broadcast::{self, error::RecvError};

/// Upper bound on any single wait, in (usually paused) tokio time.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(600);

pub const TEST_USER: &str = "tester";

pub struct TestEnvironment {
    pub db: Arc<InMemoryDatabase>,
    pub ctx: AppContext,
}

impl TestEnvironment {
    pub fn new(seed: u64) -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        let config = HubConfig {
            user_id: TEST_USER.to_string(),
            seed: Some(seed),
            grid_size: 10,
            ..HubConfig::default()
        };
        let ctx = AppContext::new(db.clone(), config);
        Self { db, ctx }
    }
}

/// Receive events until one matches `pred`, returning it.
pub async fn wait_for<F>(events: &mut broadcast::Receiver<SessionEvent>, mut pred: F) -> Result<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Ok(event),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err(anyhow!("Session closed before the event arrived")),
            }
        }
    };
    tokio::time::timeout(EVENT_TIMEOUT, wait)
        .await
        .map_err(|_| anyhow!("Timed out waiting for session event"))?
}

/// Drain everything left on a closed channel.
pub async fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        match events.recv().await {
            Ok(event) => seen.push(event),
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return seen,
        }
    }
}
