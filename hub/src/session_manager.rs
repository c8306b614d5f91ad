use common::GameKind;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::context::AppContext;
use crate::game_executor::{spawn_session, GameSpec, SessionEvent, SessionHandle, SessionInput, SessionSnapshot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no active session")]
    NoActiveSession,
    #[error("session has shut down")]
    Closed,
    #[error("active session is {active}, not {requested}")]
    WrongGame { active: GameKind, requested: GameKind },
}

/// Owns the one session that may be running at a time.
pub struct SessionManager {
    ctx: AppContext,
    active: Option<SessionHandle>,
}

impl SessionManager {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx, active: None }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Start a session, cancelling whichever one was running.
    pub async fn start(&mut self, spec: GameSpec) -> Uuid {
        self.stop().await;
        let handle = spawn_session(self.ctx.clone(), spec);
        let id = handle.id();
        self.active = Some(handle);
        id
    }

    /// Cancel the active session, if any, and wait for it to exit.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.active.take() {
            info!("Stopping {} session {}", handle.game(), handle.id());
            handle.shutdown().await;
        }
    }

    pub fn active(&self) -> Option<&SessionHandle> {
        self.active.as_ref()
    }

    fn active_for(&self, game: GameKind) -> Result<&SessionHandle, SessionError> {
        let handle = self.active.as_ref().ok_or(SessionError::NoActiveSession)?;
        if handle.game() != game {
            return Err(SessionError::WrongGame { active: handle.game(), requested: game });
        }
        Ok(handle)
    }

    /// Route an input to the active session, checking it targets the right game.
    pub async fn send(&self, input: SessionInput) -> Result<(), SessionError> {
        let handle = match input_game(&input) {
            Some(game) => self.active_for(game)?,
            None => self.active.as_ref().ok_or(SessionError::NoActiveSession)?,
        };
        handle.send(input).await
    }

    pub fn subscribe(&self) -> Result<broadcast::Receiver<SessionEvent>, SessionError> {
        self.active
            .as_ref()
            .map(SessionHandle::subscribe)
            .ok_or(SessionError::NoActiveSession)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.active
            .as_ref()
            .map(SessionHandle::snapshot)
            .ok_or(SessionError::NoActiveSession)
    }
}

fn input_game(input: &SessionInput) -> Option<GameKind> {
    match input {
        SessionInput::TrikiMark { .. } => Some(GameKind::Triki),
        SessionInput::SnakeTurn(_) => Some(GameKind::Snake),
        SessionInput::DuosFlip(_) => Some(GameKind::Duos),
        SessionInput::Restart => None,
    }
}
