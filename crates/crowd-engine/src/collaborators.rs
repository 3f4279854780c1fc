//! External services the session drives.
//!
//! Results flow back to the session as `SessionEvent`s: the authority's via
//! the tasks the session spawns, analysis and chat through the `EventSink`
//! their implementations were built with.

use async_trait::async_trait;
use chess_core::Color;
use futures::stream::BoxStream;
use tokio::sync::mpsc;

use crate::difficulty::DifficultyLevel;
use crate::error::EngineError;
use crate::events::SessionEvent;
use crate::game_sync::{FinalResult, GameEvent};

pub type EventSink = mpsc::UnboundedSender<SessionEvent>;
pub type EventInbox = mpsc::UnboundedReceiver<SessionEvent>;

/// Create the channel a session reads its events from.
pub fn event_channel() -> (EventSink, EventInbox) {
    mpsc::unbounded_channel()
}

pub type GameEventStream = BoxStream<'static, Result<GameEvent, EngineError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveVerdict {
    Accepted,
    Rejected(String),
}

/// The service hosting the authoritative game.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Returns the new match id.
    async fn create_match(&self, level: DifficultyLevel, side: Color) -> Result<String, EngineError>;

    /// Game events until the authority closes the stream.
    async fn stream_events(&self, match_id: &str) -> Result<GameEventStream, EngineError>;

    async fn submit_move(&self, match_id: &str, mv: &str) -> Result<MoveVerdict, EngineError>;

    async fn fetch_final_result(&self, match_id: &str) -> Result<FinalResult, EngineError>;
}

/// Position analysis; progress is delivered as `SessionEvent::Analysis`.
#[async_trait]
pub trait AnalysisEngine: Send {
    async fn start(&mut self, fen: &str, candidates: usize, depth: u32) -> Result<(), EngineError>;

    async fn stop(&mut self) -> Result<(), EngineError>;
}

/// Chat transport; messages are delivered as `SessionEvent::Chat` while open.
#[async_trait]
pub trait ChatSource: Send {
    async fn open(&mut self) -> Result<(), EngineError>;

    async fn close(&mut self);
}

/// Chat source that never delivers anything. Every turn then resolves from
/// analysis.
#[derive(Debug, Default)]
pub struct SilentChat;

#[async_trait]
impl ChatSource for SilentChat {
    async fn open(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn close(&mut self) {}
}
