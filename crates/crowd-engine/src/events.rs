//! Inputs and outputs of the turn engine.

use chess_core::Color;

use crate::analysis::AnalysisInfo;
use crate::difficulty::DifficultyLevel;
use crate::game_sync::{FinalResult, GameEvent};

/// Everything that can happen to a session, from any source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One wall-clock second.
    Tick,
    MatchCreated { match_id: String },
    MatchCreateFailed { reason: String },
    Game { match_id: String, event: GameEvent },
    /// The authority closed the event stream.
    StreamEnded { match_id: String },
    /// Reply to `Action::FetchFinalResult`; `None` if the fetch failed.
    FinalResult { match_id: String, result: Option<FinalResult> },
    Chat { author: String, text: String },
    Analysis(AnalysisInfo),
    MoveSubmitted { match_id: String, mv: String },
    MoveRejected { match_id: String, mv: String, reason: String },
}

/// Side effects requested by the turn engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateMatch { level: DifficultyLevel, side: Color },
    StreamEvents { match_id: String },
    SubmitMove { match_id: String, mv: String },
    FetchFinalResult { match_id: String },
    StartAnalysis { fen: String, candidates: usize, depth: u32 },
    StopAnalysis,
    OpenChat,
    CloseChat,
}
