//! Crowd-voted turn resolution.
//!
//! `TurnEngine` owns the vote tally, analysis feed, turn scheduler, score
//! ledger, game sync and match lifecycle, and turns events into actions.
//! `Session` drives it against the authority, the analysis engine and chat.

pub mod analysis;
pub mod collaborators;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod events;
pub mod game_sync;
pub mod ledger;
pub mod lifecycle;
pub mod resolution;
pub mod scheduler;
pub mod session;
pub mod stockfish;
pub mod tally;

pub use analysis::{AnalysisFeed, AnalysisInfo, RankedCandidate, Score};
pub use collaborators::{event_channel, AnalysisEngine, Authority, ChatSource, EventSink, MoveVerdict, SilentChat};
pub use config::{CrowdConfig, SessionConfig, StockfishConfig};
pub use difficulty::DifficultyLevel;
pub use engine::{SessionSnapshot, TurnEngine};
pub use error::EngineError;
pub use events::{Action, SessionEvent};
pub use game_sync::{FinalResult, GameEvent, GameStateSync};
pub use ledger::{ScoreLedger, Standing};
pub use lifecycle::{LifecyclePhase, MatchLifecycle, MatchResult};
pub use resolution::{FallbackStrategy, Resolution, ResolutionPolicy, ResolutionSource};
pub use scheduler::{TurnPhase, TurnScheduler};
pub use session::Session;
pub use stockfish::StockfishAnalyzer;
pub use tally::{TallyEntry, VoteTally};
