//! Crowd engine error types

use chess_core::ChessError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authority error: {0}")]
    Authority(String),

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Turn could not be resolved: no legal vote and no analysis candidate")]
    Unresolvable,

    #[error("Chess error: {0}")]
    Chess(#[from] ChessError),
}
