//! Chess primitives shared by the crowd engine and the server: the board
//! position token, the move validator, chat vote parsing and match data.

pub mod error;
pub mod game_data;
pub mod position;
pub mod validator;
pub mod vote_command;

pub use error::ChessError;
pub use game_data::{GameStatus, MatchState, Outcome, Winner};
pub use position::{BoardPosition, STANDARD_START_FEN};
pub use shakmaty::Color;
pub use validator::MoveValidator;
