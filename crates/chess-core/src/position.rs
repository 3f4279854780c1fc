//! Board position token backed by shakmaty.
//!
//! A `BoardPosition` is never mutated in place: applying a move always
//! yields a fresh value, so the canonical position held by the game sync
//! can be handed out freely for validation.

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};

use crate::error::ChessError;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Default)]
pub struct BoardPosition {
    chess: Chess,
}

impl BoardPosition {
    /// Standard starting position.
    pub fn start() -> Self {
        Self::default()
    }

    /// Parse a FEN. `"startpos"` is accepted as an alias for the standard start.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let fen = fen.trim();
        if fen.is_empty() || fen == "startpos" {
            return Ok(Self::start());
        }

        let parsed: Fen = fen.parse().map_err(|e| ChessError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e}"),
        })?;
        let chess = parsed
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| ChessError::InvalidFen {
                fen: fen.to_string(),
                reason: format!("{e}"),
            })?;

        Ok(Self { chess })
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.chess, EnPassantMode::Legal).to_string()
    }

    pub fn side_to_move(&self) -> Color {
        self.chess.turn()
    }

    /// Apply a UCI move to a copy of this position.
    pub fn apply_uci(&self, uci: &str) -> Result<Self, ChessError> {
        if !is_uci_shaped(uci) {
            return Err(ChessError::MalformedMove(uci.to_string()));
        }

        let uci_move: UciMove = uci
            .parse()
            .map_err(|_| ChessError::MalformedMove(uci.to_string()))?;
        let mv = uci_move
            .to_move(&self.chess)
            .map_err(|_| ChessError::IllegalMove {
                uci: uci.to_string(),
                fen: self.fen(),
            })?;

        let mut next = self.chess.clone();
        next.play_unchecked(mv);
        Ok(Self { chess: next })
    }

    /// Apply a sequence of UCI moves, stopping at the first one that fails.
    pub fn replay<I, S>(&self, moves: I) -> Result<Self, ChessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pos = self.clone();
        for uci in moves {
            let uci = uci.as_ref();
            if uci.is_empty() {
                continue;
            }
            pos = pos.apply_uci(uci)?;
        }
        Ok(pos)
    }
}

impl PartialEq for BoardPosition {
    fn eq(&self, other: &Self) -> bool {
        self.fen() == other.fen()
    }
}

impl Eq for BoardPosition {}

/// Cheap shape check: `<file><rank><file><rank>` plus an optional promotion piece.
pub fn is_uci_shaped(uci: &str) -> bool {
    let bytes = uci.as_bytes();
    if bytes.len() != 4 && bytes.len() != 5 {
        return false;
    }
    let file = |b: u8| (b'a'..=b'h').contains(&b);
    let rank = |b: u8| (b'1'..=b'8').contains(&b);
    if !(file(bytes[0]) && rank(bytes[1]) && file(bytes[2]) && rank(bytes[3])) {
        return false;
    }
    bytes.len() == 4 || matches!(bytes[4], b'q' | b'r' | b'b' | b'n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_position_fen() {
        assert_eq!(BoardPosition::start().fen(), STANDARD_START_FEN);
        assert_eq!(BoardPosition::from_fen("startpos").unwrap().fen(), STANDARD_START_FEN);
    }

    #[test]
    fn test_apply_uci_leaves_original_untouched() {
        let start = BoardPosition::start();
        let after = start.apply_uci("e2e4").unwrap();
        assert_eq!(start.fen(), STANDARD_START_FEN);
        assert_eq!(after.side_to_move(), Color::Black);
        assert!(after.fen().starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
    }

    #[test]
    fn test_fen_en_passant_only_when_capturable() {
        let after_e4 = BoardPosition::start().apply_uci("e2e4").unwrap();
        assert_eq!(after_e4.fen(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");

        let pos = BoardPosition::start().replay(["e2e4", "a7a6", "e4e5", "d7d5"]).unwrap();
        assert_eq!(pos.fen(), "rnbqkbnr/1pp1pppp/p7/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");
        assert_eq!(BoardPosition::from_fen(&pos.fen()).unwrap(), pos);
    }

    #[test]
    fn test_replay_and_castling() {
        let pos = BoardPosition::start()
            .replay(["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "e1g1"])
            .unwrap();
        assert!(pos.fen().contains("RNBQ1RK1"));
    }

    #[test]
    fn test_illegal_and_malformed_moves() {
        let start = BoardPosition::start();
        assert!(matches!(start.apply_uci("e2e5"), Err(ChessError::IllegalMove { .. })));
        assert!(matches!(start.apply_uci("e2"), Err(ChessError::MalformedMove(_))));
        assert!(matches!(start.apply_uci("z2e4"), Err(ChessError::MalformedMove(_))));
    }

    #[test]
    fn test_is_uci_shaped() {
        assert!(is_uci_shaped("e2e4"));
        assert!(is_uci_shaped("e7e8q"));
        assert!(!is_uci_shaped("e7e8k"));
        assert!(!is_uci_shaped("E2E4"));
        assert!(!is_uci_shaped("e2e4e5"));
        assert!(!is_uci_shaped(""));
    }

    #[test]
    fn test_invalid_fen() {
        assert!(BoardPosition::from_fen("not a fen").is_err());
    }
}
