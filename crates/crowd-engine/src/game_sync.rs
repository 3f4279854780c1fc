//! Canonical match state, driven by the authority's event stream.

use chess_core::{BoardPosition, Color, GameStatus, MatchState, Outcome, Winner};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// One event from the authority's game stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Complete snapshot: initial position plus every move so far.
    FullState {
        initial_fen: Option<String>,
        moves: Vec<String>,
        status: GameStatus,
        winner: Option<Color>,
    },
    /// Move list after the latest move, optionally with the resulting FEN.
    StateUpdate {
        moves: Vec<String>,
        fen: Option<String>,
        status: GameStatus,
        winner: Option<Color>,
    },
    Finished {
        status: GameStatus,
        winner: Option<Color>,
    },
}

/// Out-of-band result fetched after the stream closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResult {
    pub status: GameStatus,
    pub winner: Option<Winner>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncChange {
    pub position_changed: bool,
    pub terminated_now: bool,
}

#[derive(Debug, Default)]
pub struct GameStateSync {
    state: Option<MatchState>,
    initial: BoardPosition,
    position: BoardPosition,
    /// A board state has been received for the current match.
    synced: bool,
}

impl GameStateSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a freshly created match.
    pub fn begin_match(&mut self, match_id: &str) {
        self.state = Some(MatchState::new(match_id));
        self.initial = BoardPosition::start();
        self.position = BoardPosition::start();
        self.synced = false;
    }

    /// Apply an authority event. Events after termination are ignored. On a
    /// replay failure the held state is left untouched.
    pub fn apply(&mut self, event: GameEvent) -> Result<SyncChange, EngineError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(SyncChange::default());
        };
        if state.terminated {
            debug!(match_id = %state.match_id, "Ignoring event for finished match");
            return Ok(SyncChange::default());
        }

        let first_state = !self.synced && !matches!(event, GameEvent::Finished { .. });
        let position_before = self.position.clone();
        let ply_before = state.move_history.len();

        let (status, winner) = match event {
            GameEvent::FullState {
                initial_fen,
                moves,
                status,
                winner,
            } => {
                let initial = match initial_fen.as_deref() {
                    Some(fen) => BoardPosition::from_fen(fen)?,
                    None => BoardPosition::start(),
                };
                let position = initial.replay(&moves)?;
                self.initial = initial;
                self.position = position;
                state.move_history = moves;
                (status, winner)
            }
            GameEvent::StateUpdate {
                moves,
                fen,
                status,
                winner,
            } => {
                let position = match fen.as_deref() {
                    Some(fen) => BoardPosition::from_fen(fen)?,
                    None if moves.starts_with(&state.move_history) => {
                        self.position.replay(&moves[state.move_history.len()..])?
                    }
                    None => self.initial.replay(&moves)?,
                };
                self.position = position;
                state.move_history = moves;
                (status, winner)
            }
            GameEvent::Finished { status, winner } => (status, winner),
        };

        state.side_to_move = self.position.side_to_move();
        if first_state {
            self.synced = true;
        }
        let position_changed =
            first_state || ply_before != state.move_history.len() || position_before != self.position;

        let mut terminated_now = false;
        if status.is_terminal() {
            let outcome = Outcome {
                winner: winner
                    .map(Winner::from_color)
                    .unwrap_or_else(|| Winner::from_report(None, &status)),
                reason: status.as_str().to_string(),
            };
            info!(match_id = %state.match_id, status = status.as_str(), winner = ?outcome.winner, "Match terminated");
            state.terminated = true;
            state.outcome = Some(outcome);
            terminated_now = true;
        }

        Ok(SyncChange {
            position_changed: position_changed || terminated_now,
            terminated_now,
        })
    }

    /// The stream closed before termination was seen.
    pub fn needs_reconciliation(&self) -> bool {
        self.state.as_ref().is_some_and(|s| !s.terminated)
    }

    /// Settle the match from an out-of-band fetch. A failed fetch or a game
    /// that still reports as running ends the match with an unknown outcome.
    /// Returns true if this call terminated the match.
    pub fn reconcile(&mut self, result: Option<FinalResult>) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if state.terminated {
            return false;
        }

        let outcome = match result {
            Some(result) if result.status.is_terminal() => Outcome {
                winner: result
                    .winner
                    .unwrap_or_else(|| Winner::from_report(None, &result.status)),
                reason: result.status.as_str().to_string(),
            },
            Some(result) => {
                warn!(match_id = %state.match_id, status = result.status.as_str(), "Stream closed on a running game, outcome unknown");
                Outcome {
                    winner: Winner::None,
                    reason: "unknown".to_string(),
                }
            }
            None => {
                warn!(match_id = %state.match_id, "Final result unavailable, outcome unknown");
                Outcome {
                    winner: Winner::None,
                    reason: "unknown".to_string(),
                }
            }
        };

        info!(match_id = %state.match_id, winner = ?outcome.winner, reason = %outcome.reason, "Match reconciled");
        state.terminated = true;
        state.outcome = Some(outcome);
        true
    }

    pub fn position(&self) -> &BoardPosition {
        &self.position
    }

    pub fn state(&self) -> Option<&MatchState> {
        self.state.as_ref()
    }

    pub fn match_id(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.match_id.as_str())
    }

    /// Number of moves played so far.
    pub fn ply(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.move_history.len())
    }

    pub fn is_terminated(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.terminated)
    }

    pub fn is_human_turn(&self, human_side: Color) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| !s.terminated && s.side_to_move == human_side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| m.to_string()).collect()
    }

    fn update(list: &[&str]) -> GameEvent {
        GameEvent::StateUpdate {
            moves: moves(list),
            fen: None,
            status: GameStatus::Started,
            winner: None,
        }
    }

    fn started() -> GameStateSync {
        let mut sync = GameStateSync::new();
        sync.begin_match("abc");
        sync.apply(GameEvent::FullState {
            initial_fen: None,
            moves: vec![],
            status: GameStatus::Started,
            winner: None,
        })
        .unwrap();
        sync
    }

    #[test]
    fn test_full_state_replays_moves() {
        let mut sync = GameStateSync::new();
        sync.begin_match("abc");
        let change = sync
            .apply(GameEvent::FullState {
                initial_fen: None,
                moves: moves(&["e2e4", "e7e5"]),
                status: GameStatus::Started,
                winner: None,
            })
            .unwrap();
        assert!(change.position_changed);
        assert_eq!(sync.ply(), 2);
        assert!(sync.is_human_turn(Color::White));
        assert!(!sync.is_human_turn(Color::Black));
    }

    #[test]
    fn test_position_change_detection() {
        // First state of a match counts even on the start position.
        let mut sync = GameStateSync::new();
        sync.begin_match("abc");
        let first = sync
            .apply(GameEvent::FullState {
                initial_fen: None,
                moves: vec![],
                status: GameStatus::Started,
                winner: None,
            })
            .unwrap();
        assert!(first.position_changed);

        let mut sync = started();
        assert!(sync.apply(update(&["e2e4"])).unwrap().position_changed);
        // Same side to move, two plies later.
        assert!(sync.apply(update(&["e2e4", "e7e5", "g1f3"])).unwrap().position_changed);
        assert!(!sync.apply(update(&["e2e4", "e7e5", "g1f3"])).unwrap().position_changed);

        let reconnect = sync
            .apply(GameEvent::FullState {
                initial_fen: None,
                moves: moves(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4"]),
                status: GameStatus::Started,
                winner: None,
            })
            .unwrap();
        assert!(reconnect.position_changed);
        assert_eq!(sync.ply(), 5);
    }

    #[test]
    fn test_incremental_and_full_replay_agree() {
        let mut a = started();
        a.apply(update(&["e2e4"])).unwrap();
        a.apply(update(&["e2e4", "e7e5"])).unwrap();
        a.apply(update(&["e2e4", "e7e5", "g1f3"])).unwrap();

        let mut b = started();
        b.apply(update(&["e2e4", "e7e5", "g1f3"])).unwrap();

        assert_eq!(a.position(), b.position());
        assert_eq!(a.state().unwrap().side_to_move, Color::Black);
    }

    #[test]
    fn test_divergent_history_falls_back_to_full_replay() {
        let mut sync = started();
        sync.apply(update(&["e2e4"])).unwrap();
        sync.apply(update(&["d2d4", "d7d5"])).unwrap();
        let expected = BoardPosition::start().replay(["d2d4", "d7d5"]).unwrap();
        assert_eq!(sync.position(), &expected);
    }

    #[test]
    fn test_provided_fen_wins() {
        let mut sync = started();
        let fen = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1";
        sync.apply(GameEvent::StateUpdate {
            moves: moves(&["d2d4"]),
            fen: Some(fen.to_string()),
            status: GameStatus::Started,
            winner: None,
        })
        .unwrap();
        assert_eq!(sync.position().fen(), fen);
    }

    #[test]
    fn test_bad_replay_keeps_state() {
        let mut sync = started();
        sync.apply(update(&["e2e4"])).unwrap();
        assert!(sync.apply(update(&["e2e4", "e2e4"])).is_err());
        assert_eq!(sync.ply(), 1);
        assert_eq!(sync.state().unwrap().side_to_move, Color::Black);
    }

    #[test]
    fn test_terminal_status_freezes_state() {
        let mut sync = started();
        let change = sync
            .apply(GameEvent::StateUpdate {
                moves: moves(&["f2f3", "e7e5", "g2g4", "d8h4"]),
                fen: None,
                status: GameStatus::Mate,
                winner: Some(Color::Black),
            })
            .unwrap();
        assert!(change.terminated_now);
        let outcome = sync.state().unwrap().outcome.clone().unwrap();
        assert_eq!(outcome.winner, Winner::Black);
        assert_eq!(outcome.reason, "mate");

        let change = sync.apply(update(&["e2e4"])).unwrap();
        assert_eq!(change, SyncChange::default());
        assert_eq!(sync.ply(), 4);
        assert!(!sync.is_human_turn(Color::White));
    }

    #[test]
    fn test_reconcile_with_result() {
        let mut sync = started();
        assert!(sync.needs_reconciliation());
        assert!(sync.reconcile(Some(FinalResult {
            status: GameStatus::Resign,
            winner: Some(Winner::White),
        })));
        assert!(!sync.needs_reconciliation());
        assert_eq!(sync.state().unwrap().outcome.as_ref().unwrap().winner, Winner::White);
        assert!(!sync.reconcile(None));
    }

    #[test]
    fn test_reconcile_unknown() {
        let mut sync = started();
        assert!(sync.reconcile(Some(FinalResult {
            status: GameStatus::Started,
            winner: None,
        })));
        let outcome = sync.state().unwrap().outcome.clone().unwrap();
        assert_eq!(outcome.winner, Winner::None);
        assert_eq!(outcome.reason, "unknown");
    }

    #[test]
    fn test_events_before_match_ignored() {
        let mut sync = GameStateSync::new();
        assert_eq!(sync.apply(update(&["e2e4"])).unwrap(), SyncChange::default());
        assert!(!sync.needs_reconciliation());
    }
}
