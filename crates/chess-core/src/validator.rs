//! Legality gate for crowd proposals and resolved moves.

use crate::position::{is_uci_shaped, BoardPosition};

/// Pure predicate over (move, position). Validation always runs on a
/// disposable copy; the caller's position is never touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveValidator;

impl MoveValidator {
    pub fn new() -> Self {
        Self
    }

    /// True if `uci` is a legal move from `position`. Malformed tokens are
    /// rejected before the rules engine is consulted.
    pub fn is_legal(&self, uci: &str, position: &BoardPosition) -> bool {
        if !is_uci_shaped(uci) {
            return false;
        }
        position.apply_uci(uci).is_ok()
    }
}
