//! Opponent difficulty and the analysis budgets derived from it.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opponent strength on the authority's 1..=8 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DifficultyLevel(u8);

impl DifficultyLevel {
    pub const MIN: DifficultyLevel = DifficultyLevel(1);
    pub const MAX: DifficultyLevel = DifficultyLevel(8);

    pub fn new(level: u8) -> Result<Self, EngineError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(EngineError::Config(format!(
                "difficulty level {level} outside {}..={}",
                Self::MIN.0,
                Self::MAX.0
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// One step harder, capped at MAX.
    pub fn raised(self) -> Self {
        Self((self.0 + 1).min(Self::MAX.0))
    }

    /// One step easier, floored at MIN.
    pub fn lowered(self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::MIN.0))
    }

    /// Search depth at which analysis counts as complete.
    pub fn depth_budget(self) -> u32 {
        match self.0 {
            1..=2 => 15,
            3..=4 => 20,
            _ => 24,
        }
    }

    /// Number of candidate lines (MultiPV) requested from the engine.
    /// Odd levels show five candidates, even levels three, the top level two.
    pub fn candidate_budget(self) -> usize {
        match self.0 {
            1 | 3 | 5 => 5,
            2 | 4 | 6 | 7 => 3,
            _ => 2,
        }
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for DifficultyLevel {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DifficultyLevel> for u8 {
    fn from(level: DifficultyLevel) -> u8 {
        level.0
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(DifficultyLevel::new(0).is_err());
        assert!(DifficultyLevel::new(9).is_err());
        assert_eq!(DifficultyLevel::new(8).unwrap(), DifficultyLevel::MAX);
    }

    #[test]
    fn test_raise_and_lower_clamp() {
        assert_eq!(DifficultyLevel::MAX.raised(), DifficultyLevel::MAX);
        assert_eq!(DifficultyLevel::MIN.lowered(), DifficultyLevel::MIN);
        let four = DifficultyLevel::new(4).unwrap();
        assert_eq!(four.raised().value(), 5);
        assert_eq!(four.lowered().value(), 3);
    }

    #[test]
    fn test_depth_budget_is_monotone() {
        let depths: Vec<u32> = (1..=8)
            .map(|l| DifficultyLevel::new(l).unwrap().depth_budget())
            .collect();
        assert_eq!(depths, vec![15, 15, 20, 20, 24, 24, 24, 24]);
        assert!(depths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_candidate_budget() {
        let counts: Vec<usize> = (1..=8)
            .map(|l| DifficultyLevel::new(l).unwrap().candidate_budget())
            .collect();
        assert_eq!(counts, vec![5, 3, 5, 3, 5, 3, 3, 2]);
    }
}
