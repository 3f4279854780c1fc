//! Match sequencing: rest period between matches, difficulty adaptation and
//! side rotation.

use chess_core::{Color, Winner};
use serde::Serialize;
use tracing::info;

use crate::difficulty::DifficultyLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    HumanWon,
    HumanLost,
    Draw,
    /// Aborted, never started, or the result could not be established.
    Unknown,
}

impl MatchResult {
    pub fn from_winner(winner: Winner, human_side: Color) -> Self {
        match winner {
            Winner::White | Winner::Black if winner == Winner::from_color(human_side) => MatchResult::HumanWon,
            Winner::White | Winner::Black => MatchResult::HumanLost,
            Winner::Draw => MatchResult::Draw,
            Winner::None => MatchResult::Unknown,
        }
    }
}

pub fn next_difficulty(level: DifficultyLevel, result: MatchResult) -> DifficultyLevel {
    match result {
        MatchResult::HumanWon => level.raised(),
        MatchResult::HumanLost => level.lowered(),
        MatchResult::Draw | MatchResult::Unknown => level,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Match requested, waiting for the authority to create it.
    AwaitingMatch,
    InMatch,
    Resting,
}

/// Parameters of the match to create next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextMatch {
    pub level: DifficultyLevel,
    pub side: Color,
}

#[derive(Debug)]
pub struct MatchLifecycle {
    phase: LifecyclePhase,
    human_side: Color,
    level: DifficultyLevel,
    rest_period: u32,
    rest_remaining: u32,
    /// Adjust level and side when the rest expires. False after a failed
    /// creation, which retries the same match.
    rotate_after_rest: bool,
    last_result: Option<MatchResult>,
    matches_played: u32,
}

impl MatchLifecycle {
    pub fn new(human_side: Color, level: DifficultyLevel, rest_period_secs: u32) -> Self {
        Self {
            phase: LifecyclePhase::AwaitingMatch,
            human_side,
            level,
            rest_period: rest_period_secs,
            rest_remaining: 0,
            rotate_after_rest: false,
            last_result: None,
            matches_played: 0,
        }
    }

    /// The match to request first.
    pub fn first_match(&self) -> NextMatch {
        NextMatch {
            level: self.level,
            side: self.human_side,
        }
    }

    pub fn match_started(&mut self) {
        self.phase = LifecyclePhase::InMatch;
    }

    /// Record the finished match and begin the rest period.
    pub fn match_finished(&mut self, winner: Winner) -> MatchResult {
        let result = MatchResult::from_winner(winner, self.human_side);
        info!(result = ?result, level = self.level.value(), rest_secs = self.rest_period, "Match finished, resting");
        self.last_result = Some(result);
        self.matches_played += 1;
        self.rotate_after_rest = true;
        self.start_rest();
        result
    }

    /// Creation failed: rest, then retry with the same level and side.
    pub fn creation_failed(&mut self) {
        self.rotate_after_rest = false;
        self.start_rest();
    }

    fn start_rest(&mut self) {
        self.phase = LifecyclePhase::Resting;
        self.rest_remaining = self.rest_period;
    }

    /// One second of rest. Returns the next match once the rest expires.
    pub fn tick(&mut self) -> Option<NextMatch> {
        if self.phase != LifecyclePhase::Resting {
            return None;
        }
        self.rest_remaining = self.rest_remaining.saturating_sub(1);
        if self.rest_remaining > 0 {
            return None;
        }

        if self.rotate_after_rest {
            let result = self.last_result.unwrap_or(MatchResult::Unknown);
            let next = next_difficulty(self.level, result);
            if next != self.level {
                info!(from = self.level.value(), to = next.value(), "Difficulty changed");
            }
            self.level = next;
            self.human_side = self.human_side.other();
            self.rotate_after_rest = false;
        }

        self.phase = LifecyclePhase::AwaitingMatch;
        Some(NextMatch {
            level: self.level,
            side: self.human_side,
        })
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn human_side(&self) -> Color {
        self.human_side
    }

    pub fn level(&self) -> DifficultyLevel {
        self.level
    }

    pub fn rest_remaining(&self) -> Option<u32> {
        (self.phase == LifecyclePhase::Resting).then_some(self.rest_remaining)
    }

    pub fn last_result(&self) -> Option<MatchResult> {
        self.last_result
    }

    pub fn matches_played(&self) -> u32 {
        self.matches_played
    }
}
