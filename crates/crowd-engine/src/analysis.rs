//! Incremental engine analysis for the human side's turn.
//!
//! The engine reports MultiPV lines as it deepens. Each report overwrites
//! the candidate at its rank; the feed is complete once the depth budget of
//! the current difficulty level is reached.

use std::collections::BTreeMap;

use chess_core::{BoardPosition, MoveValidator};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::difficulty::DifficultyLevel;

/// Engine evaluation from the side to move's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Score {
    Cp(i32),
    Mate(i32),
}

/// One progress notification from the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisInfo {
    /// MultiPV index, 1-based
    pub rank: usize,
    pub mv: String,
    pub score: Score,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    #[serde(rename = "move")]
    pub mv: String,
    pub score: Score,
    pub depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    /// No analysis for the current position
    Idle,
    Running,
    /// Depth budget reached; engine told to stop
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    Ignored,
    Applied,
    /// This update reached the depth budget; the engine should be stopped.
    BudgetReached,
}

/// Search request derived from the position and difficulty level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub fen: String,
    pub candidates: usize,
    pub depth: u32,
}

#[derive(Debug)]
pub struct AnalysisFeed {
    state: FeedState,
    position: Option<BoardPosition>,
    candidates: BTreeMap<usize, RankedCandidate>,
    max_depth_seen: u32,
    depth_budget: u32,
    candidate_budget: usize,
    validator: MoveValidator,
}

impl Default for AnalysisFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisFeed {
    pub fn new() -> Self {
        Self {
            state: FeedState::Idle,
            position: None,
            candidates: BTreeMap::new(),
            max_depth_seen: 0,
            depth_budget: 0,
            candidate_budget: 0,
            validator: MoveValidator::new(),
        }
    }

    /// Reset and begin analysing `position` with the budgets of `level`.
    pub fn start(&mut self, position: &BoardPosition, level: DifficultyLevel) -> AnalysisRequest {
        self.candidates.clear();
        self.max_depth_seen = 0;
        self.depth_budget = level.depth_budget();
        self.candidate_budget = level.candidate_budget();
        self.position = Some(position.clone());
        self.state = FeedState::Running;

        AnalysisRequest {
            fen: position.fen(),
            candidates: self.candidate_budget,
            depth: self.depth_budget,
        }
    }

    /// Apply one notification. Reports for a rank outside the budget, or whose
    /// move is not legal in the analysed position (a stale line from an
    /// earlier search), are dropped.
    pub fn apply(&mut self, info: AnalysisInfo) -> FeedUpdate {
        let Some(position) = &self.position else {
            return FeedUpdate::Ignored;
        };
        if self.state == FeedState::Idle {
            return FeedUpdate::Ignored;
        }
        if info.rank == 0 || info.rank > self.candidate_budget {
            debug!(rank = info.rank, "Dropping analysis line outside candidate budget");
            return FeedUpdate::Ignored;
        }
        if !self.validator.is_legal(&info.mv, position) {
            debug!(mv = %info.mv, "Dropping analysis line for another position");
            return FeedUpdate::Ignored;
        }

        self.candidates.insert(
            info.rank,
            RankedCandidate {
                rank: info.rank,
                mv: info.mv,
                score: info.score,
                depth: info.depth,
            },
        );
        self.max_depth_seen = self.max_depth_seen.max(info.depth);

        if self.state == FeedState::Running && self.max_depth_seen >= self.depth_budget {
            self.state = FeedState::Complete;
            return FeedUpdate::BudgetReached;
        }
        FeedUpdate::Applied
    }

    /// Drop everything. Returns true if a search was in progress and the
    /// engine needs a stop.
    pub fn clear(&mut self) -> bool {
        let was_running = self.state == FeedState::Running;
        self.state = FeedState::Idle;
        self.position = None;
        self.candidates.clear();
        self.max_depth_seen = 0;
        was_running
    }

    /// Candidates ordered by rank.
    pub fn candidates(&self) -> impl Iterator<Item = &RankedCandidate> {
        self.candidates.values()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn rank_of(&self, mv: &str) -> Option<usize> {
        self.candidates
            .values()
            .find(|c| c.mv == mv)
            .map(|c| c.rank)
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn max_depth_seen(&self) -> u32 {
        self.max_depth_seen
    }

    pub fn depth_budget(&self) -> u32 {
        self.depth_budget
    }
}
