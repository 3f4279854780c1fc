//! Picks the single move submitted at the end of a human turn.
//!
//! Order: the highest-voted entry that is still legal, else a candidate from
//! the analysis feed, else the turn is unresolvable.

use std::str::FromStr;

use chess_core::{BoardPosition, MoveValidator};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::AnalysisFeed;
use crate::error::EngineError;
use crate::tally::VoteTally;

/// How the analysis fallback chooses among candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Always the best-ranked legal candidate.
    #[default]
    TopRanked,
    /// Uniformly random among legal candidates.
    Uniform,
}

impl FromStr for FallbackStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" | "top_ranked" => Ok(FallbackStrategy::TopRanked),
            "uniform" | "random" => Ok(FallbackStrategy::Uniform),
            other => Err(EngineError::Config(format!(
                "unknown fallback strategy '{other}' (expected top or uniform)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionSource {
    Vote { votes: u32 },
    Analysis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    #[serde(rename = "move")]
    pub mv: String,
    /// Rank the move held in the analysis feed at resolution time
    pub rank: Option<usize>,
    pub source: ResolutionSource,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionPolicy {
    strategy: FallbackStrategy,
    validator: MoveValidator,
}

impl ResolutionPolicy {
    pub fn new(strategy: FallbackStrategy) -> Self {
        Self {
            strategy,
            validator: MoveValidator::new(),
        }
    }

    pub fn strategy(&self) -> FallbackStrategy {
        self.strategy
    }

    pub fn resolve<R: Rng + ?Sized>(
        &self,
        tally: &VoteTally,
        feed: &AnalysisFeed,
        position: &BoardPosition,
        rng: &mut R,
    ) -> Result<Resolution, EngineError> {
        for entry in tally.entries() {
            if self.validator.is_legal(&entry.mv, position) {
                return Ok(Resolution {
                    mv: entry.mv.clone(),
                    rank: feed.rank_of(&entry.mv),
                    source: ResolutionSource::Vote { votes: entry.votes },
                });
            }
            debug!(mv = %entry.mv, "Voted move no longer legal, trying next entry");
        }

        let legal: Vec<_> = feed
            .candidates()
            .filter(|c| self.validator.is_legal(&c.mv, position))
            .collect();

        let chosen = match self.strategy {
            FallbackStrategy::TopRanked => legal.first().copied(),
            FallbackStrategy::Uniform => legal.choose(rng).copied(),
        };

        match chosen {
            Some(candidate) => {
                info!(
                    mv = %candidate.mv,
                    rank = candidate.rank,
                    strategy = ?self.strategy,
                    "No usable vote, falling back to analysis"
                );
                Ok(Resolution {
                    mv: candidate.mv.clone(),
                    rank: Some(candidate.rank),
                    source: ResolutionSource::Analysis,
                })
            }
            None => Err(EngineError::Unresolvable),
        }
    }
}
