//! Crowd vote tally.
//!
//! Every author holds at most one live vote. Counts are maintained by
//! applying the delta of each submission (decrement the old move, increment
//! the new one), never by recounting, so the ranking keeps the relative
//! order of equal counts stable across submissions.

use std::collections::HashMap;

use chess_core::{BoardPosition, MoveValidator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vote {
    pub author: String,
    #[serde(rename = "move")]
    pub mv: String,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    #[serde(rename = "move")]
    pub mv: String,
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Vote recorded; `replaced` is the author's previous move, if any.
    Recorded { replaced: Option<String> },
    /// Same move as the author's live vote.
    Unchanged,
    /// Illegal or malformed move; nothing changed.
    Rejected,
}

#[derive(Debug, Default)]
pub struct VoteTally {
    votes: HashMap<String, Vote>,
    entries: Vec<TallyEntry>,
    validator: MoveValidator,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `author`'s vote for `mv` in `position`, replacing any previous vote.
    pub fn submit(&mut self, author: &str, mv: &str, position: &BoardPosition) -> SubmitOutcome {
        if !self.validator.is_legal(mv, position) {
            debug!(author, mv, "Rejected illegal vote");
            return SubmitOutcome::Rejected;
        }

        let replaced = match self.votes.get(author) {
            Some(prev) if prev.mv == mv => return SubmitOutcome::Unchanged,
            Some(prev) => Some(prev.mv.clone()),
            None => None,
        };

        if let Some(prev) = &replaced {
            self.decrement(prev);
        }

        self.votes.insert(
            author.to_string(),
            Vote {
                author: author.to_string(),
                mv: mv.to_string(),
                cast_at: Utc::now(),
            },
        );
        self.increment(mv);

        // Vec::sort_by is stable: equal counts keep their previous order.
        self.entries.sort_by(|a, b| b.votes.cmp(&a.votes));

        SubmitOutcome::Recorded { replaced }
    }

    fn decrement(&mut self, mv: &str) {
        if let Some(idx) = self.entries.iter().position(|e| e.mv == mv) {
            self.entries[idx].votes -= 1;
            if self.entries[idx].votes == 0 {
                self.entries.remove(idx);
            }
        }
    }

    fn increment(&mut self, mv: &str) {
        match self.entries.iter_mut().find(|e| e.mv == mv) {
            Some(entry) => entry.votes += 1,
            None => self.entries.push(TallyEntry {
                mv: mv.to_string(),
                votes: 1,
            }),
        }
    }

    /// First `n` entries of the ranking.
    pub fn top_entries(&self, n: usize) -> &[TallyEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Full ranking, most votes first.
    pub fn entries(&self) -> &[TallyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn live_vote(&self, author: &str) -> Option<&Vote> {
        self.votes.get(author)
    }

    /// (author, move) for every live vote.
    pub fn live_votes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.votes
            .values()
            .map(|v| (v.author.as_str(), v.mv.as_str()))
    }

    /// Number of authors with a live vote.
    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    /// Sum of all entry counts. Always equal to `voter_count()`.
    pub fn total_votes(&self) -> u32 {
        self.entries.iter().map(|e| e.votes).sum()
    }

    pub fn clear(&mut self) {
        self.votes.clear();
        self.entries.clear();
    }
}
