//! Session-wide participant scores.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub author: String,
    pub points: u64,
}

/// Cumulative points per author. Never reset, never decreases.
#[derive(Debug, Default)]
pub struct ScoreLedger {
    points: HashMap<String, u64>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points_for_rank(rank: Option<usize>) -> u32 {
        match rank {
            Some(1) => 5,
            Some(2) => 3,
            Some(3) => 1,
            _ => 0,
        }
    }

    /// Credit every author whose vote equals `resolved`. `votes` must be
    /// captured before the tally is cleared. Returns the credited authors.
    pub fn award<'a, I>(&mut self, resolved: &str, rank: Option<usize>, votes: I) -> Vec<(String, u32)>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let points = Self::points_for_rank(rank);
        if points == 0 {
            return Vec::new();
        }

        let mut credited: Vec<(String, u32)> = votes
            .into_iter()
            .filter(|(_, mv)| *mv == resolved)
            .map(|(author, _)| (author.to_string(), points))
            .collect();
        credited.sort();

        for (author, pts) in &credited {
            *self.points.entry(author.clone()).or_insert(0) += u64::from(*pts);
        }
        if !credited.is_empty() {
            info!(mv = resolved, points, authors = credited.len(), "Awarded points");
        }
        credited
    }

    pub fn points(&self, author: &str) -> u64 {
        self.points.get(author).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most points first, ties by author.
    pub fn standings(&self) -> Vec<Standing> {
        let mut all: Vec<Standing> = self
            .points
            .iter()
            .map(|(author, points)| Standing {
                author: author.clone(),
                points: *points,
            })
            .collect();
        all.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.author.cmp(&b.author)));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_table() {
        assert_eq!(ScoreLedger::points_for_rank(Some(1)), 5);
        assert_eq!(ScoreLedger::points_for_rank(Some(2)), 3);
        assert_eq!(ScoreLedger::points_for_rank(Some(3)), 1);
        assert_eq!(ScoreLedger::points_for_rank(Some(4)), 0);
        assert_eq!(ScoreLedger::points_for_rank(None), 0);
    }

    #[test]
    fn test_award_only_matching_voters() {
        let mut ledger = ScoreLedger::new();
        let votes = [("A", "e7e5"), ("B", "e7e5"), ("C", "g8f6")];
        let credited = ledger.award("e7e5", Some(1), votes);

        assert_eq!(credited, vec![("A".to_string(), 5), ("B".to_string(), 5)]);
        assert_eq!(ledger.points("A"), 5);
        assert_eq!(ledger.points("B"), 5);
        assert_eq!(ledger.points("C"), 0);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_zero_points_is_noop() {
        let mut ledger = ScoreLedger::new();
        assert!(ledger.award("h7h6", None, [("A", "h7h6")]).is_empty());
        assert!(ledger.award("h7h6", Some(4), [("A", "h7h6")]).is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_accumulates_and_ranks() {
        let mut ledger = ScoreLedger::new();
        ledger.award("e7e5", Some(1), [("A", "e7e5"), ("B", "e7e5")]);
        ledger.award("g1f3", Some(2), [("B", "g1f3"), ("C", "g1f3")]);
        ledger.award("b8c6", Some(3), [("C", "b8c6")]);

        let standings = ledger.standings();
        let table: Vec<(&str, u64)> = standings
            .iter()
            .map(|s| (s.author.as_str(), s.points))
            .collect();
        assert_eq!(table, vec![("B", 8), ("A", 5), ("C", 4)]);
    }
}
