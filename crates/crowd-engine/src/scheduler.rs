//! Per-turn countdown: `Idle -> Counting -> Resolving -> Idle`.
//!
//! Outside the human side's turn the scheduler sits in `Idle` with the
//! countdown held at the full deadline and the vote channel closed.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Counting,
    Resolving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not counting; countdown held at the deadline.
    Held,
    Counting { remaining: u32 },
    /// Countdown hit zero; the caller must resolve and then call
    /// `finish_resolution`.
    Expired,
}

#[derive(Debug)]
pub struct TurnScheduler {
    phase: TurnPhase,
    deadline: u32,
    remaining: u32,
    channel_open: bool,
}

impl TurnScheduler {
    pub fn new(deadline_secs: u32) -> Self {
        let deadline = deadline_secs.max(1);
        Self {
            phase: TurnPhase::Idle,
            deadline,
            remaining: deadline,
            channel_open: false,
        }
    }

    /// `Idle -> Counting`. Returns false if a turn is already in progress.
    pub fn begin_turn(&mut self) -> bool {
        if self.phase != TurnPhase::Idle {
            return false;
        }
        self.phase = TurnPhase::Counting;
        self.remaining = self.deadline;
        self.channel_open = true;
        true
    }

    /// One wall-clock second.
    pub fn tick(&mut self) -> TickOutcome {
        match self.phase {
            TurnPhase::Counting => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    self.phase = TurnPhase::Resolving;
                    TickOutcome::Expired
                } else {
                    TickOutcome::Counting {
                        remaining: self.remaining,
                    }
                }
            }
            TurnPhase::Idle | TurnPhase::Resolving => TickOutcome::Held,
        }
    }

    /// `Resolving -> Idle`, whether or not a move was produced.
    pub fn finish_resolution(&mut self) {
        if self.phase == TurnPhase::Resolving {
            self.hold();
        }
    }

    /// Abandon the current turn without resolving. Returns true if a turn
    /// was in progress.
    pub fn abort(&mut self) -> bool {
        let active = self.phase != TurnPhase::Idle;
        self.hold();
        active
    }

    fn hold(&mut self) {
        self.phase = TurnPhase::Idle;
        self.remaining = self.deadline;
        self.channel_open = false;
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn deadline(&self) -> u32 {
        self.deadline
    }

    pub fn channel_open(&self) -> bool {
        self.channel_open
    }
}
