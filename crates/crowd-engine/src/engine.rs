//! Single-owner event dispatcher.
//!
//! `TurnEngine` holds every piece of per-session state and is the only
//! thing that mutates it. Each `SessionEvent` is handled to completion and
//! produces the `Action`s the async driver must carry out.

use chess_core::game_data::color_name;
use chess_core::vote_command::parse_vote;
use chess_core::Winner;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisFeed, FeedUpdate, RankedCandidate};
use crate::config::{CrowdConfig, SessionConfig};
use crate::events::{Action, SessionEvent};
use crate::game_sync::GameStateSync;
use crate::ledger::{ScoreLedger, Standing};
use crate::lifecycle::{LifecyclePhase, MatchLifecycle, MatchResult};
use crate::resolution::{FallbackStrategy, Resolution, ResolutionPolicy};
use crate::scheduler::{TickOutcome, TurnPhase, TurnScheduler};
use crate::tally::{SubmitOutcome, TallyEntry, VoteTally};

/// Number of vote entries shown in a snapshot.
const SNAPSHOT_VOTES: usize = 5;

/// Read-only view of the session, published after every event.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub match_id: Option<String>,
    pub lifecycle: LifecyclePhase,
    pub turn: TurnPhase,
    pub human_side: &'static str,
    pub side_to_move: Option<&'static str>,
    pub level: u8,
    pub countdown: u32,
    pub fen: String,
    pub move_count: usize,
    pub votes: Vec<TallyEntry>,
    pub voters: usize,
    pub candidates: Vec<RankedCandidate>,
    pub analysis_depth: u32,
    pub leaderboard: Vec<Standing>,
    pub rest_remaining: Option<u32>,
    pub last_resolution: Option<Resolution>,
    pub last_result: Option<MatchResult>,
}

pub struct TurnEngine {
    sync: GameStateSync,
    tally: VoteTally,
    feed: AnalysisFeed,
    scheduler: TurnScheduler,
    ledger: ScoreLedger,
    lifecycle: MatchLifecycle,
    policy: ResolutionPolicy,
    rng: StdRng,
    /// Ply at which the last turn was resolved. Blocks a second turn on the
    /// same position while the authority has not confirmed the move yet.
    resolved_ply: Option<usize>,
    last_resolution: Option<Resolution>,
}

impl TurnEngine {
    pub fn new(session: &SessionConfig, fallback: FallbackStrategy) -> Self {
        Self::with_rng(session, fallback, StdRng::from_entropy())
    }

    pub fn from_config(config: &CrowdConfig) -> Self {
        Self::new(&config.session, config.fallback)
    }

    /// Deterministic fallback draws, for tests and replays.
    pub fn with_seed(session: &SessionConfig, fallback: FallbackStrategy, seed: u64) -> Self {
        Self::with_rng(session, fallback, StdRng::seed_from_u64(seed))
    }

    fn with_rng(session: &SessionConfig, fallback: FallbackStrategy, rng: StdRng) -> Self {
        Self {
            sync: GameStateSync::new(),
            tally: VoteTally::new(),
            feed: AnalysisFeed::new(),
            scheduler: TurnScheduler::new(session.turn_deadline_secs),
            ledger: ScoreLedger::new(),
            lifecycle: MatchLifecycle::new(session.human_side, session.difficulty, session.rest_period_secs),
            policy: ResolutionPolicy::new(fallback),
            rng,
            resolved_ply: None,
            last_resolution: None,
        }
    }

    /// Actions to run when the session starts.
    pub fn start(&self) -> Vec<Action> {
        let first = self.lifecycle.first_match();
        info!(level = first.level.value(), side = color_name::name(first.side), "Requesting first match");
        vec![Action::CreateMatch {
            level: first.level,
            side: first.side,
        }]
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Action> {
        match event {
            SessionEvent::Tick => self.on_tick(),
            SessionEvent::MatchCreated { match_id } => self.on_match_created(match_id),
            SessionEvent::MatchCreateFailed { reason } => {
                warn!(%reason, "Match creation failed, retrying after rest");
                self.lifecycle.creation_failed();
                Vec::new()
            }
            SessionEvent::Game { match_id, event } => {
                if !self.is_current(&match_id) {
                    debug!(%match_id, "Event for stale match");
                    return Vec::new();
                }
                match self.sync.apply(event) {
                    Ok(change) if change.terminated_now => self.on_terminated(),
                    Ok(change) if change.position_changed => self.on_position_changed(),
                    Ok(_) => Vec::new(),
                    Err(e) => {
                        warn!(%match_id, error = %e, "Could not apply game event");
                        Vec::new()
                    }
                }
            }
            SessionEvent::StreamEnded { match_id } => {
                if self.is_current(&match_id) && self.sync.needs_reconciliation() {
                    warn!(%match_id, "Game stream closed before termination, fetching result");
                    vec![Action::FetchFinalResult { match_id }]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::FinalResult { match_id, result } => {
                if self.is_current(&match_id) && self.sync.reconcile(result) {
                    self.on_terminated()
                } else {
                    Vec::new()
                }
            }
            SessionEvent::Chat { author, text } => {
                self.on_chat(&author, &text);
                Vec::new()
            }
            SessionEvent::Analysis(update) => match self.feed.apply(update) {
                FeedUpdate::BudgetReached => {
                    debug!(depth = self.feed.max_depth_seen(), "Depth budget reached");
                    vec![Action::StopAnalysis]
                }
                FeedUpdate::Applied | FeedUpdate::Ignored => Vec::new(),
            },
            SessionEvent::MoveSubmitted { match_id, mv } => {
                info!(%match_id, %mv, "Move accepted by authority");
                Vec::new()
            }
            SessionEvent::MoveRejected { match_id, mv, reason } => {
                // Not retried: the ply stays resolved until the authority moves on.
                warn!(%match_id, %mv, %reason, "Move rejected by authority");
                Vec::new()
            }
        }
    }

    fn is_current(&self, match_id: &str) -> bool {
        self.sync.match_id() == Some(match_id)
    }

    fn on_tick(&mut self) -> Vec<Action> {
        if let Some(next) = self.lifecycle.tick() {
            info!(level = next.level.value(), side = color_name::name(next.side), "Rest over, requesting next match");
            return vec![Action::CreateMatch {
                level: next.level,
                side: next.side,
            }];
        }

        match self.scheduler.tick() {
            TickOutcome::Expired => self.resolve_turn(),
            TickOutcome::Counting { .. } => Vec::new(),
            TickOutcome::Held => self.maybe_open_turn(),
        }
    }

    fn on_match_created(&mut self, match_id: String) -> Vec<Action> {
        if self.lifecycle.phase() != LifecyclePhase::AwaitingMatch {
            warn!(%match_id, "Unexpected match creation, ignoring");
            return Vec::new();
        }
        info!(
            %match_id,
            level = self.lifecycle.level().value(),
            side = color_name::name(self.lifecycle.human_side()),
            "Match created"
        );
        self.sync.begin_match(&match_id);
        self.lifecycle.match_started();
        self.scheduler.abort();
        self.tally.clear();
        self.feed.clear();
        self.resolved_ply = None;
        self.last_resolution = None;
        vec![Action::StreamEvents { match_id }]
    }

    fn on_chat(&mut self, author: &str, text: &str) {
        if !self.scheduler.channel_open() {
            return;
        }
        let Some(mv) = parse_vote(text) else {
            return;
        };
        if let SubmitOutcome::Recorded { replaced } = self.tally.submit(author, &mv, self.sync.position()) {
            debug!(author, %mv, ?replaced, "Vote recorded");
        }
    }

    fn on_position_changed(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.scheduler.abort() {
            info!("Position changed mid-turn, abandoning turn");
            self.tally.clear();
            actions.push(Action::CloseChat);
        }
        if self.feed.clear() {
            actions.push(Action::StopAnalysis);
        }
        actions.extend(self.maybe_open_turn());
        actions
    }

    /// `Idle -> Counting` when it is the crowd's move on a position not yet
    /// resolved.
    fn maybe_open_turn(&mut self) -> Vec<Action> {
        let human_side = self.lifecycle.human_side();
        if self.lifecycle.phase() != LifecyclePhase::InMatch
            || !self.sync.is_human_turn(human_side)
            || self.scheduler.phase() != TurnPhase::Idle
            || self.resolved_ply == Some(self.sync.ply())
        {
            return Vec::new();
        }

        self.scheduler.begin_turn();
        self.tally.clear();
        let request = self.feed.start(self.sync.position(), self.lifecycle.level());
        info!(
            match_id = self.sync.match_id().unwrap_or_default(),
            ply = self.sync.ply(),
            deadline = self.scheduler.deadline(),
            "Turn opened"
        );
        vec![
            Action::StartAnalysis {
                fen: request.fen,
                candidates: request.candidates,
                depth: request.depth,
            },
            Action::OpenChat,
        ]
    }

    fn resolve_turn(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let match_id = self.sync.match_id().unwrap_or_default().to_string();
        self.resolved_ply = Some(self.sync.ply());

        match self
            .policy
            .resolve(&self.tally, &self.feed, self.sync.position(), &mut self.rng)
        {
            Ok(resolution) => {
                info!(
                    %match_id,
                    mv = %resolution.mv,
                    rank = ?resolution.rank,
                    source = ?resolution.source,
                    voters = self.tally.voter_count(),
                    "Turn resolved"
                );
                actions.push(Action::SubmitMove {
                    match_id,
                    mv: resolution.mv.clone(),
                });
                self.ledger
                    .award(&resolution.mv, resolution.rank, self.tally.live_votes());
                self.last_resolution = Some(resolution);
            }
            Err(e) => {
                warn!(%match_id, error = %e, "Turn ended without a move");
                self.last_resolution = None;
            }
        }

        self.tally.clear();
        self.scheduler.finish_resolution();
        actions.push(Action::CloseChat);
        if self.feed.clear() {
            actions.push(Action::StopAnalysis);
        }
        actions
    }

    fn on_terminated(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.scheduler.abort() {
            info!("Match ended mid-turn, turn abandoned");
            actions.push(Action::CloseChat);
        }
        if self.feed.clear() {
            actions.push(Action::StopAnalysis);
        }
        self.tally.clear();
        self.resolved_ply = None;

        let winner = self
            .sync
            .state()
            .and_then(|s| s.outcome.as_ref())
            .map_or(Winner::None, |o| o.winner);
        self.lifecycle.match_finished(winner);
        actions
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.sync.state();
        SessionSnapshot {
            match_id: state.map(|s| s.match_id.clone()),
            lifecycle: self.lifecycle.phase(),
            turn: self.scheduler.phase(),
            human_side: color_name::name(self.lifecycle.human_side()),
            side_to_move: state.map(|s| color_name::name(s.side_to_move)),
            level: self.lifecycle.level().value(),
            countdown: self.scheduler.remaining(),
            fen: self.sync.position().fen(),
            move_count: self.sync.ply(),
            votes: self.tally.top_entries(SNAPSHOT_VOTES).to_vec(),
            voters: self.tally.voter_count(),
            candidates: self.feed.candidates().cloned().collect(),
            analysis_depth: self.feed.max_depth_seen(),
            leaderboard: self.ledger.standings(),
            rest_remaining: self.lifecycle.rest_remaining(),
            last_resolution: self.last_resolution.clone(),
            last_result: self.lifecycle.last_result(),
        }
    }

    pub fn tally(&self) -> &VoteTally {
        &self.tally
    }

    pub fn feed(&self) -> &AnalysisFeed {
        &self.feed
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    pub fn lifecycle(&self) -> &MatchLifecycle {
        &self.lifecycle
    }

    pub fn sync(&self) -> &GameStateSync {
        &self.sync
    }

    pub fn last_resolution(&self) -> Option<&Resolution> {
        self.last_resolution.as_ref()
    }
}
