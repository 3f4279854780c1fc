#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chess_core::{Color, GameStatus};
use crowd_engine::collaborators::GameEventStream;
use crowd_engine::{
    Action, AnalysisEngine, AnalysisInfo, Authority, ChatSource, DifficultyLevel, EngineError, EventSink,
    FallbackStrategy, FinalResult, GameEvent, MoveVerdict, Score, SessionConfig, SessionEvent, TurnEngine,
};
use futures::stream::{self, StreamExt};

pub const MATCH_ID: &str = "game1";
pub const DEADLINE: u32 = 30;
pub const REST: u32 = 60;

pub fn session_config(side: Color, level: u8) -> SessionConfig {
    SessionConfig {
        human_side: side,
        difficulty: DifficultyLevel::new(level).unwrap(),
        turn_deadline_secs: DEADLINE,
        rest_period_secs: REST,
    }
}

/// Engine with a fixed seed and the deterministic fallback.
pub fn engine(side: Color) -> TurnEngine {
    TurnEngine::with_seed(&session_config(side, 1), FallbackStrategy::TopRanked, 7)
}

pub fn moves(list: &[&str]) -> Vec<String> {
    list.iter().map(|m| m.to_string()).collect()
}

pub fn full_state(match_id: &str, list: &[&str]) -> SessionEvent {
    SessionEvent::Game {
        match_id: match_id.to_string(),
        event: GameEvent::FullState {
            initial_fen: None,
            moves: moves(list),
            status: GameStatus::Started,
            winner: None,
        },
    }
}

pub fn state_update(match_id: &str, list: &[&str], status: GameStatus, winner: Option<Color>) -> SessionEvent {
    SessionEvent::Game {
        match_id: match_id.to_string(),
        event: GameEvent::StateUpdate {
            moves: moves(list),
            fen: None,
            status,
            winner,
        },
    }
}

/// Create `match_id` and deliver its opening full state. Returns the actions
/// of the full state event.
pub fn start_match(engine: &mut TurnEngine, match_id: &str, list: &[&str]) -> Vec<Action> {
    let created = engine.handle(SessionEvent::MatchCreated {
        match_id: match_id.to_string(),
    });
    assert_eq!(
        created,
        vec![Action::StreamEvents {
            match_id: match_id.to_string()
        }]
    );
    engine.handle(full_state(match_id, list))
}

pub fn vote(author: &str, mv: &str) -> SessionEvent {
    SessionEvent::Chat {
        author: author.to_string(),
        text: format!("m-{mv}"),
    }
}

pub fn analysis(rank: usize, mv: &str, depth: u32) -> SessionEvent {
    SessionEvent::Analysis(AnalysisInfo {
        rank,
        mv: mv.to_string(),
        score: Score::Cp(20),
        depth,
    })
}

/// Tick through a whole countdown. Every tick but the last must be silent;
/// returns the actions of the expiring tick.
pub fn run_out_clock(engine: &mut TurnEngine) -> Vec<Action> {
    for _ in 1..DEADLINE {
        assert!(engine.handle(SessionEvent::Tick).is_empty());
    }
    engine.handle(SessionEvent::Tick)
}

/// Tick through a rest period; returns the first non-empty action list.
pub fn run_out_rest(engine: &mut TurnEngine) -> Vec<Action> {
    for _ in 0..=REST {
        let actions = engine.handle(SessionEvent::Tick);
        if !actions.is_empty() {
            return actions;
        }
    }
    panic!("rest period never ended");
}

pub fn submitted(actions: &[Action]) -> Option<&str> {
    actions.iter().find_map(|a| match a {
        Action::SubmitMove { mv, .. } => Some(mv.as_str()),
        _ => None,
    })
}

pub fn assert_tally_consistent(engine: &TurnEngine) {
    let tally = engine.tally();
    assert_eq!(tally.total_votes() as usize, tally.voter_count());
}

/// Poll `check` until it holds, failing after a few seconds.
pub async fn wait_until<F: Fn() -> bool>(check: F) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

// ---------------------------------------------------------------------------
// In-memory collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AuthorityLog {
    pub created: Vec<(DifficultyLevel, Color)>,
    pub submitted: Vec<(String, String)>,
    pub fetched: Vec<String>,
}

/// Authority that creates `game1`, `game2`, ... and replays a fixed script on
/// each game stream.
pub struct FakeAuthority {
    pub log: Arc<Mutex<AuthorityLog>>,
    script: Vec<GameEvent>,
    /// Keep the stream open after the script instead of closing it.
    hold_open: bool,
    final_result: Option<FinalResult>,
}

impl FakeAuthority {
    pub fn new(script: Vec<GameEvent>, hold_open: bool, final_result: Option<FinalResult>) -> Self {
        Self {
            log: Arc::new(Mutex::new(AuthorityLog::default())),
            script,
            hold_open,
            final_result,
        }
    }
}

#[async_trait]
impl Authority for FakeAuthority {
    async fn create_match(&self, level: DifficultyLevel, side: Color) -> Result<String, EngineError> {
        let mut log = self.log.lock().unwrap();
        log.created.push((level, side));
        Ok(format!("game{}", log.created.len()))
    }

    async fn stream_events(&self, _match_id: &str) -> Result<GameEventStream, EngineError> {
        let scripted = stream::iter(self.script.clone().into_iter().map(Ok));
        if self.hold_open {
            Ok(scripted.chain(stream::pending()).boxed())
        } else {
            Ok(scripted.boxed())
        }
    }

    async fn submit_move(&self, match_id: &str, mv: &str) -> Result<MoveVerdict, EngineError> {
        self.log
            .lock()
            .unwrap()
            .submitted
            .push((match_id.to_string(), mv.to_string()));
        Ok(MoveVerdict::Accepted)
    }

    async fn fetch_final_result(&self, match_id: &str) -> Result<FinalResult, EngineError> {
        self.log.lock().unwrap().fetched.push(match_id.to_string());
        self.final_result
            .clone()
            .ok_or_else(|| EngineError::Authority("unavailable".into()))
    }
}

/// Analysis engine that answers every start with a fixed candidate list.
pub struct FakeAnalysis {
    pub sink: EventSink,
    pub lines: Vec<(usize, String)>,
    pub starts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AnalysisEngine for FakeAnalysis {
    async fn start(&mut self, fen: &str, _candidates: usize, _depth: u32) -> Result<(), EngineError> {
        self.starts.lock().unwrap().push(fen.to_string());
        for (rank, mv) in &self.lines {
            let _ = self.sink.send(SessionEvent::Analysis(AnalysisInfo {
                rank: *rank,
                mv: mv.clone(),
                score: Score::Cp(15),
                depth: 8,
            }));
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Chat that delivers a fixed batch of messages every time it opens.
pub struct FakeChat {
    pub sink: EventSink,
    pub messages: Vec<(String, String)>,
}

#[async_trait]
impl ChatSource for FakeChat {
    async fn open(&mut self) -> Result<(), EngineError> {
        for (author, text) in &self.messages {
            let _ = self.sink.send(SessionEvent::Chat {
                author: author.clone(),
                text: text.clone(),
            });
        }
        Ok(())
    }

    async fn close(&mut self) {}
}
