mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chess_core::{Color, GameStatus, Winner};
use common::*;
use crowd_engine::{
    event_channel, DifficultyLevel, FallbackStrategy, FinalResult, GameEvent, Session, SessionConfig, TurnEngine,
};
use tokio::sync::oneshot;

const TICK: Duration = Duration::from_millis(10);

fn quick_config(side: Color) -> SessionConfig {
    SessionConfig {
        human_side: side,
        difficulty: DifficultyLevel::MIN,
        turn_deadline_secs: 3,
        rest_period_secs: 1,
    }
}

fn opening() -> GameEvent {
    GameEvent::FullState {
        initial_fen: None,
        moves: Vec::new(),
        status: GameStatus::Started,
        winner: None,
    }
}

#[tokio::test]
async fn test_session_plays_crowd_move() {
    let (sink, inbox) = event_channel();
    let authority = Arc::new(FakeAuthority::new(vec![opening()], true, None));
    let log = authority.log.clone();
    let starts = Arc::new(Mutex::new(Vec::new()));
    let analysis = FakeAnalysis {
        sink: sink.clone(),
        lines: vec![(1, "e2e4".into()), (2, "d2d4".into())],
        starts: starts.clone(),
    };
    let chat = FakeChat {
        sink: sink.clone(),
        messages: vec![
            ("A".into(), "m-d2d4".into()),
            ("B".into(), "I like m-d2d4".into()),
            ("C".into(), "m-e2e4".into()),
        ],
    };

    let engine = TurnEngine::with_seed(&quick_config(Color::White), FallbackStrategy::TopRanked, 3);
    let session = Session::new(engine, (sink, inbox), authority, Box::new(analysis), Box::new(chat))
        .with_tick_interval(TICK);
    let snapshots = session.subscribe();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(session.run(async {
        let _ = stop_rx.await;
    }));

    wait_until(|| !log.lock().unwrap().submitted.is_empty()).await;
    let _ = stop_tx.send(());
    let engine = handle.await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.created, vec![(DifficultyLevel::MIN, Color::White)]);
    assert_eq!(log.submitted, vec![("game1".to_string(), "d2d4".to_string())]);
    assert_eq!(starts.lock().unwrap().len(), 1);

    assert_eq!(engine.ledger().points("A"), 3);
    assert_eq!(engine.ledger().points("B"), 3);
    assert_eq!(engine.ledger().points("C"), 0);
    assert_eq!(snapshots.borrow().leaderboard.len(), 2);
}

#[tokio::test]
async fn test_session_moves_to_next_match_after_stream_closes() {
    let (sink, inbox) = event_channel();
    let result = FinalResult {
        status: GameStatus::Resign,
        winner: Some(Winner::White),
    };
    let authority = Arc::new(FakeAuthority::new(vec![opening()], false, Some(result)));
    let log = authority.log.clone();
    let analysis = FakeAnalysis {
        sink: sink.clone(),
        lines: Vec::new(),
        starts: Arc::new(Mutex::new(Vec::new())),
    };
    let chat = FakeChat {
        sink: sink.clone(),
        messages: Vec::new(),
    };

    let engine = TurnEngine::with_seed(&quick_config(Color::White), FallbackStrategy::TopRanked, 3);
    let session = Session::new(engine, (sink, inbox), authority, Box::new(analysis), Box::new(chat))
        .with_tick_interval(TICK);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(session.run(async {
        let _ = stop_rx.await;
    }));

    wait_until(|| log.lock().unwrap().created.len() >= 2).await;
    let _ = stop_tx.send(());
    handle.await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.fetched[0], "game1");
    assert_eq!(log.created[1], (DifficultyLevel::new(2).unwrap(), Color::Black));
}
