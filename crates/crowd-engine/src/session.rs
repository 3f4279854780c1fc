//! Async driver around `TurnEngine`.
//!
//! One loop owns the engine. Timer ticks, authority results, analysis
//! progress and chat messages are all funnelled into it as events and handled
//! one at a time; the resulting actions are executed here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::collaborators::{AnalysisEngine, Authority, ChatSource, EventInbox, EventSink, MoveVerdict};
use crate::engine::{SessionSnapshot, TurnEngine};
use crate::events::{Action, SessionEvent};

pub struct Session {
    engine: TurnEngine,
    authority: Arc<dyn Authority>,
    analysis: Box<dyn AnalysisEngine>,
    chat: Box<dyn ChatSource>,
    sink: EventSink,
    inbox: EventInbox,
    snapshots: watch::Sender<SessionSnapshot>,
    tick_interval: Duration,
}

impl Session {
    pub fn new(
        engine: TurnEngine,
        (sink, inbox): (EventSink, EventInbox),
        authority: Arc<dyn Authority>,
        analysis: Box<dyn AnalysisEngine>,
        chat: Box<dyn ChatSource>,
    ) -> Self {
        let (snapshots, _) = watch::channel(engine.snapshot());
        Self {
            engine,
            authority,
            analysis,
            chat,
            sink,
            inbox,
            snapshots,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Length of one countdown second. Only shortened in tests.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Run until `shutdown` resolves. Returns the engine for inspection.
    pub async fn run<F>(mut self, shutdown: F) -> TurnEngine
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let initial = self.engine.start();
        self.execute(initial).await;

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!("Session running");
        loop {
            let event = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => SessionEvent::Tick,
                Some(event) = self.inbox.recv() => event,
            };

            let actions = self.engine.handle(event);
            self.execute(actions).await;
            self.snapshots.send_replace(self.engine.snapshot());
        }

        if let Err(e) = self.analysis.stop().await {
            warn!(error = %e, "Failed to stop analysis on shutdown");
        }
        self.chat.close().await;
        self.engine
    }

    async fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::CreateMatch { level, side } => {
                    let authority = self.authority.clone();
                    let sink = self.sink.clone();
                    tokio::spawn(async move {
                        let event = match authority.create_match(level, side).await {
                            Ok(match_id) => SessionEvent::MatchCreated { match_id },
                            Err(e) => SessionEvent::MatchCreateFailed { reason: e.to_string() },
                        };
                        let _ = sink.send(event);
                    });
                }
                Action::StreamEvents { match_id } => {
                    let authority = self.authority.clone();
                    let sink = self.sink.clone();
                    tokio::spawn(async move {
                        match authority.stream_events(&match_id).await {
                            Ok(mut stream) => {
                                while let Some(item) = stream.next().await {
                                    match item {
                                        Ok(event) => {
                                            let game = SessionEvent::Game {
                                                match_id: match_id.clone(),
                                                event,
                                            };
                                            if sink.send(game).is_err() {
                                                return;
                                            }
                                        }
                                        Err(e) => {
                                            warn!(%match_id, error = %e, "Game stream failed");
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => error!(%match_id, error = %e, "Could not open game stream"),
                        }
                        let _ = sink.send(SessionEvent::StreamEnded { match_id });
                    });
                }
                Action::SubmitMove { match_id, mv } => {
                    let authority = self.authority.clone();
                    let sink = self.sink.clone();
                    tokio::spawn(async move {
                        let event = match authority.submit_move(&match_id, &mv).await {
                            Ok(MoveVerdict::Accepted) => SessionEvent::MoveSubmitted { match_id, mv },
                            Ok(MoveVerdict::Rejected(reason)) => SessionEvent::MoveRejected { match_id, mv, reason },
                            Err(e) => SessionEvent::MoveRejected {
                                match_id,
                                mv,
                                reason: e.to_string(),
                            },
                        };
                        let _ = sink.send(event);
                    });
                }
                Action::FetchFinalResult { match_id } => {
                    let authority = self.authority.clone();
                    let sink = self.sink.clone();
                    tokio::spawn(async move {
                        let result = match authority.fetch_final_result(&match_id).await {
                            Ok(result) => Some(result),
                            Err(e) => {
                                warn!(%match_id, error = %e, "Final result fetch failed");
                                None
                            }
                        };
                        let _ = sink.send(SessionEvent::FinalResult { match_id, result });
                    });
                }
                Action::StartAnalysis { fen, candidates, depth } => {
                    if let Err(e) = self.analysis.start(&fen, candidates, depth).await {
                        error!(error = %e, "Failed to start analysis");
                    }
                }
                Action::StopAnalysis => {
                    if let Err(e) = self.analysis.stop().await {
                        warn!(error = %e, "Failed to stop analysis");
                    }
                }
                Action::OpenChat => {
                    if let Err(e) = self.chat.open().await {
                        warn!(error = %e, "Failed to open chat, votes disabled this turn");
                    }
                }
                Action::CloseChat => self.chat.close().await,
            }
        }
    }
}
